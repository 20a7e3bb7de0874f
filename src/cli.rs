//! CLI argument parsing for the labeling workflow.
//!
//! Every command loads the dataset, performs one step, and exits; `review`
//! is the only long-running command.
use crate::config::RemoteOverrides;
use crate::dataset::{Decision, ExplanationKey};
use crate::policy::TaskKind;
use crate::recorder::{NonPiiCategory, NonPiiSensitivity, PiiCategory, PiiSensitivity};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_DATASET: &str = "test.json";
pub const DEFAULT_GUIDELINES: &str = "isps.json";

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "clab",
    version,
    about = "Two-pass privacy labeling and explanation voting for dataset columns",
    after_help = "Commands:\n  next       Show the next column needing work\n  pending    List pending columns in one file\n  label      Record one labeling pass\n  vote       Agree with or reject an explanation\n  status     Summarize progress for both tasks\n  guidelines Show ISP guidelines\n  review     Interactive review loop on stdin\n  migrate    Promote legacy single-pass labels\n\nExamples:\n  clab next --task label\n  clab label --file a.csv --column phone --variant 1 --pii PHONE_NUMBER --pii-level HIGH_SENSITIVE --non-pii NON_SENSITIVE --non-pii-level NON_SENSITIVE\n  clab vote --file a.csv --column phone --key pii_explanation --decision agree\n  clab status --json\n  clab review --task vote",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log progress at info level (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Next(NextArgs),
    Pending(PendingArgs),
    Label(LabelArgs),
    Vote(VoteArgs),
    Status(StatusArgs),
    Guidelines(GuidelinesArgs),
    Review(ReviewArgs),
    Migrate(MigrateArgs),
}

/// Where the dataset is read from and flushed to.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Local dataset file, used when remote sync is not configured
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DATASET)]
    pub data: PathBuf,

    /// Remote repository as OWNER/NAME (overrides CLAB_GITHUB_REPO)
    #[arg(long, value_name = "OWNER/NAME")]
    pub remote_repo: Option<String>,

    /// Dataset path inside the remote repository (overrides CLAB_GITHUB_PATH)
    #[arg(long, value_name = "PATH")]
    pub remote_path: Option<String>,

    /// Remote branch (overrides CLAB_GITHUB_BRANCH)
    #[arg(long, value_name = "BRANCH")]
    pub remote_branch: Option<String>,

    /// Fail instead of falling back to the local file when remote settings are missing
    #[arg(long)]
    pub require_remote: bool,
}

impl DataArgs {
    pub fn overrides(&self) -> RemoteOverrides {
        RemoteOverrides {
            repo: self.remote_repo.clone(),
            path: self.remote_path.clone(),
            branch: self.remote_branch.clone(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Show the next column that needs work")]
pub struct NextArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long, value_enum, default_value_t = TaskKind::Label)]
    pub task: TaskKind,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "List the pending columns of one file")]
pub struct PendingArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long, value_enum, default_value_t = TaskKind::Label)]
    pub task: TaskKind,

    /// File to list; defaults to the first file with pending work
    #[arg(long, value_name = "NAME")]
    pub file: Option<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Record one labeling pass for a column")]
pub struct LabelArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long, value_name = "NAME")]
    pub file: String,

    #[arg(long, value_name = "NAME")]
    pub column: String,

    /// Labeling pass (1 or 2)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub variant: u8,

    #[arg(long, value_enum)]
    pub pii: PiiCategory,

    #[arg(long, value_enum)]
    pub pii_level: PiiSensitivity,

    #[arg(long, value_enum)]
    pub non_pii: NonPiiCategory,

    #[arg(long, value_enum)]
    pub non_pii_level: NonPiiSensitivity,

    /// Overwrite a variant that is already labeled
    #[arg(long)]
    pub amend: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Agree with or reject one explanation")]
pub struct VoteArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long, value_name = "NAME")]
    pub file: String,

    #[arg(long, value_name = "NAME")]
    pub column: String,

    #[arg(long, value_enum)]
    pub key: ExplanationKey,

    #[arg(long, value_enum)]
    pub decision: Decision,
}

#[derive(Parser, Debug)]
#[command(about = "Summarize progress and the next pending column")]
pub struct StatusArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Show labeling guidelines for an ISP")]
pub struct GuidelinesArgs {
    #[arg(long, value_name = "PATH", default_value = DEFAULT_GUIDELINES)]
    pub guidelines: PathBuf,

    /// ISP name; lists known ISPs when omitted
    #[arg(long, value_name = "NAME")]
    pub isp: Option<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Review pending columns interactively (commands on stdin)")]
pub struct ReviewArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long, value_enum, default_value_t = TaskKind::Label)]
    pub task: TaskKind,

    /// Stay within one file
    #[arg(long, value_name = "NAME")]
    pub file: Option<String>,

    /// Guidelines shown when entering a file; skipped if the file is absent
    #[arg(long, value_name = "PATH", default_value = DEFAULT_GUIDELINES)]
    pub guidelines: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Promote legacy single-pass labels to variant 1")]
pub struct MigrateArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Report what would change without flushing
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}
