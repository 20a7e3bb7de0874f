mod common;

use common::{label_args, Workspace};

fn vote<'a>(file: &'a str, column: &'a str, key: &'a str, decision: &'a str) -> Vec<&'a str> {
    vec![
        "vote",
        "--file",
        file,
        "--column",
        column,
        "--key",
        key,
        "--decision",
        decision,
    ]
}

#[test]
fn third_vote_on_a_closed_explanation_is_refused() {
    let ws = Workspace::new();

    let run = ws.run(&vote("customers.csv", "email", "pii_explanation", "agree"));
    assert!(run.success(), "{}", run.stderr());
    assert!(run.stdout().contains("(1 agree / 0 reject)"));

    let run = ws.run(&vote("customers.csv", "email", "pii_explanation", "reject"));
    assert!(run.success(), "{}", run.stderr());
    assert!(run
        .stdout()
        .contains("customers.csv/email: vote on pii_sensitivity_explanation"));

    let before = std::fs::read(ws.dataset_path()).unwrap();
    let run = ws.run(&vote("customers.csv", "email", "pii_explanation", "agree"));
    assert!(!run.success());
    assert!(run.stderr().contains("already has 2 votes"), "{}", run.stderr());
    assert_eq!(std::fs::read(ws.dataset_path()).unwrap(), before);

    let email = &ws.dataset()["customers.csv"]["columns"]["email"];
    assert_eq!(email["pii_explanation_agree"], 1);
    assert_eq!(email["pii_explanation_reject"], 1);
}

#[test]
fn votes_need_an_explanation() {
    let ws = Workspace::new();
    let run = ws.run(&vote("customers.csv", "plan", "pii_explanation", "agree"));
    assert!(!run.success());
    assert!(run.stderr().contains("no explanation to vote on"));

    let run = ws.run(&vote("customers.csv", "email", "bogus_explanation", "agree"));
    assert!(!run.success());
}

#[test]
fn status_reports_both_tasks() {
    let ws = Workspace::new();
    assert!(ws.run(&label_args("towers.csv", "tower_id", "1")).success());
    assert!(ws.run(&label_args("towers.csv", "tower_id", "2")).success());
    assert!(ws
        .run(&vote("towers.csv", "tower_id", "non_pii_explanation", "agree"))
        .success());

    let run = ws.run(&["status", "--json"]);
    assert!(run.success(), "{}", run.stderr());
    let status = run.json();
    assert_eq!(status["files"], 2);
    assert_eq!(status["columns"], 3);

    let label = &status["tasks"][0];
    assert_eq!(label["task"], "label");
    assert_eq!(label["total_columns"], 3);
    assert_eq!(label["complete_columns"], 1);
    assert_eq!(label["pending_files"], serde_json::json!(["customers.csv"]));
    assert_eq!(label["next"]["column"], "email");

    let vote = &status["tasks"][1];
    assert_eq!(vote["task"], "vote");
    // "plan" has nothing to vote on, so it already counts as complete.
    assert_eq!(vote["complete_columns"], 1);
    assert_eq!(vote["next"]["column"], "email");
    assert_eq!(
        vote["next"]["task"]["open_keys"],
        serde_json::json!(["pii_explanation", "pii_sensitivity_explanation"])
    );
    assert_eq!(vote["next"]["explanations"][0]["agree"], 0);
}

#[test]
fn guidelines_are_listed_per_isp() {
    let ws = Workspace::new();

    let run = ws.run(&["guidelines", "--isp", "Movistar"]);
    assert!(run.success(), "{}", run.stderr());
    assert_eq!(
        run.stdout(),
        "guidelines for Movistar:\n  low/no sensitivity:\n    - tariff names\n  \
         high sensitivity:\n    - customer contact details\n"
    );

    let run = ws.run(&["guidelines", "--isp", "Vodafone"]);
    assert!(run.success());
    assert_eq!(run.stdout(), "no guidelines found for ISP \"Vodafone\"\n");

    let run = ws.run(&["guidelines"]);
    assert!(run.success());
    assert!(run.stdout().ends_with("  Movistar\n  TIM\n"));
}
