//! GitHub contents API as a versioned content store.
//!
//! The blob `sha` returned by `GET /repos/{repo}/contents/{path}` is the
//! version marker; `PUT` to the same URL with that `sha` is the conditional
//! write. GitHub answers 409 when the `sha` no longer matches.
use super::{RemoteObject, RemoteStore, WriteRejection};
use crate::config::RemoteConfig;
use crate::util::truncate_string;
use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ureq::Agent;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("column-labeler/", env!("CARGO_PKG_VERSION"));
const ERROR_BODY_MAX_BYTES: usize = 300;

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

pub struct GithubContentsStore {
    agent: Agent,
    config: RemoteConfig,
}

impl GithubContentsStore {
    pub fn new(config: RemoteConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent, config }
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.config.api_base,
            self.config.repo,
            encode_path(path)
        )
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.config.token)
    }
}

impl GithubContentsStore {
    fn get_contents(&self, path: &str) -> Result<ContentsResponse> {
        let mut request = self
            .agent
            .get(self.contents_url(path))
            .header("Authorization", self.authorization())
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT);
        if let Some(branch) = &self.config.branch {
            request = request.query("ref", branch);
        }
        let mut response = request
            .call()
            .with_context(|| format!("GET contents of {path}"))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(anyhow!(
                "GitHub returned HTTP {status}: {}",
                truncate_string(body.trim(), ERROR_BODY_MAX_BYTES)
            ));
        }
        response
            .body_mut()
            .read_json()
            .context("parse contents response")
    }
}

impl RemoteStore for GithubContentsStore {
    fn describe(&self) -> String {
        format!("github:{}", self.config.repo)
    }

    fn read(&self, path: &str) -> Result<RemoteObject> {
        let contents = self.get_contents(path)?;
        let content = decode_content(&contents.encoding, &contents.content)
            .with_context(|| format!("decode contents of {path}"))?;
        Ok(RemoteObject {
            content,
            marker: contents.sha,
        })
    }

    /// Only the blob `sha` is needed here, so files the API returns without
    /// inline content still yield a marker.
    fn marker(&self, path: &str) -> Result<String> {
        Ok(self.get_contents(path)?.sha)
    }

    fn write(
        &self,
        path: &str,
        content: &[u8],
        marker: &str,
        message: &str,
    ) -> Result<(), WriteRejection> {
        let body = UpdateRequest {
            message,
            content: base64::engine::general_purpose::STANDARD.encode(content),
            sha: marker,
            branch: self.config.branch.as_deref(),
        };
        let mut response = self
            .agent
            .put(self.contents_url(path))
            .header("Authorization", self.authorization())
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .send_json(&body)
            .map_err(|err| WriteRejection::Failed(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string().unwrap_or_default();
        write_outcome(status, &body)
    }
}

/// Percent-encode each segment of a repository path, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode the `content` field of a contents response.
///
/// Files above the API's inline size limit come back with encoding `none`
/// and no content.
fn decode_content(encoding: &str, content: &str) -> Result<Vec<u8>> {
    match encoding {
        "base64" => {
            // GitHub wraps the payload at 60 columns.
            let compact: String = content.chars().filter(|ch| !ch.is_whitespace()).collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact)
                .context("decode base64 content")
        }
        "none" => Err(anyhow!(
            "file is too large to be served inline by the contents API"
        )),
        other => Err(anyhow!("unsupported content encoding {other:?}")),
    }
}

fn write_outcome(status: u16, body: &str) -> Result<(), WriteRejection> {
    match status {
        200 | 201 => Ok(()),
        409 | 412 => Err(WriteRejection::Conflict),
        _ => Err(WriteRejection::Failed(format!(
            "HTTP {status}: {}",
            truncate_string(body.trim(), ERROR_BODY_MAX_BYTES)
        ))),
    }
}
