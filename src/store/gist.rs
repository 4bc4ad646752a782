// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! GitHub Gist backed artifact store.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::ArtifactStore;
use crate::error::{WorkflowError, WorkflowResult};
use crate::types::ArtifactHandle;

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
const GIST_SCOPE: &str = "gist";
const SCOPES_HEADER: &str = "x-oauth-scopes";
const USER_AGENT: &str = "tadi-oracle-client";

#[derive(Debug, Clone)]
pub struct GistClient {
    api_base_url: String,
    token: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct CreatedGist {
    html_url: String,
}

impl GistClient {
    /// Build a client for `api_base_url` authenticated with `token`.
    pub fn new(token: impl Into<String>, api_base_url: impl Into<String>) -> WorkflowResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(WorkflowError::Config(
                "secret store access token is empty".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WorkflowError::Store(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url: api_base_url.into(),
            token: token.trim().to_string(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ArtifactStore for GistClient {
    async fn verify_access_scope(&self) -> WorkflowResult<bool> {
        let response = self
            .http
            .get(self.endpoint("/user"))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| WorkflowError::Auth(format!("identity request failed: {e}")))?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            return Err(WorkflowError::Auth(format!(
                "failed to get user data: {status}"
            )));
        }

        let scopes = response
            .headers()
            .get(SCOPES_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(parse_scopes)
            .unwrap_or_default();

        check_scopes(&scopes)
    }

    async fn create_artifact(&self, content: &str) -> WorkflowResult<ArtifactHandle> {
        let file_name = format!(
            "encrypted-functions-request-data-{}.json",
            chrono::Utc::now().timestamp_millis()
        );
        let body = json!({
            "public": false,
            "files": {
                file_name: { "content": content }
            }
        });

        let response = self
            .http
            .post(self.endpoint("/gists"))
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkflowError::Store(format!("POST /gists failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Store(format!(
                "POST /gists returned {status}: {body}"
            )));
        }

        let created: CreatedGist = response
            .json()
            .await
            .map_err(|e| WorkflowError::Store(format!("POST /gists invalid JSON: {e}")))?;

        let handle = ArtifactHandle::from_url(&created.html_url).ok_or_else(|| {
            WorkflowError::Store(format!(
                "cannot derive gist id from {}",
                created.html_url
            ))
        })?;

        info!(url = %handle.url, "Created encrypted secrets gist");
        Ok(handle)
    }

    async fn delete_artifact(&self, handle: &ArtifactHandle) -> bool {
        let path = format!("/gists/{}", handle.id);
        let result = self
            .http
            .delete(self.endpoint(&path))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await;

        match result {
            Ok(response) if response.status() == StatusCode::NO_CONTENT => {
                info!(url = %handle.url, "Off-chain secrets gist deleted");
                true
            }
            Ok(response) => {
                warn!(
                    url = %handle.url,
                    status = %response.status(),
                    "Failed to delete off-chain secrets gist"
                );
                false
            }
            Err(e) => {
                warn!(url = %handle.url, error = %e, "Error deleting off-chain secrets gist");
                false
            }
        }
    }
}

fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|scope| !scope.is_empty())
        .map(str::to_string)
        .collect()
}

fn check_scopes(scopes: &[String]) -> WorkflowResult<bool> {
    if !scopes.iter().any(|scope| scope == GIST_SCOPE) {
        return Err(WorkflowError::Scope(
            "the provided token does not have permission to read and write gists".to_string(),
        ));
    }

    if scopes.len() > 1 {
        warn!(
            scopes = %scopes.join(", "),
            "The provided token has permissions beyond reading and writing gists"
        );
        return Ok(false);
    }

    Ok(true)
}
