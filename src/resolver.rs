// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Secrets resolution: turns the caller's secrets into the encrypted
//! reference handed to the consumer contract.
//!
//! - Inline secrets are signed, encrypted for the oracle network, published
//!   to a temporary private artifact, and the artifact's raw URL is encrypted.
//! - Remote secrets are fetched from every URL, cross-checked for consistency
//!   and node coverage, and the space-joined URL list is encrypted.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use base64ct::{Base64, Encoding};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::crypto::{self, sign_and_encrypt};
use crate::error::{WorkflowError, WorkflowResult};
use crate::oracle::OracleLedger;
use crate::store::ArtifactStore;
use crate::types::{ArtifactHandle, EncryptedPayload, SecretsInput, SecretsOrigin};

/// Key under which default secrets for every node are published.
pub const DEFAULT_SECRETS_KEY: &str = "0x0";

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_MAX_SECRETS_BYTES: usize = 1_000_000;

/// Outcome of [`SecretsResolver::resolve`].
#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    /// `None` when the request carries no secrets.
    pub payload: Option<EncryptedPayload>,
    /// Temporary artifact created for inline secrets.
    pub artifact: Option<ArtifactHandle>,
}

pub struct SecretsResolver {
    ledger: Arc<dyn OracleLedger>,
    store: Option<Arc<dyn ArtifactStore>>,
    signer: Option<PrivateKeySigner>,
    http: Client,
    max_secrets_bytes: usize,
}

impl SecretsResolver {
    pub fn new(
        ledger: Arc<dyn OracleLedger>,
        store: Option<Arc<dyn ArtifactStore>>,
        signer: Option<PrivateKeySigner>,
    ) -> WorkflowResult<Self> {
        let http = build_fetch_client(DEFAULT_FETCH_TIMEOUT)?;
        Ok(Self {
            ledger,
            store,
            signer,
            http,
            max_secrets_bytes: DEFAULT_MAX_SECRETS_BYTES,
        })
    }

    /// Override the per-URL timeout and response size cap for remote secrets.
    pub fn with_fetch_limits(mut self, timeout: Duration, max_bytes: usize) -> WorkflowResult<Self> {
        self.http = build_fetch_client(timeout)?;
        self.max_secrets_bytes = max_bytes;
        Ok(self)
    }

    pub async fn resolve(&self, secrets: Option<&SecretsInput>) -> WorkflowResult<ResolvedSecrets> {
        match secrets {
            None => Ok(ResolvedSecrets::default()),
            Some(SecretsInput::Inline(values)) => self.resolve_inline(values).await,
            Some(SecretsInput::Remote(urls)) => self.resolve_remote(urls).await,
        }
    }

    async fn resolve_inline(
        &self,
        values: &BTreeMap<String, String>,
    ) -> WorkflowResult<ResolvedSecrets> {
        // Input shape is validated before any network call.
        if values.is_empty() {
            return Err(WorkflowError::Config(
                "inline secrets must contain at least one entry".to_string(),
            ));
        }
        let signer = self.signer.as_ref().ok_or_else(|| {
            WorkflowError::Config("a signer key is required to encrypt inline secrets".to_string())
        })?;
        let store = self.store.as_ref().ok_or_else(|| {
            WorkflowError::Config(
                "a secret store access token is required to publish inline secrets".to_string(),
            )
        })?;

        let public_key = self.ledger.public_key().await?;

        let message = serde_json::to_string(values)
            .map_err(|e| crypto::CryptoError::Serialization(e.to_string()))?;
        let sealed = sign_and_encrypt(signer, &public_key, &message)?;
        let content = json!({ DEFAULT_SECRETS_KEY: Base64::encode_string(&sealed) }).to_string();

        if !store.verify_access_scope().await? {
            debug!("Secret store token carries more than the minimal scope");
        }
        let handle = store.create_artifact(&content).await?;
        info!(url = %handle.url, "Successfully created encrypted secrets artifact");

        match crypto::encrypt(&public_key, handle.raw_url().as_bytes()) {
            Ok(encrypted) => Ok(ResolvedSecrets {
                payload: Some(EncryptedPayload::new(encrypted, SecretsOrigin::Inline)),
                artifact: Some(handle),
            }),
            Err(e) => {
                // Nobody else holds the handle yet, so revoke it here.
                store.delete_artifact(&handle).await;
                Err(e.into())
            }
        }
    }

    async fn resolve_remote(&self, urls: &[String]) -> WorkflowResult<ResolvedSecrets> {
        if urls.is_empty() {
            return Err(WorkflowError::Config(
                "remote secrets must list at least one URL".to_string(),
            ));
        }

        let public_key = self.ledger.public_key().await?;
        let nodes = self.ledger.node_addresses().await?;

        let mut fetched = Vec::with_capacity(urls.len());
        for url in urls {
            let secrets = self.fetch_secrets(url).await?;
            fetched.push((url.as_str(), secrets));
        }
        verify_remote_secrets(&fetched, &nodes)?;
        info!(urls = urls.len(), nodes = nodes.len(), "Verified off-chain secrets");

        let encrypted = crypto::encrypt(&public_key, urls.join(" ").as_bytes())?;
        Ok(ResolvedSecrets {
            payload: Some(EncryptedPayload::new(encrypted, SecretsOrigin::Remote)),
            artifact: None,
        })
    }

    async fn fetch_secrets(&self, url: &str) -> WorkflowResult<Value> {
        let fetch_error = |reason: String| WorkflowError::SecretsFetch {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", response.status())));
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_secrets_bytes as u64)
        {
            return Err(fetch_error(format!(
                "response exceeds {} bytes",
                self.max_secrets_bytes
            )));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| fetch_error(e.to_string()))? {
            if body.len() + chunk.len() > self.max_secrets_bytes {
                return Err(fetch_error(format!(
                    "response exceeds {} bytes",
                    self.max_secrets_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }

        serde_json::from_slice(&body).map_err(|e| fetch_error(format!("invalid JSON: {e}")))
    }
}

fn build_fetch_client(timeout: Duration) -> WorkflowResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| WorkflowError::Config(format!("failed to build HTTP client: {e}")))
}

/// Check that every fetched object is identical to the first one and covers
/// every node, either with a node-specific entry or the default entry.
///
/// Objects are compared in their serialized form, so key order matters.
pub fn verify_remote_secrets(fetched: &[(&str, Value)], nodes: &[Address]) -> WorkflowResult<()> {
    let Some((reference_url, reference)) = fetched.first() else {
        return Ok(());
    };
    let reference_text = reference.to_string();

    for (url, secrets) in fetched {
        if secrets.to_string() != reference_text {
            return Err(WorkflowError::Consistency {
                url: url.to_string(),
                reference: reference_url.to_string(),
            });
        }

        for node in nodes {
            let node_key = node.to_string().to_lowercase();
            if !is_present(secrets.get(&node_key)) && !is_present(secrets.get(DEFAULT_SECRETS_KEY))
            {
                return Err(WorkflowError::Coverage { node: node_key });
            }
        }
    }
    Ok(())
}

/// Null, `false`, `0` and empty strings count as absent.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
