// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request lifecycle types.

use std::collections::BTreeMap;
use std::fmt;
use tokio::time::Instant;

use alloy::primitives::{Bytes, B256};

/// Secrets supplied for one request.
///
/// Exactly one shape is used per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretsInput {
    /// Key/value secrets delivered encrypted through a temporary artifact.
    Inline(BTreeMap<String, String>),
    /// URLs that already host encrypted per-node secrets.
    Remote(Vec<String>),
}

/// Where the encrypted payload points the oracle network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsOrigin {
    Inline,
    Remote,
}

/// Encrypted secrets reference handed to the consumer contract.
///
/// Created once by the resolver and consumed once by the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    bytes: Bytes,
    origin: SecretsOrigin,
}

impl EncryptedPayload {
    pub fn new(bytes: impl Into<Bytes>, origin: SecretsOrigin) -> Self {
        Self {
            bytes: bytes.into(),
            origin,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn origin(&self) -> SecretsOrigin {
        self.origin
    }
}

/// Identifier and locator of a temporary remote secrets artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub id: String,
    pub url: String,
}

impl ArtifactHandle {
    /// Derive the handle from the artifact's locator URL.
    ///
    /// The identifier is the trailing hexadecimal path segment.
    pub fn from_url(url: &str) -> Option<Self> {
        let id = url.trim_end_matches('/').rsplit('/').next()?;
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self {
            id: id.to_string(),
            url: url.to_string(),
        })
    }

    /// URL serving the artifact's raw content.
    pub fn raw_url(&self) -> String {
        format!("{}/raw", self.url.trim_end_matches('/'))
    }
}

/// Correlation key assigned by the oracle network to an accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub B256);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome delivered by the oracle network for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentRecord {
    /// The consumer received a response; `error` is non-empty when the
    /// off-chain source threw.
    Success { response: Bytes, error: Bytes },
    /// The consumer's fulfillment handler reverted with a reason.
    UserCallbackError { message: String },
    /// The consumer's fulfillment handler failed with undecodable data.
    UserCallbackRawError { raw: Bytes },
}

/// Watcher state while a request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Waiting,
    Fulfilled,
    TimedOut,
    /// Stopped by shutdown or by loss of the event source.
    Aborted,
}

/// Bookkeeping for the request currently being watched.
#[derive(Debug, Clone)]
pub struct PendingRequestState {
    pub request_id: RequestId,
    pub deadline: Instant,
    pub cleanup_done: bool,
    pub state: WatchState,
}

impl PendingRequestState {
    pub fn new(request_id: RequestId, deadline: Instant) -> Self {
        Self {
            request_id,
            deadline,
            cleanup_done: false,
            state: WatchState::Waiting,
        }
    }
}

/// Parameters for the consumer contract's request entry point.
#[derive(Debug, Clone)]
pub struct RequestParams {
    /// JavaScript source executed by the oracle network.
    pub source: String,
    /// Positional arguments passed to the source.
    pub args: Vec<String>,
    pub subscription_id: u64,
    /// Gas available to the consumer's fulfillment callback.
    pub callback_gas_limit: u32,
    /// Gas limit of the submission transaction itself.
    pub tx_gas_limit: u64,
    pub confirmations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_handle_parses_trailing_hex_id() {
        let handle =
            ArtifactHandle::from_url("https://gist.github.com/someone/0f1e2d3c4b5a").unwrap();
        assert_eq!(handle.id, "0f1e2d3c4b5a");
        assert_eq!(
            handle.raw_url(),
            "https://gist.github.com/someone/0f1e2d3c4b5a/raw"
        );
    }

    #[test]
    fn artifact_handle_rejects_non_hex_id() {
        assert!(ArtifactHandle::from_url("https://gist.github.com/someone/profile").is_none());
        assert!(ArtifactHandle::from_url("").is_none());
    }

    #[test]
    fn payload_keeps_origin() {
        let payload = EncryptedPayload::new(vec![1u8, 2, 3], SecretsOrigin::Remote);
        assert_eq!(payload.origin(), SecretsOrigin::Remote);
        assert_eq!(payload.bytes().as_ref(), &[1, 2, 3]);
    }
}
