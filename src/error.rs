// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Workflow error taxonomy.
//!
//! Every fatal category aborts the request lifecycle. Artifact deletion is the
//! only failure absorbed locally (see [`crate::cleanup`]).

use std::time::Duration;

use crate::crypto::CryptoError;
use crate::oracle::ChainError;

/// Which callback path reported the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackFailure {
    /// The consumer contract's fulfillment handler reverted with a reason.
    UserCallback,
    /// The fulfillment handler failed without a decodable reason.
    UserCallbackRaw,
}

impl std::fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackFailure::UserCallback => write!(f, "user callback error"),
            CallbackFailure::UserCallbackRaw => write!(f, "user callback raw error"),
        }
    }
}

/// Errors that abort a single request lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Secret store authentication failed: {0}")]
    Auth(String),

    #[error("Secret store token scope rejected: {0}")]
    Scope(String),

    #[error("Secret store operation failed: {0}")]
    Store(String),

    #[error("Failed to fetch off-chain secrets from {url}: {reason}")]
    SecretsFetch { url: String, reason: String },

    #[error(
        "Off-chain secrets URLs {url} and {reference} do not contain the same JSON object; \
         all secrets URLs must serve an identical object"
    )]
    Consistency { url: String, reference: String },

    #[error("No secrets specified for node {node} and no default secrets found")]
    Coverage { node: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Callback execution failed ({kind}): {message}")]
    CallbackExecution {
        kind: CallbackFailure,
        message: String,
    },

    #[error("Fulfillment deadline exceeded after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("Interrupted while waiting for fulfillment")]
    Cancelled,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl WorkflowError {
    /// `true` when the oracle network answered but the consumer callback failed.
    ///
    /// These are reported to the operator but do not indicate a broken
    /// request lifecycle.
    pub fn is_callback_failure(&self) -> bool {
        matches!(self, WorkflowError::CallbackExecution { .. })
    }
}

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
