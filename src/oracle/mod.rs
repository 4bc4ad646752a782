// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Oracle network and consumer contract integration.
//!
//! This module provides:
//! - The [`OracleLedger`] seam used by the resolver, submitter and watcher
//! - alloy bindings for the oracle and consumer contracts
//! - An alloy-backed ledger over HTTP JSON-RPC

pub mod client;
pub mod contracts;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::correlation::CorrelationTable;
use crate::types::{FulfillmentRecord, RequestId, RequestParams};

pub use client::AlloyOracleLedger;

/// Errors that can occur during ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Contract error: {0}")]
    ContractError(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

/// Contract events relevant to the request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractEvent {
    /// The oracle network accepted the request (`RequestSent`).
    RequestAccepted { id: RequestId },
    /// The consumer received the response (`OCRResponse`).
    ResponseReceived {
        id: RequestId,
        response: Bytes,
        error: Bytes,
    },
    /// The consumer callback reverted (`UserCallbackError`).
    CallbackError { id: RequestId, message: String },
    /// The consumer callback failed with raw data (`UserCallbackRawError`).
    CallbackRawError { id: RequestId, raw: Bytes },
    /// Any other log emitted by the transaction.
    Other,
}

impl ContractEvent {
    /// Convert a fulfillment-carrying event into its correlation entry.
    pub fn into_fulfillment(self) -> Option<(RequestId, FulfillmentRecord)> {
        match self {
            ContractEvent::ResponseReceived {
                id,
                response,
                error,
            } => Some((id, FulfillmentRecord::Success { response, error })),
            ContractEvent::CallbackError { id, message } => {
                Some((id, FulfillmentRecord::UserCallbackError { message }))
            }
            ContractEvent::CallbackRawError { id, raw } => {
                Some((id, FulfillmentRecord::UserCallbackRawError { raw }))
            }
            ContractEvent::RequestAccepted { .. } | ContractEvent::Other => None,
        }
    }
}

/// Confirmed submission transaction.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    /// Whether the transaction executed without reverting.
    pub success: bool,
    pub events: Vec<ContractEvent>,
}

/// Live fulfillment event listeners.
///
/// Listeners are detached when [`EventSubscription::unsubscribe`] is called
/// or the handle is dropped. A listener whose event source stops delivering
/// cancels the [`EventSubscription::ended`] token.
#[derive(Debug, Default)]
pub struct EventSubscription {
    tasks: Vec<JoinHandle<()>>,
    ended: CancellationToken,
}

impl EventSubscription {
    /// `ended` must be cancelled by a listener that can no longer deliver events.
    pub fn new(tasks: Vec<JoinHandle<()>>, ended: CancellationToken) -> Self {
        Self { tasks, ended }
    }

    /// Token cancelled once the event source is lost.
    pub fn ended(&self) -> CancellationToken {
        self.ended.clone()
    }

    pub fn unsubscribe(mut self) {
        self.abort_all();
    }

    fn abort_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Ledger collaborator used by the request lifecycle.
#[async_trait]
pub trait OracleLedger: Send + Sync {
    /// The oracle network's current encryption public key.
    async fn public_key(&self) -> Result<Bytes, ChainError>;

    /// Addresses of every oracle node.
    async fn node_addresses(&self) -> Result<Vec<Address>, ChainError>;

    /// Submit the request and wait for `params.confirmations` confirmations.
    async fn submit_request(
        &self,
        params: &RequestParams,
        secrets: Bytes,
    ) -> Result<SubmissionReceipt, ChainError>;

    /// Native balance held by the consumer contract.
    async fn consumer_balance(&self) -> Result<U256, ChainError>;

    /// Start listening for fulfillment events, recording each into `table`.
    async fn subscribe_fulfillments(
        &self,
        table: CorrelationTable,
    ) -> Result<EventSubscription, ChainError>;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn only_fulfillment_events_become_records() {
        let id = RequestId(B256::with_last_byte(1));
        assert!(ContractEvent::RequestAccepted { id }.into_fulfillment().is_none());
        assert!(ContractEvent::Other.into_fulfillment().is_none());

        let (got, record) = ContractEvent::CallbackError {
            id,
            message: "reverted".to_string(),
        }
        .into_fulfillment()
        .unwrap();
        assert_eq!(got, id);
        assert_eq!(
            record,
            FulfillmentRecord::UserCallbackError {
                message: "reverted".to_string()
            }
        );
    }

    fn parked_listener() -> (JoinHandle<()>, tokio::sync::oneshot::Receiver<()>) {
        let (guard, probe) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _guard = guard;
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        (task, probe)
    }

    #[tokio::test]
    async fn unsubscribe_aborts_listener_tasks() {
        let (task, probe) = parked_listener();
        EventSubscription::new(vec![task], CancellationToken::new()).unsubscribe();
        // The guard is dropped only when the aborted task is torn down.
        assert!(probe.await.is_err());
    }

    #[tokio::test]
    async fn dropping_the_subscription_detaches_listeners() {
        let (task, probe) = parked_listener();
        drop(EventSubscription::new(vec![task], CancellationToken::new()));
        assert!(probe.await.is_err());
    }
}
