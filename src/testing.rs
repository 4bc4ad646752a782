// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory collaborators shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use k256::{
    elliptic_curve::{rand_core::OsRng, sec1::ToEncodedPoint},
    SecretKey,
};
use tokio_util::sync::CancellationToken;

use crate::correlation::CorrelationTable;
use crate::error::{WorkflowError, WorkflowResult};
use crate::oracle::{ChainError, ContractEvent, EventSubscription, OracleLedger, SubmissionReceipt};
use crate::store::ArtifactStore;
use crate::types::{ArtifactHandle, FulfillmentRecord, RequestId, RequestParams};

pub const ARTIFACT_URL: &str = "https://gist.github.com/tadi/c0ffee42";

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn request_id(n: u8) -> RequestId {
    RequestId(B256::with_last_byte(n))
}

pub fn params() -> RequestParams {
    RequestParams {
        source: "return Functions.encodeString('ok')".to_string(),
        args: vec!["00340434726200036723".to_string()],
        subscription_id: 1305,
        callback_gas_limit: 300_000,
        tx_gas_limit: 12_000_000,
        confirmations: 2,
    }
}

pub struct MockStore {
    pub scope_minimal: bool,
    pub scope_error: Option<String>,
    pub delete_ok: bool,
    pub delete_delay: Option<Duration>,
    pub verifies: AtomicUsize,
    pub creates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub contents: Mutex<Vec<String>>,
}

impl Default for MockStore {
    fn default() -> Self {
        Self {
            scope_minimal: true,
            scope_error: None,
            delete_ok: true,
            delete_delay: None,
            verifies: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            contents: Mutex::new(Vec::new()),
        }
    }
}

impl MockStore {
    pub fn handle(&self) -> ArtifactHandle {
        ArtifactHandle::from_url(ARTIFACT_URL).unwrap()
    }
}

#[async_trait]
impl ArtifactStore for MockStore {
    async fn verify_access_scope(&self) -> WorkflowResult<bool> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        match &self.scope_error {
            Some(message) => Err(WorkflowError::Scope(message.clone())),
            None => Ok(self.scope_minimal),
        }
    }

    async fn create_artifact(&self, content: &str) -> WorkflowResult<ArtifactHandle> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.contents.lock().unwrap().push(content.to_string());
        Ok(self.handle())
    }

    async fn delete_artifact(&self, _handle: &ArtifactHandle) -> bool {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delete_delay {
            tokio::time::sleep(delay).await;
        }
        self.delete_ok
    }
}

/// Ledger double: fixed oracle key and nodes, scripted receipt and events.
pub struct MockLedger {
    pub oracle_key: SecretKey,
    pub nodes: Vec<Address>,
    pub receipt_events: Vec<ContractEvent>,
    pub receipt_success: bool,
    /// Events delivered to subscribers after the given delay.
    pub scheduled: Vec<(Duration, RequestId, FulfillmentRecord)>,
    /// When set, the event source is lost after this delay.
    pub source_lost_after: Option<Duration>,
    pub calls: AtomicUsize,
    pub submitted: Mutex<Vec<Bytes>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self {
            oracle_key: SecretKey::random(&mut OsRng),
            nodes: Vec::new(),
            receipt_events: Vec::new(),
            receipt_success: true,
            scheduled: Vec::new(),
            source_lost_after: None,
            calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }
}

impl MockLedger {
    pub fn accepting(id: RequestId) -> Self {
        Self {
            receipt_events: vec![ContractEvent::Other, ContractEvent::RequestAccepted { id }],
            ..Default::default()
        }
    }

    pub fn with_event(mut self, after: Duration, id: RequestId, record: FulfillmentRecord) -> Self {
        self.scheduled.push((after, id, record));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn raw_public_key(&self) -> Vec<u8> {
        self.oracle_key.public_key().to_encoded_point(false).as_bytes()[1..].to_vec()
    }
}

#[async_trait]
impl OracleLedger for MockLedger {
    async fn public_key(&self) -> Result<Bytes, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from(self.raw_public_key()))
    }

    async fn node_addresses(&self) -> Result<Vec<Address>, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.nodes.clone())
    }

    async fn submit_request(
        &self,
        _params: &RequestParams,
        secrets: Bytes,
    ) -> Result<SubmissionReceipt, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(secrets);
        Ok(SubmissionReceipt {
            tx_hash: B256::repeat_byte(0xab),
            block_number: Some(42),
            success: self.receipt_success,
            events: self.receipt_events.clone(),
        })
    }

    async fn consumer_balance(&self) -> Result<U256, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(U256::from(1_000_000_000_000_000_000u64))
    }

    async fn subscribe_fulfillments(
        &self,
        table: CorrelationTable,
    ) -> Result<EventSubscription, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let ended = CancellationToken::new();
        let mut tasks: Vec<_> = self
            .scheduled
            .iter()
            .cloned()
            .map(|(after, id, record)| {
                let table = table.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    table.record(id, record);
                })
            })
            .collect();
        if let Some(after) = self.source_lost_after {
            let ended = ended.clone();
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(after).await;
                ended.cancel();
            }));
        }
        Ok(EventSubscription::new(tasks, ended))
    }
}
