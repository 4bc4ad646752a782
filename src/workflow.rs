// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One request lifecycle: resolve secrets, submit, watch, clean up.

use std::sync::Arc;

use alloy::signers::local::PrivateKeySigner;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cleanup::CleanupCoordinator;
use crate::error::WorkflowResult;
use crate::fulfillment::{classify, FulfillmentReport};
use crate::oracle::OracleLedger;
use crate::resolver::SecretsResolver;
use crate::store::ArtifactStore;
use crate::submitter::RequestSubmitter;
use crate::types::{EncryptedPayload, FulfillmentRecord, RequestId, RequestParams, SecretsInput};
use crate::watcher::{FulfillmentWatcher, WatchSettings};

pub struct RequestWorkflow {
    ledger: Arc<dyn OracleLedger>,
    store: Option<Arc<dyn ArtifactStore>>,
    resolver: SecretsResolver,
    submitter: RequestSubmitter,
    watcher: FulfillmentWatcher,
}

impl RequestWorkflow {
    /// `store` and `signer` are only required for inline secrets.
    pub fn new(
        ledger: Arc<dyn OracleLedger>,
        store: Option<Arc<dyn ArtifactStore>>,
        signer: Option<PrivateKeySigner>,
        settings: WatchSettings,
    ) -> WorkflowResult<Self> {
        Ok(Self {
            resolver: SecretsResolver::new(ledger.clone(), store.clone(), signer)?,
            submitter: RequestSubmitter::new(ledger.clone()),
            watcher: FulfillmentWatcher::new(ledger.clone(), settings),
            ledger,
            store,
        })
    }

    /// Stop waiting for fulfillment when `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.watcher = self.watcher.with_shutdown(shutdown);
        self
    }

    pub fn resolver(&self) -> &SecretsResolver {
        &self.resolver
    }

    /// Run the request to completion.
    ///
    /// Any artifact created for inline secrets is deleted exactly once before
    /// this returns, whether the request succeeded, failed or timed out.
    pub async fn run(
        &self,
        params: &RequestParams,
        secrets: Option<&SecretsInput>,
    ) -> WorkflowResult<FulfillmentReport> {
        let balance = self.ledger.consumer_balance().await?;
        info!(balance = %balance, "Consumer contract balance");

        let resolved = self.resolver.resolve(secrets).await?;
        let cleanup = match (&self.store, resolved.artifact) {
            (Some(store), Some(handle)) => CleanupCoordinator::for_artifact(store.clone(), handle),
            _ => CleanupCoordinator::noop(),
        };

        let outcome = self
            .submit_and_watch(params, resolved.payload.as_ref(), &cleanup)
            .await;
        cleanup.cleanup().await;

        let (request_id, record) = outcome?;
        classify(request_id, record)
    }

    async fn submit_and_watch(
        &self,
        params: &RequestParams,
        payload: Option<&EncryptedPayload>,
        cleanup: &CleanupCoordinator,
    ) -> WorkflowResult<(RequestId, FulfillmentRecord)> {
        let subscription = self.watcher.subscribe().await?;
        let request_id = self.submitter.submit(params, payload).await?;
        let record = self.watcher.watch(request_id, subscription, cleanup).await?;
        Ok((request_id, record))
    }
}
