// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request submission and request identifier extraction.

use std::sync::Arc;

use alloy::primitives::Bytes;
use tracing::info;

use crate::error::{WorkflowError, WorkflowResult};
use crate::oracle::{ContractEvent, OracleLedger};
use crate::types::{EncryptedPayload, RequestId, RequestParams};

pub struct RequestSubmitter {
    ledger: Arc<dyn OracleLedger>,
}

impl RequestSubmitter {
    pub fn new(ledger: Arc<dyn OracleLedger>) -> Self {
        Self { ledger }
    }

    /// Submit the request and return the identifier from its `RequestSent` event.
    ///
    /// Blocks until `params.confirmations` confirmations are observed. Without
    /// a payload the empty secrets sentinel (`0x`) is sent.
    pub async fn submit(
        &self,
        params: &RequestParams,
        payload: Option<&EncryptedPayload>,
    ) -> WorkflowResult<RequestId> {
        let secrets = payload
            .map(|p| p.bytes().clone())
            .unwrap_or_else(Bytes::new);

        let receipt = self.ledger.submit_request(params, secrets).await?;

        if !receipt.success {
            return Err(WorkflowError::Protocol(format!(
                "request transaction {} reverted",
                receipt.tx_hash
            )));
        }

        let request_id = receipt
            .events
            .iter()
            .find_map(|event| match event {
                ContractEvent::RequestAccepted { id } => Some(*id),
                _ => None,
            })
            .ok_or_else(|| {
                WorkflowError::Protocol(format!(
                    "transaction {} emitted no RequestSent event",
                    receipt.tx_hash
                ))
            })?;

        info!(
            request_id = %request_id,
            tx_hash = %receipt.tx_hash,
            block = ?receipt.block_number,
            "Request {} initiated in transaction {}",
            request_id,
            receipt.tx_hash
        );
        Ok(request_id)
    }
}
