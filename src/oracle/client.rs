// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! alloy-backed oracle ledger over HTTP JSON-RPC.

use std::time::Duration;

use alloy::{
    eips::BlockNumberOrTag,
    network::EthereumWallet,
    primitives::{Address, Bytes, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{Filter, Log},
    signers::local::PrivateKeySigner,
    sol_types::SolEvent,
};
use async_trait::async_trait;
use futures::StreamExt as _;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::contracts::{IFunctionsOracle, ITrackingConsumer};
use super::{ChainError, ContractEvent, EventSubscription, OracleLedger, SubmissionReceipt};
use crate::correlation::CorrelationTable;
use crate::types::{RequestId, RequestParams};

/// Default interval between `eth_getFilterChanges` polls.
const DEFAULT_EVENT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Ledger client for one oracle contract and one consumer contract.
pub struct AlloyOracleLedger {
    provider: DynProvider,
    oracle_address: Address,
    consumer_address: Address,
    event_poll_interval: Duration,
}

impl AlloyOracleLedger {
    /// Connect to `rpc_url`, signing submissions with `signer`.
    pub fn connect(
        rpc_url: &str,
        signer: PrivateKeySigner,
        oracle_address: Address,
        consumer_address: Address,
    ) -> Result<Self, ChainError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self {
            provider,
            oracle_address,
            consumer_address,
            event_poll_interval: DEFAULT_EVENT_POLL_INTERVAL,
        })
    }

    /// Override the event filter poll interval.
    pub fn with_event_poll_interval(mut self, interval: Duration) -> Self {
        self.event_poll_interval = interval;
        self
    }
}

#[async_trait]
impl OracleLedger for AlloyOracleLedger {
    async fn public_key(&self) -> Result<Bytes, ChainError> {
        IFunctionsOracle::new(self.oracle_address, self.provider.clone())
            .getDONPublicKey()
            .call()
            .await
            .map_err(|e| ChainError::ContractError(format!("getDONPublicKey: {e}")))
    }

    async fn node_addresses(&self) -> Result<Vec<Address>, ChainError> {
        let nodes = IFunctionsOracle::new(self.oracle_address, self.provider.clone())
            .getAllNodePublicKeys()
            .call()
            .await
            .map_err(|e| ChainError::ContractError(format!("getAllNodePublicKeys: {e}")))?;
        Ok(nodes._0)
    }

    async fn submit_request(
        &self,
        params: &RequestParams,
        secrets: Bytes,
    ) -> Result<SubmissionReceipt, ChainError> {
        let consumer = ITrackingConsumer::new(self.consumer_address, self.provider.clone());

        let pending = consumer
            .executeRequest(
                params.source.clone(),
                secrets,
                params.args.clone(),
                params.subscription_id,
                params.callback_gas_limit,
            )
            .gas(params.tx_gas_limit)
            .send()
            .await
            .map_err(|e| ChainError::TransactionFailed(format!("Failed to send: {e}")))?;

        let tx_hash = *pending.tx_hash();
        info!(
            tx_hash = %tx_hash,
            confirmations = params.confirmations,
            "Waiting {} blocks for transaction {} to be confirmed",
            params.confirmations,
            tx_hash
        );

        let receipt = pending
            .with_required_confirmations(params.confirmations)
            .get_receipt()
            .await
            .map_err(|e| ChainError::RpcError(format!("Failed to get receipt: {e}")))?;

        let events = receipt.inner.logs().iter().map(decode_event).collect();

        Ok(SubmissionReceipt {
            tx_hash,
            block_number: receipt.block_number,
            success: receipt.status(),
            events,
        })
    }

    async fn consumer_balance(&self) -> Result<U256, ChainError> {
        self.provider
            .get_balance(self.consumer_address)
            .await
            .map_err(|e| ChainError::RpcError(e.to_string()))
    }

    async fn subscribe_fulfillments(
        &self,
        table: CorrelationTable,
    ) -> Result<EventSubscription, ChainError> {
        let filter = Filter::new()
            .address(vec![self.oracle_address, self.consumer_address])
            .event_signature(vec![
                ITrackingConsumer::OCRResponse::SIGNATURE_HASH,
                IFunctionsOracle::UserCallbackError::SIGNATURE_HASH,
                IFunctionsOracle::UserCallbackRawError::SIGNATURE_HASH,
            ])
            .from_block(BlockNumberOrTag::Latest);

        let poller = self
            .provider
            .watch_logs(&filter)
            .await
            .map_err(|e| ChainError::RpcError(format!("Failed to install log filter: {e}")))?;
        let mut stream = poller
            .with_poll_interval(self.event_poll_interval)
            .into_stream();

        let ended = CancellationToken::new();
        let listener = tokio::spawn({
            let ended = ended.clone();
            async move {
                while let Some(logs) = stream.next().await {
                    for log in &logs {
                        if let Some((id, record)) = decode_event(log).into_fulfillment() {
                            table.record(id, record);
                        }
                    }
                }
                // The poller stops when the node drops the filter.
                warn!("Fulfillment log stream ended");
                ended.cancel();
            }
        });

        Ok(EventSubscription::new(vec![listener], ended))
    }
}

fn decode_event(log: &Log) -> ContractEvent {
    match log.topic0() {
        Some(&ITrackingConsumer::RequestSent::SIGNATURE_HASH) => {
            match log.log_decode::<ITrackingConsumer::RequestSent>() {
                Ok(decoded) => ContractEvent::RequestAccepted {
                    id: RequestId(decoded.inner.data.id),
                },
                Err(e) => undecodable("RequestSent", e),
            }
        }
        Some(&ITrackingConsumer::OCRResponse::SIGNATURE_HASH) => {
            match log.log_decode::<ITrackingConsumer::OCRResponse>() {
                Ok(decoded) => {
                    let data = decoded.inner.data;
                    ContractEvent::ResponseReceived {
                        id: RequestId(data.requestId),
                        response: data.result,
                        error: data.err,
                    }
                }
                Err(e) => undecodable("OCRResponse", e),
            }
        }
        Some(&IFunctionsOracle::UserCallbackError::SIGNATURE_HASH) => {
            match log.log_decode::<IFunctionsOracle::UserCallbackError>() {
                Ok(decoded) => {
                    let data = decoded.inner.data;
                    ContractEvent::CallbackError {
                        id: RequestId(data.requestId),
                        message: data.reason,
                    }
                }
                Err(e) => undecodable("UserCallbackError", e),
            }
        }
        Some(&IFunctionsOracle::UserCallbackRawError::SIGNATURE_HASH) => {
            match log.log_decode::<IFunctionsOracle::UserCallbackRawError>() {
                Ok(decoded) => {
                    let data = decoded.inner.data;
                    ContractEvent::CallbackRawError {
                        id: RequestId(data.requestId),
                        raw: data.lowLevelData,
                    }
                }
                Err(e) => undecodable("UserCallbackRawError", e),
            }
        }
        _ => ContractEvent::Other,
    }
}

fn undecodable(event: &str, error: impl std::fmt::Display) -> ContractEvent {
    warn!(event, error = %error, "Failed to decode contract event");
    ContractEvent::Other
}
