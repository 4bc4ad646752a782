// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use tadi_oracle_client::{
    config::{AppConfig, LogFormat},
    crypto::parse_signer_key,
    error::{WorkflowError, WorkflowResult},
    fulfillment::FulfillmentReport,
    logging,
    oracle::{AlloyOracleLedger, OracleLedger},
    store::{ArtifactStore, GistClient},
    workflow::RequestWorkflow,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init(LogFormat::from_env());

    match run().await {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) if e.is_callback_failure() => {
            warn!(error = %e, "Request completed but the consumer callback failed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Request failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> WorkflowResult<FulfillmentReport> {
    let config = AppConfig::from_env()?;
    info!(
        oracle = %config.oracle_address,
        consumer = %config.consumer_address,
        subscription_id = config.subscription_id,
        "Starting tracking request"
    );

    let signer = parse_signer_key(&config.private_key)?;
    let ledger: Arc<dyn OracleLedger> = Arc::new(
        AlloyOracleLedger::connect(
            &config.rpc_url,
            signer.clone(),
            config.oracle_address,
            config.consumer_address,
        )?
        .with_event_poll_interval(config.watch.poll_interval),
    );

    let store: Option<Arc<dyn ArtifactStore>> = match &config.store_token {
        Some(token) => Some(Arc::new(GistClient::new(
            token.clone(),
            config.store_api_url.clone(),
        )?)),
        None => None,
    };

    let source = tokio::fs::read_to_string(&config.source_path)
        .await
        .map_err(|e| {
            WorkflowError::Config(format!("failed to read {}: {e}", config.source_path))
        })?;
    let params = config.request_params(source);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping");
                shutdown.cancel();
            }
        }
    });

    let workflow = RequestWorkflow::new(ledger, store, Some(signer), config.watch)?
        .with_shutdown(shutdown);
    workflow.run(&params, config.secrets.as_ref()).await
}

fn print_report(report: &FulfillmentReport) {
    if let Some(source_error) = &report.error {
        warn!(request_id = %report.request_id, error = %source_error, "Off-chain source reported an error");
    }
    if report.is_empty() {
        info!(request_id = %report.request_id, "Request fulfilled with an empty response");
        return;
    }

    match report.tracking_update() {
        Some(update) => info!(
            request_id = %report.request_id,
            location = %update.location,
            timestamp = update.timestamp,
            observed_at = ?update.observed_at(),
            "Last reported location of the container: {}",
            update.location
        ),
        None => info!(
            request_id = %report.request_id,
            response = %report.response,
            text = ?report.response_text(),
            "Request fulfilled"
        ),
    }
}
