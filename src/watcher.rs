// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Fulfillment Watcher
//!
//! Waits for the oracle network to answer one request.
//!
//! ## Strategy
//!
//! Event listeners installed by [`FulfillmentWatcher::subscribe`] record
//! outcomes into a [`CorrelationTable`]. The watch loop then races:
//! 1. a fixed-interval poll of the table for the watched request identifier,
//! 2. the fulfillment deadline,
//! 3. an optional shutdown token,
//! 4. loss of the event source (for example a filter dropped by the node).
//!
//! The first branch to settle ends the loop. The poll branch is checked first,
//! so an outcome already recorded when the deadline fires still wins. After
//! the loop the listeners are detached and the cleanup coordinator runs; its
//! latch keeps deletion to one call even if another path also cleans up.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cleanup::CleanupCoordinator;
use crate::correlation::CorrelationTable;
use crate::error::{WorkflowError, WorkflowResult};
use crate::oracle::{ChainError, EventSubscription, OracleLedger};
use crate::types::{FulfillmentRecord, PendingRequestState, RequestId, WatchState};

/// Default interval between correlation table checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default fulfillment deadline.
pub const DEFAULT_FULFILLMENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Shortest accepted poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Timing of the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_FULFILLMENT_TIMEOUT,
        }
    }
}

pub struct FulfillmentWatcher {
    ledger: Arc<dyn OracleLedger>,
    table: CorrelationTable,
    settings: WatchSettings,
    shutdown: CancellationToken,
}

impl FulfillmentWatcher {
    /// Poll intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn new(ledger: Arc<dyn OracleLedger>, mut settings: WatchSettings) -> Self {
        if settings.poll_interval < MIN_POLL_INTERVAL {
            warn!(
                poll_interval_ms = settings.poll_interval.as_millis() as u64,
                "Poll interval too short, using {}ms",
                MIN_POLL_INTERVAL.as_millis()
            );
            settings.poll_interval = MIN_POLL_INTERVAL;
        }
        Self {
            ledger,
            table: CorrelationTable::new(),
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    /// Abort the watch with [`WorkflowError::Cancelled`] when `shutdown` fires.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn table(&self) -> &CorrelationTable {
        &self.table
    }

    /// Install fulfillment listeners.
    ///
    /// Called before the request is submitted so that no event is missed.
    pub async fn subscribe(&self) -> WorkflowResult<EventSubscription> {
        Ok(self.ledger.subscribe_fulfillments(self.table.clone()).await?)
    }

    /// Wait for the outcome of `request_id`.
    ///
    /// Whatever the outcome, `subscription` is detached and `cleanup` has run
    /// by the time this returns.
    pub async fn watch(
        &self,
        request_id: RequestId,
        subscription: EventSubscription,
        cleanup: &CleanupCoordinator,
    ) -> WorkflowResult<FulfillmentRecord> {
        let started = Instant::now();
        self.table.focus(request_id);
        let source_lost = subscription.ended();
        let mut pending = PendingRequestState::new(request_id, started + self.settings.timeout);
        info!(
            request_id = %request_id,
            timeout_secs = self.settings.timeout.as_secs(),
            "Waiting for fulfillment"
        );

        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = tokio::time::sleep_until(pending.deadline);
        tokio::pin!(deadline);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = ticker.tick() => {
                    if let Some(record) = self.table.take(&request_id) {
                        break Ok(record);
                    }
                    debug!(request_id = %request_id, "No fulfillment recorded yet");
                }
                _ = &mut deadline => {
                    break match self.table.take(&request_id) {
                        Some(record) => Ok(record),
                        None => Err(WorkflowError::Timeout { after: self.settings.timeout }),
                    };
                }
                _ = self.shutdown.cancelled() => {
                    break Err(WorkflowError::Cancelled);
                }
                _ = source_lost.cancelled() => {
                    break match self.table.take(&request_id) {
                        Some(record) => Ok(record),
                        None => Err(WorkflowError::Chain(ChainError::RpcError(
                            "fulfillment event stream ended before an outcome was recorded"
                                .to_string(),
                        ))),
                    };
                }
            }
        };

        subscription.unsubscribe();

        pending.state = settled_state(&outcome);
        match &outcome {
            Ok(_) => info!(
                request_id = %request_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Fulfillment received"
            ),
            Err(e) => warn!(request_id = %request_id, error = %e, "Stopped waiting for fulfillment"),
        }

        cleanup.cleanup().await;
        pending.cleanup_done = true;
        debug!(
            request_id = %pending.request_id,
            state = ?pending.state,
            cleanup_done = pending.cleanup_done,
            "Watch finished"
        );

        outcome
    }
}

fn settled_state(outcome: &WorkflowResult<FulfillmentRecord>) -> WatchState {
    match outcome {
        Ok(_) => WatchState::Fulfilled,
        Err(WorkflowError::Timeout { .. }) => WatchState::TimedOut,
        Err(_) => WatchState::Aborted,
    }
}
