// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Correlation table between fulfillment events and watched requests.
//!
//! Event listeners are producers, the watcher is the sole consumer. The first
//! record for a request identifier wins; anything arriving afterwards for the
//! same identifier, including after the watcher took the record, is dropped.
//! Once the watched identifier is known, records for other requests sharing
//! the oracle are discarded.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::types::{FulfillmentRecord, RequestId};

#[derive(Default)]
struct TableState {
    records: HashMap<RequestId, FulfillmentRecord>,
    retired: HashSet<RequestId>,
    watched: Option<RequestId>,
}

/// Shared map of request identifier to fulfillment outcome.
#[derive(Clone, Default)]
pub struct CorrelationTable {
    state: Arc<Mutex<TableState>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        // The map stays consistent even if a holder panicked mid-insert.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Restrict the table to `id`, discarding records for other requests.
    pub fn focus(&self, id: RequestId) {
        let mut state = self.lock();
        state.records.retain(|key, _| *key == id);
        state.watched = Some(id);
    }

    /// Record an outcome for `id`.
    ///
    /// Returns `false` when a record already exists or was already consumed,
    /// or when the table is focused on another request.
    pub fn record(&self, id: RequestId, record: FulfillmentRecord) -> bool {
        let mut state = self.lock();
        if state.watched.is_some_and(|watched| watched != id) {
            debug!(request_id = %id, "Ignoring fulfillment for another request");
            return false;
        }
        if state.retired.contains(&id) || state.records.contains_key(&id) {
            warn!(request_id = %id, "Ignoring duplicate fulfillment event");
            return false;
        }
        state.records.insert(id, record);
        true
    }

    /// Take the outcome for `id`, retiring the key.
    pub fn take(&self, id: &RequestId) -> Option<FulfillmentRecord> {
        let mut state = self.lock();
        let record = state.records.remove(id)?;
        state.retired.insert(*id);
        Some(record)
    }
}
