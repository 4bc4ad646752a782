// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-shot deletion of the temporary secrets artifact.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::store::ArtifactStore;
use crate::types::ArtifactHandle;

/// What a call to [`CleanupCoordinator::cleanup`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// No artifact was created for this request.
    NothingToClean,
    Deleted,
    /// The store did not confirm deletion; the failure was logged.
    DeleteFailed,
    /// Another caller already claimed the deletion.
    AlreadyRan,
}

/// Deletes the request's artifact at most once, whoever asks first.
pub struct CleanupCoordinator {
    target: Option<(Arc<dyn ArtifactStore>, ArtifactHandle)>,
    claimed: AtomicBool,
}

impl CleanupCoordinator {
    /// Coordinator for a request that never created an artifact.
    pub fn noop() -> Self {
        Self {
            target: None,
            claimed: AtomicBool::new(false),
        }
    }

    pub fn for_artifact(store: Arc<dyn ArtifactStore>, handle: ArtifactHandle) -> Self {
        Self {
            target: Some((store, handle)),
            claimed: AtomicBool::new(false),
        }
    }

    pub async fn cleanup(&self) -> CleanupOutcome {
        let Some((store, handle)) = &self.target else {
            return CleanupOutcome::NothingToClean;
        };

        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(url = %handle.url, "Artifact cleanup already claimed");
            return CleanupOutcome::AlreadyRan;
        }

        if store.delete_artifact(handle).await {
            CleanupOutcome::Deleted
        } else {
            warn!(url = %handle.url, "Artifact cleanup failed; continuing");
            CleanupOutcome::DeleteFailed
        }
    }
}
