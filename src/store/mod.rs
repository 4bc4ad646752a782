// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote secret store for temporary encrypted-secrets artifacts.

pub mod gist;

use async_trait::async_trait;

use crate::error::WorkflowResult;
use crate::types::ArtifactHandle;

pub use gist::GistClient;

/// A private remote store that can host one encrypted secrets artifact.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Check that the access token grants the secret-management scope.
    ///
    /// Returns `Ok(true)` when the grant is exactly the minimal scope and
    /// `Ok(false)` when extra scopes are present (tolerated, logged).
    async fn verify_access_scope(&self) -> WorkflowResult<bool>;

    /// Create a private artifact holding `content`.
    async fn create_artifact(&self, content: &str) -> WorkflowResult<ArtifactHandle>;

    /// Delete a previously created artifact.
    ///
    /// Never fails: returns `false` when the store did not confirm deletion.
    async fn delete_artifact(&self, handle: &ArtifactHandle) -> bool;
}
