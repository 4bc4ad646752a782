// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TADI Oracle Client - shipment tracking requests through an oracle network
//!
//! This crate submits an off-chain computation request to a decentralized
//! oracle network, delivers the request's API secrets encrypted (inline via a
//! temporary private artifact, or as remote URLs), waits for fulfillment with
//! a hard deadline and revokes the temporary artifact exactly once.
//!
//! ## Modules
//!
//! - `crypto` - ECIES encryption and signed secret payloads
//! - `store` - Remote secret store (GitHub Gist)
//! - `resolver` - Inline/remote secrets resolution and verification
//! - `oracle` - Oracle and consumer contract integration (alloy)
//! - `submitter` - Request submission and identifier extraction
//! - `correlation` - Event to request correlation table
//! - `watcher` - Fulfillment polling loop with deadline
//! - `cleanup` - One-shot artifact deletion
//! - `fulfillment` - Result classification and tracking decode
//! - `workflow` - One full request lifecycle
//! - `config` - Environment configuration

pub mod cleanup;
pub mod config;
pub mod correlation;
pub mod crypto;
pub mod error;
pub mod fulfillment;
pub mod logging;
pub mod oracle;
pub mod resolver;
pub mod store;
pub mod submitter;
pub mod types;
pub mod watcher;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
