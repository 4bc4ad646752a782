// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encryption provider for request secrets.
//!
//! - `ecies` - secp256k1 ECIES compatible with the oracle network's decryptor
//! - `signing` - signer key parsing and signed-then-encrypted payloads

pub mod ecies;
pub mod signing;

pub use ecies::{decrypt, encrypt, parse_public_key};
pub use signing::{parse_signer_key, sign_and_encrypt};

/// Errors raised by the encryption provider.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("Ciphertext authentication failed")]
    MacMismatch,

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Payload serialization failed: {0}")]
    Serialization(String),
}
