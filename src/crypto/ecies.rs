// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! secp256k1 ECIES (AES-256-CBC + HMAC-SHA256).
//!
//! Serialized layout, matching what oracle nodes expect:
//!
//! | Offset | Length | Field |
//! |--------|--------|-------|
//! | 0 | 16 | AES-CBC IV |
//! | 16 | 33 | Ephemeral public key (compressed SEC1) |
//! | 49 | 32 | HMAC-SHA256 tag |
//! | 81 | n | Ciphertext (PKCS#7 padded) |
//!
//! Key derivation: `SHA-512(ECDH x-coordinate)`, first half is the AES key,
//! second half the MAC key. The MAC covers `iv || ephemeral (uncompressed) || ciphertext`.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use k256::{
    ecdh::diffie_hellman,
    elliptic_curve::{
        rand_core::{OsRng, RngCore},
        sec1::ToEncodedPoint,
    },
    PublicKey, SecretKey,
};
use sha2::{Digest, Sha256, Sha512};

use super::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

const IV_LEN: usize = 16;
const EPHEMERAL_KEY_LEN: usize = 33;
const MAC_LEN: usize = 32;
const HEADER_LEN: usize = IV_LEN + EPHEMERAL_KEY_LEN + MAC_LEN;

/// Parse a recipient public key.
///
/// Accepts the 64-byte `x || y` form returned by the oracle contract as well as
/// 65-byte uncompressed and 33-byte compressed SEC1 encodings.
pub fn parse_public_key(raw: &[u8]) -> Result<PublicKey, CryptoError> {
    let parsed = match raw.len() {
        64 => {
            let mut sec1 = Vec::with_capacity(65);
            sec1.push(0x04);
            sec1.extend_from_slice(raw);
            PublicKey::from_sec1_bytes(&sec1)
        }
        33 | 65 => PublicKey::from_sec1_bytes(raw),
        len => {
            return Err(CryptoError::InvalidPublicKey(format!(
                "unexpected key length {len}"
            )))
        }
    };
    parsed.map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

/// Encrypt `message` for the holder of `public_key`.
///
/// Encryption is randomized: every call uses a fresh ephemeral key and IV.
pub fn encrypt(public_key: &[u8], message: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let recipient = parse_public_key(public_key)?;

    let ephemeral = SecretKey::random(&mut OsRng);
    let ephemeral_public = ephemeral.public_key();
    let (enc_key, mac_key) = derive_keys(&ephemeral, &recipient);

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new_from_slices(&enc_key, &iv)
        .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?
        .encrypt_padded_vec_mut::<Pkcs7>(message);

    let uncompressed = ephemeral_public.to_encoded_point(false);
    let tag = mac_for(&mac_key, &iv, uncompressed.as_bytes(), &ciphertext)?
        .finalize()
        .into_bytes();

    let compressed = ephemeral_public.to_encoded_point(true);

    let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(compressed.as_bytes());
    out.extend_from_slice(&tag);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a payload produced by [`encrypt`] with the recipient's secret key.
///
/// The MAC is verified before any decryption is attempted.
pub fn decrypt(secret_key: &SecretKey, payload: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if payload.len() < HEADER_LEN {
        return Err(CryptoError::MalformedCiphertext(format!(
            "payload is {} bytes, expected at least {HEADER_LEN}",
            payload.len()
        )));
    }

    let (iv, rest) = payload.split_at(IV_LEN);
    let (ephemeral_bytes, rest) = rest.split_at(EPHEMERAL_KEY_LEN);
    let (tag, ciphertext) = rest.split_at(MAC_LEN);

    let ephemeral_public = PublicKey::from_sec1_bytes(ephemeral_bytes)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("ephemeral key: {e}")))?;
    let (enc_key, mac_key) = derive_keys(secret_key, &ephemeral_public);

    let uncompressed = ephemeral_public.to_encoded_point(false);
    mac_for(&mac_key, iv, uncompressed.as_bytes(), ciphertext)?
        .verify_slice(tag)
        .map_err(|_| CryptoError::MacMismatch)?;

    Aes256CbcDec::new_from_slices(&enc_key, iv)
        .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|e| CryptoError::MalformedCiphertext(format!("padding: {e}")))
}

fn derive_keys(secret: &SecretKey, public: &PublicKey) -> ([u8; 32], [u8; 32]) {
    let shared = diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    let digest = Sha512::digest(shared.raw_secret_bytes());

    let mut enc_key = [0u8; 32];
    let mut mac_key = [0u8; 32];
    enc_key.copy_from_slice(&digest[..32]);
    mac_key.copy_from_slice(&digest[32..]);
    (enc_key, mac_key)
}

fn mac_for(
    mac_key: &[u8],
    iv: &[u8],
    ephemeral_uncompressed: &[u8],
    ciphertext: &[u8],
) -> Result<HmacSha256, CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key)
        .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;
    mac.update(iv);
    mac.update(ephemeral_uncompressed);
    mac.update(ciphertext);
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypair() -> (SecretKey, Vec<u8>) {
        let secret = SecretKey::random(&mut OsRng);
        // Oracle contracts publish the key without the 0x04 prefix.
        let raw = secret.public_key().to_encoded_point(false).as_bytes()[1..].to_vec();
        (secret, raw)
    }

    #[test]
    fn round_trip_recovers_the_message() {
        let (secret, public) = keypair();
        for message in [
            b"".as_slice(),
            b"{\"dhlKey\":\"k\"}".as_slice(),
            &[0u8, 255, 1, 254, 16, 17, 18][..],
            &[7u8; 1000][..],
        ] {
            let sealed = encrypt(&public, message).unwrap();
            assert_eq!(decrypt(&secret, &sealed).unwrap(), message);
        }
    }

    #[test]
    fn encryption_is_randomized() {
        let (_, public) = keypair();
        let first = encrypt(&public, b"same").unwrap();
        let second = encrypt(&public, b"same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn layout_has_compressed_ephemeral_key_and_padded_body() {
        let (_, public) = keypair();
        let sealed = encrypt(&public, b"0123456789").unwrap();
        assert_eq!(sealed.len(), HEADER_LEN + 16);
        assert!(matches!(sealed[IV_LEN], 0x02 | 0x03));
    }

    #[test]
    fn accepts_all_public_key_encodings() {
        let (secret, raw) = keypair();
        let uncompressed = secret.public_key().to_encoded_point(false);
        let compressed = secret.public_key().to_encoded_point(true);
        for key in [raw.as_slice(), uncompressed.as_bytes(), compressed.as_bytes()] {
            let sealed = encrypt(key, b"hello").unwrap();
            assert_eq!(decrypt(&secret, &sealed).unwrap(), b"hello");
        }
    }

    #[test]
    fn malformed_public_key_is_rejected() {
        assert!(matches!(
            encrypt(&[1, 2, 3], b"x"),
            Err(CryptoError::InvalidPublicKey(_))
        ));
        assert!(matches!(
            encrypt(&[0u8; 64], b"x"),
            Err(CryptoError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let (secret, public) = keypair();
        let mut sealed = encrypt(&public, b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(decrypt(&secret, &sealed), Err(CryptoError::MacMismatch)));
    }

    #[test]
    fn wrong_recipient_cannot_decrypt() {
        let (_, public) = keypair();
        let (other, _) = keypair();
        let sealed = encrypt(&public, b"secret").unwrap();
        assert!(decrypt(&other, &sealed).is_err());
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let (secret, _) = keypair();
        assert!(matches!(
            decrypt(&secret, &[0u8; 10]),
            Err(CryptoError::MalformedCiphertext(_))
        ));
    }
}
