//! Detached OpenPGP signature verification for checksum manifests

use crate::core::error::{Result, SwitchError};
use pgp::{Deserializable, SignedPublicKey, StandaloneSignature};
use std::io::Cursor;

/// Checks a detached signature over `data` with an armored public key
///
/// `Ok(false)` means the signature is well formed but was not made by the key;
/// `Err` means the key or signature could not be decoded at all.
pub trait SignatureVerifier {
    fn verify(&self, data: &[u8], signature: &[u8], public_key: &str) -> Result<bool>;
}

/// `pgp`-backed verifier
///
/// Accepts armored or binary signatures and tries the primary key before each
/// subkey, since release signing keys usually sign with a subkey.
#[derive(Debug, Default, Clone, Copy)]
pub struct PgpVerifier;

impl SignatureVerifier for PgpVerifier {
    fn verify(&self, data: &[u8], signature: &[u8], public_key: &str) -> Result<bool> {
        let invalid = |reason: String| SwitchError::SignatureInvalid {
            file: "public key".to_string(),
            reason,
        };

        let (key, _headers) = SignedPublicKey::from_string(public_key)
            .map_err(|e| invalid(format!("cannot parse public key: {}", e)))?;
        let signature = parse_signature(signature)?;

        if signature.verify(&key, data).is_ok() {
            return Ok(true);
        }
        for subkey in &key.public_subkeys {
            if signature.verify(subkey, data).is_ok() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn parse_signature(raw: &[u8]) -> Result<StandaloneSignature> {
    let armored = std::str::from_utf8(raw)
        .ok()
        .filter(|text| text.trim_start().starts_with("-----BEGIN PGP"));

    let parsed = match armored {
        Some(text) => StandaloneSignature::from_string(text).map(|(sig, _)| sig),
        None => StandaloneSignature::from_bytes(Cursor::new(raw)),
    };

    parsed.map_err(|e| SwitchError::SignatureInvalid {
        file: "signature".to_string(),
        reason: format!("cannot parse signature: {}", e),
    })
}
