// signature.rs - textual signature token stored as the archive comment
//
// Token format: SIGNATURE_PREFIX followed by standard base64 (with padding)
// of the DER-encoded CMS signature. ':' is outside the base64 alphabet, so a
// prefix can never be mistaken for part of the payload.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;

use crate::crypto::error::CryptoError;
use crate::error::{Error, Result};

pub const SIGNATURE_PREFIX: &str = "signature:";

/// Build the comment token for a raw signature.
pub fn encode(signature: &[u8]) -> String {
    format!("{}{}", SIGNATURE_PREFIX, B64.encode(signature))
}

/// Extract the raw signature from a comment token.
///
/// A comment without the prefix is [`Error::MissingSignature`]; a prefixed
/// payload that is not base64 is a crypto failure.
pub fn decode(token: &str) -> Result<Vec<u8>> {
    let payload = token
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(Error::MissingSignature)?;
    B64.decode(payload)
        .map_err(|e| Error::CryptoOperationFailed(CryptoError::Base64(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_layout() {
        assert_eq!(encode(b"\x30\x03\x02\x01\x01"), "signature:MAMCAQE=");
        assert_eq!(encode(b""), "signature:");
    }

    #[test]
    fn decode_recovers_bytes() {
        let raw: Vec<u8> = (0..=255).collect();
        assert_eq!(decode(&encode(&raw)).unwrap(), raw);
    }

    #[test]
    fn missing_prefix_is_missing_signature() {
        assert!(matches!(decode(""), Err(Error::MissingSignature)));
        assert!(matches!(decode("release 1.2"), Err(Error::MissingSignature)));
        // Valid base64 without the prefix is still not a signature.
        assert!(matches!(decode("MAMCAQE="), Err(Error::MissingSignature)));
        // Prefix must be at the very start.
        assert!(matches!(
            decode(" signature:MAMCAQE="),
            Err(Error::MissingSignature)
        ));
    }

    #[test]
    fn corrupted_payload_is_a_crypto_failure() {
        assert!(matches!(
            decode("signature:not*base64!"),
            Err(Error::CryptoOperationFailed(CryptoError::Base64(_)))
        ));
    }
}
