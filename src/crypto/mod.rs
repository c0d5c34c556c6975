// crypto/ - cryptographic collaborator for signing and verification
//
// keys.rs  - RSA private keys and X.509 certificates from PEM/DER
// store.rs - trust store and certificate chain validation
// cms.rs   - detached CMS SignedData creation and verification
// error.rs - error types for the above

use der::oid::ObjectIdentifier;

use crate::hash::DigestAlgorithm;
use self::error::CryptoError;

pub mod cms;
pub mod error;
pub mod keys;
pub mod store;

pub use self::cms::{DetachedSignature, VerifyFlags};
pub use self::keys::{PrivateKey, SigningIdentity};
pub use self::store::TrustStore;
pub use x509_cert::Certificate;

pub const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
pub const SHA256_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
pub const SHA384_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
pub const SHA512_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");

pub const ID_BASIC_CONSTRAINTS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.19");
pub const ID_SUBJECT_KEY_IDENTIFIER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.14");

/// Digest named by a `sha*WithRSAEncryption` signature OID.
pub fn rsa_signature_digest(oid: ObjectIdentifier) -> Result<DigestAlgorithm, CryptoError> {
    if oid == SHA256_WITH_RSA_ENCRYPTION {
        Ok(DigestAlgorithm::Sha256)
    } else if oid == SHA384_WITH_RSA_ENCRYPTION {
        Ok(DigestAlgorithm::Sha384)
    } else if oid == SHA512_WITH_RSA_ENCRYPTION {
        Ok(DigestAlgorithm::Sha512)
    } else {
        Err(CryptoError::UnsupportedAlgorithm(oid))
    }
}
