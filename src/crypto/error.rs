// error.rs - error types for keys, chains and CMS signatures

use der::oid::ObjectIdentifier;
use thiserror::Error;

/// Failures while loading keys and certificates or producing a signature.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// PEM framing could not be parsed.
    #[error("PEM parsing error: {0}")]
    Pem(#[from] pem::PemError),
    /// A DER structure could not be decoded or encoded.
    #[error("DER error: {0}")]
    Der(#[from] der::Error),
    /// The input held no block of the expected kind.
    #[error("no {0} found in input")]
    NotFound(&'static str),
    /// The private key could not be loaded.
    #[error("invalid private key: {0}")]
    Key(String),
    /// An RSA operation failed.
    #[error("RSA operation failed: {0}")]
    Rsa(#[from] rsa::Error),
    /// A signature token was not valid base64.
    #[error("signature is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// An algorithm this implementation does not handle.
    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(ObjectIdentifier),
}

/// Reasons a certificate could not be chained to a trust anchor.
#[derive(Debug, Error)]
pub enum ChainError {
    /// No trusted or untrusted certificate issued this one.
    #[error("unable to find issuer of '{0}'")]
    UnknownIssuer(String),
    /// The certificate is outside its validity period.
    #[error("certificate '{0}' is expired or not yet valid")]
    Validity(String),
    /// An issuing certificate is marked as not being a CA.
    #[error("certificate '{0}' is not a CA")]
    NotACa(String),
    /// The path exceeded the maximum depth.
    #[error("certificate chain for '{0}' is too long")]
    TooLong(String),
    /// A certificate could not be decoded or its key used.
    #[error("certificate error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Reasons a detached CMS signature failed to verify.
#[derive(Debug, Error)]
pub enum CmsError {
    /// The blob is not a CMS SignedData structure.
    #[error("content is not CMS SignedData")]
    NotSignedData,
    /// The signature structure holds no signers.
    #[error("signature contains no signers")]
    NoSigners,
    /// A signer could not be matched with an accepted certificate.
    #[error("signer '{0}' is not an accepted signer")]
    UnknownSigner(String),
    /// An embedded certificate collides with an accepted one.
    #[error("embedded certificate for '{0}' does not match the accepted certificate")]
    EmbeddedCertificateMismatch(String),
    /// A mandatory signed attribute is missing or malformed.
    #[error("signed attribute {0} missing or malformed")]
    Attribute(&'static str),
    /// A combined signature algorithm names a different digest than the
    /// signer's digest algorithm.
    #[error("signature algorithm disagrees with digest algorithm")]
    AlgorithmMismatch,
    /// The content type attribute disagrees with the encapsulated type.
    #[error("content type attribute mismatch")]
    ContentTypeMismatch,
    /// The content digest differs from the signed digest.
    #[error("content digest mismatch")]
    DigestMismatch,
    /// The RSA signature over the signed attributes is wrong.
    #[error("signature verification failure for '{0}'")]
    BadSignature(String),
    /// The signer certificate did not chain to a trust anchor.
    #[error(transparent)]
    Chain(#[from] ChainError),
    /// Key, algorithm or encoding problem.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// Reading the detached content failed.
    #[error("reading signed content: {0}")]
    Io(#[from] std::io::Error),
}

impl From<der::Error> for CmsError {
    fn from(e: der::Error) -> Self {
        Self::Crypto(CryptoError::Der(e))
    }
}

impl From<der::Error> for ChainError {
    fn from(e: der::Error) -> Self {
        Self::Crypto(CryptoError::Der(e))
    }
}
