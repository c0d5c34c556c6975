// trust.rs - default trust anchors handed to the verifier
//
// Built-in roots are compiled in by build.rs when a bundle is present at
// build time. They are never consulted implicitly: a Verifier receives them
// through `Verifier::new` or `Verifier::with_default_anchors`.

use std::path::Path;

use log::warn;
use x509_cert::Certificate;

use crate::crypto::error::CryptoError;
use crate::crypto::keys;
use crate::error::Result;

#[cfg(has_builtin_roots)]
const BUILTIN_ROOTS_PEM: &str = include_str!(concat!(env!("OUT_DIR"), "/builtin_roots.pem"));
#[cfg(not(has_builtin_roots))]
const BUILTIN_ROOTS_PEM: &str = "";

/// An auditable set of certificates used as default trust anchors.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchors {
    certificates: Vec<Certificate>,
}

impl TrustAnchors {
    /// Roots compiled into this binary, possibly none.
    pub fn builtin() -> Self {
        match Self::from_pem(BUILTIN_ROOTS_PEM.as_bytes()) {
            Ok(anchors) => anchors,
            Err(e) => {
                warn!("ignoring unreadable built-in roots: {e}");
                Self::empty()
            }
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pem(data: &[u8]) -> std::result::Result<Self, CryptoError> {
        Ok(Self {
            certificates: keys::certificates_from_pem(data)?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self {
            certificates: keys::load_certificates(path)?,
        })
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }
}
