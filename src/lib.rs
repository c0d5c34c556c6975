//! Sign and verify ZIP archives with a detached CMS signature stored in the
//! archive comment.
//!
//! The signature covers every byte before the comment length field of the
//! end-of-central-directory record and is stored as the whole comment,
//! `signature:` followed by base64 DER.
//!
//! ```no_run
//! use zipsign::{Signer, Verifier, VerifyResult};
//!
//! # fn main() -> zipsign::Result<()> {
//! Signer::with_signer("release.key", "release.pem")?.sign("app.zip")?;
//!
//! let verifier = Verifier::with_certificate("release.pem")?;
//! assert_eq!(verifier.verify("app.zip", None, false, false), VerifyResult::Good);
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod error;
pub mod hash;
pub mod partial;
pub mod report;
pub mod signature;
pub mod signer;
pub mod trust;
pub mod verifier;
pub mod zip;

#[cfg(test)]
mod testutil;

pub use crate::error::{Error, Result};
pub use crate::report::VerifyReport;
pub use crate::signer::Signer;
pub use crate::trust::TrustAnchors;
pub use crate::verifier::{ErrorReporter, StderrReporter, Verifier, VerifyResult};
