// error.rs - zipsign error taxonomy
//
// The signer propagates every variant unchanged. The verifier never returns
// these to its caller; it folds them into a `VerifyResult`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::crypto::error::{ChainError, CmsError, CryptoError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("not a zip archive: {}", .0.display())]
    NotAZipArchive(PathBuf),

    #[error("missing signature")]
    MissingSignature,

    #[error("invalid certificate chain: {0}")]
    InvalidCertificateChain(#[from] ChainError),

    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] CmsError),

    #[error("crypto operation failed: {0}")]
    CryptoOperationFailed(#[from] CryptoError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("nothing to sign: no signing identities registered")]
    NothingToSign,

    #[error("comment of {0} bytes exceeds the ZIP limit of 65535")]
    CommentTooLong(usize),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attach a path to a bare `io::Result`.
pub(crate) trait IoContext<T> {
    fn with_path(self, path: &std::path::Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn with_path(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}
