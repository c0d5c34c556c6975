// testutil.rs - helpers for unit tests

use std::path::{Path, PathBuf};

use crate::hash::{self, DigestAlgorithm};

#[path = "../tests/common/mod.rs"]
mod common;

pub use common::{fixture, sample_zip, with_raw_comment};

/// Write `bytes` into `dir` under a name derived from the content.
pub fn write_archive(dir: &Path, bytes: &[u8]) -> PathBuf {
    let name = hash::hex_encode(&DigestAlgorithm::Sha256.digest(bytes));
    let path = dir.join(format!("{}.zip", &name[..16]));
    std::fs::write(&path, bytes).unwrap();
    path
}
