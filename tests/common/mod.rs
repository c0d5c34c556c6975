// common/mod.rs - archive and fixture helpers shared by unit and integration tests
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use ::zip::write::SimpleFileOptions;
use ::zip::{CompressionMethod, DateTime, ZipWriter};

/// Path of a PEM fixture under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// A STORED archive holding `entries`, written with the `zip` crate.
/// Timestamps are fixed so equal inputs give equal bytes.
pub fn build_zip(entries: &[(&str, &[u8])], comment: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default());
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.set_comment(comment);
    writer.finish().unwrap().into_inner()
}

/// Two entries, one text and one binary.
pub fn sample_zip(comment: &str) -> Vec<u8> {
    build_zip(
        &[
            ("README.md", &b"# release\n"[..]),
            ("bin/tool", &[0x7f, b'E', b'L', b'F', 2, 1, 1, 0][..]),
        ],
        comment,
    )
}

/// Replace the empty comment of `archive` with arbitrary bytes, including
/// ones no ZIP writer would emit, such as a second trailer record.
pub fn with_raw_comment(archive: &[u8], comment: &[u8]) -> Vec<u8> {
    let (body, length) = archive.split_at(archive.len() - 2);
    assert_eq!(length, [0, 0], "archive already has a comment");

    let mut out = body.to_vec();
    out.extend_from_slice(&(comment.len() as u16).to_le_bytes());
    out.extend_from_slice(comment);
    out
}
