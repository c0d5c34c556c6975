// zip.rs - End of Central Directory trailer and archive comment
//
// A ZIP archive ends with the EOCD record:
//
//   offset  size  field
//        0     4  signature PK\x05\x06
//        4    16  disk numbers, entry counts, central directory size/offset
//       20     2  comment length (little endian)
//       22     n  comment
//
// The signature covers every byte before the comment length field, so the
// comment (and its length) can be rewritten without touching signed bytes.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;

use crate::error::{Error, IoContext, Result};

/// Maximum ZIP comment size allowed by the format.
pub const MAX_COMMENT_SIZE: usize = 65535;

const EOCD_SIGNATURE: &[u8] = b"PK\x05\x06";
const EOCD_SIZE: usize = 22;
const COMMENT_LENGTH_OFFSET: usize = 20;

/// An archive on disk with its trailing comment located.
#[derive(Debug)]
pub struct Zip {
    path: PathBuf,
    comment_start: u64,
    comment: Vec<u8>,
}

impl Zip {
    /// Locate the EOCD record of the archive at `path`.
    ///
    /// The search covers the last `22 + 65535` bytes and, scanning backward
    /// from the end, takes the first signature whose comment length field
    /// matches the number of bytes that follow the record.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).with_path(path)?;
        let size = file.metadata().with_path(path)?.len();

        let search_size = ((MAX_COMMENT_SIZE + EOCD_SIZE) as u64).min(size);
        let search_start = size - search_size;
        file.seek(SeekFrom::Start(search_start)).with_path(path)?;
        let mut tail = vec![0u8; search_size as usize];
        file.read_exact(&mut tail).with_path(path)?;

        let (eocd, comment) =
            locate_eocd(&tail).ok_or_else(|| Error::NotAZipArchive(path.to_path_buf()))?;
        let comment_start = search_start + (eocd + COMMENT_LENGTH_OFFSET) as u64;
        debug!(
            "{}: EOCD at {}, comment start {}, {} comment bytes",
            path.display(),
            search_start + eocd as u64,
            comment_start,
            comment.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            comment_start,
            comment: comment.to_vec(),
        })
    }

    /// Offset of the comment length field; bytes before it are signed.
    pub fn comment_start(&self) -> u64 {
        self.comment_start
    }

    pub fn comment_bytes(&self) -> &[u8] {
        &self.comment
    }

    /// The comment as text. Invalid UTF-8 is replaced, which can only make a
    /// signature token unreadable, never forge one.
    pub fn comment(&self) -> String {
        String::from_utf8_lossy(&self.comment).into_owned()
    }

    /// Replace the archive comment.
    ///
    /// The file is truncated at the comment length field and the new length
    /// and comment are appended. Not atomic: if the write fails the archive
    /// may be left without a comment.
    pub fn set_comment(&mut self, comment: &[u8]) -> Result<()> {
        if comment.len() > MAX_COMMENT_SIZE {
            return Err(Error::CommentTooLong(comment.len()));
        }

        let path = self.path.as_path();
        let mut file = OpenOptions::new().write(true).open(path).with_path(path)?;
        file.set_len(self.comment_start).with_path(path)?;
        file.seek(SeekFrom::Start(self.comment_start)).with_path(path)?;
        file.write_u16::<LittleEndian>(comment.len() as u16)
            .with_path(path)?;
        file.write_all(comment).with_path(path)?;
        file.sync_all().with_path(path)?;

        self.comment = comment.to_vec();
        Ok(())
    }
}

/// Find the EOCD record in the tail of an archive.
///
/// Returns the record offset within `tail` and the comment that follows it.
fn locate_eocd(tail: &[u8]) -> Option<(usize, &[u8])> {
    if tail.len() < EOCD_SIZE {
        return None;
    }

    for i in (0..=tail.len() - EOCD_SIZE).rev() {
        if &tail[i..i + 4] != EOCD_SIGNATURE {
            continue;
        }
        let mut field = &tail[i + COMMENT_LENGTH_OFFSET..i + EOCD_SIZE];
        let comment_len = field.read_u16::<LittleEndian>().ok()? as usize;
        if comment_len == tail.len() - i - EOCD_SIZE {
            return Some((i, &tail[i + EOCD_SIZE..]));
        }
    }

    None
}
