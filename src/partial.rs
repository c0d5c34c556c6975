// partial.rs - read-only view of the first `limit` bytes of a file
//
// The view is a single-pass stream. Consumers that need the same range twice
// open a second view instead of seeking back.

use std::fs::File;
use std::io::{self, BufReader, Read, Take};
use std::path::Path;

use crate::error::{Error, IoContext, Result};
use crate::hash::BUFFER_SIZE;

pub struct PartialFile {
    inner: Take<BufReader<File>>,
    limit: u64,
}

impl PartialFile {
    /// Open `path` so that only bytes `[0, limit)` are readable.
    ///
    /// Fails if the file is shorter than `limit`.
    pub fn open(path: impl AsRef<Path>, limit: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_path(path)?;
        let len = file.metadata().with_path(path)?.len();
        if len < limit {
            return Err(Error::io(
                path,
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("file has {len} bytes, view needs {limit}"),
                ),
            ));
        }

        Ok(Self {
            inner: BufReader::with_capacity(BUFFER_SIZE, file).take(limit),
            limit,
        })
    }

    /// Size of the visible range.
    pub fn limit(&self) -> u64 {
        self.limit
    }
}

impl Read for PartialFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
