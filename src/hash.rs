// hash.rs - digest algorithms and streaming digests

use std::io::{self, Read};

use der::oid::ObjectIdentifier;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::crypto::error::CryptoError;

/// Read size used when streaming archive bytes through a digest.
pub const BUFFER_SIZE: usize = 64 * 1024;

pub const ID_SHA_256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
pub const ID_SHA_384: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
pub const ID_SHA_512: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");

/// Digest algorithms accepted in signatures and certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha256 => ID_SHA_256,
            DigestAlgorithm::Sha384 => ID_SHA_384,
            DigestAlgorithm::Sha512 => ID_SHA_512,
        }
    }

    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self, CryptoError> {
        [
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ]
        .into_iter()
        .find(|a| a.oid() == oid)
        .ok_or(CryptoError::UnsupportedAlgorithm(oid))
    }

    /// Digest of a byte slice.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        let mut hasher = Hasher::new(self);
        hasher.update(data);
        hasher.finalize()
    }

    /// Streaming digest of everything `reader` yields.
    pub fn digest_reader<R: Read>(self, reader: R) -> io::Result<Vec<u8>> {
        let mut hasher = [Hasher::new(self)];
        feed(reader, &mut hasher)?;
        let [hasher] = hasher;
        Ok(hasher.finalize())
    }

    /// RSA PKCS#1 v1.5 padding scheme bound to this digest.
    pub fn pkcs1v15(self) -> Pkcs1v15Sign {
        match self {
            DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}

enum Hasher {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl Hasher {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            DigestAlgorithm::Sha384 => Hasher::Sha384(Sha384::new()),
            DigestAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha384(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            Hasher::Sha256(h) => h.finalize().to_vec(),
            Hasher::Sha384(h) => h.finalize().to_vec(),
            Hasher::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

/// Stream `reader` to exhaustion once, feeding every requested digest.
///
/// Results are returned in the order of `algorithms`. Memory use is bounded
/// by [`BUFFER_SIZE`] regardless of the input length.
pub fn digest_reader<R: Read>(
    reader: R,
    algorithms: &[DigestAlgorithm],
) -> io::Result<Vec<Vec<u8>>> {
    let mut hashers: Vec<Hasher> = algorithms.iter().map(|a| Hasher::new(*a)).collect();
    feed(reader, &mut hashers)?;
    Ok(hashers.into_iter().map(Hasher::finalize).collect())
}

fn feed<R: Read>(mut reader: R, hashers: &mut [Hasher]) -> io::Result<()> {
    let mut buf = vec![0u8; BUFFER_SIZE];
    loop {
        let count = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        for hasher in hashers.iter_mut() {
            hasher.update(&buf[..count]);
        }
    }
}

/// SHA-256 fingerprint of a DER-encoded certificate, colon separated.
pub fn fingerprint(der: &[u8]) -> String {
    DigestAlgorithm::Sha256
        .digest(der)
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
