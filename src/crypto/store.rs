// store.rs - trust store and certificate chain validation
//
// Path building is iterative: from the leaf, each step either reaches a
// trust anchor or moves to an untrusted intermediate whose key verifies the
// current certificate's signature. Every certificate on the path must be
// within its validity period, and every issuer that declares
// basicConstraints must be a CA.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use der::Encode;
use log::debug;
use x509_cert::Certificate;

use super::error::{ChainError, CryptoError};
use super::keys::{self, describe};
use super::rsa_signature_digest;

pub const MAX_CHAIN_DEPTH: usize = 10;

/// A set of certificates trusted as chain anchors.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    anchors: Vec<Certificate>,
}

impl TrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an anchor; duplicates are ignored.
    pub fn add(&mut self, cert: Certificate) {
        if !self.anchors.contains(&cert) {
            self.anchors.push(cert);
        }
    }

    pub fn contains(&self, cert: &Certificate) -> bool {
        self.anchors.contains(cert)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Validate `leaf` at the current time. See [`TrustStore::validate_at`].
    pub fn validate(
        &self,
        leaf: &Certificate,
        untrusted: &[Certificate],
    ) -> Result<Vec<Certificate>, ChainError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        self.validate_at(leaf, untrusted, now)
    }

    /// Build and check a path from `leaf` to an anchor.
    ///
    /// `untrusted` supplies intermediates that may be used to reach an anchor
    /// but are never anchors themselves. `now` is the time since the Unix
    /// epoch. Returns the path, leaf first, anchor last.
    pub fn validate_at(
        &self,
        leaf: &Certificate,
        untrusted: &[Certificate],
        now: Duration,
    ) -> Result<Vec<Certificate>, ChainError> {
        let mut path = vec![leaf.clone()];
        check_validity(leaf, now)?;

        for _ in 0..MAX_CHAIN_DEPTH {
            let current = &path[path.len() - 1];

            if is_self_issued(current) && self.contains(current) {
                debug!("chain for '{}' ends at self-issued anchor", describe(leaf));
                return Ok(path);
            }

            if let Some(anchor) = self.anchors.iter().find(|a| is_issued_by(current, a)) {
                check_issuer(anchor, now)?;
                debug!(
                    "chain for '{}' ends at anchor '{}'",
                    describe(leaf),
                    describe(anchor)
                );
                path.push(anchor.clone());
                return Ok(path);
            }

            let next = untrusted
                .iter()
                .find(|c| !path.contains(c) && is_issued_by(current, c))
                .ok_or_else(|| ChainError::UnknownIssuer(describe(current)))?;
            check_issuer(next, now)?;
            path.push(next.clone());
        }

        Err(ChainError::TooLong(describe(leaf)))
    }
}

impl FromIterator<Certificate> for TrustStore {
    fn from_iter<I: IntoIterator<Item = Certificate>>(iter: I) -> Self {
        let mut store = TrustStore::new();
        for cert in iter {
            store.add(cert);
        }
        store
    }
}

impl Extend<Certificate> for TrustStore {
    fn extend<I: IntoIterator<Item = Certificate>>(&mut self, iter: I) {
        for cert in iter {
            self.add(cert);
        }
    }
}

/// Issuers from `pool` above `cert`, nearest first, stopping at a
/// self-issued certificate or when no issuer is found.
pub fn issuer_chain(cert: &Certificate, pool: &[Certificate]) -> Vec<Certificate> {
    let mut chain: Vec<Certificate> = Vec::new();
    let mut current = cert;
    while chain.len() < MAX_CHAIN_DEPTH && !is_self_issued(current) {
        match pool
            .iter()
            .find(|c| !chain.contains(c) && is_issued_by(current, c))
        {
            Some(issuer) => {
                chain.push(issuer.clone());
                current = &chain[chain.len() - 1];
            }
            None => break,
        }
    }
    chain
}

pub fn is_self_issued(cert: &Certificate) -> bool {
    cert.tbs_certificate.subject == cert.tbs_certificate.issuer
}

/// True when `issuer`'s subject names `cert`'s issuer and its key verifies
/// `cert`'s signature.
pub fn is_issued_by(cert: &Certificate, issuer: &Certificate) -> bool {
    cert.tbs_certificate.issuer == issuer.tbs_certificate.subject
        && verify_certificate_signature(cert, issuer).is_ok()
}

fn verify_certificate_signature(
    cert: &Certificate,
    issuer: &Certificate,
) -> Result<(), CryptoError> {
    let digest = rsa_signature_digest(cert.signature_algorithm.oid)?;
    let key = keys::public_key(issuer)?;
    let tbs = cert.tbs_certificate.to_der()?;
    key.verify(
        digest.pkcs1v15(),
        &digest.digest(&tbs),
        cert.signature.raw_bytes(),
    )?;
    Ok(())
}

fn check_validity(cert: &Certificate, now: Duration) -> Result<(), ChainError> {
    let validity = &cert.tbs_certificate.validity;
    if now < validity.not_before.to_unix_duration() || now > validity.not_after.to_unix_duration()
    {
        return Err(ChainError::Validity(describe(cert)));
    }
    Ok(())
}

fn check_issuer(cert: &Certificate, now: Duration) -> Result<(), ChainError> {
    check_validity(cert, now)?;
    match keys::basic_constraints(cert)? {
        Some(bc) if !bc.ca => Err(ChainError::NotACa(describe(cert))),
        _ => Ok(()),
    }
}
