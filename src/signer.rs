// signer.rs - sign a ZIP archive in place
//
// sign():
//   1. locate the comment length field (zip.rs)
//   2. stream bytes [0, comment_start) through SHA-256 (partial.rs)
//   3. build one detached CMS signature, one signer per identity
//   4. replace the comment with the encoded token (signature.rs)
//
// There is no rollback. If step 4 fails the archive may be left without a
// comment; callers that care should sign a copy.

use std::path::Path;

use log::{debug, info};
use x509_cert::Certificate;

use crate::crypto::cms::SIGNING_DIGEST;
use crate::crypto::error::CryptoError;
use crate::crypto::keys::{self, PrivateKey, SigningIdentity};
use crate::crypto::store::issuer_chain;
use crate::crypto::DetachedSignature;
use crate::error::{Error, IoContext, Result};
use crate::partial::PartialFile;
use crate::signature;
use crate::zip::Zip;

/// Signs archives with every registered identity.
#[derive(Debug)]
pub struct Signer {
    identities: Vec<SigningIdentity>,
    intermediates: Vec<Certificate>,
    embed_certs: bool,
}

impl Default for Signer {
    fn default() -> Self {
        Self::new()
    }
}

impl Signer {
    /// A signer with no identities that embeds certificates.
    pub fn new() -> Self {
        Self {
            identities: Vec::new(),
            intermediates: Vec::new(),
            embed_certs: true,
        }
    }

    /// A signer with one identity loaded from disk.
    pub fn with_signer(key_path: impl AsRef<Path>, cert_path: impl AsRef<Path>) -> Result<Self> {
        let mut signer = Self::new();
        signer.add_signer(key_path, cert_path)?;
        Ok(signer)
    }

    /// Register an identity from a key file and a certificate file.
    pub fn add_signer(
        &mut self,
        key_path: impl AsRef<Path>,
        cert_path: impl AsRef<Path>,
    ) -> Result<&mut Self> {
        let key = PrivateKey::from_file(key_path.as_ref())?;
        let cert = keys::load_certificate(cert_path.as_ref())?;
        self.push_identity(key, cert)
    }

    /// Register an identity from in-memory PEM (or DER) key and certificate.
    pub fn add_signer_from_memory(&mut self, key: &[u8], cert: &[u8]) -> Result<&mut Self> {
        let key = PrivateKey::from_pem(key)?;
        let cert = keys::certificate_from_pem(cert)?;
        self.push_identity(key, cert)
    }

    fn push_identity(&mut self, key: PrivateKey, cert: Certificate) -> Result<&mut Self> {
        let identity = SigningIdentity::new(key, cert)?;
        debug!(
            "registered signer '{}' ({})",
            keys::describe(&identity.certificate),
            keys::fingerprint(&identity.certificate)
        );
        self.identities.push(identity);
        Ok(self)
    }

    /// Register intermediate certificates from a PEM bundle or DER file.
    ///
    /// Intermediates never sign. With certificate embedding on, those that
    /// link a signer certificate towards its root travel in the signature.
    pub fn add_intermediate(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).with_path(path)?;
        self.add_intermediate_data(&data)
    }

    pub fn add_intermediate_data(&mut self, data: &[u8]) -> Result<&mut Self> {
        let certs = if keys::is_pem(data) {
            keys::certificates_from_pem(data)?
        } else {
            vec![keys::certificate_from_pem(data)?]
        };
        if certs.is_empty() {
            return Err(CryptoError::NotFound("certificate").into());
        }
        self.intermediates.extend(certs);
        Ok(self)
    }

    /// Whether certificates are embedded in the signature. Defaults to true.
    pub fn set_embed_certs(&mut self, embed: bool) -> &mut Self {
        self.embed_certs = embed;
        self
    }

    pub fn signer_count(&self) -> usize {
        self.identities.len()
    }

    /// Sign `archive` in place, replacing any existing comment.
    ///
    /// Every identity must sign; any failure aborts before the archive is
    /// touched, except for failures while writing the new comment.
    pub fn sign(&self, archive: impl AsRef<Path>) -> Result<()> {
        let archive = archive.as_ref();
        if self.identities.is_empty() {
            return Err(Error::NothingToSign);
        }

        let mut zip = Zip::open(archive)?;
        let view = PartialFile::open(archive, zip.comment_start())?;
        let digest = SIGNING_DIGEST.digest_reader(view).with_path(archive)?;

        let embedded = self.embedded_certificates();
        let signature = DetachedSignature::sign_digest(&digest, &self.identities, &embedded)?;
        let token = signature::encode(&signature.to_der()?);
        zip.set_comment(token.as_bytes())?;

        info!(
            "signed {} with {} signer(s), {} certificate(s) embedded",
            archive.display(),
            self.identities.len(),
            embedded.len()
        );
        Ok(())
    }

    fn embedded_certificates(&self) -> Vec<Certificate> {
        if !self.embed_certs {
            return Vec::new();
        }
        let mut certs = Vec::new();
        for identity in &self.identities {
            certs.push(identity.certificate.clone());
            certs.extend(issuer_chain(&identity.certificate, &self.intermediates));
        }
        certs
    }
}
