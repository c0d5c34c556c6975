// verifier.rs - verify a signed ZIP archive
//
// verify() runs five phases and always yields exactly one VerifyResult:
//
//   1. decode      comment token -> CMS structure     BadMissingSignature
//   2. trust       assemble a fresh TrustStore
//   3. chain       every accepted signer chains        BadInvalidCertificateChain
//   4. structure   every signer resolves consistently  BadInvalidCertificateChain
//   5. content     signatures and digest over the view BadInvalidSignature
//
// Each phase returns Result<ControlFlow<Failure, T>>. Break stops with a
// classification, Err is folded into Bad.

use std::fmt;
use std::io::{self, Read};
use std::ops::ControlFlow;
use std::path::Path;

use log::{debug, info, warn};
use serde::Serialize;
use x509_cert::Certificate;

use crate::crypto::error::CmsError;
use crate::crypto::keys;
use crate::crypto::{DetachedSignature, TrustStore, VerifyFlags};
use crate::error::{Error, Result};
use crate::partial::PartialFile;
use crate::signature;
use crate::trust::TrustAnchors;
use crate::zip::Zip;

/// Outcome of [`Verifier::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyResult {
    Good,
    BadMissingSignature,
    BadInvalidCertificateChain,
    BadInvalidSignature,
    Bad,
}

impl VerifyResult {
    pub fn is_good(self) -> bool {
        self == VerifyResult::Good
    }
}

impl fmt::Display for VerifyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VerifyResult::Good => "good",
            VerifyResult::BadMissingSignature => "missing signature",
            VerifyResult::BadInvalidCertificateChain => "invalid certificate chain",
            VerifyResult::BadInvalidSignature => "invalid signature",
            VerifyResult::Bad => "bad",
        })
    }
}

/// Receives human-readable diagnostics in verbose mode.
///
/// Messages are informational only; the [`VerifyResult`] is the outcome.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, message: &str);
}

/// Writes `error: <message>` to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrReporter;

impl ErrorReporter for StderrReporter {
    fn report(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

struct Failure {
    result: VerifyResult,
    message: String,
}

impl Failure {
    fn new(result: VerifyResult, message: impl Into<String>) -> Self {
        Self {
            result,
            message: message.into(),
        }
    }
}

type Phase<T> = Result<ControlFlow<Failure, T>>;

/// Unwrap a phase, returning early on `Break`.
macro_rules! proceed {
    ($phase:expr) => {
        match $phase? {
            ControlFlow::Continue(value) => value,
            ControlFlow::Break(failure) => return Ok(ControlFlow::Break(failure)),
        }
    };
}

/// Verifies archives against registered signer certificates.
///
/// Trust is held in two sets: anchors that terminate chains and signers whose
/// signatures are accepted. `add_certificate*` fills both while coupled
/// registration is on (the default).
pub struct Verifier {
    default_anchors: TrustAnchors,
    trust_anchors: Vec<Certificate>,
    accepted_signers: Vec<Certificate>,
    couple_registrations: bool,
    builtin_with_keyring: bool,
    reporter: Box<dyn ErrorReporter>,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Verifier {
    /// A verifier seeded with the built-in roots.
    pub fn new() -> Self {
        Self::with_default_anchors(TrustAnchors::builtin())
    }

    /// A verifier seeded with `anchors` instead of the built-in roots.
    pub fn with_default_anchors(anchors: TrustAnchors) -> Self {
        Self {
            default_anchors: anchors,
            trust_anchors: Vec::new(),
            accepted_signers: Vec::new(),
            couple_registrations: true,
            builtin_with_keyring: true,
            reporter: Box::new(StderrReporter),
        }
    }

    /// A verifier with built-in roots and one registered certificate.
    pub fn with_certificate(path: impl AsRef<Path>) -> Result<Self> {
        let mut verifier = Self::new();
        verifier.add_certificate(path)?;
        Ok(verifier)
    }

    /// Register a certificate file (PEM or DER).
    pub fn add_certificate(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let cert = keys::load_certificate(path.as_ref())?;
        Ok(self.register(cert))
    }

    /// Register a certificate from memory (PEM or DER).
    pub fn add_certificate_data(&mut self, data: &[u8]) -> Result<&mut Self> {
        let cert = keys::certificate_from_pem(data)?;
        Ok(self.register(cert))
    }

    fn register(&mut self, cert: Certificate) -> &mut Self {
        debug!(
            "registered certificate '{}' ({})",
            keys::describe(&cert),
            keys::fingerprint(&cert)
        );
        if self.couple_registrations {
            self.add_trust_anchor(cert.clone());
        }
        self.add_accepted_signer(cert)
    }

    /// Trust `cert` as a chain anchor without accepting it as a signer.
    pub fn add_trust_anchor(&mut self, cert: Certificate) -> &mut Self {
        if !self.trust_anchors.contains(&cert) {
            self.trust_anchors.push(cert);
        }
        self
    }

    /// Accept signatures by `cert` without trusting it as an anchor.
    pub fn add_accepted_signer(&mut self, cert: Certificate) -> &mut Self {
        if !self.accepted_signers.contains(&cert) {
            self.accepted_signers.push(cert);
        }
        self
    }

    /// Whether later `add_certificate*` calls also add a trust anchor.
    pub fn set_couple_registrations(&mut self, couple: bool) -> &mut Self {
        self.couple_registrations = couple;
        self
    }

    /// Whether default anchors stay trusted when a keyring is given.
    pub fn set_builtin_with_keyring(&mut self, enabled: bool) -> &mut Self {
        self.builtin_with_keyring = enabled;
        self
    }

    pub fn set_reporter(&mut self, reporter: impl ErrorReporter + 'static) -> &mut Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn trust_anchors(&self) -> &[Certificate] {
        &self.trust_anchors
    }

    pub fn accepted_signers(&self) -> &[Certificate] {
        &self.accepted_signers
    }

    /// Verify `archive`.
    ///
    /// `keyring` is an optional PEM bundle of extra anchors; an empty path
    /// counts as none. `self_signed` skips chain validation of the accepted
    /// signers. With `verbose` set the reason for any failure goes to the
    /// reporter.
    pub fn verify(
        &self,
        archive: impl AsRef<Path>,
        keyring: Option<&Path>,
        verbose: bool,
        self_signed: bool,
    ) -> VerifyResult {
        let archive = archive.as_ref();
        let keyring = keyring.filter(|path| !path.as_os_str().is_empty());

        let (result, message) = outcome(self.run(archive, keyring, self_signed));

        match message {
            None => info!("{}: signature good", archive.display()),
            Some(message) => {
                debug!("{}: {result}: {message}", archive.display());
                if verbose {
                    self.reporter.report(&message);
                }
            }
        }
        result
    }

    fn run(&self, archive: &Path, keyring: Option<&Path>, self_signed: bool) -> Phase<()> {
        let (comment_start, signature) = proceed!(self.decode(archive));
        let embedded = signature.certificates();
        let store = self.trust_store(keyring)?;
        debug!(
            "trust store has {} anchor(s), signature embeds {} certificate(s)",
            store.len(),
            embedded.len()
        );

        proceed!(self.check_chains(&store, &embedded, self_signed));
        proceed!(self.check_structure(&signature, &store));
        let view = PartialFile::open(archive, comment_start)?;
        self.check_content(archive, view, &signature, &store)
    }

    fn decode(&self, archive: &Path) -> Phase<(u64, DetachedSignature)> {
        let zip = Zip::open(archive)?;
        let raw = match signature::decode(&zip.comment()) {
            Ok(raw) => raw,
            Err(Error::MissingSignature) => {
                return Ok(ControlFlow::Break(Failure::new(
                    VerifyResult::BadMissingSignature,
                    format!("{}: archive comment holds no signature", archive.display()),
                )))
            }
            Err(e) => return Err(e),
        };
        let signature = DetachedSignature::from_der(&raw).map_err(Error::InvalidSignature)?;
        debug!("decoded signature with {} signer(s)", signature.signer_count());
        Ok(ControlFlow::Continue((zip.comment_start(), signature)))
    }

    /// Built fresh on every call: defaults, then the keyring, then
    /// registered anchors.
    fn trust_store(&self, keyring: Option<&Path>) -> Result<TrustStore> {
        let mut store = TrustStore::new();

        let use_defaults = keyring.is_none() || self.builtin_with_keyring;
        if use_defaults {
            store.extend(self.default_anchors.certificates().iter().cloned());
        }

        if let Some(path) = keyring {
            if use_defaults && !self.default_anchors.is_empty() {
                warn!(
                    "trusting {} built-in root(s) in addition to keyring {}",
                    self.default_anchors.len(),
                    path.display()
                );
            }
            let certs = keys::load_certificates(path)?;
            debug!("keyring {} holds {} certificate(s)", path.display(), certs.len());
            store.extend(certs);
        }

        store.extend(self.trust_anchors.iter().cloned());
        Ok(store)
    }

    fn check_chains(
        &self,
        store: &TrustStore,
        embedded: &[Certificate],
        self_signed: bool,
    ) -> Phase<()> {
        if self.accepted_signers.is_empty() {
            return Ok(ControlFlow::Break(Failure::new(
                VerifyResult::BadInvalidCertificateChain,
                "no signer certificates registered",
            )));
        }
        if self_signed {
            debug!("self-signed mode, chain validation skipped");
            return Ok(ControlFlow::Continue(()));
        }

        for cert in &self.accepted_signers {
            if let Err(e) = store.validate(cert, embedded) {
                return Ok(ControlFlow::Break(Failure::new(
                    VerifyResult::BadInvalidCertificateChain,
                    e.to_string(),
                )));
            }
        }
        debug!("{} signer certificate(s) chain", self.accepted_signers.len());
        Ok(ControlFlow::Continue(()))
    }

    fn check_structure(&self, signature: &DetachedSignature, store: &TrustStore) -> Phase<()> {
        let flags = VerifyFlags {
            no_signer_cert_verify: true,
            no_content_verify: true,
        };
        match signature.verify(io::empty(), &self.accepted_signers, store, flags) {
            Ok(()) => Ok(ControlFlow::Continue(())),
            Err(e) => Ok(ControlFlow::Break(Failure::new(
                VerifyResult::BadInvalidCertificateChain,
                e.to_string(),
            ))),
        }
    }

    /// `view` yields the signed bytes of `archive`.
    fn check_content<R: Read>(
        &self,
        archive: &Path,
        view: R,
        signature: &DetachedSignature,
        store: &TrustStore,
    ) -> Phase<()> {
        let flags = VerifyFlags {
            no_signer_cert_verify: true,
            no_content_verify: false,
        };
        match signature.verify(view, &self.accepted_signers, store, flags) {
            Ok(()) => Ok(ControlFlow::Continue(())),
            Err(CmsError::Io(e)) => Err(Error::io(archive, e)),
            Err(e) => Ok(ControlFlow::Break(Failure::new(
                VerifyResult::BadInvalidSignature,
                e.to_string(),
            ))),
        }
    }
}

/// Fold a finished run into its result and, for failures, the reason.
fn outcome(run: Phase<()>) -> (VerifyResult, Option<String>) {
    match run {
        Ok(ControlFlow::Continue(())) => (VerifyResult::Good, None),
        Ok(ControlFlow::Break(failure)) => (failure.result, Some(failure.message)),
        Err(e) => (VerifyResult::Bad, Some(e.to_string())),
    }
}
