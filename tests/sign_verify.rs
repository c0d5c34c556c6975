// End-to-end signing and verification of archives on disk.

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use zipsign::signature::SIGNATURE_PREFIX;
use zipsign::zip::Zip;
use zipsign::{ErrorReporter, Signer, TrustAnchors, Verifier, VerifyResult};

use common::{build_zip, fixture, sample_zip, with_raw_comment};

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn archive(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }
}

fn signer(names: &[&str]) -> Signer {
    let mut signer = Signer::new();
    for name in names {
        signer
            .add_signer(
                fixture(&format!("{name}.key")),
                fixture(&format!("{name}.pem")),
            )
            .unwrap();
    }
    signer
}

fn verifier(names: &[&str]) -> Verifier {
    let mut verifier = Verifier::with_default_anchors(TrustAnchors::empty());
    for name in names {
        verifier
            .add_certificate(fixture(&format!("{name}.pem")))
            .unwrap();
    }
    verifier
}

fn flip(path: &Path, offset: usize) {
    let mut bytes = fs::read(path).unwrap();
    bytes[offset] ^= 0x01;
    fs::write(path, bytes).unwrap();
}

#[derive(Clone, Default)]
struct Collect(Arc<Mutex<Vec<String>>>);

impl ErrorReporter for Collect {
    fn report(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

#[test]
fn round_trip() {
    let ws = Workspace::new();
    let path = ws.archive("app.zip", &sample_zip(""));

    signer(&["alice"]).sign(&path).unwrap();
    assert_eq!(
        verifier(&["alice"]).verify(&path, None, false, false),
        VerifyResult::Good
    );
}

#[test]
fn tampering_before_the_comment_is_an_invalid_signature() {
    let ws = Workspace::new();
    let pristine = ws.archive("pristine.zip", &sample_zip(""));
    signer(&["alice"]).sign(&pristine).unwrap();
    let signed = fs::read(&pristine).unwrap();
    let comment_start = Zip::open(&pristine).unwrap().comment_start() as usize;
    let eocd = comment_start - 20;

    // Everything before the EOCD magic, plus the EOCD fields after it.
    for offset in [0, 5, 40, eocd - 1, eocd + 4, eocd + 12, comment_start - 1] {
        let path = ws.archive(&format!("tampered-{offset}.zip"), &signed);
        flip(&path, offset);
        assert_eq!(
            verifier(&["alice"]).verify(&path, None, false, false),
            VerifyResult::BadInvalidSignature,
            "byte {offset}"
        );
    }
}

#[test]
fn signature_from_another_archive_does_not_transfer() {
    let ws = Workspace::new();
    let first = ws.archive("first.zip", &sample_zip(""));
    let second = ws.archive(
        "second.zip",
        &build_zip(&[("other.txt", &b"different payload"[..])], ""),
    );
    signer(&["alice"]).sign(&first).unwrap();

    let token = Zip::open(&first).unwrap().comment_bytes().to_vec();
    Zip::open(&second).unwrap().set_comment(&token).unwrap();
    assert_eq!(
        verifier(&["alice"]).verify(&second, None, false, false),
        VerifyResult::BadInvalidSignature
    );
}

#[test]
fn missing_signature_is_distinct_from_a_corrupted_one() {
    let ws = Workspace::new();
    let plain = ws.archive("plain.zip", &sample_zip("nightly build 42"));
    let empty = ws.archive("empty.zip", &sample_zip(""));
    let corrupted = ws.archive("corrupted.zip", &sample_zip("signature:AAAA"));

    let verifier = verifier(&["alice"]);
    assert_eq!(
        verifier.verify(&plain, None, false, false),
        VerifyResult::BadMissingSignature
    );
    assert_eq!(
        verifier.verify(&empty, None, false, false),
        VerifyResult::BadMissingSignature
    );
    assert_eq!(verifier.verify(&corrupted, None, false, false), VerifyResult::Bad);
}

#[test]
fn untrusted_signer_is_an_invalid_chain() {
    let ws = Workspace::new();
    let path = ws.archive("app.zip", &sample_zip(""));
    signer(&["alice"]).sign(&path).unwrap();

    assert_eq!(
        verifier(&["bob"]).verify(&path, None, false, false),
        VerifyResult::BadInvalidCertificateChain
    );
    assert_eq!(
        verifier(&[]).verify(&path, None, false, false),
        VerifyResult::BadInvalidCertificateChain
    );
    // The embedded certificate grants nothing on its own.
    assert_eq!(
        verifier(&["mallory"]).verify(&path, None, false, true),
        VerifyResult::BadInvalidCertificateChain
    );
}

#[test]
fn every_signer_must_be_accepted() {
    let ws = Workspace::new();
    let path = ws.archive("app.zip", &sample_zip(""));
    signer(&["alice", "bob"]).sign(&path).unwrap();

    assert_eq!(
        verifier(&["alice", "bob"]).verify(&path, None, false, false),
        VerifyResult::Good
    );
    assert_eq!(
        verifier(&["alice"]).verify(&path, None, false, false),
        VerifyResult::BadInvalidCertificateChain
    );
    assert_eq!(
        verifier(&["bob"]).verify(&path, None, false, false),
        VerifyResult::BadInvalidCertificateChain
    );
}

#[test]
fn self_signed_mode_skips_chain_validation() {
    let ws = Workspace::new();
    let path = ws.archive("app.zip", &sample_zip(""));
    signer(&["signer"]).sign(&path).unwrap();

    let verifier = verifier(&["signer"]);
    assert_eq!(
        verifier.verify(&path, None, false, false),
        VerifyResult::BadInvalidCertificateChain
    );
    assert_eq!(verifier.verify(&path, None, false, true), VerifyResult::Good);

    flip(&path, 10);
    assert_eq!(
        verifier.verify(&path, None, false, true),
        VerifyResult::BadInvalidSignature
    );
}

#[test]
fn keyring_completes_the_chain() {
    let ws = Workspace::new();
    let path = ws.archive("app.zip", &sample_zip(""));
    signer(&["signer"]).sign(&path).unwrap();

    let verifier = verifier(&["signer"]);
    let keyring = fixture("root-ca.pem");
    assert_eq!(
        verifier.verify(&path, Some(keyring.as_path()), false, false),
        VerifyResult::Good
    );
    // Trust assembled for one call does not leak into the next.
    assert_eq!(
        verifier.verify(&path, None, false, false),
        VerifyResult::BadInvalidCertificateChain
    );
}

#[test]
fn certificates_can_travel_out_of_band() {
    let ws = Workspace::new();
    let path = ws.archive("app.zip", &sample_zip(""));
    let mut signer = signer(&["signer"]);
    signer.add_intermediate(fixture("root-ca.pem")).unwrap();
    signer.set_embed_certs(false);
    signer.sign(&path).unwrap();

    let keyring = fixture("root-ca.pem");
    assert_eq!(
        verifier(&["signer"]).verify(&path, Some(keyring.as_path()), false, false),
        VerifyResult::Good
    );
}

#[test]
fn expired_signer_is_an_invalid_chain() {
    let ws = Workspace::new();
    let path = ws.archive("app.zip", &sample_zip(""));
    Signer::with_signer(fixture("mallory.key"), fixture("expired.pem"))
        .unwrap()
        .sign(&path)
        .unwrap();

    assert_eq!(
        verifier(&["expired"]).verify(&path, None, false, false),
        VerifyResult::BadInvalidCertificateChain
    );
}

#[test]
fn resigning_replaces_the_previous_signature() {
    let ws = Workspace::new();
    let path = ws.archive("app.zip", &sample_zip(""));
    let signer = signer(&["alice"]);

    signer.sign(&path).unwrap();
    let first = Zip::open(&path).unwrap();
    signer.sign(&path).unwrap();
    let second = Zip::open(&path).unwrap();

    assert_eq!(first.comment_start(), second.comment_start());
    assert_eq!(second.comment().matches(SIGNATURE_PREFIX).count(), 1);
    assert_eq!(
        fs::metadata(&path).unwrap().len(),
        second.comment_start() + 2 + second.comment_bytes().len() as u64
    );
    assert_eq!(
        verifier(&["alice"]).verify(&path, None, false, false),
        VerifyResult::Good
    );
}

#[test]
fn existing_comment_and_empty_comment_sign_alike() {
    let ws = Workspace::new();
    let bare = ws.archive("bare.zip", &sample_zip(""));
    let noted = ws.archive("noted.zip", &sample_zip("built from a1b2c3d"));
    let signer = signer(&["alice"]);
    signer.sign(&bare).unwrap();
    signer.sign(&noted).unwrap();

    let bare_zip = Zip::open(&bare).unwrap();
    let noted_zip = Zip::open(&noted).unwrap();
    assert_eq!(bare_zip.comment_start(), noted_zip.comment_start());

    let limit = bare_zip.comment_start() as usize;
    assert_eq!(
        fs::read(&bare).unwrap()[..limit],
        fs::read(&noted).unwrap()[..limit]
    );
    assert!(!noted_zip.comment().contains("a1b2c3d"));

    let verifier = verifier(&["alice"]);
    assert_eq!(verifier.verify(&bare, None, false, false), VerifyResult::Good);
    assert_eq!(verifier.verify(&noted, None, false, false), VerifyResult::Good);
}

#[test]
fn lookalike_trailer_in_comment_is_not_the_trailer() {
    let ws = Workspace::new();
    // An EOCD-looking record whose length field disagrees with what follows.
    let mut comment = b"PK\x05\x06".to_vec();
    comment.extend_from_slice(&[0u8; 16]);
    comment.extend_from_slice(&[9, 0]);
    comment.extend_from_slice(b"tail!");
    let path = ws.archive("tricky.zip", &with_raw_comment(&sample_zip(""), &comment));
    let expected_start = sample_zip("").len() as u64 - 2;
    assert_eq!(Zip::open(&path).unwrap().comment_start(), expected_start);

    signer(&["alice"]).sign(&path).unwrap();
    assert_eq!(Zip::open(&path).unwrap().comment_start(), expected_start);
    assert_eq!(
        verifier(&["alice"]).verify(&path, None, false, false),
        VerifyResult::Good
    );
}

#[test]
fn verbose_mode_reports_the_reason() {
    let ws = Workspace::new();
    let path = ws.archive("app.zip", &sample_zip(""));
    signer(&["alice"]).sign(&path).unwrap();

    let reporter = Collect::default();
    let mut verifier = verifier(&["bob"]);
    verifier.set_reporter(reporter.clone());

    assert_eq!(
        verifier.verify(&path, None, true, false),
        VerifyResult::BadInvalidCertificateChain
    );
    assert_eq!(
        verifier.verify(&path, None, true, true),
        VerifyResult::BadInvalidCertificateChain
    );
    assert_eq!(
        verifier.verify(&path, None, false, false),
        VerifyResult::BadInvalidCertificateChain
    );
    assert_eq!(reporter.0.lock().unwrap().len(), 2);

    let mut good = self::verifier(&["alice"]);
    let quiet = Collect::default();
    good.set_reporter(quiet.clone());
    assert_eq!(good.verify(&path, None, true, false), VerifyResult::Good);
    assert!(quiet.0.lock().unwrap().is_empty());
}

#[test]
fn not_a_zip_archive() {
    let ws = Workspace::new();
    let path = ws.archive("notes.txt", b"these are not the bytes you are looking for");

    assert!(matches!(
        signer(&["alice"]).sign(&path),
        Err(zipsign::Error::NotAZipArchive(_))
    ));
    assert_eq!(
        verifier(&["alice"]).verify(&path, None, false, false),
        VerifyResult::Bad
    );
}
