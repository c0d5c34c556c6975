// main.rs - zipsign CLI entry point
//
// Thin wrapper over the library: `sign` registers identities and signs in
// place, `verify` maps the VerifyResult onto the process exit status.

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use cli::{Cli, Commands};
use zipsign::{Signer, Verifier, VerifyReport, VerifyResult};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Sign {
            archive,
            keys,
            private_key_pem,
            certs,
            intermediates,
            no_embed_certs,
        } => cmd_sign(
            &archive,
            &keys,
            private_key_pem.map(Zeroizing::new),
            &certs,
            &intermediates,
            !no_embed_certs,
        ),
        Commands::Verify {
            archive,
            certs,
            keyring,
            no_builtin_with_keyring,
            verbose,
            self_signed,
            json,
        } => {
            let mut verifier = Verifier::new();
            verifier.set_builtin_with_keyring(!no_builtin_with_keyring);
            for cert in &certs {
                verifier
                    .add_certificate(cert)
                    .with_context(|| format!("loading certificate {}", cert.display()))?;
            }

            let result = verifier.verify(&archive, keyring.as_deref(), verbose, self_signed);
            if json {
                println!("{}", VerifyReport::new(&archive, result).to_json()?);
            } else {
                eprintln!("[zipsign] {}: {}", archive.display(), result);
            }
            std::process::exit(exit_code(result))
        }
    }
}

fn cmd_sign(
    archive: &Path,
    keys: &[PathBuf],
    key_pem: Option<Zeroizing<String>>,
    certs: &[PathBuf],
    intermediates: &[PathBuf],
    embed_certs: bool,
) -> Result<()> {
    let mut signer = Signer::new();

    match key_pem {
        Some(pem) if keys.is_empty() => {
            if certs.len() != 1 {
                bail!(
                    "ZIPSIGN_PRIVATE_KEY signs as exactly one --cert, got {}",
                    certs.len()
                );
            }
            let cert = fs::read(&certs[0])
                .with_context(|| format!("reading {}", certs[0].display()))?;
            signer
                .add_signer_from_memory(pem.as_bytes(), &cert)
                .context("loading signer from ZIPSIGN_PRIVATE_KEY")?;
        }
        _ => {
            if keys.len() != certs.len() {
                bail!(
                    "{} private key(s) given for {} certificate(s); pass one --private-key per --cert \
                     or set ZIPSIGN_PRIVATE_KEY",
                    keys.len(),
                    certs.len()
                );
            }
            for (key, cert) in keys.iter().zip(certs) {
                signer
                    .add_signer(key, cert)
                    .with_context(|| format!("loading signer {}", cert.display()))?;
            }
        }
    }

    for path in intermediates {
        signer
            .add_intermediate(path)
            .with_context(|| format!("loading intermediate {}", path.display()))?;
    }
    signer.set_embed_certs(embed_certs);

    eprintln!(
        "[zipsign] Signing {} with {} signer(s)",
        archive.display(),
        signer.signer_count()
    );
    signer
        .sign(archive)
        .with_context(|| format!("signing {}", archive.display()))?;
    eprintln!("[zipsign] Signed: {}", archive.display());

    Ok(())
}

fn exit_code(result: VerifyResult) -> i32 {
    match result {
        VerifyResult::Good => 0,
        VerifyResult::Bad => 1,
        VerifyResult::BadMissingSignature => 2,
        VerifyResult::BadInvalidCertificateChain => 3,
        VerifyResult::BadInvalidSignature => 4,
    }
}
