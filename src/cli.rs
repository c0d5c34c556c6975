// cli.rs - command-line interface definitions (clap derive)
//
//   zipsign sign    - sign an archive in place, replacing its comment
//   zipsign verify  - check an archive's signature against trusted certificates

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "zipsign")]
#[command(about = "Sign and verify ZIP archives with a CMS signature in the archive comment")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign an archive in place. Work on a copy: a failed write can leave
    /// the archive without a comment.
    Sign {
        /// Archive to sign
        #[arg(short = 'f', long = "file")]
        archive: PathBuf,

        /// Private key (PEM or DER); repeat for co-signers, paired with
        /// --cert by position
        #[arg(short = 'p', long = "private-key")]
        keys: Vec<PathBuf>,

        /// PEM private key contents, used when no --private-key is given
        #[arg(long, env = "ZIPSIGN_PRIVATE_KEY", hide_env_values = true)]
        private_key_pem: Option<String>,

        /// Signer certificate (PEM or DER); repeat for co-signers
        #[arg(short = 'c', long = "cert", required = true)]
        certs: Vec<PathBuf>,

        /// Intermediate certificate or PEM bundle offered for chain building
        #[arg(short = 'i', long = "intermediate")]
        intermediates: Vec<PathBuf>,

        /// Leave certificates out of the signature
        #[arg(long)]
        no_embed_certs: bool,
    },

    /// Verify an archive. Exit status: 0 good, 1 bad, 2 missing signature,
    /// 3 invalid certificate chain, 4 invalid signature
    Verify {
        /// Archive to verify
        #[arg(short = 'f', long = "file")]
        archive: PathBuf,

        /// Certificate trusted as both anchor and accepted signer; repeat
        /// for every co-signer
        #[arg(short = 'c', long = "cert")]
        certs: Vec<PathBuf>,

        /// PEM bundle of additional trust anchors
        #[arg(short = 'k', long, env = "ZIPSIGN_KEYRING")]
        keyring: Option<PathBuf>,

        /// Do not trust built-in roots when a keyring is given
        #[arg(long)]
        no_builtin_with_keyring: bool,

        /// Print the reason for a failed verification
        #[arg(short, long)]
        verbose: bool,

        /// Skip chain validation of the given certificates
        #[arg(long)]
        self_signed: bool,

        /// Print a JSON report on stdout
        #[arg(long)]
        json: bool,
    },
}
