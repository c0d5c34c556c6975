// build.rs - embed optional built-in trust anchors
//
// If `certs/builtin-roots.pem` exists (or the file named by the
// ZIPSIGN_BUILTIN_ROOTS environment variable), it is copied into OUT_DIR and
// `cfg(has_builtin_roots)` is set so `trust.rs` can include it.

use std::{env, error::Error, fs, path::PathBuf};

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rustc-check-cfg=cfg(has_builtin_roots)");
    println!("cargo:rerun-if-env-changed=ZIPSIGN_BUILTIN_ROOTS");

    let roots = env::var_os("ZIPSIGN_BUILTIN_ROOTS")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("certs").join("builtin-roots.pem"));
    println!("cargo:rerun-if-changed={}", roots.display());

    if roots.exists() {
        let out_dir = PathBuf::from(env::var("OUT_DIR")?);
        fs::copy(&roots, out_dir.join("builtin_roots.pem"))?;
        println!("cargo:rustc-cfg=has_builtin_roots");
    }
    Ok(())
}
