//! Trusted caller ACL for stored credentials
//!
//! The plugins below pull and push images on the user's behalf and need to read
//! registry credentials. The ACL is rebuilt from disk on every login, so an
//! uninstalled plugin loses access the next time the user logs in.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Plugin binaries, relative to the install root
pub const TRUSTED_PLUGINS: &[&str] = &[
    "libexec/registry-login/plugins/image-store/bin/image-store",
    "libexec/registry-login/plugins/image-builder/bin/image-builder",
];

/// Absolute paths of the trusted plugins currently present under `install_root`
pub fn compute_trusted_paths(install_root: &Path) -> Result<Vec<PathBuf>> {
    let root = std::path::absolute(install_root)?;

    let mut trusted: Vec<PathBuf> = Vec::with_capacity(TRUSTED_PLUGINS.len());
    for relative in TRUSTED_PLUGINS {
        let candidate = root.join(relative);
        if candidate.is_file() && !trusted.contains(&candidate) {
            trusted.push(candidate);
        }
    }

    Ok(trusted)
}

/// Install root of the running binary: `<root>/bin/<exe>` gives `<root>`
pub fn default_install_root() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let exe = exe.canonicalize().unwrap_or(exe);
    Ok(install_root_for(&exe))
}

fn install_root_for(exe: &Path) -> PathBuf {
    let bin_dir = exe.parent().unwrap_or(Path::new("/"));
    bin_dir.parent().unwrap_or(bin_dir).to_path_buf()
}
