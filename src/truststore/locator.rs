use crate::error::{AppResult, ErrorReason};
use std::path::{Path, PathBuf};

/// `jssecacerts` overrides `cacerts` when both exist.
const STORE_NAMES: [&str; 2] = ["jssecacerts", "cacerts"];

/// JDK 9+ layout first, then the JDK 8 `jre/` layout.
const SECURITY_DIRS: [&[&str]; 2] = [&["lib", "security"], &["jre", "lib", "security"]];

/// Every path searched for a trust-store, in preference order.
pub fn candidates(java_home: &Path) -> Vec<PathBuf> {
    SECURITY_DIRS
        .iter()
        .flat_map(|dir| {
            STORE_NAMES.iter().map(move |name| {
                let mut path = java_home.to_path_buf();
                path.extend(dir.iter());
                path.push(name);
                path
            })
        })
        .collect()
}

pub fn locate(java_home: &Path) -> AppResult<PathBuf> {
    let searched = candidates(java_home);
    for path in &searched {
        trace!("Checking {}", path.display());
        if path.is_file() {
            debug!("Found trust-store at {}", path.display());
            return Ok(path.clone());
        }
    }

    Err(ErrorReason::StoreNotFound { searched }.into())
}
