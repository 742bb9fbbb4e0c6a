use std::path::{Path, PathBuf};

/// Whether an installation directory is where the caller said it is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathCheck {
    pub label: &'static str,
    pub path: PathBuf,
    pub present: bool,
}

impl PathCheck {
    pub fn directory(label: &'static str, path: &Path) -> Self {
        let present = path.is_dir();
        if present {
            debug!("{} found at {}", label, path.display());
        } else {
            warn!("{} missing: {}", label, path.display());
        }
        Self {
            label,
            path: path.to_path_buf(),
            present,
        }
    }
}

/// Checks the Java home, then the application-server home when one is given.
pub fn check_installation(java_home: &Path, server_home: Option<&Path>) -> Vec<PathCheck> {
    let mut checks = vec![PathCheck::directory("Java home", java_home)];
    if let Some(server_home) = server_home {
        checks.push(PathCheck::directory("Tomcat home", server_home));
    }
    checks
}
