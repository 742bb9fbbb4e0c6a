use crate::truststore::StoreFormat;
#[cfg(feature = "backtrace")]
use backtrace::Backtrace;
use std::{
    fmt::{Display, Formatter},
    path::PathBuf,
};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    reason: ErrorReason,
    #[cfg(feature = "backtrace")]
    bt: Backtrace,
}

impl AppError {
    pub(crate) fn new(reason: ErrorReason) -> Self {
        Self {
            reason,
            #[cfg(feature = "backtrace")]
            bt: Backtrace::new(),
        }
    }

    pub fn reason(&self) -> &ErrorReason {
        &self.reason
    }
}

impl<E> From<E> for AppError
where
    E: Into<ErrorReason>,
{
    fn from(reason: E) -> Self {
        Self::new(reason.into())
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", &self.reason)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.reason.source()
    }
}

#[derive(Debug, Error)]
pub enum ErrorReason {
    #[error("no Java home given, pass --jdk or set JAVA_HOME")]
    MissingJavaHome,
    #[error("no cacerts/jssecacerts found, searched: {}", join_paths(.searched))]
    StoreNotFound { searched: Vec<PathBuf> },
    #[error("not a supported keystore ({})", .attempts.join("; "))]
    UnsupportedFormat { attempts: Vec<String> },
    #[error("{format} keystore was tampered with, or password was incorrect")]
    InvalidPassword { format: StoreFormat },
    #[error("unreadable certificate {}: {reason}", .path.display())]
    UnreadableCertificate { path: PathBuf, reason: String },
    #[error("connection to {target} failed: {reason}")]
    ConnectionFailed { target: String, reason: String },
    #[error("keystore {} contains no aliases", .path.display())]
    EmptyKeystore { path: PathBuf },
    #[error("failed to load the configuration")]
    Config(#[from] config::ConfigError),
    #[error("IO error")]
    Io(#[from] std::io::Error),
    #[error("X509 certificate parsing error")]
    X509(#[from] x509_certificate::X509CertificateError),
    #[error("PEM parsing error")]
    Pem(#[from] pem::PemError),
    #[error("Domain name lookup error")]
    Resolver(#[from] hickory_resolver::error::ResolveError),
    #[error("Invalid PEM tag: {0}")]
    InvalidPemTag(String),
    #[error("Invalid endpoint")]
    InvalidEndpoint,
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

