use crate::error::{AppError, ErrorReason};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host: String = host.into();
        // Bracketed IPv6 literals are only needed in the `host:port` notation
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .map(str::to_owned)
            .unwrap_or(host);
        Self { host, port }
    }
}

impl FromStr for Target {
    type Err = AppError;

    fn from_str(target: &str) -> Result<Self, Self::Err> {
        let (host, port) = target
            .rsplit_once(':')
            .ok_or(ErrorReason::InvalidEndpoint)?;
        let port: u16 = port.parse().map_err(|_| ErrorReason::InvalidEndpoint)?;
        if host.is_empty() {
            return Err(ErrorReason::InvalidEndpoint.into());
        }

        Ok(Target::new(host, port))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
