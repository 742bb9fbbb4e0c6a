use clap::Parser;
use config::Value;
use std::path::{Path, PathBuf};

/// Diagnose the trust-store of a Java installation.
#[derive(Clone, Debug, Default, Parser)]
#[command(name = "truststore-doctor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Java home; defaults to JAVA_HOME
    #[arg(long, value_name = "DIR")]
    pub jdk: Option<PathBuf>,

    /// Trust-store password [default: changeit]
    #[arg(long, value_name = "PW")]
    pub storepass: Option<String>,

    /// Aliases that must be present
    #[arg(long, value_name = "ALIASES", value_delimiter = ',')]
    pub expected: Vec<String>,

    /// Certificate files (DER or PEM) that must be imported
    #[arg(long, value_name = "FILES", value_delimiter = ',')]
    pub certfiles: Vec<String>,

    /// Host to probe with a TLS handshake
    #[arg(long)]
    pub host: Option<String>,

    /// Port to probe [default: 443]
    #[arg(long)]
    pub port: Option<u16>,

    /// Network timeout, e.g. `5s` or `1500ms` [default: 5s]
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Application server home (CATALINA_HOME) to check
    #[arg(long, value_name = "DIR")]
    pub tomcat: Option<PathBuf>,

    /// Server keystore to inspect
    #[arg(long, value_name = "FILE")]
    pub keystore: Option<PathBuf>,

    /// Server keystore password; defaults to the trust-store password
    #[arg(long, value_name = "PW")]
    pub keypass: Option<String>,

    /// Write the exported PEM bundle to this path
    #[arg(long, value_name = "FILE")]
    pub export_pem: Option<PathBuf>,

    /// Configuration file to read instead of ./truststore-doctor.{toml,yaml,json}
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Flags given on the command line, keyed like the configuration file.
    pub fn overrides(&self) -> Vec<(&'static str, Value)> {
        fn path(p: &Path) -> Value {
            Value::from(p.to_string_lossy().into_owned())
        }

        let mut values = Vec::new();
        if let Some(jdk) = &self.jdk {
            values.push(("jdk", path(jdk)));
        }
        if let Some(storepass) = &self.storepass {
            values.push(("storepass", Value::from(storepass.as_str())));
        }
        if !self.expected.is_empty() {
            values.push(("expected", Value::from(self.expected.clone())));
        }
        if !self.certfiles.is_empty() {
            values.push(("certfiles", Value::from(self.certfiles.clone())));
        }
        if let Some(host) = &self.host {
            values.push(("host", Value::from(host.as_str())));
        }
        if let Some(port) = self.port {
            values.push(("port", Value::from(i64::from(port))));
        }
        if let Some(timeout) = &self.timeout {
            values.push(("timeout", Value::from(timeout.as_str())));
        }
        if let Some(tomcat) = &self.tomcat {
            values.push(("tomcat", path(tomcat)));
        }
        if let Some(keystore) = &self.keystore {
            values.push(("keystore", path(keystore)));
        }
        if let Some(keypass) = &self.keypass {
            values.push(("keypass", Value::from(keypass.as_str())));
        }
        if let Some(export_pem) = &self.export_pem {
            values.push(("export_pem", path(export_pem)));
        }
        values
    }
}
