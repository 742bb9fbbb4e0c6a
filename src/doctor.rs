//! The diagnostic pipeline.
//!
//! Steps run in a fixed order. Locating and loading the trust-store are
//! fatal on failure; every other step only marks itself as failed.

use crate::{
    components::{
        check_installation, inspect_keystore, missing_aliases, validate_files, FailureKind,
        ProbeOutcome, Prober,
    },
    configs::DoctorConfig,
    error::AppResult,
    report::{Diagnostic, Report},
    truststore::{self, EntryKind, TrustStore},
    types::{ParsedCertificate, Target},
};
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub struct Doctor {
    config: DoctorConfig,
}

impl Doctor {
    pub fn new(config: DoctorConfig) -> Self {
        Self { config }
    }

    /// Runs every requested step, writing results to `report` as they finish.
    ///
    /// Returns an error only for fatal failures; failed checks are recorded
    /// in the report.
    pub async fn run<W: Write>(&self, report: &mut Report<W>) -> AppResult<()> {
        let java_home = match self.config.java_home() {
            Ok(java_home) => java_home,
            Err(e) => {
                let mut diagnostic = Diagnostic::new("check_installation");
                diagnostic.fail_error(&e);
                report.push(diagnostic)?;
                return Err(e);
            }
        };

        self.check_installation(report, java_home)?;
        let store_path = self.locate_truststore(report, java_home)?;
        let store = self.load_truststore(report, &store_path)?;
        self.list_aliases(report, &store)?;

        if !self.config.expected.is_empty() {
            self.check_expected_aliases(report, &store)?;
        }
        if !self.config.certfiles.is_empty() {
            self.check_certificate_files(report, &store)?;
        }
        if let Some(keystore) = &self.config.keystore {
            self.inspect_server_keystore(report, keystore)?;
        }
        if let Some(export_path) = &self.config.export_pem {
            self.export_pem_bundle(report, &store, export_path)?;
        }
        if let Some(host) = &self.config.host {
            let target = Target::new(host.as_str(), self.config.port);
            self.probe_handshake(report, &store, &target).await?;
        }

        Ok(())
    }

    fn check_installation<W: Write>(
        &self,
        report: &mut Report<W>,
        java_home: &Path,
    ) -> AppResult<()> {
        let mut diagnostic = Diagnostic::new("check_installation");
        let checks = check_installation(java_home, self.config.tomcat.as_deref());

        for check in &checks {
            let state = if check.present { "exists" } else { "does not exist" };
            diagnostic.line(format!("{} {}: {}", check.label, state, check.path.display()));
        }
        let missing: Vec<&str> = checks
            .iter()
            .filter(|check| !check.present)
            .map(|check| check.label)
            .collect();
        if !missing.is_empty() {
            diagnostic.fail(format!("missing directories: {}", missing.join(", ")));
        }

        report.push(diagnostic)?;
        Ok(())
    }

    fn locate_truststore<W: Write>(
        &self,
        report: &mut Report<W>,
        java_home: &Path,
    ) -> AppResult<PathBuf> {
        let mut diagnostic = Diagnostic::new("locate_truststore");
        match truststore::locate(java_home) {
            Ok(path) => {
                diagnostic.line(format!("Using trust-store: {}", path.display()));
                report.push(diagnostic)?;
                Ok(path)
            }
            Err(e) => {
                diagnostic
                    .fail_error(&e)
                    .help("Check that --jdk (or JAVA_HOME) points to the application's JDK.");
                report.push(diagnostic)?;
                Err(e)
            }
        }
    }

    fn load_truststore<W: Write>(
        &self,
        report: &mut Report<W>,
        path: &Path,
    ) -> AppResult<TrustStore> {
        let mut diagnostic = Diagnostic::new("load_truststore");
        match truststore::load(path, &self.config.storepass) {
            Ok(store) => {
                diagnostic.line(format!(
                    "{} keystore with {} entries ({} distinct certificates)",
                    store.format(),
                    store.len(),
                    store.fingerprints().len()
                ));
                report.push(diagnostic)?;
                Ok(store)
            }
            Err(e) => {
                diagnostic.fail_error(&e);
                report.push(diagnostic)?;
                Err(e)
            }
        }
    }

    fn list_aliases<W: Write>(
        &self,
        report: &mut Report<W>,
        store: &TrustStore,
    ) -> AppResult<()> {
        let mut diagnostic = Diagnostic::new("list_aliases");
        diagnostic.line(format!("Aliases ({}):", store.len()));

        for (alias, entry) in store.entries() {
            let key = match entry.kind() {
                EntryKind::PrivateKey => " [key entry]",
                EntryKind::TrustedCertificate => "",
            };
            let details = match entry.parse() {
                Ok(cert) => {
                    let expiry = cert
                        .expires_at()
                        .map(|at| at.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "?".to_owned());
                    let expired = if cert.is_expired() { " EXPIRED" } else { "" };
                    format!("{}, expires {}{}", cert.subject(), expiry, expired)
                }
                Err(e) => {
                    warn!("Cannot parse the certificate of {}: {}", alias, e);
                    "<unparsable certificate>".to_owned()
                }
            };
            diagnostic.line(format!("  - {}{} ({})", alias, key, details));
        }

        report.push(diagnostic)?;
        Ok(())
    }

    fn check_expected_aliases<W: Write>(
        &self,
        report: &mut Report<W>,
        store: &TrustStore,
    ) -> AppResult<()> {
        let mut diagnostic = Diagnostic::new("check_expected_aliases");
        let missing = missing_aliases(store, &self.config.expected);

        if missing.is_empty() {
            diagnostic.line("All expected aliases are present");
        } else {
            diagnostic
                .fail(format!("missing aliases: {}", missing.join(", ")))
                .help(format!(
                    "Import each missing certificate, e.g.\n\
                     keytool -importcert -alias <alias> -file <certificate> -keystore {}",
                    store.path().display()
                ));
        }

        report.push(diagnostic)?;
        Ok(())
    }

    fn check_certificate_files<W: Write>(
        &self,
        report: &mut Report<W>,
        store: &TrustStore,
    ) -> AppResult<()> {
        let mut diagnostic = Diagnostic::new("check_certificate_files");
        let mut failures = 0;

        for result in validate_files(store, &self.config.certfiles) {
            match result {
                Ok(matched) if matched.found() => diagnostic.line(format!(
                    "{}: imported as {} (Subject: {}, SHA256: {})",
                    matched.file.path.display(),
                    matched.aliases.join(", "),
                    matched.file.certificate.subject(),
                    matched.file.fingerprint
                )),
                Ok(matched) => {
                    failures += 1;
                    diagnostic.line(format!(
                        "{}: not found (Subject: {}, SHA256: {})",
                        matched.file.path.display(),
                        matched.file.certificate.subject(),
                        matched.file.fingerprint
                    ))
                }
                Err(e) => {
                    failures += 1;
                    diagnostic.line(e.to_string())
                }
            };
        }
        if failures > 0 {
            diagnostic.fail(format!(
                "{} of {} certificate files are not in the trust-store",
                failures,
                self.config.certfiles.len()
            ));
        }

        report.push(diagnostic)?;
        Ok(())
    }

    fn inspect_server_keystore<W: Write>(
        &self,
        report: &mut Report<W>,
        path: &Path,
    ) -> AppResult<()> {
        let mut diagnostic = Diagnostic::new("inspect_server_keystore");
        match inspect_keystore(path, self.config.keystore_password()) {
            Ok(keystore) => {
                diagnostic.line(format!(
                    "{} keystore {}:",
                    keystore.format(),
                    keystore.path().display()
                ));
                for alias in keystore.aliases() {
                    diagnostic.line(format!("  - {}", alias));
                }
            }
            Err(e) => {
                diagnostic.fail_error(&e);
            }
        }

        report.push(diagnostic)?;
        Ok(())
    }

    fn export_pem_bundle<W: Write>(
        &self,
        report: &mut Report<W>,
        store: &TrustStore,
        path: &Path,
    ) -> AppResult<()> {
        let mut diagnostic = Diagnostic::new("export_pem_bundle");
        match std::fs::write(path, store.export_pem_bundle()) {
            Ok(()) => {
                diagnostic.line(format!(
                    "{} certificates written to {}",
                    store.len(),
                    path.display()
                ));
            }
            Err(e) => {
                diagnostic.fail(format!("cannot write {}: {}", path.display(), e));
            }
        }

        report.push(diagnostic)?;
        Ok(())
    }

    async fn probe_handshake<W: Write>(
        &self,
        report: &mut Report<W>,
        store: &TrustStore,
        target: &Target,
    ) -> AppResult<()> {
        let mut diagnostic = Diagnostic::new("probe_handshake");
        let outcome = Prober::new(self.config.timeout).probe(store, target).await;

        match outcome {
            ProbeOutcome::HandshakeSucceeded {
                endpoint,
                peer_chain,
            } => {
                diagnostic.line(format!("Handshake with {} ({}) succeeded", target, endpoint));
                describe_chain(&mut diagnostic, &peer_chain);
            }
            ProbeOutcome::HandshakeFailed {
                failure,
                peer_chain,
            } => {
                describe_chain(&mut diagnostic, &peer_chain);
                diagnostic.fail(format!("handshake with {} failed: {}", target, failure));
                if let Some(help) = help_for(failure.kind, store) {
                    diagnostic.help(help);
                }
            }
            ProbeOutcome::ConnectionFailed(e) => {
                diagnostic
                    .fail_error(&e)
                    .help(CONNECTION_HELP);
            }
        }

        report.push(diagnostic)?;
        Ok(())
    }
}

fn describe_chain(diagnostic: &mut Diagnostic, chain: &[ParsedCertificate]) {
    if chain.is_empty() {
        return;
    }
    diagnostic.line("Presented chain:");
    for (depth, cert) in chain.iter().enumerate() {
        diagnostic.line(format!(
            "  [{}] Subject: {}, Issuer: {}",
            depth,
            cert.subject(),
            cert.issuer()
        ));
    }
}

const CONNECTION_HELP: &str = "This is a network problem, not a trust-store problem. \
     Check the host, port, firewall and proxy settings.";
const EXPIRED_HELP: &str =
    "The server certificate has expired and must be renewed on the server.";
const NOT_YET_VALID_HELP: &str =
    "The server certificate is not valid yet. Check the clocks of both hosts.";
const HOSTNAME_MISMATCH_HELP: &str = "The server certificate is not issued for this host name. \
     Connect with the name the application actually uses.";

fn help_for(kind: FailureKind, store: &TrustStore) -> Option<String> {
    let help = match kind {
        FailureKind::PathBuilding => format!(
            "No certificate in {path} issued the presented chain.\n\
             Import the root (or intermediate) CA of the server with\n\
             keytool -importcert -alias <alias> -file <ca.cer> -keystore {path}",
            path = store.path().display()
        ),
        FailureKind::Expired => EXPIRED_HELP.to_owned(),
        FailureKind::NotYetValid => NOT_YET_VALID_HELP.to_owned(),
        FailureKind::HostnameMismatch => HOSTNAME_MISMATCH_HELP.to_owned(),
        FailureKind::NoTrustAnchors => format!(
            "{} holds no certificate usable as a trust anchor.",
            store.path().display()
        ),
        _ => return None,
    };
    Some(help)
}
