mod expectation;
mod fingerprint;
mod installation;
mod keystore;
mod prober;

pub use expectation::missing_aliases;
pub use fingerprint::validate_files;
pub use installation::check_installation;
pub use keystore::inspect_keystore;
pub use prober::{FailureKind, ProbeOutcome, Prober};
