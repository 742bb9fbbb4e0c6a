mod cert;
mod endpoint;
mod target;

pub use cert::*;
pub use endpoint::*;
pub use target::*;
