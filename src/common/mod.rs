//! Configuration, errors and the time source shared by every module.

pub mod clock;
pub mod config;
pub mod errors;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BackendConfig, NamingConfig, SidekickConfig, StorageConfig, StorageKind};
pub use errors::{SidekickError, SidekickResult};
