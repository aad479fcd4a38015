//! Process-wide `tracing` setup. Start with [`Logger::new_bootstrap`] before
//! settings are read, then apply the configured filter.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
