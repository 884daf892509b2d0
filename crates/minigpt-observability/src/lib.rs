//! Logging infrastructure for minigpt.
//!
//! Builds a `tracing` subscriber from [`LoggingConfig`]: an `EnvFilter`
//! (reloadable at runtime) plus a plain or JSON `fmt` layer writing either to
//! stdout or to a daily rolling file.

pub mod error;
pub mod logging;

pub use error::{ObservabilityError, Result};
pub use logging::{build_filter, init_logging, LogManager};

pub use minigpt_config::LoggingConfig;
