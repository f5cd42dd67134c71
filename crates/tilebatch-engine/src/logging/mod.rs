//! Logging utilities.
//!
//! Centralizes logger initialization. Library code only uses the `log`
//! facade; binaries choose the `env_logger` backend through [`init_logging`].

mod init;

pub use init::{init_logging, LoggingConfig};
