//! Logging utilities.
//!
//! This module centralizes logger initialization. Library code only talks to
//! the `log` facade; the embedding process decides whether to install the
//! `env_logger` backend provided here.

mod init;

pub use init::{init_logging, LoggingConfig};
