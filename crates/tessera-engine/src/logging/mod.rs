//! Logging utilities.
//!
//! This module centralizes logger initialization. The engine itself only talks
//! to the `log` facade; `env_logger` is the default backend for hosts and tests.

mod init;

pub use init::{init_logging, init_test_logging, LoggingConfig};
