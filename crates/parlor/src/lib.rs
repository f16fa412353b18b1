//! A terminal client for remote assistants.
//!
//! The crate includes a CLI tool for using in the terminal. The pieces it
//! is made of (configuration from the environment, input parsing and
//! transcript export) are exposed as a library as well.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod export;
mod input;
mod session;

pub use config::{CliConfig, ConfigError};
pub use export::TranscriptExporter;
pub use input::Input;
pub use session::{Session, SessionBuilder};

/// Re-exports of [`parlor_core`] crate.
pub mod core {
    pub use parlor_core::*;
}
