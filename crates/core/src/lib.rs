//! Conversation lifecycle for remote assistants: selecting an assistant,
//! exchanging turns through runs, and keeping every conversation in a
//! store.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod conversation;
mod directory;
mod error;
mod manager;
mod poll;
mod run_client;
pub mod transcript;

pub use directory::{AssistantDirectory, ParseDirectoryError};
pub use error::{ExchangeError, ExchangeErrorKind};
pub use manager::{
    APOLOGY_TEXT, CONFIGURATION_ERROR_TEXT, ConversationManager,
    DEFAULT_EXPORT_KEYWORD, DEFAULT_TRIGGER_TEXT, ManagerBuilder, Snapshot,
};
pub use poll::PollPolicy;
pub use run_client::{ExchangeOutcome, ExchangeRequest, RunClient};
