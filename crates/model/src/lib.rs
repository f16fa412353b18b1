//! Data model and backend contract for assistant conversations.
//!
//! This crate defines the messages and records a conversation is made of,
//! and the primitives a remote assistant API has to offer so that the
//! conversation manager can drive it: threads, messages and runs.
//!
//! Types in this crate don't define any behavior beyond plain data helpers.
//! The traits are the constraints that backend implementors should adhere
//! to.

#![deny(missing_docs)]

mod backend;
mod error;
mod message;
mod record;
mod run;

pub use backend::*;
pub use error::*;
pub use message::*;
pub use record::*;
pub use run::*;
