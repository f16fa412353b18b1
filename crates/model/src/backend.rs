use std::error::Error;

use crate::error::BackendErrorKind;
use crate::message::Role;
use crate::run::{Run, ThreadMessage};

/// The error type for an assistant backend.
pub trait BackendError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> BackendErrorKind;
}

/// A remote assistant API, exposed as its thread and run primitives.
///
/// Once the backend is created, it should behave like a stateless object.
/// Returned futures must not borrow from `self` or the arguments, so that
/// callers can drive them from spawned tasks.
pub trait AssistantBackend: Send + Sync {
    /// The error type that may be returned by the backend.
    type Error: BackendError;

    /// Creates an empty thread and returns its identifier.
    fn create_thread(
        &self,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'static;

    /// Appends a text message to a thread.
    fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        text: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static;

    /// Starts a run of `assistant_id` against a thread.
    fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> impl Future<Output = Result<Run, Self::Error>> + Send + 'static;

    /// Fetches the current state of a run.
    fn retrieve_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> impl Future<Output = Result<Run, Self::Error>> + Send + 'static;

    /// Lists the messages of a thread.
    ///
    /// Implementations must return the newest message first.
    fn list_messages(
        &self,
        thread_id: &str,
    ) -> impl Future<Output = Result<Vec<ThreadMessage>, Self::Error>> + Send + 'static;
}
