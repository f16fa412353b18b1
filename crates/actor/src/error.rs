use std::error::Error;
use std::fmt;

/// Returned when a message is sent to an actor that has stopped, or when
/// an actor stops before answering a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActorDeadError;

impl fmt::Display for ActorDeadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "the actor has stopped".fmt(f)
    }
}

impl Error for ActorDeadError {}
