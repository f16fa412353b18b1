use std::fmt;

use tokio::sync::oneshot;

/// The answering half of a request made with [`crate::Actor::ask`].
///
/// Messages carry it and fulfil it from their handler, possibly much later,
/// after the actor has stashed it in its state.
pub struct Reply<R>(oneshot::Sender<R>);

impl<R> Reply<R> {
    #[inline]
    pub(crate) fn new(tx: oneshot::Sender<R>) -> Self {
        Self(tx)
    }

    /// Answers the request. Answers to a caller that gave up are dropped.
    #[inline]
    pub fn send(self, value: R) {
        if self.0.send(value).is_err() {
            trace!("requester has gone away, dropping the answer");
        }
    }

    /// Returns whether the requester has stopped waiting.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

impl<R> fmt::Debug for Reply<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("closed", &self.0.is_closed())
            .finish()
    }
}
