use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::Instrument;

use crate::mailbox::Mailbox;
use crate::scheduler::run_actor;
use crate::{ActorDeadError, Message, Reply};

/// Handle to an actor.
///
/// The actor keeps running as long as a handle (or a clone of it) is
/// alive, or until it is killed.
pub struct Actor<S> {
    mailbox: Arc<Mailbox<S>>,
}

impl<S: Send + 'static> Actor<S> {
    /// Spawns a new actor with the specified state and a label used in
    /// its tracing span.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(state: S, label: &str) -> Self {
        let (mailbox, inbox) = Mailbox::new();
        let mailbox = Arc::new(mailbox);
        tokio::spawn(
            run_actor(Arc::downgrade(&mailbox), state, inbox)
                .instrument(debug_span!("actor", label = label)),
        );
        Self { mailbox }
    }

    #[inline]
    pub(crate) fn from_mailbox(mailbox: Arc<Mailbox<S>>) -> Self {
        Self { mailbox }
    }

    /// Sends a message to the actor.
    #[inline]
    pub fn send<M: Message<S> + 'static>(
        &self,
        msg: M,
    ) -> Result<(), ActorDeadError> {
        self.mailbox.send(Box::new(msg))
    }

    /// Sends a message carrying a [`Reply`] and waits for the answer.
    ///
    /// Fails if the actor is gone, or if it drops the reply without
    /// answering.
    pub async fn ask<R, M, F>(&self, make_msg: F) -> Result<R, ActorDeadError>
    where
        R: Send + 'static,
        M: Message<S> + 'static,
        F: FnOnce(Reply<R>) -> M,
    {
        let (tx, rx) = oneshot::channel();
        self.send(make_msg(Reply::new(tx)))?;
        rx.await.map_err(|_| ActorDeadError)
    }

    /// Attempts to kill the actor.
    ///
    /// The actor is not guaranteed to be killed immediately, but it
    /// will stop handling further messages and quit soon.
    #[inline]
    pub fn try_kill(&self) {
        self.mailbox.try_kill();
    }

    /// Returns whether the actor has stopped receiving messages.
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.mailbox.is_closed()
    }
}

impl<S> Clone for Actor<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}
