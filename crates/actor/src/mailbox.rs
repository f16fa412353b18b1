use std::fmt::Debug;

use tokio::sync::{mpsc, watch};

use crate::{Actor, ActorDeadError};

/// Helper trait for handling boxed messages.
pub trait BoxMessage<S>: Send + Debug + 'static {
    fn handle_box(self: Box<Self>, state: &mut S, handle: &Actor<S>);
}

/// A message that an actor can handle.
///
/// Handlers run one at a time with exclusive access to the state, so they
/// must not block. Slow work belongs in a spawned task that reports back
/// with another message.
pub trait Message<S>: BoxMessage<S> {
    /// Handles the message with mutable access to the actor's state.
    fn handle(self, state: &mut S, handle: &Actor<S>);
}

impl<S, M: Message<S>> BoxMessage<S> for M {
    #[inline]
    fn handle_box(self: Box<Self>, state: &mut S, handle: &Actor<S>) {
        (*self).handle(state, handle)
    }
}

impl<S, M: Message<S> + ?Sized> Message<S> for Box<M> {
    #[inline]
    fn handle(self, state: &mut S, handle: &Actor<S>) {
        self.handle_box(state, handle)
    }
}

pub(crate) type BoxedMessage<S> = Box<dyn Message<S>>;

pub(crate) struct Mailbox<S> {
    msg_tx: mpsc::UnboundedSender<BoxedMessage<S>>,
    kill_tx: watch::Sender<bool>,
}

pub(crate) struct Inbox<S> {
    pub msg_rx: mpsc::UnboundedReceiver<BoxedMessage<S>>,
    pub kill_rx: watch::Receiver<bool>,
}

impl<S: Send + 'static> Mailbox<S> {
    #[inline]
    pub fn new() -> (Self, Inbox<S>) {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = watch::channel(false);
        (Mailbox { msg_tx, kill_tx }, Inbox { msg_rx, kill_rx })
    }

    #[inline]
    pub fn send(&self, msg: BoxedMessage<S>) -> Result<(), ActorDeadError> {
        self.msg_tx.send(msg).map_err(|_| ActorDeadError)
    }

    #[inline]
    pub fn try_kill(&self) {
        self.kill_tx.send(true).ok();
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.msg_tx.is_closed()
    }
}
