use std::sync::Weak;

use tokio::select;

use crate::Actor;
use crate::mailbox::{Inbox, Mailbox};

pub(crate) async fn run_actor<S: Send + 'static>(
    mailbox: Weak<Mailbox<S>>,
    mut state: S,
    inbox: Inbox<S>,
) {
    let Inbox {
        mut msg_rx,
        mut kill_rx,
    } = inbox;

    debug!("started");
    loop {
        let msg = select! {
            biased;

            _ = kill_rx.changed() => {
                break;
            }
            msg = msg_rx.recv() => {
                let Some(msg) = msg else {
                    break;
                };
                msg
            }
        };
        trace!("received message: {msg:?}");

        // Handles given to the handler must be able to reach the mailbox;
        // once every external handle is gone there is nobody left to talk
        // to.
        let Some(mailbox) = mailbox.upgrade() else {
            warn!("last handle has been dropped, discard the message");
            break;
        };
        trace_span!("proc msg").in_scope(|| {
            msg.handle_box(&mut state, &Actor::from_mailbox(mailbox));
        });
    }
    debug!("will terminate");
}
