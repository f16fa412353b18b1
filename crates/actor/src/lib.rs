//! A lightweight actor runtime.
//!
//! An actor owns its state and handles messages one at a time on a tokio
//! task. This gives a single logical thread of mutation without locks,
//! while handlers hand slow work to spawned tasks that report back with
//! messages.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod mailbox;
mod reply;
mod scheduler;

pub use error::ActorDeadError;
pub use handle::Actor;
pub use mailbox::Message;
pub use reply::Reply;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        value: u32,
        waiters: Vec<Reply<u32>>,
    }

    #[derive(Debug)]
    struct Add(u32);

    impl Message<Counter> for Add {
        fn handle(self, state: &mut Counter, _handle: &Actor<Counter>) {
            state.value += self.0;
            if state.value >= 10 {
                for waiter in state.waiters.drain(..) {
                    waiter.send(state.value);
                }
            }
        }
    }

    #[derive(Debug)]
    struct Get(Reply<u32>);

    impl Message<Counter> for Get {
        fn handle(self, state: &mut Counter, _handle: &Actor<Counter>) {
            self.0.send(state.value);
        }
    }

    #[derive(Debug)]
    struct WaitForTen(Reply<u32>);

    impl Message<Counter> for WaitForTen {
        fn handle(self, state: &mut Counter, _handle: &Actor<Counter>) {
            state.waiters.push(self.0);
        }
    }

    #[derive(Debug)]
    struct Forget(Reply<u32>);

    impl Message<Counter> for Forget {
        fn handle(self, _state: &mut Counter, _handle: &Actor<Counter>) {}
    }

    #[tokio::test]
    async fn test_send_and_ask() {
        let actor = Actor::spawn(Counter::default(), "counter");
        actor.send(Add(42)).unwrap();
        assert_eq!(actor.ask(Get).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_deferred_reply() {
        let actor = Actor::spawn(Counter::default(), "counter");
        // `join!` polls the request first, so it is queued before the adds.
        let (answer, _) = tokio::join!(actor.ask(WaitForTen), async {
            for _ in 0..5 {
                actor.send(Add(2)).unwrap();
            }
        });
        assert_eq!(answer.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_dropped_reply() {
        let actor = Actor::spawn(Counter::default(), "counter");
        assert_eq!(actor.ask(Forget).await, Err(ActorDeadError));
    }
}
