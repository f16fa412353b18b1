use std::pin::Pin;
use std::sync::Arc;

use parlor_model::{
    AssistantBackend, BackendError, ContentBlock, Role, RunStatus,
};
use tokio::time::sleep;
use tracing::Instrument;

use crate::error::{ExchangeError, ExchangeErrorKind};
use crate::poll::PollPolicy;

type BoxedExchangeFuture =
    Pin<Box<dyn Future<Output = ExchangeOutcome> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ExchangeRequest, PollPolicy) -> BoxedExchangeFuture + Send + Sync
>;

/// One user turn to be answered by an assistant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeRequest {
    /// The remote assistant identifier.
    pub assistant_id: String,
    /// The thread to continue, or `None` to start a new one.
    pub thread_id: Option<String>,
    /// The user's text.
    pub text: String,
}

/// What an exchange produced.
///
/// The thread identifier is reported even when the exchange failed after
/// the thread was created, so the caller can keep using it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeOutcome {
    /// The thread the exchange ran on, if one exists.
    pub thread_id: Option<String>,
    /// The assistant's reply text.
    pub result: Result<String, ExchangeError>,
}

/// A wrapper around an assistant backend that drives the exchange protocol
/// and provides a type-erased interface for the other modules.
#[derive(Clone)]
pub struct RunClient {
    handler_fn: HandlerFn,
    poll_policy: PollPolicy,
}

impl RunClient {
    /// Creates a client for `backend` with the default poll policy.
    pub fn new<B: AssistantBackend + 'static>(backend: B) -> Self {
        // Erase `B` so the manager state doesn't need a type parameter.
        let backend = Arc::new(backend);
        let handler_fn: HandlerFn = Arc::new(move |req, poll_policy| {
            let backend = Arc::clone(&backend);
            Box::pin(
                async move {
                    trace!("got a request: {req:?}");
                    let mut thread_id = req.thread_id.clone();
                    let result =
                        exchange(&*backend, &req, poll_policy, &mut thread_id)
                            .await;
                    ExchangeOutcome { thread_id, result }
                }
                .instrument(trace_span!("exchange")),
            )
        });
        Self {
            handler_fn,
            poll_policy: PollPolicy::default(),
        }
    }

    /// Replaces the poll policy.
    #[inline]
    pub fn with_poll_policy(mut self, poll_policy: PollPolicy) -> Self {
        self.poll_policy = poll_policy;
        self
    }

    /// Sends the user's text on the thread, runs the assistant and waits
    /// for its reply.
    #[inline]
    pub async fn exchange(&self, req: ExchangeRequest) -> ExchangeOutcome {
        (self.handler_fn)(req, self.poll_policy).await
    }
}

async fn exchange<B: AssistantBackend>(
    backend: &B,
    req: &ExchangeRequest,
    poll_policy: PollPolicy,
    thread_slot: &mut Option<String>,
) -> Result<String, ExchangeError> {
    if req.assistant_id.is_empty() {
        return Err(ExchangeError::new(ExchangeErrorKind::Configuration)
            .with_reason("the assistant id is empty"));
    }

    let thread_id = match thread_slot {
        Some(thread_id) => thread_id.clone(),
        None => {
            let thread_id =
                backend.create_thread().await.map_err(network_error)?;
            debug!("started thread {thread_id}");
            *thread_slot = Some(thread_id.clone());
            thread_id
        }
    };

    backend
        .create_message(&thread_id, Role::User, &req.text)
        .await
        .map_err(network_error)?;
    let run = backend
        .create_run(&thread_id, &req.assistant_id)
        .await
        .map_err(network_error)?;
    debug!("started run {} on thread {thread_id}", run.id);

    let mut schedule = poll_policy.schedule();
    loop {
        let polled = backend
            .retrieve_run(&thread_id, &run.id)
            .await
            .map_err(network_error)?;
        match polled.status {
            RunStatus::Completed => break,
            RunStatus::Failed => {
                return Err(ExchangeError::new(ExchangeErrorKind::RunFailed)
                    .with_reason(format!("run {} failed", run.id)));
            }
            RunStatus::Expired => {
                return Err(ExchangeError::new(ExchangeErrorKind::RunExpired)
                    .with_reason(format!("run {} expired", run.id)));
            }
            status => trace!("run {} is {status:?}", run.id),
        }
        let Some(delay) = schedule.next_delay() else {
            warn!("giving up on run {}", run.id);
            return Err(ExchangeError::new(ExchangeErrorKind::RunTimeout)
                .with_reason(format!(
                    "run {} didn't finish after {} polls",
                    run.id,
                    schedule.attempts()
                )));
        };
        sleep(delay).await;
    }

    let messages = backend
        .list_messages(&thread_id)
        .await
        .map_err(network_error)?;
    let Some(latest) = messages.into_iter().next() else {
        return Err(ExchangeError::new(ExchangeErrorKind::NoAssistantReply)
            .with_reason("the thread has no messages"));
    };
    if latest.role != Role::Assistant {
        return Err(ExchangeError::new(ExchangeErrorKind::NoAssistantReply)
            .with_reason(format!("{} is not from the assistant", latest.id)));
    }
    match latest.content.into_iter().next() {
        Some(ContentBlock::Text { value }) => Ok(value),
        _ => Err(ExchangeError::new(ExchangeErrorKind::UnsupportedContent)
            .with_reason(format!("{} doesn't start with text", latest.id))),
    }
}

fn network_error<E: BackendError>(err: E) -> ExchangeError {
    error!("backend call failed: {err}");
    ExchangeError::new(ExchangeErrorKind::Network)
        .with_reason(format!("{:?}: {err}", err.kind()))
}
