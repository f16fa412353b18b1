//! A local fake assistant backend for testing purpose.

mod preset;

use std::collections::{HashMap, HashSet, VecDeque};
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use parlor_model::{
    AssistantBackend, BackendError, BackendErrorKind, ContentBlock, Role, Run,
    RunStatus, ThreadMessage,
};
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    #[allow(dead_code)]
    message: &'static str,
    kind: BackendErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl BackendError for Error {
    #[inline]
    fn kind(&self) -> BackendErrorKind {
        self.kind
    }
}

/// One of the backend primitives, used to inject failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateThread,
    CreateMessage,
    CreateRun,
    RetrieveRun,
    ListMessages,
}

/// How many times each primitive has been called.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create_thread: usize,
    pub create_message: usize,
    pub create_run: usize,
    pub retrieve_run: usize,
    pub list_messages: usize,
}

impl CallCounts {
    /// Total number of calls across all primitives.
    #[inline]
    pub fn total(&self) -> usize {
        self.create_thread
            + self.create_message
            + self.create_run
            + self.retrieve_run
            + self.list_messages
    }
}

struct RunState {
    thread_id: String,
    statuses: VecDeque<RunStatus>,
    reply: Option<PresetReply>,
}

#[derive(Default)]
struct Inner {
    script: VecDeque<ScriptedRun>,
    // Messages are kept oldest first, listings reverse them.
    threads: HashMap<String, Vec<ThreadMessage>>,
    runs: HashMap<String, RunState>,
    failing: HashSet<Operation>,
    counts: CallCounts,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }

    fn take_failure(&mut self, op: Operation) -> Result<(), Error> {
        if self.failing.remove(&op) {
            return Err(Error {
                message: "injected failure",
                kind: BackendErrorKind::Network,
            });
        }
        Ok(())
    }

    fn push_message(
        &mut self,
        thread_id: &str,
        role: Role,
        content: Vec<ContentBlock>,
    ) -> Result<(), Error> {
        let id = self.next_id("msg");
        let Some(messages) = self.threads.get_mut(thread_id) else {
            return Err(Error {
                message: "no such thread",
                kind: BackendErrorKind::Api,
            });
        };
        messages.push(ThreadMessage { id, role, content });
        Ok(())
    }
}

/// A local fake assistant backend for testing purpose.
///
/// Before starting runs, you need to setup the script, which is how each
/// run should behave. Runs consume the script in order. If there are no
/// enough scripted runs, starting a run returns an error.
///
/// Clones share the same threads, script and call counters, so a test can
/// keep a clone around to inspect what the code under test did.
#[derive(Clone, Default)]
pub struct TestBackend {
    inner: Arc<Mutex<Inner>>,
    delay: Option<Duration>,
}

impl TestBackend {
    /// Appends a run to the script.
    #[inline]
    pub fn add_run(&self, run: ScriptedRun) {
        self.lock().script.push_back(run);
    }

    /// Makes the next call of `op` fail with a network error.
    #[inline]
    pub fn fail_next(&self, op: Operation) {
        self.lock().failing.insert(op);
    }

    /// Delays every response by `duration`.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns the call counters.
    #[inline]
    pub fn calls(&self) -> CallCounts {
        self.lock().counts
    }

    /// Returns the messages of a thread, oldest first.
    pub fn thread_messages(
        &self,
        thread_id: &str,
    ) -> Option<Vec<ThreadMessage>> {
        self.lock().threads.get(thread_id).cloned()
    }

    /// Returns the number of scripted runs not started yet.
    #[inline]
    pub fn remaining_runs(&self) -> usize {
        self.lock().script.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not hide the state from the others.
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn respond<T: Send + 'static>(
        &self,
        result: Result<T, Error>,
    ) -> impl Future<Output = Result<T, Error>> + Send + 'static {
        let delay = self.delay;
        async move {
            if let Some(delay) = delay {
                sleep(delay).await;
            }
            result
        }
    }
}

impl AssistantBackend for TestBackend {
    type Error = crate::Error;

    fn create_thread(
        &self,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'static {
        let result = {
            let mut inner = self.lock();
            inner.counts.create_thread += 1;
            inner.take_failure(Operation::CreateThread).map(|_| {
                let id = inner.next_id("thread");
                inner.threads.insert(id.clone(), vec![]);
                id
            })
        };
        self.respond(result)
    }

    fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        text: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let result = {
            let mut inner = self.lock();
            inner.counts.create_message += 1;
            inner.take_failure(Operation::CreateMessage).and_then(|_| {
                let content = vec![ContentBlock::text(text)];
                inner.push_message(thread_id, role, content)
            })
        };
        self.respond(result)
    }

    fn create_run(
        &self,
        thread_id: &str,
        _assistant_id: &str,
    ) -> impl Future<Output = Result<Run, Self::Error>> + Send + 'static {
        let result = 'blk: {
            let mut inner = self.lock();
            inner.counts.create_run += 1;
            if let Err(err) = inner.take_failure(Operation::CreateRun) {
                break 'blk Err(err);
            }
            if !inner.threads.contains_key(thread_id) {
                break 'blk Err(Error {
                    message: "no such thread",
                    kind: BackendErrorKind::Api,
                });
            }
            let Some(scripted) = inner.script.pop_front() else {
                break 'blk Err(Error {
                    message: "no enough runs",
                    kind: BackendErrorKind::Other,
                });
            };

            let id = inner.next_id("run");
            let mut statuses: VecDeque<_> = scripted.statuses.into();
            if statuses.is_empty() {
                statuses.push_back(RunStatus::Completed);
            }
            inner.runs.insert(
                id.clone(),
                RunState {
                    thread_id: thread_id.to_owned(),
                    statuses,
                    reply: Some(scripted.reply),
                },
            );
            Ok(Run {
                id,
                status: RunStatus::Queued,
            })
        };
        self.respond(result)
    }

    fn retrieve_run(
        &self,
        _thread_id: &str,
        run_id: &str,
    ) -> impl Future<Output = Result<Run, Self::Error>> + Send + 'static {
        let result = 'blk: {
            let mut inner = self.lock();
            inner.counts.retrieve_run += 1;
            if let Err(err) = inner.take_failure(Operation::RetrieveRun) {
                break 'blk Err(err);
            }
            let Some(run) = inner.runs.get_mut(run_id) else {
                break 'blk Err(Error {
                    message: "no such run",
                    kind: BackendErrorKind::Api,
                });
            };

            let status = if run.statuses.len() > 1 {
                run.statuses.pop_front().unwrap_or(RunStatus::Completed)
            } else {
                run.statuses.front().copied().unwrap_or(RunStatus::Completed)
            };
            // The reply shows up on the thread the first time the run is
            // seen completed.
            let reply = if status == RunStatus::Completed {
                run.reply.take().map(|reply| (run.thread_id.clone(), reply))
            } else {
                None
            };

            if let Some((thread_id, reply)) = reply {
                let content = match reply {
                    PresetReply::Text(text) => {
                        Some(vec![ContentBlock::text(text)])
                    }
                    PresetReply::Content(content) => Some(content),
                    PresetReply::Nothing => None,
                };
                if let Some(content) = content {
                    if let Err(err) =
                        inner.push_message(&thread_id, Role::Assistant, content)
                    {
                        break 'blk Err(err);
                    }
                }
            }

            Ok(Run {
                id: run_id.to_owned(),
                status,
            })
        };
        self.respond(result)
    }

    fn list_messages(
        &self,
        thread_id: &str,
    ) -> impl Future<Output = Result<Vec<ThreadMessage>, Self::Error>> + Send + 'static
    {
        let result = {
            let mut inner = self.lock();
            inner.counts.list_messages += 1;
            inner.take_failure(Operation::ListMessages).and_then(|_| {
                inner
                    .threads
                    .get(thread_id)
                    .map(|messages| messages.iter().rev().cloned().collect())
                    .ok_or(Error {
                        message: "no such thread",
                        kind: BackendErrorKind::Api,
                    })
            })
        };
        self.respond(result)
    }
}
