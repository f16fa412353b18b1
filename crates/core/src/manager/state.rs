use std::sync::Arc;

use parlor_actor::{Actor, Message as ActorMessage, Reply};
use parlor_model::{ConversationRecord, Message};
use parlor_store::Error as StoreError;

use super::{
    APOLOGY_TEXT, CONFIGURATION_ERROR_TEXT, ManagerState, Snapshot,
};
use crate::conversation::Conversation;
use crate::error::{ExchangeError, ExchangeErrorKind};
use crate::run_client::{ExchangeOutcome, ExchangeRequest};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Idle,
    Loading,
    Exchanging,
    Saving,
    Clearing,
}

#[derive(Debug)]
pub enum Command {
    Select {
        label: String,
        // The initial load has nobody waiting for it.
        reply: Option<Reply<Snapshot>>,
    },
    Send {
        text: String,
        reply: Reply<Option<Message>>,
    },
    Trigger {
        reply: Reply<Option<Message>>,
    },
    Clear {
        reply: Reply<()>,
    },
}

impl ManagerState {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            label: self.conversation.label.clone(),
            thread_id: self.conversation.thread_id.clone(),
            messages: self.conversation.messages.clone(),
            busy: self.stage != Stage::Idle || !self.pending.is_empty(),
        }
    }

    #[inline]
    fn enqueue(&mut self, command: Command, handle: &Actor<Self>) {
        // Even when idle, go through the queue so that commands always run
        // in arrival order.
        self.pending.push_back(command);
        self.process_next_command(handle);
    }

    fn process_next_command(&mut self, handle: &Actor<Self>) {
        // When not idle, there is nothing to do now. Whatever is running
        // reports back with a message that calls this again.
        while self.stage == Stage::Idle {
            let Some(command) = self.pending.pop_front() else {
                // Nothing to process, so we can invoke the idle callback.
                if let Some(on_idle) = &self.on_idle {
                    on_idle();
                }
                return;
            };
            self.run_command(command, handle);
        }
    }

    /// Runs the command, assuming the stage is checked.
    fn run_command(&mut self, command: Command, handle: &Actor<Self>) {
        match command {
            Command::Select { label, reply } => {
                self.load_conversation(label, reply, handle)
            }
            Command::Send { text, reply } => {
                self.send_turn(text, reply, handle)
            }
            Command::Trigger { reply } => {
                let text = self.trigger_text.clone();
                self.send_turn(text, reply, handle)
            }
            Command::Clear { reply } => self.clear_conversation(reply, handle),
        }
    }

    fn load_conversation(
        &mut self,
        label: String,
        reply: Option<Reply<Snapshot>>,
        handle: &Actor<Self>,
    ) {
        if !self.directory.contains(&label) {
            warn!("{label:?} is not in the assistant directory");
        }
        self.stage = Stage::Loading;

        let store = Arc::clone(&self.store);
        let handle_clone = handle.clone();
        self.spawn_task(
            async move {
                let record = store.load(&label).await;
                handle_clone
                    .send(ConversationLoaded {
                        label,
                        record,
                        reply,
                    })
                    .ok();
            },
            handle,
        );
    }

    fn send_turn(
        &mut self,
        text: String,
        reply: Reply<Option<Message>>,
        handle: &Actor<Self>,
    ) {
        let text = text.trim();
        if text.is_empty() {
            reply.send(None);
            return;
        }
        let text = text.to_owned();

        // The user's turn shows up before the assistant has answered.
        self.append_message(Message::user_text(text.as_str()));

        if let Some(exporter) = &self.exporter {
            if mentions_keyword(&text, &self.export_keyword) {
                info!("exporting {:?}", self.conversation.label);
                exporter.export(
                    &self.conversation.label,
                    &self.conversation.messages,
                );
                self.save_conversation(None, reply, handle);
                return;
            }
        }

        let assistant_id = self
            .directory
            .resolve(&self.conversation.label)
            .map(ToOwned::to_owned);
        let Some(assistant_id) = assistant_id else {
            let err = ExchangeError::new(ExchangeErrorKind::Configuration)
                .with_reason(format!(
                    "no assistant id for {:?}",
                    self.conversation.label
                ));
            let answer = failure_message(&err);
            self.append_message(answer.clone());
            self.save_conversation(Some(answer), reply, handle);
            return;
        };

        self.stage = Stage::Exchanging;
        let request = ExchangeRequest {
            assistant_id,
            thread_id: self.conversation.thread_id.clone(),
            text,
        };
        let run_client = self.run_client.clone();
        let handle_clone = handle.clone();
        self.spawn_task(
            async move {
                let outcome = run_client.exchange(request).await;
                handle_clone
                    .send(ExchangeFinished { outcome, reply })
                    .ok();
            },
            handle,
        );
    }

    fn save_conversation(
        &mut self,
        answer: Option<Message>,
        reply: Reply<Option<Message>>,
        handle: &Actor<Self>,
    ) {
        if self.conversation.messages.is_empty() {
            reply.send(answer);
            return;
        }
        self.stage = Stage::Saving;

        let label = self.conversation.label.clone();
        let assistant_id = self.directory.resolve(&label).unwrap_or_default();
        let record = self.conversation.to_record(assistant_id);
        let store = Arc::clone(&self.store);
        let handle_clone = handle.clone();
        self.spawn_task(
            async move {
                let result = store.save(&label, &record).await;
                handle_clone
                    .send(ConversationSaved {
                        result,
                        answer,
                        reply,
                    })
                    .ok();
            },
            handle,
        );
    }

    fn clear_conversation(&mut self, reply: Reply<()>, handle: &Actor<Self>) {
        let label = self.conversation.label.clone();
        self.conversation = Conversation::empty(label.clone());
        self.stage = Stage::Clearing;

        let store = Arc::clone(&self.store);
        let handle_clone = handle.clone();
        self.spawn_task(
            async move {
                let result = store.remove(&label).await;
                handle_clone
                    .send(ConversationCleared { result, reply })
                    .ok();
            },
            handle,
        );
    }

    fn append_message(&mut self, msg: Message) {
        self.conversation.messages.push(msg);
        if let (Some(on_message), Some(msg)) =
            (&self.on_message, self.conversation.messages.last())
        {
            on_message(msg);
        }
    }

    fn spawn_task<Fut>(&mut self, fut: Fut, handle: &Actor<Self>)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task_id = self.next_task_id;
        self.next_task_id += 1;

        let handle = handle.clone();
        let task = tokio::spawn(async move {
            fut.await;
            handle.send(TaskEnded(task_id)).ok();
        });
        self.running_tasks.insert(task_id, task);
    }
}

/// The assistant-side message standing in for a failed exchange.
fn failure_message(err: &ExchangeError) -> Message {
    warn!("exchange failed: {err}");
    let text = match err.kind() {
        ExchangeErrorKind::Configuration => CONFIGURATION_ERROR_TEXT,
        _ => APOLOGY_TEXT,
    };
    Message::assistant_text(text)
}

#[inline]
fn mentions_keyword(text: &str, keyword: &str) -> bool {
    !keyword.is_empty()
        && text.to_lowercase().contains(&keyword.to_lowercase())
}

#[derive(Debug)]
pub struct Enqueue(pub Command);

impl ActorMessage<ManagerState> for Enqueue {
    #[inline]
    fn handle(self, state: &mut ManagerState, handle: &Actor<ManagerState>) {
        state.enqueue(self.0, handle);
    }
}

#[derive(Debug)]
pub struct Inspect(pub Reply<Snapshot>);

impl ActorMessage<ManagerState> for Inspect {
    #[inline]
    fn handle(self, state: &mut ManagerState, _handle: &Actor<ManagerState>) {
        self.0.send(state.snapshot());
    }
}

#[derive(Debug)]
struct ConversationLoaded {
    label: String,
    record: Result<Option<ConversationRecord>, StoreError>,
    reply: Option<Reply<Snapshot>>,
}

impl ActorMessage<ManagerState> for ConversationLoaded {
    fn handle(self, state: &mut ManagerState, handle: &Actor<ManagerState>) {
        let Self {
            label,
            record,
            reply,
        } = self;
        state.conversation = match record {
            Ok(Some(record)) => {
                let count = record.messages.len();
                debug!("restored {count} messages of {label:?}");
                Conversation::from_record(label, record)
            }
            Ok(None) => Conversation::empty(label),
            Err(err) => {
                // Keep going with an empty conversation, the next save
                // will try the store again.
                error!("failed to load the conversation of {label:?}: {err}");
                Conversation::empty(label)
            }
        };
        state.stage = Stage::Idle;
        if let Some(reply) = reply {
            reply.send(state.snapshot());
        }
        state.process_next_command(handle);
    }
}

#[derive(Debug)]
struct ExchangeFinished {
    outcome: ExchangeOutcome,
    reply: Reply<Option<Message>>,
}

impl ActorMessage<ManagerState> for ExchangeFinished {
    fn handle(self, state: &mut ManagerState, handle: &Actor<ManagerState>) {
        let ExchangeOutcome { thread_id, result } = self.outcome;
        if let Some(thread_id) = thread_id {
            state.conversation.adopt_thread(thread_id);
        }

        let answer = match result {
            Ok(text) => Message::assistant_text(text),
            Err(err) => failure_message(&err),
        };
        state.append_message(answer.clone());
        state.save_conversation(Some(answer), self.reply, handle);
    }
}

#[derive(Debug)]
struct ConversationSaved {
    result: Result<(), StoreError>,
    answer: Option<Message>,
    reply: Reply<Option<Message>>,
}

impl ActorMessage<ManagerState> for ConversationSaved {
    fn handle(self, state: &mut ManagerState, handle: &Actor<ManagerState>) {
        if let Err(err) = self.result {
            error!(
                "failed to save the conversation of {:?}: {err}",
                state.conversation.label
            );
        }
        state.stage = Stage::Idle;
        self.reply.send(self.answer);
        state.process_next_command(handle);
    }
}

#[derive(Debug)]
struct ConversationCleared {
    result: Result<(), StoreError>,
    reply: Reply<()>,
}

impl ActorMessage<ManagerState> for ConversationCleared {
    fn handle(self, state: &mut ManagerState, handle: &Actor<ManagerState>) {
        if let Err(err) = self.result {
            error!(
                "failed to remove the conversation of {:?}: {err}",
                state.conversation.label
            );
        }
        state.stage = Stage::Idle;
        self.reply.send(());
        state.process_next_command(handle);
    }
}

#[derive(Debug)]
struct TaskEnded(u64);

impl ActorMessage<ManagerState> for TaskEnded {
    #[inline]
    fn handle(self, state: &mut ManagerState, _handle: &Actor<ManagerState>) {
        if state.running_tasks.remove(&self.0).is_none() {
            warn!("task {} ended but was never tracked", self.0);
        }
    }
}
