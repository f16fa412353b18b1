mod builder;
mod state;
#[cfg(test)]
mod tests;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parlor_actor::{Actor, ActorDeadError};
use parlor_model::Message;
use parlor_store::ConversationStore;
use tokio::task::JoinHandle;

use crate::conversation::Conversation;
use crate::directory::AssistantDirectory;
use crate::run_client::RunClient;
use crate::transcript::Exporter;
pub use builder::ManagerBuilder;
use state::{Command, Enqueue, Inspect, Stage};

/// The text [`ConversationManager::send_trigger`] sends by default.
pub const DEFAULT_TRIGGER_TEXT: &str = "COMEÇAR";

/// The word that turns a user turn into an export request by default.
pub const DEFAULT_EXPORT_KEYWORD: &str = "DOCUMENTO";

/// The assistant reply that stands in for a failed exchange.
pub const APOLOGY_TEXT: &str = "Desculpe, ocorreu um erro ao processar sua \
    mensagem. Por favor, tente novamente.";

/// The assistant reply for a label without a configured identifier.
pub const CONFIGURATION_ERROR_TEXT: &str = "Erro: ID do assistente não \
    encontrado. Por favor, verifique a configuração.";

pub(crate) type MessageCallback = Box<dyn Fn(&Message) + Send + Sync>;
pub(crate) type IdleCallback = Box<dyn Fn() + Send + Sync>;

/// A point-in-time view of the active conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// The active assistant label.
    pub label: String,
    /// The remote thread of the active conversation.
    pub thread_id: Option<String>,
    /// The messages, oldest first.
    pub messages: Vec<Message>,
    /// Whether the manager is working on a command or has some queued.
    pub busy: bool,
}

/// The state owned by the manager task.
///
/// Messages dispatched to the manager are handled immediately, no matter
/// what stage it is in. Commands that arrive while it is loading,
/// exchanging, saving or clearing are queued and run in arrival order once
/// it becomes idle again.
pub(crate) struct ManagerState {
    run_client: RunClient,
    store: Arc<dyn ConversationStore>,
    directory: AssistantDirectory,
    trigger_text: String,
    export_keyword: String,
    exporter: Option<Box<dyn Exporter>>,
    conversation: Conversation,
    stage: Stage,
    pending: VecDeque<Command>,
    running_tasks: HashMap<u64, JoinHandle<()>>,
    next_task_id: u64,

    on_message: Option<MessageCallback>,
    on_idle: Option<IdleCallback>,
}

impl Drop for ManagerState {
    fn drop(&mut self) {
        for (_, task) in self.running_tasks.drain() {
            task.abort();
        }
    }
}

/// Keeps the conversation of the selected assistant, exchanges user turns
/// with it and persists the result.
///
/// Cloning the manager gives another handle to the same task. The task
/// stops when every handle is dropped or [`shutdown`](Self::shutdown) is
/// called.
#[derive(Clone)]
pub struct ConversationManager {
    handle: Actor<ManagerState>,
}

impl ConversationManager {
    /// Makes `label` the active assistant, restoring its conversation from
    /// the store, and returns the new active state.
    pub async fn select_assistant<S: Into<String>>(
        &self,
        label: S,
    ) -> Result<Snapshot, ActorDeadError> {
        let label = label.into();
        self.handle
            .ask(|reply| {
                Enqueue(Command::Select {
                    label,
                    reply: Some(reply),
                })
            })
            .await
    }

    /// Sends a user turn to the active assistant and returns its reply.
    ///
    /// Blank input is ignored and yields `None`, as does a turn that asks
    /// for an export. Failed exchanges are answered with an apology, so
    /// every accepted turn gets a reply.
    pub async fn send_user_turn(
        &self,
        text: &str,
    ) -> Result<Option<Message>, ActorDeadError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let text = text.to_owned();
        self.handle
            .ask(|reply| Enqueue(Command::Send { text, reply }))
            .await
    }

    /// Sends the trigger text so that the assistant opens the conversation.
    pub async fn send_trigger(
        &self,
    ) -> Result<Option<Message>, ActorDeadError> {
        self.handle
            .ask(|reply| Enqueue(Command::Trigger { reply }))
            .await
    }

    /// Forgets the active conversation and its remote thread, and removes
    /// it from the store.
    pub async fn clear_active(&self) -> Result<(), ActorDeadError> {
        self.handle
            .ask(|reply| Enqueue(Command::Clear { reply }))
            .await
    }

    /// Returns the active state without waiting for queued commands.
    pub async fn snapshot(&self) -> Result<Snapshot, ActorDeadError> {
        self.handle.ask(Inspect).await
    }

    /// Stops the manager. Pending commands are dropped.
    #[inline]
    pub fn shutdown(&self) {
        self.handle.try_kill();
    }
}

impl ConversationManager {
    fn spawn_from_builder(builder: ManagerBuilder) -> Self {
        let ManagerBuilder {
            run_client,
            store,
            directory,
            initial_label,
            trigger_text,
            export_keyword,
            exporter,
            on_message,
            on_idle,
        } = builder;

        let label = initial_label
            .or_else(|| directory.first_label().map(ToOwned::to_owned))
            .unwrap_or_default();
        let state = ManagerState {
            run_client,
            store,
            directory,
            trigger_text,
            export_keyword,
            exporter,
            conversation: Conversation::empty(label.clone()),
            stage: Default::default(),
            pending: Default::default(),
            running_tasks: Default::default(),
            next_task_id: 1,
            on_message,
            on_idle,
        };
        let handle = Actor::spawn(state, "manager");
        if label.is_empty() {
            warn!("no assistant to start with");
        } else {
            handle
                .send(Enqueue(Command::Select { label, reply: None }))
                .ok();
        }
        Self { handle }
    }
}
