use std::sync::Arc;

use parlor_model::{AssistantBackend, Message};
use parlor_store::{ConversationStore, MemoryStore};

use super::{
    ConversationManager, DEFAULT_EXPORT_KEYWORD, DEFAULT_TRIGGER_TEXT,
    IdleCallback, MessageCallback,
};
use crate::directory::AssistantDirectory;
use crate::poll::PollPolicy;
use crate::run_client::RunClient;
use crate::transcript::Exporter;

/// [`ConversationManager`] builder.
pub struct ManagerBuilder {
    pub(crate) run_client: RunClient,
    pub(crate) store: Arc<dyn ConversationStore>,
    pub(crate) directory: AssistantDirectory,
    pub(crate) initial_label: Option<String>,
    pub(crate) trigger_text: String,
    pub(crate) export_keyword: String,
    pub(crate) exporter: Option<Box<dyn Exporter>>,
    pub(crate) on_message: Option<MessageCallback>,
    pub(crate) on_idle: Option<IdleCallback>,
}

impl ManagerBuilder {
    /// Creates a new builder with the specified backend.
    ///
    /// Conversations are kept in memory unless a store is set with
    /// [`with_store`](Self::with_store).
    #[inline]
    pub fn with_backend<B: AssistantBackend + 'static>(backend: B) -> Self {
        Self {
            run_client: RunClient::new(backend),
            store: Arc::new(MemoryStore::new()),
            directory: AssistantDirectory::new(),
            initial_label: None,
            trigger_text: DEFAULT_TRIGGER_TEXT.to_owned(),
            export_keyword: DEFAULT_EXPORT_KEYWORD.to_owned(),
            exporter: None,
            on_message: None,
            on_idle: None,
        }
    }

    /// Sets the store conversations are loaded from and saved to.
    #[inline]
    pub fn with_store<S: ConversationStore>(mut self, store: S) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Sets the assistants that can be selected.
    #[inline]
    pub fn with_directory(mut self, directory: AssistantDirectory) -> Self {
        self.directory = directory;
        self
    }

    /// Sets the assistant selected at start. Defaults to the first label
    /// of the directory.
    #[inline]
    pub fn with_initial_assistant<S: Into<String>>(
        mut self,
        label: S,
    ) -> Self {
        self.initial_label = Some(label.into());
        self
    }

    /// Sets how runs are polled.
    #[inline]
    pub fn with_poll_policy(mut self, poll_policy: PollPolicy) -> Self {
        self.run_client = self.run_client.with_poll_policy(poll_policy);
        self
    }

    /// Sets the text sent by
    /// [`send_trigger`](ConversationManager::send_trigger).
    #[inline]
    pub fn with_trigger_text<S: Into<String>>(mut self, text: S) -> Self {
        self.trigger_text = text.into();
        self
    }

    /// Sets the word that turns a user turn into an export request. It is
    /// matched case-insensitively anywhere in the input.
    #[inline]
    pub fn with_export_keyword<S: Into<String>>(mut self, keyword: S) -> Self {
        self.export_keyword = keyword.into();
        self
    }

    /// Sets what handles export requests. Without an exporter the keyword
    /// has no special meaning.
    #[inline]
    pub fn with_exporter<E: Exporter>(mut self, exporter: E) -> Self {
        self.exporter = Some(Box::new(exporter));
        self
    }

    /// Attaches a callback to be invoked for every message appended to the
    /// active conversation.
    #[inline]
    pub fn on_message(
        mut self,
        on_message: impl Fn(&Message) + Send + Sync + 'static,
    ) -> Self {
        self.on_message = Some(Box::new(on_message));
        self
    }

    /// Attaches a callback to be invoked when the manager is idle.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Builds the manager and starts loading the initial assistant.
    ///
    /// Must be called from within a tokio runtime.
    #[inline]
    pub fn build(self) -> ConversationManager {
        ConversationManager::spawn_from_builder(self)
    }
}
