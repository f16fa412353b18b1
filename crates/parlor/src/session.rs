use std::io;
use std::path::PathBuf;

use parlor_core::{ConversationManager, ManagerBuilder};
use parlor_model::Message;
use parlor_openai::{OpenAIBackend, OpenAIConfigBuilder};
use parlor_store::FileStore;

use crate::config::CliConfig;
use crate::export::TranscriptExporter;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    manager_builder: ManagerBuilder,
    exporter: TranscriptExporter,
}

impl SessionBuilder {
    /// Creates a session builder talking to the OpenAI-compatible API and
    /// storing conversations in a file, as configured.
    pub fn from_config(config: &CliConfig) -> Self {
        let mut openai_config =
            OpenAIConfigBuilder::with_api_key(config.api_key.clone());
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_base_url(base_url.clone());
        }
        let backend = OpenAIBackend::new(openai_config.build());
        let manager_builder = ManagerBuilder::with_backend(backend)
            .with_store(FileStore::new(&config.store_path))
            .with_directory(config.directory.clone());
        Self {
            manager_builder,
            exporter: TranscriptExporter::new(&config.export_dir),
        }
    }

    /// Attaches a callback to be invoked for every message of the active
    /// conversation.
    #[inline]
    pub fn on_message(
        mut self,
        on_message: impl Fn(&Message) + Send + Sync + 'static,
    ) -> Self {
        self.manager_builder = self.manager_builder.on_message(on_message);
        self
    }

    /// Attaches a callback to be invoked once a transcript was exported.
    #[inline]
    pub fn on_export(
        mut self,
        on_export: impl Fn(&io::Result<PathBuf>) + Send + Sync + 'static,
    ) -> Self {
        self.exporter = self.exporter.on_written(on_export);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        Session {
            manager: self
                .manager_builder
                .with_exporter(self.exporter)
                .build(),
        }
    }
}

/// A chat session, like a window that shows the conversation with the
/// selected assistant and has an input box.
///
/// It is basically a wrapper around [`ConversationManager`], which you can
/// reach with [`manager`](Self::manager).
pub struct Session {
    manager: ConversationManager,
}

impl Session {
    /// Returns the underlying manager.
    #[inline]
    pub fn manager(&self) -> &ConversationManager {
        &self.manager
    }
}
