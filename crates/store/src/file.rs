use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parlor_model::{ConversationCatalog, ConversationRecord};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{ConversationStore, Error, validate_label};

/// Stores the whole catalog as one JSON object in a single file.
///
/// Every write is a read-modify-write of the catalog. Writes through one
/// `FileStore` are serialized by an internal lock so that saves for
/// different labels can't lose each other's updates, and the file is
/// replaced atomically so readers never observe a partial catalog.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// The file name used when the store is opened in a directory.
    pub const DEFAULT_FILE_NAME: &'static str = "conversation_history.json";

    /// Creates a store backed by the file at `path`.
    ///
    /// The file is created on the first write. A missing file reads as an
    /// empty catalog.
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store backed by [`Self::DEFAULT_FILE_NAME`] in `dir`.
    #[inline]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(Self::DEFAULT_FILE_NAME))
    }

    /// Returns the path of the backing file.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_catalog(&self) -> Result<ConversationCatalog, Error> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == IoErrorKind::NotFound => {
                return Ok(ConversationCatalog::default());
            }
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(ConversationCatalog::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_catalog(
        &self,
        catalog: &ConversationCatalog,
    ) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_vec_pretty(catalog)?;

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        let write_result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(&content).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp_path, &self.path).await
        }
        .await;

        if let Err(err) = write_result {
            tokio::fs::remove_file(&tmp_path).await.ok();
            return Err(err.into());
        }
        trace!("wrote {} records to {:?}", catalog.len(), self.path);
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for FileStore {
    async fn load(
        &self,
        label: &str,
    ) -> Result<Option<ConversationRecord>, Error> {
        validate_label(label)?;
        let mut catalog = self.read_catalog().await?;
        Ok(catalog.remove(label))
    }

    async fn save(
        &self,
        label: &str,
        record: &ConversationRecord,
    ) -> Result<(), Error> {
        validate_label(label)?;
        let _guard = self.write_lock.lock().await;
        let mut catalog = self.read_catalog().await?;
        catalog.insert(label, record.clone());
        self.write_catalog(&catalog).await
    }

    async fn remove(&self, label: &str) -> Result<(), Error> {
        validate_label(label)?;
        let _guard = self.write_lock.lock().await;
        let mut catalog = self.read_catalog().await?;
        if catalog.remove(label).is_none() {
            return Ok(());
        }
        self.write_catalog(&catalog).await
    }

    async fn catalog(&self) -> Result<ConversationCatalog, Error> {
        self.read_catalog().await
    }
}
