use std::fmt::{self, Debug};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parlor_core::transcript::{Exporter, Transcript};
use parlor_model::Message;

type WrittenCallback = Arc<dyn Fn(&io::Result<PathBuf>) + Send + Sync>;

/// Writes the conversation as a plain-text file named after the assistant
/// and the date.
#[derive(Clone)]
pub struct TranscriptExporter {
    dir: PathBuf,
    width: usize,
    on_written: Option<WrittenCallback>,
}

impl Debug for TranscriptExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptExporter")
            .field("dir", &self.dir)
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

impl TranscriptExporter {
    /// Creates an exporter writing into `dir`.
    #[inline]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            width: Transcript::DEFAULT_WIDTH,
            on_written: None,
        }
    }

    /// Attaches a callback to be invoked once an export finished, with the
    /// path of the file or the error.
    #[inline]
    pub fn on_written(
        mut self,
        on_written: impl Fn(&io::Result<PathBuf>) + Send + Sync + 'static,
    ) -> Self {
        self.on_written = Some(Arc::new(on_written));
        self
    }

    /// Writes the transcript and returns the path of the file.
    pub fn write(
        &self,
        label: &str,
        messages: &[Message],
        now: DateTime<Utc>,
    ) -> io::Result<PathBuf> {
        let date = now.format("%Y-%m-%d");
        let path = self.dir.join(format!(
            "Conversa com {} - {date}.txt",
            file_safe(label)
        ));
        let transcript = Transcript::render_with_width(messages, self.width);
        let contents = format!("Conversa com {label} - {date}\n\n{transcript}");
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

impl Exporter for TranscriptExporter {
    fn export(&self, label: &str, messages: &[Message]) {
        let this = self.clone();
        let label = label.to_owned();
        let messages = messages.to_vec();
        let now = Utc::now();
        // The manager task must not block on the file system.
        tokio::task::spawn_blocking(move || {
            let result = this.write(&label, &messages, now);
            match &result {
                Ok(path) => info!("exported transcript to {}", path.display()),
                Err(err) => error!("failed to export transcript: {err}"),
            }
            if let Some(on_written) = &this.on_written {
                on_written(&result);
            }
        });
    }
}

fn file_safe(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tokio::sync::oneshot;

    use super::*;

    #[test]
    fn test_write() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = TranscriptExporter::new(dir.path());
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 14, 30, 0).unwrap();
        let messages = vec![
            Message::user_text("DOCUMENTO"),
            Message::assistant_text("Tudo certo."),
        ];

        let path =
            exporter.write("Contratos/Acordos", &messages, now).unwrap();
        assert_eq!(
            path.file_name().unwrap(),
            "Conversa com Contratos-Acordos - 2026-03-09.txt"
        );
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "Conversa com Contratos/Acordos - 2026-03-09\n\n\
             Você:\nDOCUMENTO\n\nAssistente:\nTudo certo.\n"
        );
    }

    #[tokio::test]
    async fn test_written_callback() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = oneshot::channel();
        let tx = std::sync::Mutex::new(Some(tx));
        let exporter =
            TranscriptExporter::new(dir.path()).on_written(move |result| {
                let path = result.as_ref().ok().cloned();
                if let Some(tx) = tx.lock().unwrap().take() {
                    tx.send(path).ok();
                }
            });

        exporter.export("Contratos", &[Message::user_text("DOCUMENTO")]);
        let path = rx.await.unwrap().unwrap();
        assert!(path.starts_with(dir.path()));
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with("Você:\nDOCUMENTO\n"));
    }
}
