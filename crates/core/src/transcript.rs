//! Plain-text transcripts of a conversation.

use std::fmt::{self, Display};

use parlor_model::{Message, Role};

/// Receives the conversation when the user asks for an export.
///
/// Called from the manager task, so implementations should hand heavy
/// work off to a thread or a task of their own.
pub trait Exporter: Send + Sync + 'static {
    /// Exports the messages of the conversation with `label`.
    fn export(&self, label: &str, messages: &[Message]);
}

impl<F> Exporter for F
where
    F: Fn(&str, &[Message]) + Send + Sync + 'static,
{
    #[inline]
    fn export(&self, label: &str, messages: &[Message]) {
        self(label, messages)
    }
}

/// A conversation rendered as speaker-headed, word-wrapped lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    /// The default line width, in characters.
    pub const DEFAULT_WIDTH: usize = 170;
    /// Stands in for content that is not text.
    pub const NON_TEXT_PLACEHOLDER: &'static str = "[Conteúdo não textual]";

    /// Renders `messages` at the default width.
    #[inline]
    pub fn render(messages: &[Message]) -> Self {
        Self::render_with_width(messages, Self::DEFAULT_WIDTH)
    }

    /// Renders `messages`, wrapping lines longer than `width` characters.
    pub fn render_with_width(messages: &[Message], width: usize) -> Self {
        let width = width.max(1);
        let mut lines = vec![];
        for (i, msg) in messages.iter().enumerate() {
            if i > 0 {
                lines.push(String::new());
            }
            lines.push(speaker(msg.role).to_owned());
            for block in &msg.content {
                let text =
                    block.as_text().unwrap_or(Self::NON_TEXT_PLACEHOLDER);
                for line in text.lines() {
                    wrap_into(line, width, &mut lines);
                }
            }
        }
        Self { lines }
    }

    /// Returns the rendered lines.
    #[inline]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[inline]
fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "Você:",
        Role::Assistant => "Assistente:",
    }
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
fn wrap_into(line: &str, width: usize, out: &mut Vec<String>) {
    if line.chars().count() <= width {
        out.push(line.to_owned());
        return;
    }
    let mut current = String::new();
    let mut current_len = 0;
    for word in line.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > width {
            out.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if !current.is_empty() {
        out.push(current);
    }
}
