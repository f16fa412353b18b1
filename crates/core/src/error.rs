use std::borrow::Cow;
use std::fmt::{self, Display};

/// The kind of error that ended an exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeErrorKind {
    /// The assistant label has no configured identifier.
    Configuration,
    /// The remote run reported `failed`.
    RunFailed,
    /// The remote run reported `expired`.
    RunExpired,
    /// The run didn't finish within the poll policy.
    RunTimeout,
    /// The newest message on the thread is not from the assistant.
    NoAssistantReply,
    /// The assistant's reply doesn't start with text.
    UnsupportedContent,
    /// A backend call failed.
    Network,
}

impl Display for ExchangeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match self {
            ExchangeErrorKind::Configuration => "Assistant is not configured",
            ExchangeErrorKind::RunFailed => "Run failed",
            ExchangeErrorKind::RunExpired => "Run expired",
            ExchangeErrorKind::RunTimeout => "Run timed out",
            ExchangeErrorKind::NoAssistantReply => "No assistant reply",
            ExchangeErrorKind::UnsupportedContent => "Unsupported content",
            ExchangeErrorKind::Network => "Network error",
        };
        f.write_str(desc)
    }
}

/// Describes why an exchange with the assistant failed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExchangeError {
    kind: ExchangeErrorKind,
    reason: Option<String>,
}

impl ExchangeError {
    /// Creates a new error of the given kind.
    #[inline]
    pub fn new(kind: ExchangeErrorKind) -> Self {
        Self { kind, reason: None }
    }

    /// Attaches a reason to the error.
    #[inline]
    pub fn with_reason<S: Into<String>>(self, reason: S) -> Self {
        Self {
            kind: self.kind,
            reason: Some(reason.into()),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ExchangeErrorKind {
        self.kind
    }

    /// Returns the reason for the error.
    #[inline]
    pub fn reason(&self) -> Cow<'_, str> {
        match self.reason.as_deref() {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(format!("{}", self.kind)),
        }
    }
}

impl Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {reason}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for ExchangeError {}
