//! An assistant backend for OpenAI-compatible Assistants APIs.

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use parlor_model::{
    AssistantBackend, BackendError, BackendErrorKind, Role, Run, ThreadMessage,
};
use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde::de::{DeserializeOwned, IgnoredAny};

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use proto::{
    CreateMessageRequest, CreateRunRequest, ErrorBody, ListObject,
    MessageObject, RunObject, ThreadObject,
};

/// Error type for [`OpenAIBackend`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: BackendErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: BackendErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl BackendError for Error {
    #[inline]
    fn kind(&self) -> BackendErrorKind {
        self.kind
    }
}

/// OpenAI-compatible assistant backend.
#[derive(Clone, Debug)]
pub struct OpenAIBackend {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIBackend {
    /// Creates a new `OpenAIBackend` with the given configuration.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.config.base_url, path))
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .header("OpenAI-Beta", &self.config.beta)
            .header(header::ACCEPT, "application/json")
    }

    fn post_json<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> RequestBuilder {
        match serde_json::to_vec(body) {
            Ok(body) => self
                .request(Method::POST, path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body),
            Err(err) => {
                // Our request types always serialize; keep going with an
                // empty body and let the server complain.
                error!("failed to encode request body: {err}");
                self.request(Method::POST, path)
            }
        }
    }
}

async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, Error> {
    let resp = req.send().await.map_err(network_error)?;
    decode(resp).await
}

#[inline]
fn network_error(err: reqwest::Error) -> Error {
    Error::new(format!("{err}"), BackendErrorKind::Network)
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, Error> {
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned);
    let body = resp.text().await.map_err(network_error)?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|body| body.error.message)
            .unwrap_or(body);
        return Err(Error::new(
            format!("{status}: {message}"),
            BackendErrorKind::Api,
        ));
    }

    let is_json = content_type
        .as_deref()
        .and_then(|v| v.parse().ok())
        .map(|m: Mime| m.subtype().as_str() == "json")
        .unwrap_or(false);
    if !is_json {
        return Err(Error::new(
            format!("Unexpected content type: {content_type:?}"),
            BackendErrorKind::Decode,
        ));
    }

    trace!("got a response: {body}");
    serde_json::from_str(&body)
        .map_err(|err| Error::new(format!("{err}"), BackendErrorKind::Decode))
}

impl AssistantBackend for OpenAIBackend {
    type Error = Error;

    fn create_thread(
        &self,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'static {
        let req = self.post_json("/threads", &serde_json::json!({}));
        async move {
            let thread: ThreadObject = send(req).await?;
            debug!("created thread {}", thread.id);
            Ok(thread.id)
        }
    }

    fn create_message(
        &self,
        thread_id: &str,
        role: Role,
        text: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'static {
        let req = self.post_json(
            &format!("/threads/{thread_id}/messages"),
            &CreateMessageRequest {
                role,
                content: text.to_owned(),
            },
        );
        async move {
            send::<IgnoredAny>(req).await?;
            Ok(())
        }
    }

    fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> impl Future<Output = Result<Run, Self::Error>> + Send + 'static {
        let req = self.post_json(
            &format!("/threads/{thread_id}/runs"),
            &CreateRunRequest {
                assistant_id: assistant_id.to_owned(),
            },
        );
        async move {
            let run: RunObject = send(req).await?;
            Ok(run.into())
        }
    }

    fn retrieve_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> impl Future<Output = Result<Run, Self::Error>> + Send + 'static {
        let path = format!("/threads/{thread_id}/runs/{run_id}");
        let req = self.request(Method::GET, &path);
        async move {
            let run: RunObject = send(req).await?;
            Ok(run.into())
        }
    }

    fn list_messages(
        &self,
        thread_id: &str,
    ) -> impl Future<Output = Result<Vec<ThreadMessage>, Self::Error>> + Send + 'static
    {
        // Ask for the newest message first instead of trusting the default.
        let req = self.request(
            Method::GET,
            &format!("/threads/{thread_id}/messages?order=desc"),
        );
        async move {
            let list: ListObject<MessageObject> = send(req).await?;
            Ok(list.data.into_iter().map(Into::into).collect())
        }
    }
}
