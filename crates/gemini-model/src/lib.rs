//! A model provider for the Google Gemini API.
//!
//! Requests go to the `streamGenerateContent` endpoint with server-sent
//! events enabled, so the reply can be rendered while it is generated.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use booksense_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};
use mime::Mime;
use reqwest::{Client, StatusCode, header};

pub use config::{DEFAULT_BASE_URL, GeminiConfig, GeminiConfigBuilder};
use io::{Chunks, Sse};
use proto::{ErrorBody, ErrorResponse};
pub use response::GeminiResponse;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Error type for [`GeminiProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Builds an error from the service's own error object, keeping its
    /// message as is.
    fn from_service(http_status: Option<u16>, body: ErrorBody) -> Self {
        let code = http_status.or(body.code);
        let kind = match (code, body.status.as_deref()) {
            (Some(401 | 403), _)
            | (_, Some("UNAUTHENTICATED" | "PERMISSION_DENIED")) => {
                ErrorKind::Unauthorized
            }
            (Some(429), _) | (_, Some("RESOURCE_EXHAUSTED")) => {
                ErrorKind::RateLimitExceeded
            }
            _ => ErrorKind::Other,
        };
        let prefix = match (code, body.status.as_deref()) {
            (Some(code), Some(status)) => format!("[{code} {status}] "),
            (Some(code), None) => format!("[{code}] "),
            (None, Some(status)) => format!("[{status}] "),
            (None, None) => String::new(),
        };
        Self::new(format!("{prefix}{}", body.message), kind)
    }

    fn from_status(status: StatusCode, body: &str) -> Self {
        if let Ok(resp) = serde_json::from_str::<ErrorResponse>(body) {
            return Self::from_service(Some(status.as_u16()), resp.error);
        }
        let body = body.trim();
        let message = if body.is_empty() {
            status.canonical_reason().unwrap_or("Unknown error").to_owned()
        } else {
            body.to_owned()
        };
        Self::from_service(
            Some(status.as_u16()),
            ErrorBody {
                code: None,
                message,
                status: None,
            },
        )
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

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Gemini model provider.
#[derive(Clone, Debug)]
pub struct GeminiProvider {
    client: Client,
    config: Arc<GeminiConfig>,
}

impl GeminiProvider {
    /// Creates a new `GeminiProvider` with the given configuration.
    #[inline]
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a provider sharing an existing HTTP client.
    #[inline]
    pub fn with_client(client: Client, config: GeminiConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for GeminiProvider {
    type Error = Error;
    type Response = GeminiResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let body = proto::create_request(req);
        debug!(
            "sending {} messages to model {}",
            body.contents.len(),
            req.model
        );
        let resp_fut = self.config.stream_url(&req.model).map(|url| {
            self.client
                .post(url)
                .header(API_KEY_HEADER, self.config.api_key.as_str())
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::ACCEPT, "text/event-stream")
                .json(&body)
                .send()
        });

        async move {
            let resp = resp_fut?
                .await
                .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                let err = Error::from_status(status, &body);
                warn!("request failed: {err}");
                return Err(err);
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_valid_content_type = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| m.subtype().as_str() == "event-stream")
                .unwrap_or(false);
            if !is_valid_content_type {
                return Err(Error::new(
                    format!("Unexpected content type: {content_type:?}"),
                    ErrorKind::MalformedResponse,
                ));
            }

            // Here we got a successful response.
            let chunks = Chunks::from_response(resp);
            let sse = Sse::new(chunks);
            Ok(GeminiResponse::from_sse(sse))
        }
    }
}
