//! An image source for TheCatAPI.
//!
//! Every fetch asks the search endpoint for one random image and hands out
//! the URL of the first result.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;

use std::sync::Arc;

use booksense_core::image::{ImageError, ImageSource};
use reqwest::Client;
use serde::Deserialize;

pub use config::{CatApiConfig, CatApiConfigBuilder, DEFAULT_ENDPOINT};

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
struct SearchResult {
    url: Option<String>,
}

/// Fetches random images from TheCatAPI.
#[derive(Clone, Debug)]
pub struct CatApiSource {
    client: Client,
    config: Arc<CatApiConfig>,
}

impl CatApiSource {
    /// Creates a new `CatApiSource` with the given configuration.
    #[inline]
    pub fn new(config: CatApiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Creates a source sharing an existing HTTP client.
    #[inline]
    pub fn with_client(client: Client, config: CatApiConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

impl ImageSource for CatApiSource {
    fn fetch_image_url(
        &self,
    ) -> impl Future<Output = Result<String, ImageError>> + Send + 'static {
        let mut req = self.client.get(&self.config.endpoint);
        if let Some(api_key) = &self.config.api_key {
            req = req.header(API_KEY_HEADER, api_key.as_str());
        }
        trace!("fetching an image from {}", self.config.endpoint);

        async move {
            let resp = req
                .send()
                .await
                .map_err(|err| ImageError::transport(err.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(ImageError::status(
                    status.as_u16(),
                    format!("Cat API returned an error: {}", status.as_u16()),
                ));
            }

            let body = resp
                .text()
                .await
                .map_err(|err| ImageError::transport(err.to_string()))?;
            parse_search_response(&body)
        }
    }
}

/// Extracts the image URL from a search response body.
///
/// The body must be a JSON array whose first element has a non-empty `url`.
pub fn parse_search_response(body: &str) -> Result<String, ImageError> {
    let results: Vec<SearchResult> = serde_json::from_str(body)
        .map_err(|err| {
            debug!("undecodable search response: {err}");
            ImageError::malformed_payload("No image URL in the response")
        })?;
    results
        .into_iter()
        .next()
        .and_then(|result| result.url)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            ImageError::malformed_payload("No image URL in the response")
        })
}

#[cfg(test)]
mod tests {
    use booksense_core::image::{ImageErrorKind, ImageWidget};

    use super::*;

    #[test]
    fn test_parse_first_url() {
        let body = r#"[
            {
                "id": "9ccXTANkb",
                "url": "https://cdn2.thecatapi.com/images/9ccXTANkb.jpg",
                "width": 1080,
                "height": 1350
            },
            {"id": "other", "url": "https://cdn2.thecatapi.com/images/o.jpg"}
        ]"#;
        assert_eq!(
            parse_search_response(body).unwrap(),
            "https://cdn2.thecatapi.com/images/9ccXTANkb.jpg"
        );
    }

    #[test]
    fn test_parse_shape_mismatch() {
        for body in [
            "[]",
            r#"[{"id": "x"}]"#,
            r#"[{"url": ""}]"#,
            r#"[{"url": 42}]"#,
            r#"{"url": "https://cdn2.thecatapi.com/images/a.jpg"}"#,
            "<html>oops</html>",
        ] {
            let err = parse_search_response(body).unwrap_err();
            assert_eq!(err.kind(), ImageErrorKind::MalformedPayload, "{body}");
            assert_eq!(err.message(), "No image URL in the response");
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let config = CatApiConfigBuilder::new()
            .with_endpoint("http://127.0.0.1:9/v1/images/search")
            .build();
        let widget = ImageWidget::mount(CatApiSource::new(config)).await;

        let state = widget.state();
        assert!(!state.loading);
        assert_eq!(state.image_url, None);
        assert!(state.error.is_some_and(|err| !err.is_empty()));
    }
}
