use std::fmt::{self, Debug, Formatter};

/// The random image search endpoint of TheCatAPI.
pub const DEFAULT_ENDPOINT: &str =
    "https://api.thecatapi.com/v1/images/search";

/// Builder for [`CatApiConfig`].
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct CatApiConfigBuilder {
    api_key: Option<String>,
    endpoint: Option<String>,
}

impl CatApiConfigBuilder {
    /// Creates a builder for anonymous access to the default endpoint.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. An empty key means anonymous access.
    #[inline]
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets a custom search endpoint.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> CatApiConfig {
        CatApiConfig {
            api_key: self.api_key.filter(|key| !key.trim().is_empty()),
            endpoint: self
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
        }
    }
}

impl Debug for CatApiConfigBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatApiConfigBuilder")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Configuration for [`CatApiSource`](crate::CatApiSource).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CatApiConfig {
    pub(crate) api_key: Option<String>,
    pub(crate) endpoint: String,
}

impl CatApiConfig {
    /// Returns `true` if requests carry an API key.
    #[inline]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Returns the search endpoint.
    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Debug for CatApiConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatApiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
