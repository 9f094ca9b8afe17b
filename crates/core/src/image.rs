//! The random image widget.
//!
//! The widget shares nothing with the chat. It holds the outcome of the last
//! fetch and knows how to run one more.

use std::error::Error;
use std::fmt::{self, Display};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The kind of error that occurred while fetching an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageErrorKind {
    /// The service answered with a non-success status code.
    Status(u16),
    /// The service answered, but not with an image reference.
    MalformedPayload,
    /// The request did not complete.
    Transport,
}

/// Describes a failed image fetch.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageError {
    kind: ImageErrorKind,
    message: String,
}

impl ImageError {
    /// Creates an error for a non-success status code.
    #[inline]
    pub fn status<S: Into<String>>(code: u16, message: S) -> Self {
        Self {
            kind: ImageErrorKind::Status(code),
            message: message.into(),
        }
    }

    /// Creates an error for a payload without a usable image reference.
    #[inline]
    pub fn malformed_payload<S: Into<String>>(message: S) -> Self {
        Self {
            kind: ImageErrorKind::MalformedPayload,
            message: message.into(),
        }
    }

    /// Creates an error for a request that did not complete.
    #[inline]
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self {
            kind: ImageErrorKind::Transport,
            message: message.into(),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ImageErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ImageError {}

/// A service that hands out image references.
pub trait ImageSource: Send + Sync + 'static {
    /// Fetches the URL of one image.
    ///
    /// This method must return a future that is fully independent of `self`.
    fn fetch_image_url(
        &self,
    ) -> impl Future<Output = Result<String, ImageError>> + Send + 'static;
}

/// What the widget currently shows.
///
/// After a fetch has completed, exactly one of `image_url` and `error` is
/// set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageState {
    /// A fetch is outstanding. Hosts disable their refresh trigger meanwhile.
    pub loading: bool,
    /// The image from the last successful fetch.
    pub image_url: Option<String>,
    /// The message of the last failed fetch.
    pub error: Option<String>,
}

/// The image fetch widget.
pub struct ImageWidget<S> {
    source: S,
    state: Mutex<ImageState>,
}

impl<S: ImageSource> ImageWidget<S> {
    /// Creates a widget that has not fetched anything yet.
    #[inline]
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: Mutex::default(),
        }
    }

    /// Creates a widget and runs the first fetch, as a host does when the
    /// widget appears.
    pub async fn mount(source: S) -> Self {
        let widget = Self::new(source);
        widget.refresh().await;
        widget
    }

    /// Replaces the current image with a freshly fetched one.
    ///
    /// There is no guard against overlapping calls; the last one to finish
    /// wins.
    pub async fn refresh(&self) {
        {
            let mut state = self.lock_state();
            state.loading = true;
            state.image_url = None;
            state.error = None;
        }

        let result = self.source.fetch_image_url().await;

        let mut state = self.lock_state();
        match result {
            Ok(url) => {
                debug!("fetched image {url}");
                state.image_url = Some(url);
            }
            Err(err) => {
                warn!("image fetch failed: {err:?}");
                state.error = Some(err.to_string());
            }
        }
        state.loading = false;
    }

    /// Returns a copy of the current state.
    #[inline]
    pub fn state(&self) -> ImageState {
        self.lock_state().clone()
    }

    #[inline]
    fn lock_state(&self) -> MutexGuard<'_, ImageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
