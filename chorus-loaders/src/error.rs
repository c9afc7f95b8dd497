use std::fmt::{Display, Formatter};

/// Error returned by a [`SourceLoader`](crate::SourceLoader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// There is nothing behind the URL.
    NotFound(String),
    /// The source exists, but reading it failed.
    Io {
        /// The requested URL.
        url: String,
        /// Description of the I/O failure.
        message: String,
    },
    /// The server answered with a non-success status.
    Http {
        /// The requested URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
}

impl FetchError {
    /// Returns the URL the failed request was made for.
    pub fn url(&self) -> &str {
        match self {
            FetchError::NotFound(url) | FetchError::Io { url, .. } | FetchError::Http { url, .. } => url,
        }
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::NotFound(url) => write!(f, "can't find source: {url}"),
            FetchError::Io { url, message } => write!(f, "can't read source {url}: {message}"),
            FetchError::Http { url, status } => write!(f, "request for {url} failed with status {status}"),
        }
    }
}

impl std::error::Error for FetchError {}
