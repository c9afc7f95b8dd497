use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderValue};

use crate::{FetchError, FetchProgress, FetchRequest, SourceLoader, read_with_progress};

/// Loads sources over plain HTTP. Requests made with credentials carry the
/// configured authorization header.
pub struct HttpLoader {
    client: Client,
    authorization: Option<HeaderValue>,
}

impl HttpLoader {
    /// Creates a loader without credentials.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            authorization: None,
        }
    }

    /// Sets the `Authorization` header sent with credentialed requests.
    /// Invalid header values are ignored.
    pub fn with_authorization(mut self, value: &str) -> Self {
        self.authorization = HeaderValue::from_str(value).ok();
        self
    }
}

impl Default for HttpLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceLoader for HttpLoader {
    fn fetch(&self, request: &FetchRequest, progress: &mut dyn FnMut(FetchProgress)) -> Result<Vec<u8>, FetchError> {
        let mut builder = self.client.get(request.url);

        if request.with_credentials
            && let Some(authorization) = self.authorization.clone()
        {
            builder = builder.header(AUTHORIZATION, authorization);
        }

        let response = builder.send().map_err(|error| FetchError::Io {
            url: request.url.to_string(),
            message: error.to_string(),
        })?;

        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Http {
                url: request.url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();

        read_with_progress(response, total, progress).map_err(|error| FetchError::Io {
            url: request.url.to_string(),
            message: error.to_string(),
        })
    }
}
