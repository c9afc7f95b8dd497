use std::io::Cursor;
use std::sync::RwLock;

use hashbrown::{HashMap, HashSet};

use crate::{FetchError, FetchProgress, FetchRequest, SourceLoader, read_with_progress};

/// A loader that serves sources from memory. Useful for embedded assets and
/// for tests.
#[derive(Default)]
pub struct MemoryLoader {
    sources: RwLock<HashMap<String, Vec<u8>>>,
    protected: RwLock<HashSet<String>>,
}

impl MemoryLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the bytes served for `url`.
    pub fn insert(&self, url: impl Into<String>, bytes: Vec<u8>) {
        if let Ok(mut sources) = self.sources.write() {
            sources.insert(url.into(), bytes);
        }
    }

    /// Adds bytes that are only served to requests made with credentials.
    /// Other requests get a `401`.
    pub fn insert_protected(&self, url: impl Into<String>, bytes: Vec<u8>) {
        let url = url.into();

        if let Ok(mut protected) = self.protected.write() {
            protected.insert(url.clone());
        }

        self.insert(url, bytes);
    }

    /// Removes the bytes served for `url`.
    pub fn remove(&self, url: &str) {
        if let Ok(mut sources) = self.sources.write() {
            sources.remove(url);
        }
    }
}

impl SourceLoader for MemoryLoader {
    fn fetch(&self, request: &FetchRequest, progress: &mut dyn FnMut(FetchProgress)) -> Result<Vec<u8>, FetchError> {
        let is_protected = self
            .protected
            .read()
            .map(|protected| protected.contains(request.url))
            .unwrap_or(false);

        if is_protected && !request.with_credentials {
            return Err(FetchError::Http {
                url: request.url.to_string(),
                status: 401,
            });
        }

        let bytes = self
            .sources
            .read()
            .ok()
            .and_then(|sources| sources.get(request.url).cloned())
            .ok_or_else(|| FetchError::NotFound(request.url.to_string()))?;
        let total = bytes.len() as u64;

        read_with_progress(Cursor::new(bytes), Some(total), progress).map_err(|error| FetchError::Io {
            url: request.url.to_string(),
            message: error.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{FetchError, FetchRequest, MemoryLoader, SourceLoader};

    fn request(url: &str, with_credentials: bool) -> FetchRequest<'_> {
        FetchRequest { url, with_credentials }
    }

    #[test]
    fn test_fetch_inserted() {
        let loader = MemoryLoader::new();
        loader.insert("sound.wav", vec![1, 2, 3]);

        let bytes = loader.fetch(&request("sound.wav", false), &mut |_| {}).unwrap();

        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_fetch_missing() {
        let loader = MemoryLoader::new();
        let error = loader.fetch(&request("missing.wav", false), &mut |_| {}).unwrap_err();

        assert_eq!(error, FetchError::NotFound("missing.wav".to_string()));
    }

    #[test]
    fn test_protected_requires_credentials() {
        let loader = MemoryLoader::new();
        loader.insert_protected("private.mp3", vec![0; 4]);

        let denied = loader.fetch(&request("private.mp3", false), &mut |_| {});
        let granted = loader.fetch(&request("private.mp3", true), &mut |_| {});

        assert!(matches!(denied, Err(FetchError::Http { status: 401, .. })));
        assert_eq!(granted.unwrap().len(), 4);
    }

    #[test]
    fn test_progress_reaches_total() {
        let loader = MemoryLoader::new();
        loader.insert("long.wav", vec![0; 40_000]);
        let mut last = None;

        loader
            .fetch(&request("long.wav", false), &mut |progress| last = progress.fraction())
            .unwrap();

        assert_eq!(last, Some(1.0));
    }
}
