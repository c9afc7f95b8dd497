//! Fetching of audio bytes. The audio engine only sees the [`SourceLoader`]
//! trait, so the same resource code works with files on disk, bytes held in
//! memory or plain HTTP.
#![warn(missing_docs)]

mod error;
mod fs;
#[cfg(feature = "http")]
mod http;
mod memory;

use std::io::Read;

pub use self::error::FetchError;
pub use self::fs::FsLoader;
#[cfg(feature = "http")]
pub use self::http::HttpLoader;
pub use self::memory::MemoryLoader;

const CHUNK_SIZE: usize = 16 * 1024;

/// One request for the bytes behind a source URL.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// The resolved source URL.
    pub url: &'a str,
    /// Whether credentials (cookies, authorization) should be sent along.
    pub with_credentials: bool,
}

/// Progress of a running fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    /// Number of bytes received so far.
    pub loaded: u64,
    /// Total number of bytes, if the source announced it.
    pub total: Option<u64>,
}

impl FetchProgress {
    /// Returns the received fraction in `[0, 1]` if the total is known.
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.loaded as f64 / total as f64).min(1.0) as f32),
            None => None,
        }
    }
}

/// Trait for fetching the raw bytes of an audio source.
///
/// Implementations are called from a worker thread and may block.
pub trait SourceLoader: Send + Sync + 'static {
    /// Returns the complete content of the requested source. `progress` is
    /// called every time a new chunk arrived.
    fn fetch(&self, request: &FetchRequest, progress: &mut dyn FnMut(FetchProgress)) -> Result<Vec<u8>, FetchError>;
}

/// Reads `reader` to the end in fixed chunks and reports every chunk.
pub(crate) fn read_with_progress(
    mut reader: impl Read,
    total: Option<u64>,
    progress: &mut dyn FnMut(FetchProgress),
) -> std::io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(total.unwrap_or(0).min(64 << 20) as usize);
    let mut chunk = vec![0; CHUNK_SIZE];

    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        };

        bytes.extend_from_slice(&chunk[..read]);
        progress(FetchProgress {
            loaded: bytes.len() as u64,
            total,
        });
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{CHUNK_SIZE, FetchProgress, read_with_progress};

    #[test]
    fn test_fraction_unknown_total() {
        let progress = FetchProgress { loaded: 10, total: None };
        assert_eq!(progress.fraction(), None);
    }

    #[test]
    fn test_fraction_empty_source() {
        let progress = FetchProgress { loaded: 0, total: Some(0) };
        assert_eq!(progress.fraction(), Some(1.0));
    }

    #[test]
    fn test_read_reports_every_chunk() {
        let data = vec![7u8; CHUNK_SIZE * 2 + 5];
        let mut reports = Vec::new();

        let bytes = read_with_progress(Cursor::new(data.clone()), Some(data.len() as u64), &mut |progress| {
            reports.push(progress.loaded)
        })
        .unwrap();

        assert_eq!(bytes, data);
        assert_eq!(reports, vec![CHUNK_SIZE as u64, CHUNK_SIZE as u64 * 2, data.len() as u64]);
    }
}
