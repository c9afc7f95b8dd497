use std::fs::File;
use std::path::{Path, PathBuf};

use crate::{FetchError, FetchProgress, FetchRequest, SourceLoader, read_with_progress};

/// Loads sources from a directory. URLs are interpreted relative to the root,
/// an optional `file://` prefix is ignored.
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    /// Creates a loader that resolves URLs against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let relative = url.strip_prefix("file://").unwrap_or(url).trim_start_matches('/');
        let relative = match cfg!(target_os = "windows") {
            true => PathBuf::from(relative),
            false => PathBuf::from(relative.replace('\\', "/")),
        };

        self.root.join(relative)
    }
}

impl SourceLoader for FsLoader {
    fn fetch(&self, request: &FetchRequest, progress: &mut dyn FnMut(FetchProgress)) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(request.url);
        let file = open(&path).ok_or_else(|| FetchError::NotFound(request.url.to_string()))?;
        let total = file.metadata().ok().map(|metadata| metadata.len());

        read_with_progress(file, total, progress).map_err(|error| FetchError::Io {
            url: request.url.to_string(),
            message: error.to_string(),
        })
    }
}

fn open(path: &Path) -> Option<File> {
    File::open(path).ok().filter(|file| file.metadata().is_ok_and(|metadata| metadata.is_file()))
}

#[cfg(test)]
mod tests {
    use crate::{FetchError, FetchRequest, FsLoader, SourceLoader};

    #[test]
    fn test_fetch_relative_and_file_url() {
        let directory = tempfile::tempdir().unwrap();
        std::fs::write(directory.path().join("click.wav"), [4, 5, 6]).unwrap();
        let loader = FsLoader::new(directory.path());

        for url in ["click.wav", "file:///click.wav"] {
            let request = FetchRequest {
                url,
                with_credentials: false,
            };

            assert_eq!(loader.fetch(&request, &mut |_| {}).unwrap(), vec![4, 5, 6]);
        }
    }

    #[test]
    fn test_directory_is_not_found() {
        let directory = tempfile::tempdir().unwrap();
        std::fs::create_dir(directory.path().join("sounds")).unwrap();
        let loader = FsLoader::new(directory.path());
        let request = FetchRequest {
            url: "sounds",
            with_credentials: false,
        };

        assert_eq!(
            loader.fetch(&request, &mut |_| {}).unwrap_err(),
            FetchError::NotFound("sounds".to_string())
        );
    }
}
