use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reason why a resource could not be loaded. Delivered with
/// [`EventKind::LoadError`](crate::EventKind::LoadError).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The host has no playback primitive at all.
    CapabilityUnavailable,
    /// None of the candidate sources has a supported format.
    UnsupportedFormat,
    /// The bytes (or the element) behind the source could not be fetched.
    NetworkFailure {
        /// The resolved source URL.
        source: String,
        /// Description given by the loader or platform.
        message: String,
    },
    /// The fetched bytes could not be decoded.
    DecodeFailure {
        /// The resolved source URL.
        source: String,
        /// Description given by the platform decoder.
        message: String,
    },
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::CapabilityUnavailable => write!(f, "No audio support."),
            LoadError::UnsupportedFormat => write!(f, "No codec support for selected audio sources."),
            LoadError::NetworkFailure { source, .. } => write!(f, "Failed loading audio file: {source}"),
            LoadError::DecodeFailure { .. } => write!(f, "Decoding audio data failed."),
        }
    }
}

impl Error for LoadError {}

/// Reason why a voice could not start. Delivered with
/// [`EventKind::PlayError`](crate::EventKind::PlayError).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayError {
    /// The platform refused to start playback, usually because of an autoplay
    /// policy.
    PlaybackRejected {
        /// Description given by the platform.
        message: String,
    },
}

impl Display for PlayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayError::PlaybackRejected { message } => write!(f, "Playback was unable to start: {message}"),
        }
    }
}

impl Error for PlayError {}

/// Failure of a single platform primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError(String);

impl PlatformError {
    /// Creates a new error with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Returns the description of the error.
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for PlatformError {}

#[cfg(test)]
mod tests {
    use crate::error::{LoadError, PlayError};

    #[test]
    fn test_load_error_messages() {
        let network = LoadError::NetworkFailure {
            source: "music/theme.mp3".to_string(),
            message: "can't find source".to_string(),
        };

        assert_eq!(LoadError::UnsupportedFormat.to_string(), "No codec support for selected audio sources.");
        assert_eq!(network.to_string(), "Failed loading audio file: music/theme.mp3");
    }

    #[test]
    fn test_format_and_network_are_distinct() {
        let decode = LoadError::DecodeFailure {
            source: "a.wav".to_string(),
            message: "bad header".to_string(),
        };

        assert_ne!(decode.to_string(), LoadError::UnsupportedFormat.to_string());
    }

    #[test]
    fn test_play_error_message() {
        let error = PlayError::PlaybackRejected {
            message: "NotAllowedError".to_string(),
        };

        assert_eq!(error.to_string(), "Playback was unable to start: NotAllowedError");
    }
}
