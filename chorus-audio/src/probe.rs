use hashbrown::HashMap;

use crate::platform::{CanPlay, MediaProbe};

/// Extensions checked at startup, each with the MIME types that make it
/// playable (any one of them is enough).
const CODECS: &[(&str, &[&str])] = &[
    ("mp3", &["audio/mpeg;", "audio/mp3;"]),
    ("mpeg", &["audio/mpeg;"]),
    ("opus", &["audio/ogg; codecs=\"opus\""]),
    ("ogg", &["audio/ogg; codecs=\"vorbis\""]),
    ("oga", &["audio/ogg; codecs=\"vorbis\""]),
    ("wav", &["audio/wav; codecs=\"1\"", "audio/wav"]),
    ("aac", &["audio/aac;"]),
    ("caf", &["audio/x-caf;"]),
    ("m4a", &["audio/x-m4a;", "audio/m4a;", "audio/aac;"]),
    ("m4b", &["audio/x-m4b;", "audio/m4b;", "audio/aac;"]),
    ("mp4", &["audio/x-mp4;", "audio/mp4;", "audio/aac;"]),
    ("weba", &["audio/webm; codecs=\"vorbis\""]),
    ("webm", &["audio/webm; codecs=\"vorbis\""]),
    ("dolby", &["audio/mp4; codecs=\"ec-3\""]),
    ("flac", &["audio/x-flac;", "audio/flac;"]),
];

/// Which formats the host can play. Computed once when the engine starts.
#[derive(Debug, Clone, Default)]
pub struct CodecTable {
    supported: HashMap<&'static str, bool>,
}

impl CodecTable {
    /// Queries the probe for every known format.
    pub fn probe(probe: &impl MediaProbe) -> Self {
        let supported = CODECS
            .iter()
            .map(|(extension, mime_types)| {
                let playable = mime_types.iter().any(|mime| probe.can_play_type(mime) != CanPlay::No);
                (*extension, playable)
            })
            .collect();

        Self { supported }
    }

    /// A table that supports nothing, used when the host can't play audio.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns whether the extension (or MIME subtype) is playable. A leading
    /// `x-` is ignored and the lookup is case insensitive.
    pub fn supports(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        let extension = extension.strip_prefix("x-").unwrap_or(&extension);

        self.supported.get(extension).copied().unwrap_or(false)
    }
}

/// Returns the lowercase extension of a source, the text after the final `.`.
pub(crate) fn extension_of(source: &str) -> String {
    match source.rsplit_once('.') {
        Some((_, extension)) => extension.to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Picks the source to load. Extensions are deduplicated in first-seen order,
/// the first supported one wins and its first source is returned.
pub(crate) fn resolve_source<'a>(sources: &'a [String], formats: &[String], codecs: &CodecTable) -> Option<&'a str> {
    let extensions: Vec<String> = sources
        .iter()
        .enumerate()
        .map(|(index, source)| match formats.get(index) {
            Some(format) => format.to_ascii_lowercase(),
            None => extension_of(source),
        })
        .collect();

    let mut candidates: Vec<&str> = Vec::with_capacity(extensions.len());

    for extension in &extensions {
        if !candidates.contains(&extension.as_str()) {
            candidates.push(extension);
        }
    }

    let chosen = candidates.into_iter().find(|extension| codecs.supports(extension))?;
    let index = extensions.iter().position(|extension| extension == chosen)?;

    Some(sources[index].as_str())
}

#[cfg(test)]
mod tests {
    use crate::platform::{CanPlay, MediaProbe};
    use crate::probe::{CodecTable, extension_of, resolve_source};

    struct Probe(&'static [&'static str]);

    impl MediaProbe for Probe {
        fn can_play_type(&self, mime: &str) -> CanPlay {
            match self.0.contains(&mime) {
                true => CanPlay::Maybe,
                false => CanPlay::No,
            }
        }
    }

    fn sources(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_mp3_through_either_mime() {
        let table = CodecTable::probe(&Probe(&["audio/mp3;"]));

        assert!(table.supports("mp3"));
        assert!(!table.supports("mpeg"));
    }

    #[test]
    fn test_supports_strips_x_prefix() {
        let table = CodecTable::probe(&Probe(&["audio/x-m4a;"]));

        assert!(table.supports("x-m4a"));
        assert!(table.supports("M4A"));
        assert!(!table.supports("x-flac"));
    }

    #[test]
    fn test_empty_table() {
        assert!(!CodecTable::empty().supports("wav"));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("music/Theme.MP3"), "mp3");
        assert_eq!(extension_of("no_extension"), "");
    }

    #[test]
    fn test_resolve_first_supported_extension() {
        let table = CodecTable::probe(&Probe(&["audio/mpeg;", "audio/wav"]));
        let sources = sources(&["a.webm", "b.wav", "c.mp3", "d.wav"]);

        assert_eq!(resolve_source(&sources, &[], &table), Some("b.wav"));
    }

    #[test]
    fn test_resolve_picks_first_source_of_extension() {
        let table = CodecTable::probe(&Probe(&["audio/mpeg;"]));
        let sources = sources(&["intro.MP3", "intro-fallback.mp3"]);

        assert_eq!(resolve_source(&sources, &[], &table), Some("intro.MP3"));
    }

    #[test]
    fn test_resolve_uses_format_hints() {
        let table = CodecTable::probe(&Probe(&["audio/mpeg;"]));
        let urls = sources(&["stream?id=4", "stream?id=5"]);
        let formats = sources(&["ogg", "mp3"]);

        assert_eq!(resolve_source(&urls, &formats, &table), Some("stream?id=5"));
    }

    #[test]
    fn test_resolve_nothing_supported() {
        let table = CodecTable::probe(&Probe(&["audio/mpeg;"]));

        assert_eq!(resolve_source(&sources(&["a.xyz"]), &[], &table), None);
    }
}
