use std::path::Path;
use std::time::Duration;

use cgmath::Vector3;
#[cfg(feature = "debug")]
use chorus_debug::logging::{Colorize, print_debug};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::spatial::PannerAttributesUpdate;

pub(crate) const MIN_RATE: f32 = 0.5;
pub(crate) const MAX_RATE: f32 = 4.0;

/// Settings of the [`AudioEngine`](crate::AudioEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Suspend the audio context after it was idle for `suspend_delay`.
    pub auto_suspend: bool,
    /// Unlock audio on the first user gesture on hosts that need it.
    pub auto_unlock: bool,
    /// How long the context has to be idle before it is suspended.
    pub suspend_delay: Duration,
    /// Number of released media elements kept for reuse.
    pub html5_pool_size: usize,
    /// Master volume the engine starts with.
    pub master_volume: f32,
    /// Never use the audio graph, play everything through media elements.
    pub no_graph: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            auto_suspend: true,
            auto_unlock: true,
            suspend_delay: Duration::from_secs(30),
            html5_pool_size: 10,
            master_volume: 1.0,
            no_graph: false,
        }
    }
}

impl EngineSettings {
    /// Parses settings from RON. Missing fields use their default.
    pub fn from_ron(text: &str) -> Option<Self> {
        ron::from_str(text).ok()
    }

    /// Loads settings from a RON file, falling back to the defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        #[cfg(feature = "debug")]
        print_debug!("loading engine settings from {}", path.display().magenta());

        std::fs::read_to_string(path)
            .ok()
            .and_then(|data| Self::from_ron(&data))
            .unwrap_or_else(|| {
                #[cfg(feature = "debug")]
                print_debug!("[{}] failed to load engine settings, using defaults", "warning".yellow());

                Self::default()
            })
    }
}

/// Hint for how much of a source a media element should buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreloadHint {
    /// Buffer the whole source.
    #[default]
    Auto,
    /// Only fetch the metadata.
    Metadata,
    /// Don't buffer ahead.
    None,
}

impl PreloadHint {
    /// The attribute value used by media elements.
    pub fn as_str(self) -> &'static str {
        match self {
            PreloadHint::Auto => "auto",
            PreloadHint::Metadata => "metadata",
            PreloadHint::None => "none",
        }
    }
}

/// Whether a resource starts loading when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preload {
    /// Load on the first play or explicit `load`.
    Off,
    /// Load right away with the given element hint.
    Hint(PreloadHint),
}

impl Default for Preload {
    fn default() -> Self {
        Preload::Hint(PreloadHint::Auto)
    }
}

impl From<bool> for Preload {
    fn from(enabled: bool) -> Self {
        match enabled {
            true => Preload::Hint(PreloadHint::Auto),
            false => Preload::Off,
        }
    }
}

/// A named range of a resource, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    /// Start of the range.
    pub start: f64,
    /// End of the range.
    pub end: f64,
    /// Overrides the resource's loop flag for plays of this sprite.
    #[serde(default)]
    pub looping: Option<bool>,
}

impl Sprite {
    /// Creates a sprite from a start and end in milliseconds.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end, looping: None }
    }

    /// Creates a sprite that loops when played.
    pub fn looping(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            looping: Some(true),
        }
    }

    /// Start of the sprite in seconds.
    pub fn start_seconds(&self) -> f64 {
        self.start / 1000.0
    }

    /// Length of the sprite in seconds. Never negative.
    pub fn duration_seconds(&self) -> f64 {
        ((self.end - self.start) / 1000.0).max(0.0)
    }
}

/// Settings of a single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSettings {
    /// Candidate source URLs, in order of preference.
    pub src: Vec<String>,
    /// Explicit formats for the sources with the same index, used instead of
    /// the URL's extension.
    pub format: Vec<String>,
    /// Always use a media element, even if the audio graph is available.
    pub html5: bool,
    /// Start muted.
    pub mute: bool,
    /// Loop every play.
    #[serde(rename = "loop")]
    pub looping: bool,
    /// Maximum number of voices for the graph backend.
    pub pool: usize,
    /// Whether and how to load on creation.
    pub preload: Preload,
    /// Default playback rate.
    pub rate: f32,
    /// Named ranges of the source.
    pub sprite: HashMap<String, Sprite>,
    /// Default volume.
    pub volume: f32,
    /// Send credentials when fetching the source.
    pub xhr_with_credentials: bool,
    /// Play the first voice as soon as loading finished.
    pub autoplay: bool,
    /// Initial stereo pan of every voice.
    pub stereo: Option<f32>,
    /// Initial 3D position of every voice.
    pub position: Option<Vector3<f32>>,
    /// Initial 3D orientation of every voice.
    pub orientation: Option<Vector3<f32>>,
    /// Initial panner attributes of every voice.
    pub panner_attributes: PannerAttributesUpdate,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            src: Vec::new(),
            format: Vec::new(),
            html5: false,
            mute: false,
            looping: false,
            pool: 5,
            preload: Preload::default(),
            rate: 1.0,
            sprite: HashMap::new(),
            volume: 1.0,
            xhr_with_credentials: false,
            autoplay: false,
            stereo: None,
            position: None,
            orientation: None,
            panner_attributes: PannerAttributesUpdate::default(),
        }
    }
}

impl ResourceSettings {
    /// Creates settings for the given candidate sources.
    pub fn new<S: Into<String>>(src: impl IntoIterator<Item = S>) -> Self {
        Self {
            src: src.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Adds a named sprite.
    pub fn sprite(mut self, name: impl Into<String>, sprite: Sprite) -> Self {
        self.sprite.insert(name.into(), sprite);
        self
    }

    /// Sets the preload policy.
    pub fn preload(mut self, preload: impl Into<Preload>) -> Self {
        self.preload = preload.into();
        self
    }

    /// Forces the media element backend.
    pub fn html5(mut self, html5: bool) -> Self {
        self.html5 = html5;
        self
    }

    /// Sets the default loop flag.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Sets the default volume.
    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Sets the default rate.
    pub fn rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    /// Sets the voice pool size of the graph backend.
    pub fn pool(mut self, pool: usize) -> Self {
        self.pool = pool;
        self
    }

    /// Plays the first voice once loaded.
    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    /// Starts muted.
    pub fn mute(mut self, mute: bool) -> Self {
        self.mute = mute;
        self
    }
}

pub(crate) fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) }
}

pub(crate) fn clamp_rate(rate: f32) -> f32 {
    if rate.is_nan() { 1.0 } else { rate.clamp(MIN_RATE, MAX_RATE) }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::settings::{EngineSettings, Preload, PreloadHint, ResourceSettings, Sprite, clamp_rate, clamp_volume};

    #[test]
    fn test_engine_defaults() {
        let settings = EngineSettings::default();

        assert!(settings.auto_suspend);
        assert_eq!(settings.suspend_delay, Duration::from_secs(30));
        assert_eq!(settings.html5_pool_size, 10);
    }

    #[test]
    fn test_engine_settings_from_partial_ron() {
        let settings = EngineSettings::from_ron("(auto_suspend: false, html5_pool_size: 4)").unwrap();

        assert!(!settings.auto_suspend);
        assert_eq!(settings.html5_pool_size, 4);
        assert!(settings.auto_unlock);
    }

    #[test]
    fn test_engine_settings_load_missing_file() {
        assert_eq!(EngineSettings::load("does/not/exist.ron"), EngineSettings::default());
    }

    #[test]
    fn test_resource_settings_from_ron() {
        let text = r#"(
            src: ["sounds/effects.webm", "sounds/effects.mp3"],
            loop: true,
            preload: Hint(Metadata),
            sprite: { "blast": (start: 0.0, end: 1500.0), "laser": (start: 2000.0, end: 2500.0, looping: Some(true)) },
        )"#;
        let settings: ResourceSettings = ron::from_str(text).unwrap();

        assert_eq!(settings.src.len(), 2);
        assert!(settings.looping);
        assert_eq!(settings.preload, Preload::Hint(PreloadHint::Metadata));
        assert_eq!(settings.sprite["laser"].looping, Some(true));
        assert_eq!(settings.pool, 5);
    }

    #[test]
    fn test_sprite_duration_is_never_negative() {
        assert_eq!(Sprite::new(2000.0, 1000.0).duration_seconds(), 0.0);
        assert_eq!(Sprite::new(0.0, 2000.0).duration_seconds(), 2.0);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(clamp_volume(1.5), 1.0);
        assert_eq!(clamp_volume(-0.2), 0.0);
        assert_eq!(clamp_rate(0.1), 0.5);
        assert_eq!(clamp_rate(10.0), 4.0);
        assert_eq!(clamp_rate(2.0), 2.0);
    }

    #[test]
    fn test_preload_from_bool() {
        assert_eq!(Preload::from(false), Preload::Off);
        assert_eq!(Preload::from(true), Preload::Hint(PreloadHint::Auto));
    }
}
