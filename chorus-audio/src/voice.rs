use std::fmt::{Display, Formatter};

use crate::backend::VoiceBackend;
use crate::platform::Platform;
use crate::spatial::SpatialState;

/// Process unique identifier of a voice. Never reused while the engine lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoiceId(pub(crate) u32);

impl VoiceId {
    /// Returns the numeric value of the id.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Display for VoiceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport state of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// Paused somewhere inside its range.
    Paused,
    /// Currently playing.
    Playing,
    /// Ended or stopped, or never started.
    Stopped,
}

/// A running linear volume ramp.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fade {
    pub from: f32,
    pub to: f32,
    pub started_at: f64,
    pub duration: f64,
}

impl Fade {
    /// Returns the volume at `now` and whether the fade is complete.
    pub fn sample(&self, now: f64) -> (f32, bool) {
        if self.duration <= 0.0 {
            return (self.to, true);
        }

        let progress = ((now - self.started_at) / self.duration).clamp(0.0, 1.0);
        let volume = self.from + (self.to - self.from) * progress as f32;

        (volume, progress >= 1.0)
    }
}

/// One schedulable instance of a resource.
pub(crate) struct Voice<P: Platform> {
    pub id: VoiceId,
    pub paused: bool,
    pub ended: bool,
    pub muted: bool,
    pub volume: f32,
    pub rate: f32,
    pub looping: bool,
    pub sprite: String,
    /// Start of the sprite in the source, in seconds.
    pub start: f64,
    /// Length of the sprite in seconds.
    pub duration: f64,
    /// Resume position relative to `start`.
    pub seek: f64,
    /// Waiting for a play that was queued before loading finished.
    pub reserved: bool,
    pub paused_by_visibility: bool,
    pub paused_by_page_hide: bool,
    pub fade: Option<Fade>,
    pub spatial: SpatialState,
    pub backend: VoiceBackend<P::Node, P::Element>,
}

impl<P: Platform> Voice<P> {
    pub fn new(id: VoiceId, volume: f32, rate: f32, muted: bool, looping: bool, spatial: SpatialState) -> Self {
        Self {
            id,
            paused: true,
            ended: true,
            muted,
            volume,
            rate,
            looping,
            sprite: String::new(),
            start: 0.0,
            duration: 0.0,
            seek: 0.0,
            reserved: false,
            paused_by_visibility: false,
            paused_by_page_hide: false,
            fade: None,
            spatial,
            backend: VoiceBackend::Unbound,
        }
    }

    pub fn state(&self) -> VoiceState {
        match (self.paused, self.ended) {
            (_, true) => VoiceState::Stopped,
            (true, false) => VoiceState::Paused,
            (false, false) => VoiceState::Playing,
        }
    }

    /// An ended voice that no queued play is waiting for.
    pub fn is_idle(&self) -> bool {
        self.ended && !self.reserved
    }

    pub fn clear_auto_pause(&mut self) {
        self.paused_by_visibility = false;
        self.paused_by_page_hide = false;
    }

    /// Gain applied by a graph voice. The master volume lives on the master
    /// gain node.
    pub fn graph_gain(&self) -> f32 {
        match self.muted {
            true => 0.0,
            false => self.volume,
        }
    }

    /// Volume applied by an element voice, which bypasses the master gain.
    pub fn element_volume(&self, master_volume: f32, master_muted: bool) -> f32 {
        match self.muted || master_muted {
            true => 0.0,
            false => self.volume * master_volume,
        }
    }
}
