//! The two ways a voice can produce sound. A graph voice plays slices of the
//! shared decoded buffer through its own gain node, an element voice drives a
//! media element of its own.

mod element;
mod graph;

pub(crate) use self::element::ElementVoice;
pub(crate) use self::graph::GraphVoice;
use crate::error::PlatformError;
use crate::platform::Platform;

/// Buffer time requested for looping sources. Looping sources only stop when
/// told to.
pub(crate) const LOOP_DURATION: f64 = 86400.0;

/// The transport parameters needed to start a voice.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Playback {
    /// Start of the sprite in the source.
    pub start: f64,
    /// Length of the sprite.
    pub duration: f64,
    /// Position relative to `start` to begin at.
    pub seek: f64,
    pub rate: f32,
    pub looping: bool,
}

impl Playback {
    /// Buffer time left until the end of the sprite.
    pub fn remaining(&self) -> f64 {
        (self.duration - self.seek).max(0.0)
    }
}

/// The backend a voice is bound to. Voices created before their resource
/// finished loading stay unbound until it did.
pub(crate) enum VoiceBackend<N, E> {
    Unbound,
    Graph(GraphVoice<N>),
    Element(ElementVoice<E>),
}

impl<N: Copy + Eq, E: Copy + Eq> VoiceBackend<N, E> {
    pub fn is_unbound(&self) -> bool {
        matches!(self, VoiceBackend::Unbound)
    }

    pub fn element(&self) -> Option<E> {
        match self {
            VoiceBackend::Element(voice) => Some(voice.element),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<N> {
        match self {
            VoiceBackend::Graph(voice) => voice.source,
            _ => None,
        }
    }

    /// Starts playback with the given parameters.
    pub fn start<P>(&mut self, platform: &mut P, buffer: Option<&P::Buffer>, playback: &Playback, volume: f32) -> Result<(), PlatformError>
    where
        P: Platform<Node = N, Element = E>,
    {
        match self {
            VoiceBackend::Unbound => Err(PlatformError::new("voice is not bound to a backend")),
            VoiceBackend::Graph(voice) => {
                let buffer = buffer.ok_or_else(|| PlatformError::new("resource has no decoded buffer"))?;
                voice.start(platform, buffer, playback, volume)
            }
            VoiceBackend::Element(voice) => voice.start(platform, playback, volume),
        }
    }

    /// Silences the voice. Graph sources are stopped and dropped, elements are
    /// paused in place.
    pub fn stop<P>(&mut self, platform: &mut P)
    where
        P: Platform<Node = N, Element = E>,
    {
        match self {
            VoiceBackend::Unbound => {}
            VoiceBackend::Graph(voice) => voice.stop(platform),
            VoiceBackend::Element(voice) => platform.pause_element(voice.element),
        }
    }

    /// Current position relative to the sprite start, if the backend is
    /// playing.
    pub fn position<P>(&self, platform: &P, playback: &Playback) -> Option<f64>
    where
        P: Platform<Node = N, Element = E>,
    {
        match self {
            VoiceBackend::Unbound => None,
            VoiceBackend::Graph(voice) => voice.position(platform, playback),
            VoiceBackend::Element(voice) => Some(voice.position(platform, playback)),
        }
    }

    /// Applies an output volume immediately.
    pub fn set_volume<P>(&mut self, platform: &mut P, volume: f32)
    where
        P: Platform<Node = N, Element = E>,
    {
        match self {
            VoiceBackend::Unbound => {}
            VoiceBackend::Graph(voice) => platform.set_gain(voice.gain, volume, platform.context_time()),
            VoiceBackend::Element(voice) => platform.set_element_volume(voice.element, volume),
        }
    }

    /// Changes the rate of a playing voice. `playback` still carries the old
    /// rate.
    pub fn set_rate<P>(&mut self, platform: &mut P, playback: &Playback, rate: f32)
    where
        P: Platform<Node = N, Element = E>,
    {
        match self {
            VoiceBackend::Unbound => {}
            VoiceBackend::Graph(voice) => voice.set_rate(platform, playback, rate),
            VoiceBackend::Element(voice) => platform.set_element_rate(voice.element, rate),
        }
    }

    /// Restarts the loop bookkeeping at the beginning of a new iteration.
    pub fn restart_loop<P>(&mut self, platform: &mut P, playback: &Playback)
    where
        P: Platform<Node = N, Element = E>,
    {
        match self {
            VoiceBackend::Unbound => {}
            VoiceBackend::Graph(voice) => voice.restart_loop(platform),
            VoiceBackend::Element(voice) => voice.restart_loop(platform, playback),
        }
    }

    /// Releases every platform handle. Returns the element, so it can be
    /// pooled.
    pub fn release<P>(self, platform: &mut P) -> Option<E>
    where
        P: Platform<Node = N, Element = E>,
    {
        match self {
            VoiceBackend::Unbound => None,
            VoiceBackend::Graph(voice) => {
                voice.release(platform);
                None
            }
            VoiceBackend::Element(voice) => {
                platform.pause_element(voice.element);
                Some(voice.element)
            }
        }
    }
}
