//! The host primitives the engine is built on. A platform wraps an audio
//! context with its node graph, media elements, a decoder and a clock.
//!
//! All asynchronous completions are queued by the platform and pulled by the
//! engine through [`Platform::poll_event`].

pub mod headless;

use std::fmt::Debug;

use cgmath::Vector3;

use crate::error::PlatformError;
use crate::settings::PreloadHint;
use crate::spatial::{ListenerAttributes, PannerAttributes};

/// Answer of a format support query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanPlay {
    /// The format can't be played.
    No,
    /// The format might be playable.
    Maybe,
    /// The format is most likely playable.
    Probably,
}

/// A minimal playback primitive that can answer format support queries.
pub trait MediaProbe {
    /// Returns whether the given MIME type (including codec parameters) can
    /// be played.
    fn can_play_type(&self, mime: &str) -> CanPlay;
}

/// Facts about the host that influence how the engine sets itself up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Environment {
    /// Audio stays locked until the user interacts with the page.
    pub requires_gesture: bool,
    /// Major version of the iOS webview, if running inside one. Versions
    /// before 9 crash when using the audio graph.
    pub ios_version: Option<u32>,
}

/// State of the platform's audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// The context is processing audio.
    Running,
    /// The context is halted and its clock does not advance.
    Suspended,
}

/// Cross origin mode of a media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossOrigin {
    /// Requests are made without credentials.
    Anonymous,
}

/// Options used when pointing a media element at a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementOptions {
    /// How much of the source the element should buffer ahead.
    pub preload: PreloadHint,
    /// Cross origin mode of the element's requests.
    pub cross_origin: CrossOrigin,
    /// Whether the element starts playing on its own once it can.
    pub autoplay: bool,
}

/// Identifies an asynchronous decode request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

/// Notification fired by a media element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementEvent {
    /// Enough data is buffered to play to the end.
    CanPlayThrough,
    /// Duration and dimensions are known.
    LoadedMetadata,
    /// Loading failed.
    Error(String),
    /// The platform stopped fetching data.
    Suspend,
    /// Playback reached the end of the source.
    Ended,
    /// A play request was rejected after it was issued.
    PlayRejected(String),
}

/// An asynchronous completion reported by the platform.
pub enum PlatformEvent<B, N, E> {
    /// A decode request finished.
    Decoded {
        /// The request that finished.
        request: RequestId,
        /// The decoded buffer or the reason decoding failed.
        result: Result<B, PlatformError>,
    },
    /// The context finished transitioning to a new state.
    ContextStateChanged(ContextState),
    /// A buffer source reached its end or was stopped.
    SourceEnded(N),
    /// A media element fired a notification.
    Element {
        /// The element that fired.
        element: E,
        /// The notification.
        event: ElementEvent,
    },
}

/// Shorthand for the event type of a platform.
pub type EventOf<P> = PlatformEvent<<P as Platform>::Buffer, <P as Platform>::Node, <P as Platform>::Element>;

/// Audio graph, media element and decoding primitives of a host.
pub trait Platform {
    /// A decoded, playable buffer.
    type Buffer: Clone;
    /// Handle to a node of the audio graph.
    type Node: Copy + Eq + Debug;
    /// Handle to a media element.
    type Element: Copy + Eq + Debug;
    /// The primitive used for format support queries.
    type Probe: MediaProbe;

    /// Describes the host.
    fn environment(&self) -> Environment;

    /// Creates a minimal playback primitive. Returns [`None`] if the host
    /// can't play audio at all.
    fn create_probe(&mut self) -> Option<Self::Probe>;

    /// Monotonic wall clock in seconds.
    fn now(&self) -> f64;

    /// Creates the audio context and returns the state it starts in.
    fn create_context(&mut self) -> Result<ContextState, PlatformError>;

    /// Closes the audio context. All nodes become invalid.
    fn close_context(&mut self);

    /// Current time of the audio context clock in seconds.
    fn context_time(&self) -> f64;

    /// Requests the context to suspend. Completion is reported with
    /// [`PlatformEvent::ContextStateChanged`].
    fn suspend_context(&mut self);

    /// Requests the context to resume. Completion is reported with
    /// [`PlatformEvent::ContextStateChanged`].
    fn resume_context(&mut self);

    /// The final node of the graph.
    fn destination(&self) -> Option<Self::Node>;

    /// Creates a gain node with a gain of one.
    fn create_gain(&mut self) -> Result<Self::Node, PlatformError>;

    /// Schedules a gain value at the given context time.
    fn set_gain(&mut self, node: Self::Node, value: f32, at: f64);

    /// Connects the output of `from` to the input of `to`.
    fn connect(&mut self, from: Self::Node, to: Self::Node);

    /// Disconnects every output of the node.
    fn disconnect(&mut self, node: Self::Node);

    /// Starts decoding the bytes. Completion is reported with
    /// [`PlatformEvent::Decoded`].
    fn decode(&mut self, bytes: Vec<u8>) -> RequestId;

    /// Creates a buffer holding a single silent sample.
    fn create_silent_buffer(&mut self) -> Result<Self::Buffer, PlatformError>;

    /// Length of a decoded buffer in seconds.
    fn buffer_duration(&self, buffer: &Self::Buffer) -> f64;

    /// Creates a one-shot source node playing the buffer.
    fn create_source(&mut self, buffer: &Self::Buffer) -> Result<Self::Node, PlatformError>;

    /// Schedules the playback rate of a source at the given context time.
    fn set_source_rate(&mut self, node: Self::Node, rate: f32, at: f64);

    /// Sets the loop region of a source in seconds, or disables looping.
    fn set_source_loop(&mut self, node: Self::Node, region: Option<(f64, f64)>);

    /// Starts a source at context time `when`, from `offset` seconds into the
    /// buffer, for `duration` seconds of buffer time.
    fn start_source(&mut self, node: Self::Node, when: f64, offset: f64, duration: f64) -> Result<(), PlatformError>;

    /// Stops a source. A stopped source can't be started again.
    fn stop_source(&mut self, node: Self::Node);

    /// Creates a media element without a source.
    fn create_element(&mut self) -> Result<Self::Element, PlatformError>;

    /// Points the element at a source and starts loading it.
    fn load_element(&mut self, element: Self::Element, source: &str, options: &ElementOptions);

    /// Duration of the element's source, once known.
    fn element_duration(&self, element: Self::Element) -> Option<f64>;

    /// Current playback position of the element in seconds.
    fn element_position(&self, element: Self::Element) -> f64;

    /// Moves the playback position of the element.
    fn set_element_position(&mut self, element: Self::Element, position: f64);

    /// Sets the output volume of the element.
    fn set_element_volume(&mut self, element: Self::Element, volume: f32);

    /// Sets the playback rate of the element.
    fn set_element_rate(&mut self, element: Self::Element, rate: f32);

    /// Makes the element loop its whole source.
    fn set_element_loop(&mut self, element: Self::Element, looping: bool);

    /// Starts playback. A synchronous refusal is returned directly, a late
    /// one is reported with [`ElementEvent::PlayRejected`].
    fn play_element(&mut self, element: Self::Element) -> Result<(), PlatformError>;

    /// Pauses playback.
    fn pause_element(&mut self, element: Self::Element);

    /// Destroys the element.
    fn release_element(&mut self, element: Self::Element);

    /// The spatial capability of the platform, if it has one.
    fn spatial(&mut self) -> Option<&mut dyn SpatialPlatform<Node = Self::Node>>;

    /// Returns the next pending completion.
    fn poll_event(&mut self) -> Option<EventOf<Self>>;
}

/// Panner and listener primitives of a host. Optional: a platform without it
/// turns every spatial operation into a no-op.
pub trait SpatialPlatform {
    /// Handle to a node of the audio graph.
    type Node: Copy;

    /// Creates an equal-power stereo panner, if the host has one.
    fn create_stereo_panner(&mut self) -> Option<Self::Node>;

    /// Schedules the pan of a stereo panner in `[-1, 1]`.
    fn set_pan(&mut self, node: Self::Node, pan: f32, at: f64);

    /// Creates a 3D panner.
    fn create_panner(&mut self) -> Result<Self::Node, PlatformError>;

    /// Schedules the position of a panner.
    fn set_panner_position(&mut self, node: Self::Node, position: Vector3<f32>, at: f64);

    /// Schedules the orientation of a panner.
    fn set_panner_orientation(&mut self, node: Self::Node, orientation: Vector3<f32>, at: f64);

    /// Sets the velocity of a panner.
    fn set_panner_velocity(&mut self, node: Self::Node, velocity: Vector3<f32>);

    /// Sets the cone, distance and panning attributes of a panner.
    fn set_panner_attributes(&mut self, node: Self::Node, attributes: &PannerAttributes);

    /// Schedules the position of the listener.
    fn set_listener_position(&mut self, position: Vector3<f32>, at: f64);

    /// Schedules the forward and up vectors of the listener.
    fn set_listener_orientation(&mut self, forward: Vector3<f32>, up: Vector3<f32>, at: f64);

    /// Sets the velocity of the listener.
    fn set_listener_velocity(&mut self, velocity: Vector3<f32>);

    /// Sets the doppler factor and speed of sound of the listener.
    fn set_listener_attributes(&mut self, attributes: &ListenerAttributes);
}
