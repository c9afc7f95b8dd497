//! A deterministic platform without audio output.
//!
//! Both clocks only move when [`HeadlessPlatform::advance`] is called. Sources
//! and elements play along with them and report their end like a real host
//! would. Decoding parses the bytes with symphonia to find the duration of
//! the buffer, so any WAV or MP3 file works as a fixture (see
//! [`silent_wav`]).
//!
//! All state is open to inspection, which makes the platform useful for
//! testing code that drives an [`AudioEngine`](crate::AudioEngine).

use std::collections::VecDeque;
use std::io::Cursor;

use cgmath::{Vector3, Zero};
use hashbrown::HashMap;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::PlatformError;
use crate::platform::{
    CanPlay, ContextState, ElementEvent, ElementOptions, Environment, EventOf, MediaProbe, Platform, PlatformEvent, RequestId,
    SpatialPlatform,
};
use crate::settings::PreloadHint;
use crate::spatial::{ListenerAttributes, PannerAttributes};

const SILENT_BUFFER_DURATION: f64 = 1.0 / 22050.0;
const WAV_SAMPLE_RATE: u32 = 8000;

/// Node handle of the [`HeadlessPlatform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadlessNode(u32);

/// Element handle of the [`HeadlessPlatform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadlessElement(u32);

/// Decoded buffer of the [`HeadlessPlatform`]. Only knows its length.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessBuffer {
    duration: f64,
    silent: bool,
}

/// Format probe of the [`HeadlessPlatform`]. Plays every MIME type except
/// the rejected ones.
#[derive(Debug, Clone, Default)]
pub struct HeadlessProbe {
    rejected: Vec<String>,
}

impl MediaProbe for HeadlessProbe {
    fn can_play_type(&self, mime: &str) -> CanPlay {
        match self.rejected.iter().any(|prefix| mime.starts_with(prefix.as_str())) {
            true => CanPlay::No,
            false => CanPlay::Probably,
        }
    }
}

#[derive(Debug, Clone)]
struct SourceState {
    silent: bool,
    rate: f32,
    loop_region: Option<(f64, f64)>,
    offset: f64,
    length: f64,
    played: f64,
    started: bool,
    running: bool,
}

#[derive(Debug, Clone)]
struct PannerState {
    position: Vector3<f32>,
    orientation: Vector3<f32>,
    velocity: Vector3<f32>,
    attributes: PannerAttributes,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Destination,
    Gain(f32),
    Source(SourceState),
    StereoPanner(f32),
    Panner(PannerState),
}

#[derive(Debug, Clone)]
struct NodeState {
    kind: NodeKind,
    outputs: Vec<HeadlessNode>,
}

#[derive(Debug, Clone)]
struct ElementState {
    source: Option<String>,
    preload: Option<PreloadHint>,
    duration: Option<f64>,
    position: f64,
    volume: f32,
    rate: f32,
    looping: bool,
    playing: bool,
}

/// Pose of the listener as last set by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessListener {
    /// Position of the listener.
    pub position: Vector3<f32>,
    /// Forward vector of the listener.
    pub forward: Vector3<f32>,
    /// Up vector of the listener.
    pub up: Vector3<f32>,
    /// Velocity of the listener.
    pub velocity: Vector3<f32>,
    /// Doppler factor and speed of sound.
    pub attributes: ListenerAttributes,
}

/// A platform that simulates an audio context and media elements in memory.
pub struct HeadlessPlatform {
    environment: Environment,
    audio: bool,
    graph: bool,
    spatial: bool,
    stereo_panner: bool,
    initial_state: ContextState,
    context: Option<ContextState>,
    context_time: f64,
    wall_time: f64,
    destination: Option<HeadlessNode>,
    nodes: Vec<Option<NodeState>>,
    elements: Vec<Option<ElementState>>,
    media: HashMap<String, f64>,
    rejected_mimes: Vec<String>,
    reject_playback: bool,
    reject_playback_late: bool,
    next_request: u64,
    listener: HeadlessListener,
    events: VecDeque<EventOf<HeadlessPlatform>>,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPlatform {
    /// Creates a platform that supports every format, the audio graph and
    /// spatial audio. Audio doesn't need a user gesture.
    pub fn new() -> Self {
        Self {
            environment: Environment::default(),
            audio: true,
            graph: true,
            spatial: true,
            stereo_panner: true,
            initial_state: ContextState::Running,
            context: None,
            context_time: 0.0,
            wall_time: 0.0,
            destination: None,
            nodes: Vec::new(),
            elements: Vec::new(),
            media: HashMap::new(),
            rejected_mimes: Vec::new(),
            reject_playback: false,
            reject_playback_late: false,
            next_request: 0,
            listener: HeadlessListener {
                position: Vector3::new(0.0, 0.0, 0.0),
                forward: Vector3::new(0.0, 0.0, -1.0),
                up: Vector3::new(0.0, 1.0, 0.0),
                velocity: Vector3::new(0.0, 0.0, 0.0),
                attributes: ListenerAttributes::default(),
            },
            events: VecDeque::new(),
        }
    }

    /// A host that can't play audio at all.
    pub fn without_audio(mut self) -> Self {
        self.audio = false;
        self
    }

    /// A host without an audio context. Only media elements are available.
    pub fn without_context(mut self) -> Self {
        self.graph = false;
        self
    }

    /// A host without panner nodes.
    pub fn without_spatial(mut self) -> Self {
        self.spatial = false;
        self
    }

    /// A host with 3D panners but without stereo panners.
    pub fn without_stereo_panner(mut self) -> Self {
        self.stereo_panner = false;
        self
    }

    /// A host that creates its audio context suspended.
    pub fn starting_suspended(mut self) -> Self {
        self.initial_state = ContextState::Suspended;
        self
    }

    /// Replaces the environment the platform reports.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Makes a source available to media elements.
    pub fn with_media(mut self, source: impl Into<String>, duration: f64) -> Self {
        self.media.insert(source.into(), duration);
        self
    }

    /// Rejects every MIME type starting with `prefix`.
    pub fn reject_mime(mut self, prefix: impl Into<String>) -> Self {
        self.rejected_mimes.push(prefix.into());
        self
    }

    /// Makes [`play_element`](Platform::play_element) fail right away.
    pub fn reject_playback(&mut self, reject: bool) {
        self.reject_playback = reject;
    }

    /// Makes [`play_element`](Platform::play_element) succeed, but report a
    /// rejection with the next events.
    pub fn reject_playback_late(&mut self, reject: bool) {
        self.reject_playback_late = reject;
    }

    /// Creates a buffer of the given length without decoding anything.
    pub fn create_buffer(&self, duration: f64) -> HeadlessBuffer {
        HeadlessBuffer { duration, silent: false }
    }

    /// Moves both clocks forward. The context clock only moves while the
    /// context runs.
    pub fn advance(&mut self, seconds: f64) {
        self.wall_time += seconds;

        if self.context == Some(ContextState::Running) {
            self.context_time += seconds;

            for (index, node) in self.nodes.iter_mut().enumerate() {
                let Some(NodeState {
                    kind: NodeKind::Source(source),
                    ..
                }) = node
                else {
                    continue;
                };

                if !source.running {
                    continue;
                }

                source.played += seconds * source.rate as f64;

                if source.loop_region.is_none() && source.played >= source.length {
                    source.running = false;
                    self.events.push_back(PlatformEvent::SourceEnded(HeadlessNode(index as u32)));
                }
            }
        }

        for (index, element) in self.elements.iter_mut().enumerate() {
            let Some(element) = element else {
                continue;
            };

            if !element.playing {
                continue;
            }

            let duration = element.duration.unwrap_or(0.0);
            element.position += seconds * element.rate as f64;

            if element.position >= duration {
                match element.looping && duration > 0.0 {
                    true => element.position %= duration,
                    false => {
                        element.position = duration;
                        element.playing = false;
                        self.events.push_back(PlatformEvent::Element {
                            element: HeadlessElement(index as u32),
                            event: ElementEvent::Ended,
                        });
                    }
                }
            }
        }
    }

    /// Queues a notification of an element, as if the host fired it.
    pub fn fire_element_event(&mut self, element: HeadlessElement, event: ElementEvent) {
        self.events.push_back(PlatformEvent::Element { element, event });
    }

    /// State of the audio context, if there is one.
    pub fn context_state(&self) -> Option<ContextState> {
        self.context
    }

    fn node(&self, node: HeadlessNode) -> Option<&NodeState> {
        self.nodes.get(node.0 as usize)?.as_ref()
    }

    fn node_mut(&mut self, node: HeadlessNode) -> Option<&mut NodeState> {
        self.nodes.get_mut(node.0 as usize)?.as_mut()
    }

    fn source(&self, node: HeadlessNode) -> Option<&SourceState> {
        match &self.node(node)?.kind {
            NodeKind::Source(source) => Some(source),
            _ => None,
        }
    }

    fn source_mut(&mut self, node: HeadlessNode) -> Option<&mut SourceState> {
        match &mut self.node_mut(node)?.kind {
            NodeKind::Source(source) => Some(source),
            _ => None,
        }
    }

    fn panner(&self, node: HeadlessNode) -> Option<&PannerState> {
        match &self.node(node)?.kind {
            NodeKind::Panner(panner) => Some(panner),
            _ => None,
        }
    }

    fn panner_mut(&mut self, node: HeadlessNode) -> Option<&mut PannerState> {
        match &mut self.node_mut(node)?.kind {
            NodeKind::Panner(panner) => Some(panner),
            _ => None,
        }
    }

    fn add_node(&mut self, kind: NodeKind) -> HeadlessNode {
        self.nodes.push(Some(NodeState { kind, outputs: Vec::new() }));
        HeadlessNode(self.nodes.len() as u32 - 1)
    }

    /// Nodes the output of `node` is connected to.
    pub fn connections(&self, node: HeadlessNode) -> Vec<HeadlessNode> {
        self.node(node).map(|state| state.outputs.clone()).unwrap_or_default()
    }

    /// Nodes connected to the input of `node`.
    pub fn inputs(&self, node: HeadlessNode) -> Vec<HeadlessNode> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, state)| state.as_ref().is_some_and(|state| state.outputs.contains(&node)))
            .map(|(index, _)| HeadlessNode(index as u32))
            .collect()
    }

    /// Current value of a gain node.
    pub fn gain(&self, node: HeadlessNode) -> f32 {
        match self.node(node).map(|state| &state.kind) {
            Some(NodeKind::Gain(gain)) => *gain,
            _ => 0.0,
        }
    }

    /// The gain node feeding the destination.
    pub fn master(&self) -> Option<HeadlessNode> {
        let destination = self.destination?;
        self.inputs(destination)
            .into_iter()
            .find(|node| matches!(self.node(*node).map(|state| &state.kind), Some(NodeKind::Gain(_))))
    }

    /// Buffer offset a source was started at.
    pub fn source_offset(&self, node: HeadlessNode) -> f64 {
        self.source(node).map(|source| source.offset).unwrap_or(0.0)
    }

    /// Playback rate of a source.
    pub fn source_rate(&self, node: HeadlessNode) -> f32 {
        self.source(node).map(|source| source.rate).unwrap_or(0.0)
    }

    /// Loop region of a source.
    pub fn source_loop(&self, node: HeadlessNode) -> Option<(f64, f64)> {
        self.source(node)?.loop_region
    }

    /// Sources that were started and didn't stop or end yet, excluding the
    /// silent unlock buffer.
    pub fn running_sources(&self) -> Vec<HeadlessNode> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, state)| {
                matches!(state, Some(NodeState { kind: NodeKind::Source(source), .. }) if source.running && !source.silent)
            })
            .map(|(index, _)| HeadlessNode(index as u32))
            .collect()
    }

    /// How often a silent buffer was played.
    pub fn silent_plays(&self) -> usize {
        self.nodes
            .iter()
            .filter(|state| matches!(state, Some(NodeState { kind: NodeKind::Source(source), .. }) if source.started && source.silent))
            .count()
    }

    /// Pan of a stereo panner.
    pub fn pan(&self, node: HeadlessNode) -> Option<f32> {
        match self.node(node)?.kind {
            NodeKind::StereoPanner(pan) => Some(pan),
            _ => None,
        }
    }

    /// Position of a 3D panner.
    pub fn panner_position(&self, node: HeadlessNode) -> Option<Vector3<f32>> {
        self.panner(node).map(|panner| panner.position)
    }

    /// Orientation of a 3D panner.
    pub fn panner_orientation(&self, node: HeadlessNode) -> Option<Vector3<f32>> {
        self.panner(node).map(|panner| panner.orientation)
    }

    /// Velocity of a 3D panner.
    pub fn panner_velocity(&self, node: HeadlessNode) -> Option<Vector3<f32>> {
        self.panner(node).map(|panner| panner.velocity)
    }

    /// Attributes of a 3D panner.
    pub fn panner_attributes(&self, node: HeadlessNode) -> Option<PannerAttributes> {
        self.panner(node).map(|panner| panner.attributes)
    }

    /// Pose of the listener.
    pub fn listener(&self) -> HeadlessListener {
        self.listener
    }

    fn element(&self, element: HeadlessElement) -> Option<&ElementState> {
        self.elements.get(element.0 as usize)?.as_ref()
    }

    fn element_mut(&mut self, element: HeadlessElement) -> Option<&mut ElementState> {
        self.elements.get_mut(element.0 as usize)?.as_mut()
    }

    /// Number of elements that were created and not released.
    pub fn live_elements(&self) -> usize {
        self.elements.iter().flatten().count()
    }

    /// Elements that are playing right now.
    pub fn playing_elements(&self) -> Vec<HeadlessElement> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, state)| state.as_ref().is_some_and(|state| state.playing))
            .map(|(index, _)| HeadlessElement(index as u32))
            .collect()
    }

    /// Source an element points at.
    pub fn element_source(&self, element: HeadlessElement) -> Option<&str> {
        self.element(element)?.source.as_deref()
    }

    /// Preload hint an element was loaded with.
    pub fn element_preload(&self, element: HeadlessElement) -> Option<PreloadHint> {
        self.element(element)?.preload
    }

    /// Volume of an element.
    pub fn element_volume(&self, element: HeadlessElement) -> f32 {
        self.element(element).map(|state| state.volume).unwrap_or(0.0)
    }

    /// Rate of an element.
    pub fn element_rate(&self, element: HeadlessElement) -> f32 {
        self.element(element).map(|state| state.rate).unwrap_or(0.0)
    }

    /// Whether an element loops natively.
    pub fn element_looping(&self, element: HeadlessElement) -> bool {
        self.element(element).is_some_and(|state| state.looping)
    }
}

/// Reads the duration of encoded audio.
fn decoded_duration(bytes: Vec<u8>) -> Result<f64, PlatformError> {
    let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes)), MediaSourceStreamOptions::default());
    let probed = symphonia::default::get_probe()
        .format(&Hint::new(), stream, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|error| PlatformError::new(format!("unable to decode audio data: {error}")))?;

    let track = probed
        .format
        .default_track()
        .ok_or_else(|| PlatformError::new("audio data has no track"))?;
    let params = &track.codec_params;

    match (params.n_frames, params.sample_rate) {
        (Some(frames), Some(sample_rate)) if sample_rate > 0 => Ok(frames as f64 / sample_rate as f64),
        _ => Err(PlatformError::new("audio data has no known length")),
    }
}

/// Encodes `seconds` of silence as a 16 bit mono WAV file.
pub fn silent_wav(seconds: f64) -> Vec<u8> {
    let frames = (seconds.max(0.0) * WAV_SAMPLE_RATE as f64).round() as u32;
    let data_length = frames * 2;
    let mut bytes = Vec::with_capacity(44 + data_length as usize);

    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_length).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&WAV_SAMPLE_RATE.to_le_bytes());
    bytes.extend_from_slice(&(WAV_SAMPLE_RATE * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_length.to_le_bytes());
    bytes.resize(44 + data_length as usize, 0);

    bytes
}

impl Platform for HeadlessPlatform {
    type Buffer = HeadlessBuffer;
    type Element = HeadlessElement;
    type Node = HeadlessNode;
    type Probe = HeadlessProbe;

    fn environment(&self) -> Environment {
        self.environment
    }

    fn create_probe(&mut self) -> Option<HeadlessProbe> {
        self.audio.then(|| HeadlessProbe {
            rejected: self.rejected_mimes.clone(),
        })
    }

    fn now(&self) -> f64 {
        self.wall_time
    }

    fn create_context(&mut self) -> Result<ContextState, PlatformError> {
        if !self.audio || !self.graph {
            return Err(PlatformError::new("audio context is not available"));
        }

        self.nodes.clear();
        self.context = Some(self.initial_state);
        self.destination = Some(self.add_node(NodeKind::Destination));

        Ok(self.initial_state)
    }

    fn close_context(&mut self) {
        self.context = None;
        self.destination = None;
        self.nodes.clear();
        self.context_time = 0.0;
    }

    fn context_time(&self) -> f64 {
        self.context_time
    }

    fn suspend_context(&mut self) {
        if self.context.is_some() {
            self.context = Some(ContextState::Suspended);
            self.events
                .push_back(PlatformEvent::ContextStateChanged(ContextState::Suspended));
        }
    }

    fn resume_context(&mut self) {
        if self.context.is_some() {
            self.context = Some(ContextState::Running);
            self.events.push_back(PlatformEvent::ContextStateChanged(ContextState::Running));
        }
    }

    fn destination(&self) -> Option<HeadlessNode> {
        self.destination
    }

    fn create_gain(&mut self) -> Result<HeadlessNode, PlatformError> {
        match self.context {
            Some(_) => Ok(self.add_node(NodeKind::Gain(1.0))),
            None => Err(PlatformError::new("no audio context")),
        }
    }

    fn set_gain(&mut self, node: HeadlessNode, value: f32, _at: f64) {
        if let Some(NodeState {
            kind: NodeKind::Gain(gain), ..
        }) = self.node_mut(node)
        {
            *gain = value;
        }
    }

    fn connect(&mut self, from: HeadlessNode, to: HeadlessNode) {
        if let Some(state) = self.node_mut(from)
            && !state.outputs.contains(&to)
        {
            state.outputs.push(to);
        }
    }

    fn disconnect(&mut self, node: HeadlessNode) {
        if let Some(state) = self.node_mut(node) {
            state.outputs.clear();
        }
    }

    fn decode(&mut self, bytes: Vec<u8>) -> RequestId {
        let request = RequestId(self.next_request);
        self.next_request += 1;

        let result = decoded_duration(bytes).map(|duration| HeadlessBuffer { duration, silent: false });
        self.events.push_back(PlatformEvent::Decoded { request, result });

        request
    }

    fn create_silent_buffer(&mut self) -> Result<HeadlessBuffer, PlatformError> {
        Ok(HeadlessBuffer {
            duration: SILENT_BUFFER_DURATION,
            silent: true,
        })
    }

    fn buffer_duration(&self, buffer: &HeadlessBuffer) -> f64 {
        buffer.duration
    }

    fn create_source(&mut self, buffer: &HeadlessBuffer) -> Result<HeadlessNode, PlatformError> {
        if self.context.is_none() {
            return Err(PlatformError::new("no audio context"));
        }

        Ok(self.add_node(NodeKind::Source(SourceState {
            silent: buffer.silent,
            rate: 1.0,
            loop_region: None,
            offset: 0.0,
            length: buffer.duration,
            played: 0.0,
            started: false,
            running: false,
        })))
    }

    fn set_source_rate(&mut self, node: HeadlessNode, rate: f32, _at: f64) {
        if let Some(source) = self.source_mut(node) {
            source.rate = rate;
        }
    }

    fn set_source_loop(&mut self, node: HeadlessNode, region: Option<(f64, f64)>) {
        if let Some(source) = self.source_mut(node) {
            source.loop_region = region;
        }
    }

    fn start_source(&mut self, node: HeadlessNode, _when: f64, offset: f64, duration: f64) -> Result<(), PlatformError> {
        let source = self.source_mut(node).ok_or_else(|| PlatformError::new("not a source node"))?;

        if source.started {
            return Err(PlatformError::new("source can only be started once"));
        }

        source.started = true;
        source.running = true;
        source.offset = offset;
        source.length = duration;

        Ok(())
    }

    fn stop_source(&mut self, node: HeadlessNode) {
        if let Some(source) = self.source_mut(node) {
            source.running = false;
        }
    }

    fn create_element(&mut self) -> Result<HeadlessElement, PlatformError> {
        if !self.audio {
            return Err(PlatformError::new("media elements are not available"));
        }

        self.elements.push(Some(ElementState {
            source: None,
            preload: None,
            duration: None,
            position: 0.0,
            volume: 1.0,
            rate: 1.0,
            looping: false,
            playing: false,
        }));

        Ok(HeadlessElement(self.elements.len() as u32 - 1))
    }

    fn load_element(&mut self, element: HeadlessElement, source: &str, options: &ElementOptions) {
        let duration = self.media.get(source).copied();

        let Some(state) = self.element_mut(element) else {
            return;
        };

        state.source = Some(source.to_owned());
        state.preload = Some(options.preload);
        state.duration = duration;
        state.position = 0.0;
        state.playing = false;

        let events = match (duration, options.preload) {
            (None, _) => vec![ElementEvent::Error(String::from("MEDIA_ERR_SRC_NOT_SUPPORTED"))],
            (Some(_), PreloadHint::Auto) => vec![ElementEvent::LoadedMetadata, ElementEvent::CanPlayThrough],
            (Some(_), _) => vec![ElementEvent::LoadedMetadata, ElementEvent::Suspend],
        };

        for event in events {
            self.events.push_back(PlatformEvent::Element { element, event });
        }
    }

    fn element_duration(&self, element: HeadlessElement) -> Option<f64> {
        self.element(element)?.duration
    }

    fn element_position(&self, element: HeadlessElement) -> f64 {
        self.element(element).map(|state| state.position).unwrap_or(0.0)
    }

    fn set_element_position(&mut self, element: HeadlessElement, position: f64) {
        if let Some(state) = self.element_mut(element) {
            state.position = position.max(0.0);
        }
    }

    fn set_element_volume(&mut self, element: HeadlessElement, volume: f32) {
        if let Some(state) = self.element_mut(element) {
            state.volume = volume;
        }
    }

    fn set_element_rate(&mut self, element: HeadlessElement, rate: f32) {
        if let Some(state) = self.element_mut(element) {
            state.rate = rate;
        }
    }

    fn set_element_loop(&mut self, element: HeadlessElement, looping: bool) {
        if let Some(state) = self.element_mut(element) {
            state.looping = looping;
        }
    }

    fn play_element(&mut self, element: HeadlessElement) -> Result<(), PlatformError> {
        if self.reject_playback {
            return Err(PlatformError::new("NotAllowedError"));
        }

        let late = self.reject_playback_late;
        let state = self.element_mut(element).ok_or_else(|| PlatformError::new("element was released"))?;

        if !late {
            state.playing = true;
            return Ok(());
        }

        self.events.push_back(PlatformEvent::Element {
            element,
            event: ElementEvent::PlayRejected(String::from("NotAllowedError")),
        });

        Ok(())
    }

    fn pause_element(&mut self, element: HeadlessElement) {
        if let Some(state) = self.element_mut(element) {
            state.playing = false;
        }
    }

    fn release_element(&mut self, element: HeadlessElement) {
        if let Some(slot) = self.elements.get_mut(element.0 as usize) {
            *slot = None;
        }
    }

    fn spatial(&mut self) -> Option<&mut dyn SpatialPlatform<Node = HeadlessNode>> {
        match self.spatial && self.context.is_some() {
            true => Some(self as &mut dyn SpatialPlatform<Node = HeadlessNode>),
            false => None,
        }
    }

    fn poll_event(&mut self) -> Option<EventOf<Self>> {
        self.events.pop_front()
    }
}

impl SpatialPlatform for HeadlessPlatform {
    type Node = HeadlessNode;

    fn create_stereo_panner(&mut self) -> Option<HeadlessNode> {
        self.stereo_panner.then(|| self.add_node(NodeKind::StereoPanner(0.0)))
    }

    fn set_pan(&mut self, node: HeadlessNode, pan: f32, _at: f64) {
        if let Some(NodeState {
            kind: NodeKind::StereoPanner(value),
            ..
        }) = self.node_mut(node)
        {
            *value = pan;
        }
    }

    fn create_panner(&mut self) -> Result<HeadlessNode, PlatformError> {
        Ok(self.add_node(NodeKind::Panner(PannerState {
            position: Vector3::zero(),
            orientation: Vector3::new(1.0, 0.0, 0.0),
            velocity: Vector3::zero(),
            attributes: PannerAttributes::default(),
        })))
    }

    fn set_panner_position(&mut self, node: HeadlessNode, position: Vector3<f32>, _at: f64) {
        if let Some(panner) = self.panner_mut(node) {
            panner.position = position;
        }
    }

    fn set_panner_orientation(&mut self, node: HeadlessNode, orientation: Vector3<f32>, _at: f64) {
        if let Some(panner) = self.panner_mut(node) {
            panner.orientation = orientation;
        }
    }

    fn set_panner_velocity(&mut self, node: HeadlessNode, velocity: Vector3<f32>) {
        if let Some(panner) = self.panner_mut(node) {
            panner.velocity = velocity;
        }
    }

    fn set_panner_attributes(&mut self, node: HeadlessNode, attributes: &PannerAttributes) {
        if let Some(panner) = self.panner_mut(node) {
            panner.attributes = *attributes;
        }
    }

    fn set_listener_position(&mut self, position: Vector3<f32>, _at: f64) {
        self.listener.position = position;
    }

    fn set_listener_orientation(&mut self, forward: Vector3<f32>, up: Vector3<f32>, _at: f64) {
        self.listener.forward = forward;
        self.listener.up = up;
    }

    fn set_listener_velocity(&mut self, velocity: Vector3<f32>) {
        self.listener.velocity = velocity;
    }

    fn set_listener_attributes(&mut self, attributes: &ListenerAttributes) {
        self.listener.attributes = *attributes;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::platform::headless::{HeadlessPlatform, silent_wav};
    use crate::platform::{
        CanPlay, ContextState, CrossOrigin, ElementEvent, ElementOptions, MediaProbe, Platform, PlatformEvent,
    };
    use crate::settings::PreloadHint;

    fn options(preload: PreloadHint) -> ElementOptions {
        ElementOptions {
            preload,
            cross_origin: CrossOrigin::Anonymous,
            autoplay: false,
        }
    }

    #[test]
    fn test_probe_rejects_prefixes() {
        let mut platform = HeadlessPlatform::new().reject_mime("audio/mpeg").reject_mime("audio/mp3");
        let probe = platform.create_probe().unwrap();

        assert_eq!(probe.can_play_type("audio/mpeg;"), CanPlay::No);
        assert_eq!(probe.can_play_type("audio/wav"), CanPlay::Probably);
    }

    #[test]
    fn test_without_audio_has_no_probe() {
        assert!(HeadlessPlatform::new().without_audio().create_probe().is_none());
    }

    #[test]
    fn test_decode_reads_wav_length() {
        let mut platform = HeadlessPlatform::new();
        let request = platform.decode(silent_wav(1.5));

        match platform.poll_event() {
            Some(PlatformEvent::Decoded { request: decoded, result }) => {
                assert_eq!(decoded, request);
                assert_relative_eq!(platform.buffer_duration(&result.unwrap()), 1.5);
            }
            _ => panic!("expected a decode result"),
        }
    }

    #[test]
    fn test_decode_garbage_fails() {
        let mut platform = HeadlessPlatform::new();
        platform.decode(vec![1, 2, 3, 4]);

        assert!(matches!(platform.poll_event(), Some(PlatformEvent::Decoded { result: Err(_), .. })));
    }

    #[test]
    fn test_source_ends_with_context_clock() {
        let mut platform = HeadlessPlatform::new();
        platform.create_context().unwrap();
        let buffer = platform.create_buffer(1.0);
        let source = platform.create_source(&buffer).unwrap();
        platform.start_source(source, 0.0, 0.0, 1.0).unwrap();

        platform.advance(0.5);
        assert!(platform.poll_event().is_none());

        platform.advance(0.5);
        assert!(matches!(platform.poll_event(), Some(PlatformEvent::SourceEnded(node)) if node == source));
        assert!(platform.running_sources().is_empty());
    }

    #[test]
    fn test_suspended_context_clock_stands_still() {
        let mut platform = HeadlessPlatform::new().starting_suspended();

        assert_eq!(platform.create_context().unwrap(), ContextState::Suspended);

        platform.advance(2.0);
        assert_relative_eq!(platform.context_time(), 0.0);
        assert_relative_eq!(platform.now(), 2.0);

        platform.resume_context();
        platform.advance(1.0);
        assert_relative_eq!(platform.context_time(), 1.0);
    }

    #[test]
    fn test_unknown_media_fails_to_load() {
        let mut platform = HeadlessPlatform::new();
        let element = platform.create_element().unwrap();
        platform.load_element(element, "missing.mp3", &options(PreloadHint::Auto));

        assert!(matches!(
            platform.poll_event(),
            Some(PlatformEvent::Element {
                event: ElementEvent::Error(_),
                ..
            })
        ));
    }

    #[test]
    fn test_element_ends() {
        let mut platform = HeadlessPlatform::new().with_media("a.mp3", 1.0);
        let element = platform.create_element().unwrap();
        platform.load_element(element, "a.mp3", &options(PreloadHint::Auto));
        while platform.poll_event().is_some() {}

        platform.play_element(element).unwrap();
        platform.advance(1.25);

        assert_relative_eq!(platform.element_position(element), 1.0);
        assert!(platform.playing_elements().is_empty());
        assert!(matches!(
            platform.poll_event(),
            Some(PlatformEvent::Element {
                event: ElementEvent::Ended,
                ..
            })
        ));
    }

    #[test]
    fn test_late_rejection() {
        let mut platform = HeadlessPlatform::new().with_media("a.mp3", 1.0);
        let element = platform.create_element().unwrap();
        platform.reject_playback_late(true);

        assert!(platform.play_element(element).is_ok());
        assert!(matches!(
            platform.poll_event(),
            Some(PlatformEvent::Element {
                event: ElementEvent::PlayRejected(_),
                ..
            })
        ));
    }
}
