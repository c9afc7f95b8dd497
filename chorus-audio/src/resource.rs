//! A playable audio resource and the voices it owns.

mod load;
mod spatial;
mod transport;

#[cfg(feature = "debug")]
use chorus_debug::logging::{Colorize, print_debug};
use hashbrown::HashMap;

use crate::ResourceKey;
use crate::backend::{ElementVoice, GraphVoice, VoiceBackend};
use crate::command::QueuedAction;
use crate::context::EngineContext;
use crate::error::LoadError;
use crate::event::{Callback, Event, EventKind, ListenerId, Listeners};
use crate::platform::{CrossOrigin, ElementOptions, Platform};
use crate::settings::{Preload, PreloadHint, ResourceSettings, Sprite, clamp_rate, clamp_volume};
use crate::spatial::SpatialState;
use crate::voice::{Voice, VoiceId, VoiceState};

pub(crate) use self::transport::AutoPause;

/// Name of the sprite covering the whole source. Added once loading finished.
pub const DEFAULT_SPRITE: &str = "__default";

/// Load state of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing loaded, either never or after an unload.
    Unloaded,
    /// Loading started. A failed load stays in this state.
    Loading,
    /// Ready to play.
    Loaded,
}

/// What [`ResourceHandle::play`] should play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayTarget {
    /// The whole source on an idle or new voice.
    Default,
    /// A named sprite on an idle or new voice.
    Sprite(String),
    /// Resume or restart an existing voice.
    Voice(VoiceId),
}

impl From<VoiceId> for PlayTarget {
    fn from(voice: VoiceId) -> Self {
        PlayTarget::Voice(voice)
    }
}

impl From<&str> for PlayTarget {
    fn from(sprite: &str) -> Self {
        PlayTarget::Sprite(sprite.to_owned())
    }
}

impl From<String> for PlayTarget {
    fn from(sprite: String) -> Self {
        PlayTarget::Sprite(sprite)
    }
}

/// Settings of a new resource together with its initial listeners.
pub struct ResourceBuilder {
    pub(crate) settings: ResourceSettings,
    pub(crate) listeners: Vec<(EventKind, Callback)>,
}

impl ResourceBuilder {
    /// Creates a builder without listeners.
    pub fn new(settings: ResourceSettings) -> Self {
        Self {
            settings,
            listeners: Vec::new(),
        }
    }

    /// Registers a listener before the resource starts loading, so it can't
    /// miss the first events.
    pub fn on(mut self, kind: EventKind, callback: impl FnMut(&Event) + 'static) -> Self {
        self.listeners.push((kind, Box::new(callback)));
        self
    }
}

impl From<ResourceSettings> for ResourceBuilder {
    fn from(settings: ResourceSettings) -> Self {
        Self::new(settings)
    }
}

/// Which backend plays the voices of a resource. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BackendKind {
    Graph,
    Element,
}

pub(crate) struct Resource<P: Platform> {
    pub settings: ResourceSettings,
    pub kind: BackendKind,
    pub state: LoadState,
    pub failure: Option<LoadError>,
    /// Bumped on unload, so results of earlier loads are ignored.
    pub generation: u32,
    pub source: Option<String>,
    pub buffer: Option<P::Buffer>,
    pub loading_element: Option<P::Element>,
    pub duration: f64,
    pub sprites: HashMap<String, Sprite>,
    pub volume: f32,
    pub rate: f32,
    pub looping: bool,
    pub muted: bool,
    pub pool: usize,
    pub voices: Vec<Voice<P>>,
    pub queue: Vec<QueuedAction>,
    pub listeners: Listeners,
    pub spatial: SpatialState,
}

impl<P: Platform> Resource<P> {
    pub fn new(settings: ResourceSettings, context: &EngineContext<P>) -> Self {
        let kind = match context.using_graph && !settings.html5 {
            true => BackendKind::Graph,
            false => BackendKind::Element,
        };

        let mut spatial = SpatialState::default();
        spatial.stereo = settings.stereo;
        spatial.position = settings.position;
        if let Some(orientation) = settings.orientation {
            spatial.orientation = orientation;
        }
        spatial.attributes.merge(&settings.panner_attributes);

        Self {
            kind,
            state: LoadState::Unloaded,
            failure: None,
            generation: 0,
            source: None,
            buffer: None,
            loading_element: None,
            duration: 0.0,
            sprites: settings.sprite.clone(),
            volume: clamp_volume(settings.volume),
            rate: clamp_rate(settings.rate),
            looping: settings.looping,
            muted: settings.mute,
            pool: settings.pool,
            voices: Vec::new(),
            queue: Vec::new(),
            listeners: Listeners::default(),
            spatial,
            settings,
        }
    }

    pub fn voice_index(&self, id: VoiceId) -> Option<usize> {
        self.voices.iter().position(|voice| voice.id == id)
    }

    /// Whether any voice of this resource plays through the graph right now.
    pub fn is_playing_graph(&self) -> bool {
        self.kind == BackendKind::Graph && self.voices.iter().any(|voice| !voice.paused)
    }

    fn element_options(&self) -> ElementOptions {
        let preload = match self.settings.preload {
            Preload::Hint(hint) => hint,
            Preload::Off => PreloadHint::Auto,
        };

        ElementOptions {
            preload,
            cross_origin: CrossOrigin::Anonymous,
            autoplay: false,
        }
    }
}

/// Mutable access to one resource. Borrowed from the
/// [`AudioEngine`](crate::AudioEngine) with
/// [`resource`](crate::AudioEngine::resource).
pub struct ResourceHandle<'a, P: Platform> {
    pub(crate) key: ResourceKey,
    pub(crate) resource: &'a mut Resource<P>,
    pub(crate) context: &'a mut EngineContext<P>,
}

impl<P: Platform> ResourceHandle<'_, P> {
    /// The key of the resource.
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    /// The load state of the resource.
    pub fn state(&self) -> LoadState {
        self.resource.state
    }

    /// The transport state of a voice.
    pub fn voice_state(&self, voice: VoiceId) -> Option<VoiceState> {
        let index = self.resource.voice_index(voice)?;
        Some(self.resource.voices[index].state())
    }

    /// Ids of every voice, in creation order.
    pub fn voices(&self) -> Vec<VoiceId> {
        self.resource.voices.iter().map(|voice| voice.id).collect()
    }

    /// Why the last load failed, if it did.
    pub fn load_error(&self) -> Option<&LoadError> {
        self.resource.failure.as_ref()
    }

    /// The source that was picked from the candidates.
    pub fn source(&self) -> Option<&str> {
        self.resource.source.as_deref()
    }

    /// Registers a listener for every voice.
    pub fn on(&mut self, kind: EventKind, callback: impl FnMut(&Event) + 'static) -> ListenerId {
        self.resource.listeners.add(kind, None, false, Box::new(callback))
    }

    /// Registers a listener that only fires for one voice.
    pub fn on_voice(&mut self, kind: EventKind, voice: VoiceId, callback: impl FnMut(&Event) + 'static) -> ListenerId {
        self.resource.listeners.add(kind, Some(voice), false, Box::new(callback))
    }

    /// Registers a listener that is removed after it fired once.
    pub fn once(&mut self, kind: EventKind, voice: Option<VoiceId>, callback: impl FnMut(&Event) + 'static) -> ListenerId {
        self.resource.listeners.add(kind, voice, true, Box::new(callback))
    }

    /// Removes listeners. Without a kind every listener is removed, without a
    /// listener every listener of the kind is removed.
    pub fn off(&mut self, kind: Option<EventKind>, listener: Option<ListenerId>, voice: Option<VoiceId>) {
        self.resource.listeners.remove(kind, listener, voice);
    }

    /// Stops every voice, releases all platform handles and listeners and
    /// resets the resource to [`LoadState::Unloaded`]. Safe to call again.
    pub fn unload(&mut self) {
        #[cfg(feature = "debug")]
        print_debug!("unloading {}", self.resource.source.as_deref().unwrap_or("resource").magenta());

        for voice in self.resource.voices.drain(..) {
            if let Some(element) = voice.backend.release(&mut self.context.platform) {
                self.context.recycle_element(element);
            }
        }

        if let Some(element) = self.resource.loading_element.take() {
            self.context.recycle_element(element);
        }

        self.context.schedule.cancel_resource(self.key);
        self.resource.queue.clear();
        self.resource.listeners.clear();
        self.resource.buffer = None;
        self.resource.failure = None;
        self.resource.duration = 0.0;
        self.resource.sprites = self.resource.settings.sprite.clone();
        self.resource.generation = self.resource.generation.wrapping_add(1);
        self.resource.state = LoadState::Unloaded;

        if self.resource.kind == BackendKind::Element {
            let key = self.key;
            self.context.registry.retain(|registered| *registered != key);
        }

        self.context.activity = true;
    }

    pub(crate) fn emit(&mut self, event: Event) {
        self.context.emit(self.key, &mut self.resource.listeners, event);
    }

    /// Indices of the targeted voices: one voice, or all of them.
    pub(crate) fn targets(&self, voice: Option<VoiceId>) -> Vec<usize> {
        match voice {
            Some(id) => self.resource.voice_index(id).into_iter().collect(),
            None => (0..self.resource.voices.len()).collect(),
        }
    }

    /// Creates a voice with the resource defaults. Binds it right away if the
    /// resource is loaded.
    pub(crate) fn create_voice(&mut self) -> usize {
        let id = self.context.next_voice_id();
        let resource = &mut *self.resource;

        resource.voices.push(Voice::new(
            id,
            resource.volume,
            resource.rate,
            resource.muted,
            resource.looping,
            resource.spatial,
        ));

        let index = resource.voices.len() - 1;

        if resource.state == LoadState::Loaded {
            self.bind_voice(index);
        }

        index
    }

    /// Finds an idle voice or creates a new one. Graph resources don't grow
    /// beyond their pool.
    pub(crate) fn inactive_voice(&mut self) -> Option<usize> {
        if let Some(index) = self.resource.voices.iter().position(Voice::is_idle) {
            return Some(index);
        }

        match self.resource.kind {
            BackendKind::Graph if self.resource.voices.len() >= self.resource.pool.max(1) => {
                #[cfg(feature = "debug")]
                print_debug!("[{}] voice pool of {} is exhausted", "warning".yellow(), self.resource.pool.cyan());

                None
            }
            _ => Some(self.create_voice()),
        }
    }

    /// Connects an unbound voice to the backend of the resource.
    pub(crate) fn bind_voice(&mut self, index: usize) {
        let context = &mut *self.context;
        let resource = &mut *self.resource;
        let options = resource.element_options();
        let voice = &mut resource.voices[index];

        if !voice.backend.is_unbound() {
            return;
        }

        if voice.sprite.is_empty() {
            voice.sprite = DEFAULT_SPRITE.to_owned();
            voice.start = 0.0;
            voice.duration = resource.duration;
        }

        match resource.kind {
            BackendKind::Graph => {
                let Some(master_gain) = context.master_gain else {
                    return;
                };

                match GraphVoice::create(&mut context.platform, master_gain, voice.graph_gain()) {
                    Ok(mut graph) => {
                        crate::spatial::restore(&mut context.platform, &mut graph, &voice.spatial);
                        voice.backend = VoiceBackend::Graph(graph);
                    }
                    Err(_error) => {
                        #[cfg(feature = "debug")]
                        print_debug!("[{}] failed to create voice {}: {}", "error".red(), voice.id, _error);
                    }
                }
            }
            BackendKind::Element => {
                let element = match resource.loading_element.take() {
                    Some(element) => element,
                    None => {
                        let element = match context.obtain_element() {
                            Ok(element) => element,
                            Err(_error) => {
                                #[cfg(feature = "debug")]
                                print_debug!("[{}] failed to create element for voice {}: {}", "error".red(), voice.id, _error);

                                return;
                            }
                        };

                        if let Some(source) = resource.source.as_deref() {
                            context.platform.load_element(element, source, &options);
                        }

                        element
                    }
                };

                context
                    .platform
                    .set_element_volume(element, voice.element_volume(context.volume, context.muted));
                voice.backend = VoiceBackend::Element(ElementVoice::new(element));
            }
        }
    }

    /// Pushes the output volume of a voice to its backend.
    pub(crate) fn apply_output(&mut self, index: usize) {
        let context = &mut *self.context;
        let voice = &mut self.resource.voices[index];

        let volume = match self.resource.kind {
            BackendKind::Graph => voice.graph_gain(),
            BackendKind::Element => voice.element_volume(context.volume, context.muted),
        };

        voice.backend.set_volume(&mut context.platform, volume);
    }

    /// Advances running fades.
    pub(crate) fn step_fades(&mut self, now: f64) {
        for index in 0..self.resource.voices.len() {
            let Some(fade) = self.resource.voices[index].fade else {
                continue;
            };

            let (volume, done) = fade.sample(now);
            self.resource.voices[index].volume = volume;
            self.apply_output(index);

            if done {
                let voice = &mut self.resource.voices[index];
                voice.fade = None;
                let id = voice.id;

                self.emit(Event::new(EventKind::Fade, Some(id)));
            }
        }
    }

    /// Called with the master volume or mute changed. Graph voices follow the
    /// master gain node on their own.
    pub(crate) fn master_output_changed(&mut self) {
        if self.resource.kind == BackendKind::Element {
            for index in 0..self.resource.voices.len() {
                self.apply_output(index);
            }
        }
    }

    /// Effective output volume of a voice, including the master volume.
    pub fn effective_volume(&self, voice: VoiceId) -> Option<f32> {
        let index = self.resource.voice_index(voice)?;
        let voice = &self.resource.voices[index];

        Some(voice.element_volume(self.context.volume, self.context.muted))
    }
}
