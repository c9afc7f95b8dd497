//! This crate exposes an audio engine that plays resources through either an
//! audio graph or pooled media elements, behind one transport API.
//!
//! The engine owns every resource. Callers keep a [`ResourceKey`] and borrow a
//! [`ResourceHandle`] for transport calls. Nothing happens in the background:
//! the host calls [`AudioEngine::update`] regularly, which resolves loads,
//! timers and platform notifications, and finally delivers listener events.
#![warn(missing_docs)]

mod backend;
mod command;
mod context;
mod error;
mod event;
pub mod platform;
mod probe;
mod resource;
mod schedule;
mod settings;
mod spatial;
mod voice;

use std::sync::Arc;

use cgmath::Vector3;
use chorus_container::{GenerationalSlab, create_generational_key};
#[cfg(feature = "debug")]
use chorus_debug::logging::{Colorize, print_debug};
use chorus_loaders::SourceLoader;

pub use self::context::AudioState;
use self::context::{EngineContext, FetchMessage, UnlockState};
pub use self::error::{LoadError, PlatformError, PlayError};
pub use self::event::{Callback, Event, EventKind, EventPayload, ListenerId};
use self::event::{Delivery, Recipient};
use self::platform::{ElementEvent, Platform, PlatformEvent};
pub use self::probe::CodecTable;
use self::resource::{AutoPause, Resource};
pub use self::resource::{DEFAULT_SPRITE, LoadState, PlayTarget, ResourceBuilder, ResourceHandle};
pub use self::settings::{EngineSettings, Preload, PreloadHint, ResourceSettings, Sprite};
pub use self::spatial::{
    DistanceModel, ListenerAttributes, ListenerAttributesUpdate, PannerAttributes, PannerAttributesUpdate, PanningModel,
};
use self::voice::Voice;
pub use self::voice::{VoiceId, VoiceState};

create_generational_key!(ResourceKey, "The key of a resource owned by the audio engine");

/// The audio engine. Owns the audio context, the master volume and every
/// resource, and fans global operations out to all of them.
pub struct AudioEngine<P: Platform> {
    context: EngineContext<P>,
    resources: GenerationalSlab<ResourceKey, Resource<P>>,
}

impl<P: Platform> AudioEngine<P> {
    /// Creates a new audio engine. Probes the platform for codecs and sets up
    /// the audio context right away.
    pub fn new(platform: P, loader: Arc<dyn SourceLoader>, settings: EngineSettings) -> Self {
        Self {
            context: EngineContext::new(platform, loader, settings),
            resources: GenerationalSlab::default(),
        }
    }

    /// Closes the audio context after unloading every resource and hands the
    /// platform back.
    pub fn teardown(mut self) -> P {
        for key in self.context.registry.clone().into_iter().rev() {
            if let Some(mut handle) = self.handle(key) {
                handle.unload();
            }
        }

        self.context.close_context();
        self.context.platform
    }

    /// Creates a new resource. Starts loading right away unless preloading is
    /// turned off.
    pub fn create(&mut self, builder: impl Into<ResourceBuilder>) -> Option<ResourceKey> {
        let ResourceBuilder { settings, listeners } = builder.into();
        let mut resource = Resource::new(settings, &self.context);

        for (kind, callback) in listeners {
            resource.listeners.add(kind, None, false, callback);
        }

        let key = self.resources.insert(resource)?;
        self.context.registry.push(key);
        self.context.activity = true;

        self.handle(key)?.initialize();

        Some(key)
    }

    /// Borrows a resource for transport calls.
    pub fn resource(&mut self, key: ResourceKey) -> Option<ResourceHandle<'_, P>> {
        self.handle(key)
    }

    /// Unloads a resource and drops it. The key becomes invalid.
    pub fn release(&mut self, key: ResourceKey) {
        if let Some(mut handle) = self.handle(key) {
            handle.unload();
        }

        self.context.registry.retain(|registered| *registered != key);
        self.resources.remove(key);
    }

    /// Keys of every registered resource, in creation order. Unloaded element
    /// resources are not registered.
    pub fn resources(&self) -> &[ResourceKey] {
        &self.context.registry
    }

    fn handle(&mut self, key: ResourceKey) -> Option<ResourceHandle<'_, P>> {
        let resource = self.resources.get_mut(key)?;

        Some(ResourceHandle {
            key,
            resource,
            context: &mut self.context,
        })
    }

    fn for_each_resource(&mut self, mut action: impl FnMut(&mut ResourceHandle<'_, P>)) {
        for key in self.context.registry.clone() {
            if let Some(mut handle) = self.handle(key) {
                action(&mut handle);
            }
        }
    }

    fn broadcast(&mut self, event: Event) {
        for key in self.context.registry.clone() {
            if let Some(resource) = self.resources.get_mut(key) {
                self.context.emit(key, &mut resource.listeners, event.clone());
            }
        }
    }

    /// Master volume in `[0, 1]`.
    pub fn volume(&self) -> f32 {
        self.context.volume
    }

    /// Sets the master volume. Clamped to `[0, 1]`.
    pub fn set_volume(&mut self, volume: f32) {
        self.context.volume = settings::clamp_volume(volume);
        self.context.apply_master_output();
        self.for_each_resource(|handle| handle.master_output_changed());
    }

    /// Whether all audio is muted.
    pub fn muted(&self) -> bool {
        self.context.muted
    }

    /// Mutes or unmutes all audio. Doesn't touch the volumes of resources or
    /// voices.
    pub fn set_mute(&mut self, muted: bool) {
        self.context.muted = muted;
        self.context.apply_master_output();
        self.for_each_resource(|handle| handle.master_output_changed());
    }

    /// Stops every voice of every resource.
    pub fn stop(&mut self) {
        self.for_each_resource(|handle| handle.stop(None));
    }

    /// Unloads every resource and recreates the audio context.
    pub fn unload(&mut self) {
        for key in self.context.registry.clone().into_iter().rev() {
            if let Some(mut handle) = self.handle(key) {
                handle.unload();
            }
        }

        self.context.close_context();
        self.context.setup_context();
    }

    /// Whether the given extension or MIME subtype can be played.
    pub fn codec_supported(&self, extension: &str) -> bool {
        self.context.codecs.supports(extension)
    }

    /// The state of the audio context.
    pub fn state(&self) -> AudioState {
        self.context.state
    }

    /// Whether the host can play audio at all.
    pub fn audio_available(&self) -> bool {
        !self.context.no_audio
    }

    /// Whether resources play through the audio graph.
    pub fn uses_graph(&self) -> bool {
        self.context.using_graph
    }

    /// The platform the engine runs on.
    pub fn platform(&self) -> &P {
        &self.context.platform
    }

    /// Mutable access to the platform the engine runs on.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.context.platform
    }

    /// Has to be called from the handler of the first user interaction (touch,
    /// click or key press) on hosts that keep audio locked until then. Does
    /// nothing on other hosts or once audio is unlocked.
    pub fn user_gesture(&mut self) {
        if self.context.unlock != UnlockState::Armed {
            return;
        }

        #[cfg(feature = "debug")]
        print_debug!("[{}] unlocking audio", "unlock".green());

        self.context.unlock = UnlockState::Unlocked;
        self.context.fill_element_pool();

        if self.context.using_graph {
            if let Err(_error) = self.play_silence() {
                #[cfg(feature = "debug")]
                print_debug!("[{}] failed to play unlock buffer: {}", "error".red(), _error);
            }

            // Unlocking wins over an idle suspend that is armed or running.
            self.context.auto_resume();
        }

        self.broadcast(Event::new(EventKind::Unlock, None));
    }

    fn play_silence(&mut self) -> Result<(), PlatformError> {
        let platform = &mut self.context.platform;
        let destination = platform
            .destination()
            .ok_or_else(|| PlatformError::new("context has no destination"))?;
        let buffer = platform.create_silent_buffer()?;
        let source = platform.create_source(&buffer)?;
        let now = platform.context_time();
        let duration = platform.buffer_duration(&buffer);

        platform.connect(source, destination);
        platform.start_source(source, now, 0.0, duration)
    }

    /// Has to be called when the page becomes hidden or visible. Voices paused
    /// because the page was hidden resume once it is visible again.
    pub fn set_page_hidden(&mut self, hidden: bool) {
        match hidden {
            true => self.for_each_resource(|handle| handle.auto_pause(AutoPause::Visibility)),
            false => self.for_each_resource(|handle| handle.auto_unpause(AutoPause::Visibility)),
        }
    }

    /// Has to be called when the page is hidden for navigation.
    pub fn page_hide(&mut self) {
        self.for_each_resource(|handle| handle.auto_pause(AutoPause::PageHide));
    }

    /// Has to be called when the page is shown again after
    /// [`page_hide`](Self::page_hide).
    pub fn page_show(&mut self) {
        self.for_each_resource(|handle| handle.auto_unpause(AutoPause::PageHide));
    }

    /// Stereo pan of the listener set with [`set_stereo`](Self::set_stereo).
    pub fn stereo(&self) -> Option<f32> {
        self.context.listener.stereo
    }

    /// Pans every resource and all of their voices.
    pub fn set_stereo(&mut self, pan: f32) {
        if !self.spatial_available() {
            return;
        }

        let pan = pan.clamp(-1.0, 1.0);
        self.context.listener.stereo = Some(pan);
        self.for_each_resource(|handle| handle.set_stereo(pan, None));
    }

    /// Position of the listener.
    pub fn listener_position(&self) -> Vector3<f32> {
        self.context.listener.position
    }

    /// Moves the listener.
    pub fn set_listener_position(&mut self, position: Vector3<f32>) {
        let at = self.context.context_time();

        if let Some(spatial) = self.listener_spatial() {
            spatial.set_listener_position(position, at);
            self.context.listener.position = position;
        }
    }

    /// Forward and up vectors of the listener.
    pub fn listener_orientation(&self) -> (Vector3<f32>, Vector3<f32>) {
        (self.context.listener.forward, self.context.listener.up)
    }

    /// Turns the listener.
    pub fn set_listener_orientation(&mut self, forward: Vector3<f32>, up: Vector3<f32>) {
        let at = self.context.context_time();

        if let Some(spatial) = self.listener_spatial() {
            spatial.set_listener_orientation(forward, up, at);
            self.context.listener.forward = forward;
            self.context.listener.up = up;
        }
    }

    /// Velocity of the listener.
    pub fn listener_velocity(&self) -> Vector3<f32> {
        self.context.listener.velocity
    }

    /// Sets the velocity of the listener, used for the doppler effect.
    pub fn set_listener_velocity(&mut self, velocity: Vector3<f32>) {
        if let Some(spatial) = self.listener_spatial() {
            spatial.set_listener_velocity(velocity);
            self.context.listener.velocity = velocity;
        }
    }

    /// Doppler factor and speed of sound of the listener.
    pub fn listener_attributes(&self) -> ListenerAttributes {
        self.context.listener.attributes
    }

    /// Merges the given fields into the listener attributes.
    pub fn set_listener_attributes(&mut self, update: ListenerAttributesUpdate) {
        let mut attributes = self.context.listener.attributes;
        attributes.merge(&update);

        if let Some(spatial) = self.listener_spatial() {
            spatial.set_listener_attributes(&attributes);
            self.context.listener.attributes = attributes;
        }
    }

    fn spatial_available(&mut self) -> bool {
        self.listener_spatial().is_some()
    }

    fn listener_spatial(&mut self) -> Option<&mut dyn platform::SpatialPlatform<Node = P::Node>> {
        match self.context.using_graph {
            true => self.context.platform.spatial(),
            false => None,
        }
    }

    /// Resolves everything that happened since the last update and delivers
    /// the events emitted so far. Has to be called regularly, for example
    /// once per frame.
    pub fn update(&mut self) {
        self.resolve_fetches();
        self.resolve_platform_events();
        self.resolve_timers();
        self.step_fades();
        self.resolve_idle();
        self.deliver_events();
    }

    fn resolve_fetches(&mut self) {
        while let Ok(message) = self.context.fetch_receiver.try_recv() {
            match message {
                FetchMessage::Progress { key, generation, progress } => {
                    if let Some(mut handle) = self.handle(key) {
                        handle.fetch_progressed(generation, progress);
                    }
                }
                FetchMessage::Done { key, generation, result } => {
                    if let Some(mut handle) = self.handle(key) {
                        handle.fetch_finished(generation, result);
                    }
                }
            }
        }
    }

    fn resolve_platform_events(&mut self) {
        while let Some(event) = self.context.platform.poll_event() {
            match event {
                PlatformEvent::Decoded { request, result } => {
                    let Some((key, generation)) = self.context.pending_decodes.remove(&request) else {
                        continue;
                    };

                    if let Some(mut handle) = self.handle(key) {
                        handle.decode_finished(generation, result);
                    }
                }
                PlatformEvent::ContextStateChanged(state) => {
                    if self.context.context_state_changed(state) {
                        let time = self.context.context_time();
                        self.broadcast(Event::with_payload(EventKind::Resume, None, EventPayload::Time(time)));
                    }
                }
                PlatformEvent::SourceEnded(node) => {
                    if let Some((key, index)) = self.find_voice(|voice| voice.backend.source() == Some(node))
                        && let Some(mut handle) = self.handle(key)
                    {
                        handle.backend_ended(index);
                    }
                }
                PlatformEvent::Element { element, event } => self.resolve_element_event(element, event),
            }
        }
    }

    fn resolve_element_event(&mut self, element: P::Element, event: ElementEvent) {
        let loading = self.context.registry.iter().copied().find(|key| {
            self.resources
                .get(*key)
                .is_some_and(|resource| resource.loading_element == Some(element))
        });

        if let Some(key) = loading {
            if let Some(mut handle) = self.handle(key) {
                handle.loading_element_event(element, event);
            }
            return;
        }

        let Some((key, index)) = self.find_voice(|voice| voice.backend.element() == Some(element)) else {
            return;
        };

        let Some(mut handle) = self.handle(key) else {
            return;
        };

        match event {
            ElementEvent::Ended => handle.backend_ended(index),
            ElementEvent::PlayRejected(message) => handle.play_rejected(index, message),
            ElementEvent::CanPlayThrough | ElementEvent::LoadedMetadata | ElementEvent::Suspend | ElementEvent::Error(_) => {}
        }
    }

    /// Finds the resource and index of the first voice matching `predicate`.
    fn find_voice(&self, predicate: impl Fn(&Voice<P>) -> bool) -> Option<(ResourceKey, usize)> {
        self.context.registry.iter().find_map(|key| {
            let resource = self.resources.get(*key)?;
            let index = resource.voices.iter().position(&predicate)?;
            Some((*key, index))
        })
    }

    fn resolve_timers(&mut self) {
        let context_time = self.context.context_time();
        let wall_time = self.context.platform.now();

        for (key, voice) in self.context.schedule.take_due(context_time, wall_time) {
            if let Some(mut handle) = self.handle(key) {
                handle.end_timer_fired(voice);
            }
        }

        self.context.check_suspend_timer();
    }

    fn step_fades(&mut self) {
        let now = self.context.platform.now();
        self.for_each_resource(|handle| handle.step_fades(now));
    }

    fn resolve_idle(&mut self) {
        if !std::mem::take(&mut self.context.activity) {
            return;
        }

        let any_playing = self
            .context
            .registry
            .iter()
            .filter_map(|key| self.resources.get(*key))
            .any(Resource::is_playing_graph);

        self.context.schedule_suspend(any_playing);
    }

    fn deliver_events(&mut self) {
        // Listeners can't reach the engine, so nothing is emitted while delivering.
        while let Some(Delivery { resource, recipient, event }) = self.context.deliveries.pop_front() {
            match recipient {
                Recipient::Owned(mut callback) => callback(&event),
                Recipient::Registered(id) => {
                    if let Some(resource) = self.resources.get_mut(resource) {
                        resource.listeners.call(event.kind, id, &event);
                    }
                }
            }
        }
    }
}
