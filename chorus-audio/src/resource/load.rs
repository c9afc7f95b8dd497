use std::mem;

use chorus_loaders::{FetchError, FetchProgress};
#[cfg(feature = "debug")]
use chorus_debug::logging::{Colorize, Timer, print_debug};

use super::{BackendKind, DEFAULT_SPRITE, LoadState, ResourceHandle};
use crate::command::QueuedAction;
use crate::error::{LoadError, PlatformError};
use crate::event::{Event, EventKind, EventPayload};
use crate::platform::{ElementEvent, Platform};
use crate::probe::resolve_source;
use crate::settings::{Preload, Sprite};

impl<P: Platform> ResourceHandle<'_, P> {
    /// Runs right after the resource was created.
    pub(crate) fn initialize(&mut self) {
        if self.context.no_audio {
            self.fail(LoadError::CapabilityUnavailable);
            return;
        }

        if self.resource.settings.preload != Preload::Off {
            self.load();
        }

        if self.resource.settings.autoplay {
            self.play(super::PlayTarget::Default);
        }
    }

    /// Starts loading the resource. Does nothing while a load is running or
    /// after it finished, but retries a load that failed.
    pub fn load(&mut self) {
        if self.context.no_audio {
            self.fail(LoadError::CapabilityUnavailable);
            return;
        }

        match self.resource.state {
            LoadState::Loaded => return,
            LoadState::Loading if self.resource.failure.is_none() => return,
            _ => {}
        }

        self.resource.failure = None;
        self.resource.state = LoadState::Loading;

        // Unloading an element resource deregisters it.
        if !self.context.registry.contains(&self.key) {
            self.context.registry.push(self.key);
        }

        let resolved = resolve_source(&self.resource.settings.src, &self.resource.settings.format, &self.context.codecs);

        let Some(source) = resolved.map(str::to_owned) else {
            self.fail(LoadError::UnsupportedFormat);
            return;
        };

        #[cfg(feature = "debug")]
        print_debug!("loading {}", source.magenta());

        self.resource.source = Some(source.clone());

        match self.resource.kind {
            BackendKind::Graph => {
                self.context.fetch(
                    self.key,
                    self.resource.generation,
                    source,
                    self.resource.settings.xhr_with_credentials,
                );
            }
            BackendKind::Element => match self.context.obtain_element() {
                Ok(element) => {
                    let options = self.resource.element_options();
                    self.context.platform.load_element(element, &source, &options);
                    self.resource.loading_element = Some(element);
                }
                Err(error) => self.fail(LoadError::NetworkFailure {
                    source,
                    message: error.message().to_owned(),
                }),
            },
        }
    }

    /// Whether an asynchronous result for `generation` still applies.
    fn awaits_result(&self, generation: u32) -> bool {
        self.resource.generation == generation && self.resource.state == LoadState::Loading && self.resource.failure.is_none()
    }

    pub(crate) fn fetch_progressed(&mut self, generation: u32, progress: FetchProgress) {
        if !self.awaits_result(generation) {
            return;
        }

        if let Some(fraction) = progress.fraction() {
            self.emit(Event::with_payload(EventKind::LoadProgress, None, EventPayload::Progress(fraction)));
        }
    }

    pub(crate) fn fetch_finished(&mut self, generation: u32, result: Result<Vec<u8>, FetchError>) {
        if !self.awaits_result(generation) {
            return;
        }

        match result {
            Ok(bytes) => {
                let request = self.context.platform.decode(bytes);
                self.context.pending_decodes.insert(request, (self.key, generation));
            }
            Err(error) => {
                let source = self.resource.source.clone().unwrap_or_default();
                self.fail(LoadError::NetworkFailure {
                    source,
                    message: error.to_string(),
                });
            }
        }
    }

    pub(crate) fn decode_finished(&mut self, generation: u32, result: Result<P::Buffer, PlatformError>) {
        if !self.awaits_result(generation) {
            return;
        }

        match result {
            Ok(buffer) => {
                let duration = self.context.platform.buffer_duration(&buffer);
                self.resource.buffer = Some(buffer);
                self.finish_loading(duration);
            }
            Err(error) => {
                let source = self.resource.source.clone().unwrap_or_default();
                self.fail(LoadError::DecodeFailure {
                    source,
                    message: error.message().to_owned(),
                });
            }
        }
    }

    /// Handles a notification of the element the resource is loading with.
    pub(crate) fn loading_element_event(&mut self, element: P::Element, event: ElementEvent) {
        if self.resource.loading_element != Some(element) || !self.awaits_result(self.resource.generation) {
            return;
        }

        match event {
            ElementEvent::CanPlayThrough | ElementEvent::LoadedMetadata => {
                let duration = self.context.platform.element_duration(element).unwrap_or(0.0);
                self.finish_loading(duration);
            }
            ElementEvent::Error(message) => {
                if let Some(element) = self.resource.loading_element.take() {
                    self.context.recycle_element(element);
                }

                let source = self.resource.source.clone().unwrap_or_default();
                self.fail(LoadError::NetworkFailure { source, message });
            }
            ElementEvent::Suspend | ElementEvent::Ended | ElementEvent::PlayRejected(_) => {}
        }
    }

    fn finish_loading(&mut self, duration: f64) {
        #[cfg(feature = "debug")]
        let timer = Timer::new_dynamic(format!(
            "finish loading {}",
            self.resource.source.as_deref().unwrap_or_default().magenta()
        ));

        self.resource.duration = duration;
        self.resource
            .sprites
            .insert(DEFAULT_SPRITE.to_owned(), Sprite::new(0.0, duration * 1000.0));
        self.resource.state = LoadState::Loaded;

        for index in 0..self.resource.voices.len() {
            self.bind_voice(index);
        }

        if self.resource.voices.is_empty() {
            self.create_voice();
        }

        self.emit(Event::new(EventKind::Load, None));

        // Actions queued while replaying land in a fresh queue.
        for action in mem::take(&mut self.resource.queue) {
            self.replay(action);
        }

        #[cfg(feature = "debug")]
        timer.stop();
    }

    fn fail(&mut self, error: LoadError) {
        #[cfg(feature = "debug")]
        print_debug!("[{}] {}", "error".red(), error);

        self.resource.failure = Some(error.clone());
        self.emit(Event::with_payload(EventKind::LoadError, None, EventPayload::LoadError(error)));
    }

    fn replay(&mut self, action: QueuedAction) {
        match action {
            QueuedAction::Play { voice, sprite } => {
                let Some(index) = self.resource.voice_index(voice) else {
                    return;
                };

                self.resource.voices[index].reserved = false;

                if let Some(name) = &sprite
                    && !self.resource.sprites.contains_key(name)
                {
                    return;
                }

                if self.resource.voices[index].paused {
                    self.start_voice(index, sprite, true);
                }
            }
            QueuedAction::Pause { voice } => self.pause(voice),
            QueuedAction::Stop { voice } => self.stop(voice),
            QueuedAction::Seek { voice, position } => self.set_seek(position, voice),
            QueuedAction::Fade { voice, from, to, duration } => self.fade(from, to, duration, voice),
            QueuedAction::Spatial { voice, change } => self.change_spatial(change, voice),
        }
    }
}
