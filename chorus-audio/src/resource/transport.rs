use std::time::Duration;

#[cfg(feature = "debug")]
use chorus_debug::logging::{Colorize, print_debug};

use super::{BackendKind, DEFAULT_SPRITE, LoadState, PlayTarget, ResourceHandle};
use crate::backend::Playback;
use crate::command::QueuedAction;
use crate::error::PlayError;
use crate::event::{Callback, Event, EventKind, EventPayload};
use crate::platform::Platform;
use crate::schedule::Clock;
use crate::settings::{clamp_rate, clamp_volume};
use crate::voice::{Fade, VoiceId};

/// Why a voice was paused without the caller asking for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AutoPause {
    Visibility,
    PageHide,
}

impl<P: Platform> ResourceHandle<'_, P> {
    /// Plays the whole source, a sprite, or resumes a voice. Returns the id of
    /// the voice that plays.
    ///
    /// Before the resource is loaded the play is queued and the id of the
    /// voice it will use is returned right away. An unknown sprite, an
    /// exhausted voice pool or a failed load return [`None`].
    pub fn play(&mut self, target: impl Into<PlayTarget>) -> Option<VoiceId> {
        if self.context.no_audio || self.resource.failure.is_some() {
            return None;
        }

        let (index, sprite) = match target.into() {
            PlayTarget::Voice(id) => (Some(self.resource.voice_index(id)?), None),
            PlayTarget::Sprite(name) => {
                if !self.has_sprite(&name) {
                    #[cfg(feature = "debug")]
                    print_debug!("[{}] unknown sprite {}", "warning".yellow(), name.magenta());

                    return None;
                }

                (None, Some(name))
            }
            PlayTarget::Default => (None, Some(DEFAULT_SPRITE.to_owned())),
        };

        if let Some(index) = index
            && !self.resource.voices[index].paused
        {
            return Some(self.resource.voices[index].id);
        }

        let index = match index {
            Some(index) => index,
            None => self.inactive_voice()?,
        };

        let voice = &mut self.resource.voices[index];
        let id = voice.id;
        voice.clear_auto_pause();

        if self.resource.state != LoadState::Loaded {
            voice.reserved = true;
            self.resource.queue.push(QueuedAction::Play { voice: id, sprite });

            if self.resource.state == LoadState::Unloaded {
                self.load();
            }

            return Some(id);
        }

        self.start_voice(index, sprite, true);
        Some(id)
    }

    /// Like [`play`](Self::play), but calls `callback` once the voice ended.
    /// For an unknown sprite the callback is called on the next update
    /// without anything playing.
    pub fn play_with_callback(&mut self, target: impl Into<PlayTarget>, callback: impl FnOnce(&Event) + 'static) -> Option<VoiceId> {
        let target = target.into();
        let mut callback = Some(callback);
        let callback: Callback = Box::new(move |event: &Event| {
            if let Some(callback) = callback.take() {
                callback(event);
            }
        });

        if let PlayTarget::Sprite(name) = &target
            && !self.has_sprite(name)
        {
            self.context.defer(self.key, callback, Event::new(EventKind::End, None));
            return None;
        }

        let id = self.play(target)?;
        self.resource.listeners.add(EventKind::End, Some(id), true, callback);

        Some(id)
    }

    /// Pauses one voice, or every playing voice.
    pub fn pause(&mut self, voice: Option<VoiceId>) {
        if self.resource.state != LoadState::Loaded {
            self.resource.queue.push(QueuedAction::Pause { voice });
            return;
        }

        for index in self.targets(voice) {
            self.resource.voices[index].clear_auto_pause();
            self.pause_voice(index);
        }
    }

    /// Stops one voice, or every voice, and resets the position.
    pub fn stop(&mut self, voice: Option<VoiceId>) {
        if self.resource.state != LoadState::Loaded {
            self.resource.queue.push(QueuedAction::Stop { voice });
            return;
        }

        for index in self.targets(voice) {
            self.stop_voice(index);
        }
    }

    /// Mutes or unmutes one voice, or the resource and all of its voices.
    pub fn mute(&mut self, muted: bool, voice: Option<VoiceId>) {
        if voice.is_none() {
            self.resource.muted = muted;
        }

        for index in self.targets(voice) {
            self.resource.voices[index].muted = muted;
            self.apply_output(index);

            let id = self.resource.voices[index].id;
            self.emit(Event::with_payload(EventKind::Mute, Some(id), EventPayload::Muted(muted)));
        }
    }

    /// Whether a voice, or the resource, is muted.
    pub fn muted(&self, voice: Option<VoiceId>) -> bool {
        match voice.and_then(|id| self.resource.voice_index(id)) {
            Some(index) => self.resource.voices[index].muted,
            None => self.resource.muted,
        }
    }

    /// Volume of a voice, or the default volume of the resource. Doesn't
    /// include the master volume or any mute.
    pub fn volume(&self, voice: Option<VoiceId>) -> f32 {
        match voice.and_then(|id| self.resource.voice_index(id)) {
            Some(index) => self.resource.voices[index].volume,
            None => self.resource.volume,
        }
    }

    /// Sets the volume of a voice, or of the resource and all of its voices.
    /// Cancels running fades.
    pub fn set_volume(&mut self, volume: f32, voice: Option<VoiceId>) {
        let volume = clamp_volume(volume);

        if voice.is_none() {
            self.resource.volume = volume;
        }

        for index in self.targets(voice) {
            let voice = &mut self.resource.voices[index];
            voice.volume = volume;
            voice.fade = None;
            let id = voice.id;

            self.apply_output(index);
            self.emit(Event::new(EventKind::Volume, Some(id)));
        }
    }

    /// Fades the volume linearly from `from` to `to`. Emits
    /// [`EventKind::Fade`] per voice once done.
    pub fn fade(&mut self, from: f32, to: f32, duration: Duration, voice: Option<VoiceId>) {
        if self.resource.state != LoadState::Loaded {
            self.resource.queue.push(QueuedAction::Fade { voice, from, to, duration });
            return;
        }

        let from = clamp_volume(from);
        let to = clamp_volume(to);
        let now = self.context.platform.now();

        if voice.is_none() {
            self.resource.volume = to;
        }

        for index in self.targets(voice) {
            let voice = &mut self.resource.voices[index];
            voice.volume = from;
            voice.fade = Some(Fade {
                from,
                to,
                started_at: now,
                duration: duration.as_secs_f64(),
            });

            self.apply_output(index);
        }
    }

    /// Rate of a voice, or the default rate of the resource.
    pub fn rate(&self, voice: Option<VoiceId>) -> f32 {
        match voice.and_then(|id| self.resource.voice_index(id)) {
            Some(index) => self.resource.voices[index].rate,
            None => self.resource.rate,
        }
    }

    /// Sets the rate of a voice, or of the resource and all of its voices.
    /// Clamped to `[0.5, 4]`.
    pub fn set_rate(&mut self, rate: f32, voice: Option<VoiceId>) {
        let rate = clamp_rate(rate);

        if voice.is_none() {
            self.resource.rate = rate;
        }

        for index in self.targets(voice) {
            let playing = !self.resource.voices[index].paused;

            if playing {
                let playback = self.playback(index);
                let context = &mut *self.context;
                self.resource.voices[index]
                    .backend
                    .set_rate(&mut context.platform, &playback, rate);
            }

            self.resource.voices[index].rate = rate;

            if playing {
                self.arm_end_timer(index);
            }

            let id = self.resource.voices[index].id;
            self.emit(Event::new(EventKind::Rate, Some(id)));
        }
    }

    /// Loop flag of a voice, or the default of the resource.
    pub fn looping(&self, voice: Option<VoiceId>) -> bool {
        match voice.and_then(|id| self.resource.voice_index(id)) {
            Some(index) => self.resource.voices[index].looping,
            None => self.resource.looping,
        }
    }

    /// Sets the loop flag of a voice, or of the resource and all of its
    /// voices. Playing voices are restarted in place to pick it up.
    pub fn set_loop(&mut self, looping: bool, voice: Option<VoiceId>) {
        if voice.is_none() {
            self.resource.looping = looping;
        }

        for index in self.targets(voice) {
            if self.resource.voices[index].looping == looping {
                continue;
            }

            let playing = !self.resource.voices[index].paused;
            let position = self.current_position(index);
            let voice = &mut self.resource.voices[index];
            voice.looping = looping;

            if playing {
                voice.seek = position;
                self.start_voice(index, None, false);
            }
        }
    }

    /// Position of a voice relative to the start of its sprite. Without an
    /// id the first voice is used.
    pub fn seek(&self, voice: Option<VoiceId>) -> f64 {
        self.seek_target(voice).map(|index| self.current_position(index)).unwrap_or(0.0)
    }

    /// Moves a voice to a new position, clamped to its duration. Without an
    /// id the first voice is moved.
    pub fn set_seek(&mut self, position: f64, voice: Option<VoiceId>) {
        if self.resource.state != LoadState::Loaded {
            self.resource.queue.push(QueuedAction::Seek { voice, position });
            return;
        }

        let Some(index) = self.seek_target(voice) else {
            return;
        };

        let context = &mut *self.context;
        let voice = &mut self.resource.voices[index];
        let position = match position.is_nan() {
            true => 0.0,
            false => position.clamp(0.0, voice.duration),
        };
        let playing = !voice.paused;
        let id = voice.id;

        if playing {
            voice.backend.stop(&mut context.platform);
            context.schedule.cancel(self.key, id);
        }

        voice.seek = position;
        voice.ended = false;

        if playing {
            self.start_voice(index, None, false);
        }

        self.emit(Event::new(EventKind::Seek, Some(id)));
    }

    /// Whether a voice plays, or whether any voice plays.
    pub fn playing(&self, voice: Option<VoiceId>) -> bool {
        match voice {
            Some(id) => self
                .resource
                .voice_index(id)
                .is_some_and(|index| !self.resource.voices[index].paused),
            None => self.resource.voices.iter().any(|voice| !voice.paused),
        }
    }

    /// Duration of a voice's sprite, or of the whole source, in seconds.
    pub fn duration(&self, voice: Option<VoiceId>) -> f64 {
        match voice.and_then(|id| self.resource.voice_index(id)) {
            Some(index) => self.resource.voices[index].duration,
            None => self.resource.duration,
        }
    }

    fn has_sprite(&self, name: &str) -> bool {
        name == DEFAULT_SPRITE || self.resource.sprites.contains_key(name)
    }

    fn seek_target(&self, voice: Option<VoiceId>) -> Option<usize> {
        match voice {
            Some(id) => self.resource.voice_index(id),
            None => (!self.resource.voices.is_empty()).then_some(0),
        }
    }

    fn playback(&self, index: usize) -> Playback {
        let voice = &self.resource.voices[index];

        Playback {
            start: voice.start,
            duration: voice.duration,
            seek: voice.seek,
            rate: voice.rate,
            looping: voice.looping,
        }
    }

    /// Current position of a voice relative to its sprite start.
    pub(crate) fn current_position(&self, index: usize) -> f64 {
        let voice = &self.resource.voices[index];

        if voice.paused {
            return voice.seek;
        }

        voice
            .backend
            .position(&self.context.platform, &self.playback(index))
            .unwrap_or(voice.seek)
    }

    /// Arms the timer that fires when the voice reaches the end of its sprite
    /// (or of the current loop iteration).
    fn arm_end_timer(&mut self, index: usize) {
        let position = self.current_position(index);
        let voice = &self.resource.voices[index];

        if voice.looping && voice.duration <= 0.0 {
            return;
        }

        let remaining = (voice.duration - position).max(0.0) / voice.rate as f64;
        let (clock, now) = match self.resource.kind {
            BackendKind::Graph => (Clock::Context, self.context.platform.context_time()),
            BackendKind::Element => (Clock::Wall, self.context.platform.now()),
        };

        self.context.schedule.arm(self.key, voice.id, clock, now + remaining);
    }

    /// Starts a bound voice. A new sprite resets the range and loop flag of
    /// the voice, otherwise it continues where it was.
    pub(crate) fn start_voice(&mut self, index: usize, sprite: Option<String>, announce: bool) {
        self.context.auto_resume();

        let resource = &mut *self.resource;
        let voice = &mut resource.voices[index];

        if let Some(name) = sprite
            && let Some(definition) = resource.sprites.get(&name).copied()
        {
            voice.start = definition.start_seconds();
            voice.duration = definition.duration_seconds();
            voice.looping = resource.looping || definition.looping.unwrap_or(false);
            voice.sprite = name;
        }

        if voice.seek >= voice.duration {
            voice.seek = 0.0;
        }

        voice.paused = false;
        voice.ended = false;
        voice.reserved = false;

        let id = voice.id;
        let playback = self.playback(index);
        let context = &mut *self.context;
        let resource = &mut *self.resource;
        let voice = &mut resource.voices[index];

        let volume = match resource.kind {
            BackendKind::Graph => voice.graph_gain(),
            BackendKind::Element => voice.element_volume(context.volume, context.muted),
        };

        let result = voice
            .backend
            .start(&mut context.platform, resource.buffer.as_ref(), &playback, volume);

        match result {
            Ok(()) => {
                self.arm_end_timer(index);

                if announce {
                    self.emit(Event::new(EventKind::Play, Some(id)));
                }
            }
            Err(error) => {
                #[cfg(feature = "debug")]
                print_debug!("[{}] voice {} failed to start: {}", "error".red(), id.cyan(), error);

                voice.paused = true;
                voice.ended = true;

                if resource.kind == BackendKind::Graph || index == 0 {
                    let error = PlayError::PlaybackRejected {
                        message: error.message().to_owned(),
                    };
                    self.emit(Event::with_payload(EventKind::PlayError, Some(id), EventPayload::PlayError(error)));
                }
            }
        }
    }

    /// Pauses a playing voice and remembers its position. Returns `false` if
    /// it was already paused.
    pub(crate) fn pause_voice(&mut self, index: usize) -> bool {
        if self.resource.voices[index].paused {
            return false;
        }

        let position = self.current_position(index);
        let context = &mut *self.context;
        let voice = &mut self.resource.voices[index];
        let id = voice.id;

        voice.seek = position;
        voice.paused = true;
        voice.backend.stop(&mut context.platform);
        context.schedule.cancel(self.key, id);
        context.activity = true;

        self.emit(Event::new(EventKind::Pause, Some(id)));
        true
    }

    pub(crate) fn stop_voice(&mut self, index: usize) {
        let context = &mut *self.context;
        let voice = &mut self.resource.voices[index];
        let id = voice.id;

        voice.paused = true;
        voice.ended = true;
        voice.seek = 0.0;
        voice.fade = None;
        voice.clear_auto_pause();
        voice.backend.stop(&mut context.platform);
        context.schedule.cancel(self.key, id);
        context.activity = true;

        self.emit(Event::new(EventKind::Stop, Some(id)));
    }

    /// Handles the end of a voice that doesn't loop on its own.
    fn voice_ended(&mut self, index: usize) {
        let context = &mut *self.context;
        let voice = &mut self.resource.voices[index];
        let id = voice.id;

        voice.paused = true;
        voice.ended = true;
        voice.seek = 0.0;
        voice.backend.stop(&mut context.platform);
        context.schedule.cancel(self.key, id);
        context.activity = true;

        let restart = self.resource.looping && !voice.looping;

        self.emit(Event::new(EventKind::End, Some(id)));

        if restart {
            self.start_voice(index, None, true);
        }
    }

    pub(crate) fn end_timer_fired(&mut self, id: VoiceId) {
        let Some(index) = self.resource.voice_index(id) else {
            return;
        };

        let voice = &self.resource.voices[index];

        if voice.paused || voice.ended {
            return;
        }

        if !voice.looping {
            self.voice_ended(index);
            return;
        }

        self.emit(Event::new(EventKind::End, Some(id)));

        let playback = Playback {
            seek: 0.0,
            ..self.playback(index)
        };
        let context = &mut *self.context;
        let voice = &mut self.resource.voices[index];
        voice.seek = 0.0;
        voice.backend.restart_loop(&mut context.platform, &playback);

        self.arm_end_timer(index);
    }

    /// The backend reported that a voice reached its end on its own.
    pub(crate) fn backend_ended(&mut self, index: usize) {
        let voice = &self.resource.voices[index];

        if !voice.paused && !voice.ended && !voice.looping {
            self.voice_ended(index);
        }
    }

    /// The platform refused to play an element after the play was issued.
    pub(crate) fn play_rejected(&mut self, index: usize, message: String) {
        let voice = &mut self.resource.voices[index];
        let id = voice.id;

        voice.paused = true;
        voice.ended = true;
        self.context.schedule.cancel(self.key, id);

        #[cfg(feature = "debug")]
        print_debug!("[{}] playback of voice {} was rejected: {}", "error".red(), id.cyan(), message);

        if index == 0 {
            let error = PlayError::PlaybackRejected { message };
            self.emit(Event::with_payload(EventKind::PlayError, Some(id), EventPayload::PlayError(error)));
        }
    }

    /// Pauses every playing voice on behalf of the page lifecycle.
    pub(crate) fn auto_pause(&mut self, reason: AutoPause) {
        for index in 0..self.resource.voices.len() {
            if self.pause_voice(index) {
                let voice = &mut self.resource.voices[index];

                match reason {
                    AutoPause::Visibility => voice.paused_by_visibility = true,
                    AutoPause::PageHide => voice.paused_by_page_hide = true,
                }
            }
        }
    }

    /// Resumes exactly the voices [`auto_pause`](Self::auto_pause) paused for
    /// the same reason.
    pub(crate) fn auto_unpause(&mut self, reason: AutoPause) {
        for index in 0..self.resource.voices.len() {
            let voice = &mut self.resource.voices[index];
            let flag = match reason {
                AutoPause::Visibility => &mut voice.paused_by_visibility,
                AutoPause::PageHide => &mut voice.paused_by_page_hide,
            };

            if !std::mem::take(flag) {
                continue;
            }

            if voice.paused && !voice.ended {
                self.start_voice(index, None, true);
            }
        }
    }
}
