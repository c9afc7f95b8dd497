use cgmath::Vector3;

use super::{BackendKind, LoadState, ResourceHandle};
use crate::command::QueuedAction;
use crate::platform::Platform;
use crate::spatial::{PannerAttributes, PannerAttributesUpdate, SpatialChange, SpatialState, apply_change};
use crate::voice::VoiceId;

impl<P: Platform> ResourceHandle<'_, P> {
    fn spatial_state(&self, voice: Option<VoiceId>) -> &SpatialState {
        match voice.and_then(|id| self.resource.voice_index(id)) {
            Some(index) => &self.resource.voices[index].spatial,
            None => &self.resource.spatial,
        }
    }

    /// Stereo pan of a voice, or the default of the resource.
    pub fn stereo(&self, voice: Option<VoiceId>) -> Option<f32> {
        self.spatial_state(voice).stereo
    }

    /// Pans a voice, or the resource and all of its voices, in `[-1, 1]`.
    /// Replaces a 3D position.
    pub fn set_stereo(&mut self, pan: f32, voice: Option<VoiceId>) {
        self.change_spatial(SpatialChange::Stereo(pan.clamp(-1.0, 1.0)), voice);
    }

    /// 3D position of a voice, or the default of the resource.
    pub fn position(&self, voice: Option<VoiceId>) -> Option<Vector3<f32>> {
        self.spatial_state(voice).position
    }

    /// Places a voice, or the resource and all of its voices, in 3D space
    /// relative to the listener.
    pub fn set_position(&mut self, position: Vector3<f32>, voice: Option<VoiceId>) {
        self.change_spatial(SpatialChange::Position(position), voice);
    }

    /// Direction a voice is facing, or the default of the resource.
    pub fn orientation(&self, voice: Option<VoiceId>) -> Vector3<f32> {
        self.spatial_state(voice).orientation
    }

    /// Sets the direction a voice, or the resource and all of its voices, are
    /// facing. Only matters for directional cones.
    pub fn set_orientation(&mut self, orientation: Vector3<f32>, voice: Option<VoiceId>) {
        self.change_spatial(SpatialChange::Orientation(orientation), voice);
    }

    /// Velocity of a voice, or the default of the resource.
    pub fn velocity(&self, voice: Option<VoiceId>) -> Vector3<f32> {
        self.spatial_state(voice).velocity
    }

    /// Sets the velocity used for the doppler effect.
    pub fn set_velocity(&mut self, velocity: Vector3<f32>, voice: Option<VoiceId>) {
        self.change_spatial(SpatialChange::Velocity(velocity), voice);
    }

    /// Panner attributes of a voice, or the defaults of the resource.
    pub fn panner_attributes(&self, voice: Option<VoiceId>) -> PannerAttributes {
        self.spatial_state(voice).attributes
    }

    /// Merges the given attributes into the panner attributes of a voice, or
    /// of the resource and all of its voices.
    pub fn set_panner_attributes(&mut self, update: PannerAttributesUpdate, voice: Option<VoiceId>) {
        self.change_spatial(SpatialChange::Attributes(update), voice);
    }

    pub(crate) fn change_spatial(&mut self, change: SpatialChange, voice: Option<VoiceId>) {
        if self.resource.kind != BackendKind::Graph || self.context.platform.spatial().is_none() {
            return;
        }

        if self.resource.state != LoadState::Loaded {
            self.resource.queue.push(QueuedAction::Spatial { voice, change });
            return;
        }

        if voice.is_none() {
            self.resource.spatial.apply(&change);
        }

        for index in self.targets(voice) {
            let voice = &mut self.resource.voices[index];
            voice.spatial.apply(&change);
            apply_change(&mut self.context.platform, &mut voice.backend, &voice.spatial, &change);
        }
    }
}
