//! Stereo panning and 3D positioning. Everything here needs a platform with a
//! [`SpatialPlatform`](crate::platform::SpatialPlatform) and only affects graph voices. On any other setup the
//! operations are no-ops.

use cgmath::{Vector3, Zero};
use serde::{Deserialize, Serialize};

use crate::backend::{GraphVoice, VoiceBackend};
use crate::platform::Platform;

/// Position given to a 3D panner that was never positioned explicitly.
const DEFAULT_POSITION: Vector3<f32> = Vector3::new(0.0, 0.0, -0.5);

/// How the volume falls off with the distance to the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceModel {
    /// Linear falloff between the reference and the maximum distance.
    Linear,
    /// Inverse falloff.
    Inverse,
    /// Exponential falloff.
    Exponential,
}

/// The algorithm used to position audio in 3D space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanningModel {
    /// Equal-power panning, cheap but less convincing.
    EqualPower,
    /// Head related transfer function.
    Hrtf,
}

/// Cone, distance and panning attributes of a voice's 3D panner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PannerAttributes {
    /// Inside this angle there is no volume reduction, in degrees.
    pub cone_inner_angle: f32,
    /// Outside this angle the volume is reduced to `cone_outer_gain`.
    pub cone_outer_angle: f32,
    /// Gain outside of the outer cone.
    pub cone_outer_gain: f32,
    /// Distance falloff model.
    pub distance_model: DistanceModel,
    /// Distance after which the volume isn't reduced any further.
    pub max_distance: f32,
    /// Distance at which the volume reduction starts.
    pub ref_distance: f32,
    /// How quickly the volume is reduced.
    pub rolloff_factor: f32,
    /// Panning algorithm.
    pub panning_model: PanningModel,
}

impl Default for PannerAttributes {
    fn default() -> Self {
        Self {
            cone_inner_angle: 360.0,
            cone_outer_angle: 360.0,
            cone_outer_gain: 0.0,
            distance_model: DistanceModel::Inverse,
            max_distance: 10000.0,
            ref_distance: 1.0,
            rolloff_factor: 1.0,
            panning_model: PanningModel::Hrtf,
        }
    }
}

impl PannerAttributes {
    /// Overwrites every attribute the update provides.
    pub fn merge(&mut self, update: &PannerAttributesUpdate) {
        if let Some(value) = update.cone_inner_angle {
            self.cone_inner_angle = value;
        }
        if let Some(value) = update.cone_outer_angle {
            self.cone_outer_angle = value;
        }
        if let Some(value) = update.cone_outer_gain {
            self.cone_outer_gain = value;
        }
        if let Some(value) = update.distance_model {
            self.distance_model = value;
        }
        if let Some(value) = update.max_distance {
            self.max_distance = value;
        }
        if let Some(value) = update.ref_distance {
            self.ref_distance = value;
        }
        if let Some(value) = update.rolloff_factor {
            self.rolloff_factor = value;
        }
        if let Some(value) = update.panning_model {
            self.panning_model = value;
        }
    }
}

/// A partial set of [`PannerAttributes`]. Fields left at [`None`] keep their
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct PannerAttributesUpdate {
    pub cone_inner_angle: Option<f32>,
    pub cone_outer_angle: Option<f32>,
    pub cone_outer_gain: Option<f32>,
    pub distance_model: Option<DistanceModel>,
    pub max_distance: Option<f32>,
    pub ref_distance: Option<f32>,
    pub rolloff_factor: Option<f32>,
    pub panning_model: Option<PanningModel>,
}

impl PannerAttributesUpdate {
    /// Returns whether the update doesn't change anything.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Doppler attributes of the listener.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ListenerAttributes {
    /// Scales the pitch shift caused by moving sources.
    pub doppler_factor: f32,
    /// Speed of sound in units per second.
    pub speed_of_sound: f32,
}

impl Default for ListenerAttributes {
    fn default() -> Self {
        Self {
            doppler_factor: 1.0,
            speed_of_sound: 343.3,
        }
    }
}

/// A partial set of [`ListenerAttributes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ListenerAttributesUpdate {
    pub doppler_factor: Option<f32>,
    pub speed_of_sound: Option<f32>,
}

impl ListenerAttributes {
    /// Overwrites every attribute the update provides.
    pub fn merge(&mut self, update: &ListenerAttributesUpdate) {
        if let Some(value) = update.doppler_factor {
            self.doppler_factor = value;
        }
        if let Some(value) = update.speed_of_sound {
            self.speed_of_sound = value;
        }
    }
}

/// Pose of the listener all 3D panners are relative to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ListenerPose {
    pub stereo: Option<f32>,
    pub position: Vector3<f32>,
    pub forward: Vector3<f32>,
    pub up: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub attributes: ListenerAttributes,
}

impl Default for ListenerPose {
    fn default() -> Self {
        Self {
            stereo: None,
            position: Vector3::zero(),
            forward: Vector3::new(0.0, 0.0, -1.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            velocity: Vector3::zero(),
            attributes: ListenerAttributes::default(),
        }
    }
}

/// Spatial state of a voice, or the defaults of a resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SpatialState {
    pub stereo: Option<f32>,
    pub position: Option<Vector3<f32>>,
    pub orientation: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub attributes: PannerAttributes,
}

impl Default for SpatialState {
    fn default() -> Self {
        Self {
            stereo: None,
            position: None,
            orientation: Vector3::new(0.0, 0.0, -1.0),
            velocity: Vector3::zero(),
            attributes: PannerAttributes::default(),
        }
    }
}

/// A single spatial mutation, applied to the state of a voice (and to its
/// panner if it has one).
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SpatialChange {
    Stereo(f32),
    Position(Vector3<f32>),
    Orientation(Vector3<f32>),
    Velocity(Vector3<f32>),
    Attributes(PannerAttributesUpdate),
}

impl SpatialState {
    pub fn apply(&mut self, change: &SpatialChange) {
        match change {
            SpatialChange::Stereo(pan) => {
                self.stereo = Some(*pan);
                self.position = None;
            }
            SpatialChange::Position(position) => {
                self.position = Some(*position);
                self.stereo = None;
            }
            SpatialChange::Orientation(orientation) => self.orientation = *orientation,
            SpatialChange::Velocity(velocity) => self.velocity = *velocity,
            SpatialChange::Attributes(update) => self.attributes.merge(update),
        }
    }
}

/// The panner node spliced between a voice's source and its gain node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Panner<N> {
    Stereo(N),
    Spatial(N),
}

impl<N: Copy> Panner<N> {
    pub fn node(self) -> N {
        match self {
            Panner::Stereo(node) | Panner::Spatial(node) => node,
        }
    }
}

/// Brings the panner of a voice in line with a change of its spatial state.
/// Does nothing for voices that aren't bound to the graph.
pub(crate) fn apply_change<P: Platform>(
    platform: &mut P,
    backend: &mut VoiceBackend<P::Node, P::Element>,
    state: &SpatialState,
    change: &SpatialChange,
) {
    let VoiceBackend::Graph(voice) = backend else {
        return;
    };

    match change {
        SpatialChange::Stereo(pan) => set_stereo(platform, voice, *pan),
        SpatialChange::Position(position) => {
            let at = platform.context_time();

            if let Some(node) = spatial_panner(platform, voice, state)
                && let Some(spatial) = platform.spatial()
            {
                spatial.set_panner_position(node, *position, at);
            }
        }
        SpatialChange::Orientation(orientation) => {
            let at = platform.context_time();

            if let Some(node) = spatial_panner(platform, voice, state)
                && let Some(spatial) = platform.spatial()
            {
                spatial.set_panner_orientation(node, *orientation, at);
            }
        }
        SpatialChange::Velocity(velocity) => {
            if let Some(node) = spatial_panner(platform, voice, state)
                && let Some(spatial) = platform.spatial()
            {
                spatial.set_panner_velocity(node, *velocity);
            }
        }
        SpatialChange::Attributes(_) => {
            if let Some(node) = spatial_panner(platform, voice, state)
                && let Some(spatial) = platform.spatial()
            {
                spatial.set_panner_attributes(node, &state.attributes);
            }
        }
    }
}

/// Restores the panner of a voice that was just bound to the graph.
pub(crate) fn restore<P: Platform>(platform: &mut P, voice: &mut GraphVoice<P::Node>, state: &SpatialState) {
    if state.position.is_some() {
        spatial_panner(platform, voice, state);
    } else if let Some(pan) = state.stereo {
        set_stereo(platform, voice, pan);
    }
}

fn set_stereo<P: Platform>(platform: &mut P, voice: &mut GraphVoice<P::Node>, pan: f32) {
    let at = platform.context_time();
    let Some(spatial) = platform.spatial() else {
        return;
    };

    if let Some(Panner::Stereo(node)) = voice.panner {
        spatial.set_pan(node, pan, at);
        return;
    }

    let panner = match spatial.create_stereo_panner() {
        Some(node) => {
            spatial.set_pan(node, pan, at);
            Panner::Stereo(node)
        }
        None => {
            let Ok(node) = spatial.create_panner() else {
                return;
            };

            let attributes = PannerAttributes {
                panning_model: PanningModel::EqualPower,
                ..PannerAttributes::default()
            };

            spatial.set_panner_attributes(node, &attributes);
            spatial.set_panner_position(node, Vector3::new(pan, 0.0, 0.0), at);
            Panner::Spatial(node)
        }
    };

    voice.splice_panner(platform, panner);
}

/// Returns the 3D panner of a voice, creating and splicing it with the full
/// spatial state if the voice doesn't have one yet.
fn spatial_panner<P: Platform>(platform: &mut P, voice: &mut GraphVoice<P::Node>, state: &SpatialState) -> Option<P::Node> {
    if let Some(Panner::Spatial(node)) = voice.panner {
        return Some(node);
    }

    let at = platform.context_time();
    let spatial = platform.spatial()?;
    let node = spatial.create_panner().ok()?;

    spatial.set_panner_attributes(node, &state.attributes);
    spatial.set_panner_position(node, state.position.unwrap_or(DEFAULT_POSITION), at);
    spatial.set_panner_orientation(node, state.orientation, at);
    spatial.set_panner_velocity(node, state.velocity);

    voice.splice_panner(platform, Panner::Spatial(node));

    Some(node)
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use crate::spatial::{
        DistanceModel, ListenerAttributes, ListenerAttributesUpdate, PannerAttributes, PannerAttributesUpdate, SpatialChange,
        SpatialState,
    };

    #[test]
    fn test_panner_attributes_merge_only_given_fields() {
        let mut attributes = PannerAttributes::default();
        let update = PannerAttributesUpdate {
            rolloff_factor: Some(2.0),
            distance_model: Some(DistanceModel::Linear),
            ..Default::default()
        };

        attributes.merge(&update);

        assert_eq!(attributes.rolloff_factor, 2.0);
        assert_eq!(attributes.distance_model, DistanceModel::Linear);
        assert_eq!(attributes.max_distance, 10000.0);
        assert_eq!(attributes.cone_inner_angle, 360.0);
    }

    #[test]
    fn test_listener_attributes_merge() {
        let mut attributes = ListenerAttributes::default();
        attributes.merge(&ListenerAttributesUpdate {
            doppler_factor: Some(0.5),
            speed_of_sound: None,
        });

        assert_eq!(attributes.doppler_factor, 0.5);
        assert_eq!(attributes.speed_of_sound, 343.3);
    }

    #[test]
    fn test_stereo_and_position_replace_each_other() {
        let mut state = SpatialState::default();

        state.apply(&SpatialChange::Position(Vector3::new(1.0, 2.0, 3.0)));
        state.apply(&SpatialChange::Stereo(-0.5));
        assert_eq!(state.position, None);
        assert_eq!(state.stereo, Some(-0.5));

        state.apply(&SpatialChange::Position(Vector3::new(1.0, 2.0, 3.0)));
        assert_eq!(state.stereo, None);
    }

    #[test]
    fn test_empty_update() {
        assert!(PannerAttributesUpdate::default().is_empty());
    }
}
