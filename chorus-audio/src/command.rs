use std::time::Duration;

use crate::spatial::SpatialChange;
use crate::voice::VoiceId;

/// A transport call made before its resource finished loading. Replayed in
/// the order it was issued once loading completes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum QueuedAction {
    /// Start a voice that was reserved when the call was made.
    Play { voice: VoiceId, sprite: Option<String> },
    Pause { voice: Option<VoiceId> },
    Stop { voice: Option<VoiceId> },
    Seek { voice: Option<VoiceId>, position: f64 },
    Fade {
        voice: Option<VoiceId>,
        from: f32,
        to: f32,
        duration: Duration,
    },
    Spatial { voice: Option<VoiceId>, change: SpatialChange },
}
