use super::{LOOP_DURATION, Playback};
use crate::error::PlatformError;
use crate::platform::Platform;
use crate::spatial::Panner;

/// A voice playing through the audio graph:
/// `source -> [panner] -> gain -> master gain`.
pub(crate) struct GraphVoice<N> {
    pub gain: N,
    pub panner: Option<Panner<N>>,
    /// The current buffer source. Sources are one-shot, so every start
    /// creates a new one.
    pub source: Option<N>,
    /// Context time the position was last rebased at.
    started_at: f64,
    /// Position relative to the sprite start at `started_at`.
    offset: f64,
}

impl<N: Copy + Eq> GraphVoice<N> {
    /// Creates the gain node of the voice and connects it to `master`.
    pub fn create<P>(platform: &mut P, master: N, volume: f32) -> Result<Self, PlatformError>
    where
        P: Platform<Node = N>,
    {
        let gain = platform.create_gain()?;
        platform.set_gain(gain, volume, platform.context_time());
        platform.connect(gain, master);

        Ok(Self {
            gain,
            panner: None,
            source: None,
            started_at: 0.0,
            offset: 0.0,
        })
    }

    /// The node new sources connect to.
    pub fn input(&self) -> N {
        match self.panner {
            Some(panner) => panner.node(),
            None => self.gain,
        }
    }

    pub fn start<P>(&mut self, platform: &mut P, buffer: &P::Buffer, playback: &Playback, volume: f32) -> Result<(), PlatformError>
    where
        P: Platform<Node = N>,
    {
        self.stop(platform);

        let now = platform.context_time();
        let source = platform.create_source(buffer)?;

        platform.set_source_rate(source, playback.rate, now);
        platform.set_source_loop(
            source,
            playback
                .looping
                .then_some((playback.start, playback.start + playback.duration)),
        );
        platform.connect(source, self.input());
        platform.set_gain(self.gain, volume, now);

        let length = match playback.looping {
            true => LOOP_DURATION,
            false => playback.remaining(),
        };

        if let Err(error) = platform.start_source(source, now, playback.start + playback.seek, length) {
            platform.disconnect(source);
            return Err(error);
        }

        self.source = Some(source);
        self.started_at = now;
        self.offset = playback.seek;

        Ok(())
    }

    pub fn stop<P>(&mut self, platform: &mut P)
    where
        P: Platform<Node = N>,
    {
        if let Some(source) = self.source.take() {
            platform.stop_source(source);
            platform.disconnect(source);
        }
    }

    /// Position derived from the context clock. Looping voices wrap around the
    /// sprite length.
    pub fn position<P>(&self, platform: &P, playback: &Playback) -> Option<f64>
    where
        P: Platform<Node = N>,
    {
        self.source?;

        let elapsed = (platform.context_time() - self.started_at).max(0.0) * playback.rate as f64;
        let position = self.offset + elapsed;

        match playback.looping && playback.duration > 0.0 {
            true => Some(position % playback.duration),
            false => Some(position.min(playback.duration)),
        }
    }

    /// Rebases the position before changing the rate, so that time played at
    /// the old rate is kept.
    pub fn set_rate<P>(&mut self, platform: &mut P, playback: &Playback, rate: f32)
    where
        P: Platform<Node = N>,
    {
        let Some(source) = self.source else {
            return;
        };

        if let Some(position) = self.position(platform, playback) {
            self.offset = position;
        }

        self.started_at = platform.context_time();
        platform.set_source_rate(source, rate, self.started_at);
    }

    pub fn restart_loop<P>(&mut self, platform: &mut P)
    where
        P: Platform<Node = N>,
    {
        self.started_at = platform.context_time();
        self.offset = 0.0;
    }

    /// Places a panner between the source and the gain node. Replaces any
    /// panner already in place.
    pub fn splice_panner<P>(&mut self, platform: &mut P, panner: Panner<N>)
    where
        P: Platform<Node = N>,
    {
        if let Some(previous) = self.panner.take() {
            platform.disconnect(previous.node());
        }

        platform.connect(panner.node(), self.gain);
        self.panner = Some(panner);

        if let Some(source) = self.source {
            platform.disconnect(source);
            platform.connect(source, panner.node());
        }
    }

    pub fn release<P>(mut self, platform: &mut P)
    where
        P: Platform<Node = N>,
    {
        self.stop(platform);

        if let Some(panner) = self.panner.take() {
            platform.disconnect(panner.node());
        }

        platform.disconnect(self.gain);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::backend::{GraphVoice, Playback};
    use crate::platform::Platform;
    use crate::platform::headless::{HeadlessNode, HeadlessPlatform};

    fn setup() -> (HeadlessPlatform, GraphVoice<HeadlessNode>, <HeadlessPlatform as Platform>::Buffer) {
        let mut platform = HeadlessPlatform::new();
        platform.create_context().unwrap();
        let master = platform.create_gain().unwrap();
        let voice = GraphVoice::create(&mut platform, master, 1.0).unwrap();
        let buffer = platform.create_buffer(4.0);

        (platform, voice, buffer)
    }

    fn playback(seek: f64, rate: f32, looping: bool) -> Playback {
        Playback {
            start: 1.0,
            duration: 2.0,
            seek,
            rate,
            looping,
        }
    }

    #[test]
    fn test_start_connects_source_to_gain() {
        let (mut platform, mut voice, buffer) = setup();

        voice.start(&mut platform, &buffer, &playback(0.5, 1.0, false), 0.7).unwrap();
        let source = voice.source.unwrap();

        assert_eq!(platform.connections(source), vec![voice.gain]);
        assert_relative_eq!(platform.source_offset(source), 1.5);
        assert_relative_eq!(platform.gain(voice.gain), 0.7);
    }

    #[test]
    fn test_position_follows_context_clock() {
        let (mut platform, mut voice, buffer) = setup();
        let playback = playback(0.0, 2.0, false);

        voice.start(&mut platform, &buffer, &playback, 1.0).unwrap();
        platform.advance(0.25);

        assert_relative_eq!(voice.position(&platform, &playback).unwrap(), 0.5);
    }

    #[test]
    fn test_looping_position_wraps() {
        let (mut platform, mut voice, buffer) = setup();
        let playback = playback(0.0, 1.0, true);

        voice.start(&mut platform, &buffer, &playback, 1.0).unwrap();
        platform.advance(2.5);

        assert_relative_eq!(voice.position(&platform, &playback).unwrap(), 0.5);
    }

    #[test]
    fn test_rate_change_keeps_played_time() {
        let (mut platform, mut voice, buffer) = setup();
        let slow = playback(0.0, 1.0, false);

        voice.start(&mut platform, &buffer, &slow, 1.0).unwrap();
        platform.advance(0.5);
        voice.set_rate(&mut platform, &slow, 2.0);
        platform.advance(0.25);

        let fast = Playback { rate: 2.0, ..slow };
        assert_relative_eq!(voice.position(&platform, &fast).unwrap(), 1.0);
    }

    #[test]
    fn test_stop_drops_source() {
        let (mut platform, mut voice, buffer) = setup();

        voice.start(&mut platform, &buffer, &playback(0.0, 1.0, false), 1.0).unwrap();
        voice.stop(&mut platform);

        assert!(voice.source.is_none());
        assert!(voice.position(&platform, &playback(0.0, 1.0, false)).is_none());
    }
}
