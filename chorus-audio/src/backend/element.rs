use super::Playback;
use crate::error::PlatformError;
use crate::platform::Platform;

/// A voice playing through its own media element. The element holds the whole
/// source, so sprites are played by seeking to their start.
pub(crate) struct ElementVoice<E> {
    pub element: E,
}

impl<E: Copy> ElementVoice<E> {
    pub fn new(element: E) -> Self {
        Self { element }
    }

    /// Configures the element and starts it. Native looping is only used when
    /// the sprite covers the whole source, every other loop is driven by the
    /// end timer.
    pub fn start<P>(&mut self, platform: &mut P, playback: &Playback, volume: f32) -> Result<(), PlatformError>
    where
        P: Platform<Element = E>,
    {
        platform.set_element_position(self.element, playback.start + playback.seek);
        platform.set_element_volume(self.element, volume);
        platform.set_element_rate(self.element, playback.rate);
        platform.set_element_loop(self.element, playback.looping && playback.start == 0.0 && self.covers(platform, playback));
        platform.play_element(self.element)
    }

    fn covers<P>(&self, platform: &P, playback: &Playback) -> bool
    where
        P: Platform<Element = E>,
    {
        platform
            .element_duration(self.element)
            .is_some_and(|duration| playback.duration >= duration)
    }

    pub fn position<P>(&self, platform: &P, playback: &Playback) -> f64
    where
        P: Platform<Element = E>,
    {
        (platform.element_position(self.element) - playback.start).clamp(0.0, playback.duration)
    }

    pub fn restart_loop<P>(&mut self, platform: &mut P, playback: &Playback)
    where
        P: Platform<Element = E>,
    {
        platform.set_element_position(self.element, playback.start);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::backend::{ElementVoice, Playback};
    use crate::platform::headless::HeadlessPlatform;
    use crate::platform::{CrossOrigin, ElementOptions, Platform};
    use crate::settings::PreloadHint;

    fn setup() -> (HeadlessPlatform, ElementVoice<<HeadlessPlatform as Platform>::Element>) {
        let mut platform = HeadlessPlatform::new().with_media("theme.mp3", 10.0);
        let element = platform.create_element().unwrap();
        let options = ElementOptions {
            preload: PreloadHint::Auto,
            cross_origin: CrossOrigin::Anonymous,
            autoplay: false,
        };
        platform.load_element(element, "theme.mp3", &options);

        (platform, ElementVoice::new(element))
    }

    #[test]
    fn test_start_seeks_into_sprite() {
        let (mut platform, mut voice) = setup();
        let playback = Playback {
            start: 2.0,
            duration: 3.0,
            seek: 1.0,
            rate: 1.0,
            looping: true,
        };

        voice.start(&mut platform, &playback, 0.5).unwrap();

        assert_relative_eq!(platform.element_position(voice.element), 3.0);
        assert_relative_eq!(voice.position(&platform, &playback), 1.0);
        assert!(!platform.element_looping(voice.element));
    }

    #[test]
    fn test_whole_source_uses_native_loop() {
        let (mut platform, mut voice) = setup();
        let playback = Playback {
            start: 0.0,
            duration: 10.0,
            seek: 0.0,
            rate: 1.0,
            looping: true,
        };

        voice.start(&mut platform, &playback, 1.0).unwrap();

        assert!(platform.element_looping(voice.element));
    }

    #[test]
    fn test_rejected_start() {
        let (mut platform, mut voice) = setup();
        platform.reject_playback(true);
        let playback = Playback {
            start: 0.0,
            duration: 10.0,
            seek: 0.0,
            rate: 1.0,
            looping: false,
        };

        assert!(voice.start(&mut platform, &playback, 1.0).is_err());
    }
}
