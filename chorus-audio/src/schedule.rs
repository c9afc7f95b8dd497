use crate::ResourceKey;
use crate::voice::VoiceId;

/// The clock a timer is measured against. Graph voices follow the audio
/// context, which stops while suspended. Element voices follow the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Clock {
    Context,
    Wall,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Timer {
    resource: ResourceKey,
    voice: VoiceId,
    clock: Clock,
    deadline: f64,
}

/// End timers of all playing voices. Every voice has at most one.
#[derive(Default)]
pub(crate) struct Schedule {
    timers: Vec<Timer>,
}

impl Schedule {
    /// Arms the end timer of a voice, replacing the previous one.
    pub fn arm(&mut self, resource: ResourceKey, voice: VoiceId, clock: Clock, deadline: f64) {
        self.cancel(resource, voice);
        self.timers.push(Timer {
            resource,
            voice,
            clock,
            deadline,
        });
    }

    pub fn cancel(&mut self, resource: ResourceKey, voice: VoiceId) {
        self.timers
            .retain(|timer| !(timer.resource == resource && timer.voice == voice));
    }

    pub fn cancel_resource(&mut self, resource: ResourceKey) {
        self.timers.retain(|timer| timer.resource != resource);
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Removes every expired timer and returns them, earliest first.
    pub fn take_due(&mut self, context_time: f64, wall_time: f64) -> Vec<(ResourceKey, VoiceId)> {
        let is_due = |timer: &Timer| match timer.clock {
            Clock::Context => timer.deadline <= context_time,
            Clock::Wall => timer.deadline <= wall_time,
        };

        let mut due: Vec<Timer> = self.timers.iter().copied().filter(is_due).collect();
        self.timers.retain(|timer| !is_due(timer));

        due.sort_by(|left, right| left.deadline.total_cmp(&right.deadline));
        due.into_iter().map(|timer| (timer.resource, timer.voice)).collect()
    }
}

#[cfg(test)]
mod tests {
    use chorus_container::GenerationalKey;

    use crate::ResourceKey;
    use crate::schedule::{Clock, Schedule};
    use crate::voice::VoiceId;

    fn key(slot: u32) -> ResourceKey {
        ResourceKey::new(slot, std::num::NonZeroU32::MIN)
    }

    #[test]
    fn test_arm_replaces_previous_timer() {
        let mut schedule = Schedule::default();
        schedule.arm(key(0), VoiceId(1000), Clock::Context, 5.0);
        schedule.arm(key(0), VoiceId(1000), Clock::Context, 2.0);

        assert_eq!(schedule.take_due(3.0, 0.0), vec![(key(0), VoiceId(1000))]);
        assert!(schedule.take_due(10.0, 10.0).is_empty());
    }

    #[test]
    fn test_clocks_are_independent() {
        let mut schedule = Schedule::default();
        schedule.arm(key(0), VoiceId(1000), Clock::Context, 1.0);
        schedule.arm(key(1), VoiceId(1001), Clock::Wall, 1.0);

        assert_eq!(schedule.take_due(0.5, 2.0), vec![(key(1), VoiceId(1001))]);
        assert_eq!(schedule.take_due(1.0, 2.0), vec![(key(0), VoiceId(1000))]);
    }

    #[test]
    fn test_due_timers_are_ordered() {
        let mut schedule = Schedule::default();
        schedule.arm(key(0), VoiceId(1002), Clock::Context, 3.0);
        schedule.arm(key(0), VoiceId(1001), Clock::Context, 1.0);

        let due = schedule.take_due(5.0, 0.0);

        assert_eq!(due, vec![(key(0), VoiceId(1001)), (key(0), VoiceId(1002))]);
    }

    #[test]
    fn test_cancel_resource() {
        let mut schedule = Schedule::default();
        schedule.arm(key(0), VoiceId(1000), Clock::Wall, 1.0);
        schedule.arm(key(1), VoiceId(1001), Clock::Wall, 1.0);
        schedule.cancel_resource(key(0));

        assert_eq!(schedule.take_due(0.0, 1.0), vec![(key(1), VoiceId(1001))]);
    }
}
