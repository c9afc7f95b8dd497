use crate::ResourceKey;
use crate::error::{LoadError, PlayError};
use crate::voice::VoiceId;

/// Kinds of events a resource emits. Every kind has its own listener list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Loading finished.
    Load,
    /// Loading failed.
    LoadError,
    /// Part of the source was fetched.
    LoadProgress,
    /// A voice could not start.
    PlayError,
    /// A voice started.
    Play,
    /// A voice paused.
    Pause,
    /// A voice stopped.
    Stop,
    /// A voice was muted or unmuted.
    Mute,
    /// The volume of a voice changed.
    Volume,
    /// The rate of a voice changed.
    Rate,
    /// A voice was moved to a new position.
    Seek,
    /// A voice reached its end, or the end of a loop iteration.
    End,
    /// A fade finished.
    Fade,
    /// Audio was unlocked by a user gesture.
    Unlock,
    /// The audio context resumed.
    Resume,
}

impl EventKind {
    const COUNT: usize = 15;

    fn index(self) -> usize {
        self as usize
    }
}

/// Data attached to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// No data.
    None,
    /// Why loading failed.
    LoadError(LoadError),
    /// Why playback could not start.
    PlayError(PlayError),
    /// The new mute state.
    Muted(bool),
    /// Fraction of the source that was fetched.
    Progress(f32),
    /// Audio context time in seconds.
    Time(f64),
}

/// An event delivered to resource listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// The voice it happened to, if any.
    pub voice: Option<VoiceId>,
    /// Additional data.
    pub payload: EventPayload,
}

impl Event {
    pub(crate) fn new(kind: EventKind, voice: Option<VoiceId>) -> Self {
        Self {
            kind,
            voice,
            payload: EventPayload::None,
        }
    }

    pub(crate) fn with_payload(kind: EventKind, voice: Option<VoiceId>, payload: EventPayload) -> Self {
        Self { kind, voice, payload }
    }
}

/// Identifies a registered listener, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Boxed listener callback.
pub type Callback = Box<dyn FnMut(&Event)>;

struct Listener {
    id: ListenerId,
    voice: Option<VoiceId>,
    once: bool,
    callback: Callback,
}

/// Who receives a delivery. One-shot listeners are taken out of their list
/// when the event is emitted and travel with the delivery.
pub(crate) enum Recipient {
    Registered(ListenerId),
    Owned(Callback),
}

/// An event waiting for the next engine update.
pub(crate) struct Delivery {
    pub resource: ResourceKey,
    pub recipient: Recipient,
    pub event: Event,
}

/// The listener lists of one resource.
pub(crate) struct Listeners {
    lists: [Vec<Listener>; EventKind::COUNT],
    next_id: u64,
}

impl Default for Listeners {
    fn default() -> Self {
        Self {
            lists: std::array::from_fn(|_| Vec::new()),
            next_id: 0,
        }
    }
}

impl Listeners {
    pub fn add(&mut self, kind: EventKind, voice: Option<VoiceId>, once: bool, callback: Callback) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;

        self.lists[kind.index()].push(Listener {
            id,
            voice,
            once,
            callback,
        });

        id
    }

    /// Removes listeners. Without a kind every list is cleared, without a
    /// listener the whole list of the kind is cleared, with both the first
    /// listener matching the id (and the voice, if given) is removed.
    pub fn remove(&mut self, kind: Option<EventKind>, listener: Option<ListenerId>, voice: Option<VoiceId>) {
        let Some(kind) = kind else {
            self.clear();
            return;
        };

        let list = &mut self.lists[kind.index()];

        match listener {
            None => list.clear(),
            Some(listener) => {
                if let Some(position) = list
                    .iter()
                    .position(|entry| entry.id == listener && (voice.is_none() || entry.voice == voice))
                {
                    list.remove(position);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.lists.iter_mut().for_each(Vec::clear);
    }

    /// Collects the recipients of an event, most recently registered first.
    /// Voice scoped listeners only match their voice, except for `Load`.
    pub fn recipients(&mut self, event: &Event) -> Vec<Recipient> {
        let list = &mut self.lists[event.kind.index()];
        let mut recipients = Vec::new();
        let mut index = list.len();

        while index > 0 {
            index -= 1;

            let Listener { id, voice, once, .. } = list[index];
            let matches = voice.is_none() || voice == event.voice || event.kind == EventKind::Load;

            if !matches {
                continue;
            }

            match once {
                true => recipients.push(Recipient::Owned(list.remove(index).callback)),
                false => recipients.push(Recipient::Registered(id)),
            }
        }

        recipients
    }

    /// Calls a registered listener. Returns `false` if it was removed in the
    /// meantime.
    pub fn call(&mut self, kind: EventKind, id: ListenerId, event: &Event) -> bool {
        match self.lists[kind.index()].iter_mut().find(|listener| listener.id == id) {
            Some(listener) => {
                (listener.callback)(event);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn count(&self, kind: EventKind) -> usize {
        self.lists[kind.index()].len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::event::{Event, EventKind, Listeners, Recipient};
    use crate::voice::VoiceId;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> Box<dyn FnMut(&Event)> {
        let log = log.clone();
        Box::new(move |_| log.borrow_mut().push(name))
    }

    fn deliver(listeners: &mut Listeners, event: &Event) {
        for recipient in listeners.recipients(event) {
            match recipient {
                Recipient::Registered(id) => {
                    listeners.call(event.kind, id, event);
                }
                Recipient::Owned(mut callback) => callback(event),
            }
        }
    }

    #[test]
    fn test_most_recent_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();
        listeners.add(EventKind::Play, None, false, recorder(&log, "first"));
        listeners.add(EventKind::Play, None, false, recorder(&log, "second"));

        deliver(&mut listeners, &Event::new(EventKind::Play, Some(VoiceId(1000))));

        assert_eq!(*log.borrow(), vec!["second", "first"]);
    }

    #[test]
    fn test_voice_scoped_listener() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();
        listeners.add(EventKind::End, Some(VoiceId(1001)), false, recorder(&log, "scoped"));

        deliver(&mut listeners, &Event::new(EventKind::End, Some(VoiceId(1000))));
        deliver(&mut listeners, &Event::new(EventKind::End, Some(VoiceId(1001))));

        assert_eq!(*log.borrow(), vec!["scoped"]);
    }

    #[test]
    fn test_scoped_listener_receives_load() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();
        listeners.add(EventKind::Load, Some(VoiceId(1003)), false, recorder(&log, "load"));

        deliver(&mut listeners, &Event::new(EventKind::Load, None));

        assert_eq!(*log.borrow(), vec!["load"]);
    }

    #[test]
    fn test_once_is_removed_on_emit() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();
        listeners.add(EventKind::End, None, true, recorder(&log, "once"));

        let recipients = listeners.recipients(&Event::new(EventKind::End, None));

        assert_eq!(recipients.len(), 1);
        assert_eq!(listeners.count(EventKind::End), 0);
    }

    #[test]
    fn test_remove_variants() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();
        let first = listeners.add(EventKind::Pause, None, false, recorder(&log, "a"));
        listeners.add(EventKind::Pause, None, false, recorder(&log, "b"));
        listeners.add(EventKind::Stop, None, false, recorder(&log, "c"));

        listeners.remove(Some(EventKind::Pause), Some(first), None);
        assert_eq!(listeners.count(EventKind::Pause), 1);

        listeners.remove(Some(EventKind::Pause), None, None);
        assert_eq!(listeners.count(EventKind::Pause), 0);
        assert_eq!(listeners.count(EventKind::Stop), 1);

        listeners.remove(None, None, None);
        assert_eq!(listeners.count(EventKind::Stop), 0);
    }

    #[test]
    fn test_remove_requires_matching_voice() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();
        let id = listeners.add(EventKind::Seek, Some(VoiceId(1000)), false, recorder(&log, "seek"));

        listeners.remove(Some(EventKind::Seek), Some(id), Some(VoiceId(1001)));
        assert_eq!(listeners.count(EventKind::Seek), 1);

        listeners.remove(Some(EventKind::Seek), Some(id), Some(VoiceId(1000)));
        assert_eq!(listeners.count(EventKind::Seek), 0);
    }
}
