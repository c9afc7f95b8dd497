use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

use chorus_loaders::{FetchError, FetchProgress, FetchRequest, SourceLoader};
#[cfg(feature = "debug")]
use chorus_debug::logging::{Colorize, print_debug};
use hashbrown::HashMap;
use rayon::spawn;

use crate::ResourceKey;
use crate::error::PlatformError;
use crate::event::{Delivery, Event, Listeners, Recipient};
use crate::platform::{ContextState, Platform, RequestId};
use crate::probe::CodecTable;
use crate::schedule::Schedule;
use crate::settings::{EngineSettings, clamp_volume};
use crate::spatial::ListenerPose;
use crate::voice::VoiceId;

const FIRST_VOICE_ID: u32 = 1000;

/// State of the shared audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    /// There is no audio context, either because it was never created or
    /// because the host can't provide one.
    Uninitialized,
    /// The context is processing audio.
    Running,
    /// A suspend was requested but didn't complete yet.
    Suspending,
    /// The context is halted.
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnlockState {
    Disabled,
    Armed,
    Unlocked,
}

/// Result of a fetch running on the thread pool.
pub(crate) enum FetchMessage {
    Progress {
        key: ResourceKey,
        generation: u32,
        progress: FetchProgress,
    },
    Done {
        key: ResourceKey,
        generation: u32,
        result: Result<Vec<u8>, FetchError>,
    },
}

/// State shared by every resource: the platform, the context lifecycle and
/// everything that fans out across resources.
pub(crate) struct EngineContext<P: Platform> {
    pub platform: P,
    pub settings: EngineSettings,
    pub codecs: CodecTable,
    pub no_audio: bool,
    pub using_graph: bool,
    pub state: AudioState,
    pub master_gain: Option<P::Node>,
    pub volume: f32,
    pub muted: bool,
    next_voice_id: u32,
    /// Wall clock deadline of the idle suspend.
    pub suspend_timer: Option<f64>,
    pub resume_after_suspend: bool,
    pub resume_requested: bool,
    pub unlock: UnlockState,
    pub listener: ListenerPose,
    pub schedule: Schedule,
    pub deliveries: VecDeque<Delivery>,
    loader: Arc<dyn SourceLoader>,
    fetch_sender: Sender<FetchMessage>,
    pub fetch_receiver: Receiver<FetchMessage>,
    pub pending_decodes: HashMap<RequestId, (ResourceKey, u32)>,
    element_pool: Vec<P::Element>,
    /// Every live resource in creation order.
    pub registry: Vec<ResourceKey>,
    /// Set whenever something happened that may leave the context idle.
    pub activity: bool,
}

impl<P: Platform> EngineContext<P> {
    pub fn new(mut platform: P, loader: Arc<dyn SourceLoader>, settings: EngineSettings) -> Self {
        let (fetch_sender, fetch_receiver) = channel();

        let (codecs, no_audio) = match platform.create_probe() {
            Some(probe) => (CodecTable::probe(&probe), false),
            None => {
                #[cfg(feature = "debug")]
                print_debug!("[{}] no playback primitive available", "error".red());

                (CodecTable::empty(), true)
            }
        };

        let unlock = match settings.auto_unlock && platform.environment().requires_gesture && !no_audio {
            true => UnlockState::Armed,
            false => UnlockState::Disabled,
        };

        let mut context = Self {
            platform,
            volume: clamp_volume(settings.master_volume),
            settings,
            codecs,
            no_audio,
            using_graph: false,
            state: AudioState::Uninitialized,
            master_gain: None,
            muted: false,
            next_voice_id: FIRST_VOICE_ID,
            suspend_timer: None,
            resume_after_suspend: false,
            resume_requested: false,
            unlock,
            listener: ListenerPose::default(),
            schedule: Schedule::default(),
            deliveries: VecDeque::new(),
            loader,
            fetch_sender,
            fetch_receiver,
            pending_decodes: HashMap::new(),
            element_pool: Vec::new(),
            registry: Vec::new(),
            activity: true,
        };

        context.setup_context();
        context
    }

    /// Creates the audio context and the master gain node, or decides to use
    /// media elements only.
    pub fn setup_context(&mut self) {
        let legacy_webview = self.platform.environment().ios_version.is_some_and(|version| version < 9);

        if self.no_audio || self.settings.no_graph || legacy_webview {
            self.using_graph = false;
            return;
        }

        let initial_state = match self.platform.create_context() {
            Ok(state) => state,
            Err(_error) => {
                #[cfg(feature = "debug")]
                print_debug!("[{}] failed to create audio context: {}", "error".red(), _error);

                self.using_graph = false;
                return;
            }
        };

        let master_gain = match self.create_master_gain() {
            Ok(node) => node,
            Err(_error) => {
                #[cfg(feature = "debug")]
                print_debug!("[{}] failed to create master gain: {}", "error".red(), _error);

                self.platform.close_context();
                self.using_graph = false;
                return;
            }
        };

        #[cfg(feature = "debug")]
        print_debug!("created audio context in state {:?}", initial_state.magenta());

        self.using_graph = true;
        self.master_gain = Some(master_gain);
        self.state = AudioState::Running;

        if initial_state == ContextState::Suspended {
            self.state = AudioState::Suspended;
            self.resume_requested = true;
            self.platform.resume_context();
        }
    }

    fn create_master_gain(&mut self) -> Result<P::Node, PlatformError> {
        let destination = self
            .platform
            .destination()
            .ok_or_else(|| PlatformError::new("context has no destination"))?;
        let node = self.platform.create_gain()?;

        self.platform.set_gain(node, self.master_output(), self.platform.context_time());
        self.platform.connect(node, destination);

        Ok(node)
    }

    pub fn close_context(&mut self) {
        if !self.using_graph {
            return;
        }

        #[cfg(feature = "debug")]
        print_debug!("closing audio context");

        self.platform.close_context();
        self.master_gain = None;
        self.state = AudioState::Uninitialized;
        self.suspend_timer = None;
        self.resume_after_suspend = false;
        self.resume_requested = false;
        self.schedule.clear();
        self.pending_decodes.clear();
    }

    /// Value of the master gain node.
    pub fn master_output(&self) -> f32 {
        match self.muted {
            true => 0.0,
            false => self.volume,
        }
    }

    pub fn apply_master_output(&mut self) {
        if let Some(master_gain) = self.master_gain {
            let at = self.platform.context_time();
            self.platform.set_gain(master_gain, self.master_output(), at);
        }
    }

    pub fn next_voice_id(&mut self) -> VoiceId {
        let id = VoiceId(self.next_voice_id);
        self.next_voice_id += 1;
        id
    }

    /// Current time of the context clock, or zero without a context.
    pub fn context_time(&self) -> f64 {
        match self.using_graph {
            true => self.platform.context_time(),
            false => 0.0,
        }
    }

    /// Queues the event for every listener of `listeners` it matches.
    pub fn emit(&mut self, key: ResourceKey, listeners: &mut Listeners, event: Event) {
        for recipient in listeners.recipients(&event) {
            self.deliveries.push_back(Delivery {
                resource: key,
                recipient,
                event: event.clone(),
            });
        }
    }

    /// Queues a callback that isn't registered anywhere.
    pub fn defer(&mut self, key: ResourceKey, callback: crate::event::Callback, event: Event) {
        self.deliveries.push_back(Delivery {
            resource: key,
            recipient: Recipient::Owned(callback),
            event,
        });
    }

    /// Fetches the bytes of a source on the thread pool.
    pub fn fetch(&self, key: ResourceKey, generation: u32, url: String, with_credentials: bool) {
        let loader = self.loader.clone();
        let sender = self.fetch_sender.clone();

        spawn(move || {
            let request = FetchRequest {
                url: &url,
                with_credentials,
            };

            let result = loader.fetch(&request, &mut |progress| {
                let _ = sender.send(FetchMessage::Progress { key, generation, progress });
            });

            let _ = sender.send(FetchMessage::Done { key, generation, result });
        });
    }

    /// Takes an element from the pool or creates a new one.
    pub fn obtain_element(&mut self) -> Result<P::Element, PlatformError> {
        match self.element_pool.pop() {
            Some(element) => Ok(element),
            None => self.platform.create_element(),
        }
    }

    /// Returns an element to the pool, or destroys it if the pool is full.
    pub fn recycle_element(&mut self, element: P::Element) {
        self.platform.pause_element(element);

        match self.element_pool.len() < self.settings.html5_pool_size {
            true => self.element_pool.push(element),
            false => self.platform.release_element(element),
        }
    }

    /// Fills the element pool with elements created during a user gesture,
    /// so they are allowed to play later on.
    pub fn fill_element_pool(&mut self) {
        while self.element_pool.len() < self.settings.html5_pool_size {
            match self.platform.create_element() {
                Ok(element) => self.element_pool.push(element),
                Err(_error) => {
                    #[cfg(feature = "debug")]
                    print_debug!("[{}] failed to create pooled element: {}", "error".red(), _error);

                    break;
                }
            }
        }
    }

    /// Makes sure the context is running before a voice starts.
    pub fn auto_resume(&mut self) {
        if !self.using_graph {
            return;
        }

        self.suspend_timer = None;

        match self.state {
            AudioState::Suspended if !self.resume_requested => {
                #[cfg(feature = "debug")]
                print_debug!("resuming audio context");

                self.resume_requested = true;
                self.platform.resume_context();
            }
            AudioState::Suspending => self.resume_after_suspend = true,
            _ => {}
        }
    }

    /// Handles a finished context transition. Returns `true` if the context
    /// is running again.
    pub fn context_state_changed(&mut self, state: ContextState) -> bool {
        if !self.using_graph {
            return false;
        }

        match state {
            ContextState::Suspended => {
                #[cfg(feature = "debug")]
                print_debug!("audio context {}", "suspended".yellow());

                self.state = AudioState::Suspended;

                if self.resume_after_suspend {
                    self.resume_after_suspend = false;
                    self.resume_requested = true;
                    self.platform.resume_context();
                }

                false
            }
            ContextState::Running => {
                #[cfg(feature = "debug")]
                print_debug!("audio context {}", "running".green());

                let resumed = self.state != AudioState::Running;
                self.state = AudioState::Running;
                self.resume_requested = false;
                self.activity = true;

                resumed
            }
        }
    }

    /// Fires the idle suspend if its deadline passed.
    pub fn check_suspend_timer(&mut self) {
        let Some(deadline) = self.suspend_timer else {
            return;
        };

        if self.platform.now() < deadline {
            return;
        }

        self.suspend_timer = None;

        if self.state == AudioState::Running {
            #[cfg(feature = "debug")]
            print_debug!("suspending idle audio context");

            self.state = AudioState::Suspending;
            self.platform.suspend_context();
        }
    }

    /// Arms or cancels the idle suspend after activity was registered.
    pub fn schedule_suspend(&mut self, any_playing: bool) {
        if !self.settings.auto_suspend || !self.using_graph || self.state != AudioState::Running {
            return;
        }

        self.suspend_timer = match any_playing {
            true => None,
            false => Some(self.platform.now() + self.settings.suspend_delay.as_secs_f64()),
        };
    }
}
