//! Replays a loaded recording into the registry at a controllable rate.

use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::event::RelayEvent;
use crate::registry::ConnectionRegistry;
use crate::session::Recording;

/// Tick period at normal speed; matches the recorder cadence.
pub const BASE_PERIOD: Duration = Duration::from_millis(33);

/// The discrete playback rates the player accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackSpeed {
    /// Quarter speed.
    Quarter,
    /// Half speed.
    Half,
    /// Real-time.
    #[default]
    Normal,
    /// One-and-a-half speed.
    OneAndHalf,
    /// Double speed.
    Double,
}

impl PlaybackSpeed {
    /// Every supported rate, slowest first.
    pub const ALL: [PlaybackSpeed; 5] = [
        PlaybackSpeed::Quarter,
        PlaybackSpeed::Half,
        PlaybackSpeed::Normal,
        PlaybackSpeed::OneAndHalf,
        PlaybackSpeed::Double,
    ];

    /// The rate as a multiplier over real time.
    pub fn multiplier(self) -> f64 {
        match self {
            PlaybackSpeed::Quarter => 0.25,
            PlaybackSpeed::Half => 0.5,
            PlaybackSpeed::Normal => 1.0,
            PlaybackSpeed::OneAndHalf => 1.5,
            PlaybackSpeed::Double => 2.0,
        }
    }

    /// Snaps an arbitrary multiplier onto the nearest supported rate.
    pub fn nearest(value: f64) -> Self {
        let mut best = PlaybackSpeed::Normal;
        let mut best_distance = f64::INFINITY;
        for speed in Self::ALL {
            let distance = (speed.multiplier() - value).abs();
            if distance < best_distance {
                best = speed;
                best_distance = distance;
            }
        }
        best
    }

    /// Tick period at this rate: the base period divided by the multiplier.
    pub fn period(self) -> Duration {
        Duration::from_secs_f64(BASE_PERIOD.as_secs_f64() / self.multiplier())
    }
}

/// Cursor state for one loaded recording. The recording itself is shared
/// and never mutated by playback.
struct Session {
    recording: Arc<Recording>,
    index: usize,
    looping: bool,
    speed: PlaybackSpeed,
}

/// What one tick did, and how long to wait before the next one.
enum Step {
    Advanced(Duration),
    Finished,
    Idle,
}

/// Replays frames into the registry on its own ticker thread.
pub struct Player {
    registry: ConnectionRegistry,
    session: Arc<Mutex<Option<Session>>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Player {
    /// An idle player over the given registry.
    pub fn new(registry: ConnectionRegistry) -> Self {
        Player {
            registry,
            session: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Starts playback of `recording` from its first frame, replacing any
    /// session already loaded.
    pub fn play(&mut self, recording: Arc<Recording>, speed: PlaybackSpeed, looping: bool) {
        self.halt_ticker();
        *self.session.lock().unwrap() = Some(Session {
            recording,
            index: 0,
            looping,
            speed,
        });
        info!("playback started at {:?} speed", speed);
        self.spawn_ticker();
    }

    /// Halts the ticker without touching the frame index.
    pub fn pause(&mut self) {
        self.halt_ticker();
        debug!("playback paused at frame {}", self.frame_index());
    }

    /// Restarts the ticker from wherever the index currently points.
    /// No-op when nothing is loaded or playback is already running.
    pub fn resume(&mut self) {
        if self.running.load(Ordering::SeqCst) || self.session.lock().unwrap().is_none() {
            return;
        }
        // A ticker that finished on its own leaves its dead handle behind;
        // reap it before spawning the next one.
        self.halt_ticker();
        self.spawn_ticker();
    }

    /// Cancels the ticker and destroys the session; the index goes back to
    /// zero with it.
    pub fn stop(&mut self) {
        self.halt_ticker();
        *self.session.lock().unwrap() = None;
        info!("playback stopped");
    }

    /// Changes the rate without losing position: the ticker reads the
    /// period fresh on every tick, so the next tick fires at the new rate
    /// from the current index.
    pub fn set_speed(&self, speed: PlaybackSpeed) {
        if let Some(session) = self.session.lock().unwrap().as_mut() {
            session.speed = speed;
        }
    }

    /// Toggles wrap-around at the end of the recording.
    pub fn set_looping(&self, looping: bool) {
        if let Some(session) = self.session.lock().unwrap().as_mut() {
            session.looping = looping;
        }
    }

    /// Moves the cursor. Clamped to the last frame of the loaded recording;
    /// no-op when nothing is loaded.
    pub fn seek(&self, index: usize) {
        if let Some(session) = self.session.lock().unwrap().as_mut() {
            let last = session.recording.len().saturating_sub(1);
            session.index = index.min(last);
        }
    }

    /// The frame the next tick will apply; zero when nothing is loaded.
    pub fn frame_index(&self) -> usize {
        self.session.lock().unwrap().as_ref().map_or(0, |s| s.index)
    }

    /// True while the ticker is live.
    pub fn is_playing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn spawn_ticker(&mut self) {
        self.running.store(true, Ordering::SeqCst);
        let registry = self.registry.clone();
        let session = Arc::clone(&self.session);
        let running = Arc::clone(&self.running);
        self.worker = Some(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                match step(&registry, &session) {
                    Step::Advanced(period) => spin_sleep::sleep(period),
                    Step::Finished => {
                        running.store(false, Ordering::SeqCst);
                        registry.notifier().emit(RelayEvent::PlaybackFinished);
                        break;
                    }
                    Step::Idle => {
                        running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
            debug!("playback ticker stopped");
        }));
    }

    fn halt_ticker(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.halt_ticker();
    }
}

/// One playback tick: apply the frame under the cursor, advance, and wrap
/// or finish at the end. The registry lock and the session lock are never
/// held at the same time.
fn step(registry: &ConnectionRegistry, session: &Mutex<Option<Session>>) -> Step {
    let (frame, period) = {
        let mut guard = session.lock().unwrap();
        let state = match guard.as_mut() {
            Some(state) => state,
            None => return Step::Idle,
        };
        let frames = state.recording.frames();
        if frames.is_empty() {
            return Step::Finished;
        }
        let frame = frames[state.index].clone();
        let period = state.speed.period();

        state.index += 1;
        if state.index >= frames.len() {
            if state.looping {
                state.index = 0;
            } else {
                state.index = 0;
                drop(guard);
                registry.apply_frame(&frame);
                return Step::Finished;
            }
        }
        (frame, period)
    };

    registry.apply_frame(&frame);
    Step::Advanced(period)
}
