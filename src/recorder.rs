//! Samples the registry at a fixed cadence into an ordered frame buffer.

use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::connection::ConnectionStatus;
use crate::registry::ConnectionRegistry;
use crate::session::{RecordedFrame, Recording};

/// How often the recorder samples the registry, roughly 30 frames a second.
pub const SAMPLE_PERIOD: Duration = Duration::from_millis(33);

/// Captures timestamped registry snapshots while armed.
///
/// The recorder does not stop an active player first; recording and playback
/// are mutually exclusive by UI convention, and a caller that wants that
/// exclusivity enforces it before arming. A recorder left armed during
/// playback simply captures the synthesized connections along with the live
/// ones.
pub struct Recorder {
    registry: ConnectionRegistry,
    frames: Arc<Mutex<Vec<RecordedFrame>>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Recorder {
    /// A disarmed recorder over the given registry.
    pub fn new(registry: ConnectionRegistry) -> Self {
        Recorder {
            registry,
            frames: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// True while the sampling ticker is armed.
    pub fn is_recording(&self) -> bool {
        self.worker.is_some()
    }

    /// Arms the sampler. Frames left over from an earlier session are
    /// discarded. No-op while already recording.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }
        self.frames.lock().unwrap().clear();
        self.running.store(true, Ordering::SeqCst);

        let registry = self.registry.clone();
        let frames = Arc::clone(&self.frames);
        let running = Arc::clone(&self.running);
        self.worker = Some(thread::spawn(move || {
            let epoch = Instant::now();
            while running.load(Ordering::SeqCst) {
                if let Some(frame) = capture(&registry, epoch) {
                    frames.lock().unwrap().push(frame);
                }
                spin_sleep::sleep(SAMPLE_PERIOD);
            }
            debug!("recorder ticker stopped");
        }));
        info!("recording started");
    }

    /// Disarms the ticker and hands back everything captured so far. The
    /// buffer survives in memory until the next start, so a caller can
    /// still decide whether to persist or discard it.
    pub fn stop(&mut self) -> Recording {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        let frames = self.frames.lock().unwrap().clone();
        info!("recording stopped with {} frames", frames.len());
        Recording::new(frames)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// One sampling tick: every `Connected` entry, live or synthesized, goes
/// into the frame. Returns `None` when nothing is connected, in which case
/// no frame is appended at all.
fn capture(registry: &ConnectionRegistry, epoch: Instant) -> Option<RecordedFrame> {
    let mut poses = BTreeMap::new();
    for view in registry.snapshot() {
        if view.status == ConnectionStatus::Connected {
            poses.insert(view.target, view.sample.components());
        }
    }
    if poses.is_empty() {
        return None;
    }
    Some(RecordedFrame::new(
        epoch.elapsed().as_millis() as u64,
        poses,
    ))
}
