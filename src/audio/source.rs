//! Signal source adapter: owns at most one live audio source.
//!
//! Acquisition (device open, file decode) runs on a worker thread that then
//! owns the device stream. Each attempt is tagged with a generation number;
//! `stop()` bumps it, so a result that arrives late is recognized as stale
//! and discarded instead of reviving a stopped source.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use super::backend::{AudioBackend, OpenedStream};
use super::decode::decode_audio;
use super::tap::SampleTap;
use super::SourceError;

/// Kind of audio origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Microphone,
    File,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Microphone => write!(f, "microphone"),
            SourceKind::File => write!(f, "file"),
        }
    }
}

/// Observable adapter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Idle,
    /// Acquisition in flight (counts as active for the conflict check)
    Pending(SourceKind),
    MicrophoneActive,
    FileActive,
}

/// Details of an opened device stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub device_name: String,
    pub sample_rate: u32,
}

/// Transitions reported by `SourceAdapter::poll`
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Activated { kind: SourceKind, info: StreamInfo },
    Failed(SourceError),
    /// File playback reached its natural end
    Finished,
}

/// Result sent back by a worker thread
struct Acquisition {
    generation: u64,
    result: Result<StreamInfo, SourceError>,
}

/// Worker thread holding a device stream until told to stop
struct Worker {
    stop_tx: mpsc::Sender<()>,
    cancelled: Arc<AtomicBool>,
    _handle: JoinHandle<()>,
}

impl Worker {
    /// Ask the worker to drop its stream. Does not wait: the worker may
    /// still be blocked in device acquisition.
    fn release(self) {
        self.cancelled.store(true, Ordering::Release);
        let _ = self.stop_tx.send(());
    }
}

/// Decode `bytes` and start playback unless cancelled in between
fn decode_and_play(
    backend: &dyn AudioBackend,
    bytes: &[u8],
    tap: SampleTap,
    finished: Arc<AtomicBool>,
    cancelled: &AtomicBool,
) -> Result<Option<OpenedStream>, SourceError> {
    let clip = decode_audio(bytes)?;
    log::info!(
        "Decoded {:.1}s of audio ({} channel(s) @ {}Hz)",
        clip.duration_secs(),
        clip.channels,
        clip.sample_rate
    );
    if cancelled.load(Ordering::Acquire) {
        log::debug!("File load cancelled before playback");
        return Ok(None);
    }
    backend.open_playback(Arc::new(clip), tap, finished).map(Some)
}

enum Active {
    Idle,
    Pending {
        kind: SourceKind,
        worker: Worker,
        finished: Arc<AtomicBool>,
    },
    Microphone {
        worker: Worker,
    },
    File {
        worker: Worker,
        finished: Arc<AtomicBool>,
    },
}

/// Owns the single active audio source and its worker thread
pub struct SourceAdapter {
    backend: Arc<dyn AudioBackend>,
    tap: SampleTap,
    generation: u64,
    active: Active,
    results_tx: mpsc::Sender<Acquisition>,
    results_rx: mpsc::Receiver<Acquisition>,
}

impl SourceAdapter {
    pub fn new(backend: Arc<dyn AudioBackend>, tap: SampleTap) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        Self {
            backend,
            tap,
            generation: 0,
            active: Active::Idle,
            results_tx,
            results_rx,
        }
    }

    pub fn state(&self) -> SourceState {
        match &self.active {
            Active::Idle => SourceState::Idle,
            Active::Pending { kind, .. } => SourceState::Pending(*kind),
            Active::Microphone { .. } => SourceState::MicrophoneActive,
            Active::File { .. } => SourceState::FileActive,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.active, Active::Idle)
    }

    /// Begin acquiring the default microphone
    ///
    /// Completion is reported later by `poll()`.
    pub fn start_microphone(&mut self) -> Result<(), SourceError> {
        self.ensure_idle()?;

        let backend = Arc::clone(&self.backend);
        let tap = self.tap.clone();
        self.spawn(SourceKind::Microphone, Arc::new(AtomicBool::new(false)), move |_| {
            backend.open_microphone(tap).map(Some)
        })
    }

    /// Begin decoding `bytes` and playing the result
    ///
    /// Completion is reported later by `poll()`.
    pub fn load_audio_file(&mut self, bytes: Vec<u8>) -> Result<(), SourceError> {
        self.ensure_idle()?;

        let backend = Arc::clone(&self.backend);
        let tap = self.tap.clone();
        let finished = Arc::new(AtomicBool::new(false));
        let finished_worker = Arc::clone(&finished);
        self.spawn(SourceKind::File, finished, move |cancelled| {
            decode_and_play(backend.as_ref(), &bytes, tap, finished_worker, cancelled)
        })
    }

    /// Release the active or pending source; no-op when idle
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.active, Active::Idle) {
            Active::Idle => return,
            Active::Pending { worker, kind, .. } => {
                log::info!("Cancelling pending {} acquisition", kind);
                worker.release();
            }
            Active::Microphone { worker } => {
                log::info!("Stopping microphone");
                worker.release();
            }
            Active::File { worker, .. } => {
                log::info!("Stopping file playback");
                worker.release();
            }
        }
        self.generation += 1;
        self.tap.clear();
    }

    /// Collect finished acquisitions and playback completion (once per frame)
    pub fn poll(&mut self) -> Option<SourceEvent> {
        if let Active::File { finished, .. } = &self.active {
            if finished.load(Ordering::Acquire) {
                log::info!("File playback finished");
                self.stop();
                return Some(SourceEvent::Finished);
            }
        }

        while let Ok(acquisition) = self.results_rx.try_recv() {
            if acquisition.generation != self.generation {
                log::debug!(
                    "Discarding stale acquisition (generation {}, current {})",
                    acquisition.generation,
                    self.generation
                );
                if self.is_idle() {
                    self.tap.clear();
                }
                continue;
            }

            let (kind, worker, finished) = match std::mem::replace(&mut self.active, Active::Idle) {
                Active::Pending {
                    kind,
                    worker,
                    finished,
                } => (kind, worker, finished),
                other => {
                    self.active = other;
                    continue;
                }
            };

            return Some(match acquisition.result {
                Ok(info) => {
                    log::info!("{} source active on {}", kind, info.device_name);
                    self.active = match kind {
                        SourceKind::Microphone => Active::Microphone { worker },
                        SourceKind::File => Active::File { worker, finished },
                    };
                    SourceEvent::Activated { kind, info }
                }
                Err(e) => {
                    log::warn!("{} acquisition failed: {}", kind, e);
                    worker.release();
                    self.generation += 1;
                    self.tap.clear();
                    SourceEvent::Failed(e)
                }
            });
        }

        None
    }

    fn ensure_idle(&self) -> Result<(), SourceError> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(SourceError::Conflict)
        }
    }

    fn spawn<F>(
        &mut self,
        kind: SourceKind,
        finished: Arc<AtomicBool>,
        job: F,
    ) -> Result<(), SourceError>
    where
        F: FnOnce(&AtomicBool) -> Result<Option<OpenedStream>, SourceError> + Send + 'static,
    {
        self.generation += 1;
        let generation = self.generation;
        let results_tx = self.results_tx.clone();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled_worker = Arc::clone(&cancelled);

        let handle = thread::Builder::new()
            .name(format!("{}-source", kind))
            .spawn(move || {
                let opened = match job(&cancelled_worker) {
                    Ok(Some(opened)) => opened,
                    Ok(None) => return,
                    Err(e) => {
                        let _ = results_tx.send(Acquisition {
                            generation,
                            result: Err(e),
                        });
                        return;
                    }
                };

                let info = StreamInfo {
                    device_name: opened.device_name.clone(),
                    sample_rate: opened.sample_rate,
                };

                // Stopped while acquiring: drop the stream, then report so
                // the stale result clears whatever it pushed into the tap
                if cancelled_worker.load(Ordering::Acquire) {
                    drop(opened);
                    let _ = results_tx.send(Acquisition {
                        generation,
                        result: Ok(info),
                    });
                    return;
                }

                if results_tx
                    .send(Acquisition {
                        generation,
                        result: Ok(info),
                    })
                    .is_err()
                {
                    return;
                }

                // Hold the stream until stop is requested or the adapter is dropped
                let _ = stop_rx.recv();
                drop(opened);
            })
            .map_err(|e| SourceError::DeviceAcquisition(format!("failed to spawn worker: {}", e)))?;

        log::debug!("Started {} acquisition (generation {})", kind, generation);
        self.active = Active::Pending {
            kind,
            worker: Worker {
                stop_tx,
                cancelled,
                _handle: handle,
            },
            finished,
        };
        Ok(())
    }
}

impl Drop for SourceAdapter {
    fn drop(&mut self) {
        self.stop();
    }
}
