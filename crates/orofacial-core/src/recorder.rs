//! Recorder actor: the single writer for live sessions.
//!
//! `Recorder::new()` spawns a background tokio task that owns the
//! `SessionStore` and the `MetricsEngine`. Every frame and every control
//! action is a message on one channel, so session state is only ever mutated
//! from that task. `submit_frame()` is a channel send and never blocks the
//! detection callback.

use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{OrofacialError, Result};
use crate::landmarks::Landmark;
use crate::metrics::{FacialMetrics, MetricsEngine};
use crate::models::{Exercise, Session};
use crate::sessions::SessionStore;

/// Commands sent to the background task.
enum RecorderCommand {
    /// A new detection frame.
    Frame(Vec<Landmark>),
    Start {
        exercise: Exercise,
        reply: oneshot::Sender<Option<Session>>,
    },
    Pause(oneshot::Sender<bool>),
    Resume(oneshot::Sender<bool>),
    Stop(oneshot::Sender<Option<Session>>),
    Status(oneshot::Sender<RecorderStatus>),
    /// Finalize any active session and exit.
    Shutdown(oneshot::Sender<Option<Session>>),
}

/// Snapshot of the live state, for UI refresh.
#[derive(Debug, Clone, Default)]
pub struct RecorderStatus {
    pub session_id: Option<String>,
    pub paused: bool,
    pub elapsed_ms: u64,
    /// Percentage of the target duration, capped at 100.
    pub progress: f64,
    pub samples: usize,
    pub frames_seen: u64,
    pub last_metrics: Option<FacialMetrics>,
}

/// Handle to the recorder task.
///
/// The blocking methods (`start`, `pause`, `resume`, `stop`, `status`) wait
/// on the recorder's own runtime and must not be called from an async worker
/// thread; use the `*_async` variants there. Dropping the handle is safe in
/// either context.
pub struct Recorder {
    sender: mpsc::UnboundedSender<RecorderCommand>,
    /// Keeps the task alive; taken on drop.
    runtime: Option<Runtime>,
}

impl Recorder {
    pub fn new(sessions: SessionStore, engine: MetricsEngine) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("orofacial-recorder")
            .enable_all()
            .build()
            .map_err(|e| OrofacialError::Other(e.to_string()))?;

        let (sender, receiver) = mpsc::unbounded_channel::<RecorderCommand>();
        runtime.spawn(background_task(receiver, sessions, engine));
        info!("Recorder initialized");

        Ok(Self {
            sender,
            runtime: Some(runtime),
        })
    }

    /// Queue a frame. Non-blocking; frames sent after shutdown are dropped.
    pub fn submit_frame(&self, landmarks: Vec<Landmark>) {
        let _ = self.sender.send(RecorderCommand::Frame(landmarks));
    }

    pub fn start(&self, exercise: Exercise) -> Result<Option<Session>> {
        self.request(|reply| RecorderCommand::Start { exercise, reply })
    }

    pub fn pause(&self) -> Result<bool> {
        self.request(RecorderCommand::Pause)
    }

    pub fn resume(&self) -> Result<bool> {
        self.request(RecorderCommand::Resume)
    }

    pub fn stop(&self) -> Result<Option<Session>> {
        self.request(RecorderCommand::Stop)
    }

    pub fn status(&self) -> Result<RecorderStatus> {
        self.request(RecorderCommand::Status)
    }

    pub async fn start_async(&self, exercise: Exercise) -> Result<Option<Session>> {
        self.request_async(|reply| RecorderCommand::Start { exercise, reply })
            .await
    }

    pub async fn pause_async(&self) -> Result<bool> {
        self.request_async(RecorderCommand::Pause).await
    }

    pub async fn resume_async(&self) -> Result<bool> {
        self.request_async(RecorderCommand::Resume).await
    }

    pub async fn stop_async(&self) -> Result<Option<Session>> {
        self.request_async(RecorderCommand::Stop).await
    }

    pub async fn status_async(&self) -> Result<RecorderStatus> {
        self.request_async(RecorderCommand::Status).await
    }

    /// Send a command and block until the task replies. Frames queued earlier
    /// are processed first.
    fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RecorderCommand,
    ) -> Result<T> {
        let runtime = self.runtime.as_ref().ok_or(OrofacialError::ChannelClosed)?;
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .map_err(|_| OrofacialError::ChannelClosed)?;
        runtime.block_on(rx).map_err(|_| OrofacialError::ChannelClosed)
    }

    async fn request_async<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RecorderCommand,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .map_err(|_| OrofacialError::ChannelClosed)?;
        rx.await.map_err(|_| OrofacialError::ChannelClosed)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };
        // Best-effort: finalize an active session before the task exits.
        let (tx, rx) = oneshot::channel();
        let sent = self.sender.send(RecorderCommand::Shutdown(tx)).is_ok();
        let finish = move || {
            if sent {
                let _ = runtime
                    .block_on(async { tokio::time::timeout(Duration::from_secs(5), rx).await });
            }
        };

        // Blocking on (or dropping) a runtime panics inside another one.
        if tokio::runtime::Handle::try_current().is_ok() {
            if std::thread::Builder::new()
                .name("orofacial-recorder-shutdown".into())
                .spawn(finish)
                .is_err()
            {
                warn!("Could not spawn recorder shutdown thread");
            }
        } else {
            finish();
        }
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn background_task(
    mut receiver: mpsc::UnboundedReceiver<RecorderCommand>,
    mut sessions: SessionStore,
    engine: MetricsEngine,
) {
    let mut frames_seen: u64 = 0;
    let mut last_metrics: Option<FacialMetrics> = None;

    while let Some(cmd) = receiver.recv().await {
        match cmd {
            RecorderCommand::Frame(landmarks) => {
                frames_seen += 1;
                let metrics = engine.compute(&landmarks);
                sessions.record_sample(&metrics);
                last_metrics = Some(metrics);
            }
            RecorderCommand::Start { exercise, reply } => {
                let _ = reply.send(sessions.start_session(&exercise));
            }
            RecorderCommand::Pause(reply) => {
                let _ = reply.send(sessions.pause());
            }
            RecorderCommand::Resume(reply) => {
                let _ = reply.send(sessions.resume());
            }
            RecorderCommand::Stop(reply) => {
                let _ = reply.send(sessions.stop_session());
            }
            RecorderCommand::Status(reply) => {
                let _ = reply.send(RecorderStatus {
                    session_id: sessions.active_session_id().map(str::to_string),
                    paused: sessions.is_paused(),
                    elapsed_ms: sessions.elapsed_ms(),
                    progress: sessions.progress(),
                    samples: sessions.sample_count(),
                    frames_seen,
                    last_metrics,
                });
            }
            RecorderCommand::Shutdown(reply) => {
                let finalized = if sessions.is_active() {
                    warn!("Recorder shutting down with an active session, stopping it");
                    sessions.stop_session()
                } else {
                    None
                };
                let _ = reply.send(finalized);
                break;
            }
        }
    }
    debug!(frames_seen, "Recorder task exited");
}
