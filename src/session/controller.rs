//! Polling session controller.
//!
//! Owns the repeating-capture ticker and sequences sample → recognize →
//! outcome. Concurrency contract: at most one recognition request is in
//! flight per session; ticks that land while an attempt is pending are
//! dropped, never queued, so outcomes apply in issue order by construction.

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tokio::{sync::Mutex, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::camera::{self, CameraDevice, SampleError};
use crate::recognition::{RecognitionOutcome, Recognizer};

use super::{SessionState, SessionStatus};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    tick_interval: Duration,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SessionController {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            tick_interval,
            handle: None,
            cancel_token: None,
        }
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.lock().await.status
    }

    pub async fn last_message(&self) -> String {
        self.state.lock().await.last_message.clone()
    }

    /// Begin a polling session. Valid only when no loop task is live and
    /// the device is active; a session that ended (stopped or terminal
    /// outcome) can be started again.
    pub async fn start(
        &mut self,
        device: Arc<dyn CameraDevice>,
        recognizer: Arc<dyn Recognizer>,
    ) -> Result<()> {
        if let Some(handle) = &self.handle {
            if !handle.is_finished() {
                bail!("capture session already running");
            }
        }
        if !device.is_active() {
            bail!("cannot start a session without an active camera device");
        }

        let session_id = Uuid::new_v4().to_string();
        {
            let mut state = self.state.lock().await;
            state.begin(session_id.clone(), Utc::now());
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(polling_loop(
            session_id,
            Arc::clone(&self.state),
            device,
            recognizer,
            self.tick_interval,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Stop the session. Valid from any state and idempotent: cancels the
    /// ticker synchronously, marks the session stopped, then waits for the
    /// loop task to wind down. An attempt still in flight finishes on the
    /// blocking pool and its outcome is discarded.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.state.lock().await.stop();

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("polling loop task failed to join")?;
        }
        Ok(())
    }

    /// Synchronous teardown for drop paths: cancel the ticker and detach
    /// the loop task. The loop marks the session stopped on its way out.
    pub fn shutdown(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.handle.take();
    }
}

async fn polling_loop(
    session_id: String,
    state: Arc<Mutex<SessionState>>,
    device: Arc<dyn CameraDevice>,
    recognizer: Arc<dyn Recognizer>,
    tick_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                {
                    let mut guard = state.lock().await;
                    if guard.status != SessionStatus::Running {
                        break;
                    }
                    if guard.pending_attempt {
                        // Never queue a second concurrent attempt.
                        log_warn!("session {session_id}: tick dropped, attempt still in flight");
                        continue;
                    }
                    guard.pending_attempt = true;
                }

                let attempt = tokio::task::spawn_blocking({
                    let device = Arc::clone(&device);
                    let recognizer = Arc::clone(&recognizer);
                    move || run_attempt(device.as_ref(), recognizer.as_ref())
                });

                let joined = tokio::select! {
                    joined = attempt => joined,
                    _ = cancel_token.cancelled() => {
                        // The in-flight request finishes on the blocking
                        // pool; nobody applies its outcome.
                        let mut guard = state.lock().await;
                        guard.pending_attempt = false;
                        guard.stop();
                        log_info!("session {session_id}: stopped with an attempt in flight, outcome discarded");
                        break;
                    }
                };

                let attempt_result = match joined {
                    Ok(result) => result,
                    Err(err) => {
                        log_error!("session {session_id}: attempt worker failed to join: {err}");
                        state.lock().await.pending_attempt = false;
                        continue;
                    }
                };

                let mut guard = state.lock().await;
                guard.pending_attempt = false;
                if guard.status != SessionStatus::Running {
                    log_info!("session {session_id}: stale outcome discarded");
                    break;
                }
                match attempt_result {
                    Attempt::Outcome(outcome) => {
                        guard.record_message(outcome.operator_message());
                        if outcome.is_terminal() {
                            guard.stop();
                            log_info!("session {session_id}: {} — session stopped", guard.last_message);
                            break;
                        }
                        log_info!("session {session_id}: {}", guard.last_message);
                    }
                    Attempt::DeviceNotReady => {
                        // No current frame yet; retry on the next tick.
                        log::debug!("session {session_id}: device not ready, tick skipped");
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                state.lock().await.stop();
                log_info!("session {session_id}: polling loop shutting down");
                break;
            }
        }
    }
}

enum Attempt {
    Outcome(RecognitionOutcome),
    DeviceNotReady,
}

/// One sample-and-recognize cycle. Blocking; runs on the blocking pool.
/// Sample and transport failures fold into `Failed` outcomes so every
/// failure path reaches the operator, except a momentarily-inactive device,
/// which just skips the tick.
fn run_attempt(device: &dyn CameraDevice, recognizer: &dyn Recognizer) -> Attempt {
    let frame = match camera::sample(device) {
        Ok(frame) => frame,
        Err(SampleError::DeviceInactive) => return Attempt::DeviceNotReady,
        Err(err) => return Attempt::Outcome(RecognitionOutcome::Failed(err.to_string())),
    };

    match recognizer.recognize(&frame) {
        Ok(outcome) => Attempt::Outcome(outcome),
        Err(err) => Attempt::Outcome(RecognitionOutcome::Failed(err.to_string())),
    }
}
