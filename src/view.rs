//! Attendance capture view.
//!
//! The externally visible unit: owns the camera handle for its mounted
//! lifetime, wires operator start/stop intent to the polling session, and
//! renders the session's status line. Teardown releases the camera and
//! stops any running session on every exit path, including drop.

use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use log::{error, info};

use crate::camera::{CameraDevice, UsbCamera};
use crate::config::Config;
use crate::recognition::{HttpRecognizer, Recognizer};
use crate::session::{SessionController, SessionState, SessionStatus};

pub struct CaptureView {
    device: Option<Arc<dyn CameraDevice>>,
    controller: SessionController,
    recognizer: Arc<dyn Recognizer>,
}

impl CaptureView {
    pub fn new(tick_interval: Duration, recognizer: Arc<dyn Recognizer>) -> Self {
        Self {
            device: None,
            controller: SessionController::new(tick_interval),
            recognizer,
        }
    }

    /// Acquire the configured camera and build a view around it.
    ///
    /// Device errors (permission, absence) surface to the caller; there is
    /// no retry, the operator has to fix the camera and remount.
    pub async fn mount(config: &Config) -> Result<Self> {
        // Both the blocking HTTP client and the camera negotiate off the
        // async runtime.
        let blocking_config = config.clone();
        let (device, recognizer) =
            tokio::task::spawn_blocking(move || -> Result<(UsbCamera, HttpRecognizer)> {
                let recognizer = HttpRecognizer::new(&blocking_config)
                    .context("building recognition client failed")?;
                let device = UsbCamera::acquire(&blocking_config)
                    .context("camera acquisition failed")?;
                Ok((device, recognizer))
            })
            .await
            .context("camera acquisition task failed to join")??;
        info!("camera {} acquired", config.camera_index);

        let mut view = Self::new(config.tick_interval(), Arc::new(recognizer));
        view.attach_device(Arc::new(device));
        Ok(view)
    }

    pub fn attach_device(&mut self, device: Arc<dyn CameraDevice>) {
        self.device = Some(device);
    }

    /// Start is gated on an acquired device and no running session.
    pub async fn can_start(&self) -> bool {
        self.device.as_ref().is_some_and(|device| device.is_active())
            && self.controller.status().await != SessionStatus::Running
    }

    pub async fn can_stop(&self) -> bool {
        self.controller.status().await == SessionStatus::Running
    }

    pub async fn start_capture(&mut self) -> Result<()> {
        let device = match &self.device {
            Some(device) if device.is_active() => Arc::clone(device),
            _ => bail!("cannot start capture without an acquired camera"),
        };
        self.controller
            .start(device, Arc::clone(&self.recognizer))
            .await
    }

    pub async fn stop_capture(&mut self) -> Result<()> {
        self.controller.stop().await
    }

    pub async fn status(&self) -> SessionStatus {
        self.controller.status().await
    }

    pub async fn last_message(&self) -> String {
        self.controller.last_message().await
    }

    pub async fn snapshot(&self) -> SessionState {
        self.controller.snapshot().await
    }

    /// Unconditional teardown: stop the session and release the camera,
    /// regardless of state or an in-flight recognition attempt.
    pub async fn teardown(&mut self) {
        if let Err(err) = self.controller.stop().await {
            error!("session did not stop cleanly during teardown: {err:?}");
        }
        if let Some(device) = self.device.take() {
            device.release();
            info!("camera released");
        }
    }
}

impl Drop for CaptureView {
    fn drop(&mut self) {
        // Drop without an explicit teardown still cancels the ticker and
        // releases the camera; the detached loop task winds down on its own.
        self.controller.shutdown();
        if let Some(device) = self.device.take() {
            device.release();
        }
    }
}
