//! Capture device handle.
//!
//! `nokhwa::Camera` is `!Send`, so the acquired camera lives on a dedicated
//! worker thread; the `UsbCamera` handle talks to it over a command channel.
//! Dropping the channel is the release: the worker stops the stream and
//! exits, which turns the physical camera indicator off.

use std::sync::{
    mpsc::{self, Receiver, Sender},
    Mutex,
};
use std::thread;

use chrono::Utc;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
    Camera,
};
use thiserror::Error;

use crate::config::Config;

use super::{RawFrame, SampleError};

/// Why acquisition failed. Fatal to starting a session; never retried.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("camera access denied: {0}")]
    PermissionDenied(String),
    #[error("no camera device available: {0}")]
    NoDevice(String),
    #[error("camera backend error: {0}")]
    Backend(String),
}

/// A live video input. The view owns the handle; the polling session only
/// borrows it to grab frames.
pub trait CameraDevice: Send + Sync {
    /// Decode the device's current frame. Blocking.
    fn grab(&self) -> Result<RawFrame, SampleError>;

    /// Stop the underlying stream. Idempotent: releasing an already
    /// released handle is a no-op, never an error.
    fn release(&self);

    fn is_active(&self) -> bool;
}

enum DeviceCommand {
    Grab(Sender<Result<RawFrame, SampleError>>),
}

/// Real webcam handle backed by nokhwa.
pub struct UsbCamera {
    cmd_tx: Mutex<Option<Sender<DeviceCommand>>>,
}

impl UsbCamera {
    /// Open the configured camera and start streaming.
    ///
    /// Blocks while the backend negotiates a format; call from a blocking
    /// context (`spawn_blocking`) when inside the runtime.
    pub fn acquire(config: &Config) -> Result<Self, DeviceError> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let index = config.camera_index;
        let width = config.frame_width;
        let height = config.frame_height;

        thread::Builder::new()
            .name("camera-device".into())
            .spawn(move || device_worker(index, width, height, ready_tx, cmd_rx))
            .map_err(|err| DeviceError::Backend(format!("spawn camera worker: {err}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                cmd_tx: Mutex::new(Some(cmd_tx)),
            }),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(DeviceError::Backend(
                "camera worker exited during startup".into(),
            )),
        }
    }
}

impl CameraDevice for UsbCamera {
    fn grab(&self) -> Result<RawFrame, SampleError> {
        let cmd_tx = match self.cmd_tx.lock() {
            Ok(guard) => (*guard).clone(),
            Err(_) => return Err(SampleError::Grab("device handle poisoned".into())),
        };
        let Some(cmd_tx) = cmd_tx else {
            return Err(SampleError::DeviceInactive);
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        cmd_tx
            .send(DeviceCommand::Grab(reply_tx))
            .map_err(|_| SampleError::DeviceInactive)?;
        reply_rx
            .recv()
            .map_err(|_| SampleError::Grab("camera worker stopped mid-grab".into()))?
    }

    fn release(&self) {
        if let Ok(mut guard) = self.cmd_tx.lock() {
            guard.take();
        }
    }

    fn is_active(&self) -> bool {
        self.cmd_tx.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }
}

impl Drop for UsbCamera {
    fn drop(&mut self) {
        self.release();
    }
}

fn device_worker(
    index: u32,
    width: u32,
    height: u32,
    ready_tx: Sender<Result<(), DeviceError>>,
    cmd_rx: Receiver<DeviceCommand>,
) {
    let mut cam = match open_camera(index, width, height) {
        Ok(cam) => cam,
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return;
        }
    };

    if ready_tx.send(Ok(())).is_err() {
        let _ = cam.stop_stream();
        return;
    }

    // Serve grabs until every handle is gone or released.
    while let Ok(DeviceCommand::Grab(reply)) = cmd_rx.recv() {
        let _ = reply.send(grab_frame(&mut cam));
    }

    if let Err(err) = cam.stop_stream() {
        log::warn!("camera stream did not stop cleanly: {err}");
    }
}

fn open_camera(index: u32, width: u32, height: u32) -> Result<Camera, DeviceError> {
    let idx = CameraIndex::Index(index);

    let fmt = CameraFormat::new(
        Resolution::new(width, height),
        FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
        30,
    );
    let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

    let mut cam = Camera::new(idx, req).map_err(|err| classify_open_error(&err.to_string()))?;
    cam.open_stream()
        .map_err(|err| classify_open_error(&err.to_string()))?;
    Ok(cam)
}

/// nokhwa reports platform failures as strings; sort them into the fatal
/// acquisition taxonomy the operator sees.
fn classify_open_error(message: &str) -> DeviceError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        DeviceError::PermissionDenied(message.into())
    } else if lower.contains("not found")
        || lower.contains("no device")
        || lower.contains("no such")
        || lower.contains("cannot find")
    {
        DeviceError::NoDevice(message.into())
    } else {
        DeviceError::Backend(message.into())
    }
}

fn grab_frame(cam: &mut Camera) -> Result<RawFrame, SampleError> {
    let frame = cam
        .frame()
        .map_err(|err| SampleError::Grab(format!("fetch frame: {err}")))?;
    let rgb = frame
        .decode_image::<RgbFormat>()
        .map_err(|err| SampleError::Grab(format!("decode RGB: {err}")))?;

    let (width, height) = rgb.dimensions();
    Ok(RawFrame {
        width,
        height,
        rgb: rgb.into_raw(),
        captured_at: Utc::now(),
    })
}
