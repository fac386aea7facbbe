use std::io::Cursor;

use chrono::{DateTime, Utc};
use image::{ImageBuffer, Rgb};

use super::{CameraDevice, RawFrame, SampleError};

/// Immutable encoded frame. Produced once per tick, handed to the
/// recognition client exactly once, then discarded.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub png: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

/// Grab the device's current frame and encode it as PNG.
///
/// The raster buffer is sized from the dimensions of this particular grab,
/// so a device that renegotiates resolution between ticks is picked up on
/// the very next call. No retries and no session state here.
pub fn sample(device: &dyn CameraDevice) -> Result<CapturedFrame, SampleError> {
    let RawFrame {
        width,
        height,
        rgb,
        captured_at,
    } = device.grab()?;

    let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, rgb)
        .ok_or_else(|| {
            SampleError::Encode(format!("frame buffer does not match {width}x{height}"))
        })?;

    let mut png = Vec::new();
    buffer
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|err| SampleError::Encode(err.to_string()))?;

    Ok(CapturedFrame { png, captured_at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fake device that serves a scripted sequence of frames.
    struct ScriptedDevice {
        frames: Mutex<Vec<Result<RawFrame, SampleError>>>,
    }

    impl ScriptedDevice {
        fn new(frames: Vec<Result<RawFrame, SampleError>>) -> Self {
            let mut frames = frames;
            frames.reverse();
            Self {
                frames: Mutex::new(frames),
            }
        }
    }

    impl CameraDevice for ScriptedDevice {
        fn grab(&self) -> Result<RawFrame, SampleError> {
            self.frames
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(SampleError::DeviceInactive))
        }

        fn release(&self) {}

        fn is_active(&self) -> bool {
            true
        }
    }

    fn rgb_frame(width: u32, height: u32) -> RawFrame {
        RawFrame {
            width,
            height,
            rgb: vec![128; (width * height * 3) as usize],
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn encodes_current_frame_as_png() {
        let device = ScriptedDevice::new(vec![Ok(rgb_frame(4, 2))]);
        let frame = sample(&device).unwrap();
        assert_eq!(&frame.png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn uses_dimensions_of_each_grab() {
        let device = ScriptedDevice::new(vec![Ok(rgb_frame(4, 2)), Ok(rgb_frame(8, 6))]);

        let first = sample(&device).unwrap();
        let second = sample(&device).unwrap();

        let first = image::load_from_memory(&first.png).unwrap().to_rgb8();
        let second = image::load_from_memory(&second.png).unwrap().to_rgb8();
        assert_eq!(first.dimensions(), (4, 2));
        assert_eq!(second.dimensions(), (8, 6));
    }

    #[test]
    fn inactive_device_passes_through() {
        let device = ScriptedDevice::new(vec![Err(SampleError::DeviceInactive)]);
        assert!(matches!(
            sample(&device),
            Err(SampleError::DeviceInactive)
        ));
    }

    #[test]
    fn mismatched_buffer_is_an_encode_error() {
        let device = ScriptedDevice::new(vec![Ok(RawFrame {
            width: 10,
            height: 10,
            rgb: vec![0; 3], // far too small for 10x10
            captured_at: Utc::now(),
        })]);
        assert!(matches!(sample(&device), Err(SampleError::Encode(_))));
    }
}
