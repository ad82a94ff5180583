//! V4L2 camera implementation using the v4l crate.

use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream as V4lCaptureStream;
use v4l::video::Capture;
use v4l::Device;

use crate::traits::{
    CameraError, CameraProvider, CameraSession, DeviceCapabilities, Format, FourCC, Frame,
    FrameMetadata, Result,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

const STREAM_BUFFER_COUNT: u32 = 4;

// Highest /dev/video index probed when auto-selecting a camera.
const PROBE_LIMIT: u32 = 10;

/// Acquires V4L2 cameras, either a fixed device node or the first
/// capture-capable one found.
pub struct V4L2Provider {
    index: Option<u32>,
}

impl V4L2Provider {
    /// Provider for a specific device index (e.g., 0 for /dev/video0).
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self { index: Some(index) }
    }

    /// Provider that probes for the first capture-capable device.
    #[must_use]
    pub const fn auto() -> Self {
        Self { index: None }
    }

    fn open_device(&self) -> Result<(Device, DeviceCapabilities)> {
        match self.index {
            Some(index) => open_at(index),
            None => {
                for index in 0..PROBE_LIMIT {
                    if let Ok((device, capabilities)) = open_at(index) {
                        if capabilities.can_capture && capabilities.can_stream {
                            return Ok((device, capabilities));
                        }
                    }
                }
                Err(CameraError::NoDevice)
            }
        }
    }
}

impl CameraProvider for V4L2Provider {
    type Session = V4L2Session;

    fn acquire(&mut self, requested: &Format) -> Result<V4L2Session> {
        let (device, capabilities) = self.open_device()?;

        if !capabilities.can_capture || !capabilities.can_stream {
            return Err(CameraError::DeviceOpenFailed(format!(
                "{} cannot stream video",
                capabilities.card
            )));
        }

        let format = negotiate_format(&device, requested)?;
        if format.fourcc != FourCC::YUYV {
            return Err(CameraError::FormatNotSupported(format));
        }

        log::debug!(
            "acquired {} at {}x{}",
            capabilities.card,
            format.width,
            format.height
        );

        V4L2Session::start(device, capabilities, format)
    }
}

fn open_at(index: u32) -> Result<(Device, DeviceCapabilities)> {
    let device = Device::new(index as usize).map_err(open_error)?;

    let caps = device.query_caps().map_err(open_error)?;

    let capabilities = DeviceCapabilities {
        driver: caps.driver,
        card: caps.card,
        bus_info: caps.bus,
        can_capture: caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE),
        can_stream: caps.capabilities.contains(v4l::capability::Flags::STREAMING),
    };

    Ok((device, capabilities))
}

fn open_error(err: std::io::Error) -> CameraError {
    if err.kind() == std::io::ErrorKind::Interrupted {
        CameraError::Interrupted
    } else {
        CameraError::DeviceOpenFailed(err.to_string())
    }
}

fn negotiate_format(device: &Device, requested: &Format) -> Result<Format> {
    let mut fmt = device
        .format()
        .map_err(|err| CameraError::StreamError(err.to_string()))?;

    fmt.width = requested.width;
    fmt.height = requested.height;
    fmt.fourcc = requested.fourcc.into();

    let fmt = device
        .set_format(&fmt)
        .map_err(|err| CameraError::StreamError(err.to_string()))?;

    Ok(Format {
        width: fmt.width,
        height: fmt.height,
        fourcc: FourCC::from(fmt.fourcc),
        stride: fmt.stride,
        size: fmt.size,
    })
}

struct SharedSlot {
    frame: Option<Frame>,
    fault: Option<String>,
}

/// An open V4L2 camera session.
///
/// The mmap capture stream blocks per frame, so a worker thread pumps it
/// into a latest-frame slot; `poll_frame` takes from the slot without
/// blocking the tick loop. Dropping the session stops the worker and
/// releases the device.
pub struct V4L2Session {
    capabilities: DeviceCapabilities,
    format: Format,
    slot: Arc<Mutex<SharedSlot>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl V4L2Session {
    fn start(device: Device, capabilities: DeviceCapabilities, format: Format) -> Result<Self> {
        let slot = Arc::new(Mutex::new(SharedSlot {
            frame: None,
            fault: None,
        }));
        let stop = Arc::new(AtomicBool::new(false));

        let worker = std::thread::Builder::new()
            .name("motion-gate-capture".to_owned())
            .spawn({
                let slot = Arc::clone(&slot);
                let stop = Arc::clone(&stop);
                move || capture_loop(&device, &slot, &stop)
            })
            .map_err(|err| CameraError::StreamError(err.to_string()))?;

        Ok(Self {
            capabilities,
            format,
            slot,
            stop,
            worker: Some(worker),
        })
    }
}

impl CameraSession for V4L2Session {
    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn format(&self) -> Result<Format> {
        Ok(self.format.clone())
    }

    fn poll_frame(&mut self) -> Result<Option<Frame>> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| CameraError::StreamError("capture worker poisoned".to_owned()))?;

        if let Some(fault) = slot.fault.take() {
            return Err(CameraError::StreamError(fault));
        }

        Ok(slot.frame.take())
    }
}

impl Drop for V4L2Session {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("camera capture worker panicked");
            }
        }
    }
}

fn capture_loop(device: &Device, slot: &Mutex<SharedSlot>, stop: &AtomicBool) {
    let mut stream = match Stream::with_buffers(device, Type::VideoCapture, STREAM_BUFFER_COUNT) {
        Ok(stream) => stream,
        Err(err) => {
            record_fault(slot, &err.to_string());
            return;
        }
    };

    while !stop.load(Ordering::Relaxed) {
        match stream.next() {
            Ok((buf, meta)) => {
                // Safe conversions: V4L2 timestamps are always non-negative in practice
                #[allow(clippy::cast_sign_loss)]
                let secs = meta.timestamp.sec.max(0) as u64;
                #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
                let nanos = (meta.timestamp.usec.max(0) as u32).saturating_mul(1000);

                let frame = Frame {
                    data: buf.to_vec(),
                    metadata: FrameMetadata {
                        sequence: meta.sequence,
                        timestamp: Duration::new(secs, nanos),
                        bytes_used: meta.bytesused,
                    },
                };

                // Replace any frame the tick loop has not consumed yet; the
                // sampler only ever wants the newest one.
                if let Ok(mut slot) = slot.lock() {
                    slot.frame = Some(frame);
                }
            }
            Err(err) => {
                if !stop.load(Ordering::Relaxed) {
                    record_fault(slot, &err.to_string());
                }
                break;
            }
        }
    }
}

fn record_fault(slot: &Mutex<SharedSlot>, message: &str) {
    if let Ok(mut slot) = slot.lock() {
        slot.fault = Some(message.to_owned());
    }
}
