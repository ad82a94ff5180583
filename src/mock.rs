//! Mock camera implementation for testing without hardware.

use crate::traits::{
    CameraError, CameraProvider, CameraSession, DeviceCapabilities, Format, Frame, FrameMetadata,
    Result,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One scripted tick of a mock session.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// A full frame with every luma sample set to the given value and
    /// neutral chroma (decodes to a solid gray).
    SolidLuma(u8),
    /// A frame with exactly these raw YUYV bytes.
    RawFrame(Vec<u8>),
    /// No frame available this tick.
    NotReady,
    /// Switch the reported format; the tick itself yields no frame.
    SetFormat(Format),
    /// A streaming fault.
    Fault(&'static str),
}

/// Scripted camera session for testing.
pub struct MockSession {
    capabilities: DeviceCapabilities,
    format: Format,
    steps: VecDeque<ScriptStep>,
    frame_count: u32,
}

impl MockSession {
    /// Create a session reporting the given format, with an empty script.
    #[must_use]
    pub fn new(format: Format) -> Self {
        Self {
            capabilities: DeviceCapabilities {
                driver: "mock".to_owned(),
                card: "Mock Camera".to_owned(),
                bus_info: "mock:0".to_owned(),
                can_capture: true,
                can_stream: true,
            },
            format,
            steps: VecDeque::new(),
            frame_count: 0,
        }
    }

    /// Set the scripted ticks for this session.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<ScriptStep>) -> Self {
        self.steps = steps.into();
        self
    }

    /// Append one scripted tick.
    pub fn push_step(&mut self, step: ScriptStep) {
        self.steps.push_back(step);
    }

    fn make_frame(&mut self, data: Vec<u8>) -> Frame {
        let sequence = self.frame_count;
        self.frame_count += 1;
        #[allow(clippy::cast_possible_truncation)]
        let bytes_used = data.len() as u32;
        Frame {
            data,
            metadata: FrameMetadata {
                sequence,
                timestamp: Duration::from_millis(u64::from(sequence) * 33), // ~30fps
                bytes_used,
            },
        }
    }
}

impl CameraSession for MockSession {
    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn format(&self) -> Result<Format> {
        Ok(self.format.clone())
    }

    fn poll_frame(&mut self) -> Result<Option<Frame>> {
        match self.steps.pop_front() {
            Some(ScriptStep::SolidLuma(luma)) => {
                let data = generate_solid_yuyv(&self.format, luma);
                Ok(Some(self.make_frame(data)))
            }
            Some(ScriptStep::RawFrame(data)) => Ok(Some(self.make_frame(data))),
            Some(ScriptStep::SetFormat(format)) => {
                self.format = format;
                Ok(None)
            }
            Some(ScriptStep::Fault(msg)) => Err(CameraError::StreamError(msg.to_owned())),
            Some(ScriptStep::NotReady) | None => Ok(None),
        }
    }
}

/// Generate a solid YUYV frame with neutral chroma.
fn generate_solid_yuyv(format: &Format, luma: u8) -> Vec<u8> {
    let size = (format.width * format.height * 2) as usize;
    let mut data = vec![0u8; size];
    for quad in data.chunks_exact_mut(4) {
        if let [y0, u, y1, v] = quad {
            *y0 = luma;
            *u = 128;
            *y1 = luma;
            *v = 128;
        }
    }
    data
}

/// One scripted `acquire` outcome.
pub enum AcquireOutcome {
    /// Hand out this session.
    Session(MockSession),
    /// Acquisition superseded by a rapid re-setup.
    Interrupted,
    /// Acquisition failed outright.
    Fail(&'static str),
}

/// Scripted camera provider for testing the lifecycle controller.
#[derive(Default)]
pub struct MockProvider {
    outcomes: VecDeque<AcquireOutcome>,
    acquire_count: Arc<AtomicU32>,
}

impl MockProvider {
    /// Create a provider with no scripted outcomes; `acquire` fails until
    /// outcomes are queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the acquisition counter; usable after the provider has
    /// moved into an engine.
    #[must_use]
    pub fn acquire_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.acquire_count)
    }

    /// Queue an acquisition outcome.
    #[must_use]
    pub fn with_outcome(mut self, outcome: AcquireOutcome) -> Self {
        self.outcomes.push_back(outcome);
        self
    }

    /// Queue a session whose every tick yields a solid frame of the given
    /// luma values, in order.
    #[must_use]
    pub fn with_solid_session(self, format: &Format, lumas: &[u8]) -> Self {
        let steps = lumas.iter().copied().map(ScriptStep::SolidLuma).collect();
        self.with_outcome(AcquireOutcome::Session(
            MockSession::new(format.clone()).with_steps(steps),
        ))
    }
}

impl CameraProvider for MockProvider {
    type Session = MockSession;

    fn acquire(&mut self, _requested: &Format) -> Result<MockSession> {
        self.acquire_count.fetch_add(1, Ordering::Relaxed);
        match self.outcomes.pop_front() {
            Some(AcquireOutcome::Session(session)) => Ok(session),
            Some(AcquireOutcome::Interrupted) => Err(CameraError::Interrupted),
            Some(AcquireOutcome::Fail(msg)) => Err(CameraError::DeviceOpenFailed(msg.to_owned())),
            None => Err(CameraError::DeviceOpenFailed("script exhausted".to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::FourCC;

    #[test]
    fn test_mock_session_reports_capabilities() {
        let session = MockSession::new(Format::new(640, 480, FourCC::YUYV));
        assert_eq!(session.capabilities().driver, "mock");
        assert!(session.capabilities().can_capture);
        assert!(session.capabilities().can_stream);
    }

    #[test]
    fn test_solid_frames_have_incrementing_sequence() {
        let mut session = MockSession::new(Format::new(64, 48, FourCC::YUYV))
            .with_steps(vec![ScriptStep::SolidLuma(10), ScriptStep::SolidLuma(20)]);

        let first = session
            .poll_frame()
            .expect("no fault")
            .expect("frame scripted");
        let second = session
            .poll_frame()
            .expect("no fault")
            .expect("frame scripted");

        assert_eq!(first.metadata.sequence, 0);
        assert_eq!(second.metadata.sequence, 1);
        assert_eq!(first.data.len(), 64 * 48 * 2);
    }

    #[test]
    fn test_exhausted_script_reads_as_not_ready() {
        let mut session = MockSession::new(Format::new(64, 48, FourCC::YUYV));
        assert!(session.poll_frame().expect("no fault").is_none());
    }

    #[test]
    fn test_solid_yuyv_layout() {
        let data = generate_solid_yuyv(&Format::new(8, 2, FourCC::YUYV), 42);
        assert_eq!(data.len(), 8 * 2 * 2);
        for quad in data.chunks_exact(4) {
            assert_eq!(quad, &[42, 128, 42, 128]);
        }
    }

    #[test]
    fn test_provider_scripted_outcomes_in_order() {
        let format = Format::new(64, 48, FourCC::YUYV);
        let mut provider = MockProvider::new()
            .with_outcome(AcquireOutcome::Interrupted)
            .with_solid_session(&format, &[10]);
        let counter = provider.acquire_counter();

        assert!(matches!(
            provider.acquire(&format),
            Err(CameraError::Interrupted)
        ));
        assert!(provider.acquire(&format).is_ok());
        assert_eq!(counter.load(Ordering::Relaxed), 2);
    }
}
