//! Engine lifecycle: camera acquisition, the tick pipeline, and event
//! delivery.
//!
//! `MotionEngine` owns the camera session exclusively. `enable` and
//! `disable` are idempotent, and `enable` always runs a full teardown
//! before re-acquiring, so at most one session and one tick pipeline exist
//! at any time. All methods take `&mut self`; nothing here can overlap.

use crate::diff::ChangeEstimator;
use crate::gate::{MotionEdge, MotionGate, Sensitivity};
use crate::sampler::FrameSampler;
use crate::traits::{CameraError, CameraProvider, CameraSession, Format};
use std::sync::mpsc::Sender;
use std::time::Instant;

/// An engine output, delivered over the event channel.
///
/// Motion edges are delivered exactly once per transition. A dropped
/// receiver discards events without disturbing the engine.
#[derive(Debug)]
pub enum MotionEvent {
    /// Motion was detected while idle.
    MotionStarted,
    /// A full quiet period elapsed after the last motion.
    MotionEnded,
    /// Camera acquisition failed; the engine stays disabled until the
    /// caller re-enables it.
    CameraError(CameraError),
}

/// Read-only description of the open camera session, for the view layer.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Card/device name.
    pub card: String,
    /// Driver name.
    pub driver: String,
    /// Negotiated capture format.
    pub format: Format,
    /// When the session was acquired.
    pub acquired_at: Instant,
}

/// Point-in-time engine snapshot for polling-style hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionStatus {
    /// Whether a camera session is open.
    pub enabled: bool,
    /// Whether the gate is currently in its active state.
    pub motion_active: bool,
    /// Current sensitivity.
    pub sensitivity: Sensitivity,
}

struct EngineSession<S: CameraSession> {
    sampler: FrameSampler<S>,
    estimator: ChangeEstimator,
    gate: MotionGate,
    info: SessionInfo,
}

/// The motion detection engine.
///
/// Drive it with `tick` once per display refresh (or any cadence; nothing
/// assumes a fixed interval) while enabled.
pub struct MotionEngine<P: CameraProvider> {
    provider: P,
    requested: Format,
    sensitivity: Sensitivity,
    events: Sender<MotionEvent>,
    session: Option<EngineSession<P::Session>>,
}

impl<P: CameraProvider> MotionEngine<P> {
    /// Create a disabled engine.
    pub fn new(
        provider: P,
        requested: Format,
        sensitivity: Sensitivity,
        events: Sender<MotionEvent>,
    ) -> Self {
        Self {
            provider,
            requested,
            sensitivity,
            events,
            session: None,
        }
    }

    /// Acquire a camera and start detecting.
    ///
    /// Any existing session is fully torn down first. On acquisition
    /// failure the engine stays disabled and a `CameraError` event is
    /// emitted, except for `Interrupted` (the acquisition was superseded
    /// by a rapid re-setup), which is swallowed.
    pub fn enable(&mut self) {
        self.disable();

        match self.provider.acquire(&self.requested) {
            Ok(session) => {
                let format = match session.format() {
                    Ok(format) => format,
                    Err(err) => {
                        self.report_failure(err);
                        return;
                    }
                };
                let info = SessionInfo {
                    card: session.capabilities().card.clone(),
                    driver: session.capabilities().driver.clone(),
                    format,
                    acquired_at: Instant::now(),
                };
                log::info!(
                    "camera session opened: {} at {}x{}",
                    info.card,
                    info.format.width,
                    info.format.height
                );
                self.session = Some(EngineSession {
                    sampler: FrameSampler::new(session),
                    estimator: ChangeEstimator::new(),
                    gate: MotionGate::new(),
                    info,
                });
            }
            Err(CameraError::Interrupted) => {
                log::debug!("camera acquisition superseded, ignoring");
            }
            Err(err) => self.report_failure(err),
        }
    }

    /// Stop detecting and release the camera. Idempotent; no events are
    /// delivered after this returns.
    pub fn disable(&mut self) {
        if self.session.take().is_some() {
            log::info!("camera session closed");
        }
    }

    /// Whether a camera session is open.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.session.is_some()
    }

    /// Run one sampling tick: capture, compare, decide, emit.
    ///
    /// Does nothing while disabled. `now` orders the quiet-period deadline;
    /// passing it in keeps the engine testable without sleeping.
    pub fn tick(&mut self, now: Instant) {
        let threshold = self.sensitivity.pixel_threshold();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        // An elapsed quiet period ends motion even on a tick with nothing
        // to compare.
        if let Some(edge) = session.gate.poll(now) {
            let _ = self.events.send(edge_event(edge));
        }

        match session.sampler.sample() {
            Ok(Some(frame)) => {
                if let Some(score) = session.estimator.compare(frame, threshold) {
                    let edge = session.gate.observe(score.motion_present(), now);
                    if let Some(edge) = edge {
                        let _ = self.events.send(edge_event(edge));
                    }
                }
            }
            Ok(None) => {}
            Err(err) => log::warn!("frame capture fault: {err}"),
        }
    }

    /// Change sensitivity; takes effect on the next tick, without
    /// re-acquiring the camera.
    pub fn set_sensitivity(&mut self, sensitivity: Sensitivity) {
        self.sensitivity = sensitivity;
    }

    /// Current sensitivity.
    #[must_use]
    pub const fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    /// Description of the open session, if any.
    #[must_use]
    pub fn session_info(&self) -> Option<&SessionInfo> {
        self.session.as_ref().map(|session| &session.info)
    }

    /// Read-only access to the open camera session, for direct live-video
    /// rendering by the view layer. Only the engine ever mutates it.
    #[must_use]
    pub fn session(&self) -> Option<&P::Session> {
        self.session
            .as_ref()
            .map(|session| session.sampler.session())
    }

    /// Point-in-time snapshot of the engine.
    #[must_use]
    pub fn status(&self) -> MotionStatus {
        MotionStatus {
            enabled: self.session.is_some(),
            motion_active: self
                .session
                .as_ref()
                .is_some_and(|session| session.gate.is_active()),
            sensitivity: self.sensitivity,
        }
    }

    fn report_failure(&self, err: CameraError) {
        log::warn!("camera acquisition failed: {err}");
        let _ = self.events.send(MotionEvent::CameraError(err));
    }
}

const fn edge_event(edge: MotionEdge) -> MotionEvent {
    match edge {
        MotionEdge::Started => MotionEvent::MotionStarted,
        MotionEdge::Ended => MotionEvent::MotionEnded,
    }
}
