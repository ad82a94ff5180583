//! Per-tick frame sampling and decode.
//!
//! The sampler owns the camera session and a reusable decode surface. Each
//! tick it takes the newest raw frame, re-checks the camera's reported
//! resolution, resizes the surface to match, and decodes YUYV into an RGBA
//! `FrameBuffer`. Anything that is merely not ready yet (no frame, zero
//! dimensions, short payload) yields `Ok(None)` and the tick is skipped.

use crate::traits::{yuv_to_rgb, CameraError, CameraSession, FourCC, FrameBuffer, Result};

// YUYV packs two pixels into four bytes.
const RAW_BYTES_PER_PIXEL: usize = 2;

/// Pulls and decodes camera frames on a display-cadence tick.
pub struct FrameSampler<S: CameraSession> {
    session: S,
    surface: Vec<u8>,
}

impl<S: CameraSession> FrameSampler<S> {
    /// Wrap an acquired session.
    pub fn new(session: S) -> Self {
        Self {
            session,
            surface: Vec::new(),
        }
    }

    /// Read-only access to the underlying session.
    pub const fn session(&self) -> &S {
        &self.session
    }

    /// Capture and decode the newest available frame.
    ///
    /// Returns `Ok(None)` when the camera has nothing usable this tick.
    pub fn sample(&mut self) -> Result<Option<FrameBuffer>> {
        let format = self.session.format()?;
        if format.width == 0 || format.height == 0 {
            return Ok(None);
        }
        if format.fourcc != FourCC::YUYV {
            return Err(CameraError::FormatNotSupported(format));
        }

        let Some(frame) = self.session.poll_frame()? else {
            return Ok(None);
        };

        let pixel_count = format.width as usize * format.height as usize;
        let Some(raw) = frame.data.get(..pixel_count * RAW_BYTES_PER_PIXEL) else {
            // Short payload, e.g. captured just before a resolution change.
            return Ok(None);
        };

        self.surface
            .resize(pixel_count * FrameBuffer::SAMPLES_PER_PIXEL, 0);
        decode_yuyv(raw, &mut self.surface);

        Ok(FrameBuffer::new(
            format.width,
            format.height,
            self.surface.clone(),
        ))
    }
}

/// Decode packed YUYV into RGBA. `rgba` must hold four bytes per pixel.
fn decode_yuyv(raw: &[u8], rgba: &mut [u8]) {
    // Each [Y0 U Y1 V] quad decodes to two RGBA pixels sharing chroma.
    for (src, dst) in raw.chunks_exact(4).zip(rgba.chunks_exact_mut(8)) {
        if let ([y0, u, y1, v], [r0, g0, b0, a0, r1, g1, b1, a1]) = (src, dst) {
            let (r, g, b) = yuv_to_rgb(*y0, *u, *v);
            *r0 = r;
            *g0 = g;
            *b0 = b;
            *a0 = 255;

            let (r, g, b) = yuv_to_rgb(*y1, *u, *v);
            *r1 = r;
            *g1 = g;
            *b1 = b;
            *a1 = 255;
        }
    }
}
