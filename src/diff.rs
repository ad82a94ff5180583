//! Frame-to-frame change estimation.
//!
//! Compares consecutive RGBA frames using a subsampled grayscale luminance
//! difference. Full-resolution per-channel comparison is unnecessary for a
//! binary presence signal, so only every fourth pixel is examined and each
//! pixel is reduced to the mean of its color channels.

use crate::traits::FrameBuffer;

/// Examine every Nth pixel position (skip N-1 of every N).
pub const SAMPLE_STRIDE: usize = 4;

/// Fraction of sampled positions that must change for a tick to be
/// classified as motion.
const MOTION_AREA_RATIO: f64 = 0.001;

/// Result of comparing two frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeScore {
    /// Number of sampled positions whose luminance changed beyond the
    /// per-pixel threshold.
    pub changed: u32,
    /// Number of positions examined.
    pub sampled: u32,
}

impl ChangeScore {
    /// Whether this score classifies the tick as "motion present": more
    /// than 0.1% of the sampled positions changed.
    #[must_use]
    pub fn motion_present(&self) -> bool {
        f64::from(self.changed) > f64::from(self.sampled) * MOTION_AREA_RATIO
    }
}

/// Compares each new frame against the previous one.
///
/// Retains a single previous frame between ticks. The first frame after
/// (re)acquisition, and any frame whose dimensions differ from the retained
/// one, produce no score; the frame is stored and comparison resumes on the
/// next tick.
#[derive(Debug, Default)]
pub struct ChangeEstimator {
    previous: Option<FrameBuffer>,
}

impl ChangeEstimator {
    /// Create an estimator with no retained frame.
    #[must_use]
    pub const fn new() -> Self {
        Self { previous: None }
    }

    /// Compare `current` against the retained previous frame.
    ///
    /// Returns `None` when no comparison is possible (first frame, or a
    /// dimension change). `current` becomes the new previous frame either
    /// way.
    pub fn compare(&mut self, current: FrameBuffer, pixel_threshold: f32) -> Option<ChangeScore> {
        let score = match &self.previous {
            Some(previous) if previous.same_dimensions(&current) => {
                Some(count_changed(previous, &current, pixel_threshold))
            }
            _ => None,
        };
        self.previous = Some(current);
        score
    }

    /// Drop the retained frame, as on session teardown.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Whether a previous frame is currently retained.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

/// Count sampled positions whose luminance mean moved more than
/// `pixel_threshold` between the two buffers.
fn count_changed(previous: &FrameBuffer, current: &FrameBuffer, pixel_threshold: f32) -> ChangeScore {
    let prev_pixels = previous
        .data()
        .chunks_exact(FrameBuffer::SAMPLES_PER_PIXEL)
        .step_by(SAMPLE_STRIDE);
    let curr_pixels = current
        .data()
        .chunks_exact(FrameBuffer::SAMPLES_PER_PIXEL)
        .step_by(SAMPLE_STRIDE);

    let mut changed = 0u32;
    let mut sampled = 0u32;

    for (prev, curr) in prev_pixels.zip(curr_pixels) {
        sampled += 1;
        if (luminance(prev) - luminance(curr)).abs() > pixel_threshold {
            changed += 1;
        }
    }

    ChangeScore { changed, sampled }
}

/// Mean of the color channels; a cheap luminance proxy. Alpha is ignored.
fn luminance(rgba: &[u8]) -> f32 {
    let r = rgba.first().copied().unwrap_or(0);
    let g = rgba.get(1).copied().unwrap_or(0);
    let b = rgba.get(2).copied().unwrap_or(0);
    (f32::from(r) + f32::from(g) + f32::from(b)) / 3.0
}
