//! Smoothed virtual camera.
//!
//! Consumes per-frame detections for one clip and emits a crop placement
//! per frame. The crop center follows the stabilized target through an
//! exponential low-pass filter instead of snapping, a subject drifting out
//! of the crop's inner safe region pulls the camera back at the same eased
//! rate, and detection dropouts hold the last smoothed center.

use tracing::debug;

use crate::config::TrackerConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{BoundingBox, CropPlacement, CropRect, Detection};
use crate::stabilizer::SpeakerStabilizer;

/// Virtual camera producing one 9:16 placement per frame.
pub struct SmoothedCameraman {
    config: TrackerConfig,
    frame_width: f64,
    frame_height: f64,
    crop_width: f64,
    crop_height: f64,
    /// Per-frame EMA weight derived from the configured time constant.
    alpha: f64,
    stabilizer: SpeakerStabilizer,
    /// Last smoothed crop center. `None` until the first detection.
    center: Option<(f64, f64)>,
}

impl SmoothedCameraman {
    /// Create a camera for one clip.
    pub fn new(
        config: TrackerConfig,
        frame_width: u32,
        frame_height: u32,
        fps: f64,
    ) -> TrackerResult<Self> {
        if frame_width == 0 || frame_height == 0 {
            return Err(TrackerError::InvalidFrameSize {
                width: frame_width,
                height: frame_height,
            });
        }
        if !(fps > 0.0) {
            return Err(TrackerError::InvalidConfig(format!("fps must be positive, got {}", fps)));
        }

        let fw = frame_width as f64;
        let fh = frame_height as f64;

        // Largest 9:16 rectangle that fits the source frame.
        let (crop_width, crop_height) = if fh * 9.0 / 16.0 <= fw {
            (fh * 9.0 / 16.0, fh)
        } else {
            (fw, fw * 16.0 / 9.0)
        };

        // alpha = 1 - e^(-dt/tau): per-frame weight of a first-order
        // low-pass filter with the configured time constant.
        let tau = config.smoothing_time_constant.max(f64::EPSILON);
        let alpha = 1.0 - (-1.0 / (fps * tau)).exp();

        let stabilizer = SpeakerStabilizer::new(&config);

        Ok(Self {
            config,
            frame_width: fw,
            frame_height: fh,
            crop_width,
            crop_height,
            alpha,
            stabilizer,
            center: None,
        })
    }

    /// Advance one frame and return its placement.
    pub fn track(&mut self, detections: &[Detection]) -> CropPlacement {
        if detections.is_empty() {
            self.stabilizer.observe(None);
            return self.hold_or_center();
        }

        if self.subjects_far_apart(detections) {
            // Letterboxed composition keeps everyone in frame; target
            // selection stays where it was for when subjects reconverge.
            return self.letterbox(detections);
        }

        let top = detections
            .iter()
            .max_by(|a, b| {
                a.activity_signal()
                    .partial_cmp(&b.activity_signal())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|d| d.track_id);

        let target_id = self.stabilizer.observe(top);
        let target = target_id.and_then(|id| detections.iter().find(|d| d.track_id == id));

        // The stabilized target can drop out for a frame while others are
        // still detected. Treat that like a dropout and hold.
        let Some(target) = target else {
            return self.hold_or_center();
        };

        let raw = (target.bbox.cx(), target.bbox.cy());
        let smoothed = match self.center {
            Some((cx, cy)) => (
                cx + self.alpha * (raw.0 - cx),
                cy + self.alpha * (raw.1 - cy),
            ),
            None => raw,
        };

        // The safe-zone pull goes through the same filter weight, so a
        // subject escaping the safe region draws the camera faster without
        // ever snapping it in one frame.
        let corrected = self.clamp_into_safe_zone(smoothed, &target.bbox);
        let eased = (
            smoothed.0 + self.alpha * (corrected.0 - smoothed.0),
            smoothed.1 + self.alpha * (corrected.1 - smoothed.1),
        );
        let clamped = self.clamp_to_frame(eased);
        self.center = Some(clamped);

        CropPlacement::Cropped(self.crop_at(clamped))
    }

    /// Hold the last smoothed center, or fall back to a centered static
    /// crop if the clip has had no detections at all.
    fn hold_or_center(&self) -> CropPlacement {
        let center = self
            .center
            .unwrap_or((self.frame_width / 2.0, self.frame_height / 2.0));
        CropPlacement::Cropped(self.crop_at(center))
    }

    fn subjects_far_apart(&self, detections: &[Detection]) -> bool {
        if detections.len() < 2 {
            return false;
        }

        let mut max_separation: f64 = 0.0;
        for i in 0..detections.len() {
            for j in (i + 1)..detections.len() {
                let dx = (detections[i].bbox.cx() - detections[j].bbox.cx()).abs();
                max_separation = max_separation.max(dx);
            }
        }

        max_separation / self.frame_width > self.config.far_apart_threshold
    }

    fn letterbox(&self, detections: &[Detection]) -> CropPlacement {
        let boxes: Vec<BoundingBox> = detections.iter().map(|d| d.bbox).collect();
        // Non-empty by construction, union is always Some.
        let combined = match BoundingBox::union(&boxes) {
            Some(b) => b,
            None => return self.hold_or_center(),
        };

        debug!(subjects = detections.len(), "Letterboxing far-apart subjects");

        let padded = combined.pad(combined.width * self.config.letterbox_padding);
        let x = padded.x.max(0.0);
        let y = padded.y.max(0.0);
        let width = padded.x2().min(self.frame_width) - x;
        let height = padded.y2().min(self.frame_height) - y;

        CropPlacement::Letterboxed(CropRect::new(
            x.round() as i32,
            y.round() as i32,
            width.round() as i32,
            height.round() as i32,
        ))
    }

    /// Center position that would put the subject's box just inside the
    /// crop's inner safe region; the caller eases toward it rather than
    /// jumping. A box larger than the safe region is centered instead.
    fn clamp_into_safe_zone(&self, center: (f64, f64), bbox: &BoundingBox) -> (f64, f64) {
        let inset_x = self.crop_width * self.config.safe_zone_inset;
        let inset_y = self.crop_height * self.config.safe_zone_inset;
        let safe_width = self.crop_width - 2.0 * inset_x;
        let safe_height = self.crop_height - 2.0 * inset_y;

        let cx = if bbox.width >= safe_width {
            bbox.cx()
        } else {
            let safe_left = center.0 - self.crop_width / 2.0 + inset_x;
            let safe_right = center.0 + self.crop_width / 2.0 - inset_x;
            if bbox.x < safe_left {
                center.0 - (safe_left - bbox.x)
            } else if bbox.x2() > safe_right {
                center.0 + (bbox.x2() - safe_right)
            } else {
                center.0
            }
        };

        let cy = if bbox.height >= safe_height {
            bbox.cy()
        } else {
            let safe_top = center.1 - self.crop_height / 2.0 + inset_y;
            let safe_bottom = center.1 + self.crop_height / 2.0 - inset_y;
            if bbox.y < safe_top {
                center.1 - (safe_top - bbox.y)
            } else if bbox.y2() > safe_bottom {
                center.1 + (bbox.y2() - safe_bottom)
            } else {
                center.1
            }
        };

        (cx, cy)
    }

    fn clamp_to_frame(&self, center: (f64, f64)) -> (f64, f64) {
        let half_w = self.crop_width / 2.0;
        let half_h = self.crop_height / 2.0;
        (
            center.0.max(half_w).min(self.frame_width - half_w),
            center.1.max(half_h).min(self.frame_height - half_h),
        )
    }

    fn crop_at(&self, center: (f64, f64)) -> CropRect {
        let width = self.crop_width.round() as i32;
        let height = self.crop_height.round() as i32;
        let x = (center.0 - self.crop_width / 2.0).round() as i32;
        let y = (center.1 - self.crop_height / 2.0).round() as i32;

        // Rounding can push the rect one pixel out of frame.
        let x = x.max(0).min(self.frame_width as i32 - width);
        let y = y.max(0).min(self.frame_height as i32 - height);

        CropRect::new(x, y, width, height)
    }
}
