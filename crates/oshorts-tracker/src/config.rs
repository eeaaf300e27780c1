//! Configuration for the subject tracker.

use serde::{Deserialize, Serialize};

/// Tunable parameters for crop smoothing and target stabilization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    // === Camera Smoothing ===
    /// Time constant of the low-pass filter on the crop center, in seconds.
    /// Larger values mean a lazier camera (default: 0.35)
    pub smoothing_time_constant: f64,

    // === Speaker Stabilization ===
    /// Consecutive frames a challenger must hold the top activity signal
    /// before the framing target switches (default: 15)
    pub min_stable_frames: u32,

    /// Frames after a switch during which further switches are suppressed
    /// (default: 30)
    pub cooldown_frames: u32,

    // === Multi-Subject Handling ===
    /// Horizontal separation between subjects, as a fraction of frame width,
    /// beyond which framing switches to a letterboxed composition
    /// (default: 0.4)
    pub far_apart_threshold: f64,

    /// Padding around the combined subject region in letterboxed mode, as a
    /// fraction of that region's width (default: 0.1)
    pub letterbox_padding: f64,

    // === Safe Zone ===
    /// Inset of the safe region from each crop edge, as a fraction of the
    /// crop dimension. The tracked subject's box is kept inside this inner
    /// region, not merely inside the crop (default: 0.1)
    pub safe_zone_inset: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            smoothing_time_constant: 0.35,
            min_stable_frames: 15,
            cooldown_frames: 30,
            far_apart_threshold: 0.4,
            letterbox_padding: 0.1,
            safe_zone_inset: 0.1,
        }
    }
}
