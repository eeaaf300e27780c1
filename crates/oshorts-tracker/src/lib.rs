//! Subject tracking for vertical reframing.
//!
//! Converts noisy per-frame subject detections into a stable 9:16 crop
//! trajectory. Two cooperating pieces:
//!
//! - [`SpeakerStabilizer`] picks which identity to frame. A challenger must
//!   hold the top activity signal for a consecutive-frame window before the
//!   target switches, and every switch opens a cooldown window that
//!   suppresses further switches.
//! - [`SmoothedCameraman`] turns the chosen subject into a crop placement:
//!   low-pass filtered center, safe-zone clamping, hold-last-center on
//!   detection dropouts, and a letterboxed composition when subjects sit
//!   too far apart for a single crop.
//!
//! All state is per-clip and discarded once the clip's frames are planned.

mod cameraman;
mod config;
mod error;
mod models;
mod stabilizer;

pub use cameraman::SmoothedCameraman;
pub use config::TrackerConfig;
pub use error::{TrackerError, TrackerResult};
pub use models::{BoundingBox, CropPlacement, CropRect, Detection, FrameDetections};
pub use stabilizer::{SpeakerStabilizer, SpeakerState};
