//! Data models for the subject tracker.

use serde::{Deserialize, Serialize};

/// Bounding box in source-frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub x: f64,
    /// Top edge y-coordinate
    pub y: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Center x-coordinate.
    #[inline]
    pub fn cx(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Center y-coordinate.
    #[inline]
    pub fn cy(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Right edge x-coordinate.
    #[inline]
    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate.
    #[inline]
    pub fn y2(&self) -> f64 {
        self.y + self.height
    }

    /// Box area in pixels.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Return a new box with padding added on all sides.
    pub fn pad(&self, padding: f64) -> BoundingBox {
        BoundingBox {
            x: self.x - padding,
            y: self.y - padding,
            width: self.width + 2.0 * padding,
            height: self.height + 2.0 * padding,
        }
    }

    /// Compute the bounding box that contains all input boxes.
    pub fn union(boxes: &[BoundingBox]) -> Option<BoundingBox> {
        if boxes.is_empty() {
            return None;
        }

        let x = boxes.iter().map(|b| b.x).fold(f64::INFINITY, f64::min);
        let y = boxes.iter().map(|b| b.y).fold(f64::INFINITY, f64::min);
        let x2 = boxes.iter().map(|b| b.x2()).fold(f64::NEG_INFINITY, f64::max);
        let y2 = boxes.iter().map(|b| b.y2()).fold(f64::NEG_INFINITY, f64::max);

        Some(BoundingBox {
            x,
            y,
            width: x2 - x,
            height: y2 - y,
        })
    }
}

/// A detected subject in one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box of the detection
    pub bbox: BoundingBox,
    /// Detection confidence score (0.0-1.0)
    pub score: f64,
    /// Track ID for identity persistence across frames
    pub track_id: u32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, score: f64, track_id: u32) -> Self {
        Self { bbox, score, track_id }
    }

    /// Activity signal used to rank competing subjects: confidence weighted
    /// by apparent size, so a close confident face outranks a distant one.
    pub fn activity_signal(&self) -> f64 {
        self.score * self.bbox.area()
    }
}

/// All detections for one frame. Empty when nothing was detected.
pub type FrameDetections = Vec<Detection>;

/// Integer crop rectangle for the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CropRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Center x-coordinate.
    pub fn cx(&self) -> f64 {
        self.x as f64 + self.width as f64 / 2.0
    }

    /// Center y-coordinate.
    pub fn cy(&self) -> f64 {
        self.y as f64 + self.height as f64 / 2.0
    }
}

/// Per-frame framing decision handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CropPlacement {
    /// Single-subject mode: crop the source to this 9:16 rectangle.
    Cropped(CropRect),
    /// Multi-subject mode: scale this region to fit the output width and
    /// letterbox the remainder, keeping all subjects in frame.
    Letterboxed(CropRect),
}

impl CropPlacement {
    pub fn rect(&self) -> CropRect {
        match self {
            CropPlacement::Cropped(r) | CropPlacement::Letterboxed(r) => *r,
        }
    }

    pub fn is_letterboxed(&self) -> bool {
        matches!(self, CropPlacement::Letterboxed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_centers() {
        let b = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(b.cx(), 60.0);
        assert_eq!(b.cy(), 45.0);
        assert_eq!(b.x2(), 110.0);
        assert_eq!(b.y2(), 70.0);
    }

    #[test]
    fn test_bounding_box_union() {
        let boxes = vec![
            BoundingBox::new(0.0, 0.0, 50.0, 50.0),
            BoundingBox::new(100.0, 100.0, 50.0, 50.0),
        ];

        let union = BoundingBox::union(&boxes).unwrap();
        assert_eq!(union.x, 0.0);
        assert_eq!(union.y, 0.0);
        assert_eq!(union.width, 150.0);
        assert_eq!(union.height, 150.0);

        assert!(BoundingBox::union(&[]).is_none());
    }

    #[test]
    fn test_activity_signal_favors_large_confident_boxes() {
        let near = Detection::new(BoundingBox::new(0.0, 0.0, 200.0, 200.0), 0.9, 1);
        let far = Detection::new(BoundingBox::new(0.0, 0.0, 50.0, 50.0), 0.95, 2);
        assert!(near.activity_signal() > far.activity_signal());
    }
}
