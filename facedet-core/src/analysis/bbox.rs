use glam::Vec2;
use serde::Serialize;

/// An axis-aligned box in floating point pixel space, stored as its
/// top-left (`min`) and bottom-right (`max`) corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bbox {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bbox {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates a box from its top-left corner and size.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use facedet_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_min_size(Vec2::new(10.0, 10.0), Vec2::new(50.0, 50.0));
    /// assert_eq!(bbox.max, Vec2::new(60.0, 60.0));
    /// ```
    pub fn from_min_size(min: Vec2, size: Vec2) -> Self {
        Self {
            min,
            max: min + size,
        }
    }

    /// Creates a box from the `(cx, cy, w, h)` form emitted by the network.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use facedet_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_center_size(Vec2::new(100.0, 200.0), Vec2::new(50.0, 80.0));
    /// assert_eq!(bbox.min, Vec2::new(75.0, 160.0));
    /// assert_eq!(bbox.max, Vec2::new(125.0, 240.0));
    /// ```
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half_size = size / 2.0;
        Self {
            min: center - half_size,
            max: center + half_size,
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Area of the box. Inverted boxes report zero instead of a negative area.
    pub fn area(&self) -> f32 {
        if self.is_degenerate() {
            return 0.0;
        }
        self.width() * self.height()
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    /// True when the box has no positive width or height.
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Area of the overlap between two boxes, 0.0 when they do not overlap.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use facedet_core::analysis::bbox::Bbox;
    /// let a = Bbox::new(Vec2::new(0.0, 0.0), Vec2::new(4.0, 4.0));
    /// let b = Bbox::new(Vec2::new(2.0, 2.0), Vec2::new(6.0, 6.0));
    /// assert_eq!(a.intersection(&b), 4.0);
    /// ```
    pub fn intersection(&self, other: &Self) -> f32 {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);

        if max.x > min.x && max.y > min.y {
            (max.x - min.x) * (max.y - min.y)
        } else {
            0.
        }
    }

    /// Intersection over Union.
    ///
    /// The union is `area(a) + area(b) - intersection`. A union that is not
    /// positive yields 0.0, so degenerate boxes never count as overlapping.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use facedet_core::analysis::bbox::Bbox;
    /// let a = Bbox::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
    /// assert_eq!(a.iou(&a), 1.0);
    /// ```
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection_area = self.intersection(other);
        let union_area = self.area() + other.area() - intersection_area;

        if union_area > 0.0 {
            intersection_area / union_area
        } else {
            0.0
        }
    }

    /// Clamps both corners into `[min_bounds, max_bounds]`.
    ///
    /// A box lying completely outside the bounds collapses to a degenerate
    /// box on the boundary.
    pub fn clamp(&self, min_bounds: Vec2, max_bounds: Vec2) -> Self {
        Self {
            min: self.min.clamp(min_bounds, max_bounds),
            max: self.max.clamp(min_bounds, max_bounds),
        }
    }

    /// Applies `f` to both corners.
    pub fn map_corners(&self, f: impl Fn(Vec2) -> Vec2) -> Self {
        Self {
            min: f(self.min),
            max: f(self.max),
        }
    }
}
