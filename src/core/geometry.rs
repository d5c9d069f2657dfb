use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Builds a box from a 4-point quad (top-left, top-right, bottom-right,
    /// bottom-left), keeping the first and third corners.
    pub fn from_quad(points: &[[f32; 2]; 4]) -> Self {
        Self::new(points[0][0], points[0][1], points[2][0], points[2][1])
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self::new(self.x0 * sx, self.y0 * sy, self.x1 * sx, self.y1 * sy)
    }

    /// Finite coordinates with the second corner not above/left of the first.
    pub fn is_well_formed(&self) -> bool {
        let finite = [self.x0, self.y0, self.x1, self.y1]
            .iter()
            .all(|v| v.is_finite());
        finite && self.x1 >= self.x0 && self.y1 >= self.y0
    }
}

impl From<[f32; 4]> for BBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn quad_keeps_opposite_corners() {
        let quad = [[2.0, 1.0], [52.0, 1.0], [52.0, 11.0], [2.0, 11.0]];
        assert_eq!(BBox::from_quad(&quad), BBox::new(2.0, 1.0, 52.0, 11.0));
    }

    #[test]
    fn rejects_inverted_and_nan_boxes() {
        assert!(BBox::new(0.0, 0.0, 10.0, 10.0).is_well_formed());
        assert!(BBox::new(0.0, 0.0, 0.0, 0.0).is_well_formed());
        assert!(!BBox::new(10.0, 0.0, 5.0, 10.0).is_well_formed());
        assert!(!BBox::new(0.0, f32::NAN, 5.0, 10.0).is_well_formed());
        assert!(!BBox::new(0.0, 0.0, f32::INFINITY, 10.0).is_well_formed());
    }

    #[test]
    fn serializes_as_array() {
        let json = serde_json::to_string(&BBox::new(1.0, 2.0, 3.0, 4.0)).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let back: BBox = serde_json::from_str("[0, 0, 50, 10]").unwrap();
        assert_eq!(back, BBox::new(0.0, 0.0, 50.0, 10.0));
    }
}
