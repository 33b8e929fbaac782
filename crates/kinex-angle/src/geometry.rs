//! Vector geometry over landmark coordinates

use kinex_core::Landmark;

/// Magnitudes below this are treated as zero-length vectors
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// 3D point / vector in landmark space
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const ZERO: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn from_landmark(l: &Landmark) -> Self {
        Self::new(l.x, l.y, l.z)
    }

    #[inline]
    pub fn sub(self, other: Point3) -> Point3 {
        Point3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    #[inline]
    pub fn dot(self, other: Point3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Drop depth (X-Y plane)
    #[inline]
    pub fn project_xy(self) -> Point3 {
        Point3::new(self.x, self.y, 0.0)
    }

    /// Drop x (Y-Z plane, side-on camera)
    #[inline]
    pub fn project_yz(self) -> Point3 {
        Point3::new(0.0, self.y, self.z)
    }
}

/// Angle between two vectors in degrees, `None` when either has zero length
///
/// cos(θ) = (v1 · v2) / (|v1| × |v2|)
pub fn vector_angle(v1: Point3, v2: Point3) -> Option<f32> {
    let mag1 = v1.length();
    let mag2 = v2.length();
    if mag1 < DEGENERATE_EPSILON || mag2 < DEGENERATE_EPSILON {
        return None;
    }
    let cos_angle = (v1.dot(v2) / (mag1 * mag2)).clamp(-1.0, 1.0);
    Some(cos_angle.acos().to_degrees())
}

/// Angle at `vertex` between the rays to `proximal` and `distal`
#[inline]
pub fn vertex_angle(proximal: Point3, vertex: Point3, distal: Point3) -> Option<f32> {
    vector_angle(proximal.sub(vertex), distal.sub(vertex))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_line() {
        let a = vertex_angle(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.5, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        )
        .unwrap();
        assert!((a - 180.0).abs() < 0.01);
    }

    #[test]
    fn test_right_angle() {
        let a = vertex_angle(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.5, 0.0, 0.0),
            Point3::new(0.5, 0.5, 0.0),
        )
        .unwrap();
        assert!((a - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_zero_length_is_none() {
        let p = Point3::new(0.3, 0.3, 0.0);
        assert!(vertex_angle(p, p, Point3::new(1.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_projections() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(p.project_xy(), Point3::new(1.0, 2.0, 0.0));
        assert_eq!(p.project_yz(), Point3::new(0.0, 2.0, 3.0));
    }
}
