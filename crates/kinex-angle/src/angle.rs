//! Angle methods
//!
//! Every method takes three ordered landmarks (proximal, vertex, distal) and
//! returns the angle at the vertex with a confidence. Zero-length vectors
//! produce `{angle: 0, confidence: 0}` instead of failing.
//!
//! - `angle_2d`: X-Y projection. Robust to missing depth, sensitive to camera rotation.
//! - `angle_3d`: all three axes. Accurate, sensitive to depth noise.
//! - `angle_side`: Y-Z projection for a side-on camera.
//! - `hybrid_angle`: blends 2D and 3D by how trustworthy the depth signal looks.

use serde::{Deserialize, Serialize};

use kinex_core::{clamp_angle, clamp_confidence, Landmark};

use crate::geometry::{vertex_angle, Point3};

/// Angle computation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleMethod {
    TwoD,
    ThreeD,
    Side,
    #[default]
    Hybrid,
}

/// Depth weighting parameters for the hybrid method
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridConfig {
    /// Floor of the depth weight
    pub min_weight: f32,
    /// Weight when depth differences are within `z_threshold`
    pub max_weight: f32,
    /// Weight lost per unit of |Δz| beyond the threshold
    pub correction_strength: f32,
    /// |Δz| tolerated before the weight starts dropping
    pub z_threshold: f32,
    /// Weights at or above this use the pure 3D angle
    pub full_3d_weight: f32,
    /// Weights below this use the pure 2D angle
    pub fallback_2d_weight: f32,
    /// Confidence multiplier applied on 2D fallback
    pub fallback_confidence: f32,
}

impl Default for HybridConfig {
    fn default() -> Self {
        HybridConfig {
            min_weight: 0.3,
            max_weight: 1.0,
            correction_strength: 2.0,
            z_threshold: 0.1,
            full_3d_weight: 0.8,
            fallback_2d_weight: 0.5,
            fallback_confidence: 0.8,
        }
    }
}

impl HybridConfig {
    /// Depth weight from the pairwise Z-difference between the vertex and its neighbours
    ///
    /// weight = max(min, max − strength · max(0, |Δz| − threshold))
    pub fn depth_weight(&self, proximal: &Landmark, vertex: &Landmark, distal: &Landmark) -> f32 {
        let dz = (vertex.z - proximal.z)
            .abs()
            .max((vertex.z - distal.z).abs());
        let excess = (dz - self.z_threshold).max(0.0);
        let weight = (self.max_weight - self.correction_strength * excess).max(self.min_weight);
        if weight.is_finite() {
            weight.clamp(0.0, 1.0)
        } else {
            self.min_weight
        }
    }
}

/// Angle with confidence
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngleEstimate {
    /// Degrees in [0, 180]
    pub angle: f32,
    /// [0, 1]
    pub confidence: f32,
}

impl AngleEstimate {
    pub const DEGENERATE: AngleEstimate = AngleEstimate {
        angle: 0.0,
        confidence: 0.0,
    };

    pub fn new(angle: f32, confidence: f32) -> Self {
        Self {
            angle: clamp_angle(angle),
            confidence: clamp_confidence(confidence),
        }
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.confidence == 0.0 && self.angle == 0.0
    }
}

/// Mean visibility of the three points
#[inline]
pub fn mean_visibility(proximal: &Landmark, vertex: &Landmark, distal: &Landmark) -> f32 {
    (proximal.visibility + vertex.visibility + distal.visibility) / 3.0
}

fn projected_angle(
    proximal: &Landmark,
    vertex: &Landmark,
    distal: &Landmark,
    project: fn(Point3) -> Point3,
) -> Option<f32> {
    vertex_angle(
        project(Point3::from_landmark(proximal)),
        project(Point3::from_landmark(vertex)),
        project(Point3::from_landmark(distal)),
    )
}

/// Angle in the X-Y image plane
pub fn angle_2d(proximal: &Landmark, vertex: &Landmark, distal: &Landmark) -> AngleEstimate {
    match projected_angle(proximal, vertex, distal, Point3::project_xy) {
        Some(angle) => AngleEstimate::new(angle, mean_visibility(proximal, vertex, distal)),
        None => AngleEstimate::DEGENERATE,
    }
}

/// Full 3D angle. Confidence is scaled by the depth weight.
pub fn angle_3d(
    proximal: &Landmark,
    vertex: &Landmark,
    distal: &Landmark,
    config: &HybridConfig,
) -> AngleEstimate {
    match projected_angle(proximal, vertex, distal, |p| p) {
        Some(angle) => {
            let weight = config.depth_weight(proximal, vertex, distal);
            AngleEstimate::new(angle, mean_visibility(proximal, vertex, distal) * weight)
        }
        None => AngleEstimate::DEGENERATE,
    }
}

/// Angle in the Y-Z plane, for a camera looking at the body side-on
pub fn angle_side(proximal: &Landmark, vertex: &Landmark, distal: &Landmark) -> AngleEstimate {
    match projected_angle(proximal, vertex, distal, Point3::project_yz) {
        Some(angle) => AngleEstimate::new(angle, mean_visibility(proximal, vertex, distal)),
        None => AngleEstimate::DEGENERATE,
    }
}

/// Depth-weighted blend of the 2D and 3D angles
///
/// - weight ≥ `full_3d_weight`: 3D angle
/// - weight < `fallback_2d_weight`: 2D angle, confidence × `fallback_confidence`
/// - otherwise: angle and confidence blended linearly by the weight
///
/// When one projection is degenerate inside the blend band the other one is used.
pub fn hybrid_angle(
    proximal: &Landmark,
    vertex: &Landmark,
    distal: &Landmark,
    config: &HybridConfig,
) -> AngleEstimate {
    let weight = config.depth_weight(proximal, vertex, distal);

    if weight >= config.full_3d_weight {
        return angle_3d(proximal, vertex, distal, config);
    }

    let flat = angle_2d(proximal, vertex, distal);
    if weight < config.fallback_2d_weight {
        if flat.is_degenerate() {
            return flat;
        }
        return AngleEstimate::new(flat.angle, flat.confidence * config.fallback_confidence);
    }

    let deep = angle_3d(proximal, vertex, distal, config);
    match (flat.is_degenerate(), deep.is_degenerate()) {
        (true, true) => AngleEstimate::DEGENERATE,
        (true, false) => deep,
        (false, true) => flat,
        (false, false) => AngleEstimate::new(
            flat.angle * (1.0 - weight) + deep.angle * weight,
            flat.confidence * (1.0 - weight) + deep.confidence * weight,
        ),
    }
}

/// Dispatch on an [`AngleMethod`]
pub fn compute(
    method: AngleMethod,
    proximal: &Landmark,
    vertex: &Landmark,
    distal: &Landmark,
    config: &HybridConfig,
) -> AngleEstimate {
    match method {
        AngleMethod::TwoD => angle_2d(proximal, vertex, distal),
        AngleMethod::ThreeD => angle_3d(proximal, vertex, distal, config),
        AngleMethod::Side => angle_side(proximal, vertex, distal),
        AngleMethod::Hybrid => hybrid_angle(proximal, vertex, distal, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lm(x: f32, y: f32, z: f32) -> Landmark {
        Landmark::visible(x, y, z)
    }

    fn law_of_cosines(p1: &Landmark, p2: &Landmark, p3: &Landmark, use_z: bool) -> f32 {
        let d = |a: &Landmark, b: &Landmark| {
            let dz = if use_z { a.z - b.z } else { 0.0 };
            ((a.x - b.x).powi(2) + (a.y - b.y).powi(2) + dz.powi(2)).sqrt()
        };
        let a = d(p1, p2);
        let b = d(p3, p2);
        let c = d(p1, p3);
        let cos = ((a * a + b * b - c * c) / (2.0 * a * b)).clamp(-1.0, 1.0);
        cos.acos().to_degrees()
    }

    #[test]
    fn test_flat_right_angle() {
        let cfg = HybridConfig::default();
        let (a, b, c) = (lm(0.0, 0.0, 0.0), lm(0.5, 0.0, 0.0), lm(0.5, 0.5, 0.0));

        assert!((angle_2d(&a, &b, &c).angle - 90.0).abs() < 0.01);
        assert!((angle_3d(&a, &b, &c, &cfg).angle - 90.0).abs() < 0.01);
        assert!((hybrid_angle(&a, &b, &c, &cfg).angle - 90.0).abs() < 0.01);
        assert!((angle_3d(&a, &b, &c, &cfg).confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_side_uses_depth() {
        // Straight in X-Y, bent 90° in Y-Z
        let (a, b, c) = (lm(0.5, 0.0, 0.0), lm(0.5, 0.5, 0.0), lm(0.5, 0.5, 0.5));
        assert!((angle_side(&a, &b, &c).angle - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_degenerate_returns_zero() {
        let cfg = HybridConfig::default();
        let p = lm(0.2, 0.2, 0.0);
        let q = lm(0.8, 0.1, 0.0);

        assert_eq!(angle_2d(&p, &p, &q), AngleEstimate::DEGENERATE);
        assert_eq!(angle_3d(&p, &p, &q, &cfg), AngleEstimate::DEGENERATE);
        assert_eq!(hybrid_angle(&p, &p, &q, &cfg), AngleEstimate::DEGENERATE);
    }

    #[test]
    fn test_depth_weight_curve() {
        let cfg = HybridConfig::default();
        let v = lm(0.0, 0.0, 0.0);

        assert_eq!(cfg.depth_weight(&lm(0.0, 0.0, 0.05), &v, &lm(0.0, 0.0, 0.0)), 1.0);
        let w = cfg.depth_weight(&lm(0.0, 0.0, 0.2), &v, &lm(0.0, 0.0, 0.0));
        assert!((w - 0.8).abs() < 1e-5);
        assert_eq!(cfg.depth_weight(&lm(0.0, 0.0, 2.0), &v, &lm(0.0, 0.0, 0.0)), 0.3);
    }

    #[test]
    fn test_hybrid_falls_back_to_2d_on_noisy_depth() {
        let cfg = HybridConfig::default();
        // |Δz| = 0.5 → weight 0.3, below the 2D fallback
        let (a, b, c) = (lm(0.0, 0.0, 0.5), lm(0.5, 0.0, 0.0), lm(0.5, 0.5, 0.0));

        let est = hybrid_angle(&a, &b, &c, &cfg);
        let flat = angle_2d(&a, &b, &c);
        assert!((est.angle - flat.angle).abs() < 1e-4);
        assert!((est.confidence - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_hybrid_blends_in_middle_band() {
        let cfg = HybridConfig::default();
        // |Δz| = 0.25 → weight 0.7
        let (a, b, c) = (lm(0.0, 0.0, 0.25), lm(0.5, 0.0, 0.0), lm(0.5, 0.5, 0.0));

        let est = hybrid_angle(&a, &b, &c, &cfg);
        let flat = angle_2d(&a, &b, &c);
        let deep = angle_3d(&a, &b, &c, &cfg);
        let expected = flat.angle * 0.3 + deep.angle * 0.7;
        assert!((est.angle - expected).abs() < 1e-3);
        assert!(est.confidence < 1.0);
    }

    #[test]
    fn test_confidence_is_mean_visibility() {
        let a = Landmark::new(0.0, 0.0, 0.0, 0.9);
        let b = Landmark::new(0.5, 0.0, 0.0, 0.6);
        let c = Landmark::new(0.5, 0.5, 0.0, 0.3);
        assert!((angle_2d(&a, &b, &c).confidence - 0.6).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_matches_law_of_cosines(
            vx in 0.2f32..0.8, vy in 0.2f32..0.8, vz in -0.05f32..0.05,
            dx in 0.05f32..0.3, dy in -0.3f32..0.3,
            theta in 0.1f32..3.0,
        ) {
            let cfg = HybridConfig::default();
            let vertex = lm(vx, vy, vz);
            // Equal-length arms around the vertex
            let p1 = lm(vx + dx, vy + dy, vz);
            let (s, c) = theta.sin_cos();
            let p3 = lm(vx + dx * c - dy * s, vy + dx * s + dy * c, vz + 0.02);

            let flat = angle_2d(&p1, &vertex, &p3);
            let deep = angle_3d(&p1, &vertex, &p3, &cfg);
            prop_assert!((flat.angle - law_of_cosines(&p1, &vertex, &p3, false)).abs() < 0.05);
            prop_assert!((deep.angle - law_of_cosines(&p1, &vertex, &p3, true)).abs() < 0.05);
        }

        #[test]
        fn prop_estimates_stay_in_range(
            coords in proptest::collection::vec(-1.0f32..1.0, 9),
            vis in 0.0f32..1.0,
        ) {
            let cfg = HybridConfig::default();
            let a = Landmark::new(coords[0], coords[1], coords[2], vis);
            let b = Landmark::new(coords[3], coords[4], coords[5], vis);
            let c = Landmark::new(coords[6], coords[7], coords[8], vis);
            for method in [AngleMethod::TwoD, AngleMethod::ThreeD, AngleMethod::Side, AngleMethod::Hybrid] {
                let est = compute(method, &a, &b, &c, &cfg);
                prop_assert!((0.0..=180.0).contains(&est.angle));
                prop_assert!((0.0..=1.0).contains(&est.confidence));
            }
        }
    }
}
