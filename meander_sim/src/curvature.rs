use bevy::math::Vec3;

use crate::math::ChangeOfBasis;

/// Side-length products below this are treated as coincident samples.
pub const CURVATURE_TOLERANCE: f32 = 1e-6;

/// Curvature assigned to segments whose three samples do not span a triangle.
pub const DEGENERATE_CURVATURE: f32 = 1.0;

/// Local frame and Menger curvature around a centre sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSegment {
    pub left: Vec3,
    pub center: Vec3,
    pub right: Vec3,
    pub tangent: Vec3,
    pub binormal: Vec3,
    pub curvature: f32,
    pub signed_curvature: f32,
}

impl CurveSegment {
    pub fn new(left: Vec3, center: Vec3, right: Vec3) -> Self {
        let tangent = (right - left).normalize_or_zero();
        let binormal = tangent.cross(Vec3::Y).normalize_or_zero();

        let a = center.distance(left);
        let b = center.distance(right);
        let c = left.distance(right);
        let product = a * b * c;

        let (curvature, signed_curvature) = match triangle_area(a, b, c) {
            Some(area) if product >= CURVATURE_TOLERANCE => {
                let curvature = 4.0 * area / product;
                let lateral = ChangeOfBasis::along(left, right).to_custom(left, center).z;
                let side = if lateral >= 0.0 { 1.0 } else { -1.0 };
                (curvature, -side * curvature)
            }
            _ => (DEGENERATE_CURVATURE, DEGENERATE_CURVATURE),
        };

        Self {
            left,
            center,
            right,
            tangent,
            binormal,
            curvature,
            signed_curvature,
        }
    }

    pub fn weighted_binormal(&self) -> Vec3 {
        self.binormal * self.signed_curvature
    }
}

/// Heron's formula; `None` when the sides collapse onto a line.
fn triangle_area(a: f32, b: f32, c: f32) -> Option<f32> {
    let s = (a + b + c) * 0.5;
    let radicand = s * (s - a) * (s - b) * (s - c);
    if radicand <= f32::EPSILON * s.powi(4) {
        None
    } else {
        Some(radicand.sqrt())
    }
}
