// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Math utilities shared by the geodesy and anchoring modules

use nalgebra::{Matrix4, Vector3, Vector4};

/// Check if two floats are approximately equal
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Convert degrees to radians
pub fn deg_to_rad(deg: f64) -> f64 {
    deg * std::f64::consts::PI / 180.0
}

/// Convert radians to degrees
pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / std::f64::consts::PI
}

/// Translation column of a 4x4 affine transform
pub fn translation(m: &Matrix4<f64>) -> Vector3<f64> {
    Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
}

/// Replace the translation column of a 4x4 affine transform,
/// leaving the rotation/scale block untouched
pub fn with_translation(m: &Matrix4<f64>, t: Vector3<f64>) -> Matrix4<f64> {
    let mut out = *m;
    out.set_column(3, &Vector4::new(t.x, t.y, t.z, 1.0));
    out
}

/// Invert a rigid transform (orthonormal rotation + translation) without
/// a general 4x4 inversion: R^T and -R^T * t
pub fn rigid_inverse(m: &Matrix4<f64>) -> Matrix4<f64> {
    let r = m.fixed_view::<3, 3>(0, 0).transpose();
    let t = -r * translation(m);
    let mut out = Matrix4::identity();
    out.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    out.set_column(3, &Vector4::new(t.x, t.y, t.z, 1.0));
    out
}
