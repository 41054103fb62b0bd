// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Surface-frame sampling for curvature-aware orientation
//!
//! When an anchor moves across the globe under a moving tileset body, the
//! entity's up/forward axes are re-derived by sampling nearby globe points
//! and differencing their engine-space positions. This is a
//! forward-difference approximation of the surface normal and tangent: its
//! error scales with the sampling deltas, so the deltas are configuration,
//! not constants. Smaller deltas track curvature more tightly but lose
//! significance in f64 engine coordinates; larger deltas are cheap and
//! stable but smear the frame over a wider patch of the ellipsoid.

use crate::geodesy::GeoTransforms;
use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};
use serde::{Deserialize, Serialize};

fn default_height_delta() -> f64 {
    100.0
}

fn default_latitude_delta() -> f64 {
    0.001
}

/// Sampling offsets for the forward-difference surface frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSampleConfig {
    /// Height offset in meters for the "up" sample.
    #[serde(default = "default_height_delta")]
    pub height_delta_m: f64,
    /// Latitude offset in degrees for the "forward" (north) sample.
    #[serde(default = "default_latitude_delta")]
    pub latitude_delta_deg: f64,
}

impl Default for SurfaceSampleConfig {
    fn default() -> Self {
        Self {
            height_delta_m: default_height_delta(),
            latitude_delta_deg: default_latitude_delta(),
        }
    }
}

/// An engine-space surface frame sampled at a globe position.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceBasis {
    /// Orthonormal rotation with columns (east, north, up) in engine space.
    pub rotation: Matrix3<f64>,
    /// Engine units per meter along the sampled up direction. Feeds the
    /// adapt-scale policy.
    pub units_per_meter: f64,
}

/// Engine-space position of a geodetic point under the given frame chain.
fn engine_position(
    llh: &Vector3<f64>,
    geo: &GeoTransforms,
    tileset_transform: &Matrix4<f64>,
) -> Vector3<f64> {
    let ecef = geo.llh_to_ecef(llh);
    let local = tileset_transform
        * geo.ecef_to_georeferenced()
        * Vector4::new(ecef.x, ecef.y, ecef.z, 1.0);
    Vector3::new(local.x, local.y, local.z)
}

/// Sample the surface frame at `llh`. Returns `None` when the samples
/// degenerate (zero-length differences under an ill-conditioned tileset
/// transform).
pub fn sample_surface_basis(
    llh: &Vector3<f64>,
    geo: &GeoTransforms,
    tileset_transform: &Matrix4<f64>,
    config: &SurfaceSampleConfig,
) -> Option<SurfaceBasis> {
    let p0 = engine_position(llh, geo, tileset_transform);

    let up_sample = Vector3::new(llh.x, llh.y, llh.z + config.height_delta_m);
    let up_diff = engine_position(&up_sample, geo, tileset_transform) - p0;
    let up_len = up_diff.norm();
    if up_len == 0.0 {
        return None;
    }
    let up = up_diff / up_len;

    // Sample towards the nearer valid latitude: stepping past a pole would
    // fold the sample back on itself.
    let step = if llh.y + config.latitude_delta_deg <= 90.0 {
        config.latitude_delta_deg
    } else {
        -config.latitude_delta_deg
    };
    let north_sample = Vector3::new(llh.x, llh.y + step, llh.z);
    let north_diff =
        (engine_position(&north_sample, geo, tileset_transform) - p0) * step.signum();

    // Gram-Schmidt against up, then complete the right-handed triad.
    let north_proj = north_diff - up * north_diff.dot(&up);
    let north_len = north_proj.norm();
    if north_len == 0.0 {
        return None;
    }
    let north = north_proj / north_len;
    let east = north.cross(&up);

    Some(SurfaceBasis {
        rotation: Matrix3::from_columns(&[east, north, up]),
        units_per_meter: up_len / config.height_delta_m,
    })
}
