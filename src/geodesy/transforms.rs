// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Affine matrix pair relating georeferenced local space to ECEF
//!
//! The georeferenced frame is east-north-up at the georeference origin:
//! right-handed, Z-up, meters. The two matrices are an inverse pair built
//! together and never independently mutable.

use super::Ellipsoid;
use crate::utils::math::{deg_to_rad, rigid_inverse};
use nalgebra::{Matrix4, Vector3, Vector4};

/// The matrix pair mapping georeferenced local space to and from ECEF,
/// anchored at a reference origin on (or above) the ellipsoid.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTransforms {
    ellipsoid: Ellipsoid,
    origin_llh: Vector3<f64>,
    georeferenced_to_ecef: Matrix4<f64>,
    ecef_to_georeferenced: Matrix4<f64>,
}

impl GeoTransforms {
    /// Build the pair for an origin given as (longitude deg, latitude deg,
    /// height m).
    pub fn new(ellipsoid: Ellipsoid, origin_llh: Vector3<f64>) -> Self {
        let origin_ecef = ellipsoid.llh_to_ecef(&origin_llh);
        let to_ecef = east_north_up_to_ecef(origin_llh.x, origin_llh.y, origin_ecef);
        Self {
            ellipsoid,
            origin_llh,
            ecef_to_georeferenced: rigid_inverse(&to_ecef),
            georeferenced_to_ecef: to_ecef,
        }
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    /// Origin as (longitude deg, latitude deg, height m).
    pub fn origin_llh(&self) -> Vector3<f64> {
        self.origin_llh
    }

    /// Absolute local space -> ECEF.
    pub fn georeferenced_to_ecef(&self) -> &Matrix4<f64> {
        &self.georeferenced_to_ecef
    }

    /// ECEF -> absolute local space.
    pub fn ecef_to_georeferenced(&self) -> &Matrix4<f64> {
        &self.ecef_to_georeferenced
    }

    /// Convert an ECEF position to (longitude deg, latitude deg, height m)
    /// against this pair's ellipsoid.
    pub fn ecef_to_llh(&self, ecef: &Vector3<f64>) -> Option<Vector3<f64>> {
        self.ellipsoid.ecef_to_llh(ecef)
    }

    /// Convert (longitude deg, latitude deg, height m) to an ECEF position
    /// against this pair's ellipsoid.
    pub fn llh_to_ecef(&self, llh: &Vector3<f64>) -> Vector3<f64> {
        self.ellipsoid.llh_to_ecef(llh)
    }
}

impl Default for GeoTransforms {
    fn default() -> Self {
        Self::new(Ellipsoid::wgs84(), Vector3::zeros())
    }
}

/// East-north-up basis at the given geodetic origin, as a local->ECEF
/// rigid transform. The basis is derived analytically from the angles, so
/// it stays well-defined at the poles.
fn east_north_up_to_ecef(
    longitude: f64,
    latitude: f64,
    origin_ecef: Vector3<f64>,
) -> Matrix4<f64> {
    let lon = deg_to_rad(longitude);
    let lat = deg_to_rad(latitude);
    let (sin_lon, cos_lon) = lon.sin_cos();
    let (sin_lat, cos_lat) = lat.sin_cos();

    let east = Vector3::new(-sin_lon, cos_lon, 0.0);
    let north = Vector3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
    let up = Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat);

    let mut m = Matrix4::identity();
    m.set_column(0, &Vector4::new(east.x, east.y, east.z, 0.0));
    m.set_column(1, &Vector4::new(north.x, north.y, north.z, 0.0));
    m.set_column(2, &Vector4::new(up.x, up.y, up.z, 0.0));
    m.set_column(
        3,
        &Vector4::new(origin_ecef.x, origin_ecef.y, origin_ecef.z, 1.0),
    );
    m
}
