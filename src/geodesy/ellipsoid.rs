// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Reference ellipsoid model and geodetic <-> Cartesian conversions
//!
//! Longitude/latitude are in degrees, height in meters above the ellipsoid
//! surface. ECEF coordinates are meters. All math is f64 and pure: an
//! `Ellipsoid` is safely shared across threads.

use crate::utils::math::{deg_to_rad, rad_to_deg};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Squared-distance-from-center threshold below which a point has no
/// well-defined projection onto the ellipsoid surface.
const CENTER_TOLERANCE_SQUARED: f64 = 0.1;

/// Convergence threshold for the iterative surface projection.
const SURFACE_PROJECTION_EPSILON: f64 = 1e-12;

/// A triaxial reference ellipsoid centered at the ECEF origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    radii: Vector3<f64>,
    radii_squared: Vector3<f64>,
    one_over_radii: Vector3<f64>,
    one_over_radii_squared: Vector3<f64>,
}

impl Ellipsoid {
    /// Build an ellipsoid from its three semi-axes in meters.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        let radii = Vector3::new(x, y, z);
        Self {
            radii,
            radii_squared: radii.component_mul(&radii),
            one_over_radii: radii.map(|r| 1.0 / r),
            one_over_radii_squared: radii.map(|r| 1.0 / (r * r)),
        }
    }

    /// The WGS84 ellipsoid used by GPS and most geospatial data.
    pub fn wgs84() -> Self {
        Self::new(6378137.0, 6378137.0, 6356752.314245179)
    }

    /// Semi-axes in meters.
    pub fn radii(&self) -> Vector3<f64> {
        self.radii
    }

    /// Outward unit normal of the ellipsoid surface at the given
    /// longitude/latitude (degrees).
    pub fn geodetic_surface_normal_llh(&self, longitude: f64, latitude: f64) -> Vector3<f64> {
        let lon = deg_to_rad(longitude);
        let lat = deg_to_rad(latitude);
        let cos_lat = lat.cos();
        Vector3::new(cos_lat * lon.cos(), cos_lat * lon.sin(), lat.sin())
    }

    /// Outward unit normal of the ellipsoid surface nearest to an ECEF point.
    pub fn geodetic_surface_normal(&self, point: &Vector3<f64>) -> Vector3<f64> {
        point.component_mul(&self.one_over_radii_squared).normalize()
    }

    /// Convert (longitude deg, latitude deg, height m) to ECEF meters.
    pub fn llh_to_ecef(&self, llh: &Vector3<f64>) -> Vector3<f64> {
        let n = self.geodetic_surface_normal_llh(llh.x, llh.y);
        let mut k = self.radii_squared.component_mul(&n);
        let gamma = n.dot(&k).sqrt();
        k /= gamma;
        k + n * llh.z
    }

    /// Convert ECEF meters to (longitude deg, latitude deg, height m).
    ///
    /// Returns `None` for points so close to the ellipsoid center that the
    /// surface projection is undefined.
    pub fn ecef_to_llh(&self, ecef: &Vector3<f64>) -> Option<Vector3<f64>> {
        let surface = self.scale_to_geodetic_surface(ecef)?;
        let normal = self.geodetic_surface_normal(&surface);
        let height_vector = ecef - surface;

        let longitude = normal.y.atan2(normal.x);
        let latitude = normal.z.clamp(-1.0, 1.0).asin();
        let height = height_vector.dot(ecef).signum() * height_vector.norm();

        Some(Vector3::new(
            rad_to_deg(longitude),
            rad_to_deg(latitude),
            height,
        ))
    }

    /// Project an ECEF point onto the ellipsoid surface along the geodetic
    /// normal, by Newton iteration on the scaled implicit surface equation.
    pub fn scale_to_geodetic_surface(&self, ecef: &Vector3<f64>) -> Option<Vector3<f64>> {
        let x2 = ecef.x * ecef.x * self.one_over_radii.x * self.one_over_radii.x;
        let y2 = ecef.y * ecef.y * self.one_over_radii.y * self.one_over_radii.y;
        let z2 = ecef.z * ecef.z * self.one_over_radii.z * self.one_over_radii.z;

        let squared_norm = x2 + y2 + z2;
        if squared_norm < CENTER_TOLERANCE_SQUARED {
            return None;
        }
        let ratio = (1.0 / squared_norm).sqrt();

        let gradient = ecef.component_mul(&self.one_over_radii_squared) * 2.0;
        let mut lambda = (1.0 - ratio) * ecef.norm() / (0.5 * gradient.norm());
        let mut correction = 0.0;

        let (mut xm, mut ym, mut zm);
        loop {
            lambda -= correction;

            xm = 1.0 / (1.0 + lambda * self.one_over_radii_squared.x);
            ym = 1.0 / (1.0 + lambda * self.one_over_radii_squared.y);
            zm = 1.0 / (1.0 + lambda * self.one_over_radii_squared.z);

            let xm2 = xm * xm;
            let ym2 = ym * ym;
            let zm2 = zm * zm;

            let func = x2 * xm2 + y2 * ym2 + z2 * zm2 - 1.0;
            if func.abs() <= SURFACE_PROJECTION_EPSILON {
                break;
            }

            let denominator = x2 * xm2 * xm * self.one_over_radii_squared.x
                + y2 * ym2 * ym * self.one_over_radii_squared.y
                + z2 * zm2 * zm * self.one_over_radii_squared.z;
            correction = func / (-2.0 * denominator);
        }

        Some(Vector3::new(ecef.x * xm, ecef.y * ym, ecef.z * zm))
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}
