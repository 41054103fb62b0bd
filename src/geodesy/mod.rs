// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Geodesy module - ellipsoid math and local-frame transforms

mod ellipsoid;
mod transforms;

pub use ellipsoid::Ellipsoid;
pub use transforms::GeoTransforms;
