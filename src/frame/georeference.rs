// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Georeference frame provider
//!
//! A georeference defines how absolute local space maps to ECEF: an
//! ellipsoid plus an origin on that ellipsoid. Anchors subscribe to it so
//! that redefining the origin re-places every anchored entity without
//! moving it on the globe.

use super::ChangeNotifier;
use crate::anchor::AnchorId;
use crate::geodesy::{Ellipsoid, GeoTransforms};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Identifier of a georeference within a [`FrameRegistry`](super::FrameRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeoreferenceId(pub u64);

/// A georeference frame provider.
#[derive(Debug, Clone)]
pub struct Georeference {
    id: GeoreferenceId,
    transforms: GeoTransforms,
    notifier: ChangeNotifier,
}

impl Georeference {
    pub fn new(id: GeoreferenceId, ellipsoid: Ellipsoid, origin_llh: Vector3<f64>) -> Self {
        Self {
            id,
            transforms: GeoTransforms::new(ellipsoid, origin_llh),
            notifier: ChangeNotifier::new(),
        }
    }

    /// The process-wide fallback: WGS84 with the origin at (0, 0, 0).
    pub fn wgs84_default(id: GeoreferenceId) -> Self {
        Self::new(id, Ellipsoid::wgs84(), Vector3::zeros())
    }

    pub fn id(&self) -> GeoreferenceId {
        self.id
    }

    /// Origin as (longitude deg, latitude deg, height m).
    pub fn origin_llh(&self) -> Vector3<f64> {
        self.transforms.origin_llh()
    }

    /// The current matrix pair. Rebuilt atomically by [`set_origin_llh`],
    /// never mutable piecewise.
    ///
    /// [`set_origin_llh`]: Georeference::set_origin_llh
    pub fn transforms(&self) -> &GeoTransforms {
        &self.transforms
    }

    /// Redefine the origin, rebuilding both matrices. Returns `true` when
    /// the origin actually changed; the caller is responsible for fanning
    /// the change out to [`subscribers`](Georeference::subscribers).
    pub fn set_origin_llh(&mut self, origin_llh: Vector3<f64>) -> bool {
        if origin_llh == self.transforms.origin_llh() {
            return false;
        }
        self.transforms = GeoTransforms::new(*self.transforms.ellipsoid(), origin_llh);
        true
    }

    /// Swap the ellipsoid model, rebuilding both matrices. Returns `true`
    /// when it actually changed.
    pub fn set_ellipsoid(&mut self, ellipsoid: Ellipsoid) -> bool {
        if ellipsoid == *self.transforms.ellipsoid() {
            return false;
        }
        self.transforms = GeoTransforms::new(ellipsoid, self.transforms.origin_llh());
        true
    }

    pub fn on_changed(&mut self, anchor: AnchorId) {
        self.notifier.subscribe(anchor);
    }

    pub fn unsubscribe(&mut self, anchor: AnchorId) {
        self.notifier.unsubscribe(anchor);
    }

    pub fn is_subscribed(&self, anchor: AnchorId) -> bool {
        self.notifier.is_subscribed(anchor)
    }

    pub fn subscribers(&self) -> Vec<AnchorId> {
        self.notifier.subscribers()
    }
}
