// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Geoanchor
//!
//! Globe anchoring and georeferencing transforms for 3D engines with
//! floating origins. Keeps an object's placement consistent across three
//! coordinate representations: ECEF Cartesian, geodetic
//! longitude/latitude/height, and the host engine's (origin-shifting)
//! local world space, while tracking a parent frame that can itself move
//! or be swapped at runtime.

pub mod anchor;
pub mod frame;
pub mod geodesy;
pub mod scene;
pub mod utils;

pub use anchor::{
    AnchorConfig, AnchorError, AnchorId, AnchorRecord, AnchorState, GlobeAnchor, HostContext,
    ResolvedFrame, SurfaceSampleConfig,
};
pub use frame::{FrameRegistry, Georeference, GeoreferenceId, Tileset, TilesetId};
pub use geodesy::{Ellipsoid, GeoTransforms};
pub use scene::{Entity, EntityId, Scene};

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix4;

    #[test]
    fn test_attach_register_and_query() {
        let mut scene = Scene::new();
        let entity = scene.spawn_entity(Matrix4::identity());
        let anchor = scene.attach_anchor(entity).unwrap();
        scene.register_anchor(anchor).unwrap();
        assert_eq!(scene.anchor(anchor).unwrap().state(), AnchorState::Valid);
    }
}
