// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Registry of live frame providers
//!
//! Owns every georeference and tileset in the scene and answers the three
//! lookups parent resolution needs: by id, by tag, and the get-or-create
//! process-wide default.

use super::{Georeference, GeoreferenceId, Tileset, TilesetId};
use crate::geodesy::Ellipsoid;
use nalgebra::Vector3;
use std::collections::BTreeMap;

/// Id-keyed store of frame providers. BTreeMap keys are handed out
/// monotonically, so enumeration order is creation order, which makes
/// tag-search tie-breaking deterministic.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    georeferences: BTreeMap<GeoreferenceId, Georeference>,
    tilesets: BTreeMap<TilesetId, Tileset>,
    default_georeference: Option<GeoreferenceId>,
    next_id: u64,
}

impl FrameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_georeference(
        &mut self,
        ellipsoid: Ellipsoid,
        origin_llh: Vector3<f64>,
    ) -> GeoreferenceId {
        let id = GeoreferenceId(self.next_id());
        self.georeferences
            .insert(id, Georeference::new(id, ellipsoid, origin_llh));
        id
    }

    pub fn add_tileset(
        &mut self,
        tag: impl Into<String>,
        georeference: GeoreferenceId,
    ) -> TilesetId {
        let id = TilesetId(self.next_id());
        self.tilesets.insert(id, Tileset::new(id, tag, georeference));
        id
    }

    pub fn remove_georeference(&mut self, id: GeoreferenceId) -> Option<Georeference> {
        if self.default_georeference == Some(id) {
            self.default_georeference = None;
        }
        self.georeferences.remove(&id)
    }

    pub fn remove_tileset(&mut self, id: TilesetId) -> Option<Tileset> {
        self.tilesets.remove(&id)
    }

    pub fn georeference(&self, id: GeoreferenceId) -> Option<&Georeference> {
        self.georeferences.get(&id)
    }

    pub fn georeference_mut(&mut self, id: GeoreferenceId) -> Option<&mut Georeference> {
        self.georeferences.get_mut(&id)
    }

    pub fn tileset(&self, id: TilesetId) -> Option<&Tileset> {
        self.tilesets.get(&id)
    }

    pub fn tileset_mut(&mut self, id: TilesetId) -> Option<&mut Tileset> {
        self.tilesets.get_mut(&id)
    }

    /// First live tileset whose tag matches, in creation order.
    pub fn find_tileset_by_tag(&self, tag: &str) -> Option<TilesetId> {
        self.tilesets
            .values()
            .find(|t| t.tag() == tag)
            .map(Tileset::id)
    }

    /// The process-wide default georeference, created on first use.
    pub fn default_georeference(&mut self) -> GeoreferenceId {
        if let Some(id) = self.default_georeference {
            if self.georeferences.contains_key(&id) {
                return id;
            }
        }
        let id = GeoreferenceId(self.next_id());
        self.georeferences.insert(id, Georeference::wgs84_default(id));
        self.default_georeference = Some(id);
        id
    }

    pub fn tilesets(&self) -> impl Iterator<Item = &Tileset> {
        self.tilesets.values()
    }

    pub fn georeferences(&self) -> impl Iterator<Item = &Georeference> {
        self.georeferences.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_search_creation_order() {
        let mut reg = FrameRegistry::new();
        let geo = reg.add_georeference(Ellipsoid::wgs84(), Vector3::zeros());
        let first = reg.add_tileset("World", geo);
        let _second = reg.add_tileset("World", geo);
        assert_eq!(reg.find_tileset_by_tag("World"), Some(first));
        assert_eq!(reg.find_tileset_by_tag("Moon"), None);
    }

    #[test]
    fn test_default_georeference_created_once() {
        let mut reg = FrameRegistry::new();
        let a = reg.default_georeference();
        let b = reg.default_georeference();
        assert_eq!(a, b);
        assert_eq!(reg.georeference(a).unwrap().origin_llh(), Vector3::zeros());
    }

    #[test]
    fn test_default_recreated_after_removal() {
        let mut reg = FrameRegistry::new();
        let a = reg.default_georeference();
        reg.remove_georeference(a);
        let b = reg.default_georeference();
        assert_ne!(a, b);
        assert!(reg.georeference(b).is_some());
    }
}
