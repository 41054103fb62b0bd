// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Minimal host-integration surface
//!
//! A `Scene` owns the entities, the frame providers, the floating origin,
//! and the anchors, and plays the part of the host engine: it delivers
//! transform-updated events, fans out frame-provider changes, and drives
//! origin rebases. Everything is synchronous and single-threaded; one
//! mutation runs to completion (recompute, local write, mirror refresh)
//! before the next event is processed.
//!
//! Anchor mutations use a take-out/put-back pattern: the anchor is
//! removed from the scene for the duration of the call so its borrow can
//! never alias the entity and frame stores it operates on.

use crate::anchor::{
    AnchorConfig, AnchorError, AnchorId, AnchorRecord, GlobeAnchor, HostContext, ResolvedFrame,
};
use crate::frame::{FrameRegistry, GeoreferenceId, TilesetId};
use anyhow::Result;
use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Identifier of an entity within a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// A positionable object in the host engine's (origin-relative) world
/// space.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    transform: Matrix4<f64>,
    last_write_teleported: Option<bool>,
}

impl Entity {
    fn new(id: EntityId, transform: Matrix4<f64>) -> Self {
        Self {
            id,
            transform,
            last_write_teleported: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Engine-relative local transform.
    pub fn transform(&self) -> &Matrix4<f64> {
        &self.transform
    }

    /// Direct transform write. Does not raise a transform-updated event;
    /// the anchor write-back paths rely on that.
    pub fn write_transform(&mut self, transform: Matrix4<f64>, teleport: bool) {
        self.transform = transform;
        self.last_write_teleported = Some(teleport);
    }

    /// Teleport hint of the most recent write, if any.
    pub fn last_write_teleported(&self) -> Option<bool> {
        self.last_write_teleported
    }
}

/// The scene: entity store, frame registry, floating origin, anchors.
#[derive(Debug, Default)]
pub struct Scene {
    world_origin: Vector3<f64>,
    entities: BTreeMap<EntityId, Entity>,
    frames: FrameRegistry,
    anchors: BTreeMap<AnchorId, GlobeAnchor>,
    anchor_by_entity: BTreeMap<EntityId, AnchorId>,
    next_entity_id: u64,
    next_anchor_id: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// The host's current floating-origin location in absolute engine
    /// space.
    pub fn world_origin(&self) -> Vector3<f64> {
        self.world_origin
    }

    pub fn frames(&self) -> &FrameRegistry {
        &self.frames
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    pub fn spawn_entity(&mut self, transform: Matrix4<f64>) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        self.entities.insert(id, Entity::new(id, transform));
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn despawn_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.anchor_by_entity.remove(&id);
        self.entities.remove(&id)
    }

    /// Move an entity the way the host engine would: write the transform,
    /// then deliver the transform-updated event to the attached anchor.
    pub fn set_entity_transform(
        &mut self,
        id: EntityId,
        transform: Matrix4<f64>,
        teleport: bool,
    ) -> Result<()> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(AnchorError::UnknownEntity(id))?;
        entity.write_transform(transform, teleport);

        if let Some(anchor_id) = self.anchor_by_entity.get(&id).copied() {
            self.with_anchor(anchor_id, |anchor, ctx| {
                anchor.on_transform_updated(ctx, teleport);
            })?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Frame providers
    // ------------------------------------------------------------------

    pub fn add_georeference(
        &mut self,
        ellipsoid: crate::geodesy::Ellipsoid,
        origin_llh: Vector3<f64>,
    ) -> GeoreferenceId {
        self.frames.add_georeference(ellipsoid, origin_llh)
    }

    pub fn add_tileset(
        &mut self,
        tag: impl Into<String>,
        georeference: GeoreferenceId,
    ) -> TilesetId {
        self.frames.add_tileset(tag, georeference)
    }

    /// Redefine a georeference origin and fan the change out to every
    /// subscribed anchor. Globe transforms are untouched; only local
    /// transforms move.
    pub fn set_georeference_origin(
        &mut self,
        id: GeoreferenceId,
        origin_llh: Vector3<f64>,
    ) -> Result<()> {
        let georeference = self
            .frames
            .georeference_mut(id)
            .ok_or(AnchorError::UnknownGeoreference(id))?;
        if !georeference.set_origin_llh(origin_llh) {
            return Ok(());
        }
        let subscribers = georeference.subscribers();
        debug!(georeference = id.0, count = subscribers.len(), "georeference origin changed");
        for anchor_id in subscribers {
            self.with_anchor(anchor_id, |anchor, ctx| {
                anchor.on_parent_frame_changed(ctx);
            })?;
        }
        Ok(())
    }

    /// Move a tileset body and fan the change out to every subscribed
    /// anchor.
    pub fn set_tileset_transform(&mut self, id: TilesetId, transform: Matrix4<f64>) -> Result<()> {
        let tileset = self
            .frames
            .tileset_mut(id)
            .ok_or(AnchorError::UnknownTileset(id))?;
        if !tileset.set_transform(transform) {
            return Ok(());
        }
        let subscribers = tileset.subscribers();
        for anchor_id in subscribers {
            self.with_anchor(anchor_id, |anchor, ctx| {
                anchor.on_parent_frame_changed(ctx);
            })?;
        }
        Ok(())
    }

    pub fn set_tileset_tag(&mut self, id: TilesetId, tag: impl Into<String>) -> Result<()> {
        self.frames
            .tileset_mut(id)
            .ok_or(AnchorError::UnknownTileset(id))?
            .set_tag(tag);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Origin rebase
    // ------------------------------------------------------------------

    /// Shift the floating origin by `delta`. Entity transforms are
    /// shifted the way the host would shift them (imprecisely), then
    /// every valid anchor re-derives its local transform from its globe
    /// transform against the origin value being committed. The anchors
    /// receive that value explicitly because `world_origin` still holds
    /// the old one while they run.
    pub fn apply_world_offset(&mut self, delta: Vector3<f64>) -> Result<()> {
        let new_origin = self.world_origin - delta;

        for entity in self.entities.values_mut() {
            let shifted = crate::utils::math::translation(entity.transform()) + delta;
            let transform = crate::utils::math::with_translation(entity.transform(), shifted);
            // The host's shift is not an anchor write; keep the previous
            // teleport hint.
            entity.transform = transform;
        }

        let anchor_ids: Vec<AnchorId> = self.anchors.keys().copied().collect();
        for anchor_id in anchor_ids {
            self.with_anchor(anchor_id, |anchor, ctx| {
                anchor.on_origin_rebased(ctx, new_origin);
            })?;
        }

        self.world_origin = new_origin;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Anchors
    // ------------------------------------------------------------------

    /// Create an anchor on an entity. The anchor starts `Unresolved`;
    /// call [`register_anchor`](Scene::register_anchor) to bind it to a
    /// parent frame and establish its globe transform.
    pub fn attach_anchor(&mut self, entity: EntityId) -> Result<AnchorId> {
        self.attach_anchor_with_config(entity, &AnchorConfig::default())
    }

    pub fn attach_anchor_with_config(
        &mut self,
        entity: EntityId,
        config: &AnchorConfig,
    ) -> Result<AnchorId> {
        if !self.entities.contains_key(&entity) {
            return Err(AnchorError::UnknownEntity(entity).into());
        }
        if self.anchor_by_entity.contains_key(&entity) {
            return Err(AnchorError::AlreadyAnchored(entity).into());
        }
        let id = AnchorId(self.next_anchor_id);
        self.next_anchor_id += 1;
        self.anchors
            .insert(id, GlobeAnchor::with_config(id, entity, config));
        self.anchor_by_entity.insert(entity, id);
        Ok(id)
    }

    /// Registration: resolve the parent frame and establish the globe
    /// transform (from the entity's local transform if not yet valid).
    pub fn register_anchor(&mut self, id: AnchorId) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| anchor.register(ctx))
    }

    /// Unregistration: unsubscribe and drop the resolved parent frame.
    pub fn unregister_anchor(&mut self, id: AnchorId) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| anchor.unregister(ctx))
    }

    /// Remove an anchor entirely, unsubscribing first.
    pub fn detach_anchor(&mut self, id: AnchorId) -> Result<()> {
        self.unregister_anchor(id)?;
        if let Some(anchor) = self.anchors.remove(&id) {
            self.anchor_by_entity.remove(&anchor.owner());
        }
        Ok(())
    }

    pub fn anchor(&self, id: AnchorId) -> Option<&GlobeAnchor> {
        self.anchors.get(&id)
    }

    pub fn resolve_parent_frame(&mut self, id: AnchorId) -> Result<Option<ResolvedFrame>> {
        self.with_anchor(id, |anchor, ctx| anchor.resolve_parent_frame(ctx))
    }

    pub fn invalidate_parent_frame(&mut self, id: AnchorId) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| anchor.invalidate_parent_frame(ctx))
    }

    pub fn set_anchor_parent_tileset(
        &mut self,
        id: AnchorId,
        tileset: Option<TilesetId>,
    ) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| anchor.set_parent_tileset(ctx, tileset))
    }

    pub fn set_anchor_parent_georeference(
        &mut self,
        id: AnchorId,
        georeference: Option<GeoreferenceId>,
    ) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| {
            anchor.set_parent_georeference(ctx, georeference)
        })
    }

    pub fn set_anchor_parent_tag(&mut self, id: AnchorId, tag: impl Into<String>) -> Result<()> {
        let tag = tag.into();
        self.with_anchor(id, |anchor, ctx| anchor.set_parent_tag(ctx, tag))
    }

    pub fn anchor_ecef(&self, id: AnchorId) -> Result<Vector3<f64>> {
        Ok(self
            .anchors
            .get(&id)
            .ok_or(AnchorError::UnknownAnchor(id))?
            .get_ecef())
    }

    pub fn anchor_longitude_latitude_height(&self, id: AnchorId) -> Result<Vector3<f64>> {
        Ok(self
            .anchors
            .get(&id)
            .ok_or(AnchorError::UnknownAnchor(id))?
            .get_longitude_latitude_height())
    }

    pub fn move_anchor_to_ecef(&mut self, id: AnchorId, ecef: Vector3<f64>) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| anchor.move_to_ecef(ctx, ecef))
    }

    pub fn move_anchor_to_longitude_latitude_height(
        &mut self,
        id: AnchorId,
        llh: Vector3<f64>,
    ) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| {
            anchor.move_to_longitude_latitude_height(ctx, llh)
        })
    }

    pub fn set_anchor_longitude(&mut self, id: AnchorId, longitude: f64) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| anchor.set_longitude(ctx, longitude))
    }

    pub fn set_anchor_latitude(&mut self, id: AnchorId, latitude: f64) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| anchor.set_latitude(ctx, latitude))
    }

    pub fn set_anchor_height(&mut self, id: AnchorId, height: f64) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| anchor.set_height(ctx, height))
    }

    pub fn set_anchor_ecef_x(&mut self, id: AnchorId, x: f64) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| anchor.set_ecef_x(ctx, x))
    }

    pub fn set_anchor_ecef_y(&mut self, id: AnchorId, y: f64) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| anchor.set_ecef_y(ctx, y))
    }

    pub fn set_anchor_ecef_z(&mut self, id: AnchorId, z: f64) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| anchor.set_ecef_z(ctx, z))
    }

    pub fn save_anchor(&self, id: AnchorId) -> Result<AnchorRecord> {
        Ok(self
            .anchors
            .get(&id)
            .ok_or(AnchorError::UnknownAnchor(id))?
            .to_record())
    }

    pub fn restore_anchor(&mut self, id: AnchorId, record: &AnchorRecord) -> Result<()> {
        self.with_anchor(id, |anchor, ctx| anchor.apply_record(ctx, record))
    }

    fn with_anchor<R>(
        &mut self,
        id: AnchorId,
        f: impl FnOnce(&mut GlobeAnchor, &mut HostContext<'_>) -> R,
    ) -> Result<R> {
        let mut anchor = self
            .anchors
            .remove(&id)
            .ok_or(AnchorError::UnknownAnchor(id))?;
        let mut ctx = HostContext {
            world_origin: self.world_origin,
            entities: &mut self.entities,
            frames: &mut self.frames,
        };
        let out = f(&mut anchor, &mut ctx);
        self.anchors.insert(id, anchor);
        Ok(out)
    }
}
