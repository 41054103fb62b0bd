// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! The globe anchor state machine
//!
//! One anchor owns one entity's canonical ECEF placement. Every external
//! event (local transform changed, parent frame changed, origin rebased,
//! explicit move) funnels through here; the anchor is the only writer of
//! the globe transform and the only trigger of a local-transform
//! write-back.
//!
//! The changes this component reacts to, and what each one does:
//!
//! * Local transform changed - the host reports the entity moved. The
//!   globe transform is recomputed from the local transform. Never writes
//!   the local transform back (that would feed back into the same event).
//! * Globe position changed - `move_to_ecef` or a mirror-field setter.
//!   The local transform is recomputed from the new globe transform, and
//!   the surface orientation is re-derived if configured.
//! * Parent frame changed - georeference redefined or tileset moved. The
//!   local transform is recomputed from the unchanged globe transform;
//!   the entity did not move on the globe.
//! * Origin rebased - same as above, but the upcoming origin is supplied
//!   explicitly because the host has not committed it yet.

use super::resolver::ResolvedFrame;
use super::surface::{sample_surface_basis, SurfaceSampleConfig};
use super::{AnchorConfig, AnchorId, AnchorState, HostContext};
use crate::frame::{GeoreferenceId, TilesetId};
use crate::scene::EntityId;
use crate::utils::math::{translation, with_translation};
use nalgebra::{Matrix3, Matrix4, Vector3};
use tracing::{error, info, warn};

/// Anchors one entity to the globe. See the module docs for the event
/// protocol.
#[derive(Debug, Clone)]
pub struct GlobeAnchor {
    pub(super) id: AnchorId,
    pub(super) owner: EntityId,

    /// Canonical position+orientation in ECEF. Sole source of truth once
    /// valid; everything else is derived from it.
    pub(super) globe_transform: Matrix4<f64>,
    pub(super) globe_transform_valid: bool,

    // Mirror caches, re-derived on every globe-transform change. Degrees,
    // degrees, meters / meters.
    pub(super) longitude: f64,
    pub(super) latitude: f64,
    pub(super) height: f64,
    pub(super) ecef_x: f64,
    pub(super) ecef_y: f64,
    pub(super) ecef_z: f64,

    pub(super) teleport_on_update: bool,
    pub(super) adapt_orientation: bool,
    pub(super) adapt_scale: bool,
    pub(super) surface_config: SurfaceSampleConfig,

    pub(super) parent_tileset: Option<TilesetId>,
    pub(super) parent_georeference: Option<GeoreferenceId>,
    pub(super) parent_tag: String,
    pub(super) resolved: Option<ResolvedFrame>,

    /// Re-entrancy guard: set while this anchor is writing the local
    /// transform, so a transform-updated event delivered mid-write is
    /// dropped instead of double-updating.
    pub(super) updating: bool,
}

impl GlobeAnchor {
    pub fn new(id: AnchorId, owner: EntityId) -> Self {
        Self::with_config(id, owner, &AnchorConfig::default())
    }

    pub fn with_config(id: AnchorId, owner: EntityId, config: &AnchorConfig) -> Self {
        Self {
            id,
            owner,
            globe_transform: Matrix4::identity(),
            globe_transform_valid: false,
            longitude: 0.0,
            latitude: 0.0,
            height: 0.0,
            ecef_x: 0.0,
            ecef_y: 0.0,
            ecef_z: 0.0,
            teleport_on_update: config.teleport_on_update,
            adapt_orientation: config.adapt_orientation,
            adapt_scale: config.adapt_scale,
            surface_config: config.surface,
            parent_tileset: None,
            parent_georeference: None,
            parent_tag: config.parent_tag.clone(),
            resolved: None,
            updating: false,
        }
    }

    pub fn id(&self) -> AnchorId {
        self.id
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn state(&self) -> AnchorState {
        if self.resolved.is_none() {
            AnchorState::Unresolved
        } else if !self.globe_transform_valid {
            AnchorState::Invalid
        } else {
            AnchorState::Valid
        }
    }

    /// The canonical globe transform. Only meaningful when
    /// [`state`](GlobeAnchor::state) is `Valid`.
    pub fn globe_transform(&self) -> &Matrix4<f64> {
        &self.globe_transform
    }

    pub fn is_globe_transform_valid(&self) -> bool {
        self.globe_transform_valid
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn teleport_on_update(&self) -> bool {
        self.teleport_on_update
    }

    pub fn set_teleport_on_update(&mut self, teleport: bool) {
        self.teleport_on_update = teleport;
    }

    pub fn set_adapt_orientation(&mut self, adapt: bool) {
        self.adapt_orientation = adapt;
    }

    pub fn set_adapt_scale(&mut self, adapt: bool) {
        self.adapt_scale = adapt;
    }

    pub fn surface_config(&self) -> &SurfaceSampleConfig {
        &self.surface_config
    }

    pub fn set_surface_config(&mut self, config: SurfaceSampleConfig) {
        self.surface_config = config;
    }

    pub fn parent_tag(&self) -> &str {
        &self.parent_tag
    }

    /// ECEF position in meters. Zero vector plus a warning while the
    /// globe transform is not valid.
    pub fn get_ecef(&self) -> Vector3<f64> {
        if !self.globe_transform_valid {
            warn!(
                anchor = self.id.0,
                "globe position is invalid because the anchor is not yet resolved"
            );
            return Vector3::zeros();
        }
        translation(&self.globe_transform)
    }

    /// (longitude deg, latitude deg, height m). Zero vector plus a
    /// warning while unresolved or invalid.
    pub fn get_longitude_latitude_height(&self) -> Vector3<f64> {
        if !self.globe_transform_valid || self.resolved.is_none() {
            warn!(
                anchor = self.id.0,
                "globe position is invalid because the anchor is not yet resolved"
            );
            return Vector3::zeros();
        }
        Vector3::new(self.longitude, self.latitude, self.height)
    }

    /// Move the entity to an ECEF position in meters. Rotation and scale
    /// of the globe transform are preserved. Errors (without state
    /// change) when no parent frame is resolved.
    pub fn move_to_ecef(&mut self, ctx: &mut HostContext<'_>, ecef: Vector3<f64>) {
        if self.resolved.is_none() {
            error!(
                anchor = self.id.0,
                "cannot move to a globe position because no parent frame is resolved"
            );
            return;
        }
        self.ecef_x = ecef.x;
        self.ecef_y = ecef.y;
        self.ecef_z = ecef.z;
        self.apply_cartesian_properties(ctx);
    }

    /// Move the entity to (longitude deg, latitude deg, height m). Errors
    /// (without state change) when no parent frame is resolved.
    pub fn move_to_longitude_latitude_height(
        &mut self,
        ctx: &mut HostContext<'_>,
        llh: Vector3<f64>,
    ) {
        if self.resolved.is_none() {
            error!(
                anchor = self.id.0,
                "cannot move to a globe position because no parent frame is resolved"
            );
            return;
        }
        self.longitude = llh.x;
        self.latitude = llh.y;
        self.height = llh.z;
        self.apply_cartographic_properties(ctx);
    }

    /// Edit a single cartographic mirror field. The edited value wins
    /// over the derived one even when the globe transform has to be
    /// backfilled from the local transform first.
    pub fn set_longitude(&mut self, ctx: &mut HostContext<'_>, longitude: f64) {
        self.longitude = longitude;
        self.on_cartographic_mirror_edited(ctx);
    }

    pub fn set_latitude(&mut self, ctx: &mut HostContext<'_>, latitude: f64) {
        self.latitude = latitude;
        self.on_cartographic_mirror_edited(ctx);
    }

    pub fn set_height(&mut self, ctx: &mut HostContext<'_>, height: f64) {
        self.height = height;
        self.on_cartographic_mirror_edited(ctx);
    }

    /// Edit a single ECEF mirror field, with the same edited-value-wins
    /// backfill behavior as the cartographic setters.
    pub fn set_ecef_x(&mut self, ctx: &mut HostContext<'_>, x: f64) {
        self.ecef_x = x;
        self.on_cartesian_mirror_edited(ctx);
    }

    pub fn set_ecef_y(&mut self, ctx: &mut HostContext<'_>, y: f64) {
        self.ecef_y = y;
        self.on_cartesian_mirror_edited(ctx);
    }

    pub fn set_ecef_z(&mut self, ctx: &mut HostContext<'_>, z: f64) {
        self.ecef_z = z;
        self.on_cartesian_mirror_edited(ctx);
    }

    /// The host reports that the owning entity's local transform changed.
    /// One-way: recomputes the globe transform and mirrors, never writes
    /// the local transform back.
    pub fn on_transform_updated(&mut self, ctx: &mut HostContext<'_>, _teleported: bool) {
        if self.updating {
            return;
        }
        self.update_globe_from_local(ctx);
    }

    /// The resolved parent frame changed (georeference redefined or
    /// tileset moved). The globe transform is untouched; only the local
    /// transform is recomputed.
    pub fn on_parent_frame_changed(&mut self, ctx: &mut HostContext<'_>) {
        if self.globe_transform_valid {
            self.update_local_from_globe(ctx, None);
        }
    }

    /// The host is rebasing its floating origin. `new_origin` is the
    /// origin value the host is about to commit; it must be passed in
    /// because `ctx.world_origin` still holds the old value here.
    pub fn on_origin_rebased(&mut self, ctx: &mut HostContext<'_>, new_origin: Vector3<f64>) {
        if self.globe_transform_valid {
            self.update_local_from_globe(ctx, Some(new_origin));
        }
    }

    /// Human-readable state summary for debugging.
    pub fn describe(&self) -> String {
        format!(
            "anchor {:?} owner {:?} state {:?} ecef ({:.3}, {:.3}, {:.3}) llh ({:.7}, {:.7}, {:.3}) tag {:?}",
            self.id.0,
            self.owner.0,
            self.state(),
            self.ecef_x,
            self.ecef_y,
            self.ecef_z,
            self.longitude,
            self.latitude,
            self.height,
            self.parent_tag,
        )
    }

    pub fn print_debug(&self) {
        info!("{}", self.describe());
    }

    fn on_cartesian_mirror_edited(&mut self, ctx: &mut HostContext<'_>) {
        if self.resolved.is_none() {
            warn!(
                anchor = self.id.0,
                "ECEF property edited before a parent frame was resolved; it will take effect on resolve"
            );
            return;
        }
        self.apply_cartesian_properties(ctx);
    }

    fn on_cartographic_mirror_edited(&mut self, ctx: &mut HostContext<'_>) {
        if self.resolved.is_none() {
            warn!(
                anchor = self.id.0,
                "cartographic property edited before a parent frame was resolved; it will take effect on resolve"
            );
            return;
        }
        self.apply_cartographic_properties(ctx);
    }

    /// Rebuild the globe transform translation from the ECEF mirror
    /// triple, backfilling the globe transform from the local transform
    /// first if it is not yet valid. The edited mirror values survive the
    /// backfill.
    pub(super) fn apply_cartesian_properties(&mut self, ctx: &mut HostContext<'_>) {
        if !self.globe_transform_valid {
            let (x, y, z) = (self.ecef_x, self.ecef_y, self.ecef_z);
            self.update_globe_from_local(ctx);
            self.ecef_x = x;
            self.ecef_y = y;
            self.ecef_z = z;
        }

        let transform = with_translation(
            &self.globe_transform,
            Vector3::new(self.ecef_x, self.ecef_y, self.ecef_z),
        );
        self.set_globe_transform(ctx, transform);
        self.update_cartographic_mirrors(ctx);
        self.apply_surface_orientation(ctx);
    }

    /// Rebuild the globe transform translation from the LLH mirror
    /// triple. Same backfill rule as the cartesian path.
    pub(super) fn apply_cartographic_properties(&mut self, ctx: &mut HostContext<'_>) {
        if !self.globe_transform_valid {
            let (lon, lat, h) = (self.longitude, self.latitude, self.height);
            self.update_globe_from_local(ctx);
            self.longitude = lon;
            self.latitude = lat;
            self.height = h;
        }

        let Some(resolved) = self.resolved.clone() else {
            warn!(anchor = self.id.0, "no parent frame resolved");
            return;
        };
        let Some(geo) = ctx.frames.georeference(resolved.georeference) else {
            warn!(anchor = self.id.0, "resolved georeference is gone");
            return;
        };
        let ecef = geo
            .transforms()
            .llh_to_ecef(&Vector3::new(self.longitude, self.latitude, self.height));

        let transform = with_translation(&self.globe_transform, ecef);
        self.set_globe_transform(ctx, transform);
        self.update_cartesian_mirrors();
        self.apply_surface_orientation(ctx);
    }

    /// The single write point for the globe transform on the
    /// globe-position-changed paths: assigns it, marks it valid, and
    /// immediately writes the local transform so the two representations
    /// never diverge between events.
    fn set_globe_transform(&mut self, ctx: &mut HostContext<'_>, transform: Matrix4<f64>) {
        self.globe_transform = transform;
        self.globe_transform_valid = true;
        self.update_local_from_globe(ctx, None);
    }

    /// Compute the globe transform from the entity's current local
    /// transform: lift to absolute engine space, undo the tileset body's
    /// transform if the parent has one, then map into ECEF.
    pub(super) fn update_globe_from_local(&mut self, ctx: &mut HostContext<'_>) {
        let Some(resolved) = self.resolved.clone() else {
            warn!(
                anchor = self.id.0,
                "cannot compute globe transform: no parent frame resolved"
            );
            self.globe_transform_valid = false;
            return;
        };
        let Some(entity) = ctx.entities.get(&self.owner) else {
            warn!(
                anchor = self.id.0,
                "cannot compute globe transform: owner entity is gone"
            );
            self.globe_transform_valid = false;
            return;
        };
        let Some(geo) = ctx.frames.georeference(resolved.georeference) else {
            warn!(
                anchor = self.id.0,
                "cannot compute globe transform: resolved georeference is gone"
            );
            self.globe_transform_valid = false;
            return;
        };

        let absolute = with_translation(
            entity.transform(),
            translation(entity.transform()) + ctx.world_origin,
        );

        let mut anchored = absolute;
        if let Some(tileset_id) = resolved.tileset {
            if let Some(tileset) = ctx.frames.tileset(tileset_id) {
                match tileset.transform().try_inverse() {
                    Some(inverse) => anchored = inverse * absolute,
                    None => warn!(
                        anchor = self.id.0,
                        "tileset transform is singular; anchoring to the georeference alone"
                    ),
                }
            }
        }

        self.globe_transform = geo.transforms().georeferenced_to_ecef() * anchored;
        self.globe_transform_valid = true;
        self.update_cartesian_mirrors();
        self.update_cartographic_mirrors(ctx);
    }

    /// Write the entity's local transform from the globe transform:
    /// ECEF -> georeferenced local -> tileset body -> engine-relative by
    /// subtracting the floating origin. `origin_override` carries the
    /// upcoming origin during a rebase; `None` reads the current one.
    pub(super) fn update_local_from_globe(
        &mut self,
        ctx: &mut HostContext<'_>,
        origin_override: Option<Vector3<f64>>,
    ) {
        if !self.globe_transform_valid {
            warn!(
                anchor = self.id.0,
                "cannot update local transform: globe transform is not known"
            );
            return;
        }
        let Some(resolved) = self.resolved.clone() else {
            warn!(
                anchor = self.id.0,
                "cannot update local transform: no parent frame resolved"
            );
            return;
        };
        let Some(geo) = ctx.frames.georeference(resolved.georeference) else {
            warn!(
                anchor = self.id.0,
                "cannot update local transform: resolved georeference is gone"
            );
            return;
        };

        let mut tileset_transform = Matrix4::identity();
        if let Some(tileset_id) = resolved.tileset {
            if let Some(tileset) = ctx.frames.tileset(tileset_id) {
                tileset_transform = *tileset.transform();
            }
        }

        let mut local =
            tileset_transform * geo.transforms().ecef_to_georeferenced() * self.globe_transform;
        let origin = origin_override.unwrap_or(ctx.world_origin);
        local = with_translation(&local, translation(&local) - origin);

        let Some(entity) = ctx.entities.get_mut(&self.owner) else {
            warn!(
                anchor = self.id.0,
                "cannot update local transform: owner entity is gone"
            );
            return;
        };

        self.updating = true;
        entity.write_transform(local, self.teleport_on_update);
        self.updating = false;
    }

    pub(super) fn update_cartesian_mirrors(&mut self) {
        if !self.globe_transform_valid {
            return;
        }
        let t = translation(&self.globe_transform);
        self.ecef_x = t.x;
        self.ecef_y = t.y;
        self.ecef_z = t.z;
    }

    pub(super) fn update_cartographic_mirrors(&mut self, ctx: &HostContext<'_>) {
        if !self.globe_transform_valid {
            return;
        }
        let Some(resolved) = &self.resolved else {
            warn!(anchor = self.id.0, "no parent frame resolved");
            return;
        };
        let Some(geo) = ctx.frames.georeference(resolved.georeference) else {
            warn!(anchor = self.id.0, "resolved georeference is gone");
            return;
        };

        match geo.transforms().ecef_to_llh(&translation(&self.globe_transform)) {
            Some(llh) => {
                self.longitude = llh.x;
                self.latitude = llh.y;
                self.height = llh.z;
            }
            None => warn!(
                anchor = self.id.0,
                "globe position is too close to the ellipsoid center; cartographic mirrors left unchanged"
            ),
        }
    }

    /// Re-derive the entity's orientation (and optionally scale) from the
    /// sampled surface frame. Applies only on globe-position moves under
    /// a tileset parent; parent-frame changes and rebases skip it because
    /// the globe position did not move.
    fn apply_surface_orientation(&mut self, ctx: &mut HostContext<'_>) {
        if !self.adapt_orientation && !self.adapt_scale {
            return;
        }
        if !self.globe_transform_valid {
            return;
        }
        let Some(resolved) = self.resolved.clone() else {
            return;
        };
        let Some(tileset_id) = resolved.tileset else {
            return;
        };
        let (Some(geo), Some(tileset)) = (
            ctx.frames.georeference(resolved.georeference),
            ctx.frames.tileset(tileset_id),
        ) else {
            return;
        };

        let llh = Vector3::new(self.longitude, self.latitude, self.height);
        let Some(basis) = sample_surface_basis(
            &llh,
            geo.transforms(),
            tileset.transform(),
            &self.surface_config,
        ) else {
            warn!(
                anchor = self.id.0,
                "surface frame samples are degenerate; orientation left unchanged"
            );
            return;
        };

        let Some(entity) = ctx.entities.get_mut(&self.owner) else {
            return;
        };
        let current = *entity.transform();
        let block = current.fixed_view::<3, 3>(0, 0);

        let scale = if self.adapt_scale {
            Vector3::repeat(basis.units_per_meter)
        } else {
            Vector3::new(
                block.column(0).norm(),
                block.column(1).norm(),
                block.column(2).norm(),
            )
        };
        let rotation = if self.adapt_orientation {
            basis.rotation
        } else {
            Matrix3::from_columns(&[
                block.column(0).normalize(),
                block.column(1).normalize(),
                block.column(2).normalize(),
            ])
        };

        let mut oriented = current;
        oriented
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(rotation * Matrix3::from_diagonal(&scale)));

        self.updating = true;
        entity.write_transform(oriented, self.teleport_on_update);
        self.updating = false;
    }
}
