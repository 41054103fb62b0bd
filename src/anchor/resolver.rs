// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Parent frame resolution
//!
//! An anchor binds to exactly one parent frame at a time: a georeference,
//! optionally reached through a tileset body. Resolution is memoized until
//! explicitly invalidated, and invalidation always unsubscribes before
//! clearing so a rebuild can never leave a duplicate subscription behind.
//!
//! Priority order: explicit tileset reference, then tag search over live
//! tilesets in creation order, then explicit georeference reference, then
//! the process-wide default georeference (created on demand).

use super::{GlobeAnchor, HostContext};
use crate::frame::{GeoreferenceId, TilesetId};
use tracing::warn;

/// The currently-effective parent frame of an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFrame {
    pub georeference: GeoreferenceId,
    pub tileset: Option<TilesetId>,
    /// Whether this resolution came from an explicit reference rather
    /// than tag search or the default. Tag edits leave explicit
    /// resolutions alone.
    pub(super) explicit: bool,
}

impl GlobeAnchor {
    /// The cached parent frame, if resolved.
    pub fn resolved_frame(&self) -> Option<&ResolvedFrame> {
        self.resolved.as_ref()
    }

    /// Resolve the parent frame, returning the cached instance when one
    /// is alive. Subscribes to the resolved providers and, when the globe
    /// transform is already valid, recomputes the local transform against
    /// the (possibly new) parent.
    pub fn resolve_parent_frame(&mut self, ctx: &mut HostContext<'_>) -> Option<ResolvedFrame> {
        if let Some(resolved) = self.resolved {
            let georeference_alive = ctx.frames.georeference(resolved.georeference).is_some();
            let tileset_alive = resolved
                .tileset
                .map_or(true, |id| ctx.frames.tileset(id).is_some());
            if georeference_alive && tileset_alive {
                return Some(resolved);
            }
            // A provider died under us; rebuild from scratch.
            self.invalidate_parent_frame(ctx);
        }

        let resolved = self
            .resolve_tileset_candidate(ctx, self.parent_tileset, true)
            .or_else(|| {
                let by_tag = ctx.frames.find_tileset_by_tag(&self.parent_tag);
                self.resolve_tileset_candidate(ctx, by_tag, false)
            })
            .or_else(|| {
                let id = self.parent_georeference?;
                if ctx.frames.georeference(id).is_none() {
                    warn!(
                        anchor = self.id.0,
                        "explicit georeference reference is dead; falling back to default"
                    );
                    return None;
                }
                Some(ResolvedFrame {
                    georeference: id,
                    tileset: None,
                    explicit: true,
                })
            })
            .or_else(|| {
                Some(ResolvedFrame {
                    georeference: ctx.frames.default_georeference(),
                    tileset: None,
                    explicit: false,
                })
            });

        let Some(resolved) = resolved else {
            warn!(anchor = self.id.0, "no parent frame could be resolved");
            return None;
        };

        if let Some(geo) = ctx.frames.georeference_mut(resolved.georeference) {
            geo.on_changed(self.id);
        }
        if let Some(tileset) = resolved.tileset.and_then(|id| ctx.frames.tileset_mut(id)) {
            tileset.on_changed(self.id);
        }
        self.resolved = Some(resolved);

        // Re-place the entity against the new parent, but only when a
        // globe position already exists.
        self.on_parent_frame_changed(ctx);

        Some(resolved)
    }

    /// Unsubscribe from the resolved providers, then clear the cache. The
    /// next resolve starts from the priority chain.
    pub fn invalidate_parent_frame(&mut self, ctx: &mut HostContext<'_>) {
        if let Some(resolved) = self.resolved {
            if let Some(geo) = ctx.frames.georeference_mut(resolved.georeference) {
                geo.unsubscribe(self.id);
            }
            if let Some(tileset) = resolved.tileset.and_then(|id| ctx.frames.tileset_mut(id)) {
                tileset.unsubscribe(self.id);
            }
        }
        self.resolved = None;
    }

    /// Set or clear the explicit tileset reference. Skips the
    /// invalidate/re-resolve cycle when the requested tileset is already
    /// the resolved one.
    pub fn set_parent_tileset(&mut self, ctx: &mut HostContext<'_>, tileset: Option<TilesetId>) {
        if tileset == self.parent_tileset {
            return;
        }
        self.parent_tileset = tileset;

        let already_resolved = match (&self.resolved, tileset) {
            (Some(resolved), Some(id)) => resolved.tileset == Some(id),
            _ => false,
        };
        if already_resolved {
            return;
        }
        self.invalidate_parent_frame(ctx);
        self.resolve_parent_frame(ctx);
    }

    /// Set or clear the explicit georeference reference, with the same
    /// redundancy check as [`set_parent_tileset`](GlobeAnchor::set_parent_tileset).
    pub fn set_parent_georeference(
        &mut self,
        ctx: &mut HostContext<'_>,
        georeference: Option<GeoreferenceId>,
    ) {
        if georeference == self.parent_georeference {
            return;
        }
        self.parent_georeference = georeference;

        let already_resolved = match (&self.resolved, georeference) {
            (Some(resolved), Some(id)) => {
                resolved.tileset.is_none() && resolved.georeference == id
            }
            _ => false,
        };
        if already_resolved {
            return;
        }
        self.invalidate_parent_frame(ctx);
        self.resolve_parent_frame(ctx);
    }

    /// Change the search tag. Re-resolves when the tag actually changed,
    /// unless the current resolution came from an explicit reference (a
    /// tag edit cannot affect those).
    pub fn set_parent_tag(&mut self, ctx: &mut HostContext<'_>, tag: impl Into<String>) {
        let tag = tag.into();
        if tag == self.parent_tag {
            return;
        }
        self.parent_tag = tag;

        if self.resolved.is_some_and(|resolved| resolved.explicit) {
            return;
        }
        self.invalidate_parent_frame(ctx);
        self.resolve_parent_frame(ctx);
    }

    /// Registration: resolve the parent frame, then establish the globe
    /// transform. A valid globe transform re-places the entity (done by
    /// resolve); otherwise the globe transform is computed from the
    /// entity's current local transform.
    pub fn register(&mut self, ctx: &mut HostContext<'_>) {
        if ctx.entities.get(&self.owner).is_none() {
            warn!(anchor = self.id.0, "anchor does not have a live owner entity");
            return;
        }

        self.resolve_parent_frame(ctx);

        if !self.globe_transform_valid {
            self.update_globe_from_local(ctx);
        }
    }

    /// Unregistration: release the parent frame subscription. The globe
    /// transform and mirrors keep their last values but are no longer
    /// maintained.
    pub fn unregister(&mut self, ctx: &mut HostContext<'_>) {
        self.invalidate_parent_frame(ctx);
    }

    fn resolve_tileset_candidate(
        &self,
        ctx: &mut HostContext<'_>,
        candidate: Option<TilesetId>,
        explicit: bool,
    ) -> Option<ResolvedFrame> {
        let id = candidate?;
        let tileset = ctx.frames.tileset(id)?;
        let georeference = tileset.georeference();
        if ctx.frames.georeference(georeference).is_none() {
            warn!(
                anchor = self.id.0,
                tileset = id.0,
                "tileset's georeference is dead; skipping this candidate"
            );
            return None;
        }
        Some(ResolvedFrame {
            georeference,
            tileset: Some(id),
            explicit,
        })
    }
}
