// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Globe anchor module - the transform-synchronization state machine
//!
//! A [`GlobeAnchor`] keeps one entity's placement consistent across three
//! representations: its canonical ECEF globe transform, the geodetic
//! longitude/latitude/height view of it, and the host engine's local
//! (floating-origin) world space.

mod anchor;
mod config;
mod persist;
mod resolver;
mod surface;

pub use anchor::GlobeAnchor;
pub use config::AnchorConfig;
pub use persist::AnchorRecord;
pub use resolver::ResolvedFrame;
pub use surface::{SurfaceBasis, SurfaceSampleConfig};

use crate::frame::{FrameRegistry, GeoreferenceId, TilesetId};
use crate::scene::{Entity, EntityId};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Identifier of an anchor within a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorId(pub u64);

/// Synchronization state of a globe anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorState {
    /// No parent frame bound; the globe transform is meaningless.
    Unresolved,
    /// Parent frame bound, globe transform not yet computed from the
    /// entity's local transform.
    Invalid,
    /// The globe transform is authoritative and mirrors are in sync.
    Valid,
}

/// Failures of host-facing operations. Per-frame synchronization paths
/// never return these: they degrade to a logged warning and a sentinel.
#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("unknown entity {0:?}")]
    UnknownEntity(EntityId),
    #[error("unknown anchor {0:?}")]
    UnknownAnchor(AnchorId),
    #[error("unknown georeference {0:?}")]
    UnknownGeoreference(GeoreferenceId),
    #[error("unknown tileset {0:?}")]
    UnknownTileset(TilesetId),
    #[error("entity {0:?} already has an anchor")]
    AlreadyAnchored(EntityId),
}

/// The slice of host state an anchor operation may touch. Built by the
/// scene for the duration of one synchronous mutation; the anchor itself
/// is taken out of the scene first, so these borrows never alias it.
pub struct HostContext<'a> {
    /// The host's current floating-origin location in absolute engine
    /// space. During a rebase the anchor receives the upcoming origin as
    /// an explicit argument instead, because this field is still the old
    /// value at that point.
    pub world_origin: Vector3<f64>,
    pub entities: &'a mut BTreeMap<EntityId, Entity>,
    pub frames: &'a mut FrameRegistry,
}
