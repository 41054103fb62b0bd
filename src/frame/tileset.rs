// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Tileset frame provider
//!
//! A tileset is a moving body: a georeferenced frame that additionally
//! carries its own local->engine transform. Anchors resolved against a
//! tileset follow it when it moves.

use super::{ChangeNotifier, GeoreferenceId};
use crate::anchor::AnchorId;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

/// Identifier of a tileset within a [`FrameRegistry`](super::FrameRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilesetId(pub u64);

/// A tileset frame provider.
#[derive(Debug, Clone)]
pub struct Tileset {
    id: TilesetId,
    tag: String,
    georeference: GeoreferenceId,
    transform: Matrix4<f64>,
    notifier: ChangeNotifier,
}

impl Tileset {
    pub fn new(id: TilesetId, tag: impl Into<String>, georeference: GeoreferenceId) -> Self {
        Self {
            id,
            tag: tag.into(),
            georeference,
            transform: Matrix4::identity(),
            notifier: ChangeNotifier::new(),
        }
    }

    pub fn id(&self) -> TilesetId {
        self.id
    }

    /// Tag used by tag-based parent resolution.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
    }

    /// The georeference this tileset is placed by.
    pub fn georeference(&self) -> GeoreferenceId {
        self.georeference
    }

    /// The tileset body's own local->engine transform.
    pub fn transform(&self) -> &Matrix4<f64> {
        &self.transform
    }

    /// Move the tileset body. Returns `true` when the transform actually
    /// changed; the caller fans the change out to subscribers.
    pub fn set_transform(&mut self, transform: Matrix4<f64>) -> bool {
        if transform == self.transform {
            return false;
        }
        self.transform = transform;
        true
    }

    pub fn on_changed(&mut self, anchor: AnchorId) {
        self.notifier.subscribe(anchor);
    }

    pub fn unsubscribe(&mut self, anchor: AnchorId) {
        self.notifier.unsubscribe(anchor);
    }

    pub fn subscribers(&self) -> Vec<AnchorId> {
        self.notifier.subscribers()
    }
}
