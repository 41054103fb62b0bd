// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Anchor defaults, loadable from TOML

use super::surface::SurfaceSampleConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

fn default_tag() -> String {
    "World".to_string()
}

/// Construction-time defaults for new anchors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// Move entities immediately on write-back instead of sweeping them,
    /// so physics bodies keep their velocity.
    #[serde(default = "default_true")]
    pub teleport_on_update: bool,
    /// Re-orient entities to the local surface frame when moving across
    /// the globe.
    #[serde(default = "default_true")]
    pub adapt_orientation: bool,
    /// Re-scale entities to keep metric size under a scaled tileset
    /// transform.
    #[serde(default)]
    pub adapt_scale: bool,
    /// Tag used for tag-based parent resolution.
    #[serde(default = "default_tag")]
    pub parent_tag: String,
    /// Forward-difference sampling offsets for the surface frame.
    #[serde(default)]
    pub surface: SurfaceSampleConfig,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            teleport_on_update: true,
            adapt_orientation: true,
            adapt_scale: false,
            parent_tag: default_tag(),
            surface: SurfaceSampleConfig::default(),
        }
    }
}

impl AnchorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse anchor config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read anchor config {}", path.display()))?;
        Self::from_toml_str(&source)
    }
}
