// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Persisted anchor state
//!
//! The record carries the 16 doubles of the globe transform in an
//! explicit **column-major** flat encoding plus the validity flag.
//! Records written before the validity flag existed load with the flag
//! defaulted to `true`: the previously-stored transform was always valid.

use super::{GlobeAnchor, HostContext};
use anyhow::{Context, Result};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_tag() -> String {
    "World".to_string()
}

/// Serializable snapshot of an anchor's persisted state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorRecord {
    /// Globe transform, column-major: elements 0..4 are the first column.
    pub globe_transform: [f64; 16],
    /// Absent in records from before the flag existed; those load as
    /// valid.
    #[serde(default = "default_true")]
    pub globe_transform_valid: bool,
    #[serde(default = "default_true")]
    pub teleport_on_update: bool,
    #[serde(default = "default_true")]
    pub adapt_orientation: bool,
    #[serde(default)]
    pub adapt_scale: bool,
    #[serde(default = "default_tag")]
    pub parent_tag: String,
}

impl AnchorRecord {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to encode anchor record")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to decode anchor record")
    }
}

impl GlobeAnchor {
    /// Snapshot the persisted state.
    pub fn to_record(&self) -> AnchorRecord {
        let mut flat = [0.0; 16];
        flat.copy_from_slice(self.globe_transform.as_slice());
        AnchorRecord {
            globe_transform: flat,
            globe_transform_valid: self.globe_transform_valid,
            teleport_on_update: self.teleport_on_update,
            adapt_orientation: self.adapt_orientation,
            adapt_scale: self.adapt_scale,
            parent_tag: self.parent_tag.clone(),
        }
    }

    /// Restore persisted state. When the restored globe transform is
    /// valid, the mirrors are re-derived from it and the entity is
    /// re-placed; the record's mirror-free encoding can never disagree
    /// with the transform.
    pub fn apply_record(&mut self, ctx: &mut HostContext<'_>, record: &AnchorRecord) {
        self.globe_transform = Matrix4::from_column_slice(&record.globe_transform);
        self.globe_transform_valid = record.globe_transform_valid;
        self.teleport_on_update = record.teleport_on_update;
        self.adapt_orientation = record.adapt_orientation;
        self.adapt_scale = record.adapt_scale;
        self.parent_tag = record.parent_tag.clone();

        if self.globe_transform_valid {
            self.update_cartesian_mirrors();
            if self.resolved.is_some() {
                self.update_cartographic_mirrors(ctx);
                self.update_local_from_globe(ctx, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_record_without_flag_is_valid() {
        let json = r#"{"globe_transform":[1.0,0.0,0.0,0.0,0.0,1.0,0.0,0.0,0.0,0.0,1.0,0.0,6378137.0,0.0,0.0,1.0]}"#;
        let record = AnchorRecord::from_json(json).unwrap();
        assert!(record.globe_transform_valid);
        assert!(record.teleport_on_update);
        assert_eq!(record.parent_tag, "World");
    }

    #[test]
    fn test_column_major_encoding() {
        let record = AnchorRecord {
            globe_transform: {
                let m = Matrix4::new_translation(&nalgebra::Vector3::new(1.0, 2.0, 3.0));
                let mut flat = [0.0; 16];
                flat.copy_from_slice(m.as_slice());
                flat
            },
            globe_transform_valid: true,
            teleport_on_update: true,
            adapt_orientation: true,
            adapt_scale: false,
            parent_tag: "World".into(),
        };
        // Translation lives in the fourth column for a column-major
        // encoding.
        assert_eq!(&record.globe_transform[12..15], &[1.0, 2.0, 3.0]);
        let back = Matrix4::from_column_slice(&record.globe_transform);
        assert_eq!(back[(0, 3)], 1.0);
        assert_eq!(back[(2, 3)], 3.0);
    }

    #[test]
    fn test_json_round_trip() {
        let record = AnchorRecord {
            globe_transform: [0.5; 16],
            globe_transform_valid: false,
            teleport_on_update: false,
            adapt_orientation: false,
            adapt_scale: true,
            parent_tag: "Moon".into(),
        };
        let json = record.to_json().unwrap();
        let back = AnchorRecord::from_json(&json).unwrap();
        assert_eq!(back.globe_transform, record.globe_transform);
        assert!(!back.globe_transform_valid);
        assert!(back.adapt_scale);
        assert_eq!(back.parent_tag, "Moon");
    }
}
