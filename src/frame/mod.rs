// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Geoanchor Contributors

//! Frame providers - georeferences, tilesets, and their registry

mod georeference;
mod notifier;
mod registry;
mod tileset;

pub use georeference::{Georeference, GeoreferenceId};
pub use notifier::ChangeNotifier;
pub use registry::FrameRegistry;
pub use tileset::{Tileset, TilesetId};
