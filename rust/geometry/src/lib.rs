// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Scene Geometry
//!
//! Placement resolution, tessellation and mesh reuse for IFC products, using
//! nalgebra for transformations and earcutr for profile triangulation.

pub mod error;
pub mod mesh;
pub mod mesh_cache;
pub mod placement;
pub mod representation;
pub mod tessellator;
pub mod transform;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector3};

pub use error::{Error, Result};
pub use mesh::TessellatedGeometry;
pub use mesh_cache::{transfer_transform, CacheLookup, MeshCache, MeshCacheEntry};
pub use placement::PlacementResolver;
pub use representation::{
    body_representation, mapped_body_transform, representation_identity, RepresentationIdentity,
};
pub use tessellator::{BasicTessellator, Shape, TessellationSettings, Tessellator};
pub use transform::scale_translation;
