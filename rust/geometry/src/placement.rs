// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement chain resolution
//!
//! Walks `IfcLocalPlacement.PlacementRelTo` up to the root and composes
//! parent-then-local. Resolved placements are cached for the session, since
//! siblings share their parents.

use crate::error::{Error, Result};
use crate::transform::parse_axis2_placement;
use ifc_scene_core::{DecodedEntity, EntityId, IfcModel, IfcType};
use nalgebra::Matrix4;
use rustc_hash::FxHashMap;

/// Resolves object placements into world transforms (model units)
#[derive(Debug, Default)]
pub struct PlacementResolver {
    cache: FxHashMap<EntityId, Matrix4<f64>>,
    ignore_site_coordinates: bool,
}

impl PlacementResolver {
    /// Chains deeper than this are treated as malformed
    pub const MAX_PLACEMENT_DEPTH: usize = 100;

    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress the contribution of placements that place an `IfcSite`
    pub fn with_ignore_site_coordinates(mut self, ignore: bool) -> Self {
        self.ignore_site_coordinates = ignore;
        self
    }

    /// Number of cached placements
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// World transform of a product's `ObjectPlacement` (attribute 5); identity if none
    pub fn resolve_product(&mut self, model: &IfcModel, product: &DecodedEntity) -> Result<Matrix4<f64>> {
        match model.resolve_attr(product, 5)? {
            Some(placement) => self.resolve(model, placement),
            None => Ok(Matrix4::identity()),
        }
    }

    /// World transform of an object placement
    pub fn resolve(&mut self, model: &IfcModel, placement: &DecodedEntity) -> Result<Matrix4<f64>> {
        self.resolve_with_depth(model, placement, placement.id, 0)
    }

    fn resolve_with_depth(
        &mut self,
        model: &IfcModel,
        placement: &DecodedEntity,
        start: EntityId,
        depth: usize,
    ) -> Result<Matrix4<f64>> {
        if depth > Self::MAX_PLACEMENT_DEPTH {
            return Err(Error::PlacementTooDeep(start, Self::MAX_PLACEMENT_DEPTH));
        }
        if let Some(cached) = self.cache.get(&placement.id) {
            return Ok(*cached);
        }

        // Grid and linear placements are not resolved
        if placement.ifc_type != IfcType::IfcLocalPlacement {
            return Ok(Matrix4::identity());
        }

        // Attribute 0: PlacementRelTo
        let parent_transform = match model.resolve_attr(placement, 0)? {
            Some(parent) => self.resolve_with_depth(model, parent, start, depth + 1)?,
            None => Matrix4::identity(),
        };

        let transform = if self.ignore_site_coordinates && self.places_site(model, placement.id) {
            parent_transform
        } else {
            // Attribute 1: RelativePlacement
            let local_transform = match model.resolve_attr(placement, 1)? {
                Some(relative) => parse_axis2_placement(relative, model)?,
                None => Matrix4::identity(),
            };
            parent_transform * local_transform
        };

        self.cache.insert(placement.id, transform);
        Ok(transform)
    }

    fn places_site(&self, model: &IfcModel, placement: EntityId) -> bool {
        model
            .places_object(placement)
            .any(|product| product.ifc_type == IfcType::IfcSite)
    }
}
