// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh reuse across products sharing a representation
//!
//! The first product tessellated for a [`RepresentationIdentity`] owns the
//! cache entry (first writer wins). Its geometry already contains that
//! product's mapped transform, so later products sharing the mesh are placed
//! with [`transfer_transform`]:
//!
//! ```text
//! world = placement * own_delta * inverse(originating_delta)
//! ```

use crate::error::{Error, Result};
use crate::mesh::TessellatedGeometry;
use crate::representation::RepresentationIdentity;
use ifc_scene_core::EntityId;
use nalgebra::Matrix4;
use rustc_hash::FxHashMap;

/// Tessellated geometry plus the state needed to reuse it
///
/// `H` is the scene host's mesh handle.
#[derive(Debug, Clone)]
pub struct MeshCacheEntry<H> {
    pub geometry: TessellatedGeometry,
    /// Entity the geometry was tessellated for
    pub originating_entity: EntityId,
    /// Mapped transform baked into `geometry`, if the body was mapped
    pub originating_transform: Option<Matrix4<f64>>,
    pub host_mesh: H,
}

/// Outcome of a cache lookup
#[derive(Debug)]
pub struct CacheLookup<'a, H> {
    pub entry: &'a MeshCacheEntry<H>,
    /// The entry existed before the lookup
    pub hit: bool,
}

/// Session-wide mesh cache keyed by representation identity
#[derive(Debug)]
pub struct MeshCache<H> {
    entries: Vec<MeshCacheEntry<H>>,
    index: FxHashMap<RepresentationIdentity, usize>,
}

impl<H> Default for MeshCache<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

impl<H> MeshCache<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, shared or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct shared identities
    pub fn shared(&self) -> usize {
        self.index.len()
    }

    /// Entry for `identity`, if cached
    pub fn get(&self, identity: RepresentationIdentity) -> Option<&MeshCacheEntry<H>> {
        self.index.get(&identity).map(|&slot| &self.entries[slot])
    }

    /// Look up `identity`, creating the entry with `create` on a miss
    ///
    /// A hit returns the stored entry untouched and never calls `create`.
    /// Without an identity the entry is always created and never shared.
    pub fn get_or_create<E>(
        &mut self,
        identity: Option<RepresentationIdentity>,
        create: impl FnOnce() -> std::result::Result<MeshCacheEntry<H>, E>,
    ) -> std::result::Result<CacheLookup<'_, H>, E> {
        if let Some(&slot) = identity.and_then(|id| self.index.get(&id)) {
            return Ok(CacheLookup {
                entry: &self.entries[slot],
                hit: true,
            });
        }

        let entry = create()?;
        let slot = self.entries.len();
        self.entries.push(entry);
        if let Some(identity) = identity {
            self.index.insert(identity, slot);
        }
        Ok(CacheLookup {
            entry: &self.entries[slot],
            hit: false,
        })
    }
}

/// World transform placing a cached mesh for `entity`
///
/// `placement` is the entity's resolved placement and `own_delta` the mapped
/// transform of its own body. The originating entity gets its placement back
/// unchanged.
pub fn transfer_transform<H>(
    entity: EntityId,
    placement: &Matrix4<f64>,
    own_delta: Option<&Matrix4<f64>>,
    entry: &MeshCacheEntry<H>,
) -> Result<Matrix4<f64>> {
    if entity == entry.originating_entity {
        return Ok(*placement);
    }

    let own = own_delta.copied().unwrap_or_else(Matrix4::identity);
    let originating_inverse = match entry.originating_transform {
        Some(originating) => originating
            .try_inverse()
            .ok_or(Error::SingularTransform(entry.originating_entity))?,
        None => Matrix4::identity(),
    };

    Ok(placement * own * originating_inverse)
}
