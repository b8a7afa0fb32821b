// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial hierarchy
//!
//! Sites, buildings and storeys become nested collections under the project
//! collection, following their `Decomposes` relations. Entities arrive in no
//! particular order, so placement runs as a worklist: each pass places every
//! entity whose parent already has a node and defers the rest. At most
//! `len + 1` passes run; a pass that places nothing stops early and whatever
//! is still deferred is orphaned. Collections left in the scene by an
//! earlier import are reused by name.

use crate::config::DuplicateNamePolicy;
use crate::error::{ImportError, Result};
use crate::scene::{CollectionId, SceneHost};
use ifc_scene_core::{DecodedEntity, EntityId, IfcModel, IfcType};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// `{EntityType}/{Name}`, with an empty name when `Name` is unset
pub fn qualified_name(entity: &DecodedEntity) -> String {
    format!("{}/{}", entity.ifc_type.name(), entity.name().unwrap_or(""))
}

/// A spatial container placed in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialNode {
    pub entity: EntityId,
    pub collection: CollectionId,
    /// Qualified name of the parent node; `None` directly under the project
    pub parent: Option<String>,
}

/// Two spatial containers with the same qualified name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCollision {
    pub name: String,
    pub kept: EntityId,
    pub dropped: EntityId,
}

#[derive(Debug, Default)]
pub struct SpatialHierarchy {
    pub nodes: FxHashMap<String, SpatialNode>,
    /// Entities never connected to the project
    pub orphans: Vec<EntityId>,
    pub collisions: Vec<NameCollision>,
    /// Worklist passes run
    pub passes: usize,
}

impl SpatialHierarchy {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, qualified_name: &str) -> Option<&SpatialNode> {
        self.nodes.get(qualified_name)
    }

    /// Collection standing for `entity`, looked up by qualified name
    pub fn collection_for(&self, entity: &DecodedEntity) -> Option<CollectionId> {
        self.nodes.get(&qualified_name(entity)).map(|node| node.collection)
    }
}

pub struct SpatialHierarchyBuilder<'m> {
    model: &'m IfcModel,
    project: CollectionId,
    policy: DuplicateNamePolicy,
}

impl<'m> SpatialHierarchyBuilder<'m> {
    pub fn new(model: &'m IfcModel, project: CollectionId) -> Self {
        Self {
            model,
            project,
            policy: DuplicateNamePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DuplicateNamePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Place `entities` under the project collection
    pub fn build<H: SceneHost>(&self, host: &mut H, entities: &[&'m DecodedEntity]) -> Result<SpatialHierarchy> {
        let mut hierarchy = SpatialHierarchy::default();
        let mut pending: Vec<&DecodedEntity> = entities.to_vec();
        let max_passes = entities.len() + 1;

        while !pending.is_empty() && hierarchy.passes < max_passes {
            hierarchy.passes += 1;
            let mut deferred = Vec::new();
            let mut progressed = false;

            for entity in pending {
                let parent = match self.model.aggregate_parent(entity.id) {
                    Ok(Some(parent)) => parent,
                    Ok(None) => {
                        tracing::debug!(entity = entity.id, "Spatial entity has no Decomposes relation");
                        hierarchy.orphans.push(entity.id);
                        progressed = true;
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(entity = entity.id, error = %e, "Unresolvable Decomposes relation");
                        hierarchy.orphans.push(entity.id);
                        progressed = true;
                        continue;
                    }
                };

                let (collection, parent_name) = if parent.ifc_type == IfcType::IfcProject {
                    (self.project, None)
                } else {
                    let parent_name = qualified_name(parent);
                    match hierarchy.nodes.get(&parent_name) {
                        Some(node) => (node.collection, Some(parent_name)),
                        None => {
                            deferred.push(entity);
                            continue;
                        }
                    }
                };

                progressed = true;
                self.place(host, &mut hierarchy, entity, collection, parent_name)?;
            }

            pending = deferred;
            if !progressed {
                break;
            }
        }

        for entity in pending {
            tracing::warn!(
                entity = entity.id,
                name = %qualified_name(entity),
                "Spatial entity not connected to the project, dropped"
            );
            hierarchy.orphans.push(entity.id);
        }

        tracing::debug!(
            nodes = hierarchy.nodes.len(),
            orphans = hierarchy.orphans.len(),
            passes = hierarchy.passes,
            "Built spatial hierarchy"
        );
        Ok(hierarchy)
    }

    fn place<H: SceneHost>(
        &self,
        host: &mut H,
        hierarchy: &mut SpatialHierarchy,
        entity: &DecodedEntity,
        parent: CollectionId,
        parent_name: Option<String>,
    ) -> Result<()> {
        let name = qualified_name(entity);
        if let Some(existing) = hierarchy.nodes.get(&name) {
            let (first, duplicate) = (existing.entity, entity.id);
            return match self.policy {
                DuplicateNamePolicy::Reject => Err(ImportError::DuplicateSpatialName {
                    name,
                    first,
                    duplicate,
                }),
                DuplicateNamePolicy::KeepFirst => {
                    tracing::warn!(name = %name, kept = first, dropped = duplicate, "Duplicate spatial name");
                    hierarchy.collisions.push(NameCollision {
                        name,
                        kept: first,
                        dropped: duplicate,
                    });
                    Ok(())
                }
            };
        }

        let collection = host.ensure_collection(&name, Some(parent))?;
        hierarchy.nodes.insert(
            name,
            SpatialNode {
                entity: entity.id,
                collection,
                parent: parent_name,
            },
        );
        Ok(())
    }
}
