// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory IFC source model
//!
//! Holds every decoded entity of a file, in file order, together with an
//! inverse index of the relations the scene importer traverses
//! (`Decomposes`, `ContainedInStructure`, `HasAssociations`, `StyledByItem`,
//! `PlacesObject`, material `HasRepresentation`). The model is read-only once
//! built.

use crate::entity::{AttributeValue, DecodedEntity};
use crate::error::{Error, Result};
use crate::parser::EntityScanner;
use crate::schema::IfcType;
use crate::EntityId;
use rustc_hash::FxHashMap;
use std::path::Path;

/// Inverse relations, each keyed by the entity the relation points at
#[derive(Debug, Default)]
struct InverseIndex {
    /// Related object -> IfcRelAggregates
    decomposes: FxHashMap<EntityId, Vec<EntityId>>,
    /// Related element -> IfcRelContainedInSpatialStructure
    contained_in_structure: FxHashMap<EntityId, Vec<EntityId>>,
    /// Related object -> IfcRelAssociatesMaterial
    has_associations: FxHashMap<EntityId, Vec<EntityId>>,
    /// Representation item -> IfcStyledItem
    styled_by_item: FxHashMap<EntityId, Vec<EntityId>>,
    /// Object placement -> products using it
    places_object: FxHashMap<EntityId, Vec<EntityId>>,
    /// Material -> IfcMaterialDefinitionRepresentation
    material_representations: FxHashMap<EntityId, Vec<EntityId>>,
}

impl InverseIndex {
    fn record(&mut self, entity: &DecodedEntity) {
        fn push(map: &mut FxHashMap<EntityId, Vec<EntityId>>, key: EntityId, rel: EntityId) {
            map.entry(key).or_default().push(rel);
        }

        match entity.ifc_type {
            // IfcRelAggregates: 4 RelatingObject, 5 RelatedObjects
            IfcType::IfcRelAggregates => {
                for child in entity.get_ref_list(5) {
                    push(&mut self.decomposes, child, entity.id);
                }
            }
            // IfcRelContainedInSpatialStructure: 4 RelatedElements, 5 RelatingStructure
            IfcType::IfcRelContainedInSpatialStructure => {
                for element in entity.get_ref_list(4) {
                    push(&mut self.contained_in_structure, element, entity.id);
                }
            }
            // IfcRelAssociatesMaterial: 4 RelatedObjects, 5 RelatingMaterial
            IfcType::IfcRelAssociatesMaterial => {
                for object in entity.get_ref_list(4) {
                    push(&mut self.has_associations, object, entity.id);
                }
            }
            // IfcStyledItem: 0 Item, 1 Styles, 2 Name
            IfcType::IfcStyledItem => {
                if let Some(item) = entity.get_ref(0) {
                    push(&mut self.styled_by_item, item, entity.id);
                }
            }
            // IfcMaterialDefinitionRepresentation: 3 RepresentedMaterial
            IfcType::IfcMaterialDefinitionRepresentation => {
                if let Some(material) = entity.get_ref(3) {
                    push(&mut self.material_representations, material, entity.id);
                }
            }
            _ => {}
        }

        // IfcProduct: 5 ObjectPlacement
        let is_product = entity.ifc_type.is_element()
            || entity.ifc_type.is_spatial_structure()
            || entity.ifc_type == IfcType::IfcSpace;
        if is_product {
            if let Some(placement) = entity.get_ref(5) {
                push(&mut self.places_object, placement, entity.id);
            }
        }
    }
}

/// Read-only IFC entity store
#[derive(Debug, Default)]
pub struct IfcModel {
    entities: FxHashMap<EntityId, DecodedEntity>,
    /// Entity ids in file order
    order: Vec<EntityId>,
    inverse: InverseIndex,
}

impl IfcModel {
    /// Read and parse an IFC-SPF file
    ///
    /// Content that is not valid UTF-8 is read as ISO 8859-1, so files
    /// carrying raw Latin-1 bytes in string literals still load.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&decode_source(bytes))
    }

    /// Parse IFC-SPF content
    pub fn parse(content: &str) -> Result<Self> {
        let mut entities = Vec::new();
        for raw in EntityScanner::new(content)? {
            let (id, type_name, tokens) = raw?;
            entities.push(DecodedEntity::new(
                id,
                IfcType::from_step_name(type_name),
                tokens.iter().map(AttributeValue::from_token).collect(),
            ));
        }
        Ok(Self::from_entities(entities))
    }

    /// Build a model from already decoded entities; iteration order becomes file order
    pub fn from_entities(entities: impl IntoIterator<Item = DecodedEntity>) -> Self {
        let mut model = Self::default();
        for entity in entities {
            let id = entity.id;
            model.inverse.record(&entity);
            if model.entities.insert(id, entity).is_none() {
                model.order.push(id);
            }
        }
        model
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the model holds no entities
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Look up an entity by id
    pub fn get(&self, id: EntityId) -> Option<&DecodedEntity> {
        self.entities.get(&id)
    }

    /// Look up an entity by id, failing if absent
    pub fn entity(&self, id: EntityId) -> Result<&DecodedEntity> {
        self.get(id).ok_or(Error::EntityNotFound(id))
    }

    /// Resolve an entity reference attribute; non-reference values resolve to `None`
    pub fn resolve_ref(&self, attr: &AttributeValue) -> Result<Option<&DecodedEntity>> {
        match attr.as_entity_ref() {
            Some(id) => self.entity(id).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve every reference in a list attribute
    pub fn resolve_ref_list(&self, attr: &AttributeValue) -> Result<Vec<&DecodedEntity>> {
        let Some(items) = attr.as_list() else {
            return Ok(Vec::new());
        };
        items
            .iter()
            .filter_map(|item| item.as_entity_ref())
            .map(|id| self.entity(id))
            .collect()
    }

    /// Resolve the reference held in attribute `index` of `entity`
    pub fn resolve_attr(&self, entity: &DecodedEntity, index: usize) -> Result<Option<&DecodedEntity>> {
        match entity.get(index) {
            Some(attr) => self.resolve_ref(attr),
            None => Ok(None),
        }
    }

    /// All entities in file order
    pub fn iter(&self) -> impl Iterator<Item = &DecodedEntity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// Entities of exactly `ifc_type`, in file order
    pub fn by_type(&self, ifc_type: IfcType) -> impl Iterator<Item = &DecodedEntity> {
        self.iter().filter(move |e| e.ifc_type == ifc_type)
    }

    /// Entities whose type satisfies `predicate`, in file order
    pub fn by_category<'a>(
        &'a self,
        predicate: impl Fn(&IfcType) -> bool + 'a,
    ) -> impl Iterator<Item = &'a DecodedEntity> {
        self.iter().filter(move |e| predicate(&e.ifc_type))
    }

    fn related<'a>(
        &'a self,
        map: &'a FxHashMap<EntityId, Vec<EntityId>>,
        id: EntityId,
    ) -> impl Iterator<Item = &'a DecodedEntity> {
        map.get(&id)
            .into_iter()
            .flatten()
            .filter_map(|rel| self.entities.get(rel))
    }

    /// `IfcRelAggregates` relations in which `id` is a part
    pub fn decomposes(&self, id: EntityId) -> impl Iterator<Item = &DecodedEntity> {
        self.related(&self.inverse.decomposes, id)
    }

    /// `IfcRelContainedInSpatialStructure` relations containing `id`
    pub fn contained_in_structure(&self, id: EntityId) -> impl Iterator<Item = &DecodedEntity> {
        self.related(&self.inverse.contained_in_structure, id)
    }

    /// `IfcRelAssociatesMaterial` relations associated with `id`
    pub fn has_associations(&self, id: EntityId) -> impl Iterator<Item = &DecodedEntity> {
        self.related(&self.inverse.has_associations, id)
    }

    /// `IfcStyledItem`s styling representation item `id`
    pub fn styled_by_item(&self, id: EntityId) -> impl Iterator<Item = &DecodedEntity> {
        self.related(&self.inverse.styled_by_item, id)
    }

    /// Products placed by object placement `id`
    pub fn places_object(&self, id: EntityId) -> impl Iterator<Item = &DecodedEntity> {
        self.related(&self.inverse.places_object, id)
    }

    /// `IfcMaterialDefinitionRepresentation`s of material `id`
    pub fn material_representations(&self, id: EntityId) -> impl Iterator<Item = &DecodedEntity> {
        self.related(&self.inverse.material_representations, id)
    }

    /// Parent object of `id` through its first `Decomposes` relation
    pub fn aggregate_parent(&self, id: EntityId) -> Result<Option<&DecodedEntity>> {
        match self.decomposes(id).next() {
            Some(rel) => self.resolve_attr(rel, 4),
            None => Ok(None),
        }
    }

    /// Spatial structure of `id` through its first `ContainedInStructure` relation
    pub fn containing_structure(&self, id: EntityId) -> Result<Option<&DecodedEntity>> {
        match self.contained_in_structure(id).next() {
            Some(rel) => self.resolve_attr(rel, 5),
            None => Ok(None),
        }
    }
}

/// UTF-8 when valid, otherwise every byte is taken as its ISO 8859-1 code point
fn decode_source(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}
