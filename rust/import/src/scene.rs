// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene host interface and an in-memory scene graph
//!
//! The importer only talks to [`SceneHost`]. [`SceneGraph`] is the bundled
//! implementation: collections, meshes and objects stored in arenas and
//! addressed by index handles.

use crate::material::{Material, MaterialAssignment, MaterialSlot};
use crate::schema::ScalarValue;
use ifc_scene_geometry::TessellatedGeometry;
use nalgebra::{Matrix4, Point3};
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

/// Errors reported by a scene host
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Mesh {0} has no geometry")]
    EmptyMesh(String),

    #[error("Failed to create mesh {name}: {reason}")]
    MeshCreation { name: String, reason: String },

    #[error("Unknown collection {0:?}")]
    UnknownCollection(CollectionId),

    #[error("Unknown mesh {0:?}")]
    UnknownMesh(MeshId),

    #[error("Unknown object {0:?}")]
    UnknownObject(ObjectId),
}

/// Everything needed to create one placed object
#[derive(Debug, Clone)]
pub struct ObjectSpec {
    pub name: String,
    pub mesh: MeshId,
    pub matrix_world: Matrix4<f64>,
    pub material: Option<MaterialAssignment>,
    /// Recorded so a later import can purge the object
    pub global_id: Option<String>,
    pub attributes: Vec<(String, ScalarValue)>,
}

/// The scene the importer writes into
pub trait SceneHost {
    /// Create a collection under `parent`, or under the scene root
    fn create_collection(&mut self, name: &str, parent: Option<CollectionId>) -> Result<CollectionId, SceneError>;

    /// Existing collection called `name` directly under `parent` (or the scene root)
    fn find_collection(&self, name: &str, parent: Option<CollectionId>) -> Option<CollectionId>;

    /// Reuse the collection called `name` under `parent`, creating it if absent
    fn ensure_collection(&mut self, name: &str, parent: Option<CollectionId>) -> Result<CollectionId, SceneError> {
        match self.find_collection(name, parent) {
            Some(existing) => Ok(existing),
            None => self.create_collection(name, parent),
        }
    }

    /// Create mesh data from tessellated geometry
    fn create_mesh(&mut self, name: &str, geometry: &TessellatedGeometry) -> Result<MeshId, SceneError>;

    fn create_object(&mut self, spec: ObjectSpec) -> Result<ObjectId, SceneError>;

    /// Link an object into a collection, or into the scene root
    fn link_object(&mut self, object: ObjectId, collection: Option<CollectionId>) -> Result<(), SceneError>;

    /// Existing objects with their recorded global id
    fn objects(&self) -> Vec<(ObjectId, Option<String>)>;

    /// Remove objects, returning how many were removed
    fn remove_objects(&mut self, objects: &[ObjectId]) -> usize;
}

#[derive(Debug, Clone)]
pub struct SceneCollection {
    pub name: String,
    pub parent: Option<CollectionId>,
    pub children: Vec<CollectionId>,
    pub objects: Vec<ObjectId>,
}

#[derive(Debug, Clone)]
pub struct SceneMesh {
    pub name: String,
    pub geometry: TessellatedGeometry,
    /// Data-level materials
    pub materials: Vec<Material>,
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub mesh: MeshId,
    pub matrix_world: Matrix4<f64>,
    /// Object-level material
    pub material: Option<Material>,
    pub global_id: Option<String>,
    pub attributes: FxHashMap<String, ScalarValue>,
}

/// In-memory scene
#[derive(Debug, Default)]
pub struct SceneGraph {
    collections: Vec<SceneCollection>,
    meshes: Vec<SceneMesh>,
    objects: Vec<Option<SceneObject>>,
    root_collections: Vec<CollectionId>,
    root_objects: Vec<ObjectId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(&self, id: CollectionId) -> Option<&SceneCollection> {
        self.collections.get(id.0)
    }

    /// First collection called `name`
    pub fn collection_by_name(&self, name: &str) -> Option<(CollectionId, &SceneCollection)> {
        self.collections
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == name)
            .map(|(index, c)| (CollectionId(index), c))
    }

    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    pub fn root_collections(&self) -> &[CollectionId] {
        &self.root_collections
    }

    /// Objects linked directly to the scene root
    pub fn root_objects(&self) -> &[ObjectId] {
        &self.root_objects
    }

    pub fn mesh(&self, id: MeshId) -> Option<&SceneMesh> {
        self.meshes.get(id.0)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0).and_then(Option::as_ref)
    }

    /// Live object recorded with `global_id`
    pub fn object_by_global_id(&self, global_id: &str) -> Option<(ObjectId, &SceneObject)> {
        self.live_objects()
            .find(|(_, object)| object.global_id.as_deref() == Some(global_id))
    }

    pub fn object_count(&self) -> usize {
        self.live_objects().count()
    }

    pub fn live_objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(index, object)| object.as_ref().map(|o| (ObjectId(index), o)))
    }

    /// Mesh vertices of an object in world space
    pub fn world_vertices(&self, id: ObjectId) -> Vec<Point3<f64>> {
        let Some(object) = self.object(id) else {
            return Vec::new();
        };
        let Some(mesh) = self.mesh(object.mesh) else {
            return Vec::new();
        };
        mesh.geometry
            .positions()
            .map(|p| object.matrix_world.transform_point(&p))
            .collect()
    }
}

impl SceneHost for SceneGraph {
    fn create_collection(&mut self, name: &str, parent: Option<CollectionId>) -> Result<CollectionId, SceneError> {
        let id = CollectionId(self.collections.len());
        match parent {
            Some(parent) => self
                .collections
                .get_mut(parent.0)
                .ok_or(SceneError::UnknownCollection(parent))?
                .children
                .push(id),
            None => self.root_collections.push(id),
        }
        self.collections.push(SceneCollection {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            objects: Vec::new(),
        });
        Ok(id)
    }

    fn find_collection(&self, name: &str, parent: Option<CollectionId>) -> Option<CollectionId> {
        let siblings = match parent {
            Some(parent) => &self.collection(parent)?.children,
            None => &self.root_collections,
        };
        siblings
            .iter()
            .copied()
            .find(|id| self.collection(*id).is_some_and(|c| c.name == name))
    }

    fn create_mesh(&mut self, name: &str, geometry: &TessellatedGeometry) -> Result<MeshId, SceneError> {
        if geometry.is_empty() {
            return Err(SceneError::EmptyMesh(name.to_string()));
        }
        let vertex_count = geometry.vertex_count();
        if let Some(index) = geometry
            .faces
            .iter()
            .chain(&geometry.edges)
            .find(|&&i| i as usize >= vertex_count)
        {
            return Err(SceneError::MeshCreation {
                name: name.to_string(),
                reason: format!("index {} out of range for {} vertices", index, vertex_count),
            });
        }

        // Edges only survive on curve-only meshes
        let mut geometry = geometry.clone();
        if !geometry.faces.is_empty() {
            geometry.edges.clear();
        }

        let id = MeshId(self.meshes.len());
        self.meshes.push(SceneMesh {
            name: name.to_string(),
            geometry,
            materials: Vec::new(),
        });
        Ok(id)
    }

    fn create_object(&mut self, spec: ObjectSpec) -> Result<ObjectId, SceneError> {
        let mesh = self
            .meshes
            .get_mut(spec.mesh.0)
            .ok_or(SceneError::UnknownMesh(spec.mesh))?;

        let material = match spec.material {
            Some(MaterialAssignment {
                material,
                slot: MaterialSlot::Data,
            }) => {
                if !mesh.materials.iter().any(|m| m.name == material.name) {
                    mesh.materials.push(material);
                }
                None
            }
            Some(MaterialAssignment {
                material,
                slot: MaterialSlot::Object,
            }) => Some(material),
            None => None,
        };

        let id = ObjectId(self.objects.len());
        self.objects.push(Some(SceneObject {
            name: spec.name,
            mesh: spec.mesh,
            matrix_world: spec.matrix_world,
            material,
            global_id: spec.global_id,
            attributes: spec.attributes.into_iter().collect(),
        }));
        Ok(id)
    }

    fn link_object(&mut self, object: ObjectId, collection: Option<CollectionId>) -> Result<(), SceneError> {
        if self.object(object).is_none() {
            return Err(SceneError::UnknownObject(object));
        }
        match collection {
            Some(collection) => self
                .collections
                .get_mut(collection.0)
                .ok_or(SceneError::UnknownCollection(collection))?
                .objects
                .push(object),
            None => self.root_objects.push(object),
        }
        Ok(())
    }

    fn objects(&self) -> Vec<(ObjectId, Option<String>)> {
        self.live_objects()
            .map(|(id, object)| (id, object.global_id.clone()))
            .collect()
    }

    fn remove_objects(&mut self, objects: &[ObjectId]) -> usize {
        let mut removed = 0;
        for id in objects {
            if let Some(slot) = self.objects.get_mut(id.0) {
                if slot.take().is_some() {
                    removed += 1;
                }
            }
        }
        for collection in &mut self.collections {
            collection.objects.retain(|id| !objects.contains(id));
        }
        self.root_objects.retain(|id| !objects.contains(id));
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> TessellatedGeometry {
        let mut geometry = TessellatedGeometry::new();
        let a = geometry.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = geometry.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = geometry.add_vertex(Point3::new(0.0, 1.0, 0.0));
        geometry.add_triangle(a, b, c);
        geometry.add_edge(a, b);
        geometry
    }

    fn spec(mesh: MeshId, material: Option<MaterialAssignment>) -> ObjectSpec {
        ObjectSpec {
            name: "IfcWall/A".into(),
            mesh,
            matrix_world: Matrix4::new_translation(&nalgebra::Vector3::new(2.0, 0.0, 0.0)),
            material,
            global_id: Some("gid".into()),
            attributes: vec![("Name".into(), ScalarValue::Text("A".into()))],
        }
    }

    fn material(name: &str, slot: MaterialSlot) -> MaterialAssignment {
        MaterialAssignment {
            material: Material {
                name: name.into(),
                diffuse: None,
                external: None,
            },
            slot,
        }
    }

    #[test]
    fn test_mesh_drops_edges_when_faces_exist() {
        let mut scene = SceneGraph::new();
        let mesh = scene.create_mesh("m", &triangle()).unwrap();
        assert!(scene.mesh(mesh).unwrap().geometry.edges.is_empty());

        let mut curve = TessellatedGeometry::new();
        let a = curve.add_vertex(Point3::origin());
        let b = curve.add_vertex(Point3::new(1.0, 0.0, 0.0));
        curve.add_edge(a, b);
        let mesh = scene.create_mesh("c", &curve).unwrap();
        assert_eq!(scene.mesh(mesh).unwrap().geometry.edge_count(), 1);
    }

    #[test]
    fn test_invalid_meshes_rejected() {
        let mut scene = SceneGraph::new();
        assert!(matches!(
            scene.create_mesh("empty", &TessellatedGeometry::new()),
            Err(SceneError::EmptyMesh(_))
        ));
        let mut broken = triangle();
        broken.add_triangle(0, 1, 7);
        assert!(matches!(
            scene.create_mesh("broken", &broken),
            Err(SceneError::MeshCreation { .. })
        ));
    }

    #[test]
    fn test_material_slots() {
        let mut scene = SceneGraph::new();
        let mesh = scene.create_mesh("m", &triangle()).unwrap();
        let data = scene
            .create_object(spec(mesh, Some(material("Concrete", MaterialSlot::Data))))
            .unwrap();
        scene
            .create_object(spec(mesh, Some(material("Concrete", MaterialSlot::Data))))
            .unwrap();
        let object = scene
            .create_object(spec(mesh, Some(material("Red", MaterialSlot::Object))))
            .unwrap();

        assert!(scene.object(data).unwrap().material.is_none());
        assert_eq!(scene.mesh(mesh).unwrap().materials.len(), 1);
        assert_eq!(scene.object(object).unwrap().material.as_ref().unwrap().name, "Red");
    }

    #[test]
    fn test_link_and_remove() {
        let mut scene = SceneGraph::new();
        let project = scene.create_collection("IfcProject/P", None).unwrap();
        let site = scene.create_collection("IfcSite/S", Some(project)).unwrap();
        let mesh = scene.create_mesh("m", &triangle()).unwrap();
        let a = scene.create_object(spec(mesh, None)).unwrap();
        let b = scene.create_object(spec(mesh, None)).unwrap();
        scene.link_object(a, Some(site)).unwrap();
        scene.link_object(b, None).unwrap();

        assert_eq!(scene.collection(project).unwrap().children, vec![site]);
        assert_eq!(scene.collection_by_name("IfcSite/S").unwrap().0, site);
        assert_eq!(scene.root_objects(), &[b]);
        assert!(scene.link_object(a, Some(CollectionId(42))).is_err());

        assert_eq!(scene.remove_objects(&[a, a]), 1);
        assert_eq!(scene.object_count(), 1);
        assert!(scene.collection(site).unwrap().objects.is_empty());
        assert!(scene.link_object(a, None).is_err());
    }

    #[test]
    fn test_ensure_collection_reuses_siblings() {
        let mut scene = SceneGraph::new();
        let project = scene.ensure_collection("IfcProject/P", None).unwrap();
        assert_eq!(scene.ensure_collection("IfcProject/P", None).unwrap(), project);

        let site = scene.ensure_collection("IfcSite/S", Some(project)).unwrap();
        assert_eq!(scene.ensure_collection("IfcSite/S", Some(project)).unwrap(), site);
        assert_eq!(scene.find_collection("IfcSite/S", None), None);

        // Same name under another parent is a different collection
        let other = scene.ensure_collection("IfcSite/S", None).unwrap();
        assert_ne!(other, site);
        assert_eq!(scene.collection_count(), 3);
        assert_eq!(scene.collection(project).unwrap().children, vec![site]);
    }

    #[test]
    fn test_world_vertices() {
        let mut scene = SceneGraph::new();
        let mesh = scene.create_mesh("m", &triangle()).unwrap();
        let object = scene.create_object(spec(mesh, None)).unwrap();
        let vertices = scene.world_vertices(object);
        assert_eq!(vertices[1], Point3::new(3.0, 0.0, 0.0));
        assert_eq!(
            scene.object_by_global_id("gid").unwrap().1.attributes["Name"],
            ScalarValue::Text("A".into())
        );
    }
}
