// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IFC-Scene Import
//!
//! Incremental import of IFC building models into a scene graph.
//!
//! Spatial containers (sites, buildings, storeys) become nested collections,
//! elements and spaces become objects placed at their world transforms.
//! Products sharing a mapped representation share one mesh. A diff snapshot
//! restricts an import to added and changed entities and purges stale
//! objects from a previous import.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ifc_scene_import::{IfcImporter, ImportSettings, SceneGraph};
//!
//! let mut scene = SceneGraph::new();
//! let settings = ImportSettings::default().with_input("model.ifc");
//! let report = IfcImporter::new(settings, &mut scene).execute()?;
//! println!("{} objects, {} shared meshes", report.objects_created, report.meshes_reused);
//! # Ok::<(), ifc_scene_import::ImportError>(())
//! ```

pub mod config;
pub mod diff;
pub mod error;
pub mod hierarchy;
pub mod importer;
pub mod material;
pub mod scene;
pub mod schema;

pub use config::{DuplicateNamePolicy, ImportSettings};
pub use diff::{DiffFilter, DiffSnapshot};
pub use error::{ImportError, Result};
pub use hierarchy::{qualified_name, NameCollision, SpatialHierarchy, SpatialHierarchyBuilder, SpatialNode};
pub use importer::{IfcImporter, ImportReport, ImportState, SkippedEntity};
pub use material::{ExternalStyle, Material, MaterialAssignment, MaterialResolver, MaterialSlot};
pub use scene::{
    CollectionId, MeshId, ObjectId, ObjectSpec, SceneCollection, SceneError, SceneGraph, SceneHost,
    SceneMesh, SceneObject,
};
pub use schema::{ScalarValue, SchemaCatalog};
