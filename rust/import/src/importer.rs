// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Import orchestration
//!
//! One import runs through a fixed sequence of states and never re-enters
//! one: load the diff snapshot, load the source, compute the unit scale,
//! create the project collection, build the spatial hierarchy, purge stale
//! objects, then materialize elements and spaces.

use crate::config::ImportSettings;
use crate::diff::DiffFilter;
use crate::error::{ImportError, Result};
use crate::hierarchy::{qualified_name, NameCollision, SpatialHierarchy, SpatialHierarchyBuilder};
use crate::material::MaterialResolver;
use crate::scene::{CollectionId, MeshId, ObjectId, ObjectSpec, SceneHost};
use crate::schema::SchemaCatalog;
use ifc_scene_core::{extract_length_unit_scale, DecodedEntity, EntityId, IfcModel, IfcType};
use ifc_scene_geometry::{
    mapped_body_transform, representation_identity, scale_translation, transfer_transform,
    BasicTessellator, Matrix4, MeshCache, MeshCacheEntry, PlacementResolver, TessellationSettings,
    Tessellator,
};
use serde::Serialize;
use std::fmt;

/// Import stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImportState {
    LoadDiff,
    LoadSource,
    ComputeUnitScale,
    BuildRoot,
    BuildHierarchy,
    PurgeStale,
    MaterializeElements,
    Done,
}

impl fmt::Display for ImportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LoadDiff => "load-diff",
            Self::LoadSource => "load-source",
            Self::ComputeUnitScale => "compute-unit-scale",
            Self::BuildRoot => "build-root",
            Self::BuildHierarchy => "build-hierarchy",
            Self::PurgeStale => "purge-stale",
            Self::MaterializeElements => "materialize-elements",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// An entity left out of the scene after a recoverable failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEntity {
    pub id: EntityId,
    pub global_id: Option<String>,
    pub reason: String,
}

/// Summary of one import
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// Model length unit in metres
    pub unit_scale: f64,
    pub spatial_nodes: usize,
    pub orphaned_spatial: Vec<EntityId>,
    pub name_collisions: Vec<NameCollision>,
    pub objects_created: usize,
    pub meshes_created: usize,
    pub meshes_reused: usize,
    pub purged: usize,
    pub filtered_by_diff: usize,
    /// Objects linked to the scene root for lack of a spatial container
    pub outside_hierarchy: usize,
    pub openings_skipped: usize,
    pub skipped: Vec<SkippedEntity>,
}

/// Imports an IFC model into a [`SceneHost`]
pub struct IfcImporter<'h, H: SceneHost, T: Tessellator = BasicTessellator> {
    settings: ImportSettings,
    host: &'h mut H,
    tessellator: T,
    schema: Option<SchemaCatalog>,
}

impl<'h, H: SceneHost> IfcImporter<'h, H> {
    pub fn new(settings: ImportSettings, host: &'h mut H) -> Self {
        Self {
            settings,
            host,
            tessellator: BasicTessellator::new(),
            schema: None,
        }
    }
}

impl<'h, H: SceneHost, T: Tessellator> IfcImporter<'h, H, T> {
    /// Use another tessellation service
    pub fn with_tessellator<U: Tessellator>(self, tessellator: U) -> IfcImporter<'h, H, U> {
        IfcImporter {
            settings: self.settings,
            host: self.host,
            tessellator,
            schema: self.schema,
        }
    }

    /// Use `schema` instead of loading one from the settings
    pub fn with_schema(mut self, schema: SchemaCatalog) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Import the file named by the settings
    pub fn execute(self) -> Result<ImportReport> {
        let span = tracing::info_span!(
            "ifc_import",
            input = ?self.settings.input,
            diff = ?self.settings.diff
        );
        let _guard = span.enter();

        let mut state = ImportState::LoadDiff;
        tracing::debug!(%state, "Import state");
        let diff = DiffFilter::load(self.settings.diff.as_deref())?;

        transition(&mut state, ImportState::LoadSource);
        let input = self.settings.input.clone().ok_or(ImportError::MissingInput)?;
        let model = IfcModel::open(&input)?;
        tracing::info!(path = %input.display(), entities = model.len(), "Loaded source model");

        self.run(&model, diff, state)
    }

    /// Import an already loaded model; the input setting is ignored
    pub fn execute_model(self, model: &IfcModel) -> Result<ImportReport> {
        let span = tracing::info_span!("ifc_import", entities = model.len(), diff = ?self.settings.diff);
        let _guard = span.enter();

        let mut state = ImportState::LoadDiff;
        tracing::debug!(%state, "Import state");
        let diff = DiffFilter::load(self.settings.diff.as_deref())?;
        transition(&mut state, ImportState::LoadSource);

        self.run(model, diff, state)
    }

    fn run(mut self, model: &IfcModel, diff: DiffFilter, mut state: ImportState) -> Result<ImportReport> {
        let schema = match self.schema {
            Some(schema) => schema,
            None => match &self.settings.schema {
                Some(path) => SchemaCatalog::load(path)?,
                None => SchemaCatalog::ifc4(),
            },
        };
        let mut report = ImportReport::default();

        transition(&mut state, ImportState::ComputeUnitScale);
        let unit_scale = extract_length_unit_scale(model)?;
        report.unit_scale = unit_scale;
        tracing::info!(unit_scale, "Length unit scale");

        transition(&mut state, ImportState::BuildRoot);
        let project = model
            .by_type(IfcType::IfcProject)
            .next()
            .ok_or(ImportError::MissingProject)?;
        let root = self.host.ensure_collection(&qualified_name(project), None)?;

        transition(&mut state, ImportState::BuildHierarchy);
        let spatial: Vec<&DecodedEntity> = [IfcType::IfcSite, IfcType::IfcBuilding, IfcType::IfcBuildingStorey]
            .into_iter()
            .flat_map(|ifc_type| model.by_type(ifc_type))
            .collect();
        let hierarchy = SpatialHierarchyBuilder::new(model, root)
            .with_policy(self.settings.duplicate_names)
            .build(&mut *self.host, &spatial)?;
        report.spatial_nodes = hierarchy.len();
        report.orphaned_spatial = hierarchy.orphans.clone();
        report.name_collisions = hierarchy.collisions.clone();

        transition(&mut state, ImportState::PurgeStale);
        if diff.is_active() {
            let stale: Vec<ObjectId> = self
                .host
                .objects()
                .into_iter()
                .filter(|(_, global_id)| global_id.as_deref().is_some_and(|id| diff.should_purge(id)))
                .map(|(object, _)| object)
                .collect();
            report.purged = self.host.remove_objects(&stale);
            tracing::info!(purged = report.purged, "Purged stale objects");
        }

        transition(&mut state, ImportState::MaterializeElements);
        let mut session = Session {
            model,
            host: self.host,
            tessellator: &self.tessellator,
            schema: &schema,
            hierarchy: &hierarchy,
            diff: &diff,
            tessellation: TessellationSettings {
                include_curves: self.settings.include_curves,
                unit_scale,
            },
            placements: PlacementResolver::new()
                .with_ignore_site_coordinates(self.settings.ignore_site_coordinates),
            meshes: MeshCache::new(),
            materials: MaterialResolver::new(),
            report: &mut report,
        };
        let products = model
            .by_category(IfcType::is_element)
            .chain(model.by_type(IfcType::IfcSpace));
        for product in products {
            session.materialize(product)?;
        }

        transition(&mut state, ImportState::Done);
        tracing::info!(
            objects = report.objects_created,
            meshes = report.meshes_created,
            reused = report.meshes_reused,
            skipped = report.skipped.len(),
            "Import complete"
        );
        Ok(report)
    }
}

fn transition(state: &mut ImportState, next: ImportState) {
    debug_assert!(next > *state);
    tracing::debug!(from = %state, to = %next, "Import state");
    *state = next;
}

/// Mesh and transform for one product, before the object exists
struct Prepared {
    mesh: MeshId,
    matrix_world: Matrix4<f64>,
}

/// Mutable state of the materialize stage
struct Session<'a, H: SceneHost, T: Tessellator> {
    model: &'a IfcModel,
    host: &'a mut H,
    tessellator: &'a T,
    schema: &'a SchemaCatalog,
    hierarchy: &'a SpatialHierarchy,
    diff: &'a DiffFilter,
    tessellation: TessellationSettings,
    placements: PlacementResolver,
    meshes: MeshCache<MeshId>,
    materials: MaterialResolver,
    report: &'a mut ImportReport,
}

impl<H: SceneHost, T: Tessellator> Session<'_, H, T> {
    fn materialize(&mut self, product: &DecodedEntity) -> Result<()> {
        let global_id = product.global_id();
        if !self.diff.should_materialize(global_id) {
            self.report.filtered_by_diff += 1;
            return Ok(());
        }
        if product.ifc_type.is_subtype_of(IfcType::IfcOpeningElement) {
            self.report.openings_skipped += 1;
            return Ok(());
        }

        let prepared = match self.prepare(product) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::warn!(entity = product.id, global_id = ?global_id, error = %e, "Skipping entity");
                self.report.skipped.push(SkippedEntity {
                    id: product.id,
                    global_id: global_id.map(str::to_string),
                    reason: e.to_string(),
                });
                return Ok(());
            }
        };

        let material = match self.materials.resolve(self.model, product) {
            Ok(material) => material,
            Err(e) => {
                tracing::warn!(entity = product.id, error = %e, "Material resolution failed");
                None
            }
        };

        let object = self.host.create_object(ObjectSpec {
            name: qualified_name(product),
            mesh: prepared.mesh,
            matrix_world: prepared.matrix_world,
            material,
            global_id: global_id.map(str::to_string),
            attributes: self.schema.scalar_attributes(product),
        })?;
        self.report.objects_created += 1;

        let collection = self.container(product);
        if collection.is_none() {
            tracing::warn!(entity = product.id, "Object is outside the spatial hierarchy");
            self.report.outside_hierarchy += 1;
        }
        self.host.link_object(object, collection)?;
        Ok(())
    }

    /// Shared or fresh mesh plus the world transform placing it
    fn prepare(&mut self, product: &DecodedEntity) -> Result<Prepared> {
        let Self {
            model,
            host,
            tessellator,
            tessellation,
            placements,
            meshes,
            report,
            ..
        } = self;
        let model = *model;

        let identity = representation_identity(model, product)?;
        let lookup = meshes.get_or_create(identity, || -> Result<_> {
            let shape = tessellator.tessellate(model, product, tessellation)?;
            let originating = model.entity(shape.product)?;
            let originating_transform = mapped_body_transform(model, originating)?;
            let name = match identity {
                Some(identity) => format!("mesh-{}", identity.0),
                None => format!("mesh-{}", product.id),
            };
            let host_mesh = host.create_mesh(&name, &shape.geometry)?;
            Ok(MeshCacheEntry {
                geometry: shape.geometry,
                originating_entity: shape.product,
                originating_transform,
                host_mesh,
            })
        })?;
        if lookup.hit {
            report.meshes_reused += 1;
            tracing::debug!(entity = product.id, "Reusing shared mesh");
        } else {
            report.meshes_created += 1;
        }

        let placement = placements.resolve_product(model, product)?;
        let own_delta = mapped_body_transform(model, product)?;
        let mut matrix_world = transfer_transform(product.id, &placement, own_delta.as_ref(), lookup.entry)?;
        scale_translation(&mut matrix_world, tessellation.unit_scale);

        Ok(Prepared {
            mesh: lookup.entry.host_mesh,
            matrix_world,
        })
    }

    /// Collection of the product's spatial container, `None` for the scene root
    fn container(&self, product: &DecodedEntity) -> Option<CollectionId> {
        let structure = if product.ifc_type == IfcType::IfcSpace {
            self.model.aggregate_parent(product.id)
        } else {
            self.model.containing_structure(product.id)
        };
        match structure {
            Ok(Some(structure)) => self.hierarchy.collection_for(structure),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(entity = product.id, error = %e, "Unresolvable spatial container");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneGraph;
    use crate::schema::ScalarValue;
    use ifc_scene_geometry::{Error as GeometryError, Shape};

    const MODEL: &str = r#"DATA;
#1=IFCPROJECT('p',$,'Demo',$,$,$,$,$,#90);
#2=IFCSITE('s',$,'Site',$,$,$,$,$,.ELEMENT.,$,$,$,$,$);
#3=IFCRELAGGREGATES('r',$,$,$,#1,(#2));
#10=IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(1.,0.,0.),(0.,1.,0.)));
#11=IFCTRIANGULATEDFACESET(#10,$,$,((1,2,3)),$);
#12=IFCSHAPEREPRESENTATION($,'Body','Tessellation',(#11));
#13=IFCPRODUCTDEFINITIONSHAPE($,$,(#12));
#20=IFCWALL('w1',$,'Wall',$,$,$,#13,$,$);
#21=IFCRELCONTAINEDINSPATIALSTRUCTURE('c',$,$,$,(#20),#2);
#22=IFCOPENINGELEMENT('o1',$,'Hole',$,$,$,#13,$,$);
#23=IFCSLAB('s1',$,'Floating',$,$,$,#13,$,$);
#24=IFCBEAM('b1',$,'NoShape',$,$,$,$,$,$);
#90=IFCUNITASSIGNMENT((#91));
#91=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);
"#;

    #[test]
    fn test_state_order() {
        assert!(ImportState::LoadDiff < ImportState::LoadSource);
        assert!(ImportState::PurgeStale < ImportState::MaterializeElements);
        assert_eq!(ImportState::MaterializeElements.to_string(), "materialize-elements");
    }

    #[test]
    fn test_report_counts() {
        let model = IfcModel::parse(MODEL).unwrap();
        let mut scene = SceneGraph::new();
        let report = IfcImporter::new(ImportSettings::default(), &mut scene)
            .execute_model(&model)
            .unwrap();

        assert_eq!(report.unit_scale, 1.0);
        assert_eq!(report.spatial_nodes, 1);
        assert_eq!(report.openings_skipped, 1);
        assert_eq!(report.objects_created, 2);
        assert_eq!(report.meshes_created, 1);
        assert_eq!(report.meshes_reused, 1);
        assert_eq!(report.outside_hierarchy, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].id, 24);

        let (site, _) = scene.collection_by_name("IfcSite/Site").unwrap();
        let (wall, _) = scene.object_by_global_id("w1").unwrap();
        assert_eq!(scene.collection(site).unwrap().objects, vec![wall]);
        let (slab, _) = scene.object_by_global_id("s1").unwrap();
        assert_eq!(scene.root_objects(), &[slab]);
    }

    #[test]
    fn test_missing_project_is_fatal() {
        let model = IfcModel::parse(
            "DATA;\n#90=IFCUNITASSIGNMENT((#91));\n#91=IFCSIUNIT(*,.LENGTHUNIT.,$,.METRE.);\n",
        )
        .unwrap();
        let mut scene = SceneGraph::new();
        let result = IfcImporter::new(ImportSettings::default(), &mut scene).execute_model(&model);
        assert!(matches!(result, Err(ImportError::MissingProject)));
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let mut scene = SceneGraph::new();
        let result = IfcImporter::new(ImportSettings::default(), &mut scene).execute();
        assert!(matches!(result, Err(ImportError::MissingInput)));
    }

    #[test]
    fn test_materializes_every_element_subtype() {
        let content = MODEL
            .replace("IFCWALL('w1'", "IFCSLABSTANDARDCASE('w1'")
            .replace("IFCSLAB('s1'", "IFCFLOWCONTROLLER('s1'");
        let model = IfcModel::parse(&content).unwrap();
        let mut scene = SceneGraph::new();
        let report = IfcImporter::new(ImportSettings::default(), &mut scene)
            .execute_model(&model)
            .unwrap();

        assert_eq!(report.objects_created, 2);
        assert_eq!(report.openings_skipped, 1);
        let (_, slab) = scene.object_by_global_id("w1").unwrap();
        assert_eq!(slab.name, "IfcSlabStandardCase/Wall");
        let (_, controller) = scene.object_by_global_id("s1").unwrap();
        assert_eq!(controller.name, "IfcFlowController/Floating");
        assert_eq!(controller.attributes["Name"], ScalarValue::Text("Floating".into()));
    }

    #[test]
    fn test_opening_subtypes_are_skipped() {
        let content = MODEL.replace("IFCOPENINGELEMENT('o1'", "IFCOPENINGSTANDARDCASE('o1'");
        let model = IfcModel::parse(&content).unwrap();
        let mut scene = SceneGraph::new();
        let report = IfcImporter::new(ImportSettings::default(), &mut scene)
            .execute_model(&model)
            .unwrap();
        assert_eq!(report.openings_skipped, 1);
        assert!(scene.object_by_global_id("o1").is_none());
    }

    #[test]
    fn test_reimport_reuses_collections() {
        let model = IfcModel::parse(MODEL).unwrap();
        let mut scene = SceneGraph::new();
        for _ in 0..2 {
            IfcImporter::new(ImportSettings::default(), &mut scene)
                .execute_model(&model)
                .unwrap();
        }
        assert_eq!(scene.collection_count(), 2);
        assert_eq!(scene.root_collections().len(), 1);
        let (site, _) = scene.collection_by_name("IfcSite/Site").unwrap();
        assert_eq!(scene.collection(site).unwrap().objects.len(), 2);
    }

    struct FailingTessellator;

    impl Tessellator for FailingTessellator {
        fn tessellate(
            &self,
            _model: &IfcModel,
            product: &DecodedEntity,
            _settings: &TessellationSettings,
        ) -> ifc_scene_geometry::Result<Shape> {
            Err(GeometryError::geometry(format!("cannot tessellate #{}", product.id)))
        }
    }

    #[test]
    fn test_tessellation_failures_are_skipped() {
        let model = IfcModel::parse(MODEL).unwrap();
        let mut scene = SceneGraph::new();
        let report = IfcImporter::new(ImportSettings::default(), &mut scene)
            .with_tessellator(FailingTessellator)
            .execute_model(&model)
            .unwrap();
        assert_eq!(report.objects_created, 0);
        assert_eq!(report.skipped.len(), 3);
        assert!(report.skipped[0].reason.contains("cannot tessellate"));
        assert_eq!(scene.collection_count(), 2);
    }
}
