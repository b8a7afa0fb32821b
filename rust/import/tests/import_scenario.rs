// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Site -> Building -> Storey -> two walls sharing one mapped body, in
// millimetres. Wall A maps the body 100 mm along X and carries a red style;
// wall B rotates it onto +Y, sits 5 m further along X and has a concrete
// material.

use approx::assert_relative_eq;
use ifc_scene_core::IfcModel;
use ifc_scene_geometry::Point3;
use ifc_scene_import::{
    IfcImporter, ImportSettings, ScalarValue, SceneGraph, SceneHost,
};
use std::path::PathBuf;

const MODEL: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [ReferenceView]'),'2;1');
FILE_NAME('tower.ifc','2024-01-01T00:00:00',(''),(''),'','','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('proj',$,'Tower',$,$,$,$,$,#100);
#2=IFCSITE('site',$,'Site',$,$,#212,$,$,.ELEMENT.,$,$,$,$,$);
#3=IFCBUILDING('bldg',$,'Main',$,$,#220,$,$,.ELEMENT.,$,$,$);
#4=IFCBUILDINGSTOREY('l1',$,'Level 1',$,$,#232,$,$,.ELEMENT.,3000.);
#5=IFCRELAGGREGATES('r1',$,$,$,#1,(#2));
#6=IFCRELAGGREGATES('r2',$,$,$,#2,(#3));
#7=IFCRELAGGREGATES('r3',$,$,$,#3,(#4));
#10=IFCWALL('wall-a',$,'A',$,$,#240,#314,'T-A',.STANDARD.);
#11=IFCWALL('wall-b',$,'B',$,$,#252,#325,'T-B',.STANDARD.);
#12=IFCRELCONTAINEDINSPATIALSTRUCTURE('c1',$,$,$,(#10,#11),#4);
#100=IFCUNITASSIGNMENT((#101));
#101=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);
#200=IFCCARTESIANPOINT((0.,0.,0.));
#201=IFCAXIS2PLACEMENT3D(#200,$,$);
#210=IFCCARTESIANPOINT((1000.,0.,0.));
#211=IFCAXIS2PLACEMENT3D(#210,$,$);
#212=IFCLOCALPLACEMENT($,#211);
#220=IFCLOCALPLACEMENT(#212,#201);
#230=IFCCARTESIANPOINT((0.,0.,3000.));
#231=IFCAXIS2PLACEMENT3D(#230,$,$);
#232=IFCLOCALPLACEMENT(#220,#231);
#240=IFCLOCALPLACEMENT(#232,#201);
#250=IFCCARTESIANPOINT((5000.,0.,0.));
#251=IFCAXIS2PLACEMENT3D(#250,$,$);
#252=IFCLOCALPLACEMENT(#232,#251);
#300=IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(1000.,0.,0.),(0.,0.,2000.)));
#301=IFCTRIANGULATEDFACESET(#300,$,$,((1,2,3)),$);
#302=IFCSHAPEREPRESENTATION($,'Body','Tessellation',(#301));
#303=IFCREPRESENTATIONMAP(#201,#302);
#310=IFCCARTESIANPOINT((100.,0.,0.));
#311=IFCCARTESIANTRANSFORMATIONOPERATOR3D($,$,#310,$,$);
#312=IFCMAPPEDITEM(#303,#311);
#313=IFCSHAPEREPRESENTATION($,'Body','MappedRepresentation',(#312));
#314=IFCPRODUCTDEFINITIONSHAPE($,$,(#313));
#320=IFCDIRECTION((0.,1.,0.));
#321=IFCDIRECTION((-1.,0.,0.));
#322=IFCCARTESIANTRANSFORMATIONOPERATOR3D(#320,#321,#200,$,$);
#323=IFCMAPPEDITEM(#303,#322);
#324=IFCSHAPEREPRESENTATION($,'Body','MappedRepresentation',(#323));
#325=IFCPRODUCTDEFINITIONSHAPE($,$,(#324));
#400=IFCCOLOURRGB($,1.,0.,0.);
#401=IFCSURFACESTYLESHADING(#400,0.25);
#402=IFCSURFACESTYLE('Red',.BOTH.,(#401));
#403=IFCSTYLEDITEM(#312,(#402),'Red');
#410=IFCMATERIAL('Concrete',$,$);
#411=IFCRELASSOCIATESMATERIAL('m1',$,$,$,(#11),#410);
ENDSEC;
END-ISO-10303-21;
"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn temp_file(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("ifc_scene_{}_{}", std::process::id(), name));
    std::fs::write(&path, content).unwrap();
    path
}

/// World position of the mesh vertex at (1000, 0, 0) mm in the shared body
fn corner(scene: &SceneGraph, global_id: &str) -> Point3<f64> {
    let (object, _) = scene.object_by_global_id(global_id).unwrap();
    scene.world_vertices(object)[1]
}

#[test]
fn walls_share_one_mesh_at_their_own_locations() {
    init_tracing();
    let model = IfcModel::parse(MODEL).unwrap();
    let mut scene = SceneGraph::new();
    let report = IfcImporter::new(ImportSettings::default(), &mut scene)
        .execute_model(&model)
        .unwrap();

    assert_relative_eq!(report.unit_scale, 0.001);
    assert_eq!(report.objects_created, 2);
    assert_eq!(report.meshes_created, 1);
    assert_eq!(report.meshes_reused, 1);
    assert_eq!(scene.mesh_count(), 1);
    assert!(report.skipped.is_empty());

    assert_relative_eq!(corner(&scene, "wall-a"), Point3::new(2.1, 0.0, 3.0), epsilon = 1e-9);
    assert_relative_eq!(corner(&scene, "wall-b"), Point3::new(6.0, 1.0, 3.0), epsilon = 1e-9);
}

#[test]
fn spatial_hierarchy_and_containment() {
    let model = IfcModel::parse(MODEL).unwrap();
    let mut scene = SceneGraph::new();
    let report = IfcImporter::new(ImportSettings::default(), &mut scene)
        .execute_model(&model)
        .unwrap();

    assert_eq!(report.spatial_nodes, 3);
    assert!(report.orphaned_spatial.is_empty());
    assert_eq!(report.outside_hierarchy, 0);

    let (project, _) = scene.collection_by_name("IfcProject/Tower").unwrap();
    assert_eq!(scene.root_collections(), &[project]);
    let (site, _) = scene.collection_by_name("IfcSite/Site").unwrap();
    let (building, _) = scene.collection_by_name("IfcBuilding/Main").unwrap();
    let (storey, storey_collection) = scene.collection_by_name("IfcBuildingStorey/Level 1").unwrap();
    assert_eq!(scene.collection(project).unwrap().children, vec![site]);
    assert_eq!(scene.collection(site).unwrap().children, vec![building]);
    assert_eq!(scene.collection(building).unwrap().children, vec![storey]);
    assert_eq!(storey_collection.objects.len(), 2);
    assert!(scene.root_objects().is_empty());
}

#[test]
fn styles_materials_and_attributes() {
    let model = IfcModel::parse(MODEL).unwrap();
    let mut scene = SceneGraph::new();
    IfcImporter::new(ImportSettings::default(), &mut scene)
        .execute_model(&model)
        .unwrap();

    let (_, wall_a) = scene.object_by_global_id("wall-a").unwrap();
    assert_eq!(wall_a.name, "IfcWall/A");
    let red = wall_a.material.as_ref().unwrap();
    assert_eq!(red.name, "Red");
    assert_eq!(red.diffuse, Some([1.0, 0.0, 0.0, 0.75]));
    assert_eq!(wall_a.attributes["Tag"], ScalarValue::Text("T-A".into()));
    assert_eq!(wall_a.attributes["PredefinedType"], ScalarValue::Text("STANDARD".into()));
    assert!(!wall_a.attributes.contains_key("ObjectPlacement"));

    let (_, wall_b) = scene.object_by_global_id("wall-b").unwrap();
    assert!(wall_b.material.is_none());
    let mesh = scene.mesh(wall_b.mesh).unwrap();
    assert_eq!(mesh.materials.len(), 1);
    assert_eq!(mesh.materials[0].name, "Concrete");
}

#[test]
fn ignore_site_coordinates_reroots_the_import() {
    let model = IfcModel::parse(MODEL).unwrap();
    let mut scene = SceneGraph::new();
    IfcImporter::new(
        ImportSettings::default().with_ignore_site_coordinates(true),
        &mut scene,
    )
    .execute_model(&model)
    .unwrap();

    assert_relative_eq!(corner(&scene, "wall-a"), Point3::new(1.1, 0.0, 3.0), epsilon = 1e-9);
    assert_relative_eq!(corner(&scene, "wall-b"), Point3::new(5.0, 1.0, 3.0), epsilon = 1e-9);
}

#[test]
fn diff_purges_and_reimports_changed_entities() {
    init_tracing();
    let model = IfcModel::parse(MODEL).unwrap();
    let mut scene = SceneGraph::new();
    IfcImporter::new(ImportSettings::default(), &mut scene)
        .execute_model(&model)
        .unwrap();
    assert_eq!(scene.object_count(), 2);

    let diff = temp_file(
        "diff.json",
        r#"{"added": [], "changed": {"wall-b": {"Name": "Old B"}}, "deleted": ["wall-a"]}"#,
    );
    let report = IfcImporter::new(ImportSettings::default().with_diff(&diff), &mut scene)
        .execute_model(&model)
        .unwrap();
    let _ = std::fs::remove_file(&diff);

    assert_eq!(report.purged, 2);
    assert_eq!(report.filtered_by_diff, 1);
    assert_eq!(report.objects_created, 1);
    assert_eq!(scene.object_count(), 1);
    assert!(scene.object_by_global_id("wall-a").is_none());

    // Wall B now owns the mesh, with its own mapping baked in
    assert_eq!(report.meshes_created, 1);
    assert_relative_eq!(corner(&scene, "wall-b"), Point3::new(6.0, 1.0, 3.0), epsilon = 1e-9);

    let remaining: Vec<_> = scene.objects().into_iter().filter_map(|(_, id)| id).collect();
    assert_eq!(remaining, vec!["wall-b".to_string()]);

    // The second import lands in the collections of the first
    assert_eq!(scene.collection_count(), 4);
    assert_eq!(scene.root_collections().len(), 1);
    let (_, storey) = scene.collection_by_name("IfcBuildingStorey/Level 1").unwrap();
    assert_eq!(storey.objects.len(), 1);
}

#[test]
fn imports_from_file() {
    let input = temp_file("tower.ifc", MODEL);
    let mut scene = SceneGraph::new();
    let result = IfcImporter::new(ImportSettings::default().with_input(&input), &mut scene).execute();
    let _ = std::fs::remove_file(&input);

    let report = result.unwrap();
    assert_eq!(report.objects_created, 2);
    assert_relative_eq!(corner(&scene, "wall-b"), Point3::new(6.0, 1.0, 3.0), epsilon = 1e-9);
}
