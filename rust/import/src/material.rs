// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Material resolution
//!
//! A style attached directly to a body item (`StyledByItem`) wins over any
//! associated `IfcMaterial`. Direct styles are linked to the object, associated
//! materials to the mesh data. Materials are deduplicated by name for the
//! whole import.

use crate::error::Result;
use ifc_scene_core::{DecodedEntity, IfcModel, IfcType};
use ifc_scene_geometry::representation::{
    body_representation, mapped_item, mapped_source, representation_items,
};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Mapped items are followed at most this deep when looking for styles
const MAX_STYLE_DEPTH: usize = 16;

/// Reference to a surface style defined outside the file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExternalStyle {
    pub location: Option<String>,
    pub identification: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub name: String,
    /// Diffuse RGBA; alpha is `1 - transparency`
    pub diffuse: Option<[f64; 4]>,
    pub external: Option<ExternalStyle>,
}

impl Material {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            diffuse: None,
            external: None,
        }
    }
}

/// Where a material is linked in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialSlot {
    /// On the object, overriding the mesh
    Object,
    /// On the mesh data, shared by every instance
    Data,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialAssignment {
    pub material: Material,
    pub slot: MaterialSlot,
}

/// Resolves and caches materials for one import session
#[derive(Debug, Default)]
pub struct MaterialResolver {
    cache: FxHashMap<String, Material>,
}

impl MaterialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct materials resolved so far
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.cache.get(name)
    }

    /// Material for `product`, or `None` when it has neither a direct style
    /// nor an `IfcMaterial` association
    pub fn resolve(&mut self, model: &IfcModel, product: &DecodedEntity) -> Result<Option<MaterialAssignment>> {
        if let Some(body) = body_representation(model, product)? {
            if let Some(styled) = find_styled_item(model, body, 0)? {
                let name = styled
                    .get_string(2)
                    .map(str::to_string)
                    .unwrap_or_else(|| styled.id.to_string());
                let material = self.cached(&name, || material_from_styled_item(model, styled, name.clone()))?;
                return Ok(Some(MaterialAssignment {
                    material,
                    slot: MaterialSlot::Object,
                }));
            }
        }

        for association in model.has_associations(product.id) {
            // IfcRelAssociatesMaterial: 5 RelatingMaterial
            let Some(definition) = model.resolve_attr(association, 5)? else {
                continue;
            };
            if definition.ifc_type != IfcType::IfcMaterial {
                continue;
            }
            let name = definition
                .get_string(0)
                .map(str::to_string)
                .unwrap_or_else(|| definition.id.to_string());
            let material = self.cached(&name, || material_from_definition(model, definition, name.clone()))?;
            return Ok(Some(MaterialAssignment {
                material,
                slot: MaterialSlot::Data,
            }));
        }

        Ok(None)
    }

    fn cached(&mut self, name: &str, build: impl FnOnce() -> Result<Material>) -> Result<Material> {
        if let Some(material) = self.cache.get(name) {
            return Ok(material.clone());
        }
        let material = build()?;
        tracing::debug!(material = %material.name, colour = ?material.diffuse, "Resolved material");
        self.cache.insert(name.to_string(), material.clone());
        Ok(material)
    }
}

/// First styled item among a representation's items, following mapped items
fn find_styled_item<'a>(
    model: &'a IfcModel,
    representation: &DecodedEntity,
    depth: usize,
) -> Result<Option<&'a DecodedEntity>> {
    if depth > MAX_STYLE_DEPTH {
        return Ok(None);
    }
    for item in representation_items(model, representation)? {
        if let Some(styled) = model.styled_by_item(item.id).next() {
            return Ok(Some(styled));
        }
    }
    if let Some(item) = mapped_item(model, representation)? {
        let source = mapped_source(model, item)?;
        return find_styled_item(model, source, depth + 1);
    }
    Ok(None)
}

fn material_from_styled_item(model: &IfcModel, styled: &DecodedEntity, name: String) -> Result<Material> {
    let mut material = Material::named(name);
    apply_styles(model, styled, &mut material)?;
    Ok(material)
}

/// An `IfcMaterial`, coloured by the styled items of its representations
fn material_from_definition(model: &IfcModel, definition: &DecodedEntity, name: String) -> Result<Material> {
    let mut material = Material::named(name);
    for definition_rep in model.material_representations(definition.id) {
        // IfcMaterialDefinitionRepresentation: 2 Representations
        let Some(representations) = definition_rep.get(2) else {
            continue;
        };
        for representation in model.resolve_ref_list(representations)? {
            for item in representation_items(model, representation)? {
                if item.ifc_type == IfcType::IfcStyledItem {
                    apply_styles(model, item, &mut material)?;
                    if material.diffuse.is_some() {
                        return Ok(material);
                    }
                }
            }
        }
    }
    Ok(material)
}

/// Fill colour and external reference from a styled item's surface styles
fn apply_styles(model: &IfcModel, styled: &DecodedEntity, material: &mut Material) -> Result<()> {
    let Some(styles) = styled.get(1) else {
        return Ok(());
    };
    let mut surface_styles = Vec::new();
    for style in model.resolve_ref_list(styles)? {
        match style.ifc_type {
            IfcType::IfcSurfaceStyle => surface_styles.push(style),
            // Deprecated wrapper: 0 Styles
            IfcType::IfcPresentationStyleAssignment => {
                if let Some(inner) = style.get(0) {
                    surface_styles.extend(
                        model
                            .resolve_ref_list(inner)?
                            .into_iter()
                            .filter(|s| s.ifc_type == IfcType::IfcSurfaceStyle),
                    );
                }
            }
            _ => {}
        }
    }

    for surface_style in surface_styles {
        // IfcSurfaceStyle: 2 Styles
        let Some(elements) = surface_style.get(2) else {
            continue;
        };
        for element in model.resolve_ref_list(elements)? {
            if element.ifc_type.is_surface_style_shading() {
                if material.diffuse.is_none() {
                    material.diffuse = shading_colour(model, element)?;
                }
            } else if element.ifc_type == IfcType::IfcExternallyDefinedSurfaceStyle {
                material.external.get_or_insert_with(|| ExternalStyle {
                    location: element.get_string(0).map(str::to_string),
                    identification: element.get_string(1).map(str::to_string),
                    name: element.get_string(2).map(str::to_string),
                });
            }
        }
    }
    Ok(())
}

fn shading_colour(model: &IfcModel, shading: &DecodedEntity) -> Result<Option<[f64; 4]>> {
    // IfcSurfaceStyleShading: 0 SurfaceColour, 1 Transparency
    let Some(colour) = model.resolve_attr(shading, 0)? else {
        return Ok(None);
    };
    let channel = |index| colour.get_float(index).unwrap_or(0.0);
    let transparency = shading.get_float(1).unwrap_or(0.0);
    Ok(Some([channel(1), channel(2), channel(3), 1.0 - transparency]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"DATA;
#1=IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(1.,0.,0.),(0.,1.,0.)));
#2=IFCTRIANGULATEDFACESET(#1,$,$,((1,2,3)),$);
#3=IFCSHAPEREPRESENTATION($,'Body','Tessellation',(#2));
#4=IFCPRODUCTDEFINITIONSHAPE($,$,(#3));
#5=IFCCOLOURRGB($,1.,0.,0.);
#6=IFCSURFACESTYLESHADING(#5,0.25);
#7=IFCSURFACESTYLE('Red',.BOTH.,(#6));
#8=IFCSTYLEDITEM(#2,(#7),'Red');
#10=IFCWALL('styled',$,'A',$,$,$,#4,$,$);
#11=IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(1.,0.,0.),(0.,1.,0.)));
#12=IFCTRIANGULATEDFACESET(#11,$,$,((1,2,3)),$);
#13=IFCSHAPEREPRESENTATION($,'Body','Tessellation',(#12));
#14=IFCPRODUCTDEFINITIONSHAPE($,$,(#13));
#15=IFCWALL('plain',$,'B',$,$,$,#14,$,$);
#16=IFCSLAB('bare',$,'C',$,$,$,$,$,$);
#20=IFCMATERIAL('Concrete',$,$);
#21=IFCRELASSOCIATESMATERIAL('m',$,$,$,(#10,#15),#20);
#22=IFCCOLOURRGB($,0.5,0.5,0.5);
#23=IFCSURFACESTYLERENDERING(#22,$,$,$,$,$,$,$,.NOTDEFINED.);
#24=IFCPRESENTATIONSTYLEASSIGNMENT((#27));
#25=IFCSTYLEDITEM($,(#24),$);
#26=IFCSTYLEDREPRESENTATION($,'Style','Material',(#25));
#27=IFCSURFACESTYLE('Grey',.BOTH.,(#23,#28));
#28=IFCEXTERNALLYDEFINEDSURFACESTYLE('lib.mat','concrete-01','Concrete');
#29=IFCMATERIALDEFINITIONREPRESENTATION($,$,(#26),#20);
"#;

    #[test]
    fn test_direct_style_beats_association() {
        let model = IfcModel::parse(MODEL).unwrap();
        let mut resolver = MaterialResolver::new();
        let assignment = resolver.resolve(&model, model.entity(10).unwrap()).unwrap().unwrap();
        assert_eq!(assignment.slot, MaterialSlot::Object);
        assert_eq!(assignment.material.name, "Red");
        assert_eq!(assignment.material.diffuse, Some([1.0, 0.0, 0.0, 0.75]));
    }

    #[test]
    fn test_association_material() {
        let model = IfcModel::parse(MODEL).unwrap();
        let mut resolver = MaterialResolver::new();
        let assignment = resolver.resolve(&model, model.entity(15).unwrap()).unwrap().unwrap();
        assert_eq!(assignment.slot, MaterialSlot::Data);
        assert_eq!(assignment.material.name, "Concrete");
        assert_eq!(assignment.material.diffuse, Some([0.5, 0.5, 0.5, 1.0]));
        let external = assignment.material.external.unwrap();
        assert_eq!(external.identification.as_deref(), Some("concrete-01"));
        assert!(resolver.get("Concrete").is_some());
    }

    #[test]
    fn test_no_material() {
        let model = IfcModel::parse(MODEL).unwrap();
        let mut resolver = MaterialResolver::new();
        assert!(resolver.resolve(&model, model.entity(16).unwrap()).unwrap().is_none());
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_materials_cached_by_name() {
        let model = IfcModel::parse(MODEL).unwrap();
        let mut resolver = MaterialResolver::new();
        resolver.resolve(&model, model.entity(10).unwrap()).unwrap();
        resolver.resolve(&model, model.entity(15).unwrap()).unwrap();
        resolver.resolve(&model, model.entity(15).unwrap()).unwrap();
        assert_eq!(resolver.len(), 2);
    }

    const MAPPED: &str = r#"DATA;
#1=IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(1.,0.,0.),(0.,1.,0.)));
#2=IFCTRIANGULATEDFACESET(#1,$,$,((1,2,3)),$);
#3=IFCSHAPEREPRESENTATION($,'Body','Tessellation',(#2));
#4=IFCCARTESIANPOINT((0.,0.,0.));
#5=IFCAXIS2PLACEMENT3D(#4,$,$);
#6=IFCREPRESENTATIONMAP(#5,#3);
#7=IFCCARTESIANTRANSFORMATIONOPERATOR3D($,$,#4,$,$);
#8=IFCMAPPEDITEM(#6,#7);
#9=IFCSHAPEREPRESENTATION($,'Body','MappedRepresentation',(#8));
#10=IFCPRODUCTDEFINITIONSHAPE($,$,(#9));
#11=IFCMAPPEDITEM(#6,#7);
#12=IFCSHAPEREPRESENTATION($,'Body','MappedRepresentation',(#11));
#13=IFCPRODUCTDEFINITIONSHAPE($,$,(#12));
#20=IFCCOLOURRGB($,0.6,0.4,0.2);
#21=IFCSURFACESTYLERENDERING(#20,0.,$,$,$,$,$,$,.NOTDEFINED.);
#22=IFCSURFACESTYLE('Oak',.BOTH.,(#21));
#23=IFCSTYLEDITEM(#2,(#22),'Oak');
#30=IFCFURNITURE('chair-1',$,'Chair',$,$,$,#10,$,$);
#31=IFCFURNITURE('chair-2',$,'Chair',$,$,$,#13,$,$);
#40=IFCSURFACESTYLELIGHTING(#20,#20,#20,#20);
#41=IFCSURFACESTYLE('Matte',.BOTH.,(#40));
#42=IFCSTYLEDITEM($,(#41),'Matte');
"#;

    #[test]
    fn test_style_on_mapped_source_item() {
        let model = IfcModel::parse(MAPPED).unwrap();
        let mut resolver = MaterialResolver::new();
        for chair in [30, 31] {
            let assignment = resolver.resolve(&model, model.entity(chair).unwrap()).unwrap().unwrap();
            assert_eq!(assignment.slot, MaterialSlot::Object);
            assert_eq!(assignment.material.name, "Oak");
            assert_eq!(assignment.material.diffuse, Some([0.6, 0.4, 0.2, 1.0]));
        }
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn test_surface_style_without_shading() {
        let model = IfcModel::parse(MAPPED).unwrap();
        let styled = model.entity(42).unwrap();
        let material = material_from_styled_item(&model, styled, "Matte".into()).unwrap();
        assert_eq!(material.name, "Matte");
        assert_eq!(material.diffuse, None);
        assert_eq!(material.external, None);

        let empty = IfcModel::parse(
            r#"DATA;
#1=IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(1.,0.,0.),(0.,1.,0.)));
#2=IFCTRIANGULATEDFACESET(#1,$,$,((1,2,3)),$);
#3=IFCSHAPEREPRESENTATION($,'Body','Tessellation',(#2));
#4=IFCPRODUCTDEFINITIONSHAPE($,$,(#3));
#5=IFCSURFACESTYLE('Bare',.BOTH.,());
#6=IFCSTYLEDITEM(#2,(#5),'Bare');
#10=IFCWALL('w',$,$,$,$,$,#4,$,$);
"#,
        )
        .unwrap();
        let assignment = MaterialResolver::new()
            .resolve(&empty, empty.entity(10).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(assignment.material.name, "Bare");
        assert_eq!(assignment.material.diffuse, None);
    }

    #[test]
    fn test_unnamed_styled_item_uses_id() {
        let model = IfcModel::parse(
            r#"DATA;
#1=IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(1.,0.,0.),(0.,1.,0.)));
#2=IFCTRIANGULATEDFACESET(#1,$,$,((1,2,3)),$);
#3=IFCSHAPEREPRESENTATION($,'Body','Tessellation',(#2));
#4=IFCPRODUCTDEFINITIONSHAPE($,$,(#3));
#8=IFCSTYLEDITEM(#2,(),$);
#10=IFCWALL('w',$,$,$,$,$,#4,$,$);
"#,
        )
        .unwrap();
        let assignment = MaterialResolver::new()
            .resolve(&model, model.entity(10).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(assignment.material.name, "8");
        assert_eq!(assignment.material.diffuse, None);
    }
}
