// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Body representation lookup and representation identity
//!
//! A product's shape is `Representation` (attribute 6) → IfcProductDefinitionShape
//! → `Representations` (attribute 2). The `Body` representation is preferred;
//! products without one fall back to their first representation.

use crate::error::{Error, Result};
use crate::transform::{parse_axis2_placement, parse_cartesian_transformation_operator};
use ifc_scene_core::{DecodedEntity, EntityId, IfcModel, IfcType};
use nalgebra::Matrix4;

/// Key identifying the untransformed shape a product tessellates to
///
/// The id of the product's own body representation or, for mapped
/// representations, of the shared mapped source representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepresentationIdentity(pub EntityId);

/// All shape representations of a product
pub fn shape_representations<'a>(
    model: &'a IfcModel,
    product: &DecodedEntity,
) -> Result<Vec<&'a DecodedEntity>> {
    let Some(shape) = model.resolve_attr(product, 6)? else {
        return Ok(Vec::new());
    };
    match shape.get(2) {
        Some(attr) => Ok(model.resolve_ref_list(attr)?),
        None => Ok(Vec::new()),
    }
}

/// The product's representation with RepresentationIdentifier (attribute 1) `identifier`
pub fn named_representation<'a>(
    model: &'a IfcModel,
    product: &DecodedEntity,
    identifier: &str,
) -> Result<Option<&'a DecodedEntity>> {
    Ok(shape_representations(model, product)?
        .into_iter()
        .find(|rep| rep.get_string(1) == Some(identifier)))
}

/// The product's body shape representation
pub fn body_representation<'a>(
    model: &'a IfcModel,
    product: &DecodedEntity,
) -> Result<Option<&'a DecodedEntity>> {
    let representations = shape_representations(model, product)?;
    let body = representations
        .iter()
        .find(|rep| rep.get_string(1) == Some("Body"))
        .or_else(|| representations.first());
    Ok(body.copied())
}

/// Items of a representation (attribute 3)
pub fn representation_items<'a>(
    model: &'a IfcModel,
    representation: &DecodedEntity,
) -> Result<Vec<&'a DecodedEntity>> {
    match representation.get(3) {
        Some(items) => Ok(model.resolve_ref_list(items)?),
        None => Ok(Vec::new()),
    }
}

/// The mapped item standing for a whole `MappedRepresentation`
///
/// A representation counts as mapped when its `RepresentationType`
/// (attribute 2) says so or its first item is an `IfcMappedItem`.
pub fn mapped_item<'a>(
    model: &'a IfcModel,
    representation: &DecodedEntity,
) -> Result<Option<&'a DecodedEntity>> {
    let items = representation_items(model, representation)?;
    let first = items.first().copied();
    let is_mapped = representation.get_string(2) == Some("MappedRepresentation")
        || first.is_some_and(|item| item.ifc_type == IfcType::IfcMappedItem);

    Ok(first.filter(|item| is_mapped && item.ifc_type == IfcType::IfcMappedItem))
}

/// Source representation of a mapped item: MappingSource (0) → MappedRepresentation (1)
pub fn mapped_source<'a>(model: &'a IfcModel, mapped_item: &DecodedEntity) -> Result<&'a DecodedEntity> {
    let map = model
        .resolve_attr(mapped_item, 0)?
        .ok_or_else(|| Error::geometry(format!("MappedItem #{} missing MappingSource", mapped_item.id)))?;
    model
        .resolve_attr(map, 1)?
        .ok_or_else(|| Error::geometry(format!("RepresentationMap #{} missing MappedRepresentation", map.id)))
}

/// Transform a mapped item bakes into geometry: `MappingTarget ∘ MappingOrigin`
pub fn mapped_item_transform(model: &IfcModel, mapped_item: &DecodedEntity) -> Result<Matrix4<f64>> {
    let map = model
        .resolve_attr(mapped_item, 0)?
        .ok_or_else(|| Error::geometry(format!("MappedItem #{} missing MappingSource", mapped_item.id)))?;

    // IfcRepresentationMap attribute 0: MappingOrigin
    let origin = match model.resolve_attr(map, 0)? {
        Some(placement) => parse_axis2_placement(placement, model)?,
        None => Matrix4::identity(),
    };
    // IfcMappedItem attribute 1: MappingTarget
    let target = match model.resolve_attr(mapped_item, 1)? {
        Some(operator) => parse_cartesian_transformation_operator(operator, model)?,
        None => Matrix4::identity(),
    };

    Ok(target * origin)
}

/// Identity of the shape `product` tessellates to; `None` without a body
pub fn representation_identity(
    model: &IfcModel,
    product: &DecodedEntity,
) -> Result<Option<RepresentationIdentity>> {
    let Some(body) = body_representation(model, product)? else {
        return Ok(None);
    };
    let id = match mapped_item(model, body)? {
        Some(item) => mapped_source(model, item)?.id,
        None => body.id,
    };
    Ok(Some(RepresentationIdentity(id)))
}

/// The mapped transform delta of a product's body, if its body is mapped
pub fn mapped_body_transform(model: &IfcModel, product: &DecodedEntity) -> Result<Option<Matrix4<f64>>> {
    let Some(body) = body_representation(model, product)? else {
        return Ok(None);
    };
    match mapped_item(model, body)? {
        Some(item) => mapped_item_transform(model, item).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    const MAPPED: &str = "DATA;\n\
        #1=IFCCARTESIANPOINT((0.,0.,0.));\n\
        #2=IFCCARTESIANPOINT((100.,0.,0.));\n\
        #3=IFCAXIS2PLACEMENT3D(#2,$,$);\n\
        #10=IFCSHAPEREPRESENTATION(#99,'Body','Tessellation',(#11));\n\
        #11=IFCTRIANGULATEDFACESET(#12,$,$,((1,2,3)),$);\n\
        #12=IFCCARTESIANPOINTLIST3D(((0.,0.,0.),(1.,0.,0.),(0.,1.,0.)));\n\
        #20=IFCREPRESENTATIONMAP(#3,#10);\n\
        #21=IFCCARTESIANTRANSFORMATIONOPERATOR3D($,$,#1,$,$);\n\
        #22=IFCMAPPEDITEM(#20,#21);\n\
        #23=IFCSHAPEREPRESENTATION(#99,'Body','MappedRepresentation',(#22));\n\
        #24=IFCSHAPEREPRESENTATION(#99,'Axis','Curve2D',());\n\
        #25=IFCPRODUCTDEFINITIONSHAPE($,$,(#24,#23));\n\
        #26=IFCWALL('a',$,'A',$,$,$,#25,$,$);\n\
        #27=IFCPRODUCTDEFINITIONSHAPE($,$,(#10));\n\
        #28=IFCWALL('b',$,'B',$,$,$,#27,$,$);\n\
        #29=IFCWALL('c',$,'C',$,$,$,$,$,$);\n\
        ENDSEC;";

    #[test]
    fn test_body_is_preferred_over_first() {
        let model = IfcModel::parse(MAPPED).unwrap();
        let body = body_representation(&model, model.entity(26).unwrap()).unwrap();
        assert_eq!(body.map(|b| b.id), Some(23));
    }

    #[test]
    fn test_identity_of_mapped_and_direct_bodies() {
        let model = IfcModel::parse(MAPPED).unwrap();
        let mapped = representation_identity(&model, model.entity(26).unwrap()).unwrap();
        let direct = representation_identity(&model, model.entity(28).unwrap()).unwrap();
        let none = representation_identity(&model, model.entity(29).unwrap()).unwrap();

        assert_eq!(mapped, Some(RepresentationIdentity(10)));
        assert_eq!(direct, Some(RepresentationIdentity(10)));
        assert_eq!(none, None);
    }

    #[test]
    fn test_mapped_body_transform_includes_origin() {
        let model = IfcModel::parse(MAPPED).unwrap();
        let delta = mapped_body_transform(&model, model.entity(26).unwrap())
            .unwrap()
            .unwrap();
        let p = delta.transform_point(&Point3::origin());
        assert_relative_eq!(p, Point3::new(100.0, 0.0, 0.0), epsilon = 1e-12);

        assert!(mapped_body_transform(&model, model.entity(28).unwrap())
            .unwrap()
            .is_none());
    }
}
