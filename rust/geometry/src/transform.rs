// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared transform utilities for IFC geometry processing
//!
//! Parsing of placement, direction and transformation-operator entities into
//! nalgebra matrices. All matrices are column-major 4x4 affine transforms
//! mapping local coordinates into the parent frame.

use crate::error::{Error, Result};
use ifc_scene_core::{DecodedEntity, IfcModel, IfcType};
use nalgebra::{Matrix4, Point3, Vector3};

/// Build a right-handed orthonormal frame from a Z axis and an approximate X axis
///
/// X is projected onto the plane perpendicular to Z; Y = Z × X. Translation is
/// `location`.
pub fn axis_frame(location: Point3<f64>, z_axis: Vector3<f64>, x_axis: Vector3<f64>) -> Matrix4<f64> {
    let z_axis_final = z_axis
        .try_normalize(1e-12)
        .unwrap_or_else(|| Vector3::new(0.0, 0.0, 1.0));
    let x_axis_normalized = x_axis
        .try_normalize(1e-12)
        .unwrap_or_else(|| Vector3::new(1.0, 0.0, 0.0));

    // Ensure X is orthogonal to Z (project X onto plane perpendicular to Z)
    let dot_product = x_axis_normalized.dot(&z_axis_final);
    let x_axis_orthogonal = x_axis_normalized - z_axis_final * dot_product;
    let x_axis_final = if x_axis_orthogonal.norm() > 1e-6 {
        x_axis_orthogonal.normalize()
    } else if z_axis_final.z.abs() < 0.9 {
        // X and Z are parallel: pick any perpendicular direction
        Vector3::new(0.0, 0.0, 1.0).cross(&z_axis_final).normalize()
    } else {
        Vector3::new(1.0, 0.0, 0.0).cross(&z_axis_final).normalize()
    };

    // Y axis is cross product of Z and X (right-hand rule: Y = Z × X)
    let y_axis = z_axis_final.cross(&x_axis_final).normalize();

    #[rustfmt::skip]
    let transform = Matrix4::new(
        x_axis_final.x, y_axis.x, z_axis_final.x, location.x,
        x_axis_final.y, y_axis.y, z_axis_final.y, location.y,
        x_axis_final.z, y_axis.z, z_axis_final.z, location.z,
        0.0, 0.0, 0.0, 1.0,
    );
    transform
}

/// Parse the IfcCartesianPoint referenced by attribute `attr_index` of `parent`
///
/// 2D points get z = 0.
pub fn parse_cartesian_point(
    parent: &DecodedEntity,
    model: &IfcModel,
    attr_index: usize,
) -> Result<Point3<f64>> {
    let point_entity = model
        .resolve_attr(parent, attr_index)?
        .ok_or_else(|| Error::geometry(format!("#{} missing cartesian point", parent.id)))?;
    point_from_entity(point_entity)
}

/// Coordinates of an IfcCartesianPoint entity
pub fn point_from_entity(point_entity: &DecodedEntity) -> Result<Point3<f64>> {
    if point_entity.ifc_type != IfcType::IfcCartesianPoint {
        return Err(Error::geometry(format!(
            "Expected IfcCartesianPoint, got {}",
            point_entity.ifc_type
        )));
    }

    // Coordinates (attribute 0)
    let coords = point_entity
        .get_list(0)
        .ok_or_else(|| Error::geometry("IfcCartesianPoint missing coordinates"))?;

    let x = coords.first().and_then(|v| v.as_float()).unwrap_or(0.0);
    let y = coords.get(1).and_then(|v| v.as_float()).unwrap_or(0.0);
    let z = coords.get(2).and_then(|v| v.as_float()).unwrap_or(0.0);

    Ok(Point3::new(x, y, z))
}

/// Parse IfcDirection entity
///
/// Extracts direction ratios from IfcDirection (attribute 0).
pub fn parse_direction(direction_entity: &DecodedEntity) -> Result<Vector3<f64>> {
    if direction_entity.ifc_type != IfcType::IfcDirection {
        return Err(Error::geometry(format!(
            "Expected IfcDirection, got {}",
            direction_entity.ifc_type
        )));
    }

    let ratios = direction_entity
        .get_list(0)
        .ok_or_else(|| Error::geometry("IfcDirection missing ratios"))?;

    let x = ratios.first().and_then(|v| v.as_float()).unwrap_or(0.0);
    let y = ratios.get(1).and_then(|v| v.as_float()).unwrap_or(0.0);
    let z = ratios.get(2).and_then(|v| v.as_float()).unwrap_or(0.0);

    Ok(Vector3::new(x, y, z))
}

/// Optional IfcDirection attribute, `default` when null
fn direction_or(
    entity: &DecodedEntity,
    model: &IfcModel,
    attr_index: usize,
    default: Vector3<f64>,
) -> Result<Vector3<f64>> {
    match model.resolve_attr(entity, attr_index)? {
        Some(direction) => parse_direction(direction),
        None => Ok(default),
    }
}

/// Parse IfcAxis2Placement3D or IfcAxis2Placement2D into a transformation matrix
///
/// IfcAxis2Placement3D attributes:
/// - 0: Location (IfcCartesianPoint)
/// - 1: Axis (IfcDirection, optional, default +Z)
/// - 2: RefDirection (IfcDirection, optional, default +X)
///
/// IfcAxis2Placement2D carries only Location and RefDirection (attribute 1).
pub fn parse_axis2_placement(placement: &DecodedEntity, model: &IfcModel) -> Result<Matrix4<f64>> {
    match placement.ifc_type {
        IfcType::IfcAxis2Placement3D => {
            let location = parse_cartesian_point(placement, model, 0)?;
            let z_axis = direction_or(placement, model, 1, Vector3::z())?;
            let x_axis = direction_or(placement, model, 2, Vector3::x())?;
            Ok(axis_frame(location, z_axis, x_axis))
        }
        IfcType::IfcAxis2Placement2D => {
            let location = parse_cartesian_point(placement, model, 0)?;
            let x_axis = direction_or(placement, model, 1, Vector3::x())?;
            Ok(axis_frame(location, Vector3::z(), x_axis))
        }
        other => Err(Error::geometry(format!(
            "Expected IfcAxis2Placement, got {}",
            other
        ))),
    }
}

/// Parse an IfcCartesianTransformationOperator3D into a transformation matrix
///
/// Attributes:
/// - 0: Axis1 (IfcDirection, optional) - X axis, default (1,0,0)
/// - 1: Axis2 (IfcDirection, optional) - Y axis, default (0,1,0)
/// - 2: LocalOrigin (IfcCartesianPoint) - translation
/// - 3: Scale (optional, default 1.0) - uniform scale of the rotation part
///
/// Z = Axis1 × Axis2; the frame is completed like an axis placement.
pub fn parse_cartesian_transformation_operator(
    operator: &DecodedEntity,
    model: &IfcModel,
) -> Result<Matrix4<f64>> {
    if !operator.ifc_type.is_cartesian_transformation_operator() {
        return Err(Error::geometry(format!(
            "Expected IfcCartesianTransformationOperator3D, got {}",
            operator.ifc_type
        )));
    }

    let x_axis = direction_or(operator, model, 0, Vector3::x())?;
    let y_axis = direction_or(operator, model, 1, Vector3::y())?;
    let origin = match model.resolve_attr(operator, 2)? {
        Some(point) => point_from_entity(point)?,
        None => Point3::origin(),
    };
    let scale = operator.get_float(3).unwrap_or(1.0);

    let z_axis = x_axis.cross(&y_axis);
    let z_axis = if z_axis.norm() > 1e-9 { z_axis } else { Vector3::z() };

    let mut transform = axis_frame(origin, z_axis, x_axis);
    let mut rotation = transform.fixed_view_mut::<3, 3>(0, 0);
    rotation *= scale;
    Ok(transform)
}

/// Multiply the translation column of an affine transform by `scale`
#[inline]
pub fn scale_translation(transform: &mut Matrix4<f64>, scale: f64) {
    transform[(0, 3)] *= scale;
    transform[(1, 3)] *= scale;
    transform[(2, 3)] *= scale;
}
