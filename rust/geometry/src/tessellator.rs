// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tessellation service
//!
//! [`Tessellator`] turns a product's body representation into
//! [`TessellatedGeometry`] expressed in the product's local frame: the object
//! placement is not applied, mapped-item transforms are. Coordinates are
//! multiplied by [`TessellationSettings::unit_scale`], so geometry comes out
//! in metres.

use crate::error::{Error, Result};
use crate::mesh::TessellatedGeometry;
use crate::representation::{
    body_representation, mapped_item_transform, mapped_source, named_representation,
    representation_items,
};
use crate::transform::{parse_axis2_placement, parse_direction, point_from_entity};
use crate::triangulation::{signed_area, triangulate_polygon};
use ifc_scene_core::{AttributeValue, DecodedEntity, EntityId, IfcModel, IfcType};
use nalgebra::{Matrix4, Point2, Point3, Vector3};

/// Options passed to the tessellation service
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessellationSettings {
    /// Emit curve items (polylines) as edges
    pub include_curves: bool,
    /// Factor converting model length units to metres
    pub unit_scale: f64,
}

impl Default for TessellationSettings {
    fn default() -> Self {
        Self {
            include_curves: false,
            unit_scale: 1.0,
        }
    }
}

/// Result of tessellating one product
#[derive(Debug, Clone)]
pub struct Shape {
    pub geometry: TessellatedGeometry,
    /// The entity the geometry was produced for
    pub product: EntityId,
}

/// A tessellation service
pub trait Tessellator {
    fn tessellate(
        &self,
        model: &IfcModel,
        product: &DecodedEntity,
        settings: &TessellationSettings,
    ) -> Result<Shape>;
}

/// Built-in tessellator for explicit and simple swept representations
///
/// Handles `IfcTriangulatedFaceSet`, `IfcExtrudedAreaSolid` over rectangle and
/// polyline profiles, `IfcMappedItem` and, with curves enabled, `IfcPolyline`
/// items including those of the product's `Axis` representation. Other items
/// are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicTessellator;

impl BasicTessellator {
    /// Nested mapped items deeper than this are treated as malformed
    const MAX_MAPPING_DEPTH: usize = 16;

    pub fn new() -> Self {
        Self
    }

    fn representation(
        &self,
        model: &IfcModel,
        representation: &DecodedEntity,
        transform: &Matrix4<f64>,
        settings: &TessellationSettings,
        depth: usize,
        out: &mut TessellatedGeometry,
    ) -> Result<()> {
        for item in representation_items(model, representation)? {
            self.item(model, item, transform, settings, depth, out)?;
        }
        Ok(())
    }

    fn item(
        &self,
        model: &IfcModel,
        item: &DecodedEntity,
        transform: &Matrix4<f64>,
        settings: &TessellationSettings,
        depth: usize,
        out: &mut TessellatedGeometry,
    ) -> Result<()> {
        let mut geometry = match item.ifc_type {
            IfcType::IfcTriangulatedFaceSet => triangulated_face_set(model, item)?,
            IfcType::IfcExtrudedAreaSolid => extruded_area_solid(model, item)?,
            IfcType::IfcPolyline if settings.include_curves => polyline(model, item)?,
            IfcType::IfcMappedItem => {
                if depth >= Self::MAX_MAPPING_DEPTH {
                    return Err(Error::geometry(format!(
                        "MappedItem #{} nested deeper than {}",
                        item.id,
                        Self::MAX_MAPPING_DEPTH
                    )));
                }
                let mapped = transform * mapped_item_transform(model, item)?;
                let source = mapped_source(model, item)?;
                return self.representation(model, source, &mapped, settings, depth + 1, out);
            }
            _ => return Ok(()),
        };

        geometry.transform(transform);
        out.merge(&geometry);
        Ok(())
    }
}

impl Tessellator for BasicTessellator {
    fn tessellate(
        &self,
        model: &IfcModel,
        product: &DecodedEntity,
        settings: &TessellationSettings,
    ) -> Result<Shape> {
        let body = body_representation(model, product)?.ok_or_else(|| {
            Error::geometry(format!("#{} has no shape representation", product.id))
        })?;

        let mut geometry = TessellatedGeometry::new();
        self.representation(model, body, &Matrix4::identity(), settings, 0, &mut geometry)?;
        if settings.include_curves {
            if let Some(axis) = named_representation(model, product, "Axis")? {
                if axis.id != body.id {
                    self.representation(model, axis, &Matrix4::identity(), settings, 0, &mut geometry)?;
                }
            }
        }

        if geometry.is_empty() {
            return Err(Error::EmptyMesh(format!(
                "no supported items in representation #{} of #{}",
                body.id, product.id
            )));
        }

        geometry.scale(settings.unit_scale);
        Ok(Shape {
            geometry,
            product: product.id,
        })
    }
}

/// IfcTriangulatedFaceSet: 0 Coordinates, 3 CoordIndex (1-based)
fn triangulated_face_set(model: &IfcModel, face_set: &DecodedEntity) -> Result<TessellatedGeometry> {
    let point_list = model
        .resolve_attr(face_set, 0)?
        .ok_or_else(|| Error::geometry(format!("#{} missing Coordinates", face_set.id)))?;
    let coordinates = point_list
        .get_list(0)
        .map(AttributeValue::parse_coordinate_list_3d)
        .unwrap_or_default();
    let triangles = face_set
        .get_list(3)
        .ok_or_else(|| Error::geometry(format!("#{} missing CoordIndex", face_set.id)))?;

    let mut geometry = TessellatedGeometry::with_capacity(coordinates.len(), triangles.len() * 3);
    for [x, y, z] in &coordinates {
        geometry.add_vertex(Point3::new(*x, *y, *z));
    }

    let vertex_count = coordinates.len() as i64;
    for triangle in triangles {
        let indices: Vec<i64> = triangle
            .as_list()
            .map(|list| list.iter().filter_map(|v| v.as_int()).collect())
            .unwrap_or_default();
        let [a, b, c] = indices[..] else {
            return Err(Error::geometry(format!(
                "#{} has a face with {} indices",
                face_set.id,
                indices.len()
            )));
        };
        if [a, b, c].iter().any(|&i| i < 1 || i > vertex_count) {
            return Err(Error::geometry(format!(
                "#{} references a vertex outside 1..={}",
                face_set.id, vertex_count
            )));
        }
        geometry.add_triangle((a - 1) as u32, (b - 1) as u32, (c - 1) as u32);
    }

    Ok(geometry)
}

/// IfcExtrudedAreaSolid: 0 SweptArea, 1 Position, 2 ExtrudedDirection, 3 Depth
fn extruded_area_solid(model: &IfcModel, solid: &DecodedEntity) -> Result<TessellatedGeometry> {
    let profile_entity = model
        .resolve_attr(solid, 0)?
        .ok_or_else(|| Error::InvalidProfile(format!("#{} missing SweptArea", solid.id)))?;
    let mut outline = profile_outline(model, profile_entity)?;
    if signed_area(&outline) < 0.0 {
        outline.reverse();
    }

    let direction = match model.resolve_attr(solid, 2)? {
        Some(direction) => parse_direction(direction)?,
        None => Vector3::z(),
    };
    let depth = solid.get_float(3).unwrap_or(0.0);
    if depth <= 0.0 {
        return Err(Error::InvalidExtrusion(format!(
            "#{} depth must be positive",
            solid.id
        )));
    }
    let offset = direction
        .try_normalize(1e-12)
        .ok_or_else(|| Error::InvalidExtrusion(format!("#{} has a zero direction", solid.id)))?
        * depth;

    let mut geometry = extrude_outline(&outline, &offset)?;
    if let Some(position) = model.resolve_attr(solid, 1)? {
        geometry.transform(&parse_axis2_placement(position, model)?);
    }
    Ok(geometry)
}

/// Closed 2D outline of a profile definition, without the repeated closing point
fn profile_outline(model: &IfcModel, profile: &DecodedEntity) -> Result<Vec<Point2<f64>>> {
    match profile.ifc_type {
        // 2 Position, 3 XDim, 4 YDim
        IfcType::IfcRectangleProfileDef => {
            let x = profile.get_float(3).unwrap_or(0.0) / 2.0;
            let y = profile.get_float(4).unwrap_or(0.0) / 2.0;
            if x <= 0.0 || y <= 0.0 {
                return Err(Error::InvalidProfile(format!(
                    "#{} has non-positive dimensions",
                    profile.id
                )));
            }
            let position = match model.resolve_attr(profile, 2)? {
                Some(placement) => parse_axis2_placement(placement, model)?,
                None => Matrix4::identity(),
            };
            Ok([(-x, -y), (x, -y), (x, y), (-x, y)]
                .into_iter()
                .map(|(px, py)| {
                    let p = position.transform_point(&Point3::new(px, py, 0.0));
                    Point2::new(p.x, p.y)
                })
                .collect())
        }
        // 2 OuterCurve
        IfcType::IfcArbitraryClosedProfileDef => {
            let curve = model
                .resolve_attr(profile, 2)?
                .ok_or_else(|| Error::InvalidProfile(format!("#{} missing OuterCurve", profile.id)))?;
            if curve.ifc_type != IfcType::IfcPolyline {
                return Err(Error::InvalidProfile(format!(
                    "#{}: unsupported outer curve {}",
                    profile.id, curve.ifc_type
                )));
            }
            let mut points: Vec<Point2<f64>> = polyline_points(model, curve)?
                .into_iter()
                .map(|p| Point2::new(p.x, p.y))
                .collect();
            if points.len() > 1 && points.first() == points.last() {
                points.pop();
            }
            Ok(points)
        }
        other => Err(Error::InvalidProfile(format!(
            "#{}: unsupported profile {}",
            profile.id, other
        ))),
    }
}

/// Prism over a counter-clockwise outline: bottom at z = 0, top at `offset`
fn extrude_outline(outline: &[Point2<f64>], offset: &Vector3<f64>) -> Result<TessellatedGeometry> {
    let cap = triangulate_polygon(outline)?;
    let n = outline.len();
    let mut geometry = TessellatedGeometry::with_capacity(n * 2, cap.len() * 2 + n * 6);

    for p in outline {
        geometry.add_vertex(Point3::new(p.x, p.y, 0.0));
    }
    for p in outline {
        geometry.add_vertex(Point3::new(p.x, p.y, 0.0) + *offset);
    }

    let top = n as u32;
    for tri in cap.chunks_exact(3) {
        let (a, b, c) = (tri[0] as u32, tri[1] as u32, tri[2] as u32);
        // Bottom faces down
        geometry.add_triangle(a, c, b);
        geometry.add_triangle(top + a, top + b, top + c);
    }

    for i in 0..n as u32 {
        let j = (i + 1) % n as u32;
        geometry.add_triangle(i, j, top + j);
        geometry.add_triangle(i, top + j, top + i);
        geometry.add_edge(i, j);
        geometry.add_edge(top + i, top + j);
        geometry.add_edge(i, top + i);
    }

    Ok(geometry)
}

/// IfcPolyline: 0 Points
fn polyline_points(model: &IfcModel, polyline: &DecodedEntity) -> Result<Vec<Point3<f64>>> {
    match polyline.get(0) {
        Some(points) => model
            .resolve_ref_list(points)?
            .into_iter()
            .map(point_from_entity)
            .collect(),
        None => Ok(Vec::new()),
    }
}

fn polyline(model: &IfcModel, polyline: &DecodedEntity) -> Result<TessellatedGeometry> {
    let mut geometry = TessellatedGeometry::new();
    let mut previous = None;
    for point in polyline_points(model, polyline)? {
        let index = geometry.add_vertex(point);
        if let Some(prev) = previous {
            geometry.add_edge(prev, index);
        }
        previous = Some(index);
    }
    Ok(geometry)
}
