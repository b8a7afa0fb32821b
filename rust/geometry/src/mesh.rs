// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use nalgebra::{Matrix4, Point3};

/// Tessellated geometry as delivered by a tessellation service
///
/// Flat buffers: `vertices` holds (x, y, z) triples, `edges` index pairs and
/// `faces` index triples into the vertex list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TessellatedGeometry {
    /// Vertex positions (x, y, z)
    pub vertices: Vec<f64>,
    /// Edge indices (i0, i1)
    pub edges: Vec<u32>,
    /// Triangle indices (i0, i1, i2)
    pub faces: Vec<u32>,
}

impl TessellatedGeometry {
    /// Create a new empty geometry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create geometry with capacity
    #[inline]
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count * 3),
            edges: Vec::new(),
            faces: Vec::with_capacity(index_count),
        }
    }

    /// Add a vertex, returning its index
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>) -> u32 {
        let index = self.vertex_count() as u32;
        self.vertices.extend_from_slice(&[position.x, position.y, position.z]);
        index
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.faces.extend_from_slice(&[i0, i1, i2]);
    }

    /// Add an edge
    #[inline]
    pub fn add_edge(&mut self, i0: u32, i1: u32) {
        self.edges.extend_from_slice(&[i0, i1]);
    }

    /// Position of vertex `index`
    #[inline]
    pub fn vertex(&self, index: usize) -> Option<Point3<f64>> {
        let chunk = self.vertices.get(index * 3..index * 3 + 3)?;
        Some(Point3::new(chunk[0], chunk[1], chunk[2]))
    }

    /// Iterate vertex positions
    pub fn positions(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.vertices
            .chunks_exact(3)
            .map(|chunk| Point3::new(chunk[0], chunk[1], chunk[2]))
    }

    /// Merge another geometry into this one
    #[inline]
    pub fn merge(&mut self, other: &TessellatedGeometry) {
        if other.is_empty() {
            return;
        }

        let vertex_offset = self.vertex_count() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.edges.extend(other.edges.iter().map(|&i| i + vertex_offset));
        self.faces.extend(other.faces.iter().map(|&i| i + vertex_offset));
    }

    /// Apply an affine transform to every vertex
    pub fn transform(&mut self, transform: &Matrix4<f64>) {
        self.vertices.chunks_exact_mut(3).for_each(|chunk| {
            let point = transform.transform_point(&Point3::new(chunk[0], chunk[1], chunk[2]));
            chunk[0] = point.x;
            chunk[1] = point.y;
            chunk[2] = point.z;
        });
    }

    /// Multiply every coordinate by `factor`
    pub fn scale(&mut self, factor: f64) {
        if factor != 1.0 {
            self.vertices.iter_mut().for_each(|v| *v *= factor);
        }
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.faces.len() / 3
    }

    /// Get edge count
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len() / 2
    }

    /// Check if geometry is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}
