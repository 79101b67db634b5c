//! Polygon meshes and their per-corner multires layers.
use std::{collections::HashMap, ops::Range};

use itertools::Itertools;
use ultraviolet::Vec3;

use crate::{subdiv::grid_size_from_level, Error, Result};

/// Displacement samples of one grid (one face corner).
///
/// A grid at `level` holds `grid_size_from_level(level)²` samples in row
/// major order. `disps` is `None` for grids that were never allocated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplacementGrid {
    pub level: usize,
    pub disps: Option<Vec<[f32; 3]>>,
}

impl DisplacementGrid {
    /// Creates a zero-filled grid at the given level.
    pub fn zeroed(level: usize) -> Self {
        let grid_size = grid_size_from_level(level);
        Self {
            level,
            disps: Some(vec![[0.0; 3]; grid_size * grid_size]),
        }
    }

    /// Number of samples along one side of the grid.
    #[inline]
    pub fn grid_size(&self) -> usize {
        grid_size_from_level(self.level)
    }
}

/// Paint mask samples of one grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PaintMaskGrid {
    pub level: usize,
    pub data: Option<Vec<f32>>,
}

impl PaintMaskGrid {
    /// Creates a zero-filled grid at the given level.
    pub fn zeroed(level: usize) -> Self {
        let grid_size = grid_size_from_level(level);
        Self {
            level,
            data: Some(vec![0.0; grid_size * grid_size]),
        }
    }

    #[inline]
    pub fn grid_size(&self) -> usize {
        grid_size_from_level(self.level)
    }
}

/// Custom data layers stored per face corner.
///
/// A layer that is `None` does not exist. An existing layer always has one
/// grid per corner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CornerData {
    pub displacement: Option<Vec<DisplacementGrid>>,
    pub paint_mask: Option<Vec<PaintMaskGrid>>,
}

/// The edges of a mesh, derived from its faces.
///
/// Edges are numbered in the order they are first met walking the corners
/// of every face. An edge runs from the corner it is first met at to the
/// next corner of that face.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshEdges {
    pub edges: Vec<[u32; 2]>,
    /// The edge from each corner to the next corner of its face.
    pub corner_edges: Vec<usize>,
}

/// A polygon mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    positions: Vec<Vec3>,
    vertices_per_face: Vec<u32>,
    face_offsets: Vec<usize>,
    corner_verts: Vec<u32>,
    edge_creases: Vec<[u32; 2]>,
    edge_crease_sharpness: Vec<f32>,
    pub corner_data: CornerData,
}

#[cfg(feature = "topology_validation")]
fn validate_topology(vertices_len: usize, vertices_per_face: &[u32], face_vertices: &[u32]) -> Result<()> {
    if face_vertices.len() != vertices_per_face.iter().sum::<u32>() as usize {
        return Err(Error::InvalidTopology(
            "The number of vertex indices is not equal to the sum of face arities.".to_string(),
        ));
    }
    if let Some(face) = vertices_per_face.iter().position(|&arity| arity < 3) {
        return Err(Error::InvalidTopology(format!(
            "Face {} has {} vertices (should be >= 3).",
            face, vertices_per_face[face]
        )));
    }
    if let Some((i, &vertex)) = face_vertices
        .iter()
        .enumerate()
        .find(|(_, &vertex)| vertices_len <= vertex as usize)
    {
        return Err(Error::InvalidTopology(format!(
            "Vertex index[{}] = {} is out of range (should be < {}).",
            i, vertex, vertices_len
        )));
    }
    Ok(())
}

impl Mesh {
    /// Creates a mesh without custom data layers.
    ///
    /// # Arguments
    ///
    /// * `positions` - Vertex positions.
    /// * `vertices_per_face` - The number of vertices (corners) of each face.
    /// * `face_vertices` - A flat list of the vertex indices of each face.
    pub fn new(positions: Vec<Vec3>, vertices_per_face: &[u32], face_vertices: &[u32]) -> Result<Self> {
        #[cfg(feature = "topology_validation")]
        validate_topology(positions.len(), vertices_per_face, face_vertices)?;

        let mut face_offsets = Vec::with_capacity(vertices_per_face.len() + 1);
        face_offsets.push(0);
        for &arity in vertices_per_face {
            face_offsets.push(face_offsets[face_offsets.len() - 1] + arity as usize);
        }

        Ok(Self {
            positions,
            vertices_per_face: vertices_per_face.to_vec(),
            face_offsets,
            corner_verts: face_vertices.to_vec(),
            edge_creases: Vec::new(),
            edge_crease_sharpness: Vec::new(),
            corner_data: CornerData::default(),
        })
    }

    /// Returns a copy of positions, faces and creases without custom data
    /// layers.
    pub fn clone_topology(&self) -> Self {
        Self {
            positions: self.positions.clone(),
            vertices_per_face: self.vertices_per_face.clone(),
            face_offsets: self.face_offsets.clone(),
            corner_verts: self.corner_verts.clone(),
            edge_creases: self.edge_creases.clone(),
            edge_crease_sharpness: self.edge_crease_sharpness.clone(),
            corner_data: CornerData::default(),
        }
    }

    /// Sets semi-sharp creases on edges given as vertex pairs.
    ///
    /// Sharpness `0` is smooth, `10` and above is infinitely sharp.
    pub fn set_edge_creases(&mut self, creases: &[[u32; 2]], sharpness: &[f32]) -> Result<()> {
        if creases.len() != sharpness.len() {
            return Err(Error::InvalidTopology(format!(
                "{} creases but {} sharpness values.",
                creases.len(),
                sharpness.len()
            )));
        }
        if let Some(&vertex) = creases
            .iter()
            .flatten()
            .find(|&&vertex| self.vertices_len() <= vertex as usize)
        {
            return Err(Error::InvalidTopology(format!(
                "Crease vertex {} is out of range (should be < {}).",
                vertex,
                self.vertices_len()
            )));
        }
        self.edge_creases = creases.to_vec();
        self.edge_crease_sharpness = sharpness.to_vec();
        Ok(())
    }

    #[inline]
    pub fn edge_creases(&self) -> &[[u32; 2]] {
        &self.edge_creases
    }

    #[inline]
    pub fn edge_crease_sharpness(&self) -> &[f32] {
        &self.edge_crease_sharpness
    }

    /// Derives the edges of this mesh from its faces.
    pub fn edges(&self) -> MeshEdges {
        let mut lookup = HashMap::with_capacity(self.corners_len());
        let mut edges = Vec::new();
        let mut corner_edges = Vec::with_capacity(self.corners_len());
        for face in 0..self.faces_len() {
            for (v1, v2) in self.face_vertices(face).iter().copied().circular_tuple_windows() {
                let edge = *lookup.entry((v1.min(v2), v1.max(v2))).or_insert_with(|| {
                    edges.push([v1, v2]);
                    edges.len() - 1
                });
                corner_edges.push(edge);
            }
        }
        MeshEdges {
            edges,
            corner_edges,
        }
    }

    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    #[inline]
    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        &mut self.positions
    }

    #[inline]
    pub fn vertices_len(&self) -> usize {
        self.positions.len()
    }

    /// Returns the number of vertices (corners) of every face.
    #[inline]
    pub fn vertices_per_face(&self) -> &[u32] {
        &self.vertices_per_face
    }

    #[inline]
    pub fn faces_len(&self) -> usize {
        self.vertices_per_face.len()
    }

    #[inline]
    pub fn corners_len(&self) -> usize {
        self.corner_verts.len()
    }

    /// Returns the range of corner indices of a face.
    #[inline]
    pub fn face_corners(&self, face: usize) -> Range<usize> {
        self.face_offsets[face]..self.face_offsets[face + 1]
    }

    /// Returns the vertex indices of a face.
    #[inline]
    pub fn face_vertices(&self, face: usize) -> &[u32] {
        &self.corner_verts[self.face_corners(face)]
    }

    /// Returns the start offset of every face into the corner arrays, plus
    /// the total corner count as the last element.
    #[inline]
    pub fn face_offsets(&self) -> &[usize] {
        &self.face_offsets
    }

    #[inline]
    pub fn corner_verts(&self) -> &[u32] {
        &self.corner_verts
    }

    /// Adds a displacement layer with one absent grid per corner. Returns
    /// `false` if the layer already existed.
    pub fn add_displacement_layer(&mut self) -> bool {
        if self.corner_data.displacement.is_some() {
            return false;
        }
        self.corner_data.displacement = Some(vec![DisplacementGrid::default(); self.corners_len()]);
        true
    }

    pub fn free_displacement_layer(&mut self) {
        self.corner_data.displacement = None;
    }

    /// Adds a paint mask layer with one absent grid per corner. Returns
    /// `false` if the layer already existed.
    pub fn add_paint_mask_layer(&mut self) -> bool {
        if self.corner_data.paint_mask.is_some() {
            return false;
        }
        self.corner_data.paint_mask = Some(vec![PaintMaskGrid::default(); self.corners_len()]);
        true
    }

    pub fn free_paint_mask_layer(&mut self) {
        self.corner_data.paint_mask = None;
    }
}
