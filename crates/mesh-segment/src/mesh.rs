//! Host mesh access.
//!
//! Segmentation only reads from the mesh it partitions. [`HostMesh`] is the
//! read interface a host (an editor, a file loader, a game engine) implements;
//! [`SegmentMesh`] is a self-contained indexed triangle mesh implementing it
//! for callers without a host of their own.
//!
//! Triangles sharing an edge are found from the faces' vertex indices, so two
//! faces are adjacent exactly when they reference the same two vertex ids.

use hashbrown::HashSet;
use nalgebra::Point3;

use crate::error::{SegmentError, SegmentOpResult};
use crate::types::{GroupId, normalize_edge};

/// Read access to the mesh being segmented.
///
/// Only the first four methods are required. The defaults describe a mesh
/// with one material, every face selected, every edge smooth, no seams and no
/// vertex groups.
pub trait HostMesh {
    /// Number of vertices.
    fn vertex_count(&self) -> usize;

    /// Number of triangular faces.
    fn face_count(&self) -> usize;

    /// Vertex indices of a face.
    fn face_vertices(&self, face: usize) -> [u32; 3];

    /// Position of a vertex.
    fn vertex_position(&self, vertex: u32) -> Point3<f64>;

    /// Material index of a face.
    fn face_material(&self, _face: usize) -> u32 {
        0
    }

    /// Whether a face takes part in segmentation (e.g. is selected).
    fn is_face_eligible(&self, _face: usize) -> bool {
        true
    }

    /// Whether the edge between two vertices is smooth-shaded.
    fn is_edge_smooth(&self, _a: u32, _b: u32) -> bool {
        true
    }

    /// Whether the edge between two vertices is marked as a UV seam.
    fn is_edge_seam(&self, _a: u32, _b: u32) -> bool {
        false
    }

    /// Vertex group weights of a vertex.
    fn vertex_groups(&self, _vertex: u32) -> impl Iterator<Item = (GroupId, f64)> + '_ {
        std::iter::empty()
    }
}

/// A vertex with its position and vertex-group weights.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub position: Point3<f64>,
    /// `(group, weight)` pairs; at most one entry per group.
    pub groups: Vec<(GroupId, f64)>,
}

impl Vertex {
    /// Create a vertex with no group weights.
    #[inline]
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            groups: Vec::new(),
        }
    }

    /// Create a vertex from raw coordinates.
    #[inline]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }

    /// Set the weight of a group, replacing any previous weight.
    pub fn set_weight(&mut self, group: GroupId, weight: f64) {
        match self.groups.iter_mut().find(|(g, _)| *g == group) {
            Some(entry) => entry.1 = weight,
            None => self.groups.push((group, weight)),
        }
    }

    /// Weight of a group, zero when the vertex is not in it.
    pub fn weight(&self, group: GroupId) -> f64 {
        self.groups
            .iter()
            .find(|(g, _)| *g == group)
            .map_or(0.0, |(_, w)| *w)
    }
}

/// An indexed triangle mesh carrying the attributes segmentation reads.
#[derive(Debug, Clone, Default)]
pub struct SegmentMesh {
    pub vertices: Vec<Vertex>,
    /// Triangle faces as indices into the vertex array.
    pub faces: Vec<[u32; 3]>,
    /// Material index per face.
    pub materials: Vec<u32>,
    /// Eligibility (selection) per face.
    pub selected: Vec<bool>,
    /// Flat-shaded edges as normalized vertex pairs.
    pub sharp_edges: HashSet<(u32, u32)>,
    /// UV seam edges as normalized vertex pairs.
    pub seam_edges: HashSet<(u32, u32)>,
}

impl SegmentMesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
            materials: Vec::with_capacity(face_count),
            selected: Vec::with_capacity(face_count),
            ..Self::default()
        }
    }

    /// A flat grid of `columns x rows` quads in the XY plane, each split into
    /// two triangles. Face `2 * (row * columns + column)` is the lower-right
    /// half of its quad and the next face the upper-left half.
    pub fn plane_grid(columns: u32, rows: u32, cell_size: f64) -> Self {
        let mut mesh = Self::with_capacity(
            ((columns + 1) * (rows + 1)) as usize,
            (2 * columns * rows) as usize,
        );
        for y in 0..=rows {
            for x in 0..=columns {
                mesh.add_vertex(x as f64 * cell_size, y as f64 * cell_size, 0.0);
            }
        }
        let stride = columns + 1;
        for y in 0..rows {
            for x in 0..columns {
                let v00 = y * stride + x;
                let v10 = v00 + 1;
                let v01 = v00 + stride;
                let v11 = v01 + 1;
                mesh.add_face([v00, v10, v11]);
                mesh.add_face([v00, v11, v01]);
            }
        }
        mesh
    }

    /// Append a vertex and return its index.
    pub fn add_vertex(&mut self, x: f64, y: f64, z: f64) -> u32 {
        self.vertices.push(Vertex::from_coords(x, y, z));
        (self.vertices.len() - 1) as u32
    }

    /// Append a selected face with material 0 and return its index.
    pub fn add_face(&mut self, face: [u32; 3]) -> usize {
        self.add_face_with_material(face, 0)
    }

    /// Append a selected face with the given material and return its index.
    pub fn add_face_with_material(&mut self, face: [u32; 3], material: u32) -> usize {
        self.faces.push(face);
        self.materials.push(material);
        self.selected.push(true);
        self.faces.len() - 1
    }

    /// Set the material of a face. Faces pushed straight onto `faces` get
    /// their missing entries filled with material 0.
    pub fn set_material(&mut self, face: usize, material: u32) {
        if self.materials.len() <= face {
            self.materials.resize(face + 1, 0);
        }
        self.materials[face] = material;
    }

    /// Set whether a face is eligible. Missing entries are filled as selected.
    pub fn set_selected(&mut self, face: usize, selected: bool) {
        if self.selected.len() <= face {
            self.selected.resize(face + 1, true);
        }
        self.selected[face] = selected;
    }

    /// Mark the edge between two vertices as flat-shaded.
    pub fn mark_sharp(&mut self, a: u32, b: u32) {
        self.sharp_edges.insert(normalize_edge(a, b));
    }

    /// Mark the edge between two vertices as a UV seam.
    pub fn mark_seam(&mut self, a: u32, b: u32) {
        self.seam_edges.insert(normalize_edge(a, b));
    }

    /// Set a vertex group weight on a vertex.
    pub fn set_vertex_weight(&mut self, vertex: u32, group: GroupId, weight: f64) {
        self.vertices[vertex as usize].set_weight(group, weight);
    }

    /// Check if mesh is empty (no vertices or faces).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Total area of all faces.
    pub fn surface_area(&self) -> f64 {
        self.faces
            .iter()
            .map(|&[a, b, c]| {
                let p0 = self.vertices[a as usize].position;
                let p1 = self.vertices[b as usize].position;
                let p2 = self.vertices[c as usize].position;
                (p1 - p0).cross(&(p2 - p0)).norm() * 0.5
            })
            .sum()
    }

    /// Check that every face references existing vertices. Missing material
    /// or selection entries default to material 0 and selected.
    pub fn validate(&self) -> SegmentOpResult<()> {
        check_face_indices(self)
    }
}

impl HostMesh for SegmentMesh {
    fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn face_vertices(&self, face: usize) -> [u32; 3] {
        self.faces[face]
    }

    fn vertex_position(&self, vertex: u32) -> Point3<f64> {
        self.vertices[vertex as usize].position
    }

    fn face_material(&self, face: usize) -> u32 {
        self.materials.get(face).copied().unwrap_or(0)
    }

    fn is_face_eligible(&self, face: usize) -> bool {
        self.selected.get(face).copied().unwrap_or(true)
    }

    fn is_edge_smooth(&self, a: u32, b: u32) -> bool {
        !self.sharp_edges.contains(&normalize_edge(a, b))
    }

    fn is_edge_seam(&self, a: u32, b: u32) -> bool {
        self.seam_edges.contains(&normalize_edge(a, b))
    }

    fn vertex_groups(&self, vertex: u32) -> impl Iterator<Item = (GroupId, f64)> + '_ {
        self.vertices[vertex as usize].groups.iter().copied()
    }
}

/// Check that every face of a host mesh references existing vertices.
pub fn check_face_indices<M: HostMesh>(mesh: &M) -> SegmentOpResult<()> {
    let vertex_count = mesh.vertex_count();
    for face_index in 0..mesh.face_count() {
        for vertex_index in mesh.face_vertices(face_index) {
            if vertex_index as usize >= vertex_count {
                return Err(SegmentError::InvalidVertexIndex {
                    face_index,
                    vertex_index,
                    vertex_count,
                });
            }
        }
    }
    Ok(())
}
