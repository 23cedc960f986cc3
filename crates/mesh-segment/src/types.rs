//! Core segmentation data types.

use hashbrown::HashSet;
use nalgebra::{Point3, Vector3};

/// Vertex group identifier (e.g. a deform-bone index).
pub type GroupId = u32;

/// Identifier of an input triangle. Equal to the host face index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleId(pub u32);

/// Identifier of a segment in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u32);

/// Identifier of a contact in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(pub u32);

impl std::fmt::Display for TriangleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// An input triangle with precomputed geometry.
///
/// Never mutated once built. Degenerate triangles carry zero area and a
/// zero normal so they contribute nothing to area or face-angle cost.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub id: TriangleId,
    /// Vertex indices into the host mesh.
    pub vertices: [u32; 3],
    pub area: f64,
    /// Unit face normal, or the zero vector for degenerate faces.
    pub normal: Vector3<f64>,
    pub material: u32,
}

impl Triangle {
    /// Build a triangle from its corner positions.
    pub fn from_positions(
        id: TriangleId,
        vertices: [u32; 3],
        positions: [Point3<f64>; 3],
        material: u32,
    ) -> Self {
        let [p0, p1, p2] = positions;
        let cross = (p1 - p0).cross(&(p2 - p0));
        let len = cross.norm();
        let normal = if len > f64::EPSILON {
            cross / len
        } else {
            Vector3::zeros()
        };
        Self {
            id,
            vertices,
            area: len * 0.5,
            normal,
            material,
        }
    }

    /// The vertex of this triangle not on the given edge.
    pub fn opposite_vertex(&self, edge: (u32, u32)) -> Option<u32> {
        self.vertices
            .iter()
            .copied()
            .find(|&v| v != edge.0 && v != edge.1)
    }

    /// Whether this triangle has both vertices of the edge.
    pub fn has_edge(&self, edge: (u32, u32)) -> bool {
        self.vertices.contains(&edge.0) && self.vertices.contains(&edge.1)
    }

    /// The three edges as normalized (min, max) vertex pairs.
    pub fn edges(&self) -> [(u32, u32); 3] {
        let [a, b, c] = self.vertices;
        [normalize_edge(a, b), normalize_edge(b, c), normalize_edge(c, a)]
    }
}

/// Order an undirected edge so `(a, b)` and `(b, a)` compare equal.
#[inline]
pub fn normalize_edge(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

/// A group of triangles currently treated as one region.
#[derive(Debug, Clone)]
pub struct Segment {
    pub id: SegmentId,
    /// Sum of member triangle areas.
    pub area: f64,
    pub triangles: HashSet<TriangleId>,
    /// Live contacts incident to this segment.
    pub contacts: HashSet<ContactId>,
}

impl Segment {
    /// A segment holding a single triangle.
    pub fn from_triangle(id: SegmentId, triangle: &Triangle) -> Self {
        let mut triangles = HashSet::with_capacity(1);
        triangles.insert(triangle.id);
        Self {
            id,
            area: triangle.area,
            triangles,
            contacts: HashSet::new(),
        }
    }

    /// Number of member triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Member triangle ids in ascending order.
    pub fn sorted_triangles(&self) -> Vec<TriangleId> {
        let mut ids: Vec<_> = self.triangles.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// A segment with no live neighbors can never merge again.
    #[inline]
    pub fn is_isolated(&self) -> bool {
        self.contacts.is_empty()
    }
}

/// A shared border between two distinct segments.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentContact {
    pub id: ContactId,
    /// Sum of weighted factor costs along the border.
    pub raw_cost: f64,
    /// Cost compared against the threshold; see [`normalized_cost`].
    pub normalized_cost: f64,
    /// Total length of the shared border.
    pub length: f64,
    pub segment0: SegmentId,
    pub segment1: SegmentId,
}

impl SegmentContact {
    /// The endpoint across the border from `segment`.
    pub fn other(&self, segment: SegmentId) -> Option<SegmentId> {
        if self.segment0 == segment {
            Some(self.segment1)
        } else if self.segment1 == segment {
            Some(self.segment0)
        } else {
            None
        }
    }

    /// Whether this contact joins `a` and `b`, in either order.
    pub fn connects(&self, a: SegmentId, b: SegmentId) -> bool {
        (self.segment0 == a && self.segment1 == b) || (self.segment0 == b && self.segment1 == a)
    }

    #[inline]
    pub fn is_self_contact(&self) -> bool {
        self.segment0 == self.segment1
    }
}

/// Normalize a raw border cost by its length.
///
/// Returns `raw / (length * length_factor)` when `length_factor > 0` and the
/// border has positive length, otherwise `raw` unchanged.
#[inline]
pub fn normalized_cost(raw: f64, length: f64, length_factor: f64) -> f64 {
    let denom = length * length_factor;
    if length_factor > 0.0 && denom > 0.0 {
        raw / denom
    } else {
        raw
    }
}
