//! Initial triangle adjacency graph.
//!
//! One segment per eligible triangle and one contact per pair of eligible
//! triangles sharing an edge. Faces that are not eligible take no part at
//! all: they get no segment and borders with them get no contact.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;
use tracing::{trace, warn};

use crate::cost::{CostEvaluator, CostFactors, EdgeFlags};
use crate::error::{SegmentError, SegmentOpResult};
use crate::mesh::{HostMesh, check_face_indices};
use crate::params::SegmentParams;
use crate::registry::SegmentRegistry;
use crate::tracing_ext::log_graph_stats;
use crate::types::{SegmentId, Triangle, TriangleId};
use crate::weights::VertexWeights;

/// Counts gathered while building the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStats {
    /// Faces in the host mesh.
    pub face_count: usize,
    /// Faces taking part in segmentation.
    pub eligible_triangles: usize,
    /// Contacts created.
    pub contacts: usize,
    /// Edges with a single eligible face.
    pub boundary_edges: usize,
    /// Edges shared by more than two eligible faces.
    pub non_manifold_edges: usize,
    /// Triangles without any eligible neighbor.
    pub isolated_triangles: usize,
}

/// Triangles and the seeded registry, ready for the merge engine.
#[derive(Debug)]
pub struct SegmentGraph {
    pub triangles: Vec<Triangle>,
    pub registry: SegmentRegistry,
    pub stats: GraphStats,
}

/// Build the initial graph from a host mesh.
///
/// # Errors
///
/// [`SegmentError::DegenerateInput`] when no face is eligible, and
/// [`SegmentError::InvalidVertexIndex`] for faces referencing missing vertices.
pub fn build_graph<M: HostMesh>(mesh: &M, params: &SegmentParams) -> SegmentOpResult<SegmentGraph> {
    check_face_indices(mesh)?;

    let triangles: Vec<Triangle> = (0..mesh.face_count())
        .filter(|&face| mesh.is_face_eligible(face))
        .map(|face| {
            let vertices = mesh.face_vertices(face);
            Triangle::from_positions(
                TriangleId(face as u32),
                vertices,
                vertices.map(|v| mesh.vertex_position(v)),
                mesh.face_material(face),
            )
        })
        .collect();

    if triangles.is_empty() {
        warn!(
            target: "mesh_segment::graph",
            faces = mesh.face_count(),
            "No eligible triangles to segment"
        );
        return Err(SegmentError::DegenerateInput {
            details: format!("none of {} faces is eligible", mesh.face_count()),
        });
    }

    let factors = CostFactors::from_params(params);
    let weights = if factors.uses_vertex_groups() {
        VertexWeights::from_host(
            mesh,
            triangles.iter().flat_map(|t| t.vertices),
            &params.ignore_vertex_group_indices,
        )
    } else {
        VertexWeights::default()
    };
    let mut evaluator = CostEvaluator::new(factors, weights);

    let mut registry = SegmentRegistry::new(params.contact_length_factor);
    let segment_of: Vec<SegmentId> = triangles.iter().map(|t| registry.create_segment(t)).collect();

    // Edge -> indices into `triangles`.
    let mut edge_faces: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for (index, triangle) in triangles.iter().enumerate() {
        let mut edges = triangle.edges();
        edges.sort_unstable();
        let mut previous = None;
        for edge in edges {
            if edge.0 == edge.1 || previous == Some(edge) {
                continue;
            }
            previous = Some(edge);
            edge_faces.entry(edge).or_default().push(index);
        }
    }

    let mut stats = GraphStats {
        face_count: mesh.face_count(),
        eligible_triangles: triangles.len(),
        ..GraphStats::default()
    };

    // (lower index, higher index) -> (raw cost, border length). Ordered so
    // contact ids do not depend on hash iteration order.
    let mut borders: BTreeMap<(usize, usize), (f64, f64)> = BTreeMap::new();
    for (&edge, faces) in &edge_faces {
        match faces.len() {
            1 => stats.boundary_edges += 1,
            2 => {}
            _ => stats.non_manifold_edges += 1,
        }
        if faces.len() < 2 {
            continue;
        }
        let length = (mesh.vertex_position(edge.1) - mesh.vertex_position(edge.0)).norm();
        let flags = EdgeFlags {
            smooth: mesh.is_edge_smooth(edge.0, edge.1),
            seam: mesh.is_edge_seam(edge.0, edge.1),
        };
        for (i, &a) in faces.iter().enumerate() {
            for &b in &faces[i + 1..] {
                let (a, b) = if a < b { (a, b) } else { (b, a) };
                let raw = evaluator.raw_cost(&triangles[a], &triangles[b], edge, length, flags);
                let entry = borders.entry((a, b)).or_insert((0.0, 0.0));
                entry.0 += raw;
                entry.1 += length;
            }
        }
    }

    for ((a, b), (raw, length)) in borders {
        registry.add_contact(segment_of[a], segment_of[b], raw, length)?;
    }
    stats.contacts = registry.contact_count();

    let isolated: BTreeSet<SegmentId> = registry
        .active_segments()
        .filter(|s| s.is_isolated())
        .map(|s| s.id)
        .collect();
    stats.isolated_triangles = isolated.len();
    for id in isolated {
        registry.finalize(id)?;
    }

    log_graph_stats(&stats);
    trace!(
        target: "mesh_segment::graph",
        cached_groups = evaluator.cached_groups(),
        "Heaviest vertex groups computed"
    );

    Ok(SegmentGraph {
        triangles,
        registry,
        stats,
    })
}
