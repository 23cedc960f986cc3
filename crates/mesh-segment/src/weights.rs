//! Vertex group weights and per-triangle dominant groups.

use std::collections::BTreeSet;

use hashbrown::HashMap;

use crate::mesh::HostMesh;
use crate::types::{GroupId, Triangle, TriangleId};

/// Read-only `vertex -> (group -> weight)` table.
///
/// Groups listed in the ignore set are dropped when the table is built and
/// never take part in any cost.
#[derive(Debug, Clone, Default)]
pub struct VertexWeights {
    weights: HashMap<u32, HashMap<GroupId, f64>>,
}

impl VertexWeights {
    /// Collect the weights of the given vertices from a host mesh.
    pub fn from_host<M: HostMesh>(
        mesh: &M,
        vertices: impl IntoIterator<Item = u32>,
        ignore: &BTreeSet<GroupId>,
    ) -> Self {
        let mut weights = HashMap::new();
        for vertex in vertices {
            if weights.contains_key(&vertex) {
                continue;
            }
            let groups: HashMap<GroupId, f64> = mesh
                .vertex_groups(vertex)
                .filter(|(group, _)| !ignore.contains(group))
                .collect();
            if !groups.is_empty() {
                weights.insert(vertex, groups);
            }
        }
        Self { weights }
    }

    /// Weight of `group` on `vertex`, zero when absent.
    #[inline]
    pub fn weight(&self, vertex: u32, group: GroupId) -> f64 {
        self.weights
            .get(&vertex)
            .and_then(|groups| groups.get(&group))
            .copied()
            .unwrap_or(0.0)
    }

    /// Groups carried by a vertex.
    pub fn groups(&self, vertex: u32) -> impl Iterator<Item = (GroupId, f64)> + '_ {
        self.weights
            .get(&vertex)
            .into_iter()
            .flat_map(|groups| groups.iter().map(|(&g, &w)| (g, w)))
    }

    /// Per-group weight summed over the triangle's three vertices.
    pub fn triangle_sums(&self, triangle: &Triangle) -> HashMap<GroupId, f64> {
        let mut sums = HashMap::new();
        for &vertex in &triangle.vertices {
            for (group, weight) in self.groups(vertex) {
                *sums.entry(group).or_insert(0.0) += weight;
            }
        }
        sums
    }

    /// The group with the greatest summed weight over the triangle's vertices.
    ///
    /// Ties go to the lowest group id. `None` when no vertex carries a group.
    pub fn heaviest_group(&self, triangle: &Triangle) -> Option<GroupId> {
        self.triangle_sums(triangle)
            .into_iter()
            .max_by(|(ga, wa), (gb, wb)| wa.total_cmp(wb).then_with(|| gb.cmp(ga)))
            .map(|(group, _)| group)
    }

    /// Number of vertices carrying at least one group.
    pub fn weighted_vertex_count(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Lazily filled memo of each triangle's heaviest group.
#[derive(Debug, Default)]
pub struct HeaviestGroupCache {
    cache: HashMap<TriangleId, Option<GroupId>>,
}

impl HeaviestGroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Heaviest group of a triangle, computed on first request only.
    pub fn get(&mut self, triangle: &Triangle, weights: &VertexWeights) -> Option<GroupId> {
        *self
            .cache
            .entry(triangle.id)
            .or_insert_with(|| weights.heaviest_group(triangle))
    }

    /// Number of triangles computed so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
