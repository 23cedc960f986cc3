//! Border cost between two adjacent triangles.
//!
//! Six independent terms are measured along the shared edge, each scaled by
//! the edge length so costs of different borders add up:
//!
//! | term | per unit length |
//! |------|-----------------|
//! | face angle | `angle(n0, n1) * 2/π` (0 coplanar, 1 perpendicular) |
//! | material change | 1 if the materials differ |
//! | vertex group weight | `0.25 * Σ_g abs(w_a(g) - w_b(g))` |
//! | vertex group change | 1 if the heaviest groups differ |
//! | edge sharp | 1 if the edge is flat-shaded |
//! | edge seam | 1 if the edge is a UV seam |
//!
//! The raw cost is the factor-weighted sum of the terms.

use std::collections::BTreeSet;
use std::f64::consts::FRAC_2_PI;

use nalgebra::Vector3;

use crate::params::SegmentParams;
use crate::types::{GroupId, Triangle};
use crate::weights::{HeaviestGroupCache, VertexWeights};

/// Weights applied to the six cost terms.
///
/// Negative and non-finite factors are treated as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CostFactors {
    pub face_angle: f64,
    pub vertex_group_weight: f64,
    pub vertex_group_change: f64,
    pub material_change: f64,
    pub edge_sharp: f64,
    pub edge_seam: f64,
}

impl CostFactors {
    /// Extract the factors from segmentation parameters.
    pub fn from_params(params: &SegmentParams) -> Self {
        Self {
            face_angle: params.face_angle_cost_factor,
            vertex_group_weight: params.vertex_group_weight_cost_factor,
            vertex_group_change: params.vertex_group_change_cost_factor,
            material_change: params.material_change_cost_factor,
            edge_sharp: params.edge_sharp_cost_factor,
            edge_seam: params.edge_seam_cost_factor,
        }
        .sanitized()
    }

    fn sanitized(self) -> Self {
        let clamp = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        Self {
            face_angle: clamp(self.face_angle),
            vertex_group_weight: clamp(self.vertex_group_weight),
            vertex_group_change: clamp(self.vertex_group_change),
            material_change: clamp(self.material_change),
            edge_sharp: clamp(self.edge_sharp),
            edge_seam: clamp(self.edge_seam),
        }
    }

    /// Whether any vertex-group term can be non-zero.
    pub fn uses_vertex_groups(&self) -> bool {
        self.vertex_group_weight > 0.0 || self.vertex_group_change > 0.0
    }
}

/// Shading flags of the shared edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeFlags {
    pub smooth: bool,
    pub seam: bool,
}

impl Default for EdgeFlags {
    fn default() -> Self {
        Self {
            smooth: true,
            seam: false,
        }
    }
}

/// The six unweighted, length-scaled cost terms of one border.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CostTerms {
    pub face_angle: f64,
    pub material_change: f64,
    pub vertex_group_weight: f64,
    pub vertex_group_change: f64,
    pub edge_sharp: f64,
    pub edge_seam: f64,
}

impl CostTerms {
    /// Factor-weighted sum of the terms.
    pub fn weighted(&self, factors: &CostFactors) -> f64 {
        let raw = factors.face_angle * self.face_angle
            + factors.material_change * self.material_change
            + factors.vertex_group_weight * self.vertex_group_weight
            + factors.vertex_group_change * self.vertex_group_change
            + factors.edge_sharp * self.edge_sharp
            + factors.edge_seam * self.edge_seam;
        raw.max(0.0)
    }
}

/// Angle between two normals in radians; zero if either is degenerate.
pub fn angle_between(n0: &Vector3<f64>, n1: &Vector3<f64>) -> f64 {
    let len = n0.norm() * n1.norm();
    if len <= f64::EPSILON {
        return 0.0;
    }
    (n0.dot(n1) / len).clamp(-1.0, 1.0).acos()
}

/// Computes border costs for one segmentation run.
///
/// Owns the vertex weights and the heaviest-group memo so each triangle's
/// dominant group is computed at most once per run.
#[derive(Debug)]
pub struct CostEvaluator {
    factors: CostFactors,
    weights: VertexWeights,
    heaviest: HeaviestGroupCache,
}

impl CostEvaluator {
    pub fn new(factors: CostFactors, weights: VertexWeights) -> Self {
        Self {
            factors,
            weights,
            heaviest: HeaviestGroupCache::new(),
        }
    }

    pub fn factors(&self) -> &CostFactors {
        &self.factors
    }

    pub fn weights(&self) -> &VertexWeights {
        &self.weights
    }

    /// Triangles whose heaviest group has been computed.
    pub fn cached_groups(&self) -> usize {
        self.heaviest.len()
    }

    /// Unweighted terms of the border `edge` (length `length`) between two
    /// triangles.
    pub fn terms(
        &mut self,
        a: &Triangle,
        b: &Triangle,
        edge: (u32, u32),
        length: f64,
        flags: EdgeFlags,
    ) -> CostTerms {
        let length = length.max(0.0);
        if length == 0.0 {
            return CostTerms::default();
        }

        let (vertex_group_weight, vertex_group_change) = if self.factors.uses_vertex_groups() {
            (
                length * 0.25 * self.weight_difference(a, b, edge),
                if self.heaviest.get(a, &self.weights) == self.heaviest.get(b, &self.weights) {
                    0.0
                } else {
                    length
                },
            )
        } else {
            (0.0, 0.0)
        };

        CostTerms {
            face_angle: length * FRAC_2_PI * angle_between(&a.normal, &b.normal),
            material_change: if a.material == b.material { 0.0 } else { length },
            vertex_group_weight,
            vertex_group_change,
            edge_sharp: if flags.smooth { 0.0 } else { length },
            edge_seam: if flags.seam { length } else { 0.0 },
        }
    }

    /// Weighted raw cost of a border.
    pub fn raw_cost(
        &mut self,
        a: &Triangle,
        b: &Triangle,
        edge: (u32, u32),
        length: f64,
        flags: EdgeFlags,
    ) -> f64 {
        self.terms(a, b, edge, length, flags).weighted(&self.factors)
    }

    /// `Σ_g |w_a(g) - w_b(g)|` where `w_t(g)` sums `g` over the triangle's
    /// non-shared vertex and the two shared-edge vertices.
    fn weight_difference(&self, a: &Triangle, b: &Triangle, edge: (u32, u32)) -> f64 {
        let side = |tri: &Triangle| {
            let mut verts = vec![edge.0, edge.1];
            verts.extend(tri.opposite_vertex(edge));
            verts
        };
        let side_a = side(a);
        let side_b = side(b);

        // Ordered so the sum does not depend on hash order.
        let groups: BTreeSet<GroupId> = side_a
            .iter()
            .chain(side_b.iter())
            .flat_map(|&v| self.weights.groups(v).map(|(g, _)| g))
            .collect();

        groups
            .into_iter()
            .map(|g| {
                let wa: f64 = side_a.iter().map(|&v| self.weights.weight(v, g)).sum();
                let wb: f64 = side_b.iter().map(|&v| self.weights.weight(v, g)).sum();
                (wa - wb).abs()
            })
            .sum()
    }
}
