//! End-to-end segmentation scenarios.
//!
//! Each test builds a small mesh with a known structure and checks the
//! partition the merge loop produces for it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hashbrown::HashSet;
use mesh_segment::progress::ProgressCallback;
use mesh_segment::{
    ErrorCode, HostMesh, SegmentError, SegmentMesh, SegmentParams, SegmentResult, TriangleId,
    segment_mesh, segment_mesh_with_progress,
};
use nalgebra::Point3;

// =============================================================================
// Helpers
// =============================================================================

/// Parameters with an area cap no test mesh reaches.
fn uncapped() -> SegmentParams {
    SegmentParams::default().with_area_thresholds(0.0, 1.0e6)
}

/// Every triangle is in exactly one segment, and segment areas add up.
fn assert_valid_partition(result: &SegmentResult) {
    let mut seen = HashSet::new();
    for segment in &result.segments {
        for &t in &segment.triangles {
            assert!(seen.insert(t), "triangle {} is in more than one segment", t);
        }
        let area: f64 = result
            .triangles
            .iter()
            .filter(|t| segment.triangles.contains(&t.id))
            .map(|t| t.area)
            .sum();
        assert!(
            (segment.area - area).abs() < 1e-9,
            "segment {} area {} != triangle sum {}",
            segment.id,
            segment.area,
            area
        );
    }
    assert_eq!(seen.len(), result.triangles.len());
    assert!(result.triangles.iter().all(|t| seen.contains(&t.id)));

    for pair in result.remaining_contacts.windows(2) {
        assert!(pair[0].normalized_cost <= pair[1].normalized_cost);
    }
}

/// Every segment of `low` lies inside a single segment of `high`.
fn assert_refines(low: &SegmentResult, high: &SegmentResult) {
    let map = high.triangle_segment_map();
    for segment in &low.segments {
        let owners: HashSet<_> = segment.triangles.iter().map(|t| map[t]).collect();
        assert_eq!(owners.len(), 1, "segment {} is split across {:?}", segment.id, owners);
    }
}

fn mark_all_sharp(mesh: &mut SegmentMesh) {
    for [a, b, c] in mesh.faces.clone() {
        mesh.mark_sharp(a, b);
        mesh.mark_sharp(b, c);
        mesh.mark_sharp(c, a);
    }
}

// =============================================================================
// Grid scenarios
// =============================================================================

#[test]
fn test_material_isolation() {
    // 4x4 grid, lower two rows material 0, upper two rows material 1.
    let mut mesh = SegmentMesh::plane_grid(4, 4, 0.1);
    for face in 16..32 {
        mesh.set_material(face, 1);
    }

    let result = segment_mesh(&mesh, &SegmentParams::default()).unwrap();
    assert_eq!(result.triangles.len(), 32);
    assert_eq!(result.segment_count(), 2);
    assert_valid_partition(&result);

    for segment in &result.segments {
        assert_eq!(segment.triangle_count(), 16);
        let materials: HashSet<u32> = result
            .triangles
            .iter()
            .filter(|t| segment.triangles.contains(&t.id))
            .map(|t| t.material)
            .collect();
        assert_eq!(materials.len(), 1);
    }

    // The two halves touch along four cells' worth of edges.
    assert_eq!(result.remaining_contacts.len(), 1);
    assert!((result.remaining_contacts[0].normalized_cost - 1.0).abs() < 1e-12);
    assert!((result.remaining_contacts[0].length - 0.4).abs() < 1e-12);
}

#[test]
fn test_full_coalescing() {
    let mesh = SegmentMesh::plane_grid(4, 4, 0.1);
    let result = segment_mesh(&mesh, &SegmentParams::default()).unwrap();

    assert_eq!(result.segment_count(), 1);
    assert_eq!(result.segments[0].triangle_count(), 32);
    assert!((result.segments[0].area - 0.16).abs() < 1e-12);
    assert_eq!(result.last_merged_cost, 0.0);
    assert_eq!(result.merges_performed, 31);
    assert!(result.remaining_contacts.is_empty());
    assert_valid_partition(&result);
}

#[test]
fn test_area_cap() {
    // Strip of unit right triangles (area 0.5), cap of two triangle areas.
    let mesh = SegmentMesh::plane_grid(4, 1, 1.0);
    let params = SegmentParams::default().with_area_thresholds(0.0, 1.0);
    let result = segment_mesh(&mesh, &params).unwrap();

    assert_valid_partition(&result);
    assert!(result.segment_count() >= 4);
    for segment in &result.segments {
        assert!(segment.triangle_count() <= 2);
        assert!(segment.area <= 1.0 + 1e-12);
    }
    assert!(result.area_blocked_contacts > 0);
}

#[test]
fn test_small_segments_ignore_area_cap() {
    // Every triangle is below the minimum, so the cap never applies.
    let mesh = SegmentMesh::plane_grid(4, 1, 1.0);
    let params = SegmentParams::default().with_area_thresholds(0.6, 0.6);
    let result = segment_mesh(&mesh, &params).unwrap();

    assert_valid_partition(&result);
    assert!(result.segment_count() < 8);
}

#[test]
fn test_zero_threshold_is_identity() {
    let mut mesh = SegmentMesh::plane_grid(3, 3, 1.0);
    mark_all_sharp(&mut mesh);
    let params = uncapped().with_cost_threshold(0.0);
    let result = segment_mesh(&mesh, &params).unwrap();

    assert_eq!(result.segment_count(), 18);
    assert_eq!(result.merges_performed, 0);
    assert_eq!(result.last_merged_cost, 0.0);
    assert!(result.segments.iter().all(|s| s.triangle_count() == 1));
    assert_valid_partition(&result);
}

#[test]
fn test_threshold_monotonicity_on_mixed_grid() {
    let mut mesh = SegmentMesh::plane_grid(4, 4, 0.1);
    for face in (0..32).filter(|f| f % 3 == 0) {
        mesh.set_material(face, 1);
    }
    mesh.mark_sharp(6, 12);
    mesh.mark_seam(12, 18);

    let mut previous: Option<SegmentResult> = None;
    for threshold in [0.0, 0.2, 0.5, 1.0, 1.5, 3.0] {
        let params = SegmentParams::default().with_cost_threshold(threshold);
        let result = segment_mesh(&mesh, &params).unwrap();
        assert_valid_partition(&result);
        if let Some(lower) = &previous {
            assert!(
                result.segment_count() <= lower.segment_count(),
                "threshold {} produced {} segments, more than {}",
                threshold,
                result.segment_count(),
                lower.segment_count()
            );
            assert_refines(lower, &result);
        }
        previous = Some(result);
    }
}

#[test]
fn test_infinite_area_cap_never_blocks() {
    let mesh = SegmentMesh::plane_grid(2, 2, 1.0);
    let params = SegmentParams::default().with_area_thresholds(0.0, f64::INFINITY);
    let result = segment_mesh(&mesh, &params).unwrap();
    assert_valid_partition(&result);
    assert_eq!(result.segment_count(), 1);
    assert_eq!(result.area_blocked_contacts, 0);
    assert!(result.remaining_contacts.is_empty());

    let params = params.with_cost_threshold(f64::INFINITY);
    let mut mesh = mesh;
    mark_all_sharp(&mut mesh);
    let result = segment_mesh(&mesh, &params).unwrap();
    assert_eq!(result.segment_count(), 1);
    assert!(result.last_merged_cost.is_finite());
}

// =============================================================================
// Cost factor scenarios
// =============================================================================

#[test]
fn test_fold_splits_on_face_angle() {
    let mut mesh = SegmentMesh::new();
    mesh.add_vertex(0.0, 0.0, 0.0);
    mesh.add_vertex(1.0, 0.0, 0.0);
    mesh.add_vertex(1.0, 1.0, 0.0);
    mesh.add_vertex(0.0, 1.0, 0.0);
    mesh.add_vertex(1.0, 0.0, 1.0);
    mesh.add_vertex(0.0, 0.0, 1.0);
    // Floor
    mesh.add_face([0, 1, 2]);
    mesh.add_face([0, 2, 3]);
    // Wall at right angles, hinged on edge 0-1
    mesh.add_face([1, 0, 5]);
    mesh.add_face([1, 5, 4]);

    let result = segment_mesh(&mesh, &uncapped()).unwrap();
    assert_eq!(result.segment_count(), 2);
    assert_eq!(result.segment_of(TriangleId(0)), result.segment_of(TriangleId(1)));
    assert_eq!(result.segment_of(TriangleId(2)), result.segment_of(TriangleId(3)));
    assert_ne!(result.segment_of(TriangleId(0)), result.segment_of(TriangleId(2)));
    // A right angle costs the full border length.
    assert!((result.remaining_contacts[0].normalized_cost - 1.0).abs() < 1e-9);
}

#[test]
fn test_seam_splits_quads() {
    // Two quads side by side; the edge 1-4 between them is a seam.
    let mut mesh = SegmentMesh::plane_grid(2, 1, 1.0);
    mesh.mark_seam(1, 4);
    let result = segment_mesh(&mesh, &uncapped()).unwrap();

    assert_eq!(result.segment_count(), 2);
    assert_eq!(result.segment_of(TriangleId(0)), result.segment_of(TriangleId(1)));
    assert_eq!(result.segment_of(TriangleId(2)), result.segment_of(TriangleId(3)));
}

/// Two quads; the left column of vertices in group 0, the right in group 1.
fn two_group_mesh() -> SegmentMesh {
    let mut mesh = SegmentMesh::plane_grid(2, 1, 1.0);
    for v in [0, 3] {
        mesh.set_vertex_weight(v, 0, 1.0);
    }
    for v in [2, 5] {
        mesh.set_vertex_weight(v, 1, 1.0);
    }
    mesh
}

fn group_change_only() -> SegmentParams {
    SegmentParams {
        vertex_group_change_cost_factor: 1.0,
        ..uncapped().without_cost_factors().with_cost_threshold(0.5)
    }
}

#[test]
fn test_vertex_group_change_splits() {
    let result = segment_mesh(&two_group_mesh(), &group_change_only()).unwrap();
    assert_eq!(result.segment_count(), 2);
    assert_eq!(result.segment_of(TriangleId(0)), result.segment_of(TriangleId(1)));
    assert_eq!(result.segment_of(TriangleId(2)), result.segment_of(TriangleId(3)));
}

#[test]
fn test_ignored_vertex_groups_do_not_split() {
    let params = group_change_only().ignore_vertex_group(0).ignore_vertex_group(1);
    let result = segment_mesh(&two_group_mesh(), &params).unwrap();
    assert_eq!(result.segment_count(), 1);
}

// =============================================================================
// Eligibility and hosts
// =============================================================================

#[test]
fn test_unselected_faces_are_left_out() {
    let mut mesh = SegmentMesh::plane_grid(2, 2, 0.1);
    mesh.set_selected(0, false);
    mesh.set_selected(7, false);
    let result = segment_mesh(&mesh, &SegmentParams::default()).unwrap();

    assert_eq!(result.triangles.len(), 6);
    assert!(result.segment_of(TriangleId(0)).is_none());
    assert!(result.segment_of(TriangleId(7)).is_none());
    let map = result.triangle_segment_map();
    assert_eq!(map.len(), 6);
    assert_valid_partition(&result);
}

#[test]
fn test_nothing_to_segment() {
    let err = segment_mesh(&SegmentMesh::new(), &SegmentParams::default()).unwrap_err();
    assert!(matches!(err, SegmentError::DegenerateInput { .. }));
    assert_eq!(err.code(), ErrorCode::DegenerateInput);
    assert!(err.is_recoverable());
}

#[test]
fn test_degenerate_triangles_add_nothing() {
    let mut mesh = SegmentMesh::plane_grid(1, 1, 1.0);
    // Sliver on edge 0-2 of face 1, all three corners collinear.
    let v = mesh.add_vertex(0.0, 0.5, 0.0);
    mesh.add_face([0, v, 2]);
    let result = segment_mesh(&mesh, &uncapped()).unwrap();

    assert_valid_partition(&result);
    let sliver = result.triangles.iter().find(|t| t.id == TriangleId(2)).unwrap();
    assert_eq!(sliver.area, 0.0);
    assert!((result.total_area() - 1.0).abs() < 1e-12);
}

/// A host exposing only the required accessors.
struct Fan {
    positions: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
}

impl HostMesh for Fan {
    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn face_vertices(&self, face: usize) -> [u32; 3] {
        self.faces[face]
    }

    fn vertex_position(&self, vertex: u32) -> Point3<f64> {
        self.positions[vertex as usize]
    }
}

#[test]
fn test_custom_host() {
    // Flat fan of six triangles around the origin.
    let mut positions = vec![Point3::origin()];
    for i in 0..6 {
        let angle = i as f64 * std::f64::consts::PI / 3.0;
        positions.push(Point3::new(0.1 * angle.cos(), 0.1 * angle.sin(), 0.0));
    }
    let faces = (0..6u32).map(|i| [0, 1 + i, 1 + (i + 1) % 6]).collect();
    let fan = Fan { positions, faces };

    let result = segment_mesh(&fan, &SegmentParams::default()).unwrap();
    assert_eq!(result.triangles.len(), 6);
    assert_eq!(result.segment_count(), 1);
    assert_valid_partition(&result);
}

// =============================================================================
// Bounded runs
// =============================================================================

#[test]
fn test_max_merges() {
    let mesh = SegmentMesh::plane_grid(4, 4, 0.1);
    let params = SegmentParams::default().with_max_merges(5);
    let result = segment_mesh(&mesh, &params).unwrap();

    assert_eq!(result.merges_performed, 5);
    assert_eq!(result.segment_count(), 27);
    assert!(!result.cancelled);
    assert_valid_partition(&result);
}

#[test]
fn test_cancellation_returns_valid_partition() {
    let mesh = SegmentMesh::plane_grid(4, 4, 0.1);
    let callback: ProgressCallback = Box::new(|_| false);
    let result =
        segment_mesh_with_progress(&mesh, &SegmentParams::default(), Some(&callback)).unwrap();

    assert!(result.cancelled);
    assert_eq!(result.merges_performed, 1);
    assert_eq!(result.segment_count(), 31);
    assert_valid_partition(&result);
}

#[test]
fn test_progress_reports_merge_bound() {
    let mesh = SegmentMesh::plane_grid(2, 2, 0.1);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let callback: ProgressCallback = Box::new(move |progress| {
        assert_eq!(progress.total, 7);
        assert!(progress.current >= 1);
        counter.fetch_add(1, Ordering::SeqCst);
        true
    });
    let result =
        segment_mesh_with_progress(&mesh, &SegmentParams::default(), Some(&callback)).unwrap();

    assert!(!result.cancelled);
    assert_eq!(result.segment_count(), 1);
    assert!(calls.load(Ordering::SeqCst) >= 1);
}

#[test]
fn test_display_summary() {
    let mesh = SegmentMesh::plane_grid(2, 2, 0.1);
    let result = segment_mesh(&mesh, &SegmentParams::default()).unwrap();
    let text = result.to_string();
    assert!(text.contains("Segments: 1"));
    assert!(text.contains("Triangles: 8"));
    assert!(!text.contains("cancelled"));
}
