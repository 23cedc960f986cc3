//! Greedy merge loop.
//!
//! Contacts are visited from the lowest normalized cost upwards. The first
//! acceptable contact is merged, the queue is brought up to date with the
//! registry, and the scan starts over from the lowest contact. A scan that
//! reaches a contact above the cost threshold (or runs out of contacts)
//! without accepting anything ends the run.
//!
//! A contact is acceptable when its cost is within the threshold and the
//! area rule allows it: the absorbed segment (`segment1`) is no larger than
//! the minimum area threshold, or the merged area stays within the maximum.
//!
//! # Example
//!
//! ```
//! use mesh_segment::{SegmentMesh, SegmentParams, segment_mesh};
//!
//! let mut mesh = SegmentMesh::plane_grid(2, 2, 1.0);
//! for face in 4..8 {
//!     mesh.set_material(face, 1);
//! }
//! let params = SegmentParams::default().with_area_thresholds(0.0, 100.0);
//! let result = segment_mesh(&mesh, &params).unwrap();
//! assert_eq!(result.segment_count(), 2);
//! ```

use hashbrown::HashSet;
use tracing::{debug, trace};

use crate::error::{SegmentError, SegmentOpResult};
use crate::graph::{SegmentGraph, build_graph};
use crate::mesh::HostMesh;
use crate::params::SegmentParams;
use crate::progress::{ProgressCallback, ProgressTracker};
use crate::queue::ContactQueue;
use crate::registry::SegmentRegistry;
use crate::result::SegmentResult;
use crate::tracing_ext::{OperationTimer, log_segmentation_result};
use crate::types::{ContactId, SegmentContact, SegmentId, Triangle};

/// Where the merge loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Looking for the lowest acceptable contact.
    Scanning,
    /// A contact was accepted and is about to be merged.
    Merging(ContactId),
    /// No acceptable contact remains, or the run was stopped.
    Finished,
}

/// Drives merges over a seeded registry.
#[derive(Debug)]
pub struct MergeEngine {
    registry: SegmentRegistry,
    queue: ContactQueue,
    state: EngineState,
    cost_threshold: f64,
    minimum_area: f64,
    maximum_area: f64,
    last_merged_cost: f64,
    merges_performed: usize,
    blocked: HashSet<ContactId>,
}

impl MergeEngine {
    /// Seed the queue with every live contact of `registry`.
    pub fn new(registry: SegmentRegistry, params: &SegmentParams) -> Self {
        let queue = ContactQueue::from_contacts(
            registry.contacts().map(|c| (c.id, c.normalized_cost)),
        );
        Self {
            registry,
            queue,
            state: EngineState::Scanning,
            cost_threshold: params.cost_threshold,
            minimum_area: params.minimum_area_threshold,
            maximum_area: params.maximum_area_threshold,
            last_merged_cost: 0.0,
            merges_performed: 0,
            blocked: HashSet::new(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn registry(&self) -> &SegmentRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &ContactQueue {
        &self.queue
    }

    pub fn merges_performed(&self) -> usize {
        self.merges_performed
    }

    pub fn last_merged_cost(&self) -> f64 {
        self.last_merged_cost
    }

    /// Stop the run at the current stable point.
    pub fn finish(&mut self) {
        self.state = EngineState::Finished;
    }

    /// Advance by one state transition and return the new state.
    pub fn step(&mut self) -> SegmentOpResult<EngineState> {
        self.state = match self.state {
            EngineState::Scanning => match self.scan()? {
                Some(contact) => EngineState::Merging(contact),
                None => EngineState::Finished,
            },
            EngineState::Merging(contact) => {
                self.merge(contact)?;
                EngineState::Scanning
            }
            EngineState::Finished => EngineState::Finished,
        };
        Ok(self.state)
    }

    /// Step until the next merge has been applied or the run is finished.
    ///
    /// Returns `false` once finished.
    pub fn merge_next(&mut self) -> SegmentOpResult<bool> {
        loop {
            match self.step()? {
                EngineState::Scanning => return Ok(true),
                EngineState::Finished => return Ok(false),
                EngineState::Merging(_) => {}
            }
        }
    }

    /// Whether the area rule lets `src` be absorbed into `dst`.
    fn area_allows(&self, dst: SegmentId, src: SegmentId) -> SegmentOpResult<bool> {
        let dst_area = self.live_area(dst)?;
        let src_area = self.live_area(src)?;
        Ok(!(src_area > self.minimum_area && dst_area + src_area > self.maximum_area))
    }

    fn live_area(&self, id: SegmentId) -> SegmentOpResult<f64> {
        self.registry
            .segment(id)
            .map(|s| s.area)
            .ok_or_else(|| SegmentError::invalid_state(format!("segment {} is not live", id)))
    }

    fn live_contact(&self, id: ContactId) -> SegmentOpResult<&SegmentContact> {
        self.registry
            .contact(id)
            .ok_or_else(|| {
                SegmentError::invalid_state(format!("queued contact {} is not live", id))
            })
    }

    /// Walk contacts from the lowest cost and return the first acceptable one.
    ///
    /// Contacts passed over are put back before returning, so the queue again
    /// holds every live contact except the returned one.
    fn scan(&mut self) -> SegmentOpResult<Option<ContactId>> {
        let mut passed = Vec::new();
        let mut accepted = None;
        while let Some((id, cost)) = self.queue.peek_lowest() {
            if cost > self.cost_threshold {
                break;
            }
            self.queue.pop_lowest();
            let contact = self.live_contact(id)?;
            let (dst, src) = (contact.segment0, contact.segment1);
            if self.area_allows(dst, src)? {
                accepted = Some(id);
                break;
            }
            if self.blocked.insert(id) {
                debug!(
                    target: "mesh_segment::engine",
                    contact = id.0,
                    cost,
                    dst = dst.0,
                    src = src.0,
                    "Contact blocked by area bounds"
                );
            }
            passed.push((id, cost));
        }
        for (id, cost) in passed {
            self.queue.insert(id, cost);
        }
        Ok(accepted)
    }

    /// Merge the two segments joined by `contact` and bring the queue up to
    /// date with the registry.
    fn merge(&mut self, contact: ContactId) -> SegmentOpResult<()> {
        let accepted = self.live_contact(contact)?;
        let (dst, src, cost) = (accepted.segment0, accepted.segment1, accepted.normalized_cost);

        let outcome = self.registry.merge(dst, src)?;
        for id in &outcome.removed {
            self.queue.remove(*id);
        }
        for &id in &outcome.updated {
            let cost = self.live_contact(id)?.normalized_cost;
            self.queue.update_and_reinsert(id, cost);
        }

        self.last_merged_cost = cost;
        self.merges_performed += 1;
        trace!(
            target: "mesh_segment::engine",
            contact = contact.0,
            cost,
            dst = dst.0,
            src = src.0,
            live_contacts = self.queue.len(),
            "Merged contact"
        );

        if self.registry.segment(dst).is_some_and(|s| s.is_isolated()) {
            self.registry.finalize(dst)?;
            trace!(target: "mesh_segment::engine", segment = dst.0, "Segment finished");
        }
        Ok(())
    }

    /// Assemble the result from the registry and the unmerged contacts.
    pub fn into_result(
        self,
        triangles: Vec<Triangle>,
        cancelled: bool,
    ) -> SegmentOpResult<SegmentResult> {
        #[cfg(debug_assertions)]
        self.registry.check_invariants()?;

        let area_blocked_contacts = self.blocked.len();
        let (segments, contacts) = self.registry.into_parts();
        let mut remaining_contacts: Vec<SegmentContact> = contacts.into_values().collect();
        remaining_contacts.sort_by(|a, b| {
            a.normalized_cost
                .total_cmp(&b.normalized_cost)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(SegmentResult {
            segments,
            remaining_contacts,
            last_merged_cost: self.last_merged_cost,
            triangles,
            merges_performed: self.merges_performed,
            area_blocked_contacts,
            cancelled,
        })
    }
}

/// Partition the eligible faces of `mesh` into segments.
///
/// # Errors
///
/// - [`SegmentError::InvalidParameter`] when `params` fails validation
/// - [`SegmentError::InvalidVertexIndex`] when a face references a missing vertex
/// - [`SegmentError::DegenerateInput`] when no face is eligible
/// - [`SegmentError::InvalidState`] on an internal bookkeeping failure
pub fn segment_mesh<M: HostMesh>(
    mesh: &M,
    params: &SegmentParams,
) -> SegmentOpResult<SegmentResult> {
    segment_mesh_with_progress(mesh, params, None)
}

/// Segment a mesh with progress reporting.
///
/// The callback receives the number of merges performed against the upper
/// bound of one merge per eligible triangle minus one. Returning `false`
/// stops the run after the current merge; the partial partition is returned
/// with [`SegmentResult::cancelled`] set.
///
/// # Example
///
/// ```
/// use mesh_segment::{SegmentMesh, SegmentParams, segment_mesh_with_progress};
/// use mesh_segment::progress::ProgressCallback;
///
/// let mesh = SegmentMesh::plane_grid(4, 4, 0.1);
/// let callback: ProgressCallback = Box::new(|progress| {
///     println!("{}% - {}", progress.percent(), progress.message);
///     true
/// });
/// let result =
///     segment_mesh_with_progress(&mesh, &SegmentParams::default(), Some(&callback)).unwrap();
/// assert!(!result.cancelled);
/// ```
pub fn segment_mesh_with_progress<M: HostMesh>(
    mesh: &M,
    params: &SegmentParams,
    callback: Option<&ProgressCallback>,
) -> SegmentOpResult<SegmentResult> {
    params.validate()?;
    let timer = OperationTimer::with_context("segment_mesh", mesh.face_count());
    let _guard = timer.span().enter();

    let SegmentGraph {
        triangles,
        registry,
        ..
    } = build_graph(mesh, params)?;

    let mut tracker = ProgressTracker::new(triangles.len().saturating_sub(1) as u64);
    let mut engine = MergeEngine::new(registry, params);
    let mut cancelled = false;

    loop {
        if params.max_merges.is_some_and(|max| engine.merges_performed() >= max) {
            debug!(
                target: "mesh_segment::engine",
                merges = engine.merges_performed(),
                "Merge limit reached"
            );
            engine.finish();
            break;
        }
        if !engine.merge_next()? {
            break;
        }

        tracker.increment();
        let (active, live) = (engine.registry().active_count(), engine.queue().len());
        if !tracker.maybe_callback(callback, || {
            format!("Segmenting: {} active segments, {} contacts", active, live)
        }) {
            debug!(
                target: "mesh_segment::engine",
                merges = engine.merges_performed(),
                "Segmentation cancelled"
            );
            engine.finish();
            cancelled = true;
            break;
        }
    }

    let result = engine.into_result(triangles, cancelled)?;
    log_segmentation_result(&result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::SegmentMesh;
    use crate::types::TriangleId;
    use nalgebra::Vector3;

    fn tri(id: u32, area: f64) -> Triangle {
        Triangle {
            id: TriangleId(id),
            vertices: [0, 1, 2],
            area,
            normal: Vector3::z(),
            material: 0,
        }
    }

    /// Three segments in a row: 0 -(c0)- 1 -(c1)- 2.
    fn chain(areas: [f64; 3], costs: [f64; 2]) -> SegmentRegistry {
        let mut reg = SegmentRegistry::new(0.0);
        let ids: Vec<_> = areas
            .iter()
            .enumerate()
            .map(|(i, &a)| reg.create_segment(&tri(i as u32, a)))
            .collect();
        reg.add_contact(ids[0], ids[1], costs[0], 1.0).unwrap();
        reg.add_contact(ids[1], ids[2], costs[1], 1.0).unwrap();
        reg
    }

    fn params(threshold: f64, min: f64, max: f64) -> SegmentParams {
        SegmentParams::default()
            .with_cost_threshold(threshold)
            .with_area_thresholds(min, max)
    }

    #[test]
    fn test_state_transitions() {
        let mut engine = MergeEngine::new(chain([1.0; 3], [0.1, 0.2]), &params(1.0, 0.0, 10.0));
        assert_eq!(engine.state(), EngineState::Scanning);
        assert_eq!(engine.step().unwrap(), EngineState::Merging(ContactId(0)));
        assert_eq!(engine.step().unwrap(), EngineState::Scanning);
        assert_eq!(engine.last_merged_cost(), 0.1);
        assert_eq!(engine.step().unwrap(), EngineState::Merging(ContactId(1)));
        assert_eq!(engine.step().unwrap(), EngineState::Scanning);
        assert_eq!(engine.step().unwrap(), EngineState::Finished);
        assert_eq!(engine.step().unwrap(), EngineState::Finished);
        assert_eq!(engine.merges_performed(), 2);
        assert_eq!(engine.registry().finished_count(), 1);
    }

    #[test]
    fn test_threshold_stops_scan() {
        let mut engine = MergeEngine::new(chain([1.0; 3], [0.1, 0.5]), &params(0.3, 0.0, 10.0));
        assert!(engine.merge_next().unwrap());
        assert!(!engine.merge_next().unwrap());
        let result = engine.into_result(Vec::new(), false).unwrap();
        assert_eq!(result.segment_count(), 2);
        assert_eq!(result.remaining_contacts.len(), 1);
        assert_eq!(result.remaining_contacts[0].normalized_cost, 0.5);
        assert_eq!(result.last_merged_cost, 0.1);
    }

    #[test]
    fn test_blocked_contact_is_skipped_not_dropped() {
        // c0 is cheaper but would exceed the cap; c1 joins a tiny segment.
        let mut engine =
            MergeEngine::new(chain([1.0, 1.0, 0.001], [0.1, 0.2]), &params(1.0, 0.01, 1.5));
        assert!(engine.merge_next().unwrap());
        assert_eq!(engine.last_merged_cost(), 0.2);
        assert!(engine.queue().contains(ContactId(0)));
        assert!(!engine.merge_next().unwrap());
        let result = engine.into_result(Vec::new(), false).unwrap();
        assert_eq!(result.segment_count(), 2);
        assert_eq!(result.area_blocked_contacts, 1);
        assert_eq!(result.remaining_contacts[0].id, ContactId(0));
    }

    #[test]
    fn test_small_source_ignores_maximum() {
        let mut engine =
            MergeEngine::new(chain([5.0, 0.005, 5.0], [0.1, 0.2]), &params(1.0, 0.01, 1.0));
        assert!(engine.merge_next().unwrap());
        // Segment 1 is now part of segment 0 (area 5.005) and no longer small.
        assert!(!engine.merge_next().unwrap());
        assert_eq!(engine.merges_performed(), 1);
    }

    #[test]
    fn test_equal_costs_merge_lowest_contact_first() {
        let mut engine = MergeEngine::new(chain([1.0; 3], [0.0, 0.0]), &params(0.5, 0.0, 10.0));
        assert_eq!(engine.step().unwrap(), EngineState::Merging(ContactId(0)));
    }

    #[test]
    fn test_segment_mesh_single_quad() {
        let mesh = SegmentMesh::plane_grid(1, 1, 0.5);
        let result = segment_mesh(&mesh, &SegmentParams::default()).unwrap();
        assert_eq!(result.segment_count(), 1);
        assert_eq!(result.merges_performed, 1);
        assert_eq!(result.last_merged_cost, 0.0);
        assert!(result.remaining_contacts.is_empty());
        assert!(!result.cancelled);
    }

    #[test]
    fn test_max_merges_zero_keeps_triangles() {
        let mesh = SegmentMesh::plane_grid(2, 2, 0.1);
        let params = SegmentParams::default().with_max_merges(0);
        let result = segment_mesh(&mesh, &params).unwrap();
        assert_eq!(result.segment_count(), 8);
        assert_eq!(result.remaining_contacts.len(), 8);
        assert!(!result.cancelled);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mesh = SegmentMesh::plane_grid(1, 1, 1.0);
        let params = SegmentParams::default().with_cost_threshold(f64::NAN);
        let err = segment_mesh(&mesh, &params).unwrap_err();
        assert!(matches!(err, SegmentError::InvalidParameter { .. }));
    }
}
