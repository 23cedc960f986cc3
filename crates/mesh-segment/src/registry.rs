//! Arena of segments and contacts.
//!
//! Segments and contacts refer to each other only by id; the registry owns
//! both tables. Invariants kept at every public method boundary:
//!
//! - a live contact joins two distinct live segments and is listed in both
//!   segments' contact sets
//! - no two live contacts join the same unordered pair of segments, once
//!   [`SegmentRegistry::merge`] has returned
//! - finalized segments have no contacts and are never merged again

use hashbrown::{HashMap, HashSet};
use tracing::trace;

use crate::error::{SegmentError, SegmentOpResult};
use crate::types::{ContactId, Segment, SegmentContact, SegmentId, Triangle, normalized_cost};

/// Contacts affected by a merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Contacts deleted: borders between the two merged segments, and
    /// parallel contacts folded into a survivor.
    pub removed: Vec<ContactId>,
    /// Surviving contacts whose cost changed through coalescing.
    pub updated: Vec<ContactId>,
}

/// Owning table of all segments and contacts of a run.
#[derive(Debug)]
pub struct SegmentRegistry {
    segments: HashMap<SegmentId, Segment>,
    finished: Vec<Segment>,
    contacts: HashMap<ContactId, SegmentContact>,
    next_segment: u32,
    next_contact: u32,
    length_factor: f64,
}

impl SegmentRegistry {
    /// Create an empty registry normalizing contact costs with `length_factor`.
    pub fn new(length_factor: f64) -> Self {
        Self {
            segments: HashMap::new(),
            finished: Vec::new(),
            contacts: HashMap::new(),
            next_segment: 0,
            next_contact: 0,
            length_factor: if length_factor.is_finite() {
                length_factor.max(0.0)
            } else {
                0.0
            },
        }
    }

    pub fn length_factor(&self) -> f64 {
        self.length_factor
    }

    /// Create a single-triangle segment.
    pub fn create_segment(&mut self, triangle: &Triangle) -> SegmentId {
        let id = SegmentId(self.next_segment);
        self.next_segment += 1;
        self.segments.insert(id, Segment::from_triangle(id, triangle));
        id
    }

    /// Create a contact between two distinct live segments.
    pub fn add_contact(
        &mut self,
        segment0: SegmentId,
        segment1: SegmentId,
        raw_cost: f64,
        length: f64,
    ) -> SegmentOpResult<ContactId> {
        if segment0 == segment1 {
            return Err(SegmentError::invalid_state(format!(
                "contact from {} to itself",
                segment0
            )));
        }
        self.live_segment(segment0)?;
        self.live_segment(segment1)?;

        let id = ContactId(self.next_contact);
        self.next_contact += 1;
        let raw_cost = raw_cost.max(0.0);
        let length = length.max(0.0);
        self.contacts.insert(
            id,
            SegmentContact {
                id,
                raw_cost,
                normalized_cost: normalized_cost(raw_cost, length, self.length_factor),
                length,
                segment0,
                segment1,
            },
        );
        for seg in [segment0, segment1] {
            if let Some(segment) = self.segments.get_mut(&seg) {
                segment.contacts.insert(id);
            }
        }
        Ok(id)
    }

    /// A live (active) segment.
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(&id)
    }

    /// A live contact.
    pub fn contact(&self, id: ContactId) -> Option<&SegmentContact> {
        self.contacts.get(&id)
    }

    fn live_segment(&self, id: SegmentId) -> SegmentOpResult<&Segment> {
        self.segments
            .get(&id)
            .ok_or_else(|| SegmentError::invalid_state(format!("segment {} is not live", id)))
    }

    /// Detach a contact from both endpoints and delete it.
    pub fn remove_contact(&mut self, id: ContactId) -> SegmentOpResult<SegmentContact> {
        let contact = self
            .contacts
            .remove(&id)
            .ok_or_else(|| SegmentError::invalid_state(format!("contact {} is not live", id)))?;
        for seg in [contact.segment0, contact.segment1] {
            if let Some(segment) = self.segments.get_mut(&seg) {
                segment.contacts.remove(&id);
            }
        }
        Ok(contact)
    }

    /// Merge `src` into `dst`.
    ///
    /// Moves triangles and area, points `src`'s contacts at `dst`, deletes the
    /// contacts that joined the two, and coalesces the parallel contacts this
    /// creates. `src` is removed from the registry.
    pub fn merge(&mut self, dst: SegmentId, src: SegmentId) -> SegmentOpResult<MergeOutcome> {
        if dst == src {
            return Err(SegmentError::invalid_state(format!(
                "merge of segment {} into itself",
                dst
            )));
        }
        self.live_segment(dst)?;
        let src_segment = self
            .segments
            .remove(&src)
            .ok_or_else(|| SegmentError::invalid_state(format!("segment {} is not live", src)))?;
        let Some(dst_segment) = self.segments.get_mut(&dst) else {
            return Err(SegmentError::invalid_state(format!("segment {} is not live", dst)));
        };

        dst_segment.area += src_segment.area;
        dst_segment.triangles.extend(src_segment.triangles);

        let mut outcome = MergeOutcome::default();
        for cid in src_segment.contacts {
            let Some(contact) = self.contacts.get_mut(&cid) else {
                return Err(SegmentError::invalid_state(format!(
                    "segment {} lists dead contact {}",
                    src, cid
                )));
            };
            if contact.segment0 == src {
                contact.segment0 = dst;
            }
            if contact.segment1 == src {
                contact.segment1 = dst;
            }
            if contact.is_self_contact() {
                self.contacts.remove(&cid);
                dst_segment.contacts.remove(&cid);
                outcome.removed.push(cid);
            } else {
                dst_segment.contacts.insert(cid);
            }
        }

        let coalesced = self.coalesce(dst)?;
        outcome.removed.extend(coalesced.removed);
        outcome.updated.extend(coalesced.updated);

        trace!(
            target: "mesh_segment::registry",
            dst = dst.0,
            src = src.0,
            removed = outcome.removed.len(),
            updated = outcome.updated.len(),
            "Merged segments"
        );
        Ok(outcome)
    }

    /// Fold parallel contacts of `segment` into one contact per neighbor.
    ///
    /// The lowest contact id of each parallel group survives and receives the
    /// summed raw cost and length of the group.
    pub fn coalesce(&mut self, segment: SegmentId) -> SegmentOpResult<MergeOutcome> {
        let mut by_neighbor: HashMap<SegmentId, Vec<ContactId>> = HashMap::new();
        for &cid in &self.live_segment(segment)?.contacts {
            let neighbor = self
                .contacts
                .get(&cid)
                .and_then(|c| c.other(segment))
                .ok_or_else(|| {
                    SegmentError::invalid_state(format!(
                        "segment {} lists contact {} that does not reach it",
                        segment, cid
                    ))
                })?;
            by_neighbor.entry(neighbor).or_default().push(cid);
        }

        let mut outcome = MergeOutcome::default();
        let mut groups: Vec<Vec<ContactId>> =
            by_neighbor.into_values().filter(|ids| ids.len() > 1).collect();
        groups.sort_unstable();
        for mut ids in groups {
            ids.sort_unstable();
            let survivor = ids[0];
            let (mut raw, mut length) = (0.0, 0.0);
            for &cid in &ids[1..] {
                let removed = self.remove_contact(cid)?;
                raw += removed.raw_cost;
                length += removed.length;
                outcome.removed.push(cid);
            }
            let length_factor = self.length_factor;
            let Some(contact) = self.contacts.get_mut(&survivor) else {
                return Err(SegmentError::invalid_state(format!(
                    "contact {} vanished while coalescing",
                    survivor
                )));
            };
            contact.raw_cost += raw;
            contact.length += length;
            contact.normalized_cost =
                normalized_cost(contact.raw_cost, contact.length, length_factor);
            outcome.updated.push(survivor);
        }
        Ok(outcome)
    }

    /// Move a segment without contacts out of the active pool.
    pub fn finalize(&mut self, id: SegmentId) -> SegmentOpResult<()> {
        if !self.live_segment(id)?.is_isolated() {
            return Err(SegmentError::invalid_state(format!(
                "segment {} still has contacts",
                id
            )));
        }
        if let Some(segment) = self.segments.remove(&id) {
            self.finished.push(segment);
        }
        Ok(())
    }

    /// Segments that may still merge.
    pub fn active_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    /// Segments that can no longer merge.
    pub fn finished_segments(&self) -> &[Segment] {
        &self.finished
    }

    pub fn contacts(&self) -> impl Iterator<Item = &SegmentContact> {
        self.contacts.values()
    }

    pub fn active_count(&self) -> usize {
        self.segments.len()
    }

    pub fn finished_count(&self) -> usize {
        self.finished.len()
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// All segments, active and finished, in ascending id order, plus the
    /// remaining contacts.
    pub fn into_parts(self) -> (Vec<Segment>, HashMap<ContactId, SegmentContact>) {
        let mut segments: Vec<Segment> = self.finished;
        segments.extend(self.segments.into_values());
        segments.sort_unstable_by_key(|s| s.id);
        (segments, self.contacts)
    }

    /// Verify the contact invariants. Used by tests and debug builds.
    pub fn check_invariants(&self) -> SegmentOpResult<()> {
        let mut pairs = HashSet::new();
        for contact in self.contacts.values() {
            if contact.is_self_contact() {
                return Err(SegmentError::invalid_state(format!(
                    "contact {} is a self-contact",
                    contact.id
                )));
            }
            for seg in [contact.segment0, contact.segment1] {
                let listed = self
                    .segments
                    .get(&seg)
                    .is_some_and(|s| s.contacts.contains(&contact.id));
                if !listed {
                    return Err(SegmentError::invalid_state(format!(
                        "contact {} is not listed by segment {}",
                        contact.id, seg
                    )));
                }
            }
            let pair = if contact.segment0 < contact.segment1 {
                (contact.segment0, contact.segment1)
            } else {
                (contact.segment1, contact.segment0)
            };
            if !pairs.insert(pair) {
                return Err(SegmentError::invalid_state(format!(
                    "parallel contacts between {} and {}",
                    pair.0, pair.1
                )));
            }
        }
        for segment in self.segments.values() {
            if let Some(cid) = segment.contacts.iter().find(|c| !self.contacts.contains_key(*c)) {
                return Err(SegmentError::invalid_state(format!(
                    "segment {} lists dead contact {}",
                    segment.id, cid
                )));
            }
        }
        if let Some(segment) = self.finished.iter().find(|s| !s.is_isolated()) {
            return Err(SegmentError::invalid_state(format!(
                "finished segment {} has contacts",
                segment.id
            )));
        }
        Ok(())
    }
}
