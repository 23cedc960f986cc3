//! The outcome of a segmentation run.

use hashbrown::HashMap;

use crate::types::{Segment, SegmentContact, SegmentId, Triangle, TriangleId};

/// Final partition of the eligible triangles.
#[derive(Debug, Clone)]
pub struct SegmentResult {
    /// Final segments in ascending id order.
    pub segments: Vec<Segment>,
    /// Contacts that were never merged, by ascending normalized cost (ties by
    /// contact id).
    pub remaining_contacts: Vec<SegmentContact>,
    /// Normalized cost of the last accepted merge; 0 when nothing merged.
    pub last_merged_cost: f64,
    /// Every eligible input triangle.
    pub triangles: Vec<Triangle>,
    /// Number of accepted merges.
    pub merges_performed: usize,
    /// Contacts passed over at least once because of the area bounds.
    pub area_blocked_contacts: usize,
    /// Whether the run stopped early on request of a progress callback.
    pub cancelled: bool,
}

impl SegmentResult {
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Look up a final segment by id.
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments
            .binary_search_by_key(&id, |s| s.id)
            .ok()
            .map(|index| &self.segments[index])
    }

    /// The segment containing a triangle.
    pub fn segment_of(&self, triangle: TriangleId) -> Option<SegmentId> {
        self.segments
            .iter()
            .find(|s| s.triangles.contains(&triangle))
            .map(|s| s.id)
    }

    /// Map from every triangle to its segment.
    pub fn triangle_segment_map(&self) -> HashMap<TriangleId, SegmentId> {
        self.segments
            .iter()
            .flat_map(|s| s.triangles.iter().map(move |&t| (t, s.id)))
            .collect()
    }

    /// The segment with the greatest area.
    pub fn largest_segment(&self) -> Option<&Segment> {
        self.segments.iter().max_by(|a, b| a.area.total_cmp(&b.area))
    }

    /// Sum of all segment areas.
    pub fn total_area(&self) -> f64 {
        self.segments.iter().map(|s| s.area).sum()
    }
}

impl std::fmt::Display for SegmentResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Segmentation:")?;
        writeln!(f, "  Triangles: {}", self.triangles.len())?;
        writeln!(f, "  Segments: {}", self.segment_count())?;
        writeln!(f, "  Merges: {}", self.merges_performed)?;
        writeln!(f, "  Remaining contacts: {}", self.remaining_contacts.len())?;
        writeln!(f, "  Last merged cost: {:.4}", self.last_merged_cost)?;
        if let Some(largest) = self.largest_segment() {
            writeln!(
                f,
                "  Largest segment: {} triangles, area {:.4}",
                largest.triangle_count(),
                largest.area
            )?;
        }
        if self.cancelled {
            writeln!(f, "  (cancelled before completion)")?;
        }
        Ok(())
    }
}
