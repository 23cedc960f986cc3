//! Tracing helpers for segmentation runs.
//!
//! The library only emits events; install a subscriber in your application
//! to see them:
//!
//! ```rust,ignore
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//! // RUST_LOG=mesh_segment=debug for graph and engine summaries
//! // RUST_LOG=mesh_segment::engine=trace for every merge decision
//! ```
//!
//! # Targets
//!
//! - `mesh_segment::graph`: graph build summary
//! - `mesh_segment::engine`: merge decisions and run summary
//! - `mesh_segment::registry`: per-merge contact bookkeeping
//! - `mesh_segment::progress`: progress callbacks
//! - `mesh_segment::timing`: operation timing

use std::time::Instant;

use tracing::{Span, debug, info};

use crate::graph::GraphStats;
use crate::result::SegmentResult;

/// A performance timer that logs duration on drop.
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    /// Create a new operation timer.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("segment_operation", operation = name);
        debug!(target: "mesh_segment::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Create a timer recording the size of the input.
    pub fn with_context(name: &'static str, face_count: usize) -> Self {
        let span = tracing::info_span!("segment_operation", operation = name, faces = face_count);
        debug!(
            target: "mesh_segment::timing",
            operation = name,
            faces = face_count,
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Get the elapsed time.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Get the span for this timer.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        info!(
            target: "mesh_segment::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", self.elapsed_ms()),
            "Operation completed"
        );
    }
}

/// Log graph build statistics at debug level.
pub fn log_graph_stats(stats: &GraphStats) {
    debug!(
        target: "mesh_segment::graph",
        faces = stats.face_count,
        eligible = stats.eligible_triangles,
        contacts = stats.contacts,
        boundary_edges = stats.boundary_edges,
        non_manifold_edges = stats.non_manifold_edges,
        isolated = stats.isolated_triangles,
        "Built segmentation graph"
    );
}

/// Log the outcome of a segmentation run at info level.
pub fn log_segmentation_result(result: &SegmentResult) {
    info!(
        target: "mesh_segment::engine",
        triangles = result.triangles.len(),
        segments = result.segment_count(),
        merges = result.merges_performed,
        remaining_contacts = result.remaining_contacts.len(),
        last_merged_cost = result.last_merged_cost,
        cancelled = result.cancelled,
        "Segmentation completed"
    );
}
