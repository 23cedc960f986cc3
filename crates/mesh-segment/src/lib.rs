//! Greedy segmentation of triangle meshes.
//!
//! Partitions the eligible faces of a triangle mesh into disjoint segments by
//! repeatedly merging the cheapest pair of adjacent segments. The cost of a
//! border weighs six factors: face angle, vertex group weight difference,
//! dominant vertex group change, material change, flat-shaded edges and UV
//! seams. Area bounds keep segments from growing without limit.
//!
//! # Features
//!
//! - **Host meshes**: segment any mesh implementing [`HostMesh`], or build a
//!   [`SegmentMesh`] directly
//! - **Cost model**: six independently weighted factors, normalized by border
//!   length
//! - **Area bounds**: cap segment area while still absorbing small fragments
//! - **Progress**: periodic callbacks with cancellation
//! - **Configuration**: TOML/JSON parameter files with the `config` feature
//!
//! # Quick Start
//!
//! ```
//! use mesh_segment::{SegmentMesh, SegmentParams, segment_mesh};
//!
//! // 4x4 grid, top half in a second material
//! let mut mesh = SegmentMesh::plane_grid(4, 4, 0.1);
//! for face in 16..32 {
//!     mesh.set_material(face, 1);
//! }
//!
//! let result = segment_mesh(&mesh, &SegmentParams::default()).unwrap();
//! assert_eq!(result.segment_count(), 2);
//! println!("{}", result);
//! ```
//!
//! # Deterministic ties
//!
//! Contacts of equal cost are merged in ascending contact id order, and
//! contact ids are assigned in ascending order of the triangle pair they
//! join. The same mesh and parameters always give the same partition.
//!
//! # Error Handling
//!
//! Operations return `SegmentOpResult<T>`, which is `Result<T, SegmentError>`.
//!
//! ```
//! use mesh_segment::{SegmentError, SegmentMesh, SegmentParams, segment_mesh};
//!
//! let mut mesh = SegmentMesh::plane_grid(1, 1, 1.0);
//! mesh.set_selected(0, false);
//! mesh.set_selected(1, false);
//!
//! match segment_mesh(&mesh, &SegmentParams::default()) {
//!     Ok(result) => println!("{} segments", result.segment_count()),
//!     Err(SegmentError::DegenerateInput { details }) => {
//!         println!("Nothing to segment: {}", details);
//!     }
//!     Err(e) => println!("Segmentation failed: {}", e),
//! }
//! ```

mod error;
mod types;

pub mod cost;
pub mod engine;
pub mod graph;
pub mod mesh;
pub mod params;
pub mod progress;
pub mod queue;
pub mod registry;
pub mod result;
pub mod tracing_ext;
pub mod weights;

pub use error::{ErrorCode, RecoverySuggestion, SegmentError, SegmentOpResult};
pub use types::{
    ContactId, GroupId, Segment, SegmentContact, SegmentId, Triangle, TriangleId, normalize_edge,
    normalized_cost,
};

pub use engine::{EngineState, MergeEngine, segment_mesh, segment_mesh_with_progress};
pub use graph::{GraphStats, SegmentGraph, build_graph};
pub use mesh::{HostMesh, SegmentMesh, Vertex};
pub use params::SegmentParams;
#[cfg(feature = "config")]
pub use params::ConfigError;
pub use result::SegmentResult;
