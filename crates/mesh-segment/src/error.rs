//! Error types for mesh segmentation.
//!
//! Every error carries a machine-readable code in the format `SEG-XXXX`:
//! - `SEG-1xxx`: input errors (nothing to segment, bad face data)
//! - `SEG-2xxx`: configuration errors
//! - `SEG-3xxx`: internal state errors
//!
//! Only input and configuration errors are expected in correct code. An
//! [`SegmentError::InvalidState`] means an invariant of the segment registry
//! was broken and should be reported as a bug.
//!
//! # Example
//!
//! ```
//! use mesh_segment::{ErrorCode, SegmentError};
//!
//! let err = SegmentError::DegenerateInput {
//!     details: "no eligible triangles".into(),
//! };
//! assert_eq!(err.code(), ErrorCode::DegenerateInput);
//! assert!(err.is_recoverable());
//! ```

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for segmentation operations.
pub type SegmentOpResult<T> = Result<T, SegmentError>;

/// Machine-readable error codes for segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Input errors (1xxx)
    /// SEG-1001: No eligible triangles to segment
    DegenerateInput = 1001,
    /// SEG-1002: Face references a vertex the mesh does not have
    InvalidVertexIndex = 1002,

    // Configuration errors (2xxx)
    /// SEG-2001: A parameter is out of range
    InvalidParameter = 2001,

    // Internal errors (3xxx)
    /// SEG-3001: Registry invariant violated
    InvalidState = 3001,
}

impl ErrorCode {
    /// Returns the error code as a string in the format `SEG-XXXX`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DegenerateInput => "SEG-1001",
            ErrorCode::InvalidVertexIndex => "SEG-1002",
            ErrorCode::InvalidParameter => "SEG-2001",
            ErrorCode::InvalidState => "SEG-3001",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recovery suggestions for segmentation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Select (mark eligible) at least one face before segmenting.
    SelectFaces,
    /// Adjust parameters for the operation.
    AdjustParameters { parameters: Vec<(String, String)> },
    /// Check the input mesh for the listed problems.
    CheckSourceMesh { checks: Vec<String> },
    /// No automatic recovery available; this is a defect.
    ReportBug,
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::SelectFaces => {
                write!(f, "Select at least one face before running segmentation")
            }
            RecoverySuggestion::AdjustParameters { parameters } => {
                let params: Vec<String> = parameters
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect();
                write!(f, "Try adjusting: {}", params.join(", "))
            }
            RecoverySuggestion::CheckSourceMesh { checks } => {
                write!(f, "Check the source mesh for: {}", checks.join(", "))
            }
            RecoverySuggestion::ReportBug => {
                write!(f, "No automatic recovery available; please report this as a bug")
            }
        }
    }
}

/// Errors that can occur during segmentation.
#[derive(Debug, Error, Diagnostic)]
pub enum SegmentError {
    /// The graph build found nothing to segment.
    #[error("nothing to segment: {details}")]
    #[diagnostic(
        code(segment::input::degenerate),
        help("Segmentation needs at least one eligible (selected) triangle.")
    )]
    DegenerateInput { details: String },

    /// Face data references a vertex that does not exist.
    #[error(
        "invalid vertex index: face {face_index} references vertex {vertex_index}, but mesh only has {vertex_count} vertices"
    )]
    #[diagnostic(
        code(segment::input::vertex_index),
        help("Check the mesh export settings or remove the offending faces.")
    )]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    /// A configuration value is out of range.
    #[error("invalid parameter {name}: {details}")]
    #[diagnostic(
        code(segment::config::parameter),
        help("Costs, factors and area thresholds must be finite and non-negative.")
    )]
    InvalidParameter { name: &'static str, details: String },

    /// The segment registry was asked to do something impossible.
    #[error("invalid segmentation state: {details}")]
    #[diagnostic(
        code(segment::internal::state),
        help("This indicates a bug in mesh-segment.")
    )]
    InvalidState { details: String },
}

impl SegmentError {
    /// Returns the machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            SegmentError::DegenerateInput { .. } => ErrorCode::DegenerateInput,
            SegmentError::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            SegmentError::InvalidParameter { .. } => ErrorCode::InvalidParameter,
            SegmentError::InvalidState { .. } => ErrorCode::InvalidState,
        }
    }

    /// Returns a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            SegmentError::DegenerateInput { .. } => RecoverySuggestion::SelectFaces,
            SegmentError::InvalidVertexIndex { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec!["face indices".into(), "vertex count".into()],
            },
            SegmentError::InvalidParameter { name, .. } => RecoverySuggestion::AdjustParameters {
                parameters: vec![((*name).into(), "use a finite value >= 0".into())],
            },
            SegmentError::InvalidState { .. } => RecoverySuggestion::ReportBug,
        }
    }

    /// Whether the caller can reasonably continue after this error.
    ///
    /// `DegenerateInput` means "no segmentation possible" rather than a crash.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SegmentError::InvalidState { .. })
    }

    // Constructor helpers

    pub(crate) fn invalid_state(details: impl Into<String>) -> Self {
        SegmentError::InvalidState {
            details: details.into(),
        }
    }

    pub(crate) fn invalid_parameter(name: &'static str, details: impl Into<String>) -> Self {
        SegmentError::InvalidParameter {
            name,
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::DegenerateInput.as_str(), "SEG-1001");
        assert_eq!(ErrorCode::InvalidState.to_string(), "SEG-3001");
    }

    #[test]
    fn test_invalid_state_is_fatal() {
        let err = SegmentError::invalid_state("merge of segment 3 into itself");
        assert_eq!(err.code(), ErrorCode::InvalidState);
        assert!(!err.is_recoverable());
        assert_eq!(err.recovery_suggestion(), RecoverySuggestion::ReportBug);
        assert!(err.to_string().contains("segment 3"));
    }

    #[test]
    fn test_parameter_suggestion() {
        let err = SegmentError::invalid_parameter("cost_threshold", "must be >= 0, got -1");
        let text = err.recovery_suggestion().to_string();
        assert!(text.contains("cost_threshold"));
        assert!(err.is_recoverable());
    }
}
