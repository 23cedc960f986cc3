//! Segmentation parameters.
//!
//! With the `config` feature, [`SegmentParams`] can be loaded from and saved to
//! TOML or JSON so a tuned setup can be reused:
//!
//! ```toml
//! cost_threshold = 0.3
//! maximum_area_threshold = 0.5
//! minimum_area_threshold = 0.01
//! contact_length_factor = 1.0
//! face_angle_cost_factor = 1.0
//! material_change_cost_factor = 1.0
//! ignore_vertex_group_indices = [0, 4]
//! ```
//!
//! Missing keys take their default values.

use std::collections::BTreeSet;

use crate::error::{SegmentError, SegmentOpResult};
use crate::types::GroupId;

/// Parameters for mesh segmentation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SegmentParams {
    /// Highest normalized contact cost that may still be merged. Default: 0.3
    pub cost_threshold: f64,
    /// Merges are refused when the merged area would exceed this, unless the
    /// absorbed segment is no larger than `minimum_area_threshold`.
    /// Default: 0.5
    pub maximum_area_threshold: f64,
    /// Segments up to this area merge regardless of the maximum. Default: 0.01
    pub minimum_area_threshold: f64,
    /// Divides raw cost by `border_length * contact_length_factor`; 0 disables
    /// length normalization. Default: 1.0
    pub contact_length_factor: f64,
    /// Weight of the dihedral angle term. Default: 1.0
    pub face_angle_cost_factor: f64,
    /// Weight of the vertex group weight difference term. Default: 0.1
    pub vertex_group_weight_cost_factor: f64,
    /// Weight of the dominant vertex group change term. Default: 0.1
    pub vertex_group_change_cost_factor: f64,
    /// Weight of the material change term. Default: 1.0
    pub material_change_cost_factor: f64,
    /// Weight of the flat-shaded edge term. Default: 1.0
    pub edge_sharp_cost_factor: f64,
    /// Weight of the UV seam term. Default: 1.0
    pub edge_seam_cost_factor: f64,
    /// Vertex groups excluded from all vertex group terms.
    pub ignore_vertex_group_indices: BTreeSet<GroupId>,
    /// Stop after this many merges. `None` runs to completion.
    pub max_merges: Option<usize>,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            cost_threshold: 0.3,
            maximum_area_threshold: 0.5,
            minimum_area_threshold: 0.01,
            contact_length_factor: 1.0,
            face_angle_cost_factor: 1.0,
            vertex_group_weight_cost_factor: 0.1,
            vertex_group_change_cost_factor: 0.1,
            material_change_cost_factor: 1.0,
            edge_sharp_cost_factor: 1.0,
            edge_seam_cost_factor: 1.0,
            ignore_vertex_group_indices: BTreeSet::new(),
            max_merges: None,
        }
    }
}

impl SegmentParams {
    /// Many small segments: low threshold, tight area cap.
    pub fn fine() -> Self {
        Self {
            cost_threshold: 0.1,
            maximum_area_threshold: 0.1,
            minimum_area_threshold: 0.001,
            ..Default::default()
        }
    }

    /// Few large segments: high threshold, loose area cap.
    pub fn coarse() -> Self {
        Self {
            cost_threshold: 1.0,
            maximum_area_threshold: 5.0,
            minimum_area_threshold: 0.05,
            ..Default::default()
        }
    }

    /// Split only along material boundaries, without any area cap.
    pub fn material_only() -> Self {
        Self {
            cost_threshold: 0.5,
            maximum_area_threshold: f64::MAX,
            minimum_area_threshold: 0.0,
            face_angle_cost_factor: 0.0,
            vertex_group_weight_cost_factor: 0.0,
            vertex_group_change_cost_factor: 0.0,
            material_change_cost_factor: 1.0,
            edge_sharp_cost_factor: 0.0,
            edge_seam_cost_factor: 0.0,
            ..Default::default()
        }
    }

    pub fn with_cost_threshold(mut self, threshold: f64) -> Self {
        self.cost_threshold = threshold;
        self
    }

    pub fn with_area_thresholds(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum_area_threshold = minimum;
        self.maximum_area_threshold = maximum;
        self
    }

    pub fn with_contact_length_factor(mut self, factor: f64) -> Self {
        self.contact_length_factor = factor;
        self
    }

    pub fn with_max_merges(mut self, max_merges: usize) -> Self {
        self.max_merges = Some(max_merges);
        self
    }

    /// Exclude a vertex group from the vertex group terms.
    pub fn ignore_vertex_group(mut self, group: GroupId) -> Self {
        self.ignore_vertex_group_indices.insert(group);
        self
    }

    /// Set all six cost factors to zero.
    pub fn without_cost_factors(mut self) -> Self {
        self.face_angle_cost_factor = 0.0;
        self.vertex_group_weight_cost_factor = 0.0;
        self.vertex_group_change_cost_factor = 0.0;
        self.material_change_cost_factor = 0.0;
        self.edge_sharp_cost_factor = 0.0;
        self.edge_seam_cost_factor = 0.0;
        self
    }

    /// Check that no value is NaN or negative and that the area bounds are
    /// ordered.
    ///
    /// `cost_threshold` and `maximum_area_threshold` may be `f64::INFINITY`
    /// (merge any cost, no area cap); every other value must be finite.
    pub fn validate(&self) -> SegmentOpResult<()> {
        let unbounded = [
            ("cost_threshold", self.cost_threshold),
            ("maximum_area_threshold", self.maximum_area_threshold),
        ];
        for (name, value) in unbounded {
            if value.is_nan() || value < 0.0 {
                return Err(SegmentError::invalid_parameter(
                    name,
                    format!("must be >= 0, got {}", value),
                ));
            }
        }

        let finite = [
            ("minimum_area_threshold", self.minimum_area_threshold),
            ("contact_length_factor", self.contact_length_factor),
            ("face_angle_cost_factor", self.face_angle_cost_factor),
            (
                "vertex_group_weight_cost_factor",
                self.vertex_group_weight_cost_factor,
            ),
            (
                "vertex_group_change_cost_factor",
                self.vertex_group_change_cost_factor,
            ),
            ("material_change_cost_factor", self.material_change_cost_factor),
            ("edge_sharp_cost_factor", self.edge_sharp_cost_factor),
            ("edge_seam_cost_factor", self.edge_seam_cost_factor),
        ];
        for (name, value) in finite {
            if !value.is_finite() || value < 0.0 {
                return Err(SegmentError::invalid_parameter(
                    name,
                    format!("must be finite and >= 0, got {}", value),
                ));
            }
        }
        if self.minimum_area_threshold > self.maximum_area_threshold {
            return Err(SegmentError::invalid_parameter(
                "minimum_area_threshold",
                format!(
                    "{} exceeds maximum_area_threshold {}",
                    self.minimum_area_threshold, self.maximum_area_threshold
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(feature = "config")]
impl SegmentParams {
    /// Load parameters from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load parameters from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save parameters to a TOML file.
    pub fn save_toml(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Load parameters from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json_str)?)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Errors that can occur when loading or saving parameters.
#[cfg(feature = "config")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
