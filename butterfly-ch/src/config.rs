//! Contraction settings

use serde::{Deserialize, Serialize};

use crate::error::{ChError, Result};
use crate::witness::WitnessCalculator;

/// Factors and bounds for [`crate::HierarchyBuilder`].
///
/// Deserializes from TOML or JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractionConfig {
    pub difference_factor: f32,
    pub depth_factor: f32,
    pub contracted_factor: f32,
    /// Maximum number of edges on a witness path; `u32::MAX` is unbounded.
    pub hop_limit: u32,
    /// Maximum vertices settled by one witness search.
    pub max_settles: Option<usize>,
    /// After this many consecutive stale queue heads every queued priority
    /// is recomputed. `None` disables the full recalculation.
    pub misses_window: Option<usize>,
}

impl Default for ContractionConfig {
    fn default() -> Self {
        Self {
            difference_factor: 1.0,
            depth_factor: 1.0,
            contracted_factor: 1.0,
            hop_limit: u32::MAX,
            max_settles: None,
            misses_window: Some(20),
        }
    }
}

impl ContractionConfig {
    /// Edge difference only, the setting used to study hierarchy shapes.
    pub fn edge_difference_only() -> Self {
        Self {
            depth_factor: 0.0,
            contracted_factor: 0.0,
            ..Self::default()
        }
    }

    pub fn witness_calculator(&self) -> WitnessCalculator {
        WitnessCalculator::new(self.hop_limit).with_max_settles(self.max_settles)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("difference_factor", self.difference_factor),
            ("depth_factor", self.depth_factor),
            ("contracted_factor", self.contracted_factor),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ChError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.misses_window == Some(0) {
            return Err(ChError::InvalidConfig(
                "misses_window must be at least 1".to_string(),
            ));
        }
        if self.max_settles == Some(0) {
            return Err(ChError::InvalidConfig(
                "max_settles must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
