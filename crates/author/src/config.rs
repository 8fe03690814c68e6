use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest allowed distance between a graft target and the grafted root.
pub const MIN_GRAFT_DISTANCE: f32 = 1.0;

/// Placement policy for new buds and grafts.
///
/// Numbers here are cosmetic; what the actions guarantee is a nonzero,
/// deterministic offset from the parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Distance from a parent to each new bud.
    pub segment_length: f32,
    /// Buds created by one sprout.
    pub sprout_count: usize,
    /// Angle between neighbouring sprouted buds, radians.
    pub sprout_spread: f32,
    /// Deflection of a branched bud from its stem's angle, radians.
    pub branch_angle: f32,
    /// Distance the grafted root is pushed out from the target.
    pub graft_offset: f32,
    /// Charge of newly created buds.
    pub bud_charge: f32,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            segment_length: 18.0,
            sprout_count: 2,
            sprout_spread: 0.6,
            branch_angle: 0.8,
            graft_offset: 12.0,
            bud_charge: 0.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("segment_length must be positive, got {0}")]
    SegmentLength(f32),
    #[error("sprout_count must be at least 1")]
    NoSprouts,
    #[error("graft_offset must exceed the minimum graft distance, got {0}")]
    GraftOffset(f32),
    #[error("bud_charge must be within 0..=1, got {0}")]
    BudCharge(f32),
    #[error("{field} must be a finite angle, got {value}")]
    Angle { field: &'static str, value: f32 },
}

impl GrowthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.segment_length > 0.0 && self.segment_length.is_finite()) {
            return Err(ConfigError::SegmentLength(self.segment_length));
        }
        if self.sprout_count == 0 {
            return Err(ConfigError::NoSprouts);
        }
        if !(self.graft_offset > MIN_GRAFT_DISTANCE && self.graft_offset.is_finite()) {
            return Err(ConfigError::GraftOffset(self.graft_offset));
        }
        if !(0.0..=1.0).contains(&self.bud_charge) {
            return Err(ConfigError::BudCharge(self.bud_charge));
        }
        for (field, value) in [
            ("sprout_spread", self.sprout_spread),
            ("branch_angle", self.branch_angle),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Angle { field, value });
            }
        }
        Ok(())
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` file, or YAML for any other extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            _ => Self::from_yaml(&text),
        }
    }
}
