//! Plot and board configuration.
//!
//! The constants are the defaults used by the game; [`PlotSettings`] lets a
//! caller override them at runtime (for example from a JSON settings file).

use serde::Deserialize;

use crate::error::SettingsError;

// =============================================================================
// CONFIGURATION
// =============================================================================
pub const DEFAULT_X_MIN: f64 = -10.5;
pub const DEFAULT_X_MAX: f64 = 10.5;
/// Samples whose |y| exceeds this are treated as off-plot.
pub const DEFAULT_Y_LIMIT: f64 = 1000.0;
pub const DEFAULT_SAMPLE_COUNT: usize = 2001;
/// Upper bound on work per slot and recompute.
pub const MAX_SAMPLE_COUNT: usize = 200_000;
pub const DEFAULT_STEEPNESS_THRESHOLD: f64 = 100.0;
pub const DEFAULT_DOT_RADIUS: f64 = 0.25;
pub const DEFAULT_SLOT_COUNT: usize = 5;

/// What loading a saved game does with the hit state stored in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Discard persisted hits; the next recompute rebuilds them.
    #[default]
    Recompute,
    /// Restore hit flags and score exactly as saved.
    RestoreHits,
}

/// Sampling window and density shared by every slot of a board.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlotSettings {
    pub x_min: f64,
    pub x_max: f64,
    pub y_limit: f64,
    pub sample_count: usize,
    pub steepness_threshold: f64,
    pub slot_count: usize,
    pub load_policy: LoadPolicy,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            x_min: DEFAULT_X_MIN,
            x_max: DEFAULT_X_MAX,
            y_limit: DEFAULT_Y_LIMIT,
            sample_count: DEFAULT_SAMPLE_COUNT,
            steepness_threshold: DEFAULT_STEEPNESS_THRESHOLD,
            slot_count: DEFAULT_SLOT_COUNT,
            load_policy: LoadPolicy::default(),
        }
    }
}

impl PlotSettings {
    /// Settings for a custom window, everything else at its default.
    pub fn with_range(x_min: f64, x_max: f64, sample_count: usize) -> Self {
        Self {
            x_min,
            x_max,
            sample_count,
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.x_min.is_finite() || !self.x_max.is_finite() || self.x_min >= self.x_max {
            return Err(SettingsError::InvalidRange {
                min: self.x_min,
                max: self.x_max,
            });
        }
        if self.sample_count < 2 || self.sample_count > MAX_SAMPLE_COUNT {
            return Err(SettingsError::SampleCount {
                count: self.sample_count,
                max: MAX_SAMPLE_COUNT,
            });
        }
        if !(self.y_limit > 0.0) {
            return Err(SettingsError::NonPositive {
                name: "yLimit",
                value: self.y_limit,
            });
        }
        if !(self.steepness_threshold > 0.0) {
            return Err(SettingsError::NonPositive {
                name: "steepnessThreshold",
                value: self.steepness_threshold,
            });
        }
        if self.slot_count == 0 {
            return Err(SettingsError::NoSlots);
        }
        Ok(())
    }

    /// Distance between two neighbouring sample positions.
    pub fn step(&self) -> f64 {
        (self.x_max - self.x_min) / (self.sample_count - 1) as f64
    }
}
