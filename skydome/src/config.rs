//! Rendering and animation settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::animator::{RotationAnimator, DEFAULT_MS_PER_DEGREE};
use crate::clip::DEFAULT_RESAMPLE_STEP_DEG;
use crate::labels::{LabelPlacer, DEFAULT_PADDING_DIVISOR};
use crate::projection::{Rotation, ViewState};
use crate::winding::{WindingCorrector, DEFAULT_INVERSION_THRESHOLD};
use crate::{Result, SkyError};

/// Settings for the sky dome.
///
/// Missing fields in a config file take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    /// Disc radius in screen units
    pub radius: f64,
    /// Animation speed: milliseconds per degree of rotation
    pub transition_ms_per_degree: f64,
    /// Only objects brighter than this magnitude are drawn mid-transition
    pub transition_magnitude_cutoff: f64,
    /// Label padding is `radius / label_padding_divisor`
    pub label_padding_divisor: f64,
    /// Bounding-box fraction of `(2r)^2` above which a polygon is inverted
    pub inversion_threshold: f64,
    /// Maximum angle between resampled points on edges and horizon arcs
    pub resample_step_deg: f64,
    /// Draw stars and planets in dim red
    pub night_mode: bool,
    pub show_ecliptic: bool,
    /// Show the highlight rings around planets
    pub reveal_planets: bool,
}

impl Default for SkyConfig {
    fn default() -> Self {
        Self {
            radius: 300.0,
            transition_ms_per_degree: DEFAULT_MS_PER_DEGREE,
            transition_magnitude_cutoff: 2.5,
            label_padding_divisor: DEFAULT_PADDING_DIVISOR,
            inversion_threshold: DEFAULT_INVERSION_THRESHOLD,
            resample_step_deg: DEFAULT_RESAMPLE_STEP_DEG,
            night_mode: false,
            show_ecliptic: true,
            reveal_planets: false,
        }
    }
}

impl SkyConfig {
    /// Check every value is within its usable range
    pub fn validate(&self) -> Result<()> {
        let positive = |value: f64, name: &str| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SkyError::InvalidConfig(format!(
                    "{name} must be positive and finite, got {value}"
                )))
            }
        };
        positive(self.radius, "radius")?;
        positive(self.label_padding_divisor, "label_padding_divisor")?;
        positive(self.resample_step_deg, "resample_step_deg")?;

        if !self.transition_ms_per_degree.is_finite() || self.transition_ms_per_degree < 0.0 {
            return Err(SkyError::InvalidConfig(format!(
                "transition_ms_per_degree must be non-negative, got {}",
                self.transition_ms_per_degree
            )));
        }
        if !self.transition_magnitude_cutoff.is_finite() {
            return Err(SkyError::InvalidConfig(
                "transition_magnitude_cutoff must be finite".to_string(),
            ));
        }
        if !(self.inversion_threshold > 0.0 && self.inversion_threshold <= 1.0) {
            return Err(SkyError::InvalidConfig(format!(
                "inversion_threshold must be in (0, 1], got {}",
                self.inversion_threshold
            )));
        }
        if self.resample_step_deg > 90.0 {
            return Err(SkyError::InvalidConfig(format!(
                "resample_step_deg must be at most 90, got {}",
                self.resample_step_deg
            )));
        }
        Ok(())
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file and validate
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: SkyConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn view(&self, rotation: Rotation) -> ViewState {
        ViewState::new(rotation, self.radius)
    }

    pub fn animator(&self, initial: Rotation) -> RotationAnimator {
        RotationAnimator::with_speed(initial, self.transition_ms_per_degree)
    }

    pub fn label_placer(&self) -> LabelPlacer {
        LabelPlacer::new(self.label_padding_divisor)
    }

    pub fn winding_corrector(&self) -> WindingCorrector {
        WindingCorrector::new(self.inversion_threshold)
    }
}
