use geo_types::Coord;

use crate::error::{EvalError, Result};

/// Default IoU cutoff used when no thresholds are given.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.5;

/// A single annotated text region.
#[derive(Clone, Debug, PartialEq)]
pub struct GroundTruthRecord {
    pub image_id: String,
    pub polygon: Vec<Coord<f64>>,
    pub transcription: String,
    /// Ignored regions absorb a match but never count toward recall or 1-NED.
    pub ignore: bool,
}

/// A single detected and recognized text region.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictionRecord {
    pub image_id: String,
    pub polygon: Vec<Coord<f64>>,
    pub transcription: String,
    pub confidence_score: f64,
}

impl GroundTruthRecord {
    pub fn new(
        image_id: impl Into<String>,
        points: &[(f64, f64)],
        transcription: impl Into<String>,
        ignore: bool,
    ) -> Self {
        Self {
            image_id: image_id.into(),
            polygon: to_coords(points),
            transcription: transcription.into(),
            ignore,
        }
    }
}

impl PredictionRecord {
    pub fn new(
        image_id: impl Into<String>,
        points: &[(f64, f64)],
        transcription: impl Into<String>,
        confidence_score: f64,
    ) -> Self {
        Self {
            image_id: image_id.into(),
            polygon: to_coords(points),
            transcription: transcription.into(),
            confidence_score,
        }
    }
}

fn to_coords(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
    points.iter().map(|&(x, y)| Coord { x, y }).collect()
}

#[derive(Clone, Debug)]
pub struct EvalConfig {
    /// IoU cutoffs, each scored as an independent column.
    pub thresholds: Vec<f64>,
    /// Scale applied to coordinates before integer polygon clipping.
    pub clipper_factor: f64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![DEFAULT_IOU_THRESHOLD],
            clipper_factor: 1e4,
        }
    }
}

impl EvalConfig {
    pub fn with_thresholds(thresholds: Vec<f64>) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.thresholds.is_empty() {
            return Err(EvalError::Config(
                "at least one IoU threshold is required".to_string(),
            ));
        }
        for &t in &self.thresholds {
            if !(t > 0.0 && t <= 1.0) {
                return Err(EvalError::Config(format!(
                    "IoU threshold {} is outside (0, 1]",
                    t
                )));
            }
        }
        if !(self.clipper_factor.is_finite() && self.clipper_factor > 0.0) {
            return Err(EvalError::Config(format!(
                "clipper factor must be positive, got {}",
                self.clipper_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = EvalConfig::default();
        assert_eq!(cfg.thresholds, vec![0.5]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_thresholds() {
        for bad in [0.0, -0.1, 1.5, f64::NAN] {
            let cfg = EvalConfig::with_thresholds(vec![0.5, bad]);
            assert!(matches!(cfg.validate(), Err(EvalError::Config(_))), "{}", bad);
        }
        assert!(EvalConfig::with_thresholds(vec![1.0]).validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_thresholds() {
        let cfg = EvalConfig::with_thresholds(Vec::new());
        assert!(matches!(cfg.validate(), Err(EvalError::Config(_))));
    }
}
