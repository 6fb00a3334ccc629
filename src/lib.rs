//! # spoteval - Scene-Text Spotting Evaluation
//!
//! Scores text detection and recognition results against polygon ground truth.
//! Predictions are matched greedily by IoU in descending confidence order, and
//! the confidence cutoff is swept to find the best F-measure operating point
//! and the best 1-NED (normalized edit distance) operating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use spoteval::{score, GroundTruthRecord, PredictionRecord};
//!
//! let square = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
//! let gt = vec![GroundTruthRecord::new("img_1", &square, "AB", false)];
//! let preds = vec![PredictionRecord::new("img_1", &square, "AC", 0.9)];
//!
//! let report = score(&gt, &preds, &[0.5])?;
//! let best = report.thresholds[0].best_f_measure.unwrap();
//! assert!(best.precision > 0.99);
//! assert!((best.one_minus_ned - 0.5).abs() < 1e-6);
//! # Ok::<(), spoteval::EvalError>(())
//! ```

mod error;
mod report;
mod scorer;
mod types;

pub mod geometry;
pub mod loader;
pub mod similarity;

pub use crate::error::{EvalError, Result};
pub use crate::report::{CurvePoint, EvalReport, OperatingPoint, ThresholdReport};
pub use crate::scorer::{score, Scorer};
pub use crate::types::{EvalConfig, GroundTruthRecord, PredictionRecord, DEFAULT_IOU_THRESHOLD};

use std::path::PathBuf;

/// Locations of the two evaluation inputs.
#[derive(Debug, Clone)]
pub struct EvalInputs {
    /// Zip archive or directory of per-image ground-truth JSON files.
    pub gt_path: PathBuf,
    /// JSON array of per-image prediction results.
    pub pred_path: PathBuf,
}

impl EvalInputs {
    /// Both paths are required; a missing one is a configuration error.
    pub fn from_args(gt: Option<PathBuf>, pred: Option<PathBuf>) -> Result<Self> {
        let gt_path = gt.ok_or_else(|| EvalError::Config("gt file is required.".to_string()))?;
        let pred_path =
            pred.ok_or_else(|| EvalError::Config("prediction file is required.".to_string()))?;
        Ok(Self { gt_path, pred_path })
    }
}

/// Load both inputs from disk and score them.
pub fn evaluate(inputs: &EvalInputs, config: EvalConfig) -> Result<EvalReport> {
    let scorer = Scorer::new(config)?;
    let ground_truth = loader::load_ground_truth(&inputs.gt_path)?;
    let predictions = loader::load_predictions(&inputs.pred_path)?;
    scorer.score(&ground_truth, &predictions)
}
