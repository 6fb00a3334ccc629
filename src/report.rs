use std::fmt;

use serde::Serialize;

/// Cumulative metrics after admitting the `rank + 1` most confident predictions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CurvePoint {
    pub confidence: f64,
    pub true_positives: f64,
    pub false_positives: f64,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
    pub one_minus_ned: f64,
}

/// A single row of the curve selected as the best by some target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OperatingPoint {
    /// Row index into the confidence-sorted predictions.
    pub rank: usize,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
    pub one_minus_ned: f64,
    /// Confidence of the prediction at `rank`, i.e. the effective score cutoff.
    pub score_cutoff: f64,
}

impl OperatingPoint {
    pub(crate) fn from_curve(rank: usize, point: &CurvePoint) -> Self {
        Self {
            rank,
            precision: point.precision,
            recall: point.recall,
            f_measure: point.f_measure,
            one_minus_ned: point.one_minus_ned,
            score_cutoff: point.confidence,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ThresholdReport {
    pub iou_threshold: f64,
    pub best_f_measure: Option<OperatingPoint>,
    pub best_one_minus_ned: Option<OperatingPoint>,
    #[serde(skip)]
    pub curve: Vec<CurvePoint>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EvalReport {
    /// Ground-truth boxes that count toward recall (non-ignored).
    pub num_ground_truths: usize,
    pub num_predictions: usize,
    pub thresholds: Vec<ThresholdReport>,
}

impl EvalReport {
    pub fn threshold(&self, iou_threshold: f64) -> Option<&ThresholdReport> {
        self.thresholds
            .iter()
            .find(|t| (t.iou_threshold - iou_threshold).abs() < f64::EPSILON)
    }
}

fn write_point(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    point: Option<&OperatingPoint>,
) -> fmt::Result {
    match point {
        Some(p) => writeln!(
            f,
            "{} p: {:.2}, r: {:.2}, f: {:.2}, 1-ned: {:.2}, best_score_th: {:.3}",
            label,
            p.precision * 100.0,
            p.recall * 100.0,
            p.f_measure * 100.0,
            p.one_minus_ned * 100.0,
            p.score_cutoff
        ),
        None => writeln!(f, "{} no predictions", label),
    }
}

impl fmt::Display for ThresholdReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_point(f, "[Best F-Measure]", self.best_f_measure.as_ref())?;
        write_point(f, "[Best 1-NED]    ", self.best_one_minus_ned.as_ref())
    }
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let multi = self.thresholds.len() > 1;
        for t in &self.thresholds {
            if multi {
                writeln!(f, "IoU threshold {:.2}", t.iou_threshold)?;
            }
            write!(f, "{}", t)?;
        }
        Ok(())
    }
}
