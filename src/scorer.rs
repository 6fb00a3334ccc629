use std::collections::{HashMap, HashSet};

use geo_types::{Coord, Polygon};
use log::debug;

use crate::error::{EvalError, Result};
use crate::geometry::{build_polygon, iou};
use crate::report::{CurvePoint, EvalReport, OperatingPoint, ThresholdReport};
use crate::similarity::similarity;
use crate::types::{EvalConfig, GroundTruthRecord, PredictionRecord};

const F_MEASURE_EPS: f64 = 1e-6;

/// Ground truth of one image, split into parallel per-box arrays.
struct ImageGroup<'g> {
    polygons: Vec<Polygon<f64>>,
    transcriptions: Vec<&'g str>,
    ignored: Vec<bool>,
}

fn polygon_for(image_id: &str, points: &[Coord<f64>], factor: f64) -> Result<Polygon<f64>> {
    build_polygon(points, factor).map_err(|e| match e {
        EvalError::Geometry(msg) => EvalError::Geometry(format!("image '{}': {}", image_id, msg)),
        other => other,
    })
}

fn group_by_image(
    ground_truth: &[GroundTruthRecord],
    factor: f64,
) -> Result<HashMap<&str, ImageGroup<'_>>> {
    let mut groups: HashMap<&str, ImageGroup<'_>> = HashMap::new();
    for record in ground_truth {
        let polygon = polygon_for(&record.image_id, &record.polygon, factor)?;
        let group = groups
            .entry(record.image_id.as_str())
            .or_insert_with(|| ImageGroup {
                polygons: Vec::new(),
                transcriptions: Vec::new(),
                ignored: Vec::new(),
            });
        group.polygons.push(polygon);
        group.transcriptions.push(record.transcription.as_str());
        group.ignored.push(record.ignore);
    }
    Ok(groups)
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum MatchOutcome {
    TruePositive { similarity: f64 },
    /// Claimed an ignore region: neither rewarded nor penalized.
    Ignored,
    FalsePositive,
}

#[derive(Clone, Copy, Debug)]
struct BestMatch {
    index: usize,
    overlap: f64,
}

/// Highest-IoU box in the group. `None` only when there are no candidates.
fn best_match(prediction: &Polygon<f64>, group: &ImageGroup<'_>, factor: f64) -> Option<BestMatch> {
    if group.polygons.is_empty() {
        return None;
    }
    let mut best = BestMatch { index: 0, overlap: 0.0 };
    for (j, gt) in group.polygons.iter().enumerate() {
        let overlap = iou(prediction, gt, factor);
        if overlap > best.overlap {
            best = BestMatch { index: j, overlap };
        }
    }
    Some(best)
}

#[derive(Clone, Copy, Debug, Default)]
struct Running {
    tp: f64,
    fp: f64,
    ned: f64,
}

impl Running {
    fn apply(&mut self, outcome: MatchOutcome) {
        match outcome {
            MatchOutcome::TruePositive { similarity } => {
                self.tp += 1.0;
                self.ned += similarity;
            }
            MatchOutcome::Ignored => {}
            MatchOutcome::FalsePositive => self.fp += 1.0,
        }
    }

    fn point(&self, confidence: f64, num_gts: f64) -> CurvePoint {
        let recall = self.tp / num_gts.max(f64::EPSILON);
        let precision = self.tp / (self.tp + self.fp).max(f64::EPSILON);
        let f_measure = 2.0 * precision * recall / (precision + recall + F_MEASURE_EPS);
        let one_minus_ned = self.ned / (self.fp + num_gts + f64::EPSILON);
        CurvePoint {
            confidence,
            true_positives: self.tp,
            false_positives: self.fp,
            precision,
            recall,
            f_measure,
            one_minus_ned,
        }
    }
}

/// Fold state threaded through the confidence-sorted predictions.
struct MatchState<'g> {
    /// `(image, box, threshold column)` triples already taken by a prediction.
    claimed: HashSet<(&'g str, usize, usize)>,
    running: Vec<Running>,
    curves: Vec<Vec<CurvePoint>>,
}

impl<'g> MatchState<'g> {
    fn new(columns: usize, rows: usize) -> Self {
        Self {
            claimed: HashSet::new(),
            running: vec![Running::default(); columns],
            curves: (0..columns).map(|_| Vec::with_capacity(rows)).collect(),
        }
    }

    fn claim(
        &mut self,
        image: &'g str,
        group: &ImageGroup<'g>,
        index: usize,
        column: usize,
        transcription: &str,
    ) -> MatchOutcome {
        if !self.claimed.insert((image, index, column)) {
            return MatchOutcome::FalsePositive;
        }
        if group.ignored[index] {
            MatchOutcome::Ignored
        } else {
            MatchOutcome::TruePositive {
                similarity: similarity(transcription, group.transcriptions[index]),
            }
        }
    }

    fn record(&mut self, column: usize, outcome: MatchOutcome, confidence: f64, num_gts: f64) {
        let running = &mut self.running[column];
        running.apply(outcome);
        let point = running.point(confidence, num_gts);
        self.curves[column].push(point);
    }
}

/// Index of the first maximum of `key` over the curve.
fn argmax_by(curve: &[CurvePoint], key: impl Fn(&CurvePoint) -> f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, point) in curve.iter().enumerate() {
        let value = key(point);
        match best {
            Some((_, b)) if !(value > b) => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}

fn threshold_report(iou_threshold: f64, curve: Vec<CurvePoint>) -> ThresholdReport {
    let best_f =
        argmax_by(&curve, |p| p.f_measure).map(|i| OperatingPoint::from_curve(i, &curve[i]));
    let best_ned =
        argmax_by(&curve, |p| p.one_minus_ned).map(|i| OperatingPoint::from_curve(i, &curve[i]));
    ThresholdReport {
        iou_threshold,
        best_f_measure: best_f,
        best_one_minus_ned: best_ned,
        curve,
    }
}

/// Matches predictions to ground truth and sweeps the confidence cutoff.
pub struct Scorer {
    config: EvalConfig,
}

impl Scorer {
    pub fn new(config: EvalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn score(
        &self,
        ground_truth: &[GroundTruthRecord],
        predictions: &[PredictionRecord],
    ) -> Result<EvalReport> {
        let thresholds = &self.config.thresholds;
        let factor = self.config.clipper_factor;

        let groups = group_by_image(ground_truth, factor)?;
        let num_gts = ground_truth.iter().filter(|g| !g.ignore).count();

        if let Some(bad) = predictions.iter().find(|p| !p.confidence_score.is_finite()) {
            return Err(EvalError::Format(format!(
                "image '{}': non-finite confidence score {}",
                bad.image_id, bad.confidence_score
            )));
        }

        // Stable: equal scores keep their input order.
        let mut sorted: Vec<&PredictionRecord> = predictions.iter().collect();
        sorted.sort_by(|a, b| b.confidence_score.total_cmp(&a.confidence_score));

        debug!(
            "Scoring {} predictions against {} ground-truth boxes ({} cared, {} images) \
             at thresholds {:?}",
            sorted.len(),
            ground_truth.len(),
            num_gts,
            groups.len(),
            thresholds
        );

        let num_gts_f = num_gts as f64;
        let state = sorted.iter().try_fold(
            MatchState::new(thresholds.len(), sorted.len()),
            |mut state, pred| {
                let polygon = polygon_for(&pred.image_id, &pred.polygon, factor)?;
                let candidates = groups
                    .get_key_value(pred.image_id.as_str())
                    .and_then(|(&image, group)| {
                        best_match(&polygon, group, factor).map(|best| (image, group, best))
                    });

                for (column, &threshold) in thresholds.iter().enumerate() {
                    let outcome = match candidates {
                        Some((image, group, best)) if best.overlap > threshold => {
                            state.claim(image, group, best.index, column, &pred.transcription)
                        }
                        _ => MatchOutcome::FalsePositive,
                    };
                    state.record(column, outcome, pred.confidence_score, num_gts_f);
                }
                Ok::<_, EvalError>(state)
            },
        )?;

        let reports = thresholds
            .iter()
            .zip(state.curves)
            .map(|(&t, curve)| threshold_report(t, curve))
            .collect();

        Ok(EvalReport {
            num_ground_truths: num_gts,
            num_predictions: sorted.len(),
            thresholds: reports,
        })
    }
}

/// Score `predictions` against `ground_truth` at each IoU threshold.
pub fn score(
    ground_truth: &[GroundTruthRecord],
    predictions: &[PredictionRecord],
    thresholds: &[f64],
) -> Result<EvalReport> {
    Scorer::new(EvalConfig::with_thresholds(thresholds.to_vec()))?.score(ground_truth, predictions)
}
