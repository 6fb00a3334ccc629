//! Reading annotation and prediction files into scorer records.
//!
//! Ground truth is a zip archive (or a plain directory) of per-image JSON
//! files shaped `{"lines": [{"points", "transcription", "ignore"}]}`.
//! Predictions are one JSON array of `{"img_name", "points", "scores", "texts"}`
//! entries, aligned by index.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use geo_types::Coord;
use log::{debug, info};
use serde::Deserialize;

use crate::error::{EvalError, Result};
use crate::types::{GroundTruthRecord, PredictionRecord};

/// Point list given either as `[[x, y], ...]` or flat `[x0, y0, x1, y1, ...]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPoints {
    Pairs(Vec<[f64; 2]>),
    Flat(Vec<f64>),
}

impl RawPoints {
    fn into_coords(self) -> Result<Vec<Coord<f64>>> {
        match self {
            RawPoints::Pairs(pairs) => Ok(pairs.into_iter().map(|[x, y]| Coord { x, y }).collect()),
            RawPoints::Flat(flat) => {
                if flat.len() % 2 != 0 {
                    return Err(EvalError::Geometry(format!(
                        "flat point list has odd length {}",
                        flat.len()
                    )));
                }
                Ok(flat.chunks_exact(2).map(|c| Coord { x: c[0], y: c[1] }).collect())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct GroundTruthFile {
    lines: Vec<GroundTruthLine>,
}

#[derive(Debug, Deserialize)]
struct GroundTruthLine {
    points: RawPoints,
    transcription: String,
    #[serde(default)]
    ignore: bool,
}

#[derive(Debug, Deserialize)]
struct PredictionEntry {
    img_name: String,
    points: Vec<RawPoints>,
    scores: Vec<f64>,
    texts: Vec<String>,
}

/// `gts/img_12.json` -> `img_12`
pub fn image_id_from_gt_name(name: &str) -> String {
    let base = name.rsplit('/').next().unwrap_or(name);
    base.replace(".json", "")
}

/// `img_12.jpg` -> `img_12`
pub fn image_id_from_pred_name(name: &str) -> String {
    name.replace(".jpg", "")
}

fn with_image(image_id: &str, err: EvalError) -> EvalError {
    match err {
        EvalError::Geometry(msg) => EvalError::Geometry(format!("image '{}': {}", image_id, msg)),
        other => other,
    }
}

pub fn parse_ground_truth_file<R: Read>(
    image_id: &str,
    reader: R,
) -> Result<Vec<GroundTruthRecord>> {
    let file: GroundTruthFile = serde_json::from_reader(reader)?;
    file.lines
        .into_iter()
        .map(|line| {
            Ok(GroundTruthRecord {
                image_id: image_id.to_string(),
                polygon: line.points.into_coords().map_err(|e| with_image(image_id, e))?,
                transcription: line.transcription,
                ignore: line.ignore,
            })
        })
        .collect()
}

pub fn parse_predictions<R: Read>(reader: R) -> Result<Vec<PredictionRecord>> {
    let entries: Vec<PredictionEntry> = serde_json::from_reader(reader)?;
    let mut records = Vec::new();
    for entry in entries {
        let image_id = image_id_from_pred_name(&entry.img_name);
        if entry.points.len() != entry.scores.len() || entry.points.len() != entry.texts.len() {
            return Err(EvalError::Format(format!(
                "image '{}': {} polygons, {} scores and {} texts are not aligned",
                image_id,
                entry.points.len(),
                entry.scores.len(),
                entry.texts.len()
            )));
        }
        for ((points, confidence_score), transcription) in
            entry.points.into_iter().zip(entry.scores).zip(entry.texts)
        {
            records.push(PredictionRecord {
                image_id: image_id.clone(),
                polygon: points.into_coords().map_err(|e| with_image(&image_id, e))?,
                transcription,
                confidence_score,
            });
        }
    }
    Ok(records)
}

fn load_ground_truth_zip(path: &Path) -> Result<Vec<GroundTruthRecord>> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
    let mut records = Vec::new();
    let mut files = 0usize;
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.is_dir() || !entry.name().contains("json") {
            continue;
        }
        let image_id = image_id_from_gt_name(entry.name());
        debug!("Reading ground truth '{}' from archive", entry.name());
        records.extend(parse_ground_truth_file(&image_id, entry)?);
        files += 1;
    }
    info!("Loaded {} ground-truth records from {} files in {:?}", records.len(), files, path);
    Ok(records)
}

fn load_ground_truth_dir(path: &Path) -> Result<Vec<GroundTruthRecord>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.contains("json"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut records = Vec::new();
    for p in &paths {
        let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let image_id = image_id_from_gt_name(name);
        debug!("Reading ground truth {:?}", p);
        records.extend(parse_ground_truth_file(&image_id, BufReader::new(File::open(p)?))?);
    }
    info!("Loaded {} ground-truth records from {} files in {:?}", records.len(), paths.len(), path);
    Ok(records)
}

/// Load ground truth from a zip archive or a directory of JSON files.
pub fn load_ground_truth<P: AsRef<Path>>(path: P) -> Result<Vec<GroundTruthRecord>> {
    let path = path.as_ref();
    if path.is_dir() {
        load_ground_truth_dir(path)
    } else {
        load_ground_truth_zip(path)
    }
}

pub fn load_predictions<P: AsRef<Path>>(path: P) -> Result<Vec<PredictionRecord>> {
    let path = path.as_ref();
    let records = parse_predictions(BufReader::new(File::open(path)?))?;
    info!("Loaded {} predictions from {:?}", records.len(), path);
    Ok(records)
}
