//! Result exports.
//!
//! - pulse-area/ratio maps as JSON (`write_area_json`)
//! - fitted parameters plus a sampled model curve as JSON (`write_fit_json`)
//! - conditioned traces as plain CSV columns (`write_columns_csv`)

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{FitModel, FitQuality, FitResult};
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::evaluate;

/// Per-state pulse areas and their ratios against the reference trace.
#[derive(Debug, Clone, Serialize)]
pub struct AreaReport {
    pub generated: DateTime<Utc>,
    pub area: BTreeMap<String, f64>,
    pub ratio: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FitParam {
    pub name: String,
    pub value: f64,
    pub uncertainty: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FitGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Portable record of one fit.
#[derive(Debug, Clone, Serialize)]
pub struct FitFile {
    pub tool: String,
    pub generated: DateTime<Utc>,
    pub model: FitModel,
    pub params: Vec<FitParam>,
    pub quality: FitQuality,
    pub grid: FitGrid,
    /// Observed minus fitted at each fitted sample.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residuals: Option<FitGrid>,
}

impl FitFile {
    /// Sample the fitted model on `points` evenly spaced x values over `[x_min, x_max]`.
    pub fn new(fit: &FitResult, x_min: f64, x_max: f64, points: usize) -> AnalysisResult<Self> {
        let params = fit
            .model
            .param_names()
            .into_iter()
            .zip(fit.params.iter().zip(&fit.uncertainties))
            .map(|(name, (&value, &uncertainty))| FitParam {
                name,
                value,
                uncertainty,
            })
            .collect();

        let x = linspace(x_min, x_max, points);
        let y = evaluate(fit.model, &x, &fit.params)?;
        Ok(Self {
            tool: "tpa".to_string(),
            generated: Utc::now(),
            model: fit.model,
            params,
            quality: fit.quality.clone(),
            grid: FitGrid { x, y },
            residuals: None,
        })
    }

    pub fn with_residuals(mut self, x: Vec<f64>, residuals: Vec<f64>) -> AnalysisResult<Self> {
        if x.len() != residuals.len() {
            return Err(AnalysisError::InputShape(format!(
                "{} residuals for {} samples",
                residuals.len(),
                x.len()
            )));
        }
        self.residuals = Some(FitGrid { x, y: residuals });
        Ok(self)
    }
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    let n = n.max(2);
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> AnalysisResult<()> {
    let file = File::create(path).map_err(|e| AnalysisError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| AnalysisError::io(path, e.into()))?;
    writer.flush().map_err(|e| AnalysisError::io(path, e))
}

pub fn write_area_json(path: &Path, report: &AreaReport) -> AnalysisResult<()> {
    write_json(path, report)
}

pub fn write_fit_json(path: &Path, fit: &FitFile) -> AnalysisResult<()> {
    write_json(path, fit)
}

/// Write equally long columns under a header row.
pub fn write_columns_csv(path: &Path, headers: &[&str], columns: &[&[f64]]) -> AnalysisResult<()> {
    if headers.len() != columns.len() {
        return Err(AnalysisError::InputShape(format!(
            "{} headers for {} columns",
            headers.len(),
            columns.len()
        )));
    }
    let rows = columns.first().map_or(0, |c| c.len());
    if columns.iter().any(|c| c.len() != rows) {
        return Err(AnalysisError::InputShape("export columns differ in length".into()));
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| match e.into_kind() {
        csv::ErrorKind::Io(source) => AnalysisError::io(path, source),
        other => AnalysisError::InputShape(format!("{}: {other:?}", path.display())),
    })?;
    let io_err = |e: csv::Error| AnalysisError::io(path, e.into());

    writer.write_record(headers).map_err(io_err)?;
    for i in 0..rows {
        writer
            .write_record(columns.iter().map(|c| c[i].to_string()))
            .map_err(io_err)?;
    }
    writer.flush().map_err(|e| AnalysisError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_file_pairs_names_with_values() {
        let fit = FitResult {
            model: FitModel::Linear,
            params: vec![2.0, 1.0],
            uncertainties: vec![0.1, f64::NAN],
            quality: FitQuality {
                sse: 0.0,
                rmse: 0.0,
                n: 5,
                iterations: 3,
            },
        };
        let file = FitFile::new(&fit, 0.0, 1.0, 3).unwrap();
        assert_eq!(file.params[0].name, "a");
        assert_eq!(file.params[1].value, 1.0);
        assert_eq!(file.grid.x, vec![0.0, 0.5, 1.0]);
        assert_eq!(file.grid.y, vec![1.0, 2.0, 3.0]);

        // NaN uncertainties serialize as null.
        let json = serde_json::to_value(&file).unwrap();
        assert!(json["params"][1]["uncertainty"].is_null());
        assert!(json.get("residuals").is_none());

        let file = file.with_residuals(vec![0.0, 1.0], vec![0.25, -0.25]).unwrap();
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["residuals"]["y"][1], -0.25);
    }

    #[test]
    fn residuals_must_pair_with_samples() {
        let fit = FitResult {
            model: FitModel::Linear,
            params: vec![1.0, 0.0],
            uncertainties: vec![0.0, 0.0],
            quality: FitQuality {
                sse: 0.0,
                rmse: 0.0,
                n: 2,
                iterations: 1,
            },
        };
        let file = FitFile::new(&fit, 0.0, 1.0, 2).unwrap();
        assert!(matches!(
            file.with_residuals(vec![0.0, 1.0], vec![0.0]),
            Err(AnalysisError::InputShape(_))
        ));
    }

    #[test]
    fn columns_must_match_headers() {
        let a = [1.0, 2.0];
        let err = write_columns_csv(Path::new("unused.csv"), &["a", "b"], &[&a]).unwrap_err();
        assert!(matches!(err, AnalysisError::InputShape(_)));
    }
}
