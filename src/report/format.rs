//! Plain-text summaries printed by the `tpa` binary.

use crate::domain::{EdgeSet, FitModel, FitResult, PulseSpacing};
use crate::error::AnalysisResult;
use crate::io::AreaReport;

use super::best_fit;

/// Header, per-model diagnostics and the best model's parameters.
pub fn format_fit_summary(source: &str, n_points: usize, fits: &[(FitModel, AnalysisResult<FitResult>)]) -> String {
    let mut out = String::new();

    out.push_str("=== tpa - curve fit ===\n");
    out.push_str(&format!("Source: {source}\n"));
    out.push_str(&format!("Points: n={n_points}\n"));

    let best = best_fit(fits.iter().filter_map(|(_, r)| r.as_ref().ok()));

    out.push_str("\nModel diagnostics:\n");
    for (model, result) in fits {
        match result {
            Ok(fit) => {
                let chosen = if best.is_some_and(|b| std::ptr::eq(b, fit)) { "*" } else { " " };
                out.push_str(&format!(
                    "{chosen} {:<26} SSE={:.4e} RMSE={:.4e} iter={}\n",
                    truncate(&model.display_name(), 26),
                    fit.quality.sse,
                    fit.quality.rmse,
                    fit.quality.iterations
                ));
            }
            Err(e) => out.push_str(&format!("  (failed {}) {e}\n", model.display_name())),
        }
    }

    if let Some(best) = best {
        out.push_str(&format!("\nBest model: {}\n", best.model.display_name()));
        out.push_str(&format_fit_params(best));
    }
    out
}

/// One line per parameter: `name = value ± uncertainty`.
pub fn format_fit_params(fit: &FitResult) -> String {
    let mut out = String::new();
    for (name, (value, err)) in fit
        .model
        .param_names()
        .iter()
        .zip(fit.params.iter().zip(&fit.uncertainties))
    {
        out.push_str(&format!("  {name:<8} = {} ± {}\n", fmt_value(*value), fmt_value(*err)));
    }
    if fit.covariance_is_singular() {
        out.push_str("  (covariance singular: uncertainties undefined)\n");
    }
    out
}

/// Area and ratio table, one row per state key.
pub fn format_area_summary(report: &AreaReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== tpa - pulse areas ({}) ===\n", report.generated.format("%Y-%m-%d %H:%M:%S UTC")));
    out.push_str(format!("{:<16} {:>14} {:>14}\n", "state", "area", "ratio").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<16} {:-<14} {:-<14}\n", "", "", "").trim_end());
    out.push('\n');
    for (key, area) in &report.area {
        let ratio = report.ratio.get(key).copied().map(fmt_value).unwrap_or_default();
        out.push_str(format!("{:<16} {:>14} {:>14}\n", truncate(key, 16), fmt_value(*area), ratio).trim_end());
        out.push('\n');
    }
    out
}

/// Edge indices, with their times when available.
pub fn format_edges(edges: &EdgeSet, time: Option<&[f64]>) -> String {
    let mut out = format!("Edges ({:?}): {}\n", edges.mode, edges.len());
    for &i in &edges.indices {
        match time.and_then(|t| t.get(i)) {
            Some(t) => out.push_str(&format!("  index {i:>8}  t = {}\n", fmt_value(*t))),
            None => out.push_str(&format!("  index {i:>8}\n")),
        }
    }
    out
}

pub fn format_spacing(spacing: &PulseSpacing) -> String {
    let mut out = format!("Pulse centres: {} and {}\n", spacing.centres[0], spacing.centres[1]);
    if let Some(tau) = spacing.tau {
        out.push_str(&format!("Separation: {}\n", fmt_value(tau)));
    }
    out
}

fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    let mag = v.abs();
    if mag != 0.0 && !(1e-3..1e4).contains(&mag) {
        format!("{v:.6e}")
    } else {
        format!("{v:.6}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EdgeMode, FitQuality};
    use crate::error::AnalysisError;

    fn fit(model: FitModel, params: Vec<f64>, sse: f64) -> FitResult {
        let n = params.len();
        FitResult {
            model,
            params,
            uncertainties: vec![0.01; n],
            quality: FitQuality {
                sse,
                rmse: sse.sqrt(),
                n: 10,
                iterations: 4,
            },
        }
    }

    #[test]
    fn summary_marks_best_and_lists_failures() {
        let fits = vec![
            (FitModel::Linear, Ok(fit(FitModel::Linear, vec![1.0, 2.0], 0.5))),
            (FitModel::ExpDecay, Ok(fit(FitModel::ExpDecay, vec![1.0, 2.0, 0.1], 0.1))),
            (
                FitModel::Gaussian,
                Err(AnalysisError::FitConvergence("stalled".into())),
            ),
        ];
        let text = format_fit_summary("scope.csv", 10, &fits);
        assert!(text.contains("* exponential decay"));
        assert!(text.contains("  linear"));
        assert!(text.contains("(failed Gaussian)"));
        assert!(text.contains("Best model: exponential decay"));
        assert!(text.contains("t1"));
    }

    #[test]
    fn singular_covariance_is_flagged() {
        let mut f = fit(FitModel::Linear, vec![1.0, 2.0], 0.0);
        f.uncertainties = vec![f64::NAN, f64::NAN];
        let text = format_fit_params(&f);
        assert!(text.contains("nan"));
        assert!(text.contains("covariance singular"));
    }

    #[test]
    fn edges_list_times() {
        let edges = EdgeSet {
            mode: EdgeMode::Both,
            indices: vec![1, 3],
        };
        let text = format_edges(&edges, Some(&[0.0, 0.5, 1.0, 1.5]));
        assert!(text.contains("Edges (Both): 2"));
        assert!(text.contains("t = 1.500000"));
    }

    #[test]
    fn values_switch_to_scientific_notation() {
        assert_eq!(fmt_value(2.5), "2.500000");
        assert_eq!(fmt_value(2.5e-9), "2.500000e-9");
        assert_eq!(fmt_value(0.0), "0.000000");
    }
}
