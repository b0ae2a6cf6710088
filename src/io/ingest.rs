//! Oscilloscope file and experiment-config ingest.
//!
//! Scope exports mix a free-form header (instrument settings, channel labels)
//! with numeric sample rows. Rows are classified one at a time:
//! - every field parses as a number: a sample row, appended column-wise
//! - anything else: a metadata row, kept verbatim
//!
//! Sample rows keep their field positions: an empty cell inside a sample row,
//! or a row wider or narrower than the first one, is an error rather than a
//! shifted column. Fields may be separated by commas, semicolons or tabs; the
//! separator is picked from the first line that splits into numbers.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use crate::domain::{ChannelMap, ExperimentConfig, Trace};
use crate::error::{AnalysisError, AnalysisResult};

/// Raw contents of one scope export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeFile {
    pub metadata: Vec<Vec<String>>,
    pub columns: Vec<Vec<f64>>,
    pub rows_read: usize,
}

impl ScopeFile {
    pub fn sample_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }
}

const DELIMITERS: [char; 3] = ['\t', ';', ','];

fn splits_into_numbers(line: &str, delimiter: char) -> bool {
    let mut fields = line
        .split(delimiter)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .peekable();
    fields.peek().is_some() && fields.all(|f| f.parse::<f64>().is_ok())
}

fn sniff_delimiter(text: &str) -> u8 {
    let sample_row = text.lines().find_map(|line| {
        DELIMITERS
            .into_iter()
            .find(|&d| line.contains(d) && splits_into_numbers(line, d))
    });
    // Header-only or single-column text: fall back to the first separator seen.
    let delimiter = sample_row
        .or_else(|| {
            text.lines()
                .find_map(|line| DELIMITERS.into_iter().find(|&d| line.contains(d)))
        })
        .unwrap_or(',');
    delimiter as u8
}

fn csv_error(path: &Path, err: csv::Error) -> AnalysisError {
    match err.into_kind() {
        csv::ErrorKind::Io(source) => AnalysisError::io(path, source),
        other => AnalysisError::InputShape(format!("{}: {other:?}", path.display())),
    }
}

/// Parse scope text already in memory. `origin` only labels errors.
pub fn parse_scope_text(text: &str, origin: &Path) -> AnalysisResult<ScopeFile> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .delimiter(sniff_delimiter(text))
        .from_reader(text.as_bytes());

    let mut out = ScopeFile::default();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(origin, e))?;
        out.rows_read += 1;
        let row = out.rows_read;

        let mut fields: Vec<&str> = record.iter().collect();
        while fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        if fields.is_empty() {
            continue;
        }

        let is_sample_row = fields
            .iter()
            .filter(|f| !f.is_empty())
            .all(|f| f.parse::<f64>().is_ok());
        if !is_sample_row {
            out.metadata
                .push(fields.iter().filter(|f| !f.is_empty()).map(|f| f.to_string()).collect());
            continue;
        }

        let values = fields
            .iter()
            .enumerate()
            .map(|(col, f)| {
                f.parse::<f64>().map_err(|_| {
                    AnalysisError::InputShape(format!(
                        "{}: row {row}, column {col}: empty sample",
                        origin.display()
                    ))
                })
            })
            .collect::<AnalysisResult<Vec<f64>>>()?;

        if out.columns.is_empty() {
            out.columns.resize_with(values.len(), Vec::new);
        } else if values.len() != out.columns.len() {
            return Err(AnalysisError::InputShape(format!(
                "{}: row {row} has {} samples, earlier rows have {}",
                origin.display(),
                values.len(),
                out.columns.len()
            )));
        }
        for (column, v) in out.columns.iter_mut().zip(values) {
            column.push(v);
        }
    }

    tracing::debug!(
        file = %origin.display(),
        rows = out.rows_read,
        columns = out.columns.len(),
        metadata_rows = out.metadata.len(),
        "parsed scope file"
    );
    Ok(out)
}

/// Read and classify every row of a scope export.
pub fn read_scope_file(path: &Path) -> AnalysisResult<ScopeFile> {
    let mut text = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut text))
        .map_err(|e| AnalysisError::io(path, e))?;
    parse_scope_text(&text, path)
}

/// Load a scope export as a [`Trace`] using the declared channel mapping.
pub fn load_trace(path: &Path, map: &ChannelMap) -> AnalysisResult<Trace> {
    let file = read_scope_file(path)?;
    Trace::from_columns(&file.columns, map).map_err(|e| match e {
        AnalysisError::InputShape(msg) => {
            AnalysisError::InputShape(format!("{}: {msg}", path.display()))
        }
        other => other,
    })
}

/// Read two numeric columns, e.g. time and one channel, for fitting.
pub fn load_xy(path: &Path, x_col: usize, y_col: usize) -> AnalysisResult<(Vec<f64>, Vec<f64>)> {
    let file = read_scope_file(path)?;
    let column = |idx: usize| {
        file.columns.get(idx).cloned().ok_or_else(|| {
            AnalysisError::InputShape(format!(
                "{}: column {idx} requested, file has {}",
                path.display(),
                file.columns.len()
            ))
        })
    };
    let x = column(x_col)?;
    let y = column(y_col)?;
    if x.len() != y.len() {
        return Err(AnalysisError::InputShape(format!(
            "{}: columns {x_col} and {y_col} have {} and {} samples",
            path.display(),
            x.len(),
            y.len()
        )));
    }
    Ok((x, y))
}

/// Load and validate an experiment config.
///
/// Relative trace paths are resolved against the config file's directory.
pub fn load_config(path: &Path) -> AnalysisResult<ExperimentConfig> {
    let text = fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
    let mut config = ExperimentConfig::from_json_str(&text)?;

    if let Some(base) = path.parent() {
        for state in &mut config.states {
            for p in [&mut state.signal, &mut state.leakage, &mut state.reference] {
                if p.is_relative() {
                    *p = base.join(&*p);
                }
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOPE: &str = "\
Model,DPO3034
Record Length,5
TIME,CH1,CH2
0.0,1.0,10.0
1.0,2.0,20.0

2.0,3.0,30.0
";

    #[test]
    fn separates_metadata_from_samples() {
        let file = parse_scope_text(SCOPE, Path::new("scope.csv")).unwrap();
        assert_eq!(file.metadata.len(), 3);
        assert_eq!(file.metadata[0], vec!["Model", "DPO3034"]);
        assert_eq!(file.columns.len(), 3);
        assert_eq!(file.columns[2], vec![10.0, 20.0, 30.0]);
        assert_eq!(file.sample_count(), 3);
    }

    #[test]
    fn tab_and_semicolon_separators() {
        let tabbed = parse_scope_text("0\t1\n1\t2\n", Path::new("t.txt")).unwrap();
        assert_eq!(tabbed.columns[1], vec![1.0, 2.0]);
        let semi = parse_scope_text("x;y\n0;5\n", Path::new("s.txt")).unwrap();
        assert_eq!(semi.columns[1], vec![5.0]);
    }

    #[test]
    fn empty_cell_in_sample_row_is_rejected() {
        let text = "0,1,10,100,1000\n1,2,,200,2000\n2,3,30,300,3000\n";
        let err = parse_scope_text(text, Path::new("gap.csv")).unwrap_err();
        match err {
            AnalysisError::InputShape(msg) => assert!(msg.contains("row 2, column 2"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn ragged_sample_rows_are_rejected() {
        let err = parse_scope_text("0,1,2\n1,2\n", Path::new("ragged.csv")).unwrap_err();
        assert!(matches!(err, AnalysisError::InputShape(_)));
    }

    #[test]
    fn trailing_separator_is_not_a_column() {
        let file = parse_scope_text("0,1,\n1,2,\n", Path::new("trail.csv")).unwrap();
        assert_eq!(file.columns, vec![vec![0.0, 1.0], vec![1.0, 2.0]]);
    }

    #[test]
    fn separator_comes_from_sample_rows_not_header() {
        let text = "Time, s;Volts, V\n0.0;1.5\n1.0;2.5\n";
        assert_eq!(sniff_delimiter(text), b';');
        let file = parse_scope_text(text, Path::new("semi.csv")).unwrap();
        assert_eq!(file.columns[1], vec![1.5, 2.5]);

        let tabbed = "Label,unit\n0\t7\n";
        assert_eq!(sniff_delimiter(tabbed), b'\t');
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_scope_file(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }
}
