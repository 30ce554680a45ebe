use crate::error::{SizerError, SizerResult};
use serde::Serialize;
use std::fs::File;
use std::path::Path;

/// Row accounting for a CSV load. Rows that fail to parse are skipped and
/// counted here instead of aborting the load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
}

impl LoadReport {
    pub fn accepted(&self) -> usize {
        self.rows_read - self.rows_skipped
    }
}

pub(crate) fn open_csv(path: &Path) -> SizerResult<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| {
        SizerError::Io(std::io::Error::new(
            e.kind(),
            format!("could not open '{}': {}", path.display(), e),
        ))
    })?;
    Ok(csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

/// Looks up a header by case-insensitive name.
pub(crate) fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

pub(crate) fn required_column(headers: &csv::StringRecord, name: &str, path: &Path) -> SizerResult<usize> {
    column(headers, name).ok_or_else(|| {
        SizerError::Validation(format!(
            "'{}' has no '{}' column (found: {})",
            path.display(),
            name,
            headers.iter().collect::<Vec<_>>().join(", ")
        ))
    })
}

/// Integer ids sometimes arrive as `"1001.0"` from spreadsheet exports.
pub(crate) fn parse_id(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<u32>() {
        return Some(v);
    }
    let f: f64 = raw.parse().ok()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 {
        Some(f as u32)
    } else {
        None
    }
}

pub(crate) fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
