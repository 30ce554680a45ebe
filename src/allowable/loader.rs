use super::{AllowableSample, FitTarget};
use crate::error::{SizerError, SizerResult};
use crate::loader::{column, open_csv, parse_float, parse_id, required_column, LoadReport};
use std::path::Path;
use tracing::{debug, info, warn};

/// Reads `level,id,thickness,allowable[,element_type]` rows, `level` being
/// `property` or `element`.
pub fn load_allowables<P: AsRef<Path>>(path: P) -> SizerResult<(Vec<AllowableSample>, LoadReport)> {
    let path = path.as_ref();
    let mut rdr = open_csv(path)?;
    let headers = rdr.headers()?.clone();
    let level_col = required_column(&headers, "level", path)?;
    let id_col = required_column(&headers, "id", path)?;
    let t_col = required_column(&headers, "thickness", path)?;
    let a_col = required_column(&headers, "allowable", path)?;
    let type_col = column(&headers, "element_type");

    let mut samples = Vec::new();
    let mut report = LoadReport::default();

    for (idx, result) in rdr.records().enumerate() {
        report.rows_read += 1;
        let rec = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("[Row {}] CSV parse error: {}", idx + 2, e);
                report.rows_skipped += 1;
                continue;
            }
        };

        let parsed = (|| {
            let id = parse_id(rec.get(id_col)?)?;
            let target = match rec.get(level_col)?.to_ascii_lowercase().as_str() {
                "property" | "prop" | "pid" => FitTarget::Property(id),
                "element" | "elem" | "eid" => FitTarget::Element(id),
                _ => return None,
            };
            let thickness = parse_float(rec.get(t_col)?)?;
            let allowable = parse_float(rec.get(a_col)?)?;
            let element_type = type_col
                .and_then(|c| rec.get(c))
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            Some(AllowableSample {
                target,
                thickness,
                allowable,
                element_type,
            })
        })();

        match parsed {
            Some(s) => samples.push(s),
            None => {
                debug!("[Row {}] Unparseable allowable row skipped", idx + 2);
                report.rows_skipped += 1;
            }
        }
    }

    if samples.is_empty() && report.rows_read > 0 {
        return Err(SizerError::Validation(format!(
            "'{}' contains no usable allowable rows",
            path.display()
        )));
    }
    if report.rows_skipped > 0 {
        warn!(
            "⚠️  Skipped {} of {} allowable rows in '{}'",
            report.rows_skipped,
            report.rows_read,
            path.display()
        );
    }
    info!("📂 Loaded {} allowable samples", samples.len());
    Ok((samples, report))
}
