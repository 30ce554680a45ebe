use super::combination::{CombinationRow, CombinationTable};
use crate::error::{SizerError, SizerResult};
use crate::loader::{open_csv, parse_float, parse_id, LoadReport};
use std::path::Path;
use tracing::{debug, info, warn};

/// Finds `(case, multiplier)` column pairs: a header containing `CASE` or
/// `ID` directly followed by one containing `MULT`. Column 0 is the combined
/// case id and is never part of a pair.
pub(crate) fn component_columns(headers: &csv::StringRecord) -> Vec<(usize, usize)> {
    let names: Vec<String> = headers.iter().map(|h| h.to_ascii_uppercase()).collect();
    let mut pairs = Vec::new();
    let mut i = 1;
    while i + 1 < names.len() {
        let (cur, next) = (&names[i], &names[i + 1]);
        if (cur.contains("CASE") || cur.contains("ID")) && next.contains("MULT") {
            pairs.push((i, i + 1));
            i += 2;
        } else {
            i += 1;
        }
    }
    pairs
}

/// Reads a wide residual-strength sheet into a combination table.
pub fn load_combinations<P: AsRef<Path>>(path: P) -> SizerResult<(CombinationTable, LoadReport)> {
    let path = path.as_ref();
    let mut rdr = open_csv(path)?;
    let headers = rdr.headers()?.clone();
    let pairs = component_columns(&headers);
    if pairs.is_empty() {
        return Err(SizerError::Validation(format!(
            "'{}' has no CASE/MULT column pairs",
            path.display()
        )));
    }

    let mut rows = Vec::new();
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
        let Some(id) = rec.get(0).and_then(parse_id) else {
            report.rows_skipped += 1;
            continue;
        };

        let components: Vec<_> = pairs
            .iter()
            .filter_map(|&(c, m)| {
                let case = rec.get(c).and_then(parse_id)?;
                let mult = rec.get(m).and_then(parse_float)?;
                Some((case, mult))
            })
            .collect();

        if components.is_empty() {
            debug!("[Row {}] Combination {} has no components", idx + 2, id);
            report.rows_skipped += 1;
            continue;
        }
        rows.push(CombinationRow { id, components });
    }

    if report.rows_skipped > 0 {
        warn!(
            "⚠️  Skipped {} of {} combination rows in '{}'",
            report.rows_skipped,
            report.rows_read,
            path.display()
        );
    }
    info!("📂 Loaded {} load combinations", rows.len());
    Ok((CombinationTable::new(rows), report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_columns_pairs_case_with_mult() {
        let headers = csv::StringRecord::from(vec![
            "Combined", "Case1", "Mult1", "Note", "LC_ID2", "MULT2", "Case3",
        ]);
        assert_eq!(component_columns(&headers), vec![(1, 2), (4, 5)]);
    }
}
