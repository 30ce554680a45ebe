use rfsizer::optimizer::{IterationRecord, TrainingSample};
use rfsizer::SizerResult;
use std::path::Path;

pub fn write_history_csv(path: &Path, history: &[IterationRecord]) -> SizerResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for record in history {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row per real evaluation with one column per property.
pub fn write_training_csv(path: &Path, samples: &[TrainingSample]) -> SizerResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let ids: Vec<u32> = samples.first().map(|s| s.design.ids().collect()).unwrap_or_default();

    let mut header = vec!["min_rf".to_string(), "weight".to_string()];
    header.extend(ids.iter().map(|id| format!("p{}", id)));
    wtr.write_record(&header)?;

    for s in samples {
        let mut row = vec![s.min_rf.to_string(), s.weight.to_string()];
        row.extend(
            ids.iter()
                .map(|&id| s.design.get(id).map_or(String::new(), |v| v.to_string())),
        );
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}
