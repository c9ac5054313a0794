use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use logsift_common::{LogRecord, DATASET_COLUMNS};
use tracing::info;

use crate::error::Result;

/// Write parsed records to the intermediate CSV dataset.
///
/// The header row is always written, even for an empty batch, so the
/// analysis node can tell "empty dataset" apart from "wrong file".
pub fn write_dataset<P: AsRef<Path>>(path: P, records: &[LogRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path.as_ref())?;

    writer.write_record(DATASET_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!(
        rows = records.len(),
        path = %path.as_ref().display(),
        "Dataset written"
    );
    Ok(())
}

/// Read raw log lines from a local file, one line per row
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    let lines = reader.lines().collect::<std::io::Result<Vec<String>>>()?;
    Ok(lines)
}
