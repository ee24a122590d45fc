use super::{ExportBundle, HEADER, ResourceSheet};
use polars::prelude::*;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("dataframe conversion error: {0}")]
    DataFrame(#[from] PolarsError),
}

pub type ExportResult<T> = Result<T, ExportError>;

impl ResourceSheet {
    /// The sheet as a table with the export header as column names.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let sequence: Vec<Option<i64>> = self
            .rows
            .iter()
            .map(|row| row.sequence_number.map(|n| n as i64))
            .collect();
        let names: Vec<String> = self.rows.iter().map(|row| row.item_name.clone()).collect();
        let units: Vec<String> = self.rows.iter().map(|row| row.unit.clone()).collect();
        let quantities: Vec<Option<i64>> = self
            .rows
            .iter()
            .map(|row| row.quantity.map(|q| i64::try_from(q).unwrap_or(i64::MAX)))
            .collect();
        let prices: Vec<Option<f64>> = self
            .rows
            .iter()
            .map(|row| row.unit_price.map(|p| p.as_f64()))
            .collect();
        let totals: Vec<f64> = self.rows.iter().map(|row| row.line_total.as_f64()).collect();

        df!(
            HEADER[0] => sequence,
            HEADER[1] => names,
            HEADER[2] => units,
            HEADER[3] => quantities,
            HEADER[4] => prices,
            HEADER[5] => totals
        )
    }

    fn csv_records(&self) -> Vec<[String; 6]> {
        let mut records = Vec::with_capacity(self.rows.len() + 2);
        records.push([
            self.title.clone(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ]);
        records.push(HEADER.map(str::to_string));
        for row in &self.rows {
            records.push([
                row.sequence_number.map(|n| n.to_string()).unwrap_or_default(),
                row.item_name.clone(),
                row.unit.clone(),
                row.quantity.map(|q| q.to_string()).unwrap_or_default(),
                row.unit_price.map(|p| p.to_string()).unwrap_or_default(),
                row.line_total.to_string(),
            ]);
        }
        records
    }
}

fn sanitize_file_component(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Writes one CSV per sheet into `<dir>/<file stem>/` and returns the paths
/// in sheet order. Each file starts with a title row and the header row.
pub fn write_sheets_to_csv<P: AsRef<Path>>(
    dir: P,
    bundle: &ExportBundle,
) -> ExportResult<Vec<PathBuf>> {
    let target = dir.as_ref().join(sanitize_file_component(&bundle.file_stem));
    fs::create_dir_all(&target)?;

    let mut written = Vec::new();
    for (idx, sheet) in bundle.all_sheets().enumerate() {
        let path = target.join(format!(
            "{:02} - {}.csv",
            idx + 1,
            sanitize_file_component(&sheet.title)
        ));
        let file = File::create(&path)?;
        let mut writer = csv::Writer::from_writer(file);
        for record in sheet.csv_records() {
            writer.write_record(&record)?;
        }
        writer.flush()?;
        written.push(path);
    }
    info!(dir = %target.display(), files = written.len(), "export written");
    Ok(written)
}

pub fn save_export_to_json<P: AsRef<Path>>(bundle: &ExportBundle, path: P) -> ExportResult<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, bundle)?;
    info!(path = %path.as_ref().display(), "export written");
    Ok(())
}
