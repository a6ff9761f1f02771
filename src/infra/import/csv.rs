use std::path::Path;

use anyhow::{Context, Result};

use crate::usecase::ports::repo::{NewDatasetMeta, TabularData};

pub fn read_csv_dataset(csv_path: &Path) -> Result<(NewDatasetMeta, TabularData)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(csv_path)
        .with_context(|| format!("failed to open csv: {}", csv_path.display()))?;
    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("failed to read headers from csv: {}", csv_path.display()))?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    if columns.is_empty() || columns[0].is_empty() {
        anyhow::bail!("csv header with a row id column is required")
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("failed to parse csv record")?;
        if record.iter().all(|value| value.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let name = csv_path
        .file_stem()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("campaigns")
        .to_string();
    let meta = NewDatasetMeta {
        name,
        source_path: csv_path.to_string_lossy().into_owned(),
    };

    Ok((meta, TabularData { columns, rows }))
}
