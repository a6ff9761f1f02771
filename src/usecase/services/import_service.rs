use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::infra::import::csv::read_csv_dataset;
use crate::usecase::ports::repo::GridRepository;
use crate::ImportResult;

pub struct ImportService {
    repo: Arc<dyn GridRepository>,
}

impl ImportService {
    pub fn new(repo: Arc<dyn GridRepository>) -> Self {
        Self { repo }
    }

    pub fn import_csv(&self, path: &Path) -> Result<ImportResult> {
        let (meta, data) = read_csv_dataset(path)?;
        let row_count = data.rows.len() as i64;
        let dataset_id = self
            .repo
            .create_dataset(meta, data)
            .with_context(|| format!("failed to import csv: {}", path.display()))?;
        log::info!(
            "imported {row_count} rows from {} as dataset {dataset_id}",
            path.display()
        );

        Ok(ImportResult {
            dataset_id: dataset_id.0,
            row_count,
        })
    }
}
