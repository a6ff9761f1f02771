use std::sync::Arc;

use crate::domain::entities::dataset::DatasetId;
use crate::usecase::ports::repo::{CellEditRecord, DatasetMeta, GridRepository, RepoError};

pub struct QueryService {
    repo: Arc<dyn GridRepository>,
}

impl QueryService {
    pub fn new(repo: Arc<dyn GridRepository>) -> Self {
        Self { repo }
    }

    pub fn list_datasets(&self) -> Result<Vec<DatasetMeta>, RepoError> {
        self.repo.list_datasets()
    }

    pub fn cell_history(&self, dataset_id: DatasetId) -> Result<Vec<CellEditRecord>, RepoError> {
        self.repo.list_cell_edits(dataset_id)
    }
}
