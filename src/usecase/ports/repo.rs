use crate::domain::entities::dataset::{DatasetId, GridData};
use crate::domain::entities::edit::{CellKey, CellValue, RowId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    #[error("{0}")]
    Storage(String),
    #[error("dataset {0} not found")]
    UnknownDataset(DatasetId),
    #[error("no cell for row {row_id} field {field}")]
    UnknownCell { row_id: RowId, field: String },
}

impl RepoError {
    pub fn storage(err: anyhow::Error) -> Self {
        RepoError::Storage(format!("{err:#}"))
    }
}

/// `save_cell` either stores the new value or fails and leaves the stored
/// dataset unchanged.
pub trait GridRepository: Send + Sync {
    fn init(&self) -> Result<(), RepoError>;

    fn list_datasets(&self) -> Result<Vec<DatasetMeta>, RepoError>;
    fn load_grid(&self, id: DatasetId) -> Result<GridData, RepoError>;
    fn create_dataset(
        &self,
        meta: NewDatasetMeta,
        data: TabularData,
    ) -> Result<DatasetId, RepoError>;
    fn save_cell(&self, id: DatasetId, write: &CellWrite) -> Result<(), RepoError>;
    fn list_cell_edits(&self, id: DatasetId) -> Result<Vec<CellEditRecord>, RepoError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetMeta {
    pub id: DatasetId,
    pub name: String,
    pub row_count: i64,
    pub source_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDatasetMeta {
    pub name: String,
    pub source_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellWrite {
    pub key: CellKey,
    pub old_value: CellValue,
    pub new_value: CellValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEditRecord {
    pub row_id: RowId,
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    pub edited_at: String,
}
