use std::path::PathBuf;

use crate::domain::entities::dataset::{DatasetId, GridData};
use crate::infra::sqlite::queries::{
    create_dataset_from_rows, dataset_exists, list_cell_edits, list_datasets, load_grid,
    update_cell,
};
use crate::infra::sqlite::schema::init_db;
use crate::usecase::ports::repo::{
    CellEditRecord, CellWrite, DatasetMeta, GridRepository, NewDatasetMeta, RepoError,
    TabularData,
};

pub struct SqliteRepo {
    pub db_path: PathBuf,
}

impl SqliteRepo {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    fn require_dataset(&self, id: DatasetId) -> Result<(), RepoError> {
        match dataset_exists(&self.db_path, id.0) {
            Ok(true) => Ok(()),
            Ok(false) => Err(RepoError::UnknownDataset(id)),
            Err(err) => Err(RepoError::storage(err)),
        }
    }
}

impl GridRepository for SqliteRepo {
    fn init(&self) -> Result<(), RepoError> {
        init_db(&self.db_path).map_err(RepoError::storage)
    }

    fn list_datasets(&self) -> Result<Vec<DatasetMeta>, RepoError> {
        list_datasets(&self.db_path).map_err(RepoError::storage)
    }

    fn load_grid(&self, id: DatasetId) -> Result<GridData, RepoError> {
        self.require_dataset(id)?;
        load_grid(&self.db_path, id.0).map_err(RepoError::storage)
    }

    fn create_dataset(
        &self,
        meta: NewDatasetMeta,
        data: TabularData,
    ) -> Result<DatasetId, RepoError> {
        let dataset_id = create_dataset_from_rows(
            &self.db_path,
            &meta.name,
            &meta.source_path,
            &data.columns,
            &data.rows,
        )
        .map_err(RepoError::storage)?;

        Ok(DatasetId(dataset_id))
    }

    fn save_cell(&self, id: DatasetId, write: &CellWrite) -> Result<(), RepoError> {
        self.require_dataset(id)?;
        let updated = update_cell(
            &self.db_path,
            id.0,
            &write.key.row_id.to_string(),
            &write.key.field,
            &write.old_value.to_string(),
            &write.new_value.to_string(),
        )
        .map_err(RepoError::storage)?;

        if !updated {
            return Err(RepoError::UnknownCell {
                row_id: write.key.row_id.clone(),
                field: write.key.field.clone(),
            });
        }
        log::info!("dataset {id}: saved {}", write.key);
        Ok(())
    }

    fn list_cell_edits(&self, id: DatasetId) -> Result<Vec<CellEditRecord>, RepoError> {
        self.require_dataset(id)?;
        list_cell_edits(&self.db_path, id.0).map_err(RepoError::storage)
    }
}
