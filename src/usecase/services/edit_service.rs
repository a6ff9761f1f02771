use std::sync::Arc;

use crate::domain::entities::dataset::{DatasetId, GridData};
use crate::domain::entities::edit::{CellKey, CellValue, PendingChange};
use crate::domain::grid::controller::EditableGridController;
use crate::domain::policy::{EditPolicy, ValidationError};
use crate::usecase::ports::repo::{CellWrite, GridRepository, RepoError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("儲存失敗：{0}")]
    Save(#[source] RepoError),
    #[error("找不到儲存格 {0}")]
    UnknownCell(CellKey),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Unchanged,
    AwaitingConfirmation,
    Saved(CellKey),
}

pub struct EditService {
    repo: Arc<dyn GridRepository>,
    policy: EditPolicy,
}

impl EditService {
    pub fn new(repo: Arc<dyn GridRepository>, policy: EditPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn begin_edit(
        &self,
        controller: &mut EditableGridController,
        grid: &GridData,
        key: CellKey,
    ) -> Result<(), EditError> {
        if self.policy.read_only_fields.contains(&key.field) {
            return Err(ValidationError::ReadOnly { field: key.field }.into());
        }
        let Some(current) = grid.value(&key) else {
            return Err(EditError::UnknownCell(key));
        };
        if controller.scratch_value(&key).is_none() {
            controller.set_scratch_value(key.clone(), CellValue::Text(current.to_string()));
        }
        controller.start_edit(key);
        Ok(())
    }

    pub fn update_input(&self, controller: &mut EditableGridController, key: CellKey, raw: String) {
        controller.set_scratch_value(key, CellValue::Text(raw));
    }

    pub fn commit_cell(
        &self,
        dataset_id: DatasetId,
        grid: &mut GridData,
        controller: &mut EditableGridController,
        key: &CellKey,
    ) -> Result<CommitOutcome, EditError> {
        let Some(raw) = controller.scratch_value(key).map(ToString::to_string) else {
            controller.cancel_edit();
            return Ok(CommitOutcome::Unchanged);
        };
        let Some(old_value) = grid.value(key).cloned() else {
            controller.cancel_edit();
            return Err(EditError::UnknownCell(key.clone()));
        };

        let new_value = self.policy.validate(&key.field, &raw)?;

        if new_value == old_value {
            controller.cancel_edit();
            return Ok(CommitOutcome::Unchanged);
        }

        if self
            .policy
            .requires_confirmation(&key.field, &old_value, &new_value)
        {
            log::debug!("{key}: {old_value} -> {new_value} needs confirmation");
            controller.propose_change(PendingChange {
                key: key.clone(),
                new_value,
                old_value,
            });
            return Ok(CommitOutcome::AwaitingConfirmation);
        }

        self.save(
            dataset_id,
            grid,
            controller,
            CellWrite {
                key: key.clone(),
                old_value,
                new_value,
            },
        )?;
        Ok(CommitOutcome::Saved(key.clone()))
    }

    pub fn confirm_pending(
        &self,
        dataset_id: DatasetId,
        grid: &mut GridData,
        controller: &mut EditableGridController,
    ) -> Result<Option<CellKey>, EditError> {
        let Some(change) = controller.pending_change().cloned() else {
            return Ok(None);
        };
        let key = change.key.clone();
        self.save(
            dataset_id,
            grid,
            controller,
            CellWrite {
                key: change.key,
                old_value: change.old_value,
                new_value: change.new_value,
            },
        )?;
        Ok(Some(key))
    }

    pub fn cancel(&self, controller: &mut EditableGridController) {
        controller.cancel_edit();
    }

    pub fn reload(
        &self,
        dataset_id: DatasetId,
        controller: &mut EditableGridController,
    ) -> Result<GridData, RepoError> {
        let grid = self.repo.load_grid(dataset_id)?;
        controller.reset();
        Ok(grid)
    }

    fn save(
        &self,
        dataset_id: DatasetId,
        grid: &mut GridData,
        controller: &mut EditableGridController,
        write: CellWrite,
    ) -> Result<(), EditError> {
        match self.repo.save_cell(dataset_id, &write) {
            Ok(()) => {
                grid.set_value(&write.key, write.new_value);
                controller.confirm_edit();
                Ok(())
            }
            Err(err) => {
                log::warn!("dataset {dataset_id}: saving {} failed: {err}", write.key);
                controller.cancel_edit();
                Err(EditError::Save(err))
            }
        }
    }
}
