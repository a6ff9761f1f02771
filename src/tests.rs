use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use tempfile::TempDir;

use crate::domain::entities::dataset::{DatasetId, GridData};
use crate::domain::entities::edit::{CellKey, CellValue, RowId};
use crate::domain::grid::controller::{EditableGridController, GridPhase};
use crate::domain::policy::{EditPolicy, ValidationError};
use crate::infra::sqlite::queries::{create_dataset_from_rows, list_datasets, load_grid};
use crate::infra::sqlite::repo::SqliteRepo;
use crate::infra::sqlite::schema::init_db;
use crate::usecase::ports::repo::{
    CellEditRecord, CellWrite, DatasetMeta, GridRepository, NewDatasetMeta, RepoError,
    TabularData,
};
use crate::usecase::services::edit_service::{CommitOutcome, EditError, EditService};
use crate::usecase::services::import_service::ImportService;
use crate::usecase::services::query_service::QueryService;

const CAMPAIGNS_CSV: &str = "id,name,platform,budget,bid\n\
42,Spring Sale,Google,3000,1.25\n\
43,Summer Push,Meta,\"1,200\",0.56789\n";

struct Fixture {
    _temp_dir: TempDir,
    db_path: PathBuf,
    dataset_id: DatasetId,
}

fn seed_campaigns() -> Fixture {
    let temp_dir = tempfile::tempdir().expect("should create temp dir");
    let db_path = temp_dir.path().join("app.sqlite");
    let csv_path = temp_dir.path().join("campaigns.csv");
    fs::write(&csv_path, CAMPAIGNS_CSV).expect("should write csv fixture");

    let imported = import_service_for(&db_path)
        .import_csv(&csv_path)
        .expect("import should succeed");

    Fixture {
        _temp_dir: temp_dir,
        db_path,
        dataset_id: DatasetId(imported.dataset_id),
    }
}

fn import_service_for(db_path: &Path) -> ImportService {
    ImportService::new(Arc::new(SqliteRepo::new(db_path.to_path_buf())))
}

fn edit_service_for(db_path: &Path) -> EditService {
    EditService::new(
        Arc::new(SqliteRepo::new(db_path.to_path_buf())),
        EditPolicy::default(),
    )
}

fn stored_value(db_path: &Path, dataset_id: DatasetId, key: &CellKey) -> Option<CellValue> {
    load_grid(db_path, dataset_id.0)
        .expect("grid should load")
        .value(key)
        .cloned()
}

fn budget_key() -> CellKey {
    CellKey::new(42_i64, "budget")
}

struct FailingSaves {
    inner: SqliteRepo,
}

impl GridRepository for FailingSaves {
    fn init(&self) -> Result<(), RepoError> {
        self.inner.init()
    }

    fn list_datasets(&self) -> Result<Vec<DatasetMeta>, RepoError> {
        self.inner.list_datasets()
    }

    fn load_grid(&self, id: DatasetId) -> Result<GridData, RepoError> {
        self.inner.load_grid(id)
    }

    fn create_dataset(
        &self,
        meta: NewDatasetMeta,
        data: TabularData,
    ) -> Result<DatasetId, RepoError> {
        self.inner.create_dataset(meta, data)
    }

    fn save_cell(&self, _id: DatasetId, _write: &CellWrite) -> Result<(), RepoError> {
        Err(RepoError::Storage("database is locked".to_string()))
    }

    fn list_cell_edits(&self, id: DatasetId) -> Result<Vec<CellEditRecord>, RepoError> {
        self.inner.list_cell_edits(id)
    }
}

#[test]
fn init_db_creates_required_tables() {
    let temp_dir = tempfile::tempdir().expect("should create temp dir");
    let db_path = temp_dir.path().join("nested").join("app.sqlite");

    let result = init_db(&db_path);

    assert!(result.is_ok(), "init_db should succeed: {result:?}");

    let conn = Connection::open(&db_path).expect("should open sqlite db");
    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('dataset','column_name','cell','cell_edit')",
            [],
            |row| row.get(0),
        )
        .expect("table count query should succeed");

    assert_eq!(table_count, 4, "required tables should exist");
}

#[test]
fn import_creates_dataset_with_rows_keyed_by_id() {
    let fixture = seed_campaigns();

    let datasets = list_datasets(&fixture.db_path).expect("should list datasets");
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].name, "campaigns");
    assert_eq!(datasets[0].row_count, 2);

    let grid = load_grid(&fixture.db_path, fixture.dataset_id.0).expect("grid should load");
    assert_eq!(grid.id_column(), Some("id"));
    assert_eq!(grid.rows[0].id, RowId::Int(42));
    assert_eq!(
        grid.value(&CellKey::new(43_i64, "budget")),
        Some(&CellValue::Number(1200.0))
    );
    assert_eq!(
        grid.value(&CellKey::new(42_i64, "name")),
        Some(&CellValue::Text("Spring Sale".to_string()))
    );
}

#[test]
fn import_service_reads_text_row_ids() {
    let temp_dir = tempfile::tempdir().expect("should create temp dir");
    let db_path = temp_dir.path().join("app.sqlite");
    let csv_path = temp_dir.path().join("ads.csv");
    fs::write(&csv_path, "ad_id,headline\ncmp-1,Hello\n\ncmp-2,World\n")
        .expect("should write csv fixture");

    let imported = import_service_for(&db_path)
        .import_csv(&csv_path)
        .expect("import should succeed");

    assert_eq!(imported.row_count, 2, "blank lines should be skipped");
    let grid = load_grid(&db_path, imported.dataset_id).expect("grid should load");
    assert_eq!(grid.rows[1].id, RowId::Text("cmp-2".to_string()));
}

#[test]
fn import_rejects_duplicate_row_ids() {
    let temp_dir = tempfile::tempdir().expect("should create temp dir");
    let db_path = temp_dir.path().join("app.sqlite");
    let csv_path = temp_dir.path().join("dupes.csv");
    fs::write(&csv_path, "id,budget\n7,10\n007,20\n").expect("should write csv fixture");

    let err = import_service_for(&db_path)
        .import_csv(&csv_path)
        .expect_err("duplicate ids must fail");

    assert!(
        format!("{err:#}").contains("duplicate row id: 7"),
        "unexpected error: {err:#}"
    );
}

#[test]
fn import_rejects_duplicate_column_names() {
    let temp_dir = tempfile::tempdir().expect("should create temp dir");
    let db_path = temp_dir.path().join("app.sqlite");
    let csv_path = temp_dir.path().join("dupes.csv");
    fs::write(&csv_path, "id,budget, budget\n1,10,20\n").expect("should write csv fixture");

    let err = import_service_for(&db_path)
        .import_csv(&csv_path)
        .expect_err("duplicate columns must fail");

    assert!(
        format!("{err:#}").contains("duplicate column name: budget"),
        "unexpected error: {err:#}"
    );
    assert!(list_datasets(&db_path).unwrap_or_default().is_empty());
}

#[test]
fn create_dataset_pads_short_rows() {
    let temp_dir = tempfile::tempdir().expect("should create temp dir");
    let db_path = temp_dir.path().join("app.sqlite");

    let dataset_id = create_dataset_from_rows(
        &db_path,
        "sample",
        "sample.csv",
        &["id".to_string(), "name".to_string(), "budget".to_string()],
        &[vec!["1".to_string(), "Only name".to_string()]],
    )
    .expect("dataset should be created");

    let grid = load_grid(&db_path, dataset_id).expect("grid should load");
    assert_eq!(
        grid.value(&CellKey::new(1_i64, "budget")),
        Some(&CellValue::Empty)
    );
}

#[test]
fn save_cell_updates_value_and_records_history() {
    let fixture = seed_campaigns();
    let repo = SqliteRepo::new(fixture.db_path.clone());

    repo.save_cell(
        fixture.dataset_id,
        &CellWrite {
            key: budget_key(),
            old_value: CellValue::Number(3000.0),
            new_value: CellValue::Number(3100.0),
        },
    )
    .expect("save should succeed");

    assert_eq!(
        stored_value(&fixture.db_path, fixture.dataset_id, &budget_key()),
        Some(CellValue::Number(3100.0))
    );
    let history = repo
        .list_cell_edits(fixture.dataset_id)
        .expect("history should load");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].row_id, RowId::Int(42));
    assert_eq!(history[0].old_value, "3000");
    assert_eq!(history[0].new_value, "3100");
    assert!(!history[0].edited_at.is_empty());
}

#[test]
fn save_cell_reports_unknown_targets() {
    let fixture = seed_campaigns();
    let repo = SqliteRepo::new(fixture.db_path.clone());
    let write = |key: CellKey| CellWrite {
        key,
        old_value: CellValue::Empty,
        new_value: CellValue::Number(1.0),
    };

    assert_eq!(
        repo.save_cell(fixture.dataset_id, &write(CellKey::new(99_i64, "budget"))),
        Err(RepoError::UnknownCell {
            row_id: RowId::Int(99),
            field: "budget".to_string()
        })
    );
    assert!(matches!(
        repo.save_cell(fixture.dataset_id, &write(CellKey::new(42_i64, "id"))),
        Err(RepoError::UnknownCell { .. })
    ));
    assert_eq!(
        repo.save_cell(DatasetId(999), &write(budget_key())),
        Err(RepoError::UnknownDataset(DatasetId(999)))
    );
    assert!(repo
        .list_cell_edits(fixture.dataset_id)
        .expect("history should load")
        .is_empty());
}

#[test]
fn small_change_saves_without_confirmation() {
    let fixture = seed_campaigns();
    let service = edit_service_for(&fixture.db_path);
    let mut controller = EditableGridController::new();
    let mut grid = service
        .reload(fixture.dataset_id, &mut controller)
        .expect("grid should load");
    let bid_key = CellKey::new(42_i64, "bid");

    service
        .begin_edit(&mut controller, &grid, bid_key.clone())
        .expect("edit should start");
    service.update_input(&mut controller, bid_key.clone(), "1.5".to_string());
    let outcome = service
        .commit_cell(fixture.dataset_id, &mut grid, &mut controller, &bid_key)
        .expect("commit should succeed");

    assert_eq!(outcome, CommitOutcome::Saved(bid_key.clone()));
    assert!(controller.is_idle());
    assert_eq!(grid.value(&bid_key), Some(&CellValue::Number(1.5)));
    assert_eq!(
        stored_value(&fixture.db_path, fixture.dataset_id, &bid_key),
        Some(CellValue::Number(1.5))
    );
}

#[test]
fn reopening_precise_value_without_typing_is_unchanged() {
    let fixture = seed_campaigns();
    let service = edit_service_for(&fixture.db_path);
    let mut controller = EditableGridController::new();
    let mut grid = service
        .reload(fixture.dataset_id, &mut controller)
        .expect("grid should load");
    let bid_key = CellKey::new(43_i64, "bid");

    service
        .begin_edit(&mut controller, &grid, bid_key.clone())
        .expect("edit should start");
    assert_eq!(
        controller.scratch_value(&bid_key),
        Some(&CellValue::Text("0.56789".to_string()))
    );
    let outcome = service
        .commit_cell(fixture.dataset_id, &mut grid, &mut controller, &bid_key)
        .expect("commit should succeed");

    assert_eq!(outcome, CommitOutcome::Unchanged);
    assert!(controller.is_idle());
    assert_eq!(
        stored_value(&fixture.db_path, fixture.dataset_id, &bid_key),
        Some(CellValue::Number(0.56789))
    );
    assert!(SqliteRepo::new(fixture.db_path.clone())
        .list_cell_edits(fixture.dataset_id)
        .expect("history should load")
        .is_empty());
}

#[test]
fn saved_value_matches_store_after_reload() {
    let fixture = seed_campaigns();
    let service = edit_service_for(&fixture.db_path);
    let mut controller = EditableGridController::new();
    let mut grid = service
        .reload(fixture.dataset_id, &mut controller)
        .expect("grid should load");
    let bid_key = CellKey::new(43_i64, "bid");

    service
        .begin_edit(&mut controller, &grid, bid_key.clone())
        .expect("edit should start");
    service.update_input(&mut controller, bid_key.clone(), "0.123456".to_string());
    let outcome = service
        .commit_cell(fixture.dataset_id, &mut grid, &mut controller, &bid_key)
        .expect("commit should succeed");

    assert_eq!(outcome, CommitOutcome::Saved(bid_key.clone()));
    assert_eq!(grid.value(&bid_key), Some(&CellValue::Number(0.123456)));
    assert_eq!(
        stored_value(&fixture.db_path, fixture.dataset_id, &bid_key).as_ref(),
        grid.value(&bid_key)
    );

    let reloaded = service
        .reload(fixture.dataset_id, &mut controller)
        .expect("grid should reload");
    assert_eq!(reloaded, grid);
}

#[test]
fn large_budget_change_waits_for_confirmation() {
    let fixture = seed_campaigns();
    let service = edit_service_for(&fixture.db_path);
    let mut controller = EditableGridController::new();
    let mut grid = service
        .reload(fixture.dataset_id, &mut controller)
        .expect("grid should load");

    service
        .begin_edit(&mut controller, &grid, budget_key())
        .expect("edit should start");
    service.update_input(&mut controller, budget_key(), "5,000".to_string());
    let outcome = service
        .commit_cell(fixture.dataset_id, &mut grid, &mut controller, &budget_key())
        .expect("commit should succeed");

    assert_eq!(outcome, CommitOutcome::AwaitingConfirmation);
    let pending = controller.pending_change().expect("change should be pending");
    assert_eq!(pending.new_value, CellValue::Number(5000.0));
    assert_eq!(pending.old_value, CellValue::Number(3000.0));
    assert!(matches!(
        controller.phase(),
        GridPhase::Pending { cell: Some(_), .. }
    ));
    assert_eq!(
        stored_value(&fixture.db_path, fixture.dataset_id, &budget_key()),
        Some(CellValue::Number(3000.0)),
        "nothing is stored before confirmation"
    );

    let saved = service
        .confirm_pending(fixture.dataset_id, &mut grid, &mut controller)
        .expect("confirm should succeed");

    assert_eq!(saved, Some(budget_key()));
    assert!(controller.is_idle());
    assert_eq!(grid.value(&budget_key()), Some(&CellValue::Number(5000.0)));
    assert_eq!(
        stored_value(&fixture.db_path, fixture.dataset_id, &budget_key()),
        Some(CellValue::Number(5000.0))
    );
}

#[test]
fn cancelling_pending_change_keeps_stored_value() {
    let fixture = seed_campaigns();
    let service = edit_service_for(&fixture.db_path);
    let mut controller = EditableGridController::new();
    let mut grid = service
        .reload(fixture.dataset_id, &mut controller)
        .expect("grid should load");

    service
        .begin_edit(&mut controller, &grid, budget_key())
        .expect("edit should start");
    service.update_input(&mut controller, budget_key(), "9000".to_string());
    service
        .commit_cell(fixture.dataset_id, &mut grid, &mut controller, &budget_key())
        .expect("commit should succeed");
    service.cancel(&mut controller);

    assert!(controller.is_idle());
    assert_eq!(controller.scratch_value(&budget_key()), None);
    assert_eq!(grid.value(&budget_key()), Some(&CellValue::Number(3000.0)));
    assert_eq!(
        service
            .confirm_pending(fixture.dataset_id, &mut grid, &mut controller)
            .expect("nothing pending is not an error"),
        None
    );
}

#[test]
fn unchanged_value_clears_edit_without_saving() {
    let fixture = seed_campaigns();
    let service = edit_service_for(&fixture.db_path);
    let mut controller = EditableGridController::new();
    let mut grid = service
        .reload(fixture.dataset_id, &mut controller)
        .expect("grid should load");

    service
        .begin_edit(&mut controller, &grid, budget_key())
        .expect("edit should start");
    service.update_input(&mut controller, budget_key(), "3,000".to_string());
    let outcome = service
        .commit_cell(fixture.dataset_id, &mut grid, &mut controller, &budget_key())
        .expect("commit should succeed");

    assert_eq!(outcome, CommitOutcome::Unchanged);
    assert!(controller.is_idle());
    let history = QueryService::new(Arc::new(SqliteRepo::new(fixture.db_path.clone())))
        .cell_history(fixture.dataset_id)
        .expect("history should load");
    assert!(history.is_empty());
}

#[test]
fn invalid_input_keeps_cell_open() {
    let fixture = seed_campaigns();
    let service = edit_service_for(&fixture.db_path);
    let mut controller = EditableGridController::new();
    let mut grid = service
        .reload(fixture.dataset_id, &mut controller)
        .expect("grid should load");

    service
        .begin_edit(&mut controller, &grid, budget_key())
        .expect("edit should start");
    service.update_input(&mut controller, budget_key(), "a lot".to_string());
    let result = service.commit_cell(fixture.dataset_id, &mut grid, &mut controller, &budget_key());

    assert!(matches!(
        result,
        Err(EditError::Validation(ValidationError::NotANumber { .. }))
    ));
    assert!(controller.is_editing(&budget_key()));
    assert_eq!(
        controller.scratch_value(&budget_key()),
        Some(&CellValue::Text("a lot".to_string()))
    );
}

#[test]
fn failed_save_leaves_grid_unchanged_and_allows_retry() {
    let fixture = seed_campaigns();
    let service = EditService::new(
        Arc::new(FailingSaves {
            inner: SqliteRepo::new(fixture.db_path.clone()),
        }),
        EditPolicy::default(),
    );
    let mut controller = EditableGridController::new();
    let mut grid = service
        .reload(fixture.dataset_id, &mut controller)
        .expect("grid should load");

    service
        .begin_edit(&mut controller, &grid, budget_key())
        .expect("edit should start");
    service.update_input(&mut controller, budget_key(), "9000".to_string());
    service
        .commit_cell(fixture.dataset_id, &mut grid, &mut controller, &budget_key())
        .expect("commit should succeed");
    let result = service.confirm_pending(fixture.dataset_id, &mut grid, &mut controller);

    assert!(matches!(result, Err(EditError::Save(RepoError::Storage(_)))));
    assert!(controller.is_idle());
    assert_eq!(grid.value(&budget_key()), Some(&CellValue::Number(3000.0)));

    service
        .begin_edit(&mut controller, &grid, budget_key())
        .expect("edit can be reopened after a failure");
    assert!(controller.is_editing(&budget_key()));
    assert_eq!(
        controller.scratch_value(&budget_key()),
        Some(&CellValue::Text("3000".to_string()))
    );
}

#[test]
fn begin_edit_keeps_existing_scratch_value() {
    let fixture = seed_campaigns();
    let service = edit_service_for(&fixture.db_path);
    let mut controller = EditableGridController::new();
    let grid = service
        .reload(fixture.dataset_id, &mut controller)
        .expect("grid should load");
    let name_key = CellKey::new(43_i64, "name");

    service
        .begin_edit(&mut controller, &grid, budget_key())
        .expect("edit should start");
    service.update_input(&mut controller, budget_key(), "3500".to_string());
    service
        .begin_edit(&mut controller, &grid, name_key.clone())
        .expect("edit should move");
    service
        .begin_edit(&mut controller, &grid, budget_key())
        .expect("edit should move back");

    assert_eq!(
        controller.scratch_value(&budget_key()),
        Some(&CellValue::Text("3500".to_string()))
    );
    assert_eq!(
        controller.scratch_value(&name_key),
        Some(&CellValue::Text("Summer Push".to_string()))
    );
}

#[test]
fn begin_edit_rejects_read_only_and_unknown_cells() {
    let fixture = seed_campaigns();
    let service = EditService::new(
        Arc::new(SqliteRepo::new(fixture.db_path.clone())),
        EditPolicy {
            read_only_fields: ["platform".to_string()].into_iter().collect(),
            ..EditPolicy::default()
        },
    );
    let mut controller = EditableGridController::new();
    let grid = service
        .reload(fixture.dataset_id, &mut controller)
        .expect("grid should load");

    assert!(matches!(
        service.begin_edit(&mut controller, &grid, CellKey::new(42_i64, "platform")),
        Err(EditError::Validation(ValidationError::ReadOnly { .. }))
    ));
    assert!(matches!(
        service.begin_edit(&mut controller, &grid, CellKey::new(77_i64, "budget")),
        Err(EditError::UnknownCell(_))
    ));
    assert!(controller.is_idle());
}

#[test]
fn reload_resets_edit_state() {
    let fixture = seed_campaigns();
    let service = edit_service_for(&fixture.db_path);
    let mut controller = EditableGridController::new();
    let grid = service
        .reload(fixture.dataset_id, &mut controller)
        .expect("grid should load");

    service
        .begin_edit(&mut controller, &grid, budget_key())
        .expect("edit should start");
    let reloaded = service
        .reload(fixture.dataset_id, &mut controller)
        .expect("grid should reload");

    assert_eq!(reloaded, grid);
    assert!(controller.is_idle());
    assert_eq!(
        service.reload(DatasetId(404), &mut controller),
        Err(RepoError::UnknownDataset(DatasetId(404)))
    );
}
