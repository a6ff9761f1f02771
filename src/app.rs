use std::sync::Arc;

use dioxus::prelude::*;
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};

use crate::config::{default_settings_path, Settings};
use crate::domain::entities::dataset::{DatasetId, GridData};
use crate::domain::entities::edit::CellKey;
use crate::domain::grid::controller::EditableGridController;
use crate::infra::sqlite::repo::SqliteRepo;
use crate::platform::desktop::blocking::run_blocking;
use crate::ui::state::app_state::AppState;
use crate::usecase::ports::repo::{CellEditRecord, GridRepository};
use crate::usecase::services::edit_service::{CommitOutcome, EditError, EditService};
use crate::usecase::services::import_service::ImportService;
use crate::usecase::services::query_service::QueryService;

const HISTORY_LIMIT: usize = 8;

const CELL_STYLE: &str = "border: 1px solid #bbb; padding: 4px;";
const HEADER_CELL_STYLE: &str =
    "border: 1px solid #bbb; padding: 4px; background: #f2f2f2; position: sticky; top: 0;";
const ID_CELL_STYLE: &str = "border: 1px solid #bbb; padding: 4px; color: #666;";

fn load_settings() -> Settings {
    match default_settings_path() {
        Ok(path) => Settings::load_or_default(&path).0,
        Err(_) => Settings::default(),
    }
}

fn cell_alignment(value: &str) -> &'static str {
    if crate::domain::entities::edit::parse_numeric_value(value).is_some() {
        "right"
    } else {
        "left"
    }
}

fn notify_error(title: &str, err: &dyn std::fmt::Display) {
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title(title)
        .set_description(err.to_string())
        .set_buttons(MessageButtons::Ok)
        .show();
}

fn refresh_history(
    query_service: &QueryService,
    dataset_id: Option<i64>,
    mut history: Signal<Vec<CellEditRecord>>,
) {
    let Some(id) = dataset_id else {
        history.set(Vec::new());
        return;
    };
    match query_service.cell_history(DatasetId(id)) {
        Ok(mut records) => {
            records.reverse();
            records.truncate(HISTORY_LIMIT);
            history.set(records);
        }
        Err(err) => log::warn!("dataset {id}: failed to load edit history: {err}"),
    }
}

#[derive(Clone, Copy)]
struct GridSignals {
    selected_dataset_id: Signal<Option<i64>>,
    grid: Signal<GridData>,
    controller: Signal<EditableGridController>,
    history: Signal<Vec<CellEditRecord>>,
    status: Signal<String>,
}

fn switch_dataset(
    edit_service: &EditService,
    query_service: &QueryService,
    dataset_id: Option<i64>,
    signals: GridSignals,
) {
    let GridSignals {
        mut selected_dataset_id,
        mut grid,
        mut controller,
        history,
        mut status,
    } = signals;

    selected_dataset_id.set(dataset_id);
    let Some(id) = dataset_id else {
        grid.set(GridData::default());
        controller.write().reset();
        refresh_history(query_service, None, history);
        return;
    };

    let result = run_blocking("load dataset", || {
        edit_service.reload(DatasetId(id), &mut controller.write())
    });
    match result {
        Ok(loaded) => {
            status.set(format!("已載入 {} 筆", loaded.row_count()));
            grid.set(loaded);
        }
        Err(err) => {
            grid.set(GridData::default());
            status.set(format!("載入資料失敗：{err}"));
        }
    }
    refresh_history(query_service, Some(id), history);
}

fn report_edit_result(
    result: Result<CommitOutcome, EditError>,
    query_service: &QueryService,
    signals: GridSignals,
) {
    let mut status = signals.status;
    match result {
        Ok(CommitOutcome::Saved(key)) => {
            status.set(format!("已儲存 {key}"));
            refresh_history(
                query_service,
                (signals.selected_dataset_id)(),
                signals.history,
            );
        }
        Ok(CommitOutcome::AwaitingConfirmation) => {
            status.set("變更幅度較大，請確認".to_string());
        }
        Ok(CommitOutcome::Unchanged) => {}
        Err(err @ EditError::Save(_)) => {
            status.set(err.to_string());
            notify_error("儲存失敗", &err);
        }
        Err(err) => {
            status.set(err.to_string());
        }
    }
}

fn commit_cell(
    edit_service: &EditService,
    query_service: &QueryService,
    key: &CellKey,
    signals: GridSignals,
) {
    let Some(dataset_id) = (signals.selected_dataset_id)() else {
        return;
    };
    let mut grid = signals.grid;
    let mut controller = signals.controller;
    let result = {
        let mut grid_guard = grid.write();
        let mut controller_guard = controller.write();
        run_blocking("save cell", || {
            edit_service.commit_cell(
                DatasetId(dataset_id),
                &mut grid_guard,
                &mut controller_guard,
                key,
            )
        })
    };
    report_edit_result(result, query_service, signals);
}

fn confirm_pending(edit_service: &EditService, query_service: &QueryService, signals: GridSignals) {
    let Some(dataset_id) = (signals.selected_dataset_id)() else {
        return;
    };
    let mut grid = signals.grid;
    let mut controller = signals.controller;
    let result = {
        let mut grid_guard = grid.write();
        let mut controller_guard = controller.write();
        run_blocking("confirm change", || {
            edit_service.confirm_pending(
                DatasetId(dataset_id),
                &mut grid_guard,
                &mut controller_guard,
            )
        })
    };
    let result = result.map(|saved| match saved {
        Some(key) => CommitOutcome::Saved(key),
        None => CommitOutcome::Unchanged,
    });
    report_edit_result(result, query_service, signals);
}

#[component]
pub fn App() -> Element {
    let AppState {
        mut datasets,
        selected_dataset_id,
        grid,
        mut controller,
        history,
        mut busy,
        mut status,
    } = AppState::new();
    let settings = use_hook(load_settings);

    let db_path = match settings.resolved_db_path() {
        Ok(path) => path,
        Err(err) => {
            return rsx! {
                div {
                    p { "無法取得資料庫路徑：{err}" }
                }
            };
        }
    };

    let signals = GridSignals {
        selected_dataset_id,
        grid,
        controller,
        history,
        status,
    };

    let repo = Arc::new(SqliteRepo::new(db_path));
    let query_service = Arc::new(QueryService::new(repo.clone()));
    let edit_service = Arc::new(EditService::new(repo.clone(), settings.edit.to_policy()));
    let import_service = Arc::new(ImportService::new(repo.clone()));

    let repo_for_init = repo.clone();
    let query_service_for_init = query_service.clone();
    let edit_service_for_init = edit_service.clone();
    use_effect(move || {
        busy.set(true);
        let init_result = run_blocking("init", || {
            repo_for_init
                .init()
                .and_then(|_| query_service_for_init.list_datasets())
        });
        match init_result {
            Ok(available) => {
                let first_dataset = available.first().map(|meta| meta.id.0);
                datasets.set(available);
                switch_dataset(
                    &edit_service_for_init,
                    &query_service_for_init,
                    first_dataset,
                    signals,
                );
            }
            Err(err) => {
                datasets.set(Vec::new());
                status.set(format!("初始化資料庫失敗：{err}"));
            }
        }
        busy.set(false);
    });

    let datasets_snapshot = datasets();
    let selected_id = selected_dataset_id();
    let grid_snapshot = grid();
    let controller_snapshot = controller();
    let history_snapshot = history();
    let status_text = status();
    let busy_now = busy();

    let editable_columns = Arc::new(grid_snapshot.editable_columns().to_vec());
    let id_column = grid_snapshot.id_column().unwrap_or("id").to_string();
    let pending = controller_snapshot.pending_change().cloned();
    let show_confirm = pending.is_some();
    let (confirm_field, confirm_row, confirm_old, confirm_new) = pending
        .map(|change| {
            (
                change.key.field.clone(),
                change.key.row_id.to_string(),
                change.old_value.to_string(),
                change.new_value.to_string(),
            )
        })
        .unwrap_or_default();

    let edit_service_for_select = edit_service.clone();
    let query_service_for_select = query_service.clone();
    let edit_service_for_import = edit_service.clone();
    let query_service_for_import = query_service.clone();
    let edit_service_for_confirm = edit_service.clone();
    let query_service_for_confirm = query_service.clone();
    let edit_service_for_dialog_cancel = edit_service.clone();

    rsx! {
        div {
            style: "height: 100vh; display: flex; flex-direction: column; gap: 8px; padding: 8px; box-sizing: border-box; font-family: sans-serif;",

            div {
                style: "display: flex; align-items: center; gap: 12px;",
                span { "資料集" }
                select {
                    disabled: busy_now,
                    onchange: move |event| {
                        let next = event.value().parse::<i64>().ok();
                        switch_dataset(
                            &edit_service_for_select,
                            &query_service_for_select,
                            next,
                            signals,
                        );
                    },
                    option { value: "", selected: selected_id.is_none(), "(未選擇)" }
                    {datasets_snapshot.iter().map(|meta| {
                        let id = meta.id.0;
                        let label = format!("{} ({})", meta.name, meta.row_count);
                        rsx!(
                            option { value: "{id}", selected: selected_id == Some(id), "{label}" }
                        )
                    })}
                }
                button {
                    disabled: busy_now,
                    onclick: move |_| {
                        let Some(file_path) = FileDialog::new()
                            .add_filter("CSV", &["csv"])
                            .add_filter("所有檔案", &["*"])
                            .pick_file()
                        else {
                            return;
                        };
                        busy.set(true);
                        status.set(format!("正在匯入 {}", file_path.display()));
                        let import_result =
                            run_blocking("import csv", || import_service.import_csv(&file_path));
                        match import_result {
                            Ok(imported) => {
                                match query_service_for_import.list_datasets() {
                                    Ok(available) => datasets.set(available),
                                    Err(err) => log::warn!("failed to refresh datasets: {err}"),
                                }
                                switch_dataset(
                                    &edit_service_for_import,
                                    &query_service_for_import,
                                    Some(imported.dataset_id),
                                    signals,
                                );
                                status.set(format!("已匯入 {} 筆", imported.row_count));
                            }
                            Err(err) => {
                                log::warn!("import failed: {err:#}");
                                status.set(format!("匯入失敗：{err}"));
                                notify_error("匯入失敗", &err);
                            }
                        }
                        busy.set(false);
                    },
                    "匯入 CSV"
                }
            }

            div {
                style: "flex: 1; overflow: auto; border: 1px solid #ddd;",
                table {
                    style: "border-collapse: collapse; width: 100%;",
                    thead {
                        tr {
                            th { style: HEADER_CELL_STYLE, "{id_column}" }
                            {editable_columns.iter().map(|column| rsx!(
                                th { style: HEADER_CELL_STYLE, "{column}" }
                            ))}
                        }
                    }
                    tbody {
                        {grid_snapshot.rows.iter().map(|row| {
                            let row_id = row.id.clone();
                            rsx!(
                                tr {
                                    key: "{row_id}",
                                    td { style: ID_CELL_STYLE, "{row_id}" }
                                    {row.values.iter().enumerate().map(|(value_idx, value)| {
                                        let field = editable_columns
                                            .get(value_idx)
                                            .cloned()
                                            .unwrap_or_default();
                                        let cell_key = CellKey {
                                            row_id: row_id.clone(),
                                            field,
                                        };
                                        let formatted = value.display_text();
                                        let alignment = cell_alignment(&formatted);

                                        if controller_snapshot.is_editing(&cell_key) {
                                            let input_value = controller_snapshot
                                                .scratch_value(&cell_key)
                                                .map(ToString::to_string)
                                                .unwrap_or_default();
                                            let key_for_input = cell_key.clone();
                                            let key_for_keydown = cell_key.clone();
                                            let edit_service_for_input = edit_service.clone();
                                            let edit_service_for_keydown = edit_service.clone();
                                            let query_service_for_keydown = query_service.clone();
                                            rsx!(
                                                td {
                                                    style: "{CELL_STYLE} text-align: {alignment};",
                                                    input {
                                                        value: "{input_value}",
                                                        autofocus: true,
                                                        oninput: move |event| {
                                                            edit_service_for_input.update_input(
                                                                &mut controller.write(),
                                                                key_for_input.clone(),
                                                                event.value(),
                                                            );
                                                        },
                                                        onkeydown: move |event| {
                                                            if event.key() == Key::Enter {
                                                                commit_cell(
                                                                    &edit_service_for_keydown,
                                                                    &query_service_for_keydown,
                                                                    &key_for_keydown,
                                                                    signals,
                                                                );
                                                            } else if event.key() == Key::Escape {
                                                                edit_service_for_keydown
                                                                    .cancel(&mut controller.write());
                                                            }
                                                        }
                                                    }
                                                }
                                            )
                                        } else {
                                            let edit_service_for_cell = edit_service.clone();
                                            rsx!(
                                                td {
                                                    style: "{CELL_STYLE} text-align: {alignment};",
                                                    ondoubleclick: move |_| {
                                                        let result = edit_service_for_cell.begin_edit(
                                                            &mut controller.write(),
                                                            &grid.read(),
                                                            cell_key.clone(),
                                                        );
                                                        if let Err(err) = result {
                                                            status.set(err.to_string());
                                                        }
                                                    },
                                                    "{formatted}"
                                                }
                                            )
                                        }
                                    })}
                                }
                            )
                        })}
                    }
                }
            }

            if !history_snapshot.is_empty() {
                div {
                    style: "max-height: 140px; overflow-y: auto; font-size: 12px; color: #444;",
                    div { style: "font-weight: 600; margin-bottom: 4px;", "最近變更" }
                    {history_snapshot.iter().map(|record| {
                        let line = format!(
                            "{}  {}:{}  {} → {}",
                            record.edited_at,
                            record.row_id,
                            record.field,
                            record.old_value,
                            record.new_value
                        );
                        rsx!( div { "{line}" } )
                    })}
                }
            }

            div {
                style: "border-top: 1px solid #ddd; padding-top: 4px; font-size: 13px;",
                if busy_now { "處理中… " }
                "{status_text}"
            }

            if show_confirm {
                div {
                    style: "position: fixed; inset: 0; background: rgba(0,0,0,0.35); display: flex; align-items: center; justify-content: center; z-index: 1100;",
                    div {
                        style: "background: #fff; padding: 16px; border: 1px solid #999; min-width: 280px;",
                        div { style: "margin-bottom: 8px; font-weight: 600;", "確認變更" }
                        div { style: "margin-bottom: 12px;",
                            "{confirm_field}（{confirm_row}）：{confirm_old} → {confirm_new}"
                        }
                        div { style: "display: flex; gap: 8px;",
                            button {
                                onclick: move |_| {
                                    confirm_pending(
                                        &edit_service_for_confirm,
                                        &query_service_for_confirm,
                                        signals,
                                    );
                                },
                                "確認"
                            }
                            button {
                                onclick: move |_| {
                                    edit_service_for_dialog_cancel.cancel(&mut controller.write());
                                    status.set("已取消變更".to_string());
                                },
                                "取消"
                            }
                        }
                    }
                }
            }
        }
    }
}
