use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use crate::domain::entities::dataset::{DatasetId, GridData, GridRow};
use crate::domain::entities::edit::{CellValue, RowId};
use crate::infra::sqlite::schema::{init_db, open_connection};
use crate::usecase::ports::repo::{CellEditRecord, DatasetMeta};

pub fn insert_header_names(
    tx: &rusqlite::Transaction<'_>,
    dataset_id: i64,
    headers: &[String],
) -> Result<()> {
    let mut insert_header = tx
        .prepare("INSERT INTO column_name(dataset_id, col_idx, name) VALUES (?1, ?2, ?3)")
        .context("failed to prepare header insert")?;

    for (col_idx, name) in headers.iter().enumerate() {
        insert_header
            .execute(params![dataset_id, col_idx as i64, name.trim()])
            .context("failed to insert header")?;
    }

    Ok(())
}

pub fn normalize_rows(columns: &[String], rows: &[Vec<String>]) -> Result<Vec<Vec<String>>> {
    if columns.is_empty() {
        anyhow::bail!("at least one column (the row id) is required")
    }
    let mut names = BTreeSet::new();
    for column in columns {
        if !names.insert(column.trim()) {
            anyhow::bail!("duplicate column name: {}", column.trim())
        }
    }

    let mut seen = BTreeSet::new();
    let mut normalized = Vec::with_capacity(rows.len());
    for (row_idx, row) in rows.iter().enumerate() {
        let mut next_row: Vec<String> = (0..columns.len())
            .map(|col_idx| row.get(col_idx).cloned().unwrap_or_default())
            .collect();
        let row_id = RowId::parse(&next_row[0]);
        if matches!(&row_id, RowId::Text(text) if text.is_empty()) {
            anyhow::bail!("row {} has an empty id", row_idx + 1)
        }
        if !seen.insert(row_id.clone()) {
            anyhow::bail!("duplicate row id: {row_id}")
        }
        next_row[0] = row_id.to_string();
        normalized.push(next_row);
    }
    Ok(normalized)
}

pub fn create_dataset_from_rows(
    db_path: &Path,
    name: &str,
    source_path: &str,
    columns: &[String],
    rows: &[Vec<String>],
) -> Result<i64> {
    let rows = normalize_rows(columns, rows)?;

    init_db(db_path)?;
    let mut conn = open_connection(db_path)?;
    let tx = conn
        .transaction()
        .context("failed to start dataset create transaction")?;

    tx.execute(
        "INSERT INTO dataset(name, source_path, row_count) VALUES (?1, ?2, ?3)",
        params![name, source_path, rows.len() as i64],
    )
    .context("failed to insert dataset")?;
    let dataset_id = tx.last_insert_rowid();

    insert_header_names(&tx, dataset_id, columns)?;

    let mut insert_cell = tx
        .prepare("INSERT INTO cell(dataset_id, row_idx, col_idx, value) VALUES (?1, ?2, ?3, ?4)")
        .context("failed to prepare cell insert")?;
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            insert_cell
                .execute(params![dataset_id, row_idx as i64, col_idx as i64, value])
                .context("failed to insert dataset cell")?;
        }
    }
    drop(insert_cell);

    tx.commit().context("failed to commit dataset create")?;
    Ok(dataset_id)
}

pub fn list_datasets(db_path: &Path) -> Result<Vec<DatasetMeta>> {
    let conn = open_connection(db_path)?;
    let mut stmt = conn
        .prepare(
            "SELECT id, name, row_count, source_path
             FROM dataset
             ORDER BY id ASC",
        )
        .context("failed to prepare dataset list query")?;

    let datasets = stmt
        .query_map([], |row| {
            Ok(DatasetMeta {
                id: DatasetId(row.get(0)?),
                name: row.get(1)?,
                row_count: row.get(2)?,
                source_path: row.get(3)?,
            })
        })
        .context("failed to query datasets")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read dataset row")?;

    Ok(datasets)
}

pub fn dataset_exists(db_path: &Path, dataset_id: i64) -> Result<bool> {
    let conn = open_connection(db_path)?;
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM dataset WHERE id = ?1",
            [dataset_id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to look up dataset")?;
    Ok(found.is_some())
}

pub fn load_grid(db_path: &Path, dataset_id: i64) -> Result<GridData> {
    let conn = open_connection(db_path)?;

    let mut header_stmt = conn
        .prepare("SELECT name FROM column_name WHERE dataset_id = ?1 ORDER BY col_idx ASC")
        .context("failed to prepare header query")?;
    let columns = header_stmt
        .query_map([dataset_id], |row| row.get::<_, String>(0))
        .context("failed to query headers")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read header row")?;

    let mut cell_stmt = conn
        .prepare(
            "SELECT row_idx, col_idx, value
             FROM cell
             WHERE dataset_id = ?1
             ORDER BY row_idx ASC, col_idx ASC",
        )
        .context("failed to prepare cell query")?;
    let cells = cell_stmt
        .query_map([dataset_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .context("failed to query cells")?;

    let mut raw_rows: Vec<(i64, Vec<String>)> = Vec::new();
    for cell in cells {
        let (row_idx, col_idx, value) = cell.context("failed to read cell row")?;
        if raw_rows.last().map(|(idx, _)| *idx) != Some(row_idx) {
            raw_rows.push((row_idx, vec![String::new(); columns.len()]));
        }
        if let Some((_, row)) = raw_rows.last_mut() {
            if let Some(slot) = row.get_mut(col_idx as usize) {
                *slot = value;
            }
        }
    }

    let rows = raw_rows
        .into_iter()
        .filter(|(_, row)| !row.is_empty())
        .map(|(_, row)| GridRow {
            id: RowId::parse(&row[0]),
            values: row[1..].iter().map(|value| CellValue::parse(value)).collect(),
        })
        .collect();

    Ok(GridData { columns, rows })
}

/// Returns `false` when no editable cell matches `row_key`/`field`.
pub fn update_cell(
    db_path: &Path,
    dataset_id: i64,
    row_key: &str,
    field: &str,
    old_value: &str,
    new_value: &str,
) -> Result<bool> {
    let mut conn = open_connection(db_path)?;
    let tx = conn
        .transaction()
        .context("failed to start cell update transaction")?;

    let col_idx: Option<i64> = tx
        .query_row(
            "SELECT col_idx FROM column_name WHERE dataset_id = ?1 AND name = ?2",
            params![dataset_id, field],
            |row| row.get(0),
        )
        .optional()
        .context("failed to look up column")?;
    let Some(col_idx) = col_idx.filter(|idx| *idx > 0) else {
        return Ok(false);
    };

    let row_idx: Option<i64> = tx
        .query_row(
            "SELECT row_idx FROM cell WHERE dataset_id = ?1 AND col_idx = 0 AND value = ?2",
            params![dataset_id, row_key],
            |row| row.get(0),
        )
        .optional()
        .context("failed to look up row")?;
    let Some(row_idx) = row_idx else {
        return Ok(false);
    };

    let changed = tx
        .execute(
            "UPDATE cell SET value = ?1 WHERE dataset_id = ?2 AND row_idx = ?3 AND col_idx = ?4",
            params![new_value, dataset_id, row_idx, col_idx],
        )
        .context("failed to update cell")?;
    if changed == 0 {
        return Ok(false);
    }

    let edited_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    tx.execute(
        "INSERT INTO cell_edit(dataset_id, row_key, field, old_value, new_value, edited_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![dataset_id, row_key, field, old_value, new_value, edited_at],
    )
    .context("failed to record cell edit")?;

    tx.commit().context("failed to commit cell update")?;
    Ok(true)
}

pub fn list_cell_edits(db_path: &Path, dataset_id: i64) -> Result<Vec<CellEditRecord>> {
    let conn = open_connection(db_path)?;
    let mut stmt = conn
        .prepare(
            "SELECT row_key, field, old_value, new_value, edited_at
             FROM cell_edit
             WHERE dataset_id = ?1
             ORDER BY id ASC",
        )
        .context("failed to prepare cell edit query")?;

    let edits = stmt
        .query_map([dataset_id], |row| {
            let row_key: String = row.get(0)?;
            Ok(CellEditRecord {
                row_id: RowId::parse(&row_key),
                field: row.get(1)?,
                old_value: row.get(2)?,
                new_value: row.get(3)?,
                edited_at: row.get(4)?,
            })
        })
        .context("failed to query cell edits")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to read cell edit row")?;

    Ok(edits)
}
