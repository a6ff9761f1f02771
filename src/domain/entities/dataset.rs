use crate::domain::entities::edit::{CellKey, CellValue, RowId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetId(pub i64);

impl From<i64> for DatasetId {
    fn from(value: i64) -> Self {
        DatasetId(value)
    }
}

impl From<DatasetId> for i64 {
    fn from(value: DatasetId) -> Self {
        value.0
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    pub id: RowId,
    pub values: Vec<CellValue>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridData {
    pub columns: Vec<String>,
    pub rows: Vec<GridRow>,
}

impl GridData {
    pub fn id_column(&self) -> Option<&str> {
        self.columns.first().map(String::as_str)
    }

    pub fn editable_columns(&self) -> &[String] {
        self.columns.get(1..).unwrap_or(&[])
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn value_index(&self, field: &str) -> Option<usize> {
        self.editable_columns()
            .iter()
            .position(|column| column == field)
    }

    pub fn value(&self, key: &CellKey) -> Option<&CellValue> {
        let idx = self.value_index(&key.field)?;
        self.rows
            .iter()
            .find(|row| row.id == key.row_id)
            .and_then(|row| row.values.get(idx))
    }

    pub fn set_value(&mut self, key: &CellKey, value: CellValue) -> bool {
        let Some(idx) = self.value_index(&key.field) else {
            return false;
        };
        match self
            .rows
            .iter_mut()
            .find(|row| row.id == key.row_id)
            .and_then(|row| row.values.get_mut(idx))
        {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}
