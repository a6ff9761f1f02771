use std::collections::BTreeSet;

use crate::domain::entities::edit::{parse_numeric_value, CellValue};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("欄位 {field} 不可編輯")]
    ReadOnly { field: String },
    #[error("欄位 {field} 需要數字，收到 \"{raw}\"")]
    NotANumber { field: String, raw: String },
    #[error("欄位 {field} 不可為負數")]
    Negative { field: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditPolicy {
    pub numeric_fields: BTreeSet<String>,
    pub confirm_fields: BTreeSet<String>,
    /// Relative change (0.5 = 50%) at or above which a confirm field needs
    /// explicit confirmation.
    pub confirm_change_ratio: f64,
    pub read_only_fields: BTreeSet<String>,
}

impl Default for EditPolicy {
    fn default() -> Self {
        Self {
            numeric_fields: ["budget", "daily_budget", "bid"]
                .into_iter()
                .map(String::from)
                .collect(),
            confirm_fields: ["budget", "daily_budget"]
                .into_iter()
                .map(String::from)
                .collect(),
            confirm_change_ratio: 0.5,
            read_only_fields: BTreeSet::new(),
        }
    }
}

impl EditPolicy {
    pub fn validate(&self, field: &str, raw: &str) -> Result<CellValue, ValidationError> {
        if self.read_only_fields.contains(field) {
            return Err(ValidationError::ReadOnly {
                field: field.to_string(),
            });
        }

        if !self.numeric_fields.contains(field) {
            return Ok(CellValue::parse(raw));
        }

        let Some(number) = parse_numeric_value(raw) else {
            return Err(ValidationError::NotANumber {
                field: field.to_string(),
                raw: raw.trim().to_string(),
            });
        };
        if number < 0.0 {
            return Err(ValidationError::Negative {
                field: field.to_string(),
            });
        }
        Ok(CellValue::Number(number))
    }

    pub fn requires_confirmation(&self, field: &str, old: &CellValue, new: &CellValue) -> bool {
        if old == new || !self.confirm_fields.contains(field) {
            return false;
        }
        let (Some(old), Some(new)) = (old.as_number(), new.as_number()) else {
            return false;
        };
        if old == 0.0 {
            return new != 0.0;
        }
        (new - old).abs() / old.abs() >= self.confirm_change_ratio
    }
}
