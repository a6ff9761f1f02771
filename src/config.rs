use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use simplelog::LevelFilter;

use crate::domain::policy::EditPolicy;

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "adgrid", "adgrid")
        .ok_or_else(|| anyhow!("unable to resolve data directory"))
}

pub fn default_db_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_local_dir().join("campaigns.sqlite"))
}

pub fn default_log_path() -> Result<PathBuf> {
    Ok(project_dirs()?.data_local_dir().join("adgrid.log"))
}

pub fn default_settings_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("settings.toml"))
}

pub fn ensure_webview_data_dir(base_data_dir: &Path) -> Result<PathBuf> {
    let webview_data_dir = base_data_dir.join("webview2");
    std::fs::create_dir_all(&webview_data_dir).with_context(|| {
        format!(
            "failed to create webview dir: {}",
            webview_data_dir.display()
        )
    })?;
    Ok(webview_data_dir)
}

pub fn default_webview_data_dir() -> Result<PathBuf> {
    ensure_webview_data_dir(project_dirs()?.data_local_dir())
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: String,
    pub db_path: Option<PathBuf>,
    pub edit: EditSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            db_path: None,
            edit: EditSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditSettings {
    pub numeric_fields: Vec<String>,
    pub confirm_fields: Vec<String>,
    pub confirm_change_ratio: f64,
    pub read_only_fields: Vec<String>,
}

impl Default for EditSettings {
    fn default() -> Self {
        let policy = EditPolicy::default();
        Self {
            numeric_fields: policy.numeric_fields.into_iter().collect(),
            confirm_fields: policy.confirm_fields.into_iter().collect(),
            confirm_change_ratio: policy.confirm_change_ratio,
            read_only_fields: policy.read_only_fields.into_iter().collect(),
        }
    }
}

impl EditSettings {
    pub fn to_policy(&self) -> EditPolicy {
        EditPolicy {
            numeric_fields: self.numeric_fields.iter().cloned().collect::<BTreeSet<_>>(),
            confirm_fields: self.confirm_fields.iter().cloned().collect(),
            confirm_change_ratio: self.confirm_change_ratio,
            read_only_fields: self.read_only_fields.iter().cloned().collect(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings: {}", path.display()))?;
        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        if !settings.edit.confirm_change_ratio.is_finite()
            || settings.edit.confirm_change_ratio < 0.0
        {
            anyhow::bail!(
                "edit.confirm_change_ratio must be a non-negative number, got {}",
                settings.edit.confirm_change_ratio
            );
        }
        Ok(settings)
    }

    pub fn load_or_default(path: &Path) -> (Self, Option<anyhow::Error>) {
        match Self::load(path) {
            Ok(settings) => (settings, None),
            Err(err) => (Self::default(), Some(err)),
        }
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }

    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => default_db_path(),
        }
    }
}
