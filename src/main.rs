use std::fs::File;

use anyhow::{Context, Result};
use simplelog::{Config, LevelFilter, WriteLogger};

use adgrid::app::App;
use adgrid::config::{default_log_path, default_settings_path, default_webview_data_dir, Settings};

fn init_logging(level: LevelFilter) -> Result<()> {
    let log_path = default_log_path()?;
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log dir: {}", parent.display()))?;
    }
    let log_file = File::create(&log_path)
        .with_context(|| format!("failed to create log file: {}", log_path.display()))?;
    WriteLogger::init(level, Config::default(), log_file).context("failed to initialize logger")?;
    Ok(())
}

fn main() {
    let (settings, settings_err) = match default_settings_path() {
        Ok(path) => Settings::load_or_default(&path),
        Err(err) => (Settings::default(), Some(err)),
    };

    if let Err(err) = init_logging(settings.level_filter()) {
        eprintln!("logging disabled: {err:#}");
    }
    if let Some(err) = settings_err {
        log::warn!("using default settings: {err:#}");
    }
    log::info!("adgrid starting");

    let webview_data_dir =
        default_webview_data_dir().expect("should resolve and create WebView2 data directory");

    dioxus::LaunchBuilder::desktop()
        .with_cfg(
            dioxus::desktop::Config::new()
                .with_window(dioxus::desktop::WindowBuilder::new().with_title("AdGrid"))
                .with_data_directory(webview_data_dir),
        )
        .launch(App);
}
