mod app;
mod config;
mod io;

use std::path::PathBuf;

use eframe::egui;
use tracing::{error, info, warn};

use app::TomoLensApp;
use config::VisConfig;
use io::FolderSource;

fn config_path() -> Option<PathBuf> {
    if let Some(arg) = std::env::args().nth(1) {
        return Some(PathBuf::from(arg));
    }
    rfd::FileDialog::new()
        .set_title("Select the visualization config")
        .add_filter("config", &["json"])
        .pick_file()
}

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting TomoLens");

    let Some(path) = config_path() else {
        error!("No config file selected");
        return Ok(());
    };
    let config = match VisConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return Ok(());
        }
    };
    let stems = config.discover_stems().unwrap_or_else(|e| {
        warn!("{e}");
        Vec::new()
    });
    info!(files = stems.len(), "Discovered tomograms");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("TomoLens")
            .with_inner_size([1360.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "TomoLens",
        options,
        Box::new(move |_cc| Ok(Box::new(TomoLensApp::new(FolderSource::new(config), stems)))),
    )
}
