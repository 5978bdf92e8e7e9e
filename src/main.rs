use std::path::PathBuf;

use eframe::egui;
use warning_gate::gui::HostApp;
use warning_gate::settings::{Settings, SETTINGS_FILE};
use warning_gate::{logging, store};

fn main() -> anyhow::Result<()> {
    let settings = Settings::load(SETTINGS_FILE)?;
    logging::init(
        settings.debug_logging,
        settings.log_file.clone().map(PathBuf::from),
    );

    let protected = store::load_protected_apps(&settings.store_path)?;
    tracing::info!(apps = protected.len(), "loaded protected apps");

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 640.0])
            .with_min_inner_size([360.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Warning Gate",
        native_options,
        Box::new(move |_cc| Box::new(HostApp::new(settings, protected))),
    )
    .map_err(|err| anyhow::anyhow!("gui loop failed: {err}"))
}
