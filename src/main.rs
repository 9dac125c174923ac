use eframe::egui;

use overkey::gui::OverlayApp;
use overkey::settings::{self, Settings};

fn main() -> anyhow::Result<()> {
    let settings_path = settings::default_path();
    let settings = Settings::load(&settings_path)?;

    let log_dir = std::path::Path::new(&settings_path)
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string());
    let _log_guard = overkey::logging::init(settings.debug_logging, settings.log_to_file, &log_dir);

    tracing::info!(path = %settings_path, "starting overlay");

    let size = settings.window_size.unwrap_or((900, 320));
    let mut viewport = egui::ViewportBuilder::default()
        .with_inner_size([size.0 as f32, size.1 as f32])
        .with_min_inner_size([640.0, 240.0])
        .with_decorations(false)
        .with_taskbar(false)
        .with_always_on_top();
    if let Some((x, y)) = settings.window_pos {
        viewport = viewport.with_position([x as f32, y as f32]);
    }

    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let app_settings = settings.clone();
    eframe::run_native(
        "Overkey",
        native_options,
        Box::new(move |_cc| Box::new(OverlayApp::new(&app_settings))),
    )
    .map_err(|err| anyhow::anyhow!("overlay window failed: {err}"))?;

    Ok(())
}
