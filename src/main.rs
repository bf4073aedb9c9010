use anyhow::Result;
use eframe::egui;
use log::info;
use tokio::runtime::Handle;

mod clock;
mod config;
mod controller;
mod error;
mod export;
mod image_processor;
mod ingest;
mod notifications;
mod photo_store;
mod preview;
mod session;
mod slots;
mod texture;
mod ui;

use crate::config::Config;
use crate::ui::PhotoGridApp;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    info!("Starting Photo Grid");

    let config = Config::load()?;
    config.validate()?;
    info!(
        "Configuration loaded: {}x{} window, exports go to {}",
        config.window.width,
        config.window.height,
        config.paths.export_dir.display()
    );

    // Reads and exports run on the runtime's blocking pool while egui owns this thread.
    let handle = Handle::current();

    let min_edge = config.grid_edge() + 40.0;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(config.window.title.clone())
            .with_inner_size([config.window.width as f32, config.window.height as f32])
            .with_min_inner_size([min_edge, min_edge + 60.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    info!("Launching GUI application...");

    let title = config.window.title.clone();
    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| {
            setup_style(&cc.egui_ctx);
            Box::new(PhotoGridApp::new(config, handle))
        }),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run application: {}", e))?;

    info!("Application shut down gracefully");
    Ok(())
}

fn setup_style(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    style.spacing.button_padding = egui::vec2(12.0, 8.0);
    style.spacing.item_spacing = egui::vec2(10.0, 8.0);
    style.spacing.window_margin = egui::Margin::same(16.0);

    style.text_styles.insert(
        egui::TextStyle::Button,
        egui::FontId::new(16.0, egui::FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Body,
        egui::FontId::new(15.0, egui::FontFamily::Proportional),
    );
    style.text_styles.insert(
        egui::TextStyle::Heading,
        egui::FontId::new(22.0, egui::FontFamily::Proportional),
    );

    ctx.set_style(style);
}
