use eframe::egui;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

use crate::config::Config;
use crate::controller::ArrangementController;
use crate::export::{ExportSettings, Exporter};
use crate::image_processor::ImageProcessor;
use crate::ingest::{image_extensions, FileLoader, SelectedFile};
use crate::notifications::Severity;
use crate::photo_store::PhotoRecord;
use crate::preview::PreviewMode;
use crate::session::GridSession;
use crate::slots::{Position, SLOT_COUNT};
use crate::texture::TextureCache;

// ============================================================================
// CONSTANTS FOR UI STYLING - Easy to modify
// ============================================================================
const UI_PADDING: f32 = 20.0;
const SLOT_ROUNDING: f32 = 8.0;
const SLOT_COLOR: egui::Color32 = egui::Color32::from_rgb(40, 40, 40);
const EMPTY_SLOT_COLOR: egui::Color32 = egui::Color32::from_rgb(60, 60, 60);
const HIGHLIGHT_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 90, 95);

// ============================================================================
// ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    None,
    Dragging(Position),
}

/// Collected while drawing the preview window, applied afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PreviewAction {
    SetMode(PreviewMode),
    Select(usize),
    Download,
    Close,
}

// ============================================================================
// MAIN APP STRUCT
// ============================================================================

pub struct PhotoGridApp {
    session: GridSession,
    textures: TextureCache,
    loader: FileLoader,
    exporter: Exporter,
    config: Config,
    drag_state: DragState,
}

// ============================================================================
// INITIALIZATION
// ============================================================================

impl PhotoGridApp {
    pub fn new(config: Config, handle: Handle) -> Self {
        let mut session = GridSession::new(ArrangementController::new(), config.toast_duration());
        let textures = TextureCache::new(
            ImageProcessor::new(config.display.max_texture_edge),
            session.subscribe(),
        );

        Self {
            session,
            textures,
            loader: FileLoader::new(handle.clone()),
            exporter: Exporter::new(ExportSettings::from_config(&config), handle),
            config,
            drag_state: DragState::None,
        }
    }
}

// ============================================================================
// MAIN UPDATE LOOP
// ============================================================================

impl eframe::App for PhotoGridApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.pump_background_work();
        self.session.sync();
        self.textures.sync();
        self.session.expire_notices(Instant::now());
        self.handle_dropped_files(ctx);

        self.render_toolbar(ctx);
        self.render_grid(ctx);
        self.render_reset_confirmation(ctx);
        self.render_preview(ctx);
        self.render_notices(ctx);

        // Keep polling while reads or exports are in flight and toasts need to fade.
        if self.loader.is_busy() || self.exporter.is_busy() || !self.session.notices().is_empty() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

// ============================================================================
// FILE INGESTION
// ============================================================================

impl PhotoGridApp {
    fn pump_background_work(&mut self) {
        for loaded in self.loader.drain() {
            self.session.complete_load(loaded);
        }
        for outcome in self.exporter.drain() {
            self.session.record_export(outcome);
        }
    }

    fn schedule_reads(&mut self, reads: Vec<(SelectedFile, Position)>) {
        for (file, position) in reads {
            self.loader.load(file, position);
        }
    }

    fn pick_for_slot(&mut self, position: Position) {
        let extensions = image_extensions();
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Image Files", extensions.as_slice())
            .pick_file()
        {
            if let Some(read) = self.session.choose_for_slot(position, SelectedFile::new(path)) {
                self.schedule_reads(vec![read]);
            }
        }
    }

    fn pick_batch(&mut self) {
        let extensions = image_extensions();
        if let Some(paths) = rfd::FileDialog::new()
            .add_filter("Image Files", extensions.as_slice())
            .pick_files()
        {
            let files = paths.into_iter().map(SelectedFile::new).collect();
            let reads = self.session.choose_batch(files);
            self.schedule_reads(reads);
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<SelectedFile> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .map(SelectedFile::new)
                .collect()
        });

        if !dropped.is_empty() {
            let reads = self.session.choose_batch(dropped);
            self.schedule_reads(reads);
        }
    }
}

// ============================================================================
// TOOLBAR AND GRID
// ============================================================================

impl PhotoGridApp {
    fn render_toolbar(&mut self, ctx: &egui::Context) {
        let mut upload = false;
        let mut preview = false;
        let mut save_grid = false;
        let mut reset = false;

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                upload = ui.button("Upload photos").clicked();
                preview = ui.button("Preview").clicked();
                save_grid = ui.button("Save grid").clicked();
                reset = ui.button("Reset").clicked();

                ui.separator();
                ui.label(format!("{} / {} photos", self.session.store().len(), SLOT_COUNT))
                    .on_hover_text(format!("Exports go to {}", self.exporter.output_dir().display()));
                if self.loader.is_busy() || self.exporter.is_busy() {
                    ui.spinner();
                }
            });
            ui.add_space(6.0);
        });

        if upload {
            self.pick_batch();
        }
        if preview {
            self.session.open_preview();
        }
        if save_grid {
            if let Some(request) = self.session.export_grid_request() {
                self.exporter.submit(request);
            }
        }
        if reset {
            self.session.request_reset();
        }
    }

    fn render_grid(&mut self, ctx: &egui::Context) {
        let slot = self.config.grid.slot_size;
        let gap = self.config.grid.gap;
        let edge = self.config.grid_edge();

        let hover = ctx.input(|i| i.pointer.hover_pos());
        let mut slot_rects = Vec::with_capacity(SLOT_COUNT);
        let mut clicked = None;
        let mut drag_started = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_rect_before_wrap();
            let grid_rect = egui::Rect::from_center_size(available.center(), egui::vec2(edge, edge));

            for position in Position::all() {
                let offset = egui::vec2(
                    position.column() as f32 * (slot + gap),
                    position.row() as f32 * (slot + gap),
                );
                let rect = egui::Rect::from_min_size(grid_rect.min + offset, egui::vec2(slot, slot));
                let response = ui.interact(
                    rect,
                    ui.id().with(("slot", position.get())),
                    egui::Sense::click_and_drag(),
                );
                slot_rects.push((position, rect));

                let is_drop_target = match self.drag_state {
                    DragState::Dragging(source) => {
                        source != position && hover.map_or(false, |pointer| rect.contains(pointer))
                    }
                    DragState::None => false,
                };

                let record = self.session.store().get(position).cloned();
                self.paint_slot(ui, ctx, rect, position, record.as_ref(), is_drop_target);

                if response.clicked() {
                    clicked = Some(position);
                }
                if response.drag_started() && !self.session.store().slot_state(position).is_empty() {
                    drag_started = Some(position);
                }
            }
        });

        if let Some(position) = clicked {
            self.pick_for_slot(position);
        }
        if let Some(position) = drag_started {
            self.drag_state = DragState::Dragging(position);
        }
        self.finish_drag(ctx, &slot_rects);
    }

    fn paint_slot(
        &mut self,
        ui: &egui::Ui,
        ctx: &egui::Context,
        rect: egui::Rect,
        position: Position,
        record: Option<&PhotoRecord>,
        is_drop_target: bool,
    ) {
        let painter = ui.painter();
        let fill = if record.is_some() { SLOT_COLOR } else { EMPTY_SLOT_COLOR };
        painter.rect_filled(rect, SLOT_ROUNDING, fill);

        match record {
            Some(record) => match self.textures.texture_for(ctx, record) {
                Some(texture) => paint_texture(painter, &texture, rect, egui::Color32::WHITE),
                None => {
                    painter.text(
                        rect.center(),
                        egui::Align2::CENTER_CENTER,
                        "?",
                        egui::FontId::proportional(32.0),
                        egui::Color32::GRAY,
                    );
                }
            },
            None => {
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "+",
                    egui::FontId::proportional(40.0),
                    egui::Color32::from_gray(110),
                );
            }
        }

        painter.text(
            rect.min + egui::vec2(10.0, 8.0),
            egui::Align2::LEFT_TOP,
            position.to_string(),
            egui::FontId::proportional(18.0),
            egui::Color32::WHITE,
        );

        if is_drop_target {
            painter.rect_stroke(rect, SLOT_ROUNDING, egui::Stroke::new(3.0, HIGHLIGHT_COLOR));
        }
    }

    /// Draws the dragged photo under the pointer and swaps on release.
    fn finish_drag(&mut self, ctx: &egui::Context, slot_rects: &[(Position, egui::Rect)]) {
        let DragState::Dragging(source) = self.drag_state else {
            return;
        };

        let (released, pointer) = ctx.input(|i| (i.pointer.any_released(), i.pointer.latest_pos()));

        if released {
            self.drag_state = DragState::None;
            let target = pointer
                .and_then(|pointer| slot_rects.iter().find(|(_, rect)| rect.contains(pointer)));
            if let Some((target, _)) = target {
                self.session.reorder(source.get(), target.get());
            }
            return;
        }

        let record = self.session.store().get(source).cloned();
        if let (Some(pointer), Some(record)) = (pointer, record) {
            if let Some(texture) = self.textures.texture_for(ctx, &record) {
                let painter = ctx.layer_painter(egui::LayerId::new(
                    egui::Order::Tooltip,
                    egui::Id::new("drag_ghost"),
                ));
                let ghost = egui::Rect::from_center_size(pointer, egui::Vec2::splat(self.config.grid.slot_size * 0.5));
                paint_texture(&painter, &texture, ghost, egui::Color32::from_white_alpha(180));
            }
        }
    }
}

// ============================================================================
// DIALOGS
// ============================================================================

impl PhotoGridApp {
    fn render_reset_confirmation(&mut self, ctx: &egui::Context) {
        if !self.session.is_confirming_reset() {
            return;
        }

        let mut answer = None;
        egui::Window::new("Remove all photos")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("Are you sure you want to remove all photos?");
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Yes").clicked() {
                        answer = Some(true);
                    }
                    if ui.button("No").clicked() {
                        answer = Some(false);
                    }
                });
            });

        if let Some(confirmed) = answer {
            self.session.confirm_reset(confirmed);
        }
    }

    fn render_preview(&mut self, ctx: &egui::Context) {
        let Some(preview) = self.session.preview().cloned() else {
            return;
        };

        let main_size = self.config.display.preview_size;
        let thumb_size = self.config.display.thumbnail_size;
        let mut open = true;
        let mut actions = Vec::new();

        egui::Window::new("Preview")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    for mode in PreviewMode::all() {
                        if ui.selectable_label(preview.mode() == *mode, mode.name()).clicked() {
                            actions.push(PreviewAction::SetMode(*mode));
                        }
                    }
                });
                ui.separator();

                let (main_rect, _) =
                    ui.allocate_exact_size(egui::vec2(main_size, main_size), egui::Sense::hover());
                ui.painter().rect_filled(main_rect, 4.0, SLOT_COLOR);
                if let Some(active) = preview.active_photo() {
                    if let Some(texture) = self.textures.texture_for(ctx, active) {
                        paint_texture(ui.painter(), &texture, main_rect, egui::Color32::WHITE);
                    }
                }

                ui.add_space(8.0);
                egui::ScrollArea::horizontal().show(ui, |ui| {
                    ui.horizontal(|ui| {
                        for (index, photo) in preview.photos().iter().enumerate() {
                            let (rect, response) = ui.allocate_exact_size(
                                egui::vec2(thumb_size, thumb_size),
                                egui::Sense::click(),
                            );
                            ui.painter().rect_filled(rect, 4.0, SLOT_COLOR);
                            if let Some(texture) = self.textures.texture_for(ctx, photo) {
                                paint_texture(ui.painter(), &texture, rect, egui::Color32::WHITE);
                            }
                            if index == preview.active_index() {
                                ui.painter().rect_stroke(rect, 4.0, egui::Stroke::new(2.0, HIGHLIGHT_COLOR));
                            }
                            if response.clicked() {
                                actions.push(PreviewAction::Select(index));
                            }
                        }
                    });
                });

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Download").clicked() {
                        actions.push(PreviewAction::Download);
                    }
                    if self.exporter.is_busy() {
                        ui.spinner();
                    }
                });
            });

        if !open {
            actions.push(PreviewAction::Close);
        }

        for action in actions {
            match action {
                PreviewAction::SetMode(mode) => self.session.set_preview_mode(mode),
                PreviewAction::Select(index) => {
                    self.session.select_preview_photo(index);
                }
                PreviewAction::Download => {
                    if let Some(request) = self.session.export_preview_request() {
                        self.exporter.submit(request);
                    }
                }
                PreviewAction::Close => self.session.close_preview(),
            }
        }
    }

    fn render_notices(&self, ctx: &egui::Context) {
        if self.session.notices().is_empty() {
            return;
        }

        egui::Area::new("notices")
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -UI_PADDING))
            .order(egui::Order::Tooltip)
            .show(ctx, |ui| {
                for notice in self.session.notices().visible() {
                    let fill = match notice.severity() {
                        Severity::Success => egui::Color32::from_rgb(40, 120, 40),
                        Severity::Error => egui::Color32::from_rgb(180, 40, 40),
                        Severity::Info => egui::Color32::from_rgb(70, 70, 70),
                    };
                    egui::Frame::none()
                        .fill(fill)
                        .rounding(8.0)
                        .inner_margin(egui::Margin::symmetric(20.0, 12.0))
                        .show(ui, |ui| {
                            ui.label(
                                egui::RichText::new(notice.message())
                                    .color(egui::Color32::WHITE)
                                    .size(16.0),
                            );
                        });
                    ui.add_space(6.0);
                }
            });
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn paint_texture(painter: &egui::Painter, texture: &egui::TextureHandle, rect: egui::Rect, tint: egui::Color32) {
    let size = fit_image_in_rect(texture.size_vec2(), rect.size());
    painter.image(
        texture.id(),
        center_rect_in_rect(size, rect),
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        tint,
    );
}

fn fit_image_in_rect(image_size: egui::Vec2, available: egui::Vec2) -> egui::Vec2 {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return available;
    }
    let scale = (available.x / image_size.x).min(available.y / image_size.y);
    image_size * scale
}

fn center_rect_in_rect(size: egui::Vec2, outer: egui::Rect) -> egui::Rect {
    egui::Rect::from_center_size(outer.center(), size)
}
