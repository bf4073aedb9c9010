use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossbeam::channel::{self, Receiver, Sender};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::runtime::Handle;

use crate::config::Config;
use crate::error::GridError;
use crate::image_processor::{decode_rgb, scale_to_fit};
use crate::photo_store::{PhotoRecord, PhotoStore};
use crate::preview::PreviewProjector;
use crate::slots::{Position, GRID_COLUMNS};

const PADDING: u32 = 16;
const GRID_GAP: u32 = 8;
const OUTLINE: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }
}

/// Label used in filenames for whole-grid exports.
pub const GRID_LABEL: &str = "grid";

/// `{app}-{label}-{timestamp}.{ext}`
pub fn export_filename(app_name: &str, label: &str, at: DateTime<Local>, format: ExportFormat) -> String {
    format!(
        "{}-{}-{}.{}",
        app_name,
        label,
        at.format("%Y%m%d_%H%M%S%3f"),
        format.extension()
    )
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub app_name: String,
    pub format: ExportFormat,
    pub jpeg_quality: u8,
    pub output_dir: PathBuf,
    pub canvas_width: u32,
    pub strip_height: u32,
    pub background: [u8; 3],
}

impl ExportSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            app_name: config.export.app_name.clone(),
            format: config.export.format,
            jpeg_quality: config.export.jpeg_quality,
            output_dir: config.paths.export_dir.clone(),
            canvas_width: config.export.canvas_width,
            strip_height: config.export.strip_height,
            background: config.export.background,
        }
    }

    fn background(&self) -> Rgb<u8> {
        Rgb(self.background)
    }

    /// Slightly lighter than the background, for empty grid cells.
    fn placeholder(&self) -> Rgb<u8> {
        Rgb(self.background.map(|channel| channel.saturating_add(24)))
    }
}

/// What gets rasterized.
#[derive(Debug, Clone)]
pub enum ExportSurface {
    /// Active photo large with the thumbnail strip underneath.
    Preview { photos: Vec<PhotoRecord>, active: usize },
    /// The 3x3 grid in position order.
    Grid { photos: Vec<PhotoRecord> },
}

/// A fully built snapshot handed to the exporter.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    label: String,
    surface: ExportSurface,
}

impl ExportRequest {
    pub fn preview(view: &PreviewProjector) -> Result<Self, GridError> {
        if view.is_empty() {
            return Err(GridError::EmptyExportAttempt);
        }
        Ok(Self {
            label: view.mode().label().to_string(),
            surface: ExportSurface::Preview {
                photos: view.photos().to_vec(),
                active: view.active_index(),
            },
        })
    }

    pub fn grid(store: &PhotoStore) -> Result<Self, GridError> {
        if store.is_empty() {
            return Err(GridError::EmptyExportAttempt);
        }
        Ok(Self {
            label: GRID_LABEL.to_string(),
            surface: ExportSurface::Grid {
                photos: store.ordered_by_position(),
            },
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn surface(&self) -> &ExportSurface {
        &self.surface
    }
}

/// Rasterizes export surfaces onto an RGB canvas.
pub struct SurfaceRenderer<'a> {
    settings: &'a ExportSettings,
}

impl<'a> SurfaceRenderer<'a> {
    pub fn new(settings: &'a ExportSettings) -> Self {
        Self { settings }
    }

    pub fn render(&self, surface: &ExportSurface) -> Result<RgbImage> {
        match surface {
            ExportSurface::Preview { photos, active } => self.render_preview(photos, *active),
            ExportSurface::Grid { photos } => self.render_grid(photos),
        }
    }

    fn render_preview(&self, photos: &[PhotoRecord], active: usize) -> Result<RgbImage> {
        let width = self.settings.canvas_width;
        let strip = self.settings.strip_height;
        let mut canvas = RgbImage::from_pixel(width, width + strip, self.settings.background());

        let main = photos.get(active).context("Active photo is missing")?;
        let inner = width.saturating_sub(2 * PADDING).max(1);
        self.place_photo(&mut canvas, main, PADDING, PADDING, inner, inner);

        let count = photos.len() as u32;
        let by_width = width.saturating_sub(PADDING * (count + 1)) / count;
        let thumb = by_width.min(strip.saturating_sub(2 * PADDING)).max(1);
        let top = width + strip.saturating_sub(thumb) / 2;

        for (index, photo) in photos.iter().enumerate() {
            let left = PADDING + index as u32 * (thumb + PADDING);
            self.place_photo(&mut canvas, photo, left, top, thumb, thumb);

            if index == active {
                for inset in 0..2i32 {
                    let outline = Rect::at(left as i32 - 3 + inset, top as i32 - 3 + inset)
                        .of_size(thumb + 6 - 2 * inset as u32, thumb + 6 - 2 * inset as u32);
                    draw_hollow_rect_mut(&mut canvas, outline, OUTLINE);
                }
            }
        }

        Ok(canvas)
    }

    fn render_grid(&self, photos: &[PhotoRecord]) -> Result<RgbImage> {
        let width = self.settings.canvas_width;
        let mut canvas = RgbImage::from_pixel(width, width, self.settings.background());

        let columns = GRID_COLUMNS as u32;
        let cell = (width.saturating_sub(GRID_GAP * (columns + 1)) / columns).max(1);

        for position in Position::all() {
            let left = GRID_GAP + position.column() as u32 * (cell + GRID_GAP);
            let top = GRID_GAP + position.row() as u32 * (cell + GRID_GAP);

            match photos.iter().find(|photo| photo.position() == position) {
                Some(photo) => self.place_photo(&mut canvas, photo, left, top, cell, cell),
                None => self.fill_placeholder(&mut canvas, left, top, cell, cell),
            }
        }

        Ok(canvas)
    }

    /// Draws `photo` scaled into the box, or the placeholder fill when its
    /// payload can't be decoded.
    fn place_photo(&self, canvas: &mut RgbImage, photo: &PhotoRecord, left: u32, top: u32, width: u32, height: u32) {
        match decode_photo(photo) {
            Ok(decoded) => {
                place_centered(canvas, &scale_to_fit(&decoded, width, height), left, top, width, height);
            }
            Err(e) => {
                warn!("Exporting placeholder instead: {:#}", e);
                self.fill_placeholder(canvas, left, top, width, height);
            }
        }
    }

    fn fill_placeholder(&self, canvas: &mut RgbImage, left: u32, top: u32, width: u32, height: u32) {
        let rect = Rect::at(left as i32, top as i32).of_size(width, height);
        draw_filled_rect_mut(canvas, rect, self.settings.placeholder());
    }
}

fn decode_photo(photo: &PhotoRecord) -> Result<RgbImage> {
    decode_rgb(photo.image().bytes())
        .with_context(|| format!("Failed to decode {}", photo.image().name()))
}

/// Draws `image` centered inside the box at (`left`, `top`).
fn place_centered(canvas: &mut RgbImage, image: &RgbImage, left: u32, top: u32, box_width: u32, box_height: u32) {
    let x = left + box_width.saturating_sub(image.width()) / 2;
    let y = top + box_height.saturating_sub(image.height()) / 2;
    image::imageops::overlay(canvas, image, x as i64, y as i64);
}

pub fn encode(image: RgbImage, format: ExportFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    let output = match format {
        ExportFormat::Png => ImageOutputFormat::Png,
        ExportFormat::Jpeg => ImageOutputFormat::Jpeg(jpeg_quality),
    };
    DynamicImage::ImageRgb8(image)
        .write_to(&mut cursor, output)
        .context("Failed to encode export")?;
    Ok(cursor.into_inner())
}

/// Renders, encodes and writes one export. Returns the written path.
pub fn write_export(settings: &ExportSettings, request: &ExportRequest, at: DateTime<Local>) -> Result<PathBuf> {
    let canvas = SurfaceRenderer::new(settings).render(request.surface())?;
    let bytes = encode(canvas, settings.format, settings.jpeg_quality)?;

    std::fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!("Failed to create export directory {}", settings.output_dir.display())
    })?;

    let filename = export_filename(&settings.app_name, request.label(), at, settings.format);
    let path = settings.output_dir.join(filename);
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Exported {} to {}", request.label(), path.display());
    Ok(path)
}

pub type ExportOutcome = Result<PathBuf, GridError>;

/// Runs exports on the blocking pool. Fire and forget: the UI only ever sees
/// the outcome, and a failure never touches the grid.
pub struct Exporter {
    settings: ExportSettings,
    handle: Handle,
    sender: Sender<ExportOutcome>,
    receiver: Receiver<ExportOutcome>,
    in_flight: usize,
}

impl Exporter {
    pub fn new(settings: ExportSettings, handle: Handle) -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            settings,
            handle,
            sender,
            receiver,
            in_flight: 0,
        }
    }

    pub fn submit(&mut self, request: ExportRequest) {
        let settings = self.settings.clone();
        let sender = self.sender.clone();
        self.in_flight += 1;

        self.handle.spawn_blocking(move || {
            let outcome = write_export(&settings, &request, Local::now()).map_err(|e| {
                warn!("Export of {} failed: {:#}", request.label(), e);
                GridError::ExportRenderFailure(format!("{:#}", e))
            });
            let _ = sender.send(outcome);
        });
    }

    pub fn drain(&mut self) -> Vec<ExportOutcome> {
        let done: Vec<ExportOutcome> = self.receiver.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(done.len());
        done
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn output_dir(&self) -> &Path {
        &self.settings.output_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::UploadStamp;
    use crate::image_processor::gradient_png;
    use crate::photo_store::ImageData;
    use crate::preview::PreviewMode;
    use chrono::TimeZone;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn settings(output_dir: &Path) -> ExportSettings {
        ExportSettings {
            app_name: "photo-grid".to_string(),
            format: ExportFormat::Png,
            jpeg_quality: 90,
            output_dir: output_dir.to_path_buf(),
            canvas_width: 300,
            strip_height: 80,
            background: [20, 20, 20],
        }
    }

    fn store_with(positions: &[u8]) -> PhotoStore {
        let mut store = PhotoStore::new();
        for (i, value) in positions.iter().enumerate() {
            let position = Position::new(*value).unwrap();
            let image = ImageData::new(format!("{}.png", value), "image/png", gradient_png(40, 30));
            store.upsert(position, PhotoRecord::new(image, position, UploadStamp::from_millis(i as u64)));
        }
        store
    }

    #[test]
    fn test_filename_pattern() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap();
        assert_eq!(
            export_filename("photo-grid", "arranged", at, ExportFormat::Png),
            "photo-grid-arranged-20240501_123045000.png"
        );
        assert_eq!(
            export_filename("photo-grid", GRID_LABEL, at, ExportFormat::Jpeg),
            "photo-grid-grid-20240501_123045000.jpg"
        );
    }

    #[test]
    fn test_empty_requests_are_refused() {
        let store = PhotoStore::new();
        let view = PreviewProjector::build_view(&store, PreviewMode::Arranged);
        assert!(matches!(ExportRequest::preview(&view), Err(GridError::EmptyExportAttempt)));
        assert!(matches!(ExportRequest::grid(&store), Err(GridError::EmptyExportAttempt)));
    }

    #[test]
    fn test_preview_request_carries_mode_label() {
        let store = store_with(&[2, 5]);
        let mut view = PreviewProjector::build_view(&store, PreviewMode::Original);
        view.select_active(1);

        let request = ExportRequest::preview(&view).unwrap();
        assert_eq!(request.label(), "original");
        match request.surface() {
            ExportSurface::Preview { photos, active } => {
                assert_eq!(photos.len(), 2);
                assert_eq!(*active, 1);
            }
            other => panic!("unexpected surface {:?}", other),
        }
    }

    #[test]
    fn test_render_preview_dimensions() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings(temp_dir.path());
        let store = store_with(&[1, 2, 3]);
        let view = PreviewProjector::build_view(&store, PreviewMode::Arranged);
        let request = ExportRequest::preview(&view).unwrap();

        let canvas = SurfaceRenderer::new(&settings).render(request.surface()).unwrap();
        assert_eq!(canvas.dimensions(), (300, 380));
    }

    #[test]
    fn test_render_grid_marks_empty_cells() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings(temp_dir.path());
        let store = store_with(&[1]);
        let request = ExportRequest::grid(&store).unwrap();

        let canvas = SurfaceRenderer::new(&settings).render(request.surface()).unwrap();
        assert_eq!(canvas.dimensions(), (300, 300));

        // Centre of slot 9 is empty.
        assert_eq!(*canvas.get_pixel(250, 250), settings.placeholder());
        // The gap between cells keeps the background.
        assert_eq!(*canvas.get_pixel(2, 2), settings.background());
    }

    #[test]
    fn test_undecodable_photo_renders_as_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings(temp_dir.path());
        let mut store = store_with(&[9]);
        let position = Position::new(1).unwrap();
        let image = ImageData::new("broken.png", "image/png", b"garbage".to_vec());
        store.upsert(position, PhotoRecord::new(image, position, UploadStamp::from_millis(7)));

        let grid = ExportRequest::grid(&store).unwrap();
        let canvas = SurfaceRenderer::new(&settings).render(grid.surface()).unwrap();
        // Centre of slot 1 holds the broken photo.
        assert_eq!(*canvas.get_pixel(50, 50), settings.placeholder());
        assert_ne!(*canvas.get_pixel(250, 250), settings.placeholder());

        let mut view = PreviewProjector::build_view(&store, PreviewMode::Arranged);
        view.select_active(0);
        let preview = ExportRequest::preview(&view).unwrap();
        let canvas = SurfaceRenderer::new(&settings).render(preview.surface()).unwrap();
        assert_eq!(canvas.dimensions(), (300, 380));
        assert_eq!(*canvas.get_pixel(150, 150), settings.placeholder());
    }

    #[test]
    fn test_write_export_creates_decodable_file() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings(&temp_dir.path().join("exports"));
        let request = ExportRequest::grid(&store_with(&[1, 5, 9])).unwrap();

        let path = write_export(&settings, &request, Local::now()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("photo-grid-grid-"));
        assert!(name.ends_with(".png"));

        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (300, 300));
    }

    #[test]
    fn test_jpeg_encoding() {
        let bytes = encode(RgbImage::new(8, 8), ExportFormat::Jpeg, 80).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_exporter_reports_outcome() {
        let temp_dir = TempDir::new().unwrap();
        let mut exporter = Exporter::new(settings(temp_dir.path()), Handle::current());
        let store = store_with(&[4]);
        let view = PreviewProjector::build_view(&store, PreviewMode::Arranged);

        exporter.submit(ExportRequest::preview(&view).unwrap());
        assert!(exporter.is_busy());

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut outcomes = Vec::new();
        while outcomes.is_empty() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
            outcomes = exporter.drain();
        }

        assert_eq!(outcomes.len(), 1);
        let path = outcomes.remove(0).unwrap();
        assert!(path.starts_with(exporter.output_dir()));
        assert!(path.exists());
        assert!(!exporter.is_busy());
    }
}
