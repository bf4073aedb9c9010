use crossbeam::channel::Receiver;
use log::{debug, info};
use std::time::{Duration, Instant};

use crate::controller::{ArrangementController, GridChange};
use crate::error::GridError;
use crate::export::{ExportOutcome, ExportRequest};
use crate::ingest::{LoadedFile, SelectedFile};
use crate::notifications::{Notices, Severity};
use crate::photo_store::PhotoStore;
use crate::preview::{PreviewMode, PreviewProjector};
use crate::slots::Position;

/// Everything one window session knows about: the grid, the open preview,
/// pending confirmation and the toasts on screen.
///
/// Owned by the app and passed around by reference; there is no global state.
pub struct GridSession {
    controller: ArrangementController,
    changes: Receiver<GridChange>,
    preview: Option<PreviewProjector>,
    notices: Notices,
    confirming_reset: bool,
}

impl GridSession {
    pub fn new(mut controller: ArrangementController, toast_lifetime: Duration) -> Self {
        let changes = controller.subscribe();
        Self {
            controller,
            changes,
            preview: None,
            notices: Notices::new(toast_lifetime),
            confirming_reset: false,
        }
    }

    pub fn store(&self) -> &PhotoStore {
        self.controller.store()
    }

    /// Change feed for the rendering layer.
    pub fn subscribe(&mut self) -> Receiver<GridChange> {
        self.controller.subscribe()
    }

    // ------------------------------------------------------------------
    // Uploads
    // ------------------------------------------------------------------

    /// Validates a file picked for one slot. Returns the read to schedule.
    pub fn choose_for_slot(&mut self, position: Position, file: SelectedFile) -> Option<(SelectedFile, Position)> {
        if !file.is_image() {
            self.notices.push_error(&GridError::InvalidFileType {
                name: file.name().to_string(),
            });
            return None;
        }
        Some((file, position))
    }

    /// Plans a multi-file selection against the empty slots. Returns the reads
    /// to schedule, each already paired with its slot.
    pub fn choose_batch(&mut self, files: Vec<SelectedFile>) -> Vec<(SelectedFile, Position)> {
        let plan = match self.controller.plan_batch(&files) {
            Ok(plan) => plan,
            Err(e) => {
                self.notices.push_error(&e);
                return Vec::new();
            }
        };

        for error in &plan.rejected {
            self.notices.push_error(error);
        }
        if !plan.unplaced.is_empty() {
            debug!("{} files found no empty slot", plan.unplaced.len());
        }
        debug!("Batch placed into slots {:?}", plan.placed_positions());

        let mut files: Vec<Option<SelectedFile>> = files.into_iter().map(Some).collect();
        plan.placements
            .iter()
            .filter_map(|&(index, position)| files[index].take().map(|file| (file, position)))
            .collect()
    }

    /// Applies a finished read. The last read to finish for a slot wins.
    pub fn complete_load(&mut self, loaded: LoadedFile) {
        let result = loaded
            .result
            .and_then(|image| self.controller.upload_single(loaded.position, image));
        if let Err(e) = result {
            self.notices.push_error(&e);
        }
    }

    // ------------------------------------------------------------------
    // Arrangement
    // ------------------------------------------------------------------

    pub fn reorder(&mut self, source: u8, target: u8) {
        if let Err(e) = self.controller.reorder_raw(source, target) {
            debug!("Ignoring drop: {}", e);
            self.notices.push_error(&e);
        }
    }

    pub fn request_reset(&mut self) {
        self.confirming_reset = true;
    }

    pub fn is_confirming_reset(&self) -> bool {
        self.confirming_reset
    }

    pub fn confirm_reset(&mut self, confirmed: bool) {
        self.confirming_reset = false;
        if confirmed {
            self.controller.reset_all();
            self.notices.push(Severity::Info, "All photos have been removed");
        }
    }

    // ------------------------------------------------------------------
    // Preview
    // ------------------------------------------------------------------

    /// Opens the preview in arranged order. Refused while the grid is empty.
    pub fn open_preview(&mut self) -> bool {
        if self.store().is_empty() {
            self.notices.push_error(&GridError::EmptyExportAttempt);
            return false;
        }
        self.preview = Some(PreviewProjector::build_view(self.store(), PreviewMode::Arranged));
        true
    }

    pub fn close_preview(&mut self) {
        self.preview = None;
    }

    pub fn preview(&self) -> Option<&PreviewProjector> {
        self.preview.as_ref()
    }

    pub fn set_preview_mode(&mut self, mode: PreviewMode) {
        if let Some(preview) = &mut self.preview {
            preview.switch_mode(self.controller.store(), mode);
        }
    }

    pub fn select_preview_photo(&mut self, index: usize) -> bool {
        self.preview
            .as_mut()
            .map(|preview| preview.select_active(index))
            .unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    pub fn export_preview_request(&mut self) -> Option<ExportRequest> {
        let request = match &self.preview {
            Some(preview) => ExportRequest::preview(preview),
            None => Err(GridError::EmptyExportAttempt),
        };
        self.accept_request(request)
    }

    pub fn export_grid_request(&mut self) -> Option<ExportRequest> {
        let request = ExportRequest::grid(self.controller.store());
        self.accept_request(request)
    }

    fn accept_request(&mut self, request: Result<ExportRequest, GridError>) -> Option<ExportRequest> {
        match request {
            Ok(request) => Some(request),
            Err(e) => {
                self.notices.push_error(&e);
                None
            }
        }
    }

    pub fn record_export(&mut self, outcome: ExportOutcome) {
        match outcome {
            Ok(path) => {
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.notices
                    .push(Severity::Success, format!("Photo downloaded successfully: {}", name));
            }
            Err(e) => self.notices.push_error(&e),
        }
    }

    // ------------------------------------------------------------------
    // Per-frame housekeeping
    // ------------------------------------------------------------------

    /// Catches the open preview up with grid changes. Returns whether anything
    /// changed since the last call.
    pub fn sync(&mut self) -> bool {
        let changed = self.changes.try_iter().count() > 0;
        if !changed {
            return false;
        }

        if let Some(preview) = &mut self.preview {
            preview.refresh(self.controller.store());
            if preview.is_empty() {
                info!("Grid emptied, closing preview");
                self.preview = None;
            }
        }
        true
    }

    pub fn expire_notices(&mut self, now: Instant) {
        self.notices.expire(now);
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }
}
