use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tokio::runtime::Handle;

use crate::error::GridError;
use crate::photo_store::ImageData;
use crate::slots::Position;

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("bmp", "image/bmp"),
    ("gif", "image/gif"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("webp", "image/webp"),
];

const UNKNOWN_MIME: &str = "application/octet-stream";

/// Extensions offered by the file picker.
pub fn image_extensions() -> Vec<&'static str> {
    IMAGE_TYPES.iter().map(|(ext, _)| *ext).collect()
}

/// MIME type for a local file, guessed from its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        return UNKNOWN_MIME;
    };
    let extension = extension.to_lowercase();

    IMAGE_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .unwrap_or(UNKNOWN_MIME)
}

pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// Anything that can be validated and slotted before its bytes are read.
pub trait BatchEntry {
    fn name(&self) -> &str;
    fn mime(&self) -> &str;
}

impl BatchEntry for ImageData {
    fn name(&self) -> &str {
        ImageData::name(self)
    }

    fn mime(&self) -> &str {
        ImageData::mime(self)
    }
}

/// A file the user picked or dropped, not yet read.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    path: PathBuf,
    name: String,
    mime: &'static str,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = mime_for_path(&path);
        Self { path, name, mime }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_image(&self) -> bool {
        is_image_mime(self.mime)
    }
}

impl BatchEntry for SelectedFile {
    fn name(&self) -> &str {
        SelectedFile::name(self)
    }

    fn mime(&self) -> &str {
        self.mime
    }
}

/// Reads a selected file into an image payload.
pub fn read_image_file(file: &SelectedFile) -> Result<ImageData, GridError> {
    let bytes = std::fs::read(&file.path).map_err(|source| GridError::Read {
        name: file.name.clone(),
        source,
    })?;
    debug!("Read {} ({} bytes)", file.name, bytes.len());
    Ok(ImageData::new(file.name.clone(), file.mime, bytes))
}

/// Result of one background read, tagged with the slot it was meant for.
#[derive(Debug)]
pub struct LoadedFile {
    pub position: Position,
    pub result: Result<ImageData, GridError>,
}

/// Reads files on the blocking pool and hands results back to the UI thread.
///
/// Reads are neither ordered nor cancellable. When two reads target the same
/// slot, whichever finishes last is the one that ends up on the grid.
pub struct FileLoader {
    handle: Handle,
    sender: Sender<LoadedFile>,
    receiver: Receiver<LoadedFile>,
    in_flight: usize,
}

impl FileLoader {
    pub fn new(handle: Handle) -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            handle,
            sender,
            receiver,
            in_flight: 0,
        }
    }

    pub fn load(&mut self, file: SelectedFile, position: Position) {
        let sender = self.sender.clone();
        self.in_flight += 1;
        self.handle.spawn_blocking(move || {
            let result = read_image_file(&file);
            if let Err(e) = &result {
                warn!("Failed to read {}: {}", file.path.display(), e);
            }
            // The receiver lives as long as the app; a closed channel means shutdown.
            let _ = sender.send(LoadedFile { position, result });
        });
    }

    /// Completed reads since the last call, in completion order.
    pub fn drain(&mut self) -> Vec<LoadedFile> {
        let done: Vec<LoadedFile> = self.receiver.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(done.len());
        done
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }
}
