use crossbeam::channel::Receiver;
use egui::{Context, TextureHandle, TextureOptions};
use std::collections::{HashMap, HashSet};

use crate::clock::UploadStamp;
use crate::controller::GridChange;
use crate::image_processor::ImageProcessor;
use crate::photo_store::PhotoRecord;

/// GPU textures for the photos on the grid, keyed by upload stamp.
///
/// A stamp identifies one upload for the whole session, so swaps never
/// invalidate anything. Only overwrites and resets drop textures.
pub struct TextureCache {
    processor: ImageProcessor,
    changes: Receiver<GridChange>,
    textures: HashMap<UploadStamp, TextureHandle>,
    undecodable: HashSet<UploadStamp>,
}

impl TextureCache {
    pub fn new(processor: ImageProcessor, changes: Receiver<GridChange>) -> Self {
        Self {
            processor,
            changes,
            textures: HashMap::new(),
            undecodable: HashSet::new(),
        }
    }

    /// Applies pending grid changes.
    pub fn sync(&mut self) {
        for change in self.changes.try_iter() {
            match change {
                GridChange::Replaced { previous, .. } => {
                    self.textures.remove(&previous);
                    self.undecodable.remove(&previous);
                }
                GridChange::Cleared { .. } => {
                    self.textures.clear();
                    self.undecodable.clear();
                }
                GridChange::Placed { .. } | GridChange::Swapped { .. } => {}
            }
        }
    }

    /// Texture for `record`, decoding it on first use. `None` if the payload
    /// can't be decoded.
    pub fn texture_for(&mut self, ctx: &Context, record: &PhotoRecord) -> Option<TextureHandle> {
        let stamp = record.uploaded_at();
        if let Some(texture) = self.textures.get(&stamp) {
            return Some(texture.clone());
        }
        if self.undecodable.contains(&stamp) {
            return None;
        }

        match self.processor.decode_for_display(record.image().bytes()) {
            Ok(image) => {
                let size = [image.width() as usize, image.height() as usize];
                let pixels = image.as_flat_samples();
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());

                let texture = ctx.load_texture(format!("photo_{}", stamp), color_image, TextureOptions::LINEAR);
                self.textures.insert(stamp, texture.clone());
                Some(texture)
            }
            Err(e) => {
                log::warn!("Cannot display {}: {:#}", record.image().name(), e);
                self.undecodable.insert(stamp);
                None
            }
        }
    }
}
