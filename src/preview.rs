use serde::{Deserialize, Serialize};

use crate::photo_store::{PhotoRecord, PhotoStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    /// Grid order, as arranged by dragging.
    #[default]
    Arranged,
    /// The order photos were uploaded in.
    Original,
}

impl std::fmt::Display for PreviewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl PreviewMode {
    pub fn all() -> &'static [PreviewMode] {
        &[PreviewMode::Arranged, PreviewMode::Original]
    }

    pub fn name(&self) -> &'static str {
        match self {
            PreviewMode::Arranged => "Arranged",
            PreviewMode::Original => "Original",
        }
    }

    /// Lowercase form used in export filenames.
    pub fn label(&self) -> &'static str {
        match self {
            PreviewMode::Arranged => "arranged",
            PreviewMode::Original => "original",
        }
    }
}

/// An ordered snapshot of the grid for the preview surface, plus which photo is
/// shown large.
#[derive(Debug, Clone)]
pub struct PreviewProjector {
    mode: PreviewMode,
    photos: Vec<PhotoRecord>,
    active: usize,
}

impl PreviewProjector {
    /// Projects the store in `mode` order. The first photo becomes active.
    pub fn build_view(store: &PhotoStore, mode: PreviewMode) -> Self {
        let photos = match mode {
            PreviewMode::Arranged => store.ordered_by_position(),
            PreviewMode::Original => store.ordered_by_upload(),
        };
        Self {
            mode,
            photos,
            active: 0,
        }
    }

    /// Rebuilds in another mode. The active photo always goes back to the first.
    pub fn switch_mode(&mut self, store: &PhotoStore, mode: PreviewMode) {
        *self = Self::build_view(store, mode);
    }

    /// Rebuilds in the current mode after the grid changed, keeping the active
    /// index when it still points at a photo.
    pub fn refresh(&mut self, store: &PhotoStore) {
        let active = self.active;
        *self = Self::build_view(store, self.mode);
        if active < self.photos.len() {
            self.active = active;
        }
    }

    /// Returns `false` and leaves the selection alone when `index` is out of range.
    pub fn select_active(&mut self, index: usize) -> bool {
        if index >= self.photos.len() {
            return false;
        }
        self.active = index;
        true
    }

    pub fn mode(&self) -> PreviewMode {
        self.mode
    }

    pub fn photos(&self) -> &[PhotoRecord] {
        &self.photos
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_photo(&self) -> Option<&PhotoRecord> {
        self.photos.get(self.active)
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::UploadStamp;
    use crate::photo_store::ImageData;
    use crate::slots::Position;

    fn store_with(entries: &[(&str, u8, u64)]) -> PhotoStore {
        let mut store = PhotoStore::new();
        for (name, position, stamp) in entries {
            let position = Position::new(*position).unwrap();
            let image = ImageData::new(*name, "image/png", vec![1, 2, 3]);
            store.upsert(position, PhotoRecord::new(image, position, UploadStamp::from_millis(*stamp)));
        }
        store
    }

    fn names(view: &PreviewProjector) -> Vec<&str> {
        view.photos().iter().map(|p| p.image().name()).collect()
    }

    #[test]
    fn test_build_view_per_mode() {
        let store = store_with(&[("A", 3, 100), ("B", 1, 200), ("C", 2, 300)]);

        let arranged = PreviewProjector::build_view(&store, PreviewMode::Arranged);
        assert_eq!(names(&arranged), vec!["B", "C", "A"]);
        assert_eq!(arranged.active_index(), 0);
        assert_eq!(arranged.active_photo().unwrap().image().name(), "B");

        let original = PreviewProjector::build_view(&store, PreviewMode::Original);
        assert_eq!(names(&original), vec!["A", "B", "C"]);
        assert_eq!(original.active_photo().unwrap().image().name(), "A");
    }

    #[test]
    fn test_switching_mode_resets_active() {
        let store = store_with(&[("A", 3, 100), ("B", 1, 200), ("C", 2, 300)]);
        let mut view = PreviewProjector::build_view(&store, PreviewMode::Arranged);

        assert!(view.select_active(2));
        assert_eq!(view.active_index(), 2);

        view.switch_mode(&store, PreviewMode::Original);
        assert_eq!(view.mode(), PreviewMode::Original);
        assert_eq!(view.active_index(), 0);
    }

    #[test]
    fn test_select_out_of_range_is_ignored() {
        let store = store_with(&[("A", 1, 100), ("B", 2, 200)]);
        let mut view = PreviewProjector::build_view(&store, PreviewMode::Arranged);
        view.select_active(1);

        assert!(!view.select_active(2));
        assert_eq!(view.active_index(), 1);
    }

    #[test]
    fn test_building_does_not_touch_store() {
        let store = store_with(&[("A", 5, 100), ("B", 4, 200)]);
        let before: Vec<u8> = store.ordered_by_position().iter().map(|p| p.position().get()).collect();

        let _ = PreviewProjector::build_view(&store, PreviewMode::Original);
        let _ = PreviewProjector::build_view(&store, PreviewMode::Arranged);

        let after: Vec<u8> = store.ordered_by_position().iter().map(|p| p.position().get()).collect();
        assert_eq!(before, after);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_refresh_keeps_active_when_possible() {
        let mut store = store_with(&[("A", 1, 100), ("B", 2, 200), ("C", 3, 300)]);
        let mut view = PreviewProjector::build_view(&store, PreviewMode::Arranged);
        view.select_active(2);

        store.swap_positions(Position::new(1).unwrap(), Position::new(3).unwrap());
        view.refresh(&store);
        assert_eq!(view.active_index(), 2);
        assert_eq!(names(&view), vec!["C", "B", "A"]);

        store.remove_all();
        view.refresh(&store);
        assert!(view.is_empty());
        assert_eq!(view.active_index(), 0);
        assert!(view.active_photo().is_none());
    }

    #[test]
    fn test_empty_store_view() {
        let view = PreviewProjector::build_view(&PhotoStore::new(), PreviewMode::Original);
        assert!(view.is_empty());
        assert!(view.active_photo().is_none());
    }
}
