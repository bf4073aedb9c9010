use std::collections::BTreeMap;
use std::sync::Arc;

use crate::clock::UploadStamp;
use crate::slots::{Position, SlotState};

/// Encoded image payload exactly as it was read from disk.
///
/// The bytes are shared, so cloning a record for a preview or an export
/// snapshot never copies pixel data.
#[derive(Debug, Clone)]
pub struct ImageData {
    name: String,
    mime: String,
    bytes: Arc<[u8]>,
}

impl ImageData {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// A photo placed on the grid.
///
/// Only `position` ever changes after creation, and only through
/// [`PhotoStore::upsert`] or [`PhotoStore::swap_positions`].
#[derive(Debug, Clone)]
pub struct PhotoRecord {
    image: ImageData,
    position: Position,
    uploaded_at: UploadStamp,
}

impl PhotoRecord {
    pub fn new(image: ImageData, position: Position, uploaded_at: UploadStamp) -> Self {
        Self {
            image,
            position,
            uploaded_at,
        }
    }

    pub fn image(&self) -> &ImageData {
        &self.image
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn uploaded_at(&self) -> UploadStamp {
        self.uploaded_at
    }
}

/// Photos keyed by slot. Holds at most one record per position, so never more
/// than nine.
#[derive(Debug, Default)]
pub struct PhotoStore {
    records: BTreeMap<Position, PhotoRecord>,
}

impl PhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `record` at `position`, returning whatever was there before.
    pub fn upsert(&mut self, position: Position, mut record: PhotoRecord) -> Option<PhotoRecord> {
        record.position = position;
        self.records.insert(position, record)
    }

    /// Empties the store, returning how many records were dropped.
    pub fn remove_all(&mut self) -> usize {
        let removed = self.records.len();
        self.records.clear();
        removed
    }

    /// Records in grid order.
    pub fn ordered_by_position(&self) -> Vec<PhotoRecord> {
        self.records.values().cloned().collect()
    }

    /// Records in the order they were uploaded. Unaffected by swaps.
    pub fn ordered_by_upload(&self) -> Vec<PhotoRecord> {
        let mut records = self.ordered_by_position();
        records.sort_by_key(PhotoRecord::uploaded_at);
        records
    }

    /// Exchanges the occupants of `a` and `b`. A missing occupant on one side
    /// leaves the other side empty afterwards.
    pub fn swap_positions(&mut self, a: Position, b: Position) {
        if a == b {
            return;
        }

        let at_a = self.records.remove(&a);
        let at_b = self.records.remove(&b);

        if let Some(mut record) = at_a {
            record.position = b;
            self.records.insert(b, record);
        }
        if let Some(mut record) = at_b {
            record.position = a;
            self.records.insert(a, record);
        }
    }

    pub fn get(&self, position: Position) -> Option<&PhotoRecord> {
        self.records.get(&position)
    }

    pub fn is_occupied(&self, position: Position) -> bool {
        self.records.contains_key(&position)
    }

    pub fn slot_state(&self, position: Position) -> SlotState {
        if self.is_occupied(position) {
            SlotState::Occupied
        } else {
            SlotState::Empty
        }
    }

    /// Vacant slots in ascending order.
    pub fn empty_positions(&self) -> Vec<Position> {
        Position::all()
            .filter(|position| !self.is_occupied(*position))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(value: u8) -> Position {
        Position::new(value).unwrap()
    }

    fn photo(name: &str, stamp: u64) -> PhotoRecord {
        let image = ImageData::new(name, "image/png", name.as_bytes().to_vec());
        PhotoRecord::new(image, pos(1), UploadStamp::from_millis(stamp))
    }

    fn names(records: &[PhotoRecord]) -> Vec<&str> {
        records.iter().map(|record| record.image().name()).collect()
    }

    fn positions(records: &[PhotoRecord]) -> Vec<u8> {
        records.iter().map(|record| record.position().get()).collect()
    }

    /// A at 3 (t=100), B at 1 (t=200), C at 2 (t=300).
    fn worked_example() -> PhotoStore {
        let mut store = PhotoStore::new();
        store.upsert(pos(3), photo("A", 100));
        store.upsert(pos(1), photo("B", 200));
        store.upsert(pos(2), photo("C", 300));
        store
    }

    #[test]
    fn test_upsert_then_read() {
        let mut store = PhotoStore::new();
        for position in Position::all() {
            let name = format!("photo-{}", position);
            store.upsert(position, photo(&name, position.get() as u64));

            let stored = store.get(position).unwrap();
            assert_eq!(stored.image().name(), name);
            assert_eq!(stored.position(), position);
        }
        assert_eq!(store.len(), 9);
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let mut store = PhotoStore::new();
        assert!(store.upsert(pos(4), photo("old", 1)).is_none());

        let replaced = store.upsert(pos(4), photo("new", 2)).unwrap();
        assert_eq!(replaced.image().name(), "old");
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(pos(4)).unwrap().image().name(), "new");
    }

    #[test]
    fn test_worked_example_orderings() {
        let mut store = worked_example();

        let arranged = store.ordered_by_position();
        assert_eq!(names(&arranged), vec!["B", "C", "A"]);
        assert_eq!(positions(&arranged), vec![1, 2, 3]);

        let uploaded = store.ordered_by_upload();
        assert_eq!(names(&uploaded), vec!["A", "B", "C"]);
        assert_eq!(positions(&uploaded), vec![3, 1, 2]);

        store.swap_positions(pos(1), pos(3));

        let arranged = store.ordered_by_position();
        assert_eq!(names(&arranged), vec!["A", "C", "B"]);

        let uploaded = store.ordered_by_upload();
        assert_eq!(names(&uploaded), vec!["A", "B", "C"]);
        assert_eq!(positions(&uploaded), vec![1, 3, 2]);
    }

    #[test]
    fn test_swap_is_an_involution() {
        let mut store = worked_example();
        let before = positions(&store.ordered_by_upload());

        store.swap_positions(pos(2), pos(3));
        store.swap_positions(pos(2), pos(3));

        assert_eq!(positions(&store.ordered_by_upload()), before);
        assert_eq!(names(&store.ordered_by_position()), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_upload_order_survives_any_swaps() {
        let mut store = worked_example();
        let before = names(&store.ordered_by_upload())
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();

        let swaps = [(1, 9), (3, 2), (9, 5), (5, 1), (2, 2), (7, 8)];
        for (a, b) in swaps {
            store.swap_positions(pos(a), pos(b));
            assert_eq!(names(&store.ordered_by_upload()), before);
        }
    }

    #[test]
    fn test_swap_with_empty_slot_moves_occupancy() {
        let mut store = worked_example();
        store.swap_positions(pos(2), pos(8));

        assert_eq!(store.slot_state(pos(2)), SlotState::Empty);
        assert_eq!(store.slot_state(pos(8)), SlotState::Occupied);
        assert_eq!(store.get(pos(8)).unwrap().image().name(), "C");
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_swap_two_empty_slots_is_harmless() {
        let mut store = worked_example();
        store.swap_positions(pos(6), pos(7));
        assert_eq!(store.len(), 3);
        assert!(!store.is_occupied(pos(6)));
        assert!(!store.is_occupied(pos(7)));
    }

    #[test]
    fn test_remove_all_and_empty_positions() {
        let mut store = worked_example();
        assert_eq!(
            store.empty_positions().iter().map(|p| p.get()).collect::<Vec<_>>(),
            vec![4, 5, 6, 7, 8, 9]
        );

        assert_eq!(store.remove_all(), 3);
        assert!(store.is_empty());
        assert!(store.ordered_by_position().is_empty());
        assert!(Position::all().all(|p| store.slot_state(p).is_empty()));
    }
}
