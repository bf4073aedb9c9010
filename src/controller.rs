use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, info, warn};

use crate::clock::{MonotonicClock, UploadClock, UploadStamp};
use crate::error::GridError;
use crate::ingest::{is_image_mime, BatchEntry};
use crate::photo_store::{ImageData, PhotoRecord, PhotoStore};
use crate::slots::{Position, SLOT_COUNT};

/// Change notifications for anything rendering the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridChange {
    Placed {
        position: Position,
        stamp: UploadStamp,
    },
    Replaced {
        position: Position,
        previous: UploadStamp,
        stamp: UploadStamp,
    },
    Swapped {
        a: Position,
        b: Position,
    },
    Cleared {
        removed: usize,
    },
}

/// Where each file of a batch goes.
///
/// Indices refer to the order the files were handed in.
#[derive(Debug, Default)]
pub struct BatchPlan {
    pub placements: Vec<(usize, Position)>,
    pub rejected: Vec<GridError>,
    /// Files that found no empty slot.
    pub unplaced: Vec<usize>,
}

impl BatchPlan {
    pub fn placed_positions(&self) -> Vec<Position> {
        self.placements.iter().map(|(_, position)| *position).collect()
    }
}

/// Owns the photo store and is the only thing allowed to mutate it.
pub struct ArrangementController {
    store: PhotoStore,
    clock: Box<dyn UploadClock>,
    subscribers: Vec<Sender<GridChange>>,
}

impl ArrangementController {
    pub fn new() -> Self {
        Self::with_clock(Box::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Box<dyn UploadClock>) -> Self {
        Self {
            store: PhotoStore::new(),
            clock,
            subscribers: Vec::new(),
        }
    }

    pub fn store(&self) -> &PhotoStore {
        &self.store
    }

    /// Registers a listener. Dropping the receiver unsubscribes it.
    pub fn subscribe(&mut self) -> Receiver<GridChange> {
        let (sender, receiver) = channel::unbounded();
        self.subscribers.push(sender);
        receiver
    }

    /// Puts `image` into `position`, replacing any photo already there.
    pub fn upload_single(&mut self, position: Position, image: ImageData) -> Result<Position, GridError> {
        if !is_image_mime(image.mime()) {
            warn!("Rejected {} ({})", image.name(), image.mime());
            return Err(GridError::InvalidFileType {
                name: image.name().to_string(),
            });
        }

        let stamp = self.clock.now();
        debug!("Placing {} at slot {} (stamp {})", image.name(), position, stamp);
        let record = PhotoRecord::new(image, position, stamp);

        let change = match self.store.upsert(position, record) {
            Some(previous) => GridChange::Replaced {
                position,
                previous: previous.uploaded_at(),
                stamp,
            },
            None => GridChange::Placed { position, stamp },
        };
        self.notify(change);
        Ok(position)
    }

    /// Works out where a batch would land without touching the store.
    ///
    /// The n-th file is paired with the n-th empty slot. A non-image is
    /// rejected and its slot stays empty. Once the slots run out the remaining
    /// files are left unplaced.
    pub fn plan_batch<T: BatchEntry>(&self, files: &[T]) -> Result<BatchPlan, GridError> {
        if files.len() > SLOT_COUNT {
            warn!("Rejected batch of {} files", files.len());
            return Err(GridError::too_many(files.len()));
        }

        let mut plan = BatchPlan::default();
        let mut empty = self.store.empty_positions().into_iter();

        for (index, file) in files.iter().enumerate() {
            let Some(position) = empty.next() else {
                plan.unplaced.extend(index..files.len());
                break;
            };
            if !is_image_mime(file.mime()) {
                warn!("Skipping {} ({})", file.name(), file.mime());
                plan.rejected.push(GridError::InvalidFileType {
                    name: file.name().to_string(),
                });
                continue;
            }
            plan.placements.push((index, position));
        }

        Ok(plan)
    }

    /// Fills empty slots with `images` in order. See [`Self::plan_batch`].
    pub fn upload_batch(&mut self, images: Vec<ImageData>) -> Result<BatchPlan, GridError> {
        let plan = self.plan_batch(&images)?;

        let mut images: Vec<Option<ImageData>> = images.into_iter().map(Some).collect();
        for &(index, position) in &plan.placements {
            if let Some(image) = images[index].take() {
                self.upload_single(position, image)?;
            }
        }

        info!(
            "Batch upload: {} placed, {} rejected, {} without a slot",
            plan.placements.len(),
            plan.rejected.len(),
            plan.unplaced.len()
        );
        Ok(plan)
    }

    /// Swaps the photos in two slots. Returns `false` when there was nothing to do.
    pub fn reorder(&mut self, source: Position, target: Position) -> bool {
        if source == target {
            return false;
        }
        self.store.swap_positions(source, target);
        debug!("Swapped slots {} and {}", source, target);
        self.notify(GridChange::Swapped { a: source, b: target });
        true
    }

    /// [`Self::reorder`] for raw slot numbers coming out of a drag gesture.
    pub fn reorder_raw(&mut self, source: u8, target: u8) -> Result<bool, GridError> {
        let source = Position::new(source).ok_or(GridError::OutOfRangeReorder { position: source })?;
        let target = Position::new(target).ok_or(GridError::OutOfRangeReorder { position: target })?;
        Ok(self.reorder(source, target))
    }

    /// Empties every slot.
    pub fn reset_all(&mut self) -> usize {
        let removed = self.store.remove_all();
        info!("Removed all {} photos", removed);
        self.notify(GridChange::Cleared { removed });
        removed
    }

    fn notify(&mut self, change: GridChange) {
        self.subscribers
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
    }
}

impl Default for ArrangementController {
    fn default() -> Self {
        Self::new()
    }
}
