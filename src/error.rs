use thiserror::Error;

use crate::slots::SLOT_COUNT;

/// Everything that can go wrong while arranging or exporting photos.
///
/// None of these are fatal. The session turns each one into a transient
/// notice and leaves the grid as it was.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("{name} is not an image file")]
    InvalidFileType { name: String },

    #[error("You can only upload up to {max} photos")]
    TooManyFiles { count: usize, max: usize },

    #[error("Please upload at least one photo")]
    EmptyExportAttempt,

    #[error("Export failed: {0}")]
    ExportRenderFailure(String),

    #[error("Slot {position} is not on the grid")]
    OutOfRangeReorder { position: u8 },

    #[error("Could not read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl GridError {
    pub fn too_many(count: usize) -> Self {
        GridError::TooManyFiles {
            count,
            max: SLOT_COUNT,
        }
    }

    /// Errors that should never be shown to the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, GridError::OutOfRangeReorder { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(
            GridError::too_many(12).to_string(),
            "You can only upload up to 9 photos"
        );
        assert_eq!(
            GridError::InvalidFileType { name: "notes.txt".into() }.to_string(),
            "notes.txt is not an image file"
        );
        assert_eq!(
            GridError::EmptyExportAttempt.to_string(),
            "Please upload at least one photo"
        );
    }

    #[test]
    fn test_only_reorder_errors_are_silent() {
        assert!(GridError::OutOfRangeReorder { position: 12 }.is_silent());
        assert!(!GridError::EmptyExportAttempt.is_silent());
        assert!(!GridError::ExportRenderFailure("disk full".into()).is_silent());
    }
}
