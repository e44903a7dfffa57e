use std::path::PathBuf;

use thiserror::Error;

use crate::ground_truth::{BoreholeId, GroundwaterId, LayerId};

#[derive(Error, Debug)]
pub enum InputError {
    #[error("{what} not found: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },
}

impl InputError {
    pub fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what,
            path: path.into(),
        }
    }
}

/// Errors raised by ground-truth edits. Every variant leaves the document untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("{field} must be numeric, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("unknown borehole reference: {0}")]
    UnknownBorehole(BoreholeId),

    #[error("unknown layer reference: {0}")]
    UnknownLayer(LayerId),

    #[error("unknown groundwater reference: {0}")]
    UnknownGroundwater(GroundwaterId),
}

impl EditError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidNumber { .. } | Self::MissingField { .. }
        )
    }
}
