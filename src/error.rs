//! Error taxonomy for viewer operations.
//!
//! Every error is scoped to the single operation that produced it. A failed
//! load or export leaves the registry exactly as it was.

use std::path::PathBuf;

/// Errors produced by loading, editing and exporting layers.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// The input was not JSON, or its root was neither a `Feature` nor a
    /// `FeatureCollection`.
    #[error("{source_name} is not a valid GeoJSON document: {reason}")]
    InvalidGeoJson { source_name: String, reason: String },

    /// Export was requested with no layers and no editor content.
    #[error("nothing to export: no layers and no editor content")]
    EmptyExport,

    /// The editor was asked to render but holds only whitespace.
    #[error("the GeoJSON editor is empty")]
    EmptyEditor,

    /// A layer index did not address an existing layer.
    #[error("layer index {index} out of range (registry holds {len} layers)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Reading or writing a file failed.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot rasterizer could not produce an image.
    #[error("render failed: {0}")]
    Render(String),

    /// A JSON document (profile or export) could not be read or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ViewerError {
    pub(crate) fn invalid(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidGeoJson {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ViewerError>;
