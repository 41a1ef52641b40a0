//! Error types for map loading, scene changes and portal parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while turning a map document into [`crate::MapData`].
///
/// Any of these makes the one map unavailable; the engine keeps running.
#[derive(Debug, Error)]
pub enum MapError {
    /// Reading the map or one of its external tilesets failed.
    #[error("I/O error reading {path}: {source}")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// A required field (dimensions, tile size, layers) is missing or has the wrong type.
    #[error("malformed map: {0}")]
    Malformed(String),
    /// A non-empty cell references a gid below every tileset's firstgid.
    #[error("layer '{layer}' cell {index} references gid {gid} which no tileset owns")]
    UnresolvedTileset {
        /// Layer name.
        layer: String,
        /// Row-major cell index.
        index: usize,
        /// Flag-stripped gid.
        gid: u32,
    },
    /// A layer's data length does not match width * height.
    #[error("invalid layer size for '{layer}': expected {expected} cells, got {actual}")]
    InvalidLayerSize {
        /// Layer name.
        layer: String,
        /// `width * height`.
        expected: usize,
        /// Cells present.
        actual: usize,
    },
    /// A custom property has a type this loader does not know.
    #[error("unsupported property type '{kind}' for property '{name}'")]
    UnsupportedPropertyType {
        /// Property name.
        name: String,
        /// The `type` as written.
        kind: String,
    },
    /// Only `.json` / `.tmj` documents are understood.
    #[error("unsupported file format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// Errors raised by scene transitions.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The requested scene id has no loaded map.
    #[error("scene not found: {0}")]
    NotFound(String),
    /// A scene map failed to load.
    #[error("scene '{scene}' failed to load: {source}")]
    Map {
        /// Scene id.
        scene: String,
        /// Load failure.
        #[source]
        source: MapError,
    },
}

/// A `portal` property that could not be understood. The portal stays inert.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortalError {
    /// The property is not a JSON string with a non-empty `targetScene`.
    #[error("object {object_id} has an invalid portal property: {reason}")]
    InvalidProperty {
        /// Id of the anchor object.
        object_id: u32,
        /// What was wrong with it.
        reason: String,
    },
}
