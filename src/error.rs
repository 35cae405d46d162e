//! Error types for level and settings loading.
//!
//! The simulation tick itself never fails; these only surface while turning
//! authored data into a runnable level.

use thiserror::Error;

/// Errors raised while loading or validating a level or its physics settings.
#[derive(Debug, Error)]
pub enum LevelError {
    /// Malformed JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Level file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zero or negative platform dimensions
    #[error("Platform {index} has invalid size {width}x{height}")]
    InvalidGeometry {
        /// Position in the level's platform list
        index: usize,
        width: f32,
        height: f32,
    },

    /// NaN or infinite platform coordinates
    #[error("Platform {index} has non-finite geometry")]
    NonFiniteGeometry { index: usize },

    /// Two platforms share an explicit id
    #[error("Duplicate platform id {0}")]
    DuplicatePlatformId(u32),

    /// Spawn point is already past a kill bound
    #[error("Player start ({x}, {y}) is outside the playable band (death plane {death_plane_y})")]
    SpawnOutOfBounds { x: f32, y: f32, death_plane_y: f32 },

    /// Physics settings rejected
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}
