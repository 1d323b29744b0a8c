// ============================================
// Terrain Errors - Ошибки инициализации террейна
// ============================================

use std::path::PathBuf;

use crate::gpu::compute::GpuError;

/// Ошибки террейна и GPU ресурсов
#[derive(thiserror::Error, Debug)]
pub enum TerrainError {
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode heightmap {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Heightmap {path} is {width}x{height}, expected a square image")]
    NotSquare {
        path: PathBuf,
        width: u32,
        height: u32,
    },

    #[error("GPU resource error: {0}")]
    GpuResource(String),

    #[error("Texture '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("Unknown texture handle {0}")]
    UnknownTexture(u32),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl TerrainError {
    pub fn gpu<T: ToString>(msg: T) -> Self {
        TerrainError::GpuResource(msg.to_string())
    }

    pub fn invariant<T: ToString>(msg: T) -> Self {
        TerrainError::InvariantViolation(msg.to_string())
    }
}

impl From<GpuError> for TerrainError {
    fn from(e: GpuError) -> Self {
        match e {
            GpuError::UnknownTexture(id) => TerrainError::UnknownTexture(id),
            other => TerrainError::GpuResource(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TerrainError>;
