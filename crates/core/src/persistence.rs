//! Annotation persistence
//!
//! Saves and loads the committed annotation set as a JSON sidecar file
//! alongside the dataset. Writes go through a temporary file and rename so
//! a crash mid-write never leaves a truncated sidecar behind.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anno_model::PortableAnnotation;

const SIDECAR_SCHEMA_VERSION: u32 = 1;
const SIDECAR_SUFFIX: &str = ".voxmark-annotations.json";

/// Error types for persistence operations
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported sidecar version {0}")]
    UnsupportedVersion(u32),
}

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

#[derive(Debug, Serialize, Deserialize)]
struct AnnotationEnvelope {
    version: u32,
    annotations: Vec<PortableAnnotation>,
}

/// Get the sidecar path for a given dataset path
///
/// The annotations are stored as a JSON sidecar file next to the dataset:
/// `/data/volume.zarr` becomes `/data/volume.zarr.voxmark-annotations.json`.
pub fn sidecar_path(dataset_path: &Path) -> PathBuf {
    let mut path_str = dataset_path.to_string_lossy().to_string();
    path_str.push_str(SIDECAR_SUFFIX);
    PathBuf::from(path_str)
}

/// Save annotations to the dataset's sidecar file
///
/// Returns the path to the saved sidecar. The write is atomic (temporary
/// file + rename).
pub fn save_annotations(
    dataset_path: &Path,
    annotations: &[PortableAnnotation],
) -> PersistenceResult<PathBuf> {
    let path = sidecar_path(dataset_path);
    let envelope = AnnotationEnvelope {
        version: SIDECAR_SCHEMA_VERSION,
        annotations: annotations.to_vec(),
    };

    let json = serde_json::to_string_pretty(&envelope)?;
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, &path)?;

    Ok(path)
}

/// Load annotations from the dataset's sidecar file
///
/// Returns `Ok(None)` when no sidecar exists.
pub fn load_annotations(
    dataset_path: &Path,
) -> PersistenceResult<Option<Vec<PortableAnnotation>>> {
    let path = sidecar_path(dataset_path);
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(&path)?;
    let envelope: AnnotationEnvelope = serde_json::from_str(&json)?;
    if envelope.version > SIDECAR_SCHEMA_VERSION {
        return Err(PersistenceError::UnsupportedVersion(envelope.version));
    }

    Ok(Some(envelope.annotations))
}

/// Check if a sidecar exists for a dataset
pub fn sidecar_exists(dataset_path: &Path) -> bool {
    sidecar_path(dataset_path).exists()
}

/// Delete the sidecar file for a dataset, if present
pub fn delete_sidecar(dataset_path: &Path) -> PersistenceResult<()> {
    let path = sidecar_path(dataset_path);
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}
