//! Remote classification backend boundary
//!
//! Brush strokes are mirrored to an external classification service when
//! they are committed and torn down there when they are deleted. Only the
//! interface lives in this crate; transport, authentication, and retry
//! belong to the implementing collaborator.

use anno_model::{Annotation, AnnotationGeometry, AnnotationId, SegmentId};

/// Failure reported by the remote backend
///
/// Remote failures never roll back local registry state; they are
/// surfaced so the caller can decide whether to retry or reconcile.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("stroke upload failed: {0}")]
    UploadFailed(String),
    #[error("stroke teardown failed: {0}")]
    DestroyFailed(String),
    #[error("backend unreachable: {0}")]
    Unreachable(String),
}

/// The stroke data handed to the backend on commit
#[derive(Debug, Clone, PartialEq)]
pub struct StrokePayload {
    pub id: AnnotationId,
    /// Ordered voxel coordinates, already floored to integers at draw time
    pub voxels: Vec<[f32; 3]>,
    /// RGB color, components in [0, 1]
    pub color: [f32; 3],
    /// Segment ids the stroke paints
    pub segments: Vec<SegmentId>,
}

impl StrokePayload {
    /// Build the upload payload for a brush annotation
    ///
    /// Returns `None` for other variants, which have no remote side.
    pub fn for_annotation(annotation: &Annotation) -> Option<Self> {
        let AnnotationGeometry::Brush(stroke) = &annotation.geometry else {
            return None;
        };
        Some(Self {
            id: annotation.id.clone(),
            voxels: stroke.voxels().map(Into::into).collect(),
            color: stroke.color(),
            segments: annotation.segments.clone().unwrap_or_default(),
        })
    }
}

/// External persistence for brush strokes
///
/// The registry issues at most one upload per commit and one destroy per
/// delete; implementations report the outcome and own any retry policy.
pub trait StrokeBackend {
    /// Persist a committed stroke remotely
    fn upload_stroke(&self, payload: &StrokePayload) -> Result<(), RemoteError>;

    /// Release the remote resource for a deleted stroke
    fn destroy_stroke(&self, id: &AnnotationId) -> Result<(), RemoteError>;
}
