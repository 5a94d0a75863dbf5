//! Annotation data model
//!
//! Core data types for 3D dataset annotations: geometry primitives, the
//! annotation sum type, the fixed-capacity brush stroke record, and the
//! portable representation exchanged with configuration stores.

pub mod annotation;
pub mod geometry;
pub mod portable;
pub mod segment;
pub mod stroke;

pub use annotation::{Annotation, AnnotationGeometry, AnnotationId, AnnotationKind, Description};
pub use geometry::Vec3;
pub use portable::{PortableAnnotation, PortableGeometry, ValidationError};
pub use segment::SegmentId;
pub use stroke::{
    BrushStroke, StrokeRecord, VoxelOutcome, DEFAULT_MAX_JUMP_DISTANCE, STROKE_CAPACITY,
    STROKE_RECORD_BYTES,
};
