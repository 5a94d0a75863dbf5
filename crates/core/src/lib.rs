//! Voxmark Core Library
//!
//! Annotation registry, per-variant binary codecs, and the packing pass
//! that turns the committed annotation set into render-ready buffers.

pub mod codec;
pub mod persistence;
pub mod registry;
pub mod remote;
pub mod serialize;
pub mod signal;

pub use anno_model::{
    Annotation, AnnotationGeometry, AnnotationId, AnnotationKind, BrushStroke, Description,
    PortableAnnotation, PortableGeometry, SegmentId, StrokeRecord, ValidationError, Vec3,
    VoxelOutcome, DEFAULT_MAX_JUMP_DISTANCE, STROKE_CAPACITY, STROKE_RECORD_BYTES,
};
pub use codec::{
    type_handler, AnnotationTypeHandler, BOUNDING_BOX_RECORD_BYTES, ELLIPSOID_RECORD_BYTES,
    LINE_RECORD_BYTES, POINT_RECORD_BYTES,
};
pub use persistence::{
    delete_sidecar, load_annotations, save_annotations, sidecar_exists, sidecar_path,
    PersistenceError, PersistenceResult,
};
pub use registry::{
    make_annotation_id, AnnotationError, AnnotationReference, AnnotationSource, RefValue,
};
pub use remote::{RemoteError, StrokeBackend, StrokePayload};
pub use serialize::{serialize_annotations, AnnotationSerializer, SerializedAnnotations};
pub use signal::{NullarySignal, Signal, SlotId};
