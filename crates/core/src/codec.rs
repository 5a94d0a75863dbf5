//! Per-variant binary record codecs
//!
//! Every annotation variant packs into a fixed-width record so the render
//! consumer can map a typed view over a contiguous group. Records are
//! native-endian IEEE-754 words. Dispatch goes through a static handler
//! table keyed by [`AnnotationKind`]; the variant set is closed, so the
//! table is a plain match.

use anno_model::{Annotation, AnnotationGeometry, AnnotationKind, Vec3, STROKE_RECORD_BYTES};

/// Bytes per packed point record (one coordinate triple)
pub const POINT_RECORD_BYTES: usize = 12;

/// Bytes per packed line record (two coordinate triples)
pub const LINE_RECORD_BYTES: usize = 24;

/// Bytes per packed bounding-box record (min corner, then max corner)
pub const BOUNDING_BOX_RECORD_BYTES: usize = 24;

/// Bytes per packed ellipsoid record (center, then radii)
pub const ELLIPSOID_RECORD_BYTES: usize = 24;

/// Encodes one annotation variant into its fixed-width record
pub trait AnnotationTypeHandler {
    /// Width of one packed record in bytes
    fn record_bytes(&self) -> usize;

    /// Write `annotation` into `out`, a slice exactly `record_bytes()` long
    ///
    /// Never fails for a well-formed annotation of the handled variant; a
    /// mismatched variant leaves the record zeroed.
    fn encode(&self, annotation: &Annotation, out: &mut [u8]);
}

/// Handler table entry for `kind`
pub fn type_handler(kind: AnnotationKind) -> &'static dyn AnnotationTypeHandler {
    match kind {
        AnnotationKind::Point => &PointHandler,
        AnnotationKind::Line => &LineHandler,
        AnnotationKind::BoundingBox => &BoundingBoxHandler,
        AnnotationKind::Ellipsoid => &EllipsoidHandler,
        AnnotationKind::Brush => &BrushHandler,
    }
}

fn put_f32(out: &mut [u8], offset: usize, value: f32) {
    out[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
}

fn put_vec3(out: &mut [u8], offset: usize, value: Vec3) {
    put_f32(out, offset, value.x);
    put_f32(out, offset + 4, value.y);
    put_f32(out, offset + 8, value.z);
}

struct PointHandler;

impl AnnotationTypeHandler for PointHandler {
    fn record_bytes(&self) -> usize {
        POINT_RECORD_BYTES
    }

    fn encode(&self, annotation: &Annotation, out: &mut [u8]) {
        let AnnotationGeometry::Point { position } = &annotation.geometry else {
            debug_assert!(false, "point handler got {:?}", annotation.kind());
            return;
        };
        put_vec3(out, 0, *position);
    }
}

struct LineHandler;

impl AnnotationTypeHandler for LineHandler {
    fn record_bytes(&self) -> usize {
        LINE_RECORD_BYTES
    }

    fn encode(&self, annotation: &Annotation, out: &mut [u8]) {
        let AnnotationGeometry::Line { point_a, point_b } = &annotation.geometry else {
            debug_assert!(false, "line handler got {:?}", annotation.kind());
            return;
        };
        put_vec3(out, 0, *point_a);
        put_vec3(out, 12, *point_b);
    }
}

struct BoundingBoxHandler;

impl AnnotationTypeHandler for BoundingBoxHandler {
    fn record_bytes(&self) -> usize {
        BOUNDING_BOX_RECORD_BYTES
    }

    fn encode(&self, annotation: &Annotation, out: &mut [u8]) {
        let AnnotationGeometry::BoundingBox { point_a, point_b } = &annotation.geometry else {
            debug_assert!(false, "bounding-box handler got {:?}", annotation.kind());
            return;
        };
        // Stored corners are unordered; the packed record is min then max.
        put_vec3(out, 0, point_a.min(point_b));
        put_vec3(out, 12, point_a.max(point_b));
    }
}

struct EllipsoidHandler;

impl AnnotationTypeHandler for EllipsoidHandler {
    fn record_bytes(&self) -> usize {
        ELLIPSOID_RECORD_BYTES
    }

    fn encode(&self, annotation: &Annotation, out: &mut [u8]) {
        let AnnotationGeometry::Ellipsoid { center, radii } = &annotation.geometry else {
            debug_assert!(false, "ellipsoid handler got {:?}", annotation.kind());
            return;
        };
        put_vec3(out, 0, *center);
        put_vec3(out, 12, *radii);
    }
}

struct BrushHandler;

impl AnnotationTypeHandler for BrushHandler {
    fn record_bytes(&self) -> usize {
        STROKE_RECORD_BYTES
    }

    fn encode(&self, annotation: &Annotation, out: &mut [u8]) {
        let AnnotationGeometry::Brush(stroke) = &annotation.geometry else {
            debug_assert!(false, "brush handler got {:?}", annotation.kind());
            return;
        };
        stroke.fill_record(out);
    }
}
