//! Annotation sum type
//!
//! An annotation is one geometric marker of a fixed closed set of shapes
//! attached to a 3D dataset, with an id, an optional description, and an
//! optional list of associated segment identifiers.

use crate::geometry::Vec3;
use crate::segment::SegmentId;
use crate::stroke::BrushStroke;

/// Unique identifier for an annotation
///
/// Opaque hex string, unique within a registry. Also the sort key for
/// deterministic serialization ordering, so ids compare lexicographically.
pub type AnnotationId = String;

/// The closed set of annotation shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Point,
    Line,
    BoundingBox,
    Ellipsoid,
    Brush,
}

impl AnnotationKind {
    /// Number of annotation kinds
    pub const COUNT: usize = 5;

    /// Canonical ordering used by the packing pass
    pub const ALL: [AnnotationKind; AnnotationKind::COUNT] = [
        AnnotationKind::Point,
        AnnotationKind::Line,
        AnnotationKind::BoundingBox,
        AnnotationKind::Ellipsoid,
        AnnotationKind::Brush,
    ];

    /// Position of this kind in the canonical ordering
    pub fn index(&self) -> usize {
        match self {
            AnnotationKind::Point => 0,
            AnnotationKind::Line => 1,
            AnnotationKind::BoundingBox => 2,
            AnnotationKind::Ellipsoid => 3,
            AnnotationKind::Brush => 4,
        }
    }
}

/// Human-readable annotation description
///
/// Three-valued: `Unknown` means the description has not been loaded yet,
/// `None` means it is known to be absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Description {
    #[default]
    Unknown,
    None,
    Text(String),
}

impl Description {
    /// The description text, if present
    pub fn text(&self) -> Option<&str> {
        match self {
            Description::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Variant-specific annotation geometry
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationGeometry {
    /// A single marked coordinate
    Point { position: Vec3 },

    /// Line segment between two endpoints
    Line { point_a: Vec3, point_b: Vec3 },

    /// Axis-aligned box spanned by two corners
    ///
    /// Corners are stored as given; min/max normalization happens at
    /// encode time, not at construction.
    BoundingBox { point_a: Vec3, point_b: Vec3 },

    /// Ellipsoid defined by center and per-axis radii
    Ellipsoid { center: Vec3, radii: Vec3 },

    /// Freehand voxel stroke
    Brush(BrushStroke),
}

impl AnnotationGeometry {
    /// The kind tag for this geometry
    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationGeometry::Point { .. } => AnnotationKind::Point,
            AnnotationGeometry::Line { .. } => AnnotationKind::Line,
            AnnotationGeometry::BoundingBox { .. } => AnnotationKind::BoundingBox,
            AnnotationGeometry::Ellipsoid { .. } => AnnotationKind::Ellipsoid,
            AnnotationGeometry::Brush(_) => AnnotationKind::Brush,
        }
    }
}

/// Complete annotation
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Unique id; empty until the registry assigns one on add
    pub id: AnnotationId,

    /// Optional human-readable description
    pub description: Description,

    /// Associated segment identifiers, if any
    pub segments: Option<Vec<SegmentId>>,

    /// Variant-specific geometry
    pub geometry: AnnotationGeometry,
}

impl Annotation {
    /// Create an annotation with no id; the registry assigns one on add
    pub fn new(geometry: AnnotationGeometry) -> Self {
        Self {
            id: AnnotationId::new(),
            description: Description::Unknown,
            segments: None,
            geometry,
        }
    }

    /// Create an annotation with an explicit id
    pub fn with_id(id: impl Into<AnnotationId>, geometry: AnnotationGeometry) -> Self {
        Self {
            id: id.into(),
            description: Description::Unknown,
            segments: None,
            geometry,
        }
    }

    /// Attach associated segment ids
    pub fn with_segments(mut self, segments: Vec<SegmentId>) -> Self {
        self.segments = Some(segments);
        self
    }

    /// Attach a description
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Description::Text(text.into());
        self
    }

    /// The kind tag for this annotation's geometry
    pub fn kind(&self) -> AnnotationKind {
        self.geometry.kind()
    }

    /// Number of associated segment ids
    pub fn segment_count(&self) -> usize {
        self.segments.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_matches_indices() {
        for (position, kind) in AnnotationKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), position);
        }
    }

    #[test]
    fn test_geometry_kind_tags() {
        let point = AnnotationGeometry::Point { position: Vec3::new(1.0, 2.0, 3.0) };
        assert_eq!(point.kind(), AnnotationKind::Point);

        let line = AnnotationGeometry::Line {
            point_a: Vec3::new(0.0, 0.0, 0.0),
            point_b: Vec3::new(1.0, 1.0, 1.0),
        };
        assert_eq!(line.kind(), AnnotationKind::Line);
    }

    #[test]
    fn test_builder_fields() {
        let annotation = Annotation::with_id(
            "abc123",
            AnnotationGeometry::Point { position: Vec3::new(0.0, 0.0, 0.0) },
        )
        .with_description("soma center")
        .with_segments(vec![SegmentId::new(7)]);

        assert_eq!(annotation.id, "abc123");
        assert_eq!(annotation.description.text(), Some("soma center"));
        assert_eq!(annotation.segment_count(), 1);
    }

    #[test]
    fn test_new_annotation_has_no_id() {
        let annotation =
            Annotation::new(AnnotationGeometry::Point { position: Vec3::new(0.0, 0.0, 0.0) });
        assert!(annotation.id.is_empty());
        assert_eq!(annotation.description, Description::Unknown);
        assert_eq!(annotation.segment_count(), 0);
    }
}
