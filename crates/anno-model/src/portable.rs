//! Portable annotation representation
//!
//! The structured form persisted to sidecar files and exchanged with
//! external stores, distinct from the packed binary records. Geometry
//! travels as plain numeric triplets and segment ids as decimal strings,
//! so the format stays readable and independent of host word width.

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationGeometry, Description};
use crate::segment::SegmentId;
use crate::stroke::{BrushStroke, STROKE_CAPACITY};

/// Error for malformed portable-form input
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("missing annotation id")]
    MissingId,
    #[error("invalid segment id {value:?}")]
    InvalidSegment {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("brush stroke has {count} voxels, capacity is {capacity}")]
    TooManyVoxels { count: usize, capacity: usize },
    #[error("brush stroke must contain at least one voxel")]
    EmptyStroke,
    #[error("color component {value} outside [0, 1]")]
    ColorOutOfRange { value: f32 },
}

/// One annotation in portable form
///
/// An absent `description` restores as [`Description::Unknown`]; an
/// absent `segments` list restores as no associated segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortableAnnotation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<String>>,
    #[serde(flatten)]
    pub geometry: PortableGeometry,
}

/// Variant geometry fields, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PortableGeometry {
    Point {
        point: [f32; 3],
    },
    Line {
        #[serde(rename = "pointA")]
        point_a: [f32; 3],
        #[serde(rename = "pointB")]
        point_b: [f32; 3],
    },
    AxisAlignedBoundingBox {
        #[serde(rename = "pointA")]
        point_a: [f32; 3],
        #[serde(rename = "pointB")]
        point_b: [f32; 3],
    },
    Ellipsoid {
        center: [f32; 3],
        radii: [f32; 3],
    },
    Brush {
        /// Ordered integer voxel coordinates, mirroring the binary record
        voxels: Vec<[f32; 3]>,
        /// RGB color, components in [0, 1]
        color: [f32; 3],
    },
}

impl Annotation {
    /// Convert to the portable form
    pub fn to_portable(&self) -> PortableAnnotation {
        let geometry = match &self.geometry {
            AnnotationGeometry::Point { position } => {
                PortableGeometry::Point { point: (*position).into() }
            }
            AnnotationGeometry::Line { point_a, point_b } => PortableGeometry::Line {
                point_a: (*point_a).into(),
                point_b: (*point_b).into(),
            },
            AnnotationGeometry::BoundingBox { point_a, point_b } => {
                PortableGeometry::AxisAlignedBoundingBox {
                    point_a: (*point_a).into(),
                    point_b: (*point_b).into(),
                }
            }
            AnnotationGeometry::Ellipsoid { center, radii } => PortableGeometry::Ellipsoid {
                center: (*center).into(),
                radii: (*radii).into(),
            },
            AnnotationGeometry::Brush(stroke) => PortableGeometry::Brush {
                voxels: stroke.voxels().map(Into::into).collect(),
                color: stroke.color(),
            },
        };

        PortableAnnotation {
            id: self.id.clone(),
            description: self.description.text().map(str::to_owned),
            segments: self
                .segments
                .as_ref()
                .filter(|segments| !segments.is_empty())
                .map(|segments| segments.iter().map(SegmentId::to_string).collect()),
            geometry,
        }
    }

    /// Reconstruct an annotation from the portable form
    ///
    /// Fails without partial effect when a required field is absent or
    /// malformed; unknown `type` tags and wrong-arity triplets are already
    /// rejected at the deserialization layer.
    pub fn from_portable(portable: PortableAnnotation) -> Result<Annotation, ValidationError> {
        if portable.id.is_empty() {
            return Err(ValidationError::MissingId);
        }

        let segments = match portable.segments {
            Some(values) => {
                let mut segments = Vec::with_capacity(values.len());
                for value in values {
                    let segment = value.parse::<SegmentId>().map_err(|source| {
                        ValidationError::InvalidSegment { value: value.clone(), source }
                    })?;
                    segments.push(segment);
                }
                Some(segments)
            }
            None => None,
        };

        let geometry = match portable.geometry {
            PortableGeometry::Point { point } => {
                AnnotationGeometry::Point { position: point.into() }
            }
            PortableGeometry::Line { point_a, point_b } => AnnotationGeometry::Line {
                point_a: point_a.into(),
                point_b: point_b.into(),
            },
            PortableGeometry::AxisAlignedBoundingBox { point_a, point_b } => {
                AnnotationGeometry::BoundingBox {
                    point_a: point_a.into(),
                    point_b: point_b.into(),
                }
            }
            PortableGeometry::Ellipsoid { center, radii } => AnnotationGeometry::Ellipsoid {
                center: center.into(),
                radii: radii.into(),
            },
            PortableGeometry::Brush { voxels, color } => {
                if voxels.is_empty() {
                    return Err(ValidationError::EmptyStroke);
                }
                if voxels.len() > STROKE_CAPACITY {
                    return Err(ValidationError::TooManyVoxels {
                        count: voxels.len(),
                        capacity: STROKE_CAPACITY,
                    });
                }
                for component in color {
                    if !(0.0..=1.0).contains(&component) {
                        return Err(ValidationError::ColorOutOfRange { value: component });
                    }
                }
                let voxels: Vec<_> = voxels.into_iter().map(Into::into).collect();
                AnnotationGeometry::Brush(BrushStroke::from_voxels(&voxels, color))
            }
        };

        Ok(Annotation {
            id: portable.id,
            description: match portable.description {
                Some(text) => Description::Text(text),
                None => Description::Unknown,
            },
            segments,
            geometry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec3;

    #[test]
    fn test_point_round_trip() {
        let annotation = Annotation::with_id(
            "a1",
            AnnotationGeometry::Point { position: Vec3::new(1.0, 2.0, 3.0) },
        )
        .with_description("marker")
        .with_segments(vec![SegmentId::new(42), SegmentId::new(1 << 40)]);

        let restored = Annotation::from_portable(annotation.to_portable()).unwrap();
        assert_eq!(restored, annotation);
    }

    #[test]
    fn test_bounding_box_round_trip_preserves_corner_order() {
        let annotation = Annotation::with_id(
            "box",
            AnnotationGeometry::BoundingBox {
                point_a: Vec3::new(9.0, 1.0, 5.0),
                point_b: Vec3::new(2.0, 8.0, 3.0),
            },
        );
        let restored = Annotation::from_portable(annotation.to_portable()).unwrap();
        // Corners stay as authored; normalization is an encode-time concern.
        assert_eq!(restored, annotation);
    }

    #[test]
    fn test_type_tags() {
        let ellipsoid = Annotation::with_id(
            "e",
            AnnotationGeometry::Ellipsoid {
                center: Vec3::new(0.0, 0.0, 0.0),
                radii: Vec3::new(1.0, 2.0, 3.0),
            },
        );
        let json = serde_json::to_value(ellipsoid.to_portable()).unwrap();
        assert_eq!(json["type"], "ellipsoid");
        assert_eq!(json["center"], serde_json::json!([0.0, 0.0, 0.0]));

        let boxed = Annotation::with_id(
            "b",
            AnnotationGeometry::BoundingBox {
                point_a: Vec3::new(0.0, 0.0, 0.0),
                point_b: Vec3::new(1.0, 1.0, 1.0),
            },
        );
        let json = serde_json::to_value(boxed.to_portable()).unwrap();
        assert_eq!(json["type"], "axis_aligned_bounding_box");
        assert_eq!(json["pointB"], serde_json::json!([1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_segments_travel_as_decimal_strings() {
        let annotation = Annotation::with_id(
            "s",
            AnnotationGeometry::Point { position: Vec3::new(0.0, 0.0, 0.0) },
        )
        .with_segments(vec![SegmentId::new(u64::MAX)]);

        let json = serde_json::to_value(annotation.to_portable()).unwrap();
        assert_eq!(json["segments"], serde_json::json!(["18446744073709551615"]));
    }

    #[test]
    fn test_unknown_type_tag_is_rejected() {
        let json = serde_json::json!({
            "type": "polygon",
            "id": "p",
            "point": [0.0, 0.0, 0.0],
        });
        assert!(serde_json::from_value::<PortableAnnotation>(json).is_err());
    }

    #[test]
    fn test_wrong_arity_triplet_is_rejected() {
        let json = serde_json::json!({
            "type": "point",
            "id": "p",
            "point": [0.0, 0.0],
        });
        assert!(serde_json::from_value::<PortableAnnotation>(json).is_err());
    }

    #[test]
    fn test_invalid_segment_string_fails_validation() {
        let portable = PortableAnnotation {
            id: "x".to_owned(),
            description: None,
            segments: Some(vec!["12no".to_owned()]),
            geometry: PortableGeometry::Point { point: [0.0, 0.0, 0.0] },
        };
        assert!(matches!(
            Annotation::from_portable(portable),
            Err(ValidationError::InvalidSegment { .. })
        ));
    }

    #[test]
    fn test_missing_id_fails_validation() {
        let portable = PortableAnnotation {
            id: String::new(),
            description: None,
            segments: None,
            geometry: PortableGeometry::Point { point: [0.0, 0.0, 0.0] },
        };
        assert!(matches!(Annotation::from_portable(portable), Err(ValidationError::MissingId)));
    }

    #[test]
    fn test_brush_round_trip() {
        let mut stroke = BrushStroke::new(Vec3::new(0.0, 0.0, 0.0), [0.25, 0.5, 0.75]);
        stroke.add_voxel(Vec3::new(1.0, 0.0, 0.0));
        stroke.add_voxel(Vec3::new(2.0, 1.0, 0.0));
        let annotation = Annotation::with_id("brush", AnnotationGeometry::Brush(stroke));

        let restored = Annotation::from_portable(annotation.to_portable()).unwrap();
        let AnnotationGeometry::Brush(restored_stroke) = &restored.geometry else {
            panic!("expected a brush annotation");
        };
        assert_eq!(restored_stroke.num_voxels(), 3);
        assert_eq!(restored_stroke.voxel(2), Vec3::new(2.0, 1.0, 0.0));
        assert_eq!(restored_stroke.color(), [0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_empty_brush_fails_validation() {
        let portable = PortableAnnotation {
            id: "b".to_owned(),
            description: None,
            segments: None,
            geometry: PortableGeometry::Brush { voxels: vec![], color: [0.0, 0.0, 0.0] },
        };
        assert!(matches!(Annotation::from_portable(portable), Err(ValidationError::EmptyStroke)));
    }

    #[test]
    fn test_out_of_range_color_fails_validation() {
        let portable = PortableAnnotation {
            id: "b".to_owned(),
            description: None,
            segments: None,
            geometry: PortableGeometry::Brush {
                voxels: vec![[0.0, 0.0, 0.0]],
                color: [0.0, 1.5, 0.0],
            },
        };
        assert!(matches!(
            Annotation::from_portable(portable),
            Err(ValidationError::ColorOutOfRange { .. })
        ));
    }
}
