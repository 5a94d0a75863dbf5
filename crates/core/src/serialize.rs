//! Annotation packing
//!
//! Converts a kind-partitioned collection of annotations into one packed
//! buffer plus a CSR segment relation, ready for a single hand-off to the
//! render consumer. Each pass allocates fresh buffers; previous outputs
//! are never patched in place.

use std::rc::Rc;

use anno_model::{Annotation, AnnotationId, AnnotationKind};

use crate::codec::type_handler;

/// Output of one packing pass
///
/// Immutable once produced; run a new pass after any add/update/delete.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedAnnotations {
    /// All records, grouped by kind in canonical order
    pub data: Vec<u8>,

    /// Byte offset of each kind's group within `data`, indexed by
    /// [`AnnotationKind::index`]
    pub type_to_offset: [usize; AnnotationKind::COUNT],

    /// Ids per kind in packed order, for reverse lookup from a record
    /// slot back to its annotation
    pub type_to_ids: [Vec<AnnotationId>; AnnotationKind::COUNT],

    /// CSR offsets into `segment_list`; one entry per annotation in the
    /// global walk order plus a final sentinel equal to the total
    /// segment count
    pub segment_index: Vec<u32>,

    /// Flat low/high 32-bit word pairs, one pair per segment entry
    pub segment_list: Vec<u32>,
}

/// Pack `groups` (indexed by kind) into one buffer
///
/// Annotations are sorted by id within each kind so packed positions are
/// reproducible regardless of insertion order, then encoded group by
/// group in the canonical kind ordering while the segment relation is
/// accumulated in the same walk.
pub fn serialize_annotations(
    mut groups: [Vec<Rc<Annotation>>; AnnotationKind::COUNT],
) -> SerializedAnnotations {
    let mut type_to_offset = [0usize; AnnotationKind::COUNT];
    let mut total_bytes = 0;
    let mut total_annotations = 0;
    let mut total_segments = 0;

    for kind in AnnotationKind::ALL {
        let group = &mut groups[kind.index()];
        group.sort_by(|a, b| a.id.cmp(&b.id));

        type_to_offset[kind.index()] = total_bytes;
        total_bytes += type_handler(kind).record_bytes() * group.len();
        total_annotations += group.len();
        total_segments += group.iter().map(|annotation| annotation.segment_count()).sum::<usize>();
    }

    let mut data = vec![0u8; total_bytes];
    let mut type_to_ids: [Vec<AnnotationId>; AnnotationKind::COUNT] = Default::default();
    let mut segment_index = Vec::with_capacity(total_annotations + 1);
    let mut segment_list = Vec::with_capacity(total_segments * 2);

    for kind in AnnotationKind::ALL {
        let group = &groups[kind.index()];
        let handler = type_handler(kind);
        let width = handler.record_bytes();
        let base = type_to_offset[kind.index()];

        type_to_ids[kind.index()] = group.iter().map(|annotation| annotation.id.clone()).collect();

        for (index, annotation) in group.iter().enumerate() {
            let start = base + index * width;
            handler.encode(annotation, &mut data[start..start + width]);

            segment_index.push((segment_list.len() / 2) as u32);
            if let Some(segments) = &annotation.segments {
                for segment in segments {
                    segment_list.push(segment.low());
                    segment_list.push(segment.high());
                }
            }
        }
    }
    segment_index.push((segment_list.len() / 2) as u32);

    SerializedAnnotations { data, type_to_offset, type_to_ids, segment_index, segment_list }
}

/// Accumulates annotations by kind ahead of a packing pass
#[derive(Default)]
pub struct AnnotationSerializer {
    groups: [Vec<Rc<Annotation>>; AnnotationKind::COUNT],
}

impl AnnotationSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an annotation for the next pass
    pub fn add(&mut self, annotation: Rc<Annotation>) {
        self.groups[annotation.kind().index()].push(annotation);
    }

    /// Run the packing pass over everything queued so far
    pub fn serialize(self) -> SerializedAnnotations {
        serialize_annotations(self.groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ELLIPSOID_RECORD_BYTES, LINE_RECORD_BYTES, POINT_RECORD_BYTES};
    use anno_model::{AnnotationGeometry, SegmentId, Vec3};

    fn point(id: &str, x: f32) -> Rc<Annotation> {
        Rc::new(Annotation::with_id(
            id,
            AnnotationGeometry::Point { position: Vec3::new(x, 0.0, 0.0) },
        ))
    }

    fn read_f32(bytes: &[u8], offset: usize) -> f32 {
        f32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn test_empty_input_yields_empty_buffers() {
        let output = AnnotationSerializer::new().serialize();
        assert!(output.data.is_empty());
        assert_eq!(output.segment_index, vec![0]);
        assert!(output.segment_list.is_empty());
        assert_eq!(output.type_to_offset, [0; AnnotationKind::COUNT]);
    }

    #[test]
    fn test_ids_sorted_within_kind() {
        let mut serializer = AnnotationSerializer::new();
        serializer.add(point("b", 4.0));
        serializer.add(point("a", 1.0));
        let output = serializer.serialize();

        let point_index = AnnotationKind::Point.index();
        assert_eq!(output.type_to_ids[point_index], vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(output.data.len(), 2 * POINT_RECORD_BYTES);
        // Records follow the sorted id order, not insertion order.
        assert_eq!(read_f32(&output.data, 0), 1.0);
        assert_eq!(read_f32(&output.data, POINT_RECORD_BYTES), 4.0);
    }

    #[test]
    fn test_offsets_follow_canonical_kind_order() {
        let mut serializer = AnnotationSerializer::new();
        serializer.add(Rc::new(Annotation::with_id(
            "e",
            AnnotationGeometry::Ellipsoid {
                center: Vec3::new(0.0, 0.0, 0.0),
                radii: Vec3::new(1.0, 1.0, 1.0),
            },
        )));
        serializer.add(point("p", 0.0));
        serializer.add(Rc::new(Annotation::with_id(
            "l",
            AnnotationGeometry::Line {
                point_a: Vec3::new(0.0, 0.0, 0.0),
                point_b: Vec3::new(1.0, 0.0, 0.0),
            },
        )));
        let output = serializer.serialize();

        assert_eq!(output.type_to_offset[AnnotationKind::Point.index()], 0);
        assert_eq!(output.type_to_offset[AnnotationKind::Line.index()], POINT_RECORD_BYTES);
        // The empty bounding-box group sits at the running total, width 0.
        assert_eq!(
            output.type_to_offset[AnnotationKind::BoundingBox.index()],
            POINT_RECORD_BYTES + LINE_RECORD_BYTES
        );
        assert_eq!(
            output.type_to_offset[AnnotationKind::Ellipsoid.index()],
            POINT_RECORD_BYTES + LINE_RECORD_BYTES
        );
        assert_eq!(
            output.data.len(),
            POINT_RECORD_BYTES + LINE_RECORD_BYTES + ELLIPSOID_RECORD_BYTES
        );
    }

    #[test]
    fn test_segment_csr_integrity() {
        let mut serializer = AnnotationSerializer::new();
        serializer.add(Rc::new(
            Annotation::with_id(
                "a",
                AnnotationGeometry::Point { position: Vec3::new(0.0, 0.0, 0.0) },
            )
            .with_segments(vec![SegmentId::new(5), SegmentId::from_words(2, 1)]),
        ));
        serializer.add(point("b", 1.0));
        serializer.add(Rc::new(
            Annotation::with_id(
                "c",
                AnnotationGeometry::Line {
                    point_a: Vec3::new(0.0, 0.0, 0.0),
                    point_b: Vec3::new(1.0, 0.0, 0.0),
                },
            )
            .with_segments(vec![SegmentId::new(9)]),
        ));
        let output = serializer.serialize();

        // Offsets: "a" has 2 segments, "b" none, "c" one; sentinel = 3.
        assert_eq!(output.segment_index, vec![0, 2, 2, 3]);
        assert_eq!(output.segment_index[0], 0);
        assert_eq!(
            *output.segment_index.last().unwrap() as usize,
            output.segment_list.len() / 2
        );
        // Low word first for every pair.
        assert_eq!(output.segment_list, vec![5, 0, 2, 1, 9, 0]);
    }

    #[test]
    fn test_segment_counts_per_annotation() {
        let mut serializer = AnnotationSerializer::new();
        for (id, count) in [("a", 3usize), ("b", 0), ("c", 2)] {
            let segments: Vec<_> = (0..count as u64).map(SegmentId::new).collect();
            let mut annotation = Annotation::with_id(
                id,
                AnnotationGeometry::Point { position: Vec3::new(0.0, 0.0, 0.0) },
            );
            if !segments.is_empty() {
                annotation = annotation.with_segments(segments);
            }
            serializer.add(Rc::new(annotation));
        }
        let output = serializer.serialize();

        let expected = [3u32, 0, 2];
        for (index, count) in expected.iter().enumerate() {
            assert_eq!(output.segment_index[index + 1] - output.segment_index[index], *count);
        }
    }
}
