//! Annotation exchange document
//!
//! JSON document shape:
//!
//! ```text
//! { "frame_id": 12, "tracking_id": "seq-a",
//!   "annotations": [ { "id": 1, "class": "car",
//!                      "bbox_2d": { "xmin": .., "ymin": .., "xmax": .., "ymax": .. },
//!                      "bbox_3d": { "center": [x, y, z], "dimensions": [w, h, d],
//!                                   "rotation": { "yaw": .. } },
//!                      "tracking_id": "" } ] }
//! ```
//!
//! `frame_id` and the top-level `tracking_id` are written on export and
//! optional on import. Loaded records go through typed wire structs and are
//! validated before they become [`Annotation`]s.

use log::debug;
use scanmark_core::{Annotation, BBox2D, BBox3D, Error, Point3f, Result, Rotation, Vector3f};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::Path;

/// Name of the exported file for a frame
pub fn result_file_name(frame_id: i64) -> String {
    format!("result_{}.json", frame_id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BBox2DRecord {
    xmin: f32,
    ymin: f32,
    xmax: f32,
    ymax: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RotationRecord {
    yaw: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BBox3DRecord {
    center: [f32; 3],
    dimensions: [f32; 3],
    rotation: RotationRecord,
}

/// One annotation as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AnnotationRecord {
    id: u64,
    class: String,
    bbox_2d: BBox2DRecord,
    bbox_3d: BBox3DRecord,
    #[serde(default)]
    tracking_id: String,
}

impl From<&Annotation> for AnnotationRecord {
    fn from(a: &Annotation) -> Self {
        let b3 = &a.bbox_3d;
        Self {
            id: a.id,
            class: a.class.clone(),
            bbox_2d: BBox2DRecord {
                xmin: a.bbox_2d.xmin,
                ymin: a.bbox_2d.ymin,
                xmax: a.bbox_2d.xmax,
                ymax: a.bbox_2d.ymax,
            },
            bbox_3d: BBox3DRecord {
                center: [b3.center.x, b3.center.y, b3.center.z],
                dimensions: [b3.dimensions.x, b3.dimensions.y, b3.dimensions.z],
                rotation: RotationRecord { yaw: b3.rotation.yaw },
            },
            tracking_id: a.tracking_id.clone(),
        }
    }
}

impl TryFrom<AnnotationRecord> for Annotation {
    type Error = Error;

    fn try_from(r: AnnotationRecord) -> Result<Self> {
        let [cx, cy, cz] = r.bbox_3d.center;
        let [w, h, d] = r.bbox_3d.dimensions;
        let annotation = Annotation {
            id: r.id,
            class: r.class,
            bbox_2d: BBox2D::new(r.bbox_2d.xmin, r.bbox_2d.ymin, r.bbox_2d.xmax, r.bbox_2d.ymax),
            bbox_3d: BBox3D {
                center: Point3f::new(cx, cy, cz),
                dimensions: Vector3f::new(w, h, d),
                rotation: Rotation { yaw: r.bbox_3d.rotation.yaw },
            },
            tracking_id: r.tracking_id,
        };
        annotation.validate()?;
        Ok(annotation)
    }
}

#[derive(Debug, Serialize)]
struct DocumentOut<'a> {
    frame_id: i64,
    tracking_id: &'a str,
    annotations: Vec<AnnotationRecord>,
}

/// A fully parsed exchange document
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeDocument {
    pub frame_id: Option<i64>,
    pub tracking_id: Option<String>,
    pub annotations: Vec<Annotation>,
}

fn validate_all(annotations: &[Annotation]) -> Result<()> {
    annotations.iter().try_for_each(Annotation::validate)
}

/// Produce the exchange document for a frame as pretty-printed JSON
pub fn serialize(frame_id: i64, tracking_id: &str, annotations: &[Annotation]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_document(&mut out, frame_id, tracking_id, annotations)?;
    Ok(out)
}

/// Write the exchange document to any byte sink. Every record is validated
/// first, so nothing is written that `deserialize` would reject.
pub fn write_document<W: Write>(
    writer: &mut W,
    frame_id: i64,
    tracking_id: &str,
    annotations: &[Annotation],
) -> Result<()> {
    validate_all(annotations)?;
    let document = DocumentOut {
        frame_id,
        tracking_id,
        annotations: annotations.iter().map(AnnotationRecord::from).collect(),
    };
    serde_json::to_writer_pretty(&mut *writer, &document)?;
    writer.flush()?;
    debug!("serialized {} annotations for frame {}", annotations.len(), frame_id);
    Ok(())
}

/// Parse a document and return its annotations
pub fn deserialize(bytes: &[u8]) -> Result<Vec<Annotation>> {
    read_document(bytes).map(|doc| doc.annotations)
}

/// Parse a document, keeping the optional frame metadata
pub fn read_document(bytes: &[u8]) -> Result<ExchangeDocument> {
    let mut root: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::InvalidExchangeDocument(format!("not valid JSON: {}", e)))?;
    let object = root
        .as_object_mut()
        .ok_or_else(|| Error::InvalidExchangeDocument("top level is not an object".to_string()))?;

    let items = match object.remove("annotations") {
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(Error::InvalidExchangeDocument(
                "`annotations` is not an array".to_string(),
            ))
        }
        None => {
            return Err(Error::InvalidExchangeDocument(
                "missing `annotations` field".to_string(),
            ))
        }
    };

    let frame_id = match object.get("frame_id") {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.as_i64().ok_or_else(|| {
            Error::InvalidExchangeDocument(format!("`frame_id` is not an integer: {}", value))
        })?),
    };
    let tracking_id = match object.get("tracking_id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(value) => {
            return Err(Error::InvalidExchangeDocument(format!(
                "`tracking_id` is not a string: {}",
                value
            )))
        }
    };

    let annotations = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let record: AnnotationRecord = serde_json::from_value(item).map_err(|e| {
                Error::InvalidExchangeDocument(format!("annotation #{}: {}", index, e))
            })?;
            Annotation::try_from(record).map_err(|e| {
                Error::InvalidExchangeDocument(format!("annotation #{}: {}", index, e))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!("parsed {} annotations (frame {:?})", annotations.len(), frame_id);

    Ok(ExchangeDocument {
        frame_id,
        tracking_id,
        annotations,
    })
}

/// Read and parse an annotation file
pub fn read_annotations<P: AsRef<Path>>(path: P) -> Result<Vec<Annotation>> {
    let bytes = std::fs::read(path)?;
    deserialize(&bytes)
}

/// Write an annotation file
pub fn write_annotations<P: AsRef<Path>>(
    path: P,
    frame_id: i64,
    tracking_id: &str,
    annotations: &[Annotation],
) -> Result<()> {
    validate_all(annotations)?;
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_document(&mut writer, frame_id, tracking_id, annotations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Annotation> {
        vec![
            Annotation::new(
                1,
                "car",
                BBox2D::new(12.5, 40.0, 180.25, 130.0),
                BBox3D::new(Point3f::new(3.1, -0.4, 12.7), Vector3f::new(4.5, 1.6, 1.9), 0.785),
            )
            .with_tracking_id("car-0001"),
            Annotation::new(
                2,
                "pedestrian",
                BBox2D::new(300.0, 80.0, 330.0, 190.0),
                BBox3D::new(Point3f::new(-2.0, 0.1, 8.3), Vector3f::new(0.6, 1.75, 0.6), -3.1),
            ),
        ]
    }

    #[test]
    fn test_roundtrip_is_field_for_field() {
        let records = sample();
        let bytes = serialize(7, "seq-a", &records).unwrap();
        let loaded = deserialize(&bytes).unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_exported_shape() {
        let bytes = serialize(7, "seq-a", &sample()).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["frame_id"], 7);
        assert_eq!(value["tracking_id"], "seq-a");
        let first = &value["annotations"][0];
        assert_eq!(first["id"], 1);
        assert_eq!(first["class"], "car");
        assert_eq!(first["tracking_id"], "car-0001");
        assert!(first["bbox_2d"]["xmin"].is_number());
        assert_eq!(first["bbox_3d"]["center"].as_array().unwrap().len(), 3);
        assert_eq!(first["bbox_3d"]["dimensions"].as_array().unwrap().len(), 3);
        assert!(first["bbox_3d"]["rotation"]["yaw"].is_number());

        // two-space indentation
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\n  \"annotations\""));
    }

    #[test]
    fn test_invalid_records_are_not_exported() {
        let mut records = sample();
        records[1].bbox_3d.center.x = f32::NAN;
        assert!(matches!(serialize(7, "seq-a", &records), Err(Error::InvalidData(_))));

        let mut records = sample();
        records[0].bbox_3d.dimensions.y = f32::INFINITY;
        let mut sink = Vec::new();
        assert!(write_document(&mut sink, 7, "seq-a", &records).is_err());
        assert!(sink.is_empty());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(result_file_name(7));
        assert!(write_annotations(&path, 7, "seq-a", &records).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_bare_document_is_accepted() {
        let json = r#"{ "annotations": [ {
            "id": 4, "class": "cyclist",
            "bbox_2d": { "xmin": 0, "ymin": 0, "xmax": 10, "ymax": 20 },
            "bbox_3d": { "center": [1, 2, 3], "dimensions": [0.5, 1.7, 1.8], "rotation": { "yaw": 0 } }
        } ] }"#;
        let document = read_document(json.as_bytes()).unwrap();
        assert_eq!(document.frame_id, None);
        assert_eq!(document.tracking_id, None);
        assert_eq!(document.annotations.len(), 1);
        assert_eq!(document.annotations[0].tracking_id, "");
        assert_eq!(document.annotations[0].bbox_3d.center, Point3f::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_frame_metadata_is_read() {
        let json = r#"{ "frame_id": 3, "tracking_id": "seq", "annotations": [] }"#;
        let document = read_document(json.as_bytes()).unwrap();
        assert_eq!(document.frame_id, Some(3));
        assert_eq!(document.tracking_id.as_deref(), Some("seq"));
        assert!(document.annotations.is_empty());
    }

    #[test]
    fn test_missing_or_malformed_annotations_field() {
        for json in [
            r#"{ "frame_id": 1 }"#,
            r#"{ "annotations": {} }"#,
            r#"{ "annotations": "none" }"#,
            r#"[1, 2, 3]"#,
            "not json",
        ] {
            assert!(
                matches!(deserialize(json.as_bytes()), Err(Error::InvalidExchangeDocument(_))),
                "accepted {}",
                json
            );
        }
    }

    #[test]
    fn test_invalid_record_names_its_index() {
        let json = r#"{ "annotations": [
            { "id": 1, "class": "car",
              "bbox_2d": { "xmin": 0, "ymin": 0, "xmax": 1, "ymax": 1 },
              "bbox_3d": { "center": [0, 0, 0], "dimensions": [1, 1, 1], "rotation": { "yaw": 0 } } },
            { "id": 2, "class": "car",
              "bbox_2d": { "xmin": 0, "ymin": 0, "xmax": 1, "ymax": 1 },
              "bbox_3d": { "center": [0, 0, 0], "dimensions": [1, -1, 1], "rotation": { "yaw": 0 } } }
        ] }"#;
        match deserialize(json.as_bytes()) {
            Err(Error::InvalidExchangeDocument(message)) => assert!(message.contains("#1")),
            other => panic!("expected InvalidExchangeDocument, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let json = r#"{ "annotations": [ { "id": 1, "class": "car",
            "bbox_2d": { "xmin": 0, "ymin": 0, "xmax": 1, "ymax": 1 },
            "bbox_3d": { "center": [0, 0], "dimensions": [1, 1, 1], "rotation": { "yaw": 0 } } } ] }"#;
        assert!(matches!(deserialize(json.as_bytes()), Err(Error::InvalidExchangeDocument(_))));

        let empty_class = r#"{ "annotations": [ { "id": 1, "class": "",
            "bbox_2d": { "xmin": 0, "ymin": 0, "xmax": 1, "ymax": 1 },
            "bbox_3d": { "center": [0, 0, 0], "dimensions": [1, 1, 1], "rotation": { "yaw": 0 } } } ] }"#;
        assert!(matches!(deserialize(empty_class.as_bytes()), Err(Error::InvalidExchangeDocument(_))));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(result_file_name(42));
        assert!(path.ends_with("result_42.json"));

        write_annotations(&path, 42, "", &sample()).unwrap();
        assert_eq!(read_annotations(&path).unwrap(), sample());
    }
}
