//! PCD (Point Cloud Data) binary decoding
//!
//! Only the binary stride layout is supported. The ASCII header is scanned
//! within the first [`HEADER_SCAN_LIMIT`] bytes; the payload starts right
//! after the newline that ends the `DATA` line. Each record's leading
//! little-endian f32 x/y/z triple is decoded and the cursor then advances by
//! the full declared record stride.

use crate::PointCloudReader;
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};
use scanmark_core::{Error, PointCloud, PointRecord, Result};
use std::path::Path;

/// Header lines are only searched for within this many leading bytes
pub const HEADER_SCAN_LIMIT: usize = 2048;

/// Bytes taken by the x/y/z float triple at the start of every record
pub const POSITION_BYTES: usize = 12;

/// PCD data format variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdDataFormat {
    Ascii,
    Binary,
    BinaryCompressed,
}

impl PcdDataFormat {
    fn from_token(token: Option<&str>) -> Self {
        match token.map(|t| t.to_ascii_lowercase()).as_deref() {
            Some("ascii") => PcdDataFormat::Ascii,
            Some("binary_compressed") => PcdDataFormat::BinaryCompressed,
            _ => PcdDataFormat::Binary,
        }
    }
}

/// PCD field type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdFieldType {
    Signed,
    Unsigned,
    Float,
}

impl PcdFieldType {
    fn parse(code: &str) -> Result<Self> {
        match code {
            "I" | "i" => Ok(PcdFieldType::Signed),
            "U" | "u" => Ok(PcdFieldType::Unsigned),
            "F" | "f" => Ok(PcdFieldType::Float),
            other => Err(Error::MalformedHeader(format!("Unknown TYPE code: {}", other))),
        }
    }
}

/// PCD field definition
#[derive(Debug, Clone, PartialEq)]
pub struct PcdField {
    pub name: String,
    /// Byte width, when a `SIZE` line was present
    pub size: Option<usize>,
    /// Type code, when a `TYPE` line was present
    pub field_type: Option<PcdFieldType>,
    pub count: usize,
}

/// Parsed header metadata
#[derive(Debug, Clone, PartialEq)]
pub struct PcdHeader {
    pub fields: Vec<PcdField>,
    pub points: usize,
    pub data_format: PcdDataFormat,
    /// Offset of the first payload byte
    pub payload_offset: usize,
}

impl PcdHeader {
    /// Bytes per record: the declared field widths when `SIZE` is present,
    /// otherwise just the position triple. `None` on arithmetic overflow.
    pub fn stride(&self) -> Option<usize> {
        if !self.fields.iter().all(|f| f.size.is_some()) {
            return Some(POSITION_BYTES);
        }
        self.fields
            .iter()
            .try_fold(0usize, |total, f| {
                f.size
                    .unwrap_or(0)
                    .checked_mul(f.count)
                    .and_then(|width| total.checked_add(width))
            })
            .map(|total| total.max(POSITION_BYTES))
    }

    /// Total buffer length the header asks for, `None` on arithmetic overflow
    pub fn required_len(&self) -> Option<usize> {
        self.points
            .checked_mul(self.stride()?)
            .and_then(|payload| payload.checked_add(self.payload_offset))
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Reads the ASCII header and locates the payload
pub struct HeaderParser;

impl HeaderParser {
    pub fn parse(bytes: &[u8]) -> Result<PcdHeader> {
        let window = &bytes[..bytes.len().min(HEADER_SCAN_LIMIT)];

        let mut names: Option<Vec<String>> = None;
        let mut sizes: Option<Vec<usize>> = None;
        let mut types: Option<Vec<PcdFieldType>> = None;
        let mut counts: Option<Vec<usize>> = None;
        let mut points: Option<usize> = None;
        let mut data: Option<(PcdDataFormat, usize)> = None;

        let mut start = 0;
        while start < window.len() {
            let newline = window[start..].iter().position(|&b| b == b'\n');
            let end = newline.map(|i| start + i).unwrap_or(window.len());
            let line = Self::decode_line(&window[start..end])?;
            let next = end + 1;

            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.first().copied() {
                None => {}
                Some(keyword) if keyword.starts_with('#') => {}
                Some("FIELDS") => {
                    names = Some(parts[1..].iter().map(|s| s.to_string()).collect());
                }
                Some("SIZE") => sizes = Some(Self::parse_list(&parts[1..], "SIZE")?),
                Some("TYPE") => {
                    types = Some(
                        parts[1..]
                            .iter()
                            .map(|code| PcdFieldType::parse(code))
                            .collect::<Result<Vec<_>>>()?,
                    );
                }
                Some("COUNT") => counts = Some(Self::parse_list(&parts[1..], "COUNT")?),
                Some("POINTS") => {
                    let value = parts.get(1).ok_or_else(|| {
                        Error::MalformedHeader("POINTS line has no value".to_string())
                    })?;
                    points = Some(value.parse::<usize>().map_err(|_| {
                        Error::MalformedHeader(format!("Invalid POINTS value: {}", value))
                    })?);
                }
                Some("DATA") => {
                    if newline.is_none() {
                        return Err(Error::MalformedHeader(format!(
                            "DATA line is not terminated within the first {} bytes",
                            HEADER_SCAN_LIMIT
                        )));
                    }
                    data = Some((PcdDataFormat::from_token(parts.get(1).copied()), next));
                    break;
                }
                Some(other) => trace!("skipping PCD header keyword {}", other),
            }

            start = next;
        }

        let (data_format, payload_offset) = data.ok_or_else(|| {
            Error::MalformedHeader(format!("DATA not found within the first {} bytes", HEADER_SCAN_LIMIT))
        })?;
        let names = names.ok_or_else(|| Error::MalformedHeader("Missing FIELDS in PCD header".to_string()))?;
        let points = points.ok_or_else(|| Error::MalformedHeader("Missing POINTS in PCD header".to_string()))?;

        let fields = Self::build_fields(names, sizes, types, counts)?;

        Ok(PcdHeader {
            fields,
            points,
            data_format,
            payload_offset,
        })
    }

    fn decode_line(raw: &[u8]) -> Result<&str> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        std::str::from_utf8(raw)
            .map_err(|_| Error::MalformedHeader("Header line is not valid text".to_string()))
    }

    fn parse_list(values: &[&str], keyword: &str) -> Result<Vec<usize>> {
        values
            .iter()
            .map(|v| {
                v.parse::<usize>()
                    .map_err(|_| Error::MalformedHeader(format!("Invalid {} value: {}", keyword, v)))
            })
            .collect()
    }

    fn build_fields(
        names: Vec<String>,
        sizes: Option<Vec<usize>>,
        types: Option<Vec<PcdFieldType>>,
        counts: Option<Vec<usize>>,
    ) -> Result<Vec<PcdField>> {
        let n = names.len();
        for (keyword, len) in [
            ("SIZE", sizes.as_ref().map(Vec::len)),
            ("TYPE", types.as_ref().map(Vec::len)),
            ("COUNT", counts.as_ref().map(Vec::len)),
        ] {
            if let Some(len) = len {
                if len != n {
                    return Err(Error::MalformedHeader(format!(
                        "{} declares {} entries but FIELDS declares {}",
                        keyword, len, n
                    )));
                }
            }
        }

        let fields: Vec<PcdField> = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| PcdField {
                name,
                size: sizes.as_ref().map(|s| s[i]),
                field_type: types.as_ref().map(|t| t[i]),
                count: counts.as_ref().map(|c| c[i]).unwrap_or(1),
            })
            .collect();

        if fields.len() < 3 {
            return Err(Error::MalformedHeader(format!(
                "Expected at least x, y, z fields, found {}",
                fields.len()
            )));
        }
        for (field, expected) in fields.iter().zip(["x", "y", "z"]) {
            let is_float32 = field.size.map_or(true, |s| s == 4)
                && field.field_type.map_or(true, |t| t == PcdFieldType::Float)
                && field.count == 1;
            if !field.name.eq_ignore_ascii_case(expected) || !is_float32 {
                return Err(Error::MalformedHeader(format!(
                    "Leading fields must be 4-byte float x, y, z; found {:?}",
                    field
                )));
            }
        }

        Ok(fields)
    }
}

/// Turns a raw PCD buffer into a [`PointCloud`]
pub struct PcdDecoder;

impl PcdDecoder {
    /// Decode a buffer, naming the cloud after `name` when given
    pub fn decode(bytes: &[u8], name: Option<&str>) -> Result<PointCloud> {
        let header = HeaderParser::parse(bytes)?;
        Self::decode_with_header(bytes, &header, name)
    }

    /// Decode the payload described by an already parsed header
    pub fn decode_with_header(bytes: &[u8], header: &PcdHeader, name: Option<&str>) -> Result<PointCloud> {
        match header.data_format {
            PcdDataFormat::Binary => {}
            PcdDataFormat::Ascii => {
                return Err(Error::Unsupported("ASCII PCD payloads are not supported".to_string()))
            }
            PcdDataFormat::BinaryCompressed => {
                return Err(Error::Unsupported("Binary compressed PCD format not supported".to_string()))
            }
        }

        let Some((stride, required)) = header.stride().zip(header.required_len()) else {
            return Err(Error::TruncatedPayload {
                required: usize::MAX,
                available: bytes.len(),
            });
        };
        if required > bytes.len() {
            return Err(Error::TruncatedPayload {
                required,
                available: bytes.len(),
            });
        }

        let payload = &bytes[header.payload_offset..required];
        let points: Vec<PointRecord> = payload
            .chunks_exact(stride)
            .map(|record| {
                PointRecord::new(
                    LittleEndian::read_f32(&record[0..4]),
                    LittleEndian::read_f32(&record[4..8]),
                    LittleEndian::read_f32(&record[8..12]),
                )
            })
            .collect();

        debug!(
            "decoded {} points ({} byte stride, fields {:?}) from {}",
            points.len(),
            stride,
            header.field_names(),
            name.unwrap_or("<buffer>")
        );

        let cloud = PointCloud::from_points(points);
        Ok(match name {
            Some(name) => cloud.with_name(name),
            None => cloud,
        })
    }
}

/// Path-based PCD reader
pub struct PcdReader;

impl PointCloudReader for PcdReader {
    fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path.file_name().and_then(|n| n.to_str());
        PcdDecoder::decode(&bytes, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use scanmark_core::Point3f;

    fn pcd_bytes(header: &str, values: &[f32]) -> Vec<u8> {
        let mut bytes = header.as_bytes().to_vec();
        for v in values {
            bytes.write_f32::<LittleEndian>(*v).unwrap();
        }
        bytes
    }

    const XYZ_HEADER: &str = "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS 2\nDATA binary\n";

    #[test]
    fn test_decode_two_points() {
        let bytes = pcd_bytes(XYZ_HEADER, &[1.0, 2.0, 3.0, -1.0, 0.0, 5.0]);
        let cloud = PcdDecoder::decode(&bytes, Some("frame.pcd")).unwrap();

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud[0].position, Point3f::new(1.0, 2.0, 3.0));
        assert_eq!(cloud[1].position, Point3f::new(-1.0, 0.0, 5.0));
        assert_eq!(cloud.name.as_deref(), Some("frame.pcd"));
    }

    #[test]
    fn test_payload_offset_follows_data_line() {
        let bytes = pcd_bytes(XYZ_HEADER, &[0.0; 6]);
        let header = HeaderParser::parse(&bytes).unwrap();
        assert_eq!(header.payload_offset, XYZ_HEADER.len());
        assert_eq!(header.points, 2);
        assert_eq!(header.stride(), Some(12));
        assert_eq!(header.field_names(), vec!["x", "y", "z"]);
        assert_eq!(header.data_format, PcdDataFormat::Binary);
    }

    #[test]
    fn test_full_pcl_header() {
        let header = "# .PCD v0.7 - Point Cloud Data file format\r\nVERSION 0.7\r\nFIELDS x y z\r\nSIZE 4 4 4\r\nTYPE F F F\r\nCOUNT 1 1 1\r\nWIDTH 1\r\nHEIGHT 1\r\nVIEWPOINT 0 0 0 1 0 0 0\r\nPOINTS 1\r\nDATA binary\r\n";
        let bytes = pcd_bytes(header, &[4.0, 5.0, 6.0]);
        let cloud = PcdDecoder::decode(&bytes, None).unwrap();
        assert_eq!(cloud.len(), 1);
        assert_eq!(cloud[0].position, Point3f::new(4.0, 5.0, 6.0));
        assert!(cloud.name.is_none());
    }

    #[test]
    fn test_extended_stride_skips_extra_fields() {
        let header = "FIELDS x y z intensity\nSIZE 4 4 4 4\nTYPE F F F F\nPOINTS 2\nDATA binary\n";
        let bytes = pcd_bytes(header, &[1.0, 2.0, 3.0, 99.0, 4.0, 5.0, 6.0, 77.0]);
        let cloud = PcdDecoder::decode(&bytes, None).unwrap();

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud[1].position, Point3f::new(4.0, 5.0, 6.0));
        assert!(cloud[1].intensity.is_none());
    }

    #[test]
    fn test_stride_counts_field_multiplicity() {
        let header = "FIELDS x y z rgb normal\nSIZE 4 4 4 1 4\nTYPE F F F U F\nCOUNT 1 1 1 4 3\nPOINTS 0\nDATA binary\n";
        let parsed = HeaderParser::parse(header.as_bytes()).unwrap();
        assert_eq!(parsed.stride(), Some(12 + 4 + 12));
    }

    #[test]
    fn test_n_points_all_finite() {
        let n = 50;
        let header = format!("FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS {}\nDATA binary\n", n);
        let values: Vec<f32> = (0..n * 3).map(|i| i as f32 * 0.25 - 10.0).collect();
        let cloud = PcdDecoder::decode(&pcd_bytes(&header, &values), None).unwrap();
        assert_eq!(cloud.len(), n);
        assert!(cloud.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_truncated_payload() {
        let bytes = pcd_bytes(XYZ_HEADER, &[1.0, 2.0, 3.0, -1.0, 0.0]);
        match PcdDecoder::decode(&bytes, None) {
            Err(Error::TruncatedPayload { required, available }) => {
                assert_eq!(required, XYZ_HEADER.len() + 24);
                assert_eq!(available, XYZ_HEADER.len() + 20);
            }
            other => panic!("expected TruncatedPayload, got {:?}", other),
        }
    }

    #[test]
    fn test_overflowing_point_count_is_truncated() {
        let header = format!("FIELDS x y z\nPOINTS {}\nDATA binary\n", usize::MAX);
        let result = PcdDecoder::decode(header.as_bytes(), None);
        assert!(matches!(result, Err(Error::TruncatedPayload { .. })));
    }

    #[test]
    fn test_overflowing_stride_is_truncated() {
        let header = format!(
            "FIELDS x y z pad\nSIZE 4 4 4 {}\nTYPE F F F U\nCOUNT 1 1 1 2\nPOINTS 1\nDATA binary\n",
            usize::MAX / 2 + 1
        );
        let bytes = pcd_bytes(&header, &[1.0, 2.0, 3.0]);

        let parsed = HeaderParser::parse(&bytes).unwrap();
        assert_eq!(parsed.stride(), None);
        assert_eq!(parsed.required_len(), None);
        assert!(matches!(
            PcdDecoder::decode(&bytes, None),
            Err(Error::TruncatedPayload { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_are_ignored() {
        let bytes = pcd_bytes(XYZ_HEADER, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(PcdDecoder::decode(&bytes, None).unwrap().len(), 2);
    }

    #[test]
    fn test_zero_points() {
        let header = "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS 0\nDATA binary\n";
        let cloud = PcdDecoder::decode(header.as_bytes(), None).unwrap();
        assert!(cloud.is_empty());
    }

    #[test]
    fn test_missing_data_is_malformed() {
        let bytes = pcd_bytes("FIELDS x y z\nPOINTS 1\n", &[1.0, 2.0, 3.0]);
        assert!(matches!(PcdDecoder::decode(&bytes, None), Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_data_beyond_scan_window_is_malformed() {
        let padding = format!("# {}\n", "x".repeat(HEADER_SCAN_LIMIT));
        let header = format!("{}FIELDS x y z\nPOINTS 0\nDATA binary\n", padding);
        assert!(matches!(
            HeaderParser::parse(header.as_bytes()),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_missing_required_keywords() {
        let no_points = "FIELDS x y z\nDATA binary\n";
        assert!(matches!(HeaderParser::parse(no_points.as_bytes()), Err(Error::MalformedHeader(_))));

        let no_fields = "POINTS 0\nDATA binary\n";
        assert!(matches!(HeaderParser::parse(no_fields.as_bytes()), Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_keyword_must_match_whole_token() {
        let header = "FIELDS x y z\nPOINTS 0\nDATASET foo\n";
        assert!(matches!(HeaderParser::parse(header.as_bytes()), Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_inconsistent_declarations_are_malformed() {
        let header = "FIELDS x y z\nSIZE 4 4\nPOINTS 0\nDATA binary\n";
        assert!(matches!(HeaderParser::parse(header.as_bytes()), Err(Error::MalformedHeader(_))));

        let header = "FIELDS x y z\nSIZE 8 8 8\nTYPE F F F\nPOINTS 0\nDATA binary\n";
        assert!(matches!(HeaderParser::parse(header.as_bytes()), Err(Error::MalformedHeader(_))));

        let header = "FIELDS x y z\nPOINTS lots\nDATA binary\n";
        assert!(matches!(HeaderParser::parse(header.as_bytes()), Err(Error::MalformedHeader(_))));
    }

    #[test]
    fn test_ascii_payload_is_unsupported() {
        let header = "FIELDS x y z\nPOINTS 1\nDATA ascii\n1 2 3\n";
        assert!(matches!(PcdDecoder::decode(header.as_bytes(), None), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_read_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lidar.pcd");
        std::fs::write(&path, pcd_bytes(XYZ_HEADER, &[1.0, 2.0, 3.0, -1.0, 0.0, 5.0])).unwrap();

        let cloud = PcdReader::read_point_cloud(&path).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.name.as_deref(), Some("lidar.pcd"));
    }
}
