//! In-memory shapefile fixtures.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

pub enum Record {
    Null,
    Point(f64, f64),
    /// Rings as stored, each a closed vertex list.
    Polygon(Vec<Vec<(f64, f64)>>),
}

impl Record {
    fn shape_type(&self) -> i32 {
        match self {
            Record::Null => 0,
            Record::Point(..) => 1,
            Record::Polygon(_) => 5,
        }
    }

    fn content(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.shape_type().to_le_bytes());
        match self {
            Record::Null => {}
            Record::Point(x, y) => {
                out.extend_from_slice(&x.to_le_bytes());
                out.extend_from_slice(&y.to_le_bytes());
            }
            Record::Polygon(rings) => {
                let points: Vec<(f64, f64)> = rings.iter().flatten().copied().collect();
                for v in bbox(&points) {
                    out.extend_from_slice(&v.to_le_bytes());
                }
                out.extend_from_slice(&(rings.len() as i32).to_le_bytes());
                out.extend_from_slice(&(points.len() as i32).to_le_bytes());
                let mut start = 0i32;
                for ring in rings {
                    out.extend_from_slice(&start.to_le_bytes());
                    start += ring.len() as i32;
                }
                for (x, y) in points {
                    out.extend_from_slice(&x.to_le_bytes());
                    out.extend_from_slice(&y.to_le_bytes());
                }
            }
        }
        out
    }
}

fn bbox(points: &[(f64, f64)]) -> [f64; 4] {
    points.iter().fold(
        [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
        |[x0, y0, x1, y1], &(x, y)| [x0.min(x), y0.min(y), x1.max(x), y1.max(y)],
    )
}

fn header(shape_type: i32, byte_len: usize, bounds: [f64; 4]) -> Vec<u8> {
    let mut h = Vec::with_capacity(100);
    h.extend_from_slice(&9994i32.to_be_bytes());
    h.extend_from_slice(&[0u8; 20]);
    h.extend_from_slice(&((byte_len / 2) as i32).to_be_bytes());
    h.extend_from_slice(&1000i32.to_le_bytes());
    h.extend_from_slice(&shape_type.to_le_bytes());
    for v in bounds {
        h.extend_from_slice(&v.to_le_bytes());
    }
    h.extend_from_slice(&[0u8; 32]);
    h
}

/// `(shp, shx)` bytes for `records`; the file shape type is `shape_type`.
pub fn shapefile(shape_type: i32, records: &[Record]) -> (Vec<u8>, Vec<u8>) {
    padded(shape_type, records, 0)
}

/// Like `shapefile`, with `gap` zero bytes before every record after the first.
pub fn padded(shape_type: i32, records: &[Record], gap: usize) -> (Vec<u8>, Vec<u8>) {
    let mut body = Vec::new();
    let mut index = Vec::new();
    let mut all_points = Vec::new();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            body.extend(std::iter::repeat(0u8).take(gap));
        }
        let content = record.content();
        let offset = 100 + body.len();
        index.extend_from_slice(&((offset / 2) as i32).to_be_bytes());
        index.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
        body.extend_from_slice(&(i as i32 + 1).to_be_bytes());
        body.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
        body.extend_from_slice(&content);
        match record {
            Record::Null => {}
            Record::Point(x, y) => all_points.push((*x, *y)),
            Record::Polygon(rings) => all_points.extend(rings.iter().flatten().copied()),
        }
    }
    let bounds = if all_points.is_empty() {
        [0.0; 4]
    } else {
        bbox(&all_points)
    };
    let mut shp = header(shape_type, 100 + body.len(), bounds);
    shp.extend(body);
    let mut shx = header(shape_type, 100 + index.len(), bounds);
    shx.extend(index);
    (shp, shx)
}

pub fn polygons(records: &[Record]) -> (Vec<u8>, Vec<u8>) {
    shapefile(5, records)
}

/// ZIP archive holding `members` in the given order.
pub fn zip(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut w = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in members {
        if name.ends_with('/') {
            w.add_directory(*name, SimpleFileOptions::default()).unwrap();
        } else {
            w.start_file(*name, SimpleFileOptions::default()).unwrap();
            w.write_all(bytes).unwrap();
        }
    }
    w.finish().unwrap().into_inner()
}

pub fn square(x: f64, y: f64, size: f64) -> Vec<(f64, f64)> {
    // clockwise, as an outer ring is stored
    vec![
        (x, y),
        (x, y + size),
        (x + size, y + size),
        (x + size, y),
        (x, y),
    ]
}
