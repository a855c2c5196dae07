//! STL reading and writing.
//!
//! Both encodings are accepted. A file is taken as ASCII when it starts
//! with `solid` and mentions `facet` or `vertex` within its first 200
//! bytes, and as binary when its size is exactly `84 + 50 * n`. Anything
//! else is tried as ASCII first, then as binary.
//!
//! Vertices that are not finite or lie beyond [`COORD_LIMIT`] are rejected
//! one by one: the facet holding them is dropped and counted, the rest of
//! the file still loads.

use std::io::Write;
use std::path::Path;

use lamina_geom::Triangle;
use lamina_math::{Point3, Vec3};
use tracing::{debug, info, warn};

use crate::{Mesh, MeshError, Result};

/// Largest accepted absolute coordinate.
pub const COORD_LIMIT: f64 = 10_000.0;

const HEADER_SIZE: usize = 80;
const TRIANGLE_SIZE: usize = 50;
const SNIFF_LEN: usize = 200;

/// Detected STL encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StlFormat {
    /// Text encoding.
    Ascii,
    /// Binary encoding.
    Binary,
    /// Neither signature matched.
    Unknown,
}

/// Outcome of parsing, before the empty-mesh check.
#[derive(Debug, Default)]
struct Parsed {
    triangles: Vec<Triangle>,
    rejected: usize,
}

/// Load a mesh from an STL file.
///
/// # Errors
///
/// Returns [`MeshError::FileNotFound`] or [`MeshError::Io`] when the file
/// cannot be read, and [`MeshError::NoValidTriangles`] when nothing usable
/// remains after vertex rejection.
pub fn read_stl<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MeshError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            MeshError::Io(e)
        }
    })?;
    let mesh = parse_stl(&bytes)?;
    info!(path = %path.display(), facets = mesh.len(), "Loaded STL");
    Ok(mesh)
}

/// Detect the encoding of STL bytes.
pub fn detect_format(bytes: &[u8]) -> StlFormat {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(SNIFF_LEN)]).to_ascii_lowercase();
    if head.trim_start().starts_with("solid") && (head.contains("facet") || head.contains("vertex")) {
        return StlFormat::Ascii;
    }
    if let Some(count) = binary_count(bytes) {
        if HEADER_SIZE + 4 + count as usize * TRIANGLE_SIZE == bytes.len() {
            return StlFormat::Binary;
        }
    }
    StlFormat::Unknown
}

/// Parse STL bytes of either encoding.
pub fn parse_stl(bytes: &[u8]) -> Result<Mesh> {
    let format = detect_format(bytes);
    debug!(?format, len = bytes.len(), "Detected STL encoding");
    let parsed = match format {
        StlFormat::Ascii => parse_ascii(bytes).or_else(|_| parse_binary(bytes))?,
        StlFormat::Binary => parse_binary(bytes).or_else(|_| parse_ascii(bytes))?,
        StlFormat::Unknown => parse_ascii(bytes).or_else(|_| parse_binary(bytes))?,
    };
    if parsed.rejected > 0 {
        warn!(rejected = parsed.rejected, "Dropped facets with invalid vertices");
    }
    if parsed.triangles.is_empty() {
        return Err(MeshError::NoValidTriangles);
    }
    Ok(Mesh::new(parsed.triangles))
}

fn valid_vertex(p: &Point3) -> bool {
    [p.x, p.y, p.z]
        .iter()
        .all(|c| c.is_finite() && c.abs() < COORD_LIMIT)
}

fn coords(parts: &[&str]) -> Option<[f64; 3]> {
    if parts.len() < 3 {
        return None;
    }
    let x = parts[0].parse().ok()?;
    let y = parts[1].parse().ok()?;
    let z = parts[2].parse().ok()?;
    Some([x, y, z])
}

fn parse_ascii(bytes: &[u8]) -> Result<Parsed> {
    let text = String::from_utf8_lossy(bytes);
    let mut out = Parsed::default();
    let mut normal = Vec3::zeros();
    let mut verts: Vec<Point3> = Vec::with_capacity(3);
    let mut bad_facet = false;
    let mut seen_facet = false;

    for line in text.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.first().map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("facet") => {
                seen_facet = true;
                verts.clear();
                bad_facet = false;
                normal = parts
                    .get(2..)
                    .and_then(coords)
                    .map(|[x, y, z]| Vec3::new(x, y, z))
                    .unwrap_or_else(Vec3::zeros);
            }
            Some("vertex") => match coords(&parts[1..]) {
                Some([x, y, z]) => {
                    let p = Point3::new(x, y, z);
                    if valid_vertex(&p) {
                        verts.push(p);
                    } else {
                        bad_facet = true;
                    }
                }
                None => bad_facet = true,
            },
            Some("endfacet") => {
                if !bad_facet && verts.len() == 3 {
                    out.triangles
                        .push(Triangle::new(verts[0], verts[1], verts[2], normal));
                } else {
                    out.rejected += 1;
                }
                verts.clear();
            }
            _ => {}
        }
    }
    if !seen_facet {
        return Err(MeshError::InvalidContent("no facets in ASCII STL".into()));
    }
    Ok(out)
}

fn binary_count(bytes: &[u8]) -> Option<u32> {
    let raw = bytes.get(HEADER_SIZE..HEADER_SIZE + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn read_f32(buf: &[u8], at: usize) -> f64 {
    f64::from(f32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]))
}

fn read_point(buf: &[u8], at: usize) -> Point3 {
    Point3::new(read_f32(buf, at), read_f32(buf, at + 4), read_f32(buf, at + 8))
}

fn parse_binary(bytes: &[u8]) -> Result<Parsed> {
    let count = binary_count(bytes)
        .ok_or_else(|| MeshError::InvalidContent("binary STL shorter than its header".into()))?;
    let body = &bytes[HEADER_SIZE + 4..];
    let available = (body.len() / TRIANGLE_SIZE) as u32;
    if available < count {
        return Err(MeshError::Truncated {
            expected: count,
            got: available,
        });
    }

    let mut out = Parsed::default();
    for chunk in body.chunks_exact(TRIANGLE_SIZE).take(count as usize) {
        let n = read_point(chunk, 0);
        let (a, b, c) = (read_point(chunk, 12), read_point(chunk, 24), read_point(chunk, 36));
        if [a, b, c].iter().all(valid_vertex) {
            out.triangles.push(Triangle::new(a, b, c, n.coords));
        } else {
            out.rejected += 1;
        }
    }
    Ok(out)
}

/// Encode a mesh as binary STL.
pub fn to_binary_bytes(mesh: &Mesh) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + 4 + mesh.len() * TRIANGLE_SIZE);
    let mut header = [0u8; HEADER_SIZE];
    let tag = b"lamina binary STL";
    header[..tag.len()].copy_from_slice(tag);
    buf.extend_from_slice(&header);
    buf.extend_from_slice(&(mesh.len() as u32).to_le_bytes());
    for tri in &mesh.triangles {
        for v in [tri.normal.x, tri.normal.y, tri.normal.z] {
            buf.extend_from_slice(&(v as f32).to_le_bytes());
        }
        for p in tri.vertices() {
            for v in [p.x, p.y, p.z] {
                buf.extend_from_slice(&(v as f32).to_le_bytes());
            }
        }
        buf.extend_from_slice(&0u16.to_le_bytes());
    }
    buf
}

/// Write a mesh as binary STL.
pub fn write_stl<W: Write>(mesh: &Mesh, mut writer: W) -> Result<()> {
    writer.write_all(&to_binary_bytes(mesh))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii_facet(v: [[f64; 3]; 3]) -> String {
        let mut s = String::from("  facet normal 0 0 1\n    outer loop\n");
        for p in v {
            s.push_str(&format!("      vertex {} {} {}\n", p[0], p[1], p[2]));
        }
        s.push_str("    endloop\n  endfacet\n");
        s
    }

    #[test]
    fn test_parse_ascii() {
        let mut text = String::from("solid test\n");
        text.push_str(&ascii_facet([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]));
        text.push_str("endsolid test\n");
        assert_eq!(detect_format(text.as_bytes()), StlFormat::Ascii);
        let mesh = parse_stl(text.as_bytes()).unwrap();
        assert_eq!(mesh.len(), 1);
        assert_eq!(mesh.triangles[0].normal, Vec3::z());
    }

    #[test]
    fn test_ascii_rejects_out_of_range_vertex() {
        let mut text = String::from("solid test\n");
        text.push_str(&ascii_facet([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]));
        text.push_str(&ascii_facet([[0.0, 0.0, 0.0], [20000.0, 0.0, 0.0], [0.0, 1.0, 0.0]]));
        text.push_str(&ascii_facet([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, f64::NAN, 0.0]]));
        text.push_str("endsolid test\n");
        let mesh = parse_stl(text.as_bytes()).unwrap();
        assert_eq!(mesh.len(), 1);
    }

    #[test]
    fn test_binary_round_trip_of_cube() {
        let cube = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(50.0, 50.0, 30.0));
        let bytes = to_binary_bytes(&cube);
        assert_eq!(bytes.len(), 84 + 12 * 50);
        assert_eq!(detect_format(&bytes), StlFormat::Binary);
        let back = parse_stl(&bytes).unwrap();
        assert_eq!(back.len(), 12);
        assert_eq!(back.bounds(), cube.bounds());
    }

    #[test]
    fn test_binary_header_starting_with_solid() {
        let cube = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let mut bytes = to_binary_bytes(&cube);
        bytes[..5].copy_from_slice(b"solid");
        assert_eq!(detect_format(&bytes), StlFormat::Binary);
        assert_eq!(parse_stl(&bytes).unwrap().len(), 12);
    }

    #[test]
    fn test_truncated_binary_fails() {
        let cube = Mesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let bytes = to_binary_bytes(&cube);
        let err = parse_stl(&bytes[..bytes.len() - 10]).unwrap_err();
        assert!(matches!(err, MeshError::Truncated { .. } | MeshError::InvalidContent(_)));
    }

    #[test]
    fn test_empty_solid_is_fatal() {
        let err = parse_stl(b"solid empty\nfacet\nendsolid empty\n").unwrap_err();
        assert!(matches!(err, MeshError::NoValidTriangles));
    }

    #[test]
    fn test_missing_file() {
        let err = read_stl("/nonexistent/lamina/model.stl").unwrap_err();
        assert!(matches!(err, MeshError::FileNotFound { .. }));
    }
}
