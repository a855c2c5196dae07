//! SLC contour files.
//!
//! Layout (little-endian):
//! - 2048-byte text header terminated by `0d 0a 1a` and padded with spaces
//! - 256 reserved zero bytes
//! - sampling table: `u8` channel count, then per channel four `f32`
//!   (start z, layer thickness, line-width compensation, reserved)
//! - per layer: `f32` z, `u32` contour count, then per contour `u32` point
//!   count, `u32` gap count and `f32` x/y pairs
//! - trailer: `f32` last z, `u32` 0xFFFFFFFF

use std::fs;
use std::io::Write;
use std::path::Path;

use lamina_geom::Polyline;
use lamina_math::Point3;
use tracing::{debug, info};

use crate::layer::Layer;
use crate::{Result, SlicerError};

const HEADER_LEN: usize = 2048;
const RESERVED_LEN: usize = 256;
const HEADER_END: [u8; 3] = [0x0d, 0x0a, 0x1a];
const TERMINATOR: u32 = 0xFFFF_FFFF;

fn extents(layers: &[Layer]) -> [(f64, f64); 3] {
    let mut ext = [(0.0, 0.0); 3];
    let mut first = true;
    for layer in layers {
        for p in layer.contours.iter().flat_map(|c| &c.points) {
            let v = [p.x, p.y, layer.z];
            for (e, v) in ext.iter_mut().zip(v) {
                if first {
                    *e = (v, v);
                } else {
                    *e = (e.0.min(v), e.1.max(v));
                }
            }
            first = false;
        }
    }
    ext
}

/// Encode layer contours as SLC.
pub fn to_slc_bytes(layers: &[Layer]) -> Vec<u8> {
    let [x, y, z] = extents(layers);
    let text = format!(
        "-SLCVER 2.0 -UNIT MM -PACKAGE lamina -EXTENTS {:.3},{:.3} {:.3},{:.3} {:.3},{:.3}",
        x.0, x.1, y.0, y.1, z.0, z.1
    );
    let mut buf = Vec::with_capacity(HEADER_LEN + RESERVED_LEN + 17);
    buf.extend_from_slice(text.as_bytes());
    buf.extend_from_slice(&HEADER_END);
    buf.resize(HEADER_LEN, b' ');
    buf.resize(HEADER_LEN + RESERVED_LEN, 0);

    let start = layers.first().map_or(0.0, |l| l.z);
    let thickness = match layers {
        [a, b, ..] => b.z - a.z,
        _ => 1.0,
    };
    buf.push(1);
    for v in [start, thickness, 0.0, 0.0] {
        buf.extend_from_slice(&(v as f32).to_le_bytes());
    }

    for layer in layers {
        buf.extend_from_slice(&(layer.z as f32).to_le_bytes());
        buf.extend_from_slice(&(layer.contours.len() as u32).to_le_bytes());
        for contour in &layer.contours {
            buf.extend_from_slice(&(contour.len() as u32).to_le_bytes());
            buf.extend_from_slice(&0u32.to_le_bytes());
            for p in &contour.points {
                buf.extend_from_slice(&(p.x as f32).to_le_bytes());
                buf.extend_from_slice(&(p.y as f32).to_le_bytes());
            }
        }
    }

    let last = layers.last().map_or(0.0, |l| l.z);
    buf.extend_from_slice(&(last as f32).to_le_bytes());
    buf.extend_from_slice(&TERMINATOR.to_le_bytes());
    buf
}

/// Write layer contours as SLC.
pub fn write_slc<W: Write>(layers: &[Layer], mut writer: W) -> Result<()> {
    writer.write_all(&to_slc_bytes(layers))?;
    let contours: usize = layers.iter().map(|l| l.contours.len()).sum();
    info!(layers = layers.len(), contours, "Wrote SLC");
    Ok(())
}

struct Reader<'a> {
    buf: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        let end = self.at.checked_add(n).filter(|&end| end <= self.buf.len());
        let Some(end) = end else {
            return Err(SlicerError::Format(format!("truncated {what} at byte {}", self.at)));
        };
        let out = &self.buf[self.at..end];
        self.at = end;
        Ok(out)
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self, what: &str) -> Result<f64> {
        let b = self.take(4, what)?;
        Ok(f64::from(f32::from_le_bytes([b[0], b[1], b[2], b[3]])))
    }
}

/// Decode SLC bytes into layers holding contours.
pub fn parse_slc(bytes: &[u8]) -> Result<Vec<Layer>> {
    let mut r = Reader { buf: bytes, at: 0 };
    r.take(HEADER_LEN + RESERVED_LEN, "header")?;
    let channels = r.take(1, "sampling table")?[0] as usize;
    r.take(channels * 16, "sampling table")?;

    let mut layers = Vec::new();
    loop {
        let z = r.f32("layer header")?;
        let count = r.u32("layer header")?;
        if count == TERMINATOR {
            break;
        }
        let mut contours = Vec::with_capacity(count.min(1 << 16) as usize);
        for _ in 0..count {
            let points = r.u32("contour header")? as usize;
            r.u32("contour header")?;
            let raw = r.take(points.saturating_mul(8), "contour points")?;
            let pts = raw
                .chunks_exact(8)
                .map(|c| {
                    let x = f32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                    let y = f32::from_le_bytes([c[4], c[5], c[6], c[7]]);
                    Point3::new(f64::from(x), f64::from(y), z)
                })
                .collect();
            contours.push(Polyline::from_points(pts));
        }
        layers.push(Layer::with_contours(z, contours));
    }
    debug!(layers = layers.len(), "Parsed SLC");
    Ok(layers)
}

/// Read an SLC file.
pub fn read_slc<P: AsRef<Path>>(path: P) -> Result<Vec<Layer>> {
    parse_slc(&fs::read(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layers() -> Vec<Layer> {
        (1..=3)
            .map(|k| {
                let z = k as f64 * 0.5;
                let mut hole = Polyline::rectangle(2.0, 2.0, 8.0, 8.0, z);
                hole.make_cw();
                Layer::with_contours(z, vec![Polyline::rectangle(0.0, 0.0, 10.0, 10.0, z), hole])
            })
            .collect()
    }

    #[test]
    fn test_layout() {
        let bytes = to_slc_bytes(&layers());
        assert!(bytes.starts_with(b"-SLCVER 2.0 -UNIT MM -PACKAGE lamina -EXTENTS 0.000,10.000"));
        let text_end = bytes.windows(3).position(|w| w == HEADER_END).unwrap();
        assert!(bytes[text_end + 3..HEADER_LEN].iter().all(|&b| b == b' '));
        assert!(bytes[HEADER_LEN..HEADER_LEN + RESERVED_LEN].iter().all(|&b| b == 0));
        assert_eq!(bytes[HEADER_LEN + RESERVED_LEN], 1);
        let table = &bytes[HEADER_LEN + RESERVED_LEN + 1..];
        assert_eq!(f32::from_le_bytes(table[0..4].try_into().unwrap()), 0.5);
        assert_eq!(f32::from_le_bytes(table[4..8].try_into().unwrap()), 0.5);
        let tail = &bytes[bytes.len() - 8..];
        assert_eq!(f32::from_le_bytes(tail[0..4].try_into().unwrap()), 1.5);
        assert_eq!(u32::from_le_bytes(tail[4..8].try_into().unwrap()), TERMINATOR);
        // Header, table, 3 layers of 2 contours with 5 points each, trailer.
        assert_eq!(bytes.len(), HEADER_LEN + RESERVED_LEN + 17 + 3 * (8 + 2 * (8 + 5 * 8)) + 8);
    }

    #[test]
    fn test_read_back() {
        let original = layers();
        let read = parse_slc(&to_slc_bytes(&original)).unwrap();
        assert_eq!(read.len(), 3);
        for (a, b) in original.iter().zip(&read) {
            assert_eq!(a.z, b.z);
            assert_eq!(a.contours.len(), b.contours.len());
            for (ca, cb) in a.contours.iter().zip(&b.contours) {
                assert_eq!(ca.points, cb.points);
            }
        }
    }

    #[test]
    fn test_single_layer_thickness() {
        let one = &layers()[..1];
        let bytes = to_slc_bytes(one);
        let table = &bytes[HEADER_LEN + RESERVED_LEN + 1..];
        assert_eq!(f32::from_le_bytes(table[4..8].try_into().unwrap()), 1.0);
        assert_eq!(parse_slc(&bytes).unwrap().len(), 1);
    }

    #[test]
    fn test_truncated() {
        let bytes = to_slc_bytes(&layers());
        for cut in [100, HEADER_LEN + RESERVED_LEN, bytes.len() - 4, bytes.len() - 30] {
            let err = parse_slc(&bytes[..cut]).unwrap_err();
            assert!(matches!(err, SlicerError::Format(_)), "cut at {cut}");
        }
    }
}
