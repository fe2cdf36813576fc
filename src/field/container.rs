//! CBOR container access.
//!
//! The asset is a single CBOR map with text keys. This module wraps the
//! decoded map and converts individual entries into the scalar, array and
//! raw-buffer shapes the decoder needs, reporting every mismatch as
//! [`Error::MalformedContainer`].

use byteorder::{ByteOrder, LittleEndian};
use ciborium::value::Value;
use half::f16;

use crate::util::{Error, Result};

/// Decoded top-level map.
pub struct Container {
    entries: Vec<(Value, Value)>,
}

impl Container {
    /// Parse container bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: Value =
            ciborium::de::from_reader(bytes).map_err(|e| Error::Decode(e.to_string()))?;
        match value {
            Value::Map(entries) => Ok(Self { entries }),
            other => Err(Error::malformed(format!(
                "top-level value must be a map, got {}",
                value_kind(&other)
            ))),
        }
    }

    /// Wrap an already decoded map.
    pub fn from_entries(entries: Vec<(Value, Value)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_text() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn require(&self, key: &str) -> Result<&Value> {
        self.get(key)
            .ok_or_else(|| Error::malformed(format!("missing field '{key}'")))
    }

    pub fn usize(&self, key: &str) -> Result<usize> {
        value_usize(self.require(key)?).ok_or_else(|| wrong_type(key, "non-negative integer"))
    }

    pub fn f32(&self, key: &str) -> Result<f32> {
        value_f64(self.require(key)?)
            .map(|v| v as f32)
            .ok_or_else(|| wrong_type(key, "number"))
    }

    /// Optional number; present-but-mistyped is still an error.
    pub fn opt_f32(&self, key: &str) -> Result<Option<f32>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.f32(key).map(Some),
        }
    }

    pub fn f32_array(&self, key: &str) -> Result<Vec<f32>> {
        let items = self
            .require(key)?
            .as_array()
            .ok_or_else(|| wrong_type(key, "array"))?;
        items
            .iter()
            .map(|v| value_f64(v).map(|x| x as f32))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| wrong_type(key, "array of numbers"))
    }

    /// Layer count fields are either a plain integer or an array with one
    /// entry (the layer width) per layer.
    pub fn count(&self, key: &str) -> Result<usize> {
        match self.require(key)? {
            Value::Array(items) => Ok(items.len()),
            v => value_usize(v).ok_or_else(|| wrong_type(key, "integer or array")),
        }
    }

    /// Raw bytes of a buffer field. Typed-array tags are unwrapped.
    pub fn bytes(&self, key: &str) -> Result<&[u8]> {
        let mut value = self.require(key)?;
        while let Value::Tag(tag, inner) = value {
            check_typed_array_tag(key, *tag)?;
            value = inner;
        }
        match value {
            Value::Bytes(b) => Ok(b),
            _ => Err(wrong_type(key, "byte string")),
        }
    }

    /// Little-endian half-float buffer.
    pub fn f16_buffer(&self, key: &str) -> Result<Vec<f16>> {
        let bytes = self.bytes(key)?;
        if bytes.len() % 2 != 0 {
            return Err(Error::malformed(format!(
                "'{key}' has {} bytes, not a whole number of halfs",
                bytes.len()
            )));
        }
        let mut bits = vec![0u16; bytes.len() / 2];
        LittleEndian::read_u16_into(bytes, &mut bits);
        Ok(bits.into_iter().map(f16::from_bits).collect())
    }

    /// Little-endian `f32` buffer.
    pub fn f32_buffer(&self, key: &str) -> Result<Vec<f32>> {
        let bytes = self.bytes(key)?;
        if bytes.len() % 4 != 0 {
            return Err(Error::malformed(format!(
                "'{key}' has {} bytes, not a whole number of floats",
                bytes.len()
            )));
        }
        let mut values = vec![0f32; bytes.len() / 4];
        LittleEndian::read_f32_into(bytes, &mut values);
        Ok(values)
    }

    /// Array of integer arrays (run-length tables).
    pub fn usize_table(&self, key: &str) -> Result<Vec<Vec<usize>>> {
        let rows = self
            .require(key)?
            .as_array()
            .ok_or_else(|| wrong_type(key, "array of arrays"))?;
        rows.iter()
            .map(|row| {
                row.as_array()
                    .and_then(|items| items.iter().map(value_usize).collect::<Option<Vec<_>>>())
                    .ok_or_else(|| wrong_type(key, "array of integer arrays"))
            })
            .collect()
    }
}

/// Reads a 3x4 row-major matrix given as nested rows or as a flat list of
/// 12 or 16 numbers. Extra rows/columns are ignored.
pub fn value_pose(key: &str, value: &Value) -> Result<[[f32; 4]; 3]> {
    let items = value.as_array().ok_or_else(|| wrong_type(key, "matrix"))?;
    let flat: Vec<f32> = if items.iter().all(|v| v.as_array().is_some()) {
        if items.len() < 3 {
            return Err(wrong_type(key, "matrix with at least 3 rows"));
        }
        let mut flat = Vec::with_capacity(12);
        for row in &items[..3] {
            let row = row.as_array().map(Vec::as_slice).unwrap_or_default();
            if row.len() < 4 {
                return Err(wrong_type(key, "matrix rows of at least 4 numbers"));
            }
            for v in &row[..4] {
                flat.push(value_f64(v).ok_or_else(|| wrong_type(key, "numeric matrix"))? as f32);
            }
        }
        flat
    } else {
        if items.len() != 12 && items.len() != 16 {
            return Err(wrong_type(key, "flat matrix of 12 or 16 numbers"));
        }
        items
            .iter()
            .take(12)
            .map(|v| value_f64(v).map(|x| x as f32))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| wrong_type(key, "numeric matrix"))?
    };

    let mut pose = [[0.0; 4]; 3];
    for (r, row) in pose.iter_mut().enumerate() {
        row.copy_from_slice(&flat[r * 4..r * 4 + 4]);
    }
    Ok(pose)
}

pub fn value_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Integer(i) => Some(i128::from(*i) as f64),
        _ => None,
    }
}

pub fn value_usize(value: &Value) -> Option<usize> {
    match value {
        Value::Integer(i) => usize::try_from(i128::from(*i)).ok(),
        // Some writers emit whole numbers as floats.
        Value::Float(f) if *f >= 0.0 && f.fract() == 0.0 && *f <= usize::MAX as f64 => Some(*f as usize),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "integer",
        Value::Bytes(_) => "bytes",
        Value::Float(_) => "float",
        Value::Text(_) => "text",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        Value::Tag(..) => "tag",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        _ => "unknown",
    }
}

fn wrong_type(key: &str, expected: &str) -> Error {
    Error::malformed(format!("field '{key}' must be {expected}"))
}

/// RFC 8746 typed arrays: tags 64..=87, bit 2 set means little-endian.
/// Single-byte element tags (64, 72) have no byte order.
fn check_typed_array_tag(key: &str, tag: u64) -> Result<()> {
    if !(64..=87).contains(&tag) {
        return Ok(());
    }
    let single_byte = tag == 64 || tag == 72;
    let little_endian = tag & 0b100 != 0;
    if single_byte || little_endian {
        Ok(())
    } else {
        Err(Error::unsupported(format!(
            "'{key}' is a big-endian typed array (tag {tag})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(entries: Vec<(Value, Value)>) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&Value::Map(entries), &mut buf).unwrap();
        buf
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_scalars_and_counts() {
        let bytes = encode(vec![
            (text("n_freqs"), Value::Integer(2.into())),
            (text("render_step"), Value::Float(0.5)),
            (text("n_color_layers"), Value::Array(vec![Value::Integer(16.into()); 2])),
            (text("freqs"), Value::Array(vec![Value::Float(1.0), Value::Integer(3.into())])),
        ]);
        let c = Container::parse(&bytes).unwrap();
        assert_eq!(c.usize("n_freqs").unwrap(), 2);
        assert_eq!(c.f32("render_step").unwrap(), 0.5);
        assert_eq!(c.count("n_color_layers").unwrap(), 2);
        assert_eq!(c.count("n_freqs").unwrap(), 2);
        assert_eq!(c.f32_array("freqs").unwrap(), vec![1.0, 3.0]);
        assert_eq!(c.opt_f32("density_bias").unwrap(), None);
        assert!(matches!(c.usize("grid_res"), Err(Error::MalformedContainer(_))));
        assert!(matches!(c.usize("render_step"), Err(Error::MalformedContainer(_))));
    }

    #[test]
    fn test_buffers_little_endian() {
        let halfs: Vec<u8> = [f16::from_f32(1.5), f16::from_f32(-2.0)]
            .iter()
            .flat_map(|h| h.to_bits().to_le_bytes())
            .collect();
        let floats: Vec<u8> = [0.25f32, 8.0].iter().flat_map(|f| f.to_le_bytes()).collect();
        let bytes = encode(vec![
            (text("a_buffer"), Value::Tag(69, Box::new(Value::Bytes(halfs)))),
            (text("w"), Value::Bytes(floats)),
            (text("odd"), Value::Bytes(vec![1, 2, 3])),
            (text("be"), Value::Tag(65, Box::new(Value::Bytes(vec![0, 1])))),
        ]);
        let c = Container::parse(&bytes).unwrap();
        assert_eq!(
            c.f16_buffer("a_buffer").unwrap(),
            vec![f16::from_f32(1.5), f16::from_f32(-2.0)]
        );
        assert_eq!(c.f32_buffer("w").unwrap(), vec![0.25, 8.0]);
        assert!(matches!(c.f16_buffer("odd"), Err(Error::MalformedContainer(_))));
        assert!(matches!(c.f16_buffer("be"), Err(Error::UnsupportedLayout(_))));
    }

    #[test]
    fn test_pose_shapes() {
        let row = |a: f64| Value::Array((0..4).map(|i| Value::Float(a + i as f64)).collect());
        let nested = Value::Array(vec![row(0.0), row(10.0), row(20.0), row(30.0)]);
        let pose = value_pose("pose", &nested).unwrap();
        assert_eq!(pose[1], [10.0, 11.0, 12.0, 13.0]);
        assert_eq!(pose[2][3], 23.0);

        let flat = Value::Array((0..12).map(|i| Value::Integer(i.into())).collect());
        let pose = value_pose("pose", &flat).unwrap();
        assert_eq!(pose[2], [8.0, 9.0, 10.0, 11.0]);

        let short = Value::Array(vec![Value::Float(1.0); 5]);
        assert!(value_pose("pose", &short).is_err());
    }

    #[test]
    fn test_rejects_non_map_and_garbage() {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&Value::Array(vec![]), &mut buf).unwrap();
        assert!(matches!(Container::parse(&buf), Err(Error::MalformedContainer(_))));
        assert!(matches!(Container::parse(&[0xff, 0x00]), Err(Error::Decode(_))));
    }
}
