//! Synthetic container assets for integration tests.

#![allow(dead_code)]

use ciborium::value::Value;
use half::f16;

/// Builder for a small CBOR asset with zero network weights.
///
/// With zero weights every sample has density `exp(min(bias, 11))` and
/// color `sigmoid(0) = 0.5`, which makes rendered pixels predictable.
#[derive(Clone, Debug)]
pub struct AssetBuilder {
    pub tag: &'static str,
    pub variant: i64,
    pub n_freqs: usize,
    pub n_quants: usize,
    pub grid_res: usize,
    pub rank: usize,
    pub render_step: f64,
    pub density_bias: f64,
    pub n_density_layers: usize,
    pub grid_rles: Option<Vec<Vec<usize>>>,
    pub initial_pose: Option<Vec<f64>>,
    /// Drop this many halfs from the end of the factor buffer.
    pub truncate_buffer: usize,
}

impl Default for AssetBuilder {
    fn default() -> Self {
        Self {
            tag: "ppng",
            variant: 1,
            n_freqs: 1,
            n_quants: 4,
            grid_res: 4,
            rank: 1,
            render_step: 0.01,
            density_bias: 11.0,
            n_density_layers: 1,
            grid_rles: Some(vec![vec![0, 64]]),
            initial_pose: None,
            truncate_buffer: 0,
        }
    }
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn int(n: usize) -> Value {
    Value::Integer((n as u64).into())
}

fn f16_bytes(len: usize, value: f32) -> Value {
    let bits = f16::from_f32(value).to_bits().to_le_bytes();
    Value::Bytes(bits.iter().copied().cycle().take(len * 2).collect())
}

fn zero_f32_bytes(blocks: usize) -> Value {
    Value::Bytes(vec![0u8; blocks * 16 * 4])
}

impl AssetBuilder {
    /// Number of halfs in the concatenated factor buffer.
    pub fn buffer_len(&self) -> usize {
        let (f2, q, r, c) = (self.n_freqs * 2, self.n_quants, self.rank, 4);
        match self.variant {
            1 => 3 * f2 * q * r * c,
            2 => 3 * f2 * q * q * r * c,
            _ => f2 * q * q * q * c,
        }
    }

    pub fn entries(&self) -> Vec<(Value, Value)> {
        let tag = self.tag;
        let mut entries = vec![
            (text(&format!("{tag}_type")), Value::Integer(self.variant.into())),
            (text("n_freqs"), int(self.n_freqs)),
            (text("n_quants"), int(self.n_quants)),
            (text("grid_res"), int(self.grid_res)),
            (text("n_feats"), int(4)),
            (text("rank"), int(self.rank)),
            (text("render_step"), Value::Float(self.render_step)),
            (
                text("freqs"),
                Value::Array((0..self.n_freqs).map(|i| Value::Float((i + 1) as f64)).collect()),
            ),
            (text("n_density_layers"), int(self.n_density_layers)),
            (text("n_color_layers"), Value::Array(vec![int(16), int(3)])),
            (text("density_bias"), Value::Float(self.density_bias)),
            (
                text(&format!("{tag}_buffer")),
                f16_bytes(self.buffer_len().saturating_sub(self.truncate_buffer), 0.5),
            ),
            (text(&format!("{tag}_density_layer_0")), zero_f32_bytes(self.n_freqs * 8)),
            (text(&format!("{tag}_color_layer_0")), zero_f32_bytes(16)),
            (text(&format!("{tag}_color_layer_1")), zero_f32_bytes(4)),
        ];
        if let Some(rles) = &self.grid_rles {
            let rows = rles
                .iter()
                .map(|runs| Value::Array(runs.iter().map(|&n| int(n)).collect()))
                .collect();
            entries.push((text("grid_rles"), Value::Array(rows)));
        }
        if let Some(pose) = &self.initial_pose {
            entries.push((
                text("initial_pose"),
                Value::Array(pose.iter().map(|&v| Value::Float(v)).collect()),
            ));
        }
        entries
    }

    pub fn encode_entries(entries: Vec<(Value, Value)>) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&Value::Map(entries), &mut buf).unwrap();
        buf
    }

    pub fn build(&self) -> Vec<u8> {
        Self::encode_entries(self.entries())
    }
}
