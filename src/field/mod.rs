//! Compressed field container decoding.
//!
//! The asset is one CBOR map. Buffer fields carry a format prefix (`ppng` or
//! `qff`) detected from whichever `<prefix>_type` key is present:
//!
//! ```text
//! CBOR bytes -> Container -> CompressedField (header)
//!                         -> FactorBuffers   (<prefix>_buffer)
//!                         -> NeuralWeights   (<prefix>_density_layer_0, <prefix>_color_layer_i)
//!                         -> grid_rles       (optional)
//! ```

mod container;
mod header;

pub use container::Container;
pub use header::{CompressedField, EncodingVariant, FactorBuffers, PoseMatrix};
pub(crate) use header::checked_extent;

use glam::Vec3;

use crate::network::NeuralWeights;
use crate::util::{Error, Result};

/// Recognized buffer key prefixes.
pub const FORMAT_TAGS: [&str; 2] = ["ppng", "qff"];

/// Everything the scene needs from one container.
#[derive(Clone, Debug)]
pub struct DecodedField {
    pub field: CompressedField,
    pub factors: FactorBuffers,
    pub weights: NeuralWeights,
    /// Per-mip alternating run lengths, empty run first, in cascade order.
    pub grid_rles: Option<Vec<Vec<usize>>>,
}

/// Decode a container from raw bytes.
#[tracing::instrument(skip_all, fields(bytes = bytes.len()))]
pub fn decode(bytes: &[u8]) -> Result<DecodedField> {
    let container = Container::parse(bytes)?;
    decode_container(&container)
}

/// Decode an already parsed container.
pub fn decode_container(c: &Container) -> Result<DecodedField> {
    let tag = FORMAT_TAGS
        .iter()
        .copied()
        .find(|t| c.contains(&format!("{t}_type")))
        .ok_or_else(|| {
            Error::malformed(format!(
                "no encoding type field, expected one of {}",
                FORMAT_TAGS.map(|t| format!("{t}_type")).join(", ")
            ))
        })?;

    let field = CompressedField {
        format_tag: tag.to_string(),
        n_freqs: c.usize("n_freqs")?,
        n_quants: c.usize("n_quants")?,
        grid_res: c.usize("grid_res")?,
        n_feats: c.usize("n_feats")?,
        rank: c.usize("rank")?,
        variant: EncodingVariant::from_tag(c.usize(&format!("{tag}_type"))?)?,
        render_step: c.f32("render_step")?,
        freqs: c.f32_array("freqs")?,
        up: read_up(c)?,
        initial_pose: read_initial_pose(c)?,
        n_density_layers: c.count("n_density_layers")?,
        n_color_layers: c.count("n_color_layers")?,
        density_bias: c.opt_f32("density_bias")?.unwrap_or(0.0),
    };
    field.validate()?;

    let density = c.f32_buffer(&format!("{tag}_density_layer_0"))?;
    let color = (0..field.n_color_layers)
        .map(|i| c.f32_buffer(&format!("{tag}_color_layer_{i}")))
        .collect::<Result<Vec<_>>>()?;
    let weights = NeuralWeights::from_raw(field.n_freqs, &density, &color, field.density_bias)?;

    let factors = FactorBuffers::split(&field, c.f16_buffer(&format!("{tag}_buffer"))?)?;

    let grid_rles = if c.contains("grid_rles") {
        let rles = c.usize_table("grid_rles")?;
        if rles.is_empty() {
            return Err(Error::malformed("grid_rles has no mip levels"));
        }
        Some(rles)
    } else {
        None
    };

    tracing::debug!(
        format = tag,
        variant = field.variant.tag(),
        f = field.n_freqs,
        q = field.n_quants,
        g = field.grid_res,
        r = field.rank,
        mips = grid_rles.as_ref().map_or(0, Vec::len),
        "container decoded"
    );

    Ok(DecodedField {
        field,
        factors,
        weights,
        grid_rles,
    })
}

fn read_up(c: &Container) -> Result<Option<Vec3>> {
    if !c.contains("up") {
        return Ok(None);
    }
    let v = c.f32_array("up")?;
    if v.len() != 3 {
        return Err(Error::malformed(format!("up has {} components", v.len())));
    }
    Ok(Some(Vec3::new(v[0], v[1], v[2])))
}

/// `initial_pose` wins over the first entry of `poses`.
fn read_initial_pose(c: &Container) -> Result<Option<PoseMatrix>> {
    if let Some(v) = c.get("initial_pose") {
        return container::value_pose("initial_pose", v).map(Some);
    }
    match c.get("poses") {
        None => Ok(None),
        Some(poses) => match poses.as_array().and_then(|p| p.first()) {
            Some(first) => container::value_pose("poses", first).map(Some),
            None => Err(Error::malformed("poses must be a non-empty array")),
        },
    }
}
