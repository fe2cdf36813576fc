//! Compact fixed-weight field network.
//!
//! ```text
//! p -> encoding (F*2 trilinear lookups) -> density layer (16 hidden) -> exp -> density
//!                                                        \-> color head (+ SH(view)) -> sigmoid -> rgb
//! ```
//!
//! All layers are grouped 4x4 blocks; see [`weights`] for the layout.

mod encoding;
mod evaluator;
mod sh;
pub mod weights;

pub use encoding::{encode, frequency_coords, Features};
pub use evaluator::{activate_density, FieldSample, NeuralFieldEvaluator, ViewConditioning, MAX_LOG_DENSITY};
pub use sh::sh_basis;
pub use weights::{ColorLayers, NeuralWeights};
