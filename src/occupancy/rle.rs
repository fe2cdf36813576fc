//! Run-length coded occupancy masks.
//!
//! Runs alternate empty/occupied and always start with an empty run, which
//! may be zero-length. Cells are visited in `z * G^2 + y * G + x` order.

use half::f16;

use crate::field::checked_extent;
use crate::util::{Error, Result};

/// Expand one mip's runs into `G^3` cells holding `0` or `occupied`.
pub fn decode_rle(runs: &[usize], grid_res: usize, occupied: f16) -> Result<Vec<f16>> {
    let cells = checked_extent("occupancy grid", &[grid_res; 3])?;
    let total = runs
        .iter()
        .try_fold(0usize, |acc, &n| acc.checked_add(n))
        .ok_or_else(|| Error::malformed("run lengths overflow"))?;
    if total != cells {
        return Err(Error::malformed(format!(
            "run lengths sum to {total}, grid of {grid_res}^3 has {cells} cells"
        )));
    }

    let mut out = Vec::with_capacity(cells);
    for (i, &n) in runs.iter().enumerate() {
        let value = if i % 2 == 0 { f16::ZERO } else { occupied };
        out.extend(std::iter::repeat(value).take(n));
    }
    Ok(out)
}

/// Inverse of [`decode_rle`] for a boolean mask.
pub fn encode_rle<I: IntoIterator<Item = bool>>(mask: I) -> Vec<usize> {
    let mut runs = vec![0usize];
    let mut current = false;
    for occupied in mask {
        if occupied != current {
            runs.push(0);
            current = occupied;
        }
        if let Some(last) = runs.last_mut() {
            *last += 1;
        }
    }
    runs
}
