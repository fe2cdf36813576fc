//! Real spherical harmonics up to degree 3.
//!
//! The 16 terms are packed into four `Vec4` groups in the order the color
//! head's view blocks expect.

use glam::{Vec3, Vec4};

const ITSPI: f32 = 1.0 / (2.0 * 1.772_453_9);
const S2: f32 = std::f32::consts::SQRT_2;
const S3: f32 = 1.732_050_8;
const S5: f32 = 2.236_068;
const S7: f32 = 2.645_751_3;
const S15: f32 = S3 * S5;
const S42: f32 = S2 * S3 * S7;
const S70: f32 = S2 * S5 * S7;
const S105: f32 = S15 * S7;

/// Evaluate the basis for a unit direction.
pub fn sh_basis(dir: Vec3) -> [Vec4; 4] {
    let Vec3 { x, y, z } = dir;
    let (xx, yy, zz) = (x * x, y * y, z * z);
    let (xy, yz, zx) = (x * y, y * z, z * x);

    let d0 = Vec4::new(1.0, -S3, S3, -S3) * ITSPI;
    let d1 = Vec4::new(S15, -S15, S5 / 2.0, -S15) * ITSPI;
    let d2 = Vec4::new(S15 / 2.0, S70 / 4.0, S105, S42 / 4.0) * ITSPI;
    let d3 = Vec4::new(S7 / 2.0, S42 / 4.0, S105 / 2.0, S70 / 4.0) * ITSPI;

    [
        d0 * Vec4::new(1.0, y, z, x),
        d1 * Vec4::new(xy, yz, 3.0 * zz - 1.0, zx),
        d2 * Vec4::new(xx - yy, y * (-3.0 * xx + yy), xy * z, y * (1.0 - 5.0 * zz)),
        d3 * Vec4::new(
            z * (5.0 * zz - 3.0),
            x * (1.0 - 5.0 * zz),
            z * (xx - yy),
            x * (-xx + 3.0 * yy),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_term() {
        for dir in [Vec3::X, Vec3::Y, Vec3::NEG_Z, Vec3::new(1.0, 2.0, 3.0).normalize()] {
            let sh = sh_basis(dir);
            assert!((sh[0].x - 0.282_094_8).abs() < 1e-6);
        }
    }

    #[test]
    fn test_degree_one_axes() {
        let sh = sh_basis(Vec3::Z);
        // -S3*y, S3*z, -S3*x scaled by ITSPI
        assert_eq!(sh[0].y, 0.0);
        assert!((sh[0].z - S3 * ITSPI).abs() < 1e-6);
        assert_eq!(sh[0].w, 0.0);
        // 3z^2 - 1 = 2 at the pole
        assert!((sh[1].z - S5 * ITSPI).abs() < 1e-6);
    }

    #[test]
    fn test_odd_terms_flip_sign() {
        let d = Vec3::new(0.3, -0.5, 0.8).normalize();
        let a = sh_basis(d);
        let b = sh_basis(-d);
        assert!((a[0].y + b[0].y).abs() < 1e-6);
        assert!((a[1].x - b[1].x).abs() < 1e-6);
        assert!((a[3].x + b[3].x).abs() < 1e-6);
    }
}
