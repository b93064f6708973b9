//! Anisotropic displacement tensors
//!
//! Tensors are stored as symmetric Cartesian `U` matrices (Å²). Conversion
//! from the various ORTEP parameterizations happens in
//! [`UnitCell::tensor_from_displacement`](super::unit_cell::UnitCell::tensor_from_displacement).

use std::f64::consts::PI;

use crate::linalg::{multiply_3x3, transpose_3x3};

/// `2π²`, relating `B`/`β` coefficients to `U`
pub const TWO_PI_SQUARED: f64 = 2.0 * PI * PI;

/// Displacement parameters as read from a structure file
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplacementParameters {
    /// Isotropic `U_iso`
    Isotropic(f64),
    /// Six coefficients `[11, 22, 33, 12, 13, 23]` in ORTEP type `ortep_type`
    /// (0–5 and 8–10 reciprocal-space forms, 12 for Cartesian `U`)
    Anisotropic { values: [f64; 6], ortep_type: u8 },
}

/// Symmetric Cartesian displacement tensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetricTensor {
    /// Row-major 3×3 `U` matrix
    pub u: [f64; 9],
    pub isotropic: bool,
}

impl SymmetricTensor {
    pub fn isotropic(u_iso: f64) -> Self {
        Self {
            u: [u_iso, 0.0, 0.0, 0.0, u_iso, 0.0, 0.0, 0.0, u_iso],
            isotropic: true,
        }
    }

    /// Build from `[U11, U22, U33, U12, U13, U23]`
    pub fn from_components(c: [f64; 6]) -> Self {
        Self {
            u: [c[0], c[3], c[4], c[3], c[1], c[5], c[4], c[5], c[2]],
            isotropic: false,
        }
    }

    /// `[U11, U22, U33, U12, U13, U23]`
    pub fn components(&self) -> [f64; 6] {
        let u = &self.u;
        [u[0], u[4], u[8], u[1], u[2], u[5]]
    }

    /// Equivalent isotropic displacement, trace / 3
    pub fn u_equivalent(&self) -> f64 {
        (self.u[0] + self.u[4] + self.u[8]) / 3.0
    }

    /// `R U Rᵀ` for a Cartesian linear map `R`
    pub fn rotated(&self, r: &[f64; 9]) -> Self {
        if self.isotropic {
            return *self;
        }
        let mut u = multiply_3x3(r, &multiply_3x3(&self.u, &transpose_3x3(r)));
        // restore exact symmetry lost to round-off
        for (i, j) in [(0usize, 1usize), (0, 2), (1, 2)] {
            let avg = 0.5 * (u[i * 3 + j] + u[j * 3 + i]);
            u[i * 3 + j] = avg;
            u[j * 3 + i] = avg;
        }
        Self {
            u,
            isotropic: false,
        }
    }
}
