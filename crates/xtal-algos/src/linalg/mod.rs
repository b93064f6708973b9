//! Linear algebra utilities
//!
//! - [`mat4`] — 4×4 / 3×3 row-major matrix operations (multiply, transform, invert)
//! - [`quat`] — quaternions for frame-to-frame rotation analysis
//! - [`rational`] — exact rational square matrices for symmetry rotations

pub mod mat4;
pub mod quat;
pub mod rational;

pub use mat4::{
    affine_mat4, determinant_3x3, invert_3x3, invert_affine_mat4, is_identity_mat4,
    left_multiply_mat4, mat3x3_to_mat4, mat4_linear, mat4_translation, multiply_3x3,
    rotate_mat4, transform_3x3, transform_mat4, transpose_3x3, try_invert_3x3, IDENTITY_3X3,
};
pub use quat::Quat;
pub use rational::RationalMatrix;
