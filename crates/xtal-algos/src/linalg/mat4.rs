//! 4×4 and 3×3 row-major matrix utilities
//!
//! Affine helpers for fractional/Cartesian conversion and symmetry matrices.
//! All matrices are stored row-major: `m[row * n + col]`.

use lin_alg::f64::{Mat4, Vec3};

/// Determinants below this magnitude are treated as singular
pub const SINGULAR_EPS: f64 = 1e-12;

/// 3×3 identity (row-major)
pub const IDENTITY_3X3: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Expand a 3×3 row-major matrix into a 4×4 homogeneous Mat4 (row-major data)
///
/// Top-left 3×3 from src, column 3 = 0, row 3 = [0,0,0,1].
pub fn mat3x3_to_mat4(m: &[f64; 9]) -> Mat4 {
    affine_mat4(m, Vec3::new(0.0, 0.0, 0.0))
}

/// Build a 4×4 affine matrix from a 3×3 linear part and a translation column
pub fn affine_mat4(m: &[f64; 9], t: Vec3) -> Mat4 {
    Mat4 {
        data: [
            m[0], m[1], m[2], t.x, // row 0
            m[3], m[4], m[5], t.y, // row 1
            m[6], m[7], m[8], t.z, // row 2
            0.0, 0.0, 0.0, 1.0, // row 3
        ],
    }
}

/// Linear (top-left 3×3) part of a row-major 4×4 matrix
pub fn mat4_linear(m: &Mat4) -> [f64; 9] {
    let d = &m.data;
    [d[0], d[1], d[2], d[4], d[5], d[6], d[8], d[9], d[10]]
}

/// Translation column of a row-major 4×4 matrix
pub fn mat4_translation(m: &Mat4) -> Vec3 {
    Vec3::new(m.data[3], m.data[7], m.data[11])
}

/// Left-multiply: result = left * right (row-major 4×4)
pub fn left_multiply_mat4(left: &Mat4, right: &Mat4) -> Mat4 {
    let l = &left.data;
    let r = &right.data;
    let mut out = [0.0f64; 16];
    for row in 0..4 {
        for col in 0..4 {
            out[row * 4 + col] = l[row * 4] * r[col]
                + l[row * 4 + 1] * r[4 + col]
                + l[row * 4 + 2] * r[8 + col]
                + l[row * 4 + 3] * r[12 + col];
        }
    }
    Mat4 { data: out }
}

/// Transform a Vec3 by a 4×4 row-major matrix (homogeneous, w=1)
pub fn transform_mat4(m: &Mat4, v: Vec3) -> Vec3 {
    Vec3::new(
        m.data[0] * v.x + m.data[1] * v.y + m.data[2] * v.z + m.data[3],
        m.data[4] * v.x + m.data[5] * v.y + m.data[6] * v.z + m.data[7],
        m.data[8] * v.x + m.data[9] * v.y + m.data[10] * v.z + m.data[11],
    )
}

/// Apply only the linear part of a 4×4 row-major matrix (w=0)
pub fn rotate_mat4(m: &Mat4, v: Vec3) -> Vec3 {
    Vec3::new(
        m.data[0] * v.x + m.data[1] * v.y + m.data[2] * v.z,
        m.data[4] * v.x + m.data[5] * v.y + m.data[6] * v.z,
        m.data[8] * v.x + m.data[9] * v.y + m.data[10] * v.z,
    )
}

/// Check if a 4×4 row-major matrix is approximately identity
pub fn is_identity_mat4(m: &Mat4) -> bool {
    let id = Mat4::new_identity();
    m.data
        .iter()
        .zip(id.data.iter())
        .all(|(a, b)| (a - b).abs() < 1e-4)
}

/// Invert an affine 4×4 matrix (last row `[0,0,0,1]`)
///
/// Returns `None` when the linear part is singular.
pub fn invert_affine_mat4(m: &Mat4) -> Option<Mat4> {
    let inv = try_invert_3x3(&mat4_linear(m))?;
    let t = transform_3x3(&inv, mat4_translation(m));
    Some(affine_mat4(&inv, Vec3::new(-t.x, -t.y, -t.z)))
}

/// Transform a Vec3 by a 3×3 row-major matrix
pub fn transform_3x3(m: &[f64; 9], v: Vec3) -> Vec3 {
    Vec3::new(
        m[0] * v.x + m[1] * v.y + m[2] * v.z,
        m[3] * v.x + m[4] * v.y + m[5] * v.z,
        m[6] * v.x + m[7] * v.y + m[8] * v.z,
    )
}

/// Product of two 3×3 row-major matrices: `a * b`
pub fn multiply_3x3(a: &[f64; 9], b: &[f64; 9]) -> [f64; 9] {
    let mut out = [0.0f64; 9];
    for row in 0..3 {
        for col in 0..3 {
            out[row * 3 + col] =
                a[row * 3] * b[col] + a[row * 3 + 1] * b[3 + col] + a[row * 3 + 2] * b[6 + col];
        }
    }
    out
}

pub fn transpose_3x3(m: &[f64; 9]) -> [f64; 9] {
    [m[0], m[3], m[6], m[1], m[4], m[7], m[2], m[5], m[8]]
}

pub fn determinant_3x3(m: &[f64; 9]) -> f64 {
    m[0] * (m[4] * m[8] - m[5] * m[7]) - m[1] * (m[3] * m[8] - m[5] * m[6])
        + m[2] * (m[3] * m[7] - m[4] * m[6])
}

/// Invert a 3×3 row-major matrix using Cramer's rule
///
/// Returns `None` if the matrix is singular (determinant ≈ 0).
pub fn try_invert_3x3(m: &[f64; 9]) -> Option<[f64; 9]> {
    let [a, b, c, d, e, f, g, h, i] = *m;

    let det = determinant_3x3(m);
    if det.abs() < SINGULAR_EPS {
        return None;
    }

    let inv_det = 1.0 / det;

    Some([
        (e * i - f * h) * inv_det,
        (c * h - b * i) * inv_det,
        (b * f - c * e) * inv_det,
        (f * g - d * i) * inv_det,
        (a * i - c * g) * inv_det,
        (c * d - a * f) * inv_det,
        (d * h - e * g) * inv_det,
        (b * g - a * h) * inv_det,
        (a * e - b * d) * inv_det,
    ])
}

/// Invert a 3×3 row-major matrix, falling back to identity when singular
pub fn invert_3x3(m: &[f64; 9]) -> [f64; 9] {
    try_invert_3x3(m).unwrap_or(IDENTITY_3X3)
}
