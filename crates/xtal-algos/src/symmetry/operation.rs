//! A single affine symmetry operation
//!
//! Lattice-periodic operations keep their rotation as an exact rational
//! matrix and their translation in twelfths. Operations injected as raw
//! Cartesian matrices (biological assemblies, NCS) are kept as general
//! floating-point 4×4 matrices and are never wrapped into a unit cell.

use std::fmt;

use lin_alg::f64::{Mat4, Vec3};
use num_rational::Rational32;
use num_traits::Zero;

use super::error::{NotationError, SymResult, SymmetryError};
use super::notation::{format_notation, parse_notation, NotationOptions};
use super::twelfths::Twelfths;
use super::unit_cell::UnitCell;
use crate::linalg::{
    affine_mat4, invert_affine_mat4, left_multiply_mat4, multiply_3x3, rotate_mat4,
    transform_3x3, transform_mat4, RationalMatrix,
};

/// Tolerance on a summed fractional coordinate before an offset is applied
const OFFSET_SLOP: f64 = 0.001;

#[derive(Debug, Clone, PartialEq)]
enum Affine {
    /// Exact crystallographic operation of dimension 3 + d
    Lattice {
        rotation: RationalMatrix,
        translation: Vec<Twelfths>,
    },
    /// General row-major 4×4 matrix
    General([f64; 16]),
}

/// Symmetry operation with its source and canonical notation
#[derive(Debug, Clone)]
pub struct SymmetryOperation {
    affine: Affine,
    source: String,
    canonical: String,
    modulation_dim: usize,
    finalized: bool,
    inverse: bool,
    /// d×3 row-major modulation matrix
    sigma: Option<Vec<f64>>,
    /// Spatial coupling `Rsvs[0..3][3..3+d] · sigma`, present when non-zero
    complex: Option<[f64; 9]>,
}

impl SymmetryOperation {
    /// The identity operation `x,y,z` (or `x1,...,xn` for superspace)
    pub fn identity(modulation_dim: usize) -> Self {
        let n = 3 + modulation_dim;
        Self::from_lattice(
            RationalMatrix::identity(n),
            vec![Twelfths::ZERO; n],
            None,
            false,
        )
    }

    /// Parse Jones-Faithful or matrix-literal notation with translation
    /// normalization enabled
    pub fn parse(notation: &str, modulation_dim: usize) -> SymResult<Self> {
        Self::parse_with(
            notation,
            NotationOptions {
                modulation_dim,
                ..NotationOptions::default()
            },
        )
    }

    /// Parse with explicit notation options
    pub fn parse_with(notation: &str, opts: NotationOptions) -> SymResult<Self> {
        let parsed =
            parse_notation(notation, opts).map_err(|e| SymmetryError::notation(notation, e))?;
        let (rotation, translation) = if parsed.inverse {
            invert_lattice(&parsed.rotation, &parsed.translation, opts.normalize)
                .ok_or_else(|| SymmetryError::notation(notation, NotationError::Singular))?
        } else {
            (parsed.rotation, parsed.translation)
        };
        Ok(Self::from_lattice(
            rotation,
            translation,
            Some(notation.trim().to_string()),
            parsed.inverse,
        ))
    }

    /// Build from an exact rotation and translation
    pub fn from_parts(rotation: RationalMatrix, translation: Vec<Twelfths>) -> SymResult<Self> {
        if translation.len() != rotation.dim() || rotation.dim() < 3 {
            return Err(SymmetryError::DimensionMismatch {
                expected: rotation.dim(),
                found: translation.len(),
            });
        }
        Ok(Self::from_lattice(rotation, translation, None, false))
    }

    /// Wrap a general row-major 4×4 matrix; the result is never unit-cell wrapped
    pub fn from_matrix(matrix: [f64; 16]) -> Self {
        let canonical = format_general(&matrix);
        Self {
            affine: Affine::General(matrix),
            source: canonical.clone(),
            canonical,
            modulation_dim: 0,
            finalized: true,
            inverse: false,
            sigma: None,
            complex: None,
        }
    }

    fn from_lattice(
        rotation: RationalMatrix,
        translation: Vec<Twelfths>,
        source: Option<String>,
        inverse: bool,
    ) -> Self {
        let canonical = format_notation(&rotation, &translation);
        let modulation_dim = rotation.dim() - 3;
        Self {
            affine: Affine::Lattice {
                rotation,
                translation,
            },
            source: source.unwrap_or_else(|| canonical.clone()),
            canonical,
            modulation_dim,
            finalized: false,
            inverse,
            sigma: None,
            complex: None,
        }
    }

    /// Notation text as supplied by the caller
    pub fn source_notation(&self) -> &str {
        &self.source
    }

    /// Notation regenerated from the matrix
    pub fn to_canonical_string(&self) -> String {
        self.canonical.clone()
    }

    /// Canonical notation for ordinary groups when `normalized`, otherwise
    /// the caller's original text
    pub fn notation(&self, normalized: bool) -> &str {
        if normalized && self.modulation_dim == 0 {
            &self.canonical
        } else {
            &self.source
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        3 + self.modulation_dim
    }

    #[inline]
    pub fn modulation_dim(&self) -> usize {
        self.modulation_dim
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    #[inline]
    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    /// Injected as a general matrix rather than parsed lattice notation
    #[inline]
    pub fn is_bio(&self) -> bool {
        matches!(self.affine, Affine::General(_))
    }

    pub fn is_identity(&self) -> bool {
        match &self.affine {
            Affine::Lattice {
                rotation,
                translation,
            } => rotation.is_identity() && translation.iter().all(|t| t.is_zero()),
            Affine::General(m) => crate::linalg::is_identity_mat4(&Mat4 { data: *m }),
        }
    }

    /// Exact rotation, for lattice operations
    pub fn rotation(&self) -> Option<&RationalMatrix> {
        match &self.affine {
            Affine::Lattice { rotation, .. } => Some(rotation),
            Affine::General(_) => None,
        }
    }

    /// Exact translation in twelfths, for lattice operations
    pub fn translation(&self) -> Option<&[Twelfths]> {
        match &self.affine {
            Affine::Lattice { translation, .. } => Some(translation),
            Affine::General(_) => None,
        }
    }

    /// Spatial 3×3 linear part (row-major)
    pub fn linear_3x3(&self) -> [f64; 9] {
        match &self.affine {
            Affine::Lattice { rotation, .. } => rotation.spatial_3x3(),
            Affine::General(m) => crate::linalg::mat4_linear(&Mat4 { data: *m }),
        }
    }

    /// Spatial translation as a vector
    pub fn translation_3(&self) -> Vec3 {
        match &self.affine {
            Affine::Lattice { translation, .. } => Vec3::new(
                translation[0].to_f64(),
                translation[1].to_f64(),
                translation[2].to_f64(),
            ),
            Affine::General(m) => Vec3::new(m[3], m[7], m[11]),
        }
    }

    /// Spatial part as a row-major 4×4 affine matrix
    pub fn to_mat4(&self) -> Mat4 {
        match &self.affine {
            Affine::Lattice { .. } => affine_mat4(&self.linear_3x3(), self.translation_3()),
            Affine::General(m) => Mat4 { data: *m },
        }
    }

    /// Attach the d×3 modulation matrix coupling spatial and superspace axes
    pub fn set_sigma(&mut self, sigma: &[f64]) -> SymResult<()> {
        let d = self.modulation_dim;
        if sigma.len() != d * 3 {
            return Err(SymmetryError::SigmaSize {
                expected: d * 3,
                found: sigma.len(),
            });
        }
        self.complex = None;
        if let Affine::Lattice { rotation, .. } = &self.affine {
            let mut w = [0.0f64; 9];
            let mut coupled = false;
            for row in 0..3 {
                for col in 0..3 {
                    let mut acc = 0.0;
                    for k in 0..d {
                        let r = rotation.get(row, 3 + k);
                        if !r.is_zero() {
                            coupled = true;
                            acc += crate::linalg::rational::to_f64(r) * sigma[k * 3 + col];
                        }
                    }
                    w[row * 3 + col] = acc;
                }
            }
            if coupled {
                self.complex = Some(w);
            }
        }
        self.sigma = Some(sigma.to_vec());
        Ok(())
    }

    pub fn sigma(&self) -> Option<&[f64]> {
        self.sigma.as_deref()
    }

    /// Apply to a fractional point: `R·p + t + offset`.
    ///
    /// For superspace operations with a coupled modulation matrix the
    /// spatial rows also pick up `(Rsvs · sigma)·p` in the same pass.
    pub fn apply(&self, point: Vec3, offset: Vec3) -> Vec3 {
        let mut p = transform_mat4(&self.to_mat4(), point);
        if let Some(w) = &self.complex {
            p = p + transform_3x3(w, point);
        }
        p + offset
    }

    /// Apply only the linear part (vectors, tensor axes)
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        rotate_mat4(&self.to_mat4(), v)
    }

    /// Apply the full (3+d)-dimensional affine to a superspace point
    pub fn apply_superspace(&self, point: &[f64]) -> Vec<f64> {
        match &self.affine {
            Affine::Lattice {
                rotation,
                translation,
            } => rotation
                .mul_vec_f64(point)
                .into_iter()
                .zip(translation)
                .map(|(v, t)| v + t.to_f64())
                .collect(),
            Affine::General(_) => {
                let p = self.apply(
                    Vec3::new(point[0], point[1], point[2]),
                    Vec3::new(0.0, 0.0, 0.0),
                );
                vec![p.x, p.y, p.z]
            }
        }
    }

    /// Shift the translation by whole cells so that the centroid of the
    /// transformed points lies in `[0, 1)` on every axis.
    ///
    /// Repeated calls with the same points leave the translation unchanged.
    pub fn finalize(&mut self, points: &[Vec3]) {
        let count = points.len() as f64;
        let mut shifts = [0i32; 3];
        if !points.is_empty() && !self.is_bio() {
            let zero = Vec3::new(0.0, 0.0, 0.0);
            let mut sum = [0.0f64; 3];
            for p in points {
                let q = self.apply(*p, zero);
                sum[0] += q.x;
                sum[1] += q.y;
                sum[2] += q.z;
            }
            for (axis, s) in sum.iter_mut().enumerate() {
                while *s < -OFFSET_SLOP || *s >= count + OFFSET_SLOP {
                    if *s < 0.0 {
                        shifts[axis] += 1;
                        *s += count;
                    } else {
                        shifts[axis] -= 1;
                        *s -= count;
                    }
                }
            }
        }
        if let Affine::Lattice { rotation, translation } = &mut self.affine {
            if shifts != [0, 0, 0] {
                log::debug!("Offsetting {} by {:?} cells", self.canonical, shifts);
                for (t, shift) in translation.iter_mut().zip(shifts) {
                    *t = t.shifted(shift);
                }
                self.canonical = format_notation(rotation, translation);
            }
        }
        self.finalized = true;
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    ///
    /// Returns `None` for operations of different kinds or dimensions.
    pub fn compose(&self, other: &Self) -> Option<Self> {
        match (&self.affine, &other.affine) {
            (
                Affine::Lattice {
                    rotation: ra,
                    translation: ta,
                },
                Affine::Lattice {
                    rotation: rb,
                    translation: tb,
                },
            ) if ra.dim() == rb.dim() => {
                let rotation = ra.mul(rb);
                let tb_exact: Vec<Rational32> = tb.iter().map(|t| t.to_rational()).collect();
                let translation = ra
                    .mul_vec(&tb_exact)
                    .into_iter()
                    .zip(ta)
                    .map(|(v, t)| Twelfths::from_rational(v) + *t)
                    .collect();
                let mut op = Self::from_lattice(rotation, translation, None, false);
                if let Some(sigma) = &self.sigma {
                    op.set_sigma(sigma).ok()?;
                }
                Some(op)
            }
            (Affine::General(a), Affine::General(b)) => {
                let m = left_multiply_mat4(&Mat4 { data: *a }, &Mat4 { data: *b });
                Some(Self::from_matrix(m.data))
            }
            _ => None,
        }
    }

    /// Exact inverse operation
    pub fn inverse_operation(&self) -> SymResult<Self> {
        match &self.affine {
            Affine::Lattice {
                rotation,
                translation,
            } => {
                let (r, t) = invert_lattice(rotation, translation, false).ok_or_else(|| {
                    SymmetryError::notation(self.canonical.clone(), NotationError::Singular)
                })?;
                Ok(Self::from_lattice(r, t, None, !self.inverse))
            }
            Affine::General(m) => invert_affine_mat4(&Mat4 { data: *m })
                .map(|inv| Self::from_matrix(inv.data))
                .ok_or_else(|| {
                    SymmetryError::notation(self.canonical.clone(), NotationError::Singular)
                }),
        }
    }

    /// Same rotation, with translations equal modulo whole lattice vectors
    pub fn is_equivalent_mod_lattice(&self, other: &Self) -> bool {
        match (&self.affine, &other.affine) {
            (
                Affine::Lattice {
                    rotation: ra,
                    translation: ta,
                },
                Affine::Lattice {
                    rotation: rb,
                    translation: tb,
                },
            ) => ra == rb && ta.iter().zip(tb).all(|(a, b)| a.eq_mod_lattice(*b)),
            (Affine::General(a), Affine::General(b)) => {
                a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-4)
            }
            _ => false,
        }
    }

    /// Linear part expressed in Cartesian space: `F2C · R · C2F`
    pub fn cartesian_linear(&self, cell: &UnitCell) -> [f64; 9] {
        if self.is_bio() {
            return self.linear_3x3();
        }
        multiply_3x3(
            cell.frac_to_cart(),
            &multiply_3x3(&self.linear_3x3(), cell.cart_to_frac()),
        )
    }

    /// Rotate Cartesian vectors by the linear part, ignoring any offset
    pub fn rotate_axes(&self, vectors: &[Vec3], cell: &UnitCell) -> Vec<Vec3> {
        vectors
            .iter()
            .map(|v| {
                let f = cell.to_fractional(*v, true);
                cell.to_cartesian(self.rotate(f), true)
            })
            .collect()
    }

    /// Seitz-style dump with translations in twelfths, for diagnostics
    pub fn to_seitz_string(&self) -> String {
        match &self.affine {
            Affine::Lattice {
                rotation,
                translation,
            } => {
                let mut out = String::new();
                for (row, t) in translation.iter().enumerate() {
                    out.push('{');
                    for c in rotation.row(row) {
                        out.push('\t');
                        out.push_str(&c.to_string());
                    }
                    out.push('\t');
                    out.push_str(&t.to_string());
                    out.push_str("\t}\n");
                }
                out.push('{');
                for _ in 0..rotation.dim() {
                    out.push_str("\t0");
                }
                out.push_str("\t1\t}\n");
                out
            }
            Affine::General(m) => {
                let mut out = String::new();
                for row in m.chunks(4) {
                    out.push('{');
                    for v in row {
                        out.push('\t');
                        out.push_str(&v.to_string());
                    }
                    out.push_str("\t}\n");
                }
                out
            }
        }
    }
}

/// Matrix equality; notation text and finalization state are ignored
impl PartialEq for SymmetryOperation {
    fn eq(&self, other: &Self) -> bool {
        self.affine == other.affine
    }
}

impl fmt::Display for SymmetryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

fn invert_lattice(
    rotation: &RationalMatrix,
    translation: &[Twelfths],
    normalize: bool,
) -> Option<(RationalMatrix, Vec<Twelfths>)> {
    let inv = rotation.inverse()?;
    let t: Vec<Rational32> = translation.iter().map(|t| -t.to_rational()).collect();
    let translation = inv
        .mul_vec(&t)
        .into_iter()
        .map(|v| {
            let t = Twelfths::from_rational(v);
            if normalize {
                t.normalized()
            } else {
                t
            }
        })
        .collect();
    Some((inv, translation))
}

fn format_general(m: &[f64; 16]) -> String {
    let rows: Vec<String> = m
        .chunks(4)
        .map(|row| {
            let cells: Vec<String> = row.iter().map(|v| format!("{v}")).collect();
            format!("[{}]", cells.join(","))
        })
        .collect();
    format!("[{}]", rows.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(s: &str) -> SymmetryOperation {
        SymmetryOperation::parse(s, 0).unwrap()
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).magnitude() < 1e-9
    }

    #[test]
    fn test_apply_screw() {
        let screw = op("-x,-y,z+1/2");
        let p = screw.apply(Vec3::new(0.1, 0.1, 0.0), Vec3::new(0.0, 0.0, 0.0));
        assert!(close(p, Vec3::new(-0.1, -0.1, 0.5)));
        let shifted = screw.apply(Vec3::new(0.1, 0.1, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(close(shifted, Vec3::new(0.9, -0.1, 0.5)));
    }

    #[test]
    fn test_canonical_roundtrip() {
        for s in ["x,y,z", "-x,y+1/2,-z+1/2", "-y,x-y,z+2/3", "1/2+x, 1/2-y, z", "!y,-x,z+1/4"] {
            let a = op(s);
            let b = op(&a.to_canonical_string());
            assert_eq!(a, b, "roundtrip failed for {s}");
        }
    }

    #[test]
    fn test_inverse_prefix() {
        // inverse of a 4-fold screw
        let a = op("!-y,x,z+1/4");
        assert!(a.is_inverse());
        assert_eq!(a.to_canonical_string(), "y,-x,z-1/4");
        let back = a.compose(&op("-y,x,z+1/4")).unwrap();
        assert!(back.is_identity());
        assert_eq!(a.source_notation(), "!-y,x,z+1/4");
    }

    #[test]
    fn test_finalize_moves_centroid_into_cell() {
        let mut inv = op("-x,-y,-z");
        let atoms = [Vec3::new(0.2, 0.3, 0.4), Vec3::new(0.3, 0.2, 0.1)];
        inv.finalize(&atoms);
        assert!(inv.is_finalized());
        assert_eq!(
            inv.translation().unwrap(),
            &[Twelfths(12), Twelfths(12), Twelfths(12)]
        );
        assert_eq!(inv.to_canonical_string(), "-x+1,-y+1,-z+1");
    }

    #[test]
    fn test_finalize_idempotent() {
        let mut screw = op("-x,-y,z+1/2");
        let atoms = [Vec3::new(0.1, 0.1, 0.0)];
        screw.finalize(&atoms);
        let first = screw.translation().unwrap().to_vec();
        screw.finalize(&atoms);
        assert_eq!(screw.translation().unwrap(), first.as_slice());
        assert_eq!(first, vec![Twelfths(12), Twelfths(12), Twelfths(6)]);
    }

    #[test]
    fn test_compose_and_equivalence() {
        let c4 = op("-y,x,z");
        let c2 = c4.compose(&c4).unwrap();
        assert_eq!(c2, op("-x,-y,z"));
        let glide = op("x+1/2,-y,z");
        let twice = glide.compose(&glide).unwrap();
        assert!(!twice.is_identity());
        assert!(twice.is_equivalent_mod_lattice(&SymmetryOperation::identity(0)));
    }

    #[test]
    fn test_superspace_coupling() {
        let mut a = SymmetryOperation::parse("x1,x2,x3,x1+x4", 1).unwrap();
        assert_eq!(a.dim(), 4);
        let q = a.apply_superspace(&[0.1, 0.2, 0.3, 0.4]);
        assert!((q[3] - 0.5).abs() < 1e-12);
        a.set_sigma(&[0.0, 0.0, 0.5]).unwrap();
        // no spatial row references x4, so there is no coupling
        let p = a.apply(Vec3::new(0.1, 0.2, 0.3), Vec3::new(0.0, 0.0, 0.0));
        assert!(close(p, Vec3::new(0.1, 0.2, 0.3)));

        let mut b = SymmetryOperation::parse("x1,x2,x3+x4,x4", 1).unwrap();
        b.set_sigma(&[0.0, 0.0, 0.5]).unwrap();
        let p = b.apply(Vec3::new(0.1, 0.2, 0.2), Vec3::new(0.0, 0.0, 0.0));
        assert!(close(p, Vec3::new(0.1, 0.2, 0.3)));
        assert!(b.set_sigma(&[0.0]).is_err());
    }

    #[test]
    fn test_general_matrix() {
        let mut m = Mat4::new_identity().data;
        m[3] = 10.0;
        let bio = SymmetryOperation::from_matrix(m);
        assert!(bio.is_bio());
        let p = bio.apply(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, 0.0));
        assert!(close(p, Vec3::new(11.0, 2.0, 3.0)));
        let inv = bio.inverse_operation().unwrap();
        assert!(bio.compose(&inv).unwrap().is_identity());
    }

    #[test]
    fn test_parse_error_carries_notation() {
        let err = SymmetryOperation::parse("x,y,q", 0).unwrap_err();
        assert!(err.to_string().contains("x,y,q"));
    }
}
