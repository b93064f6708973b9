//! Crystallographic unit cell math
//!
//! Provides conversion between Cartesian (real-space) and fractional coordinates
//! using unit cell parameters, in the convention with `a` along x and `b` in the
//! xy-plane. An origin offset can be attached; "absolute" conversions ignore it.

use lin_alg::f64::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use super::tensor::{DisplacementParameters, SymmetricTensor, TWO_PI_SQUARED};
use crate::linalg::{
    affine_mat4, determinant_3x3, invert_3x3, multiply_3x3, transform_3x3, transpose_3x3,
    IDENTITY_3X3,
};

/// Fractional values this close to 0 or 1 are snapped to 0 by [`UnitCell::unitize`]
pub const UNITIZE_SNAP: f64 = 1e-4;

/// Number of periodic axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellDimension {
    /// Isolated molecule
    Point,
    /// Periodic along a only
    Polymer,
    /// Periodic along a and b
    Slab,
    /// Periodic along a, b and c
    #[default]
    Bulk,
}

impl CellDimension {
    #[inline]
    pub fn periodic_axes(self) -> usize {
        match self {
            CellDimension::Point => 0,
            CellDimension::Polymer => 1,
            CellDimension::Slab => 2,
            CellDimension::Bulk => 3,
        }
    }
}

/// Crystallographic unit cell with precomputed transformation matrices
#[derive(Debug, Clone)]
pub struct UnitCell {
    /// Cell edge lengths (a, b, c) in Angstroms
    lengths: [f64; 3],
    /// Cell angles (alpha, beta, gamma) in degrees
    angles: [f64; 3],
    dimension: CellDimension,
    /// 3x3 fractional-to-Cartesian matrix (row-major), no offset
    frac_to_cart: [f64; 9],
    /// 3x3 Cartesian-to-fractional matrix (row-major), no offset
    cart_to_frac: [f64; 9],
    fractional_offset: Vec3,
    cartesian_offset: Vec3,
    multiplier: Option<Vec3>,
    volume: f64,
    reciprocal_lengths: [f64; 3],
    vertices: [Vec3; 8],
}

impl UnitCell {
    /// Create a new unit cell from `[a, b, c]` and `[alpha, beta, gamma]`
    pub fn new(lengths: [f64; 3], angles: [f64; 3]) -> Self {
        Self::from_matrix(lengths, angles, compute_frac_to_real(&lengths, &angles))
    }

    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self::new([a, b, c], [alpha, beta, gamma])
    }

    /// Cubic cell of edge `a`
    pub fn cubic(a: f64) -> Self {
        Self::new([a, a, a], [90.0, 90.0, 90.0])
    }

    /// Cell spanned by three Cartesian edge vectors starting at `origin`
    ///
    /// The edge vectors become the columns of the fractional-to-Cartesian
    /// matrix unchanged, so the cell keeps its given orientation.
    pub fn from_points(origin: Vec3, va: Vec3, vb: Vec3, vc: Vec3) -> Self {
        let lengths = [va.magnitude(), vb.magnitude(), vc.magnitude()];
        let angle = |u: Vec3, v: Vec3| {
            let denom = u.magnitude() * v.magnitude();
            if denom == 0.0 {
                90.0
            } else {
                (u.dot(v) / denom).clamp(-1.0, 1.0).acos().to_degrees()
            }
        };
        let angles = [angle(vb, vc), angle(va, vc), angle(va, vb)];
        let m = [va.x, vb.x, vc.x, va.y, vb.y, vc.y, va.z, vb.z, vc.z];
        let mut cell = Self::from_matrix(lengths, angles, m);
        cell.set_cartesian_offset(origin);
        cell
    }

    fn from_matrix(lengths: [f64; 3], angles: [f64; 3], frac_to_cart: [f64; 9]) -> Self {
        let mut cell = UnitCell {
            lengths,
            angles,
            dimension: CellDimension::Bulk,
            frac_to_cart,
            cart_to_frac: invert_3x3(&frac_to_cart),
            fractional_offset: Vec3::new(0.0, 0.0, 0.0),
            cartesian_offset: Vec3::new(0.0, 0.0, 0.0),
            multiplier: None,
            volume: 0.0,
            reciprocal_lengths: [0.0; 3],
            vertices: [Vec3::new(0.0, 0.0, 0.0); 8],
        };
        cell.update_derived();
        cell
    }

    fn update_derived(&mut self) {
        self.volume = determinant_3x3(&self.frac_to_cart).abs();
        // reciprocal lengths are the row norms of the inverse matrix
        let r = &self.cart_to_frac;
        self.reciprocal_lengths = [
            (r[0] * r[0] + r[1] * r[1] + r[2] * r[2]).sqrt(),
            (r[3] * r[3] + r[4] * r[4] + r[5] * r[5]).sqrt(),
            (r[6] * r[6] + r[7] * r[7] + r[8] * r[8]).sqrt(),
        ];
        for (i, v) in self.vertices.iter_mut().enumerate() {
            let f = Vec3::new(
                ((i >> 2) & 1) as f64,
                ((i >> 1) & 1) as f64,
                (i & 1) as f64,
            );
            *v = transform_3x3(&self.frac_to_cart, f);
        }
    }

    /// Restrict periodicity to fewer than three axes
    pub fn with_dimension(mut self, dimension: CellDimension) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn lengths(&self) -> [f64; 3] {
        self.lengths
    }

    pub fn angles(&self) -> [f64; 3] {
        self.angles
    }

    pub fn dimension(&self) -> CellDimension {
        self.dimension
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// `[a*, b*, c*]`
    pub fn reciprocal_lengths(&self) -> [f64; 3] {
        self.reciprocal_lengths
    }

    /// Get the 3x3 fractional-to-Cartesian matrix (row-major)
    pub fn frac_to_cart(&self) -> &[f64; 9] {
        &self.frac_to_cart
    }

    /// Get the 3x3 Cartesian-to-fractional matrix (row-major)
    pub fn cart_to_frac(&self) -> &[f64; 9] {
        &self.cart_to_frac
    }

    /// Fractional-to-Cartesian as a 4x4 matrix including the origin offset
    pub fn frac_to_cart_4x4(&self) -> Mat4 {
        affine_mat4(&self.frac_to_cart, self.cartesian_offset)
    }

    /// Cartesian-to-fractional as a 4x4 matrix including the origin offset
    pub fn cart_to_frac_4x4(&self) -> Mat4 {
        let o = self.fractional_offset;
        affine_mat4(&self.cart_to_frac, Vec3::new(-o.x, -o.y, -o.z))
    }

    /// Cartesian point to fractional; `absolute` ignores the origin offset
    pub fn to_fractional(&self, p: Vec3, absolute: bool) -> Vec3 {
        let f = transform_3x3(&self.cart_to_frac, p);
        if absolute {
            f
        } else {
            f - self.fractional_offset
        }
    }

    /// Fractional point to Cartesian; `absolute` ignores the origin offset
    pub fn to_cartesian(&self, f: Vec3, absolute: bool) -> Vec3 {
        let p = transform_3x3(&self.frac_to_cart, f);
        if absolute {
            p
        } else {
            p + self.cartesian_offset
        }
    }

    /// Wrap the periodic components of a fractional point into `[0, 1)`
    pub fn unitize(&self, f: Vec3) -> Vec3 {
        let axes = self.dimension.periodic_axes();
        let mut out = [f.x, f.y, f.z];
        for v in out.iter_mut().take(axes) {
            *v = unitize_value(*v);
        }
        Vec3::new(out[0], out[1], out[2])
    }

    /// Move a Cartesian point into the cell.
    ///
    /// Without `offset` the cell's own origin offset is honoured. With an
    /// integer cell `offset` the point is wrapped in the absolute frame and
    /// then shifted into that cell.
    pub fn to_unit_cell(&self, p: Vec3, offset: Option<Vec3>) -> Vec3 {
        match offset {
            None => self.to_cartesian(self.unitize(self.to_fractional(p, false)), false),
            Some(cell) => {
                let f = self.unitize(self.to_fractional(p, true)) + cell;
                self.to_cartesian(f, true)
            }
        }
    }

    /// Place the origin at a fractional point
    pub fn set_offset(&mut self, fractional: Vec3) {
        self.fractional_offset = fractional;
        self.cartesian_offset = transform_3x3(&self.frac_to_cart, fractional);
    }

    /// Place the origin at a Cartesian point
    pub fn set_cartesian_offset(&mut self, origin: Vec3) {
        self.cartesian_offset = origin;
        self.fractional_offset = transform_3x3(&self.cart_to_frac, origin);
    }

    pub fn fractional_offset(&self) -> Vec3 {
        self.fractional_offset
    }

    pub fn cartesian_offset(&self) -> Vec3 {
        self.cartesian_offset
    }

    /// Display-only repeat factor
    pub fn set_multiplier(&mut self, multiplier: Option<Vec3>) {
        self.multiplier = multiplier;
    }

    pub fn multiplier(&self) -> Option<Vec3> {
        self.multiplier
    }

    /// Pre-rotate the Cartesian frame by `rotation` (row-major 3×3)
    pub fn set_orientation(&mut self, rotation: &[f64; 9]) {
        self.frac_to_cart = multiply_3x3(rotation, &self.frac_to_cart);
        self.cart_to_frac = invert_3x3(&self.frac_to_cart);
        self.cartesian_offset = transform_3x3(rotation, self.cartesian_offset);
        self.update_derived();
    }

    /// The eight cell corners in Cartesian space, without the origin offset
    pub fn vertices(&self) -> [Vec3; 8] {
        self.vertices
    }

    /// Cartesian edge vectors a, b, c
    pub fn unit_cell_vectors(&self) -> [Vec3; 3] {
        let m = &self.frac_to_cart;
        [
            Vec3::new(m[0], m[3], m[6]),
            Vec3::new(m[1], m[4], m[7]),
            Vec3::new(m[2], m[5], m[8]),
        ]
    }

    /// Whether a fractional point lies inside the box `(min - slop, max + slop)`
    /// along the cell's periodic axes
    pub fn is_within_cell(&self, f: Vec3, min: [i32; 3], max: [i32; 3], slop: f64) -> bool {
        let p = [f.x, f.y, f.z];
        (0..self.dimension.periodic_axes()).all(|i| {
            p[i] > min[i] as f64 - slop && p[i] < max[i] as f64 + slop
        })
    }

    /// Force non-periodic axes of a half-open cell range to the single cell 0
    pub fn clamp_cell_range(&self, min: &mut [i32; 3], max: &mut [i32; 3]) {
        for axis in self.dimension.periodic_axes()..3 {
            if min[axis] != 0 || max[axis] != 1 {
                log::debug!("Clamping non-periodic axis {axis} to a single cell");
            }
            min[axis] = 0;
            max[axis] = 1;
        }
    }

    /// Convert displacement parameters to a Cartesian `U` tensor.
    ///
    /// Returns `None` for ORTEP types without a defined conversion (6, 7, 11).
    pub fn tensor_from_displacement(&self, params: &DisplacementParameters) -> Option<SymmetricTensor> {
        let (values, ortep_type) = match *params {
            DisplacementParameters::Isotropic(u) => return Some(SymmetricTensor::isotropic(u)),
            DisplacementParameters::Anisotropic { values, ortep_type } => (values, ortep_type),
        };
        if ortep_type == 12 {
            return Some(SymmetricTensor::from_components(values));
        }

        // exponent = -D (b11 h² + ... + C b12 hk + ...)
        let c = if ortep_type % 2 == 0 { 2.0 } else { 1.0 };
        let d = match ortep_type {
            0 | 1 => 1.0,
            2 | 3 => std::f64::consts::LN_2,
            4 | 5 => 0.25,
            8 | 9 | 10 => TWO_PI_SQUARED,
            _ => return None,
        };
        let reciprocal = matches!(ortep_type, 4 | 5 | 8 | 9);
        let [ra, rb, rc] = if reciprocal {
            self.reciprocal_lengths
        } else {
            [1.0, 1.0, 1.0]
        };

        // β as a symmetric matrix in reciprocal-lattice coordinates
        let off = c / 2.0;
        let b11 = values[0] * d * ra * ra;
        let b22 = values[1] * d * rb * rb;
        let b33 = values[2] * d * rc * rc;
        let b12 = values[3] * d * ra * rb * off;
        let b13 = values[4] * d * ra * rc * off;
        let b23 = values[5] * d * rb * rc * off;
        let beta = [b11, b12, b13, b12, b22, b23, b13, b23, b33];

        // U_cart = A β Aᵀ / 2π²
        let a = &self.frac_to_cart;
        let mut u = multiply_3x3(a, &multiply_3x3(&beta, &transpose_3x3(a)));
        for v in u.iter_mut() {
            *v /= TWO_PI_SQUARED;
        }
        Some(SymmetricTensor { u, isotropic: false })
    }

    /// Same parameters, dimension and offset
    pub fn is_same_as(&self, other: &UnitCell) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() < 1e-6;
        self.dimension == other.dimension
            && self.lengths.iter().zip(other.lengths.iter()).all(|(a, b)| close(*a, *b))
            && self.angles.iter().zip(other.angles.iter()).all(|(a, b)| close(*a, *b))
            && (self.fractional_offset - other.fractional_offset).magnitude() < 1e-6
    }

    /// Decode a three-digit cell code (`555` is the origin cell) into cell
    /// indices. Maximum codes are inclusive, so they decode one cell higher.
    pub fn cell_code_to_cell(code: i32, is_max: bool) -> [i32; 3] {
        let c = if is_max { -4 } else { -5 };
        [(code % 1000) / 100 + c, (code % 100) / 10 + c, code % 10 + c]
    }

    /// Three-digit code of a cell translation (`555` for the origin cell)
    pub fn cell_to_code(cell: [i32; 3]) -> i32 {
        555 + cell[0] * 100 + cell[1] * 10 + cell[2]
    }
}

impl Default for UnitCell {
    fn default() -> Self {
        Self::from_matrix([1.0; 3], [90.0; 3], IDENTITY_3X3)
    }
}

/// Wrap a fractional value into `[0, 1)`, snapping values within
/// [`UNITIZE_SNAP`] of either boundary to 0
pub fn unitize_value(x: f64) -> f64 {
    let v = x - x.floor();
    if v > 1.0 - UNITIZE_SNAP || v < UNITIZE_SNAP {
        0.0
    } else {
        v
    }
}

/// Compute the frac-to-real 3x3 matrix from cell parameters
///
/// The matrix is row-major: `[row0_col0, row0_col1, row0_col2, row1_col0, ...]`
fn compute_frac_to_real(lengths: &[f64; 3], angles: &[f64; 3]) -> [f64; 9] {
    let [a, b, c] = *lengths;
    let [alpha_deg, beta_deg, gamma_deg] = *angles;

    // Handle degenerate case
    if a <= 0.0 || b <= 0.0 || c <= 0.0 || alpha_deg == 0.0 || beta_deg == 0.0 || gamma_deg == 0.0
    {
        return IDENTITY_3X3;
    }

    let alpha = alpha_deg.to_radians();
    let beta = beta_deg.to_radians();
    let gamma = gamma_deg.to_radians();

    let ca = alpha.cos();
    let cb = beta.cos();
    let cg = gamma.cos();
    let sb = beta.sin();
    let sg = gamma.sin();

    // cos(alpha*) = (cos(beta)*cos(gamma) - cos(alpha)) / (sin(beta)*sin(gamma))
    let cabgs = (cb * cg - ca) / (sb * sg);
    let sabgs = (1.0 - cabgs * cabgs).max(0.0).sqrt();

    [
        a,
        cg * b,
        cb * c,
        0.0,
        sg * b,
        -sb * cabgs * c,
        0.0,
        0.0,
        sb * sabgs * c,
    ]
}
