//! Dense square matrices over small exact rationals
//!
//! Rotation parts of symmetry operations are kept exact so that composition
//! and equality never depend on floating-point tolerance. Superspace groups
//! need sizes beyond 3×3, so the dimension is dynamic.

use num_rational::Rational32;
use num_traits::{One, Signed, Zero};

/// Row-major `n × n` matrix of `Rational32`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RationalMatrix {
    n: usize,
    data: Vec<Rational32>,
}

impl RationalMatrix {
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![Rational32::zero(); n * n],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n);
        for i in 0..n {
            m.data[i * n + i] = Rational32::one();
        }
        m
    }

    /// Build from row-major values; `None` if the length is not `n²`
    pub fn from_rows(n: usize, data: Vec<Rational32>) -> Option<Self> {
        (data.len() == n * n).then_some(Self { n, data })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Rational32 {
        self.data[row * self.n + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: Rational32) {
        self.data[row * self.n + col] = value;
    }

    pub fn row(&self, row: usize) -> &[Rational32] {
        &self.data[row * self.n..(row + 1) * self.n]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity(self.n)
    }

    /// Matrix product `self * other`
    pub fn mul(&self, other: &Self) -> Self {
        debug_assert_eq!(self.n, other.n);
        let n = self.n;
        let mut out = Self::zeros(n);
        for row in 0..n {
            for col in 0..n {
                let mut acc = Rational32::zero();
                for k in 0..n {
                    acc += self.get(row, k) * other.get(k, col);
                }
                out.set(row, col, acc);
            }
        }
        out
    }

    /// Matrix-vector product
    pub fn mul_vec(&self, v: &[Rational32]) -> Vec<Rational32> {
        (0..self.n)
            .map(|row| {
                self.row(row)
                    .iter()
                    .zip(v)
                    .fold(Rational32::zero(), |acc, (a, b)| acc + *a * *b)
            })
            .collect()
    }

    /// Matrix-vector product against floating-point input
    pub fn mul_vec_f64(&self, v: &[f64]) -> Vec<f64> {
        (0..self.n)
            .map(|row| {
                self.row(row)
                    .iter()
                    .zip(v)
                    .map(|(a, b)| to_f64(*a) * b)
                    .sum()
            })
            .collect()
    }

    pub fn negated(&self) -> Self {
        Self {
            n: self.n,
            data: self.data.iter().map(|v| -*v).collect(),
        }
    }

    /// Exact inverse by Gauss-Jordan elimination; `None` if singular
    pub fn inverse(&self) -> Option<Self> {
        let n = self.n;
        let mut a = self.clone();
        let mut inv = Self::identity(n);
        for col in 0..n {
            let pivot = (col..n).find(|&r| !a.get(r, col).is_zero())?;
            if pivot != col {
                for k in 0..n {
                    a.data.swap(pivot * n + k, col * n + k);
                    inv.data.swap(pivot * n + k, col * n + k);
                }
            }
            let p = a.get(col, col);
            for k in 0..n {
                a.set(col, k, a.get(col, k) / p);
                inv.set(col, k, inv.get(col, k) / p);
            }
            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = a.get(r, col);
                if factor.is_zero() {
                    continue;
                }
                for k in 0..n {
                    a.set(r, k, a.get(r, k) - factor * a.get(col, k));
                    inv.set(r, k, inv.get(r, k) - factor * inv.get(col, k));
                }
            }
        }
        Some(inv)
    }

    /// Top-left 3×3 block as floats (row-major)
    pub fn spatial_3x3(&self) -> [f64; 9] {
        let mut out = [0.0; 9];
        for row in 0..3.min(self.n) {
            for col in 0..3.min(self.n) {
                out[row * 3 + col] = to_f64(self.get(row, col));
            }
        }
        out
    }

    /// Largest absolute entry
    pub fn max_abs(&self) -> Rational32 {
        self.data
            .iter()
            .map(|v| v.abs())
            .fold(Rational32::zero(), |a, b| if b > a { b } else { a })
    }
}

#[inline]
pub fn to_f64(r: Rational32) -> f64 {
    *r.numer() as f64 / *r.denom() as f64
}
