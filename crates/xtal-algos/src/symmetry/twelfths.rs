//! Exact translation components in units of 1/12
//!
//! Every crystallographic translation has a denominator dividing 12, so
//! translations are stored as integer twelfths and compared exactly.

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};

use num_rational::Rational32;
use serde::{Deserialize, Serialize};

/// A translation component of `n / 12`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Twelfths(pub i32);

impl Twelfths {
    pub const ZERO: Twelfths = Twelfths(0);
    /// One whole lattice period
    pub const ONE: Twelfths = Twelfths(12);

    /// Round a fractional value to the nearest twelfth
    pub fn from_f64(value: f64) -> Self {
        Twelfths((value * 12.0).round() as i32)
    }

    /// Round an exact rational to the nearest twelfth
    pub fn from_rational(value: Rational32) -> Self {
        Twelfths((value * Rational32::from_integer(12)).round().to_integer())
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 12.0
    }

    #[inline]
    pub fn to_rational(self) -> Rational32 {
        Rational32::new(self.0, 12)
    }

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Fold into the range (−6, 6], i.e. (−½, ½]
    pub fn normalized(self) -> Self {
        let mut v = self.0.rem_euclid(12);
        if v > 6 {
            v -= 12;
        }
        Twelfths(v)
    }

    /// Fold into [0, 12)
    pub fn positive(self) -> Self {
        Twelfths(self.0.rem_euclid(12))
    }

    /// Equal modulo whole lattice translations
    pub fn eq_mod_lattice(self, other: Self) -> bool {
        (self.0 - other.0).rem_euclid(12) == 0
    }

    /// Shift by a number of whole cells
    pub fn shifted(self, cells: i32) -> Self {
        Twelfths(self.0 + 12 * cells)
    }
}

impl Add for Twelfths {
    type Output = Twelfths;
    fn add(self, rhs: Self) -> Self {
        Twelfths(self.0 + rhs.0)
    }
}

impl AddAssign for Twelfths {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Twelfths {
    type Output = Twelfths;
    fn sub(self, rhs: Self) -> Self {
        Twelfths(self.0 - rhs.0)
    }
}

impl Neg for Twelfths {
    type Output = Twelfths;
    fn neg(self) -> Self {
        Twelfths(-self.0)
    }
}

/// Reduced fraction text: `0`, `1/2`, `-1/4`, `5/12`, `3/2`, `-1`
impl fmt::Display for Twelfths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.to_rational();
        if r.is_integer() {
            write!(f, "{}", r.to_integer())
        } else {
            write!(f, "{}/{}", r.numer(), r.denom())
        }
    }
}
