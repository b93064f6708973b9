//! Bond data structure
//!
//! Provides the `Bond` struct and `BondOrder` enum for bonds between atoms
//! of a base set or of an expanded set.

use serde::{Deserialize, Serialize};

use crate::error::{MolError, MolResult};
use crate::index::AtomIndex;

/// Bond order enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BondOrder {
    /// Unknown or unspecified bond order
    #[default]
    Unknown = 0,
    Single = 1,
    Double = 2,
    Triple = 3,
    /// Aromatic/delocalized bond (1.5 order)
    Aromatic = 4,
}

/// Bond between two atoms.
/// By convention, `atom1 < atom2` (indices are ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bond {
    pub atom1: AtomIndex,
    pub atom2: AtomIndex,
    pub order: BondOrder,
}

impl Bond {
    /// Create a new bond between two atoms.
    ///
    /// The atom indices are automatically ordered so that atom1 < atom2.
    pub fn new(a1: AtomIndex, a2: AtomIndex, order: BondOrder) -> Self {
        let (atom1, atom2) = if a1.0 <= a2.0 { (a1, a2) } else { (a2, a1) };
        Bond {
            atom1,
            atom2,
            order,
        }
    }

    /// Create a single bond
    pub fn single(a1: AtomIndex, a2: AtomIndex) -> Self {
        Self::new(a1, a2, BondOrder::Single)
    }

    /// Check that both endpoints exist in an array of `atom_count` atoms
    /// and that the bond is not a self-loop
    pub fn validate(&self, atom_count: usize) -> MolResult<()> {
        for atom in [self.atom1, self.atom2] {
            if atom.as_usize() >= atom_count {
                return Err(MolError::atom_out_of_bounds(atom.0, atom_count));
            }
        }
        if self.atom1 == self.atom2 {
            return Err(MolError::InvalidBond(self.atom1.0, self.atom2.0));
        }
        Ok(())
    }

    /// Ordered endpoint pair, used for deduplication
    #[inline]
    pub fn key(&self) -> (AtomIndex, AtomIndex) {
        (self.atom1, self.atom2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bond_creation() {
        let bond = Bond::new(AtomIndex(5), AtomIndex(3), BondOrder::Double);
        // Should be ordered
        assert_eq!(bond.atom1, AtomIndex(3));
        assert_eq!(bond.atom2, AtomIndex(5));
        assert_eq!(bond.key(), (AtomIndex(3), AtomIndex(5)));
        assert_eq!(bond.order, BondOrder::Double);
    }

    #[test]
    fn test_validate() {
        assert!(Bond::single(AtomIndex(0), AtomIndex(1)).validate(2).is_ok());
        assert_eq!(
            Bond::single(AtomIndex(0), AtomIndex(4)).validate(2),
            Err(MolError::AtomIndexOutOfBounds(4, 2))
        );
        assert!(matches!(
            Bond::single(AtomIndex(1), AtomIndex(1)).validate(2),
            Err(MolError::InvalidBond(1, 1))
        ));
    }
}
