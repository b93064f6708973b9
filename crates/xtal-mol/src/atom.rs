//! Atom records consumed and produced by the expansion engine

use lin_alg::f64::Vec3;
use xtal_algos::SymmetricTensor;

use crate::symmetry::{SymOp, SymmetryBits};

/// A single atom position with the properties symmetry expansion reads
/// or carries along
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    /// Atom name; copies on a special position merge only with atoms of the
    /// same name (atoms without a name match anything)
    pub name: Option<String>,
    pub element: String,
    pub chain: Option<String>,
    /// Fractional or Cartesian depending on the request
    pub position: Vec3,
    /// Index of the base atom this record was generated from
    pub atom_site: usize,
    /// Operation and cell that placed this copy
    pub symop: SymOp,
    /// Operations that map a base atom onto this record
    pub symmetry: SymmetryBits,
    /// `(cell, operation)` slots, numbered `(cell + 1) * n_ops + op`
    pub cell_slots: SymmetryBits,
    /// Cartesian displacement tensor
    pub tensor: Option<SymmetricTensor>,
    /// Copied unchanged, never expanded
    pub ignore_symmetry: bool,
    /// Display radius in Å, set for pseudo-atoms
    pub radius: Option<f64>,
}

impl AtomRecord {
    pub fn new(name: impl Into<String>, element: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: Some(name.into()),
            element: element.into(),
            chain: None,
            position,
            atom_site: 0,
            symop: SymOp::IDENTITY,
            symmetry: SymmetryBits::default(),
            cell_slots: SymmetryBits::default(),
            tensor: None,
            ignore_symmetry: false,
            radius: None,
        }
    }

    /// Atom without a name, matching any atom in special-position tests
    pub fn unnamed(element: impl Into<String>, position: Vec3) -> Self {
        Self {
            name: None,
            ..Self::new("", element, position)
        }
    }

    pub fn with_chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = Some(chain.into());
        self
    }

    pub fn with_tensor(mut self, tensor: SymmetricTensor) -> Self {
        self.tensor = Some(tensor);
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn ignoring_symmetry(mut self) -> Self {
        self.ignore_symmetry = true;
        self
    }

    /// Whether two atoms may be merged onto one site
    pub fn same_name(&self, other: &AtomRecord) -> bool {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    /// Copy of this atom at `position`, carrying everything but the
    /// symmetry bookkeeping
    pub fn copy_to(&self, position: Vec3, atom_site: usize, symop: SymOp) -> Self {
        Self {
            position,
            atom_site,
            symop,
            symmetry: SymmetryBits::default(),
            cell_slots: SymmetryBits::default(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_matching() {
        let p = Vec3::new(0.0, 0.0, 0.0);
        let a = AtomRecord::new("O1", "O", p);
        let b = AtomRecord::new("O2", "O", p);
        let c = AtomRecord::unnamed("O", p);
        assert!(a.same_name(&a));
        assert!(!a.same_name(&b));
        assert!(a.same_name(&c));
        assert!(c.same_name(&b));
    }

    #[test]
    fn test_copy_resets_bookkeeping() {
        let mut a = AtomRecord::new("C1", "C", Vec3::new(0.1, 0.2, 0.3)).with_chain("A");
        a.symmetry.set(3);
        a.cell_slots.set(9);
        let c = a.copy_to(Vec3::new(0.9, 0.8, 0.7), 4, SymOp::new(2, [1, 0, 0]));
        assert_eq!(c.chain.as_deref(), Some("A"));
        assert_eq!(c.atom_site, 4);
        assert!(c.symmetry.is_empty());
        assert!(c.cell_slots.is_empty());
        assert_eq!(c.symop.to_pdb_string(), "2_655");
    }
}
