//! Error types for symmetry expansion

use thiserror::Error;
use xtal_algos::SymmetryError;
use xtal_mol::MolError;

/// Input problems detected before any atom is produced
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreconditionError {
    #[error("Symmetry expansion requires a unit cell")]
    MissingUnitCell,

    #[error("Supercell matrix is singular (determinant {determinant})")]
    SingularSupercell { determinant: f64 },

    #[error("Biomolecule operations cannot be combined with a lattice range, supercell or packing")]
    BioWithLatticeRange,

    #[error("Base atom count {requested} exceeds the {available} atoms supplied")]
    BaseCountOutOfRange { requested: usize, available: usize },

    #[error("Cell range {min:?}..{max:?} is empty")]
    InvalidCellRange { min: [i32; 3], max: [i32; 3] },
}

/// Errors from symmetry expansion
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpandError {
    #[error(transparent)]
    Symmetry(#[from] SymmetryError),

    #[error(transparent)]
    Mol(#[from] MolError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

/// Result type for expansion
pub type ExpandResult<T> = Result<T, ExpandError>;
