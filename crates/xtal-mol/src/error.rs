//! Error types for atom and bond records

use thiserror::Error;

/// Errors from atom and bond bookkeeping
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MolError {
    /// Atom index is out of bounds
    #[error("Atom index {0} is out of bounds (max: {1})")]
    AtomIndexOutOfBounds(u32, usize),

    /// Self-loop bond
    #[error("Invalid bond: atom1={0}, atom2={1}")]
    InvalidBond(u32, u32),
}

impl MolError {
    pub fn atom_out_of_bounds(index: u32, max: usize) -> Self {
        MolError::AtomIndexOutOfBounds(index, max)
    }
}

/// Result type for atom and bond operations
pub type MolResult<T> = Result<T, MolError>;
