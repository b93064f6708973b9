//! Error types for symmetry notation and space-group construction

use thiserror::Error;

/// Result type for space-group and operation construction
pub type SymResult<T = ()> = Result<T, SymmetryError>;

/// Malformed operator notation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotationError {
    #[error("Empty symmetry operation")]
    EmptyNotation,

    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("Expected {expected} coordinate expressions, found {found}")]
    RowCount { expected: usize, found: usize },

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Matrix literal needs {expected} values, found {found}")]
    MatrixSize { expected: usize, found: usize },

    #[error("Coefficient {0} is not a crystallographic rotation entry")]
    NonCrystallographic(String),

    #[error("Operation matrix is singular and cannot be inverted")]
    Singular,

    #[error("Sign without a following term in '{0}'")]
    DanglingSign(String),
}

/// Errors from operations, unit cells and space groups
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SymmetryError {
    #[error("Invalid symmetry operation '{notation}': {source}")]
    Notation {
        notation: String,
        #[source]
        source: NotationError,
    },

    #[error("Operation has dimension {found}, expected {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Space group operations have not been finalized")]
    NotFinalized,

    #[error("Unknown lattice code {0}")]
    UnknownLattice(i32),

    #[error("Space group '{0}' could not be resolved")]
    Lookup(String),

    #[error("Sigma matrix must be {expected} values, found {found}")]
    SigmaSize { expected: usize, found: usize },
}

impl SymmetryError {
    pub fn notation(notation: impl Into<String>, source: NotationError) -> Self {
        SymmetryError::Notation {
            notation: notation.into(),
            source,
        }
    }
}
