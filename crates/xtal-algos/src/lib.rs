//! Crystallographic algorithms for xtal
//!
//! This crate provides the geometric core used by the expansion engine:
//! - Row-major 3×3/4×4 matrix helpers, quaternions and exact rational matrices
//! - Symmetry operations with exact translations in twelfths
//! - Operation classification (rotation and screw axes, mirror and glide planes)
//! - Unit cells and space groups with lattice centering

pub mod linalg;
pub mod symmetry;

pub use symmetry::{
    CellDimension, DisplacementParameters, GlideKind, LatticeCentering, NotationError,
    NotationOptions, OperationDescription, OperationKind, OperatorLookup, SpaceGroup,
    SymResult, SymmetricTensor, SymmetryError, SymmetryOperation, Twelfths, UnitCell,
};
