//! Crystallographic symmetry
//!
//! - Exact symmetry operations and their Jones-Faithful notation
//! - Geometric classification of operations (axes, planes, centers)
//! - Unit cell math (fractional ↔ Cartesian conversion, wrapping, tensors)
//! - Space groups with lattice centering

mod classify;
mod error;
pub mod notation;
mod operation;
mod space_group;
mod tensor;
mod twelfths;
mod unit_cell;

pub use classify::{GlideKind, OperationDescription, OperationKind};
pub use error::{NotationError, SymResult, SymmetryError};
pub use notation::NotationOptions;
pub use operation::SymmetryOperation;
pub use space_group::{LatticeCentering, OperatorLookup, SpaceGroup, SITE_TOLERANCE_SQ};
pub use tensor::{DisplacementParameters, SymmetricTensor, TWO_PI_SQUARED};
pub use twelfths::Twelfths;
pub use unit_cell::{unitize_value, CellDimension, UnitCell, UNITIZE_SNAP};
