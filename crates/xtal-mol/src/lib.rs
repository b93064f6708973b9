//! Atom and bond records for crystal expansion
//!
//! - [`AtomRecord`] - position plus the properties symmetry expansion carries
//! - [`Bond`] / [`BondOrder`] - connectivity by atom index
//! - [`SymmetryBits`] / [`SymOp`] - which operations produced an atom
//! - [`SpatialGrid`] - hash grid for distance queries
//! - [`Molecules`] - connected components over bonds

mod atom;
mod bond;
mod components;
mod error;
mod index;
mod spatial;
mod symmetry;

pub use atom::AtomRecord;
pub use bond::{Bond, BondOrder};
pub use components::Molecules;
pub use error::{MolError, MolResult};
pub use index::AtomIndex;
pub use spatial::SpatialGrid;
pub use symmetry::{SymOp, SymmetryBits};
