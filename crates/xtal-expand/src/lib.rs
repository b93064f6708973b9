//! Symmetry expansion of crystal structures
//!
//! Given an asymmetric unit, a unit cell and a space group, the
//! [`ExpansionEngine`] generates every symmetry copy over a range of cells,
//! merging copies that land on special positions and replicating bonds.
//! Supercells, unit-cell packing, molecule-centroid trimming and
//! biological assemblies are configured through [`ExpansionRequest`].
//!
//! # Example
//!
//! ```
//! use lin_alg::f64::Vec3;
//! use xtal_algos::{SpaceGroup, UnitCell};
//! use xtal_expand::{ExpansionEngine, ExpansionRequest};
//! use xtal_mol::AtomRecord;
//!
//! let group = SpaceGroup::from_notations(["x,y,z", "-x,-y,-z"]).unwrap();
//! let mut engine = ExpansionEngine::new(UnitCell::cubic(10.0), group);
//! let atoms = [AtomRecord::new("C1", "C", Vec3::new(0.1, 0.2, 0.3))];
//! let result = engine.expand(&atoms, &[], &ExpansionRequest::new()).unwrap();
//! assert_eq!(result.atom_count(), 2);
//! ```

mod biomolecule;
mod centroid;
mod engine;
mod error;
mod request;
mod result;
mod supercell;

pub use biomolecule::{BioAssembly, BioFilter, ParticleMode, PARTICLE_RADIUS};
pub use engine::ExpansionEngine;
pub use error::{ExpandError, ExpandResult, PreconditionError};
pub use request::{CellRange, ExpansionRequest, Supercell, Tolerances};
pub use result::ExpansionResult;
