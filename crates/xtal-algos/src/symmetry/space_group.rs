//! Ordered operator lists with lattice centering
//!
//! A [`SpaceGroup`] is built from Jones-Faithful strings, from raw Cartesian
//! matrices (biological assemblies) or through a caller-supplied
//! [`OperatorLookup`]. Index 0 is always the identity.

use lin_alg::f64::Vec3;
use serde::{Deserialize, Serialize};

use super::error::{SymResult, SymmetryError};
use super::notation::NotationOptions;
use super::operation::SymmetryOperation;
use super::twelfths::Twelfths;
use super::unit_cell::UnitCell;

/// Squared fractional distance under which two images are the same site
pub const SITE_TOLERANCE_SQ: f64 = 1e-6;

/// Resolves a space-group name to its operator list
pub trait OperatorLookup {
    fn operators(&self, name: &str) -> Option<Vec<String>>;
}

/// Lattice centering type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LatticeCentering {
    #[default]
    P,
    I,
    /// Rhombohedral, obverse setting
    R,
    F,
    A,
    B,
    C,
}

impl LatticeCentering {
    /// Decode the magnitude of a SHELX `LATT` code
    pub fn from_shelx(code: i32) -> SymResult<Self> {
        Ok(match code.abs() {
            1 => LatticeCentering::P,
            2 => LatticeCentering::I,
            3 => LatticeCentering::R,
            4 => LatticeCentering::F,
            5 => LatticeCentering::A,
            6 => LatticeCentering::B,
            7 => LatticeCentering::C,
            _ => return Err(SymmetryError::UnknownLattice(code)),
        })
    }

    pub fn letter(self) -> char {
        match self {
            LatticeCentering::P => 'P',
            LatticeCentering::I => 'I',
            LatticeCentering::R => 'R',
            LatticeCentering::F => 'F',
            LatticeCentering::A => 'A',
            LatticeCentering::B => 'B',
            LatticeCentering::C => 'C',
        }
    }

    /// Non-zero centering translations, in twelfths
    pub fn vectors(self) -> &'static [[i32; 3]] {
        match self {
            LatticeCentering::P => &[],
            LatticeCentering::I => &[[6, 6, 6]],
            LatticeCentering::R => &[[8, 4, 4], [4, 8, 8]],
            LatticeCentering::F => &[[0, 6, 6], [6, 0, 6], [6, 6, 0]],
            LatticeCentering::A => &[[0, 6, 6]],
            LatticeCentering::B => &[[6, 0, 6]],
            LatticeCentering::C => &[[6, 6, 0]],
        }
    }
}

/// Ordered set of symmetry operations
#[derive(Debug, Clone)]
pub struct SpaceGroup {
    name: Option<String>,
    operations: Vec<SymmetryOperation>,
    final_operations: Option<Vec<SymmetryOperation>>,
    modulation_dim: usize,
    /// Fold translations into (−½, ½] when adding operators
    normalize: bool,
    lattice_op: Option<usize>,
    centering: LatticeCentering,
    lattice_vectors: Vec<Vec<Twelfths>>,
    is_bio: bool,
}

impl SpaceGroup {
    /// P1: the identity alone
    pub fn new() -> Self {
        Self::with_modulation_dim(0)
    }

    pub fn with_modulation_dim(modulation_dim: usize) -> Self {
        Self {
            name: None,
            operations: vec![SymmetryOperation::identity(modulation_dim)],
            final_operations: None,
            modulation_dim,
            normalize: true,
            lattice_op: None,
            centering: LatticeCentering::P,
            lattice_vectors: Vec::new(),
            is_bio: false,
        }
    }

    /// Build from Jones-Faithful strings. The identity is inserted at index 0
    /// when missing; a malformed string fails the whole group.
    pub fn from_notations<I, S>(notations: I) -> SymResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_superspace_notations(notations, 0)
    }

    /// Build a (3+d)-dimensional superspace group
    pub fn from_superspace_notations<I, S>(notations: I, modulation_dim: usize) -> SymResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut group = Self::with_modulation_dim(modulation_dim);
        for notation in notations {
            group.add_operation(notation.as_ref())?;
        }
        Ok(group)
    }

    /// Resolve `name` through `lookup` and build from the returned operators
    pub fn from_lookup(name: &str, lookup: &impl OperatorLookup) -> SymResult<Self> {
        let ops = lookup
            .operators(name)
            .ok_or_else(|| SymmetryError::Lookup(name.to_string()))?;
        let mut group = Self::from_notations(ops)?;
        group.name = Some(name.to_string());
        Ok(group)
    }

    /// Build from row-major Cartesian 4×4 matrices of a biological assembly
    pub fn from_bio_matrices(matrices: &[[f64; 16]]) -> Self {
        let mut operations: Vec<SymmetryOperation> = matrices
            .iter()
            .map(|m| SymmetryOperation::from_matrix(*m))
            .collect();
        if !operations.first().is_some_and(|op| op.is_identity()) {
            log::debug!("Biomolecule matrices lack a leading identity; inserting one");
            operations.insert(0, SymmetryOperation::from_matrix(lin_alg::f64::Mat4::new_identity().data));
        }
        Self {
            name: None,
            operations,
            final_operations: None,
            modulation_dim: 0,
            normalize: false,
            lattice_op: None,
            centering: LatticeCentering::P,
            lattice_vectors: Vec::new(),
            is_bio: true,
        }
    }

    /// Keep translations exactly as written instead of folding them
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Parse and append an operator. Returns its index, or `None` when an
    /// operator with the same canonical form is already present.
    pub fn add_operation(&mut self, notation: &str) -> SymResult<Option<usize>> {
        let opts = NotationOptions {
            modulation_dim: self.modulation_dim,
            normalize: self.normalize,
            allow_scaling: false,
        };
        let op = SymmetryOperation::parse_with(notation, opts)?;
        Ok(self.push_unique(op))
    }

    /// Append an already built operation, skipping duplicates
    pub fn add_symmetry_operation(&mut self, op: SymmetryOperation) -> SymResult<Option<usize>> {
        if op.dim() != 3 + self.modulation_dim {
            return Err(SymmetryError::DimensionMismatch {
                expected: 3 + self.modulation_dim,
                found: op.dim(),
            });
        }
        Ok(self.push_unique(op))
    }

    fn push_unique(&mut self, op: SymmetryOperation) -> Option<usize> {
        let canonical = op.to_canonical_string();
        if self
            .operations
            .iter()
            .any(|o| o.to_canonical_string() == canonical)
        {
            return None;
        }
        self.final_operations = None;
        self.operations.push(op);
        Some(self.operations.len() - 1)
    }

    /// Apply a SHELX `LATT` code. Positive codes first add the inversion
    /// image of every operator; every operator is then repeated for each
    /// centering vector.
    pub fn set_lattice(&mut self, latt: i32) -> SymResult<()> {
        let centering = LatticeCentering::from_shelx(latt)?;
        if latt > 0 {
            let images: Vec<SymmetryOperation> = self
                .operations
                .iter()
                .filter_map(|op| self.inverted_image(op))
                .collect();
            for op in images {
                self.push_unique(op);
            }
        }
        let vectors: Vec<Vec<Twelfths>> = centering
            .vectors()
            .iter()
            .map(|v| v.iter().map(|&t| Twelfths(t)).collect())
            .collect();
        self.apply_centering(&vectors);
        self.centering = centering;
        log::debug!(
            "Lattice {} ({}): {} operations",
            latt,
            centering.letter(),
            self.operations.len()
        );
        Ok(())
    }

    /// Add general (3+d)-dimensional centering vectors (fractional).
    /// Zero vectors are skipped.
    pub fn add_lattice_vectors(&mut self, vectors: &[Vec<f64>]) -> SymResult<()> {
        let dim = 3 + self.modulation_dim;
        let mut exact = Vec::with_capacity(vectors.len());
        for v in vectors {
            if v.len() != dim {
                return Err(SymmetryError::DimensionMismatch {
                    expected: dim,
                    found: v.len(),
                });
            }
            let t: Vec<Twelfths> = v.iter().map(|x| Twelfths::from_f64(*x)).collect();
            if t.iter().any(|x| !x.is_zero()) {
                exact.push(t);
            }
        }
        self.apply_centering(&exact);
        Ok(())
    }

    fn apply_centering(&mut self, vectors: &[Vec<Twelfths>]) {
        let base: Vec<SymmetryOperation> = self.operations.clone();
        for v in vectors {
            for op in &base {
                let (Some(rotation), Some(translation)) = (op.rotation(), op.translation()) else {
                    continue;
                };
                let shifted: Vec<Twelfths> = translation
                    .iter()
                    .zip(v)
                    .map(|(t, c)| {
                        let s = *t + *c;
                        if self.normalize {
                            s.normalized()
                        } else {
                            s
                        }
                    })
                    .collect();
                let Ok(mut centered) = SymmetryOperation::from_parts(rotation.clone(), shifted) else {
                    continue;
                };
                if let Some(sigma) = op.sigma() {
                    if centered.set_sigma(sigma).is_err() {
                        continue;
                    }
                }
                if let Some(index) = self.push_unique(centered) {
                    if self.lattice_op.is_none() {
                        self.lattice_op = Some(index);
                    }
                }
            }
        }
        self.lattice_vectors.extend(vectors.iter().cloned());
    }

    fn inverted_image(&self, op: &SymmetryOperation) -> Option<SymmetryOperation> {
        let rotation = op.rotation()?.negated();
        let translation = op
            .translation()?
            .iter()
            .map(|t| if self.normalize { (-*t).normalized() } else { -*t })
            .collect();
        SymmetryOperation::from_parts(rotation, translation).ok()
    }

    /// Attach the same modulation matrix to every operation
    pub fn set_modulation_sigma(&mut self, sigma: &[f64]) -> SymResult<()> {
        for op in &mut self.operations {
            op.set_sigma(sigma)?;
        }
        self.final_operations = None;
        Ok(())
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    pub fn operation(&self, index: usize) -> Option<&SymmetryOperation> {
        self.operations.get(index)
    }

    pub fn operations(&self) -> &[SymmetryOperation] {
        &self.operations
    }

    /// Index of the first centering-generated operation
    pub fn lattice_op(&self) -> Option<usize> {
        self.lattice_op
    }

    pub fn lattice_vectors(&self) -> &[Vec<Twelfths>] {
        &self.lattice_vectors
    }

    pub fn centering(&self) -> LatticeCentering {
        self.centering
    }

    /// Centering letter (`P` when no lattice was set)
    pub fn lattice_designation(&self) -> char {
        self.centering.letter()
    }

    pub fn is_bio(&self) -> bool {
        self.is_bio
    }

    pub fn is_superspace(&self) -> bool {
        self.modulation_dim > 0
    }

    pub fn modulation_dim(&self) -> usize {
        self.modulation_dim
    }

    /// Finalize every operation against `points` (fractional) unless a
    /// finalized set already exists
    pub fn finalize_against(&mut self, points: &[Vec3]) {
        if self.final_operations.is_some() {
            return;
        }
        self.refinalize_against(points);
    }

    /// Discard any finalized set and finalize again against `points`
    pub fn refinalize_against(&mut self, points: &[Vec3]) {
        let finals = self
            .operations
            .iter()
            .map(|op| {
                let mut op = op.clone();
                op.finalize(points);
                op
            })
            .collect();
        self.final_operations = Some(finals);
    }

    pub fn is_finalized(&self) -> bool {
        self.final_operations.is_some()
    }

    /// Copy of the finalized operations
    pub fn final_operations(&self) -> SymResult<Vec<SymmetryOperation>> {
        self.final_operations
            .clone()
            .ok_or(SymmetryError::NotFinalized)
    }

    /// Index of an operation equal to `op` modulo lattice translations
    pub fn find_equivalent(&self, op: &SymmetryOperation) -> Option<usize> {
        self.operations
            .iter()
            .position(|o| o.is_equivalent_mod_lattice(op))
    }

    /// Whether every product of two operations is again in the group,
    /// modulo lattice translations
    pub fn is_closed(&self) -> bool {
        self.operations.iter().all(|a| {
            self.operations.iter().all(|b| {
                a.compose(b)
                    .is_some_and(|ab| self.find_equivalent(&ab).is_some())
            })
        })
    }

    /// Number of operations fixing a fractional point modulo the lattice
    pub fn site_multiplicity(&self, point: Vec3, cell: &UnitCell) -> usize {
        let zero = Vec3::new(0.0, 0.0, 0.0);
        let mut images: Vec<Vec3> = Vec::with_capacity(self.operations.len());
        for op in &self.operations {
            let p = cell.unitize(op.apply(point, zero));
            let seen = images.iter().any(|q| {
                let d = periodic_delta(*q - p);
                d.magnitude_squared() < SITE_TOLERANCE_SQ
            });
            if !seen {
                images.push(p);
            }
        }
        if images.is_empty() {
            return 1;
        }
        self.operations.len() / images.len()
    }

    /// Notation of every operation, canonical when `normalized`
    pub fn operation_notations(&self, normalized: bool) -> Vec<String> {
        self.operations
            .iter()
            .map(|op| op.notation(normalized).to_string())
            .collect()
    }
}

impl Default for SpaceGroup {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold a difference of unitized points so that 0.99999 and 0 compare equal
fn periodic_delta(d: Vec3) -> Vec3 {
    let f = |x: f64| x - x.round();
    Vec3::new(f(d.x), f(d.y), f(d.z))
}
