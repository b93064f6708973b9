//! Output of an expansion

use lin_alg::f64::Vec3;
use xtal_algos::{SpaceGroup, SymmetryOperation, UnitCell};
use xtal_mol::{AtomIndex, AtomRecord, Bond};

/// Expanded atoms, bonds and the bookkeeping needed to interpret them
#[derive(Debug, Clone)]
pub struct ExpansionResult {
    /// Atoms with Cartesian positions; base atoms come first
    pub atoms: Vec<AtomRecord>,
    /// Fractional position of every atom in `cell`
    pub fractional: Vec<Vec3>,
    pub bonds: Vec<Bond>,
    /// Working cell (the new cell after a supercell expansion)
    pub cell: UnitCell,
    /// Working group, finalized against the base atoms
    pub group: SpaceGroup,
    /// Finalized operations, indexed like the bits in `AtomRecord::symmetry`
    pub operations: Vec<SymmetryOperation>,
    /// Cell translations in processing order (origin first)
    pub cell_translations: Vec<[i32; 3]>,
    /// Three-digit code of every processed cell
    pub cell_labels: Vec<i32>,
    /// First atom of the pre-symmetry set
    pub presymmetry_atom_index: usize,
    /// Number of base atoms at the start of `atoms`
    pub presymmetry_atom_count: usize,
    /// Copies merged onto an existing special-position atom
    pub special_position_merges: usize,
}

impl ExpansionResult {
    pub(crate) fn empty(cell: UnitCell, group: SpaceGroup) -> Self {
        Self {
            atoms: Vec::new(),
            fractional: Vec::new(),
            bonds: Vec::new(),
            cell,
            group,
            operations: Vec::new(),
            cell_translations: Vec::new(),
            cell_labels: Vec::new(),
            presymmetry_atom_index: 0,
            presymmetry_atom_count: 0,
            special_position_merges: 0,
        }
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    pub fn atom(&self, index: AtomIndex) -> Option<&AtomRecord> {
        self.atoms.get(index.as_usize())
    }

    pub fn bond(&self, index: usize) -> Option<&Bond> {
        self.bonds.get(index)
    }

    /// Atoms produced by (or merged under) operation `op`
    pub fn atoms_for_operation(&self, op: usize) -> impl Iterator<Item = (AtomIndex, &AtomRecord)> + '_ {
        self.atoms
            .iter()
            .enumerate()
            .filter(move |(_, a)| a.symmetry.contains(op))
            .map(|(i, a)| (AtomIndex::from(i), a))
    }

    /// Canonical notation of every operation used
    pub fn operation_notations(&self) -> Vec<String> {
        self.operations.iter().map(|op| op.to_canonical_string()).collect()
    }

    /// Site multiplicity of a fractional point under the working group
    pub fn site_multiplicity(&self, point: Vec3) -> usize {
        self.group.site_multiplicity(point, &self.cell)
    }

    /// Drop atoms not marked in `keep`, remapping bonds onto the survivors
    pub(crate) fn retain_atoms(&mut self, keep: &[bool]) {
        let mut remap: Vec<Option<AtomIndex>> = vec![None; self.atoms.len()];
        let mut next = 0usize;
        for (i, k) in keep.iter().enumerate() {
            if *k {
                remap[i] = Some(AtomIndex::from(next));
                next += 1;
            }
        }
        let base_kept = keep
            .iter()
            .take(self.presymmetry_atom_count)
            .filter(|k| **k)
            .count();

        let mut flags = keep.iter();
        self.atoms.retain(|_| *flags.next().unwrap_or(&false));
        let mut flags = keep.iter();
        self.fractional.retain(|_| *flags.next().unwrap_or(&false));
        self.bonds = self
            .bonds
            .iter()
            .filter_map(|b| {
                let a1 = remap[b.atom1.as_usize()]?;
                let a2 = remap[b.atom2.as_usize()]?;
                Some(Bond::new(a1, a2, b.order))
            })
            .collect();
        self.presymmetry_atom_count = base_kept;
    }
}
