//! Connected components ("molecules") over a bond list

use smallvec::SmallVec;

use crate::bond::Bond;
use crate::index::AtomIndex;

/// Atoms grouped by bond connectivity, in order of their lowest atom index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Molecules {
    /// Molecule number of every atom
    pub molecule_of: Vec<usize>,
    /// Atom indices of every molecule, ascending
    pub members: Vec<Vec<AtomIndex>>,
}

impl Molecules {
    /// Flood-fill components over `bonds`; bonds referencing atoms beyond
    /// `atom_count` are ignored
    pub fn find(atom_count: usize, bonds: &[Bond]) -> Self {
        // Uses SmallVec to avoid heap allocation for atoms with 4 or fewer bonds
        let mut adjacency: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); atom_count];
        for bond in bonds {
            let (a, b) = (bond.atom1.as_usize(), bond.atom2.as_usize());
            if a < atom_count && b < atom_count && a != b {
                adjacency[a].push(b);
                adjacency[b].push(a);
            }
        }

        let mut molecule_of = vec![usize::MAX; atom_count];
        let mut members = Vec::new();
        let mut stack = Vec::new();
        for start in 0..atom_count {
            if molecule_of[start] != usize::MAX {
                continue;
            }
            let id = members.len();
            let mut atoms = Vec::new();
            molecule_of[start] = id;
            stack.push(start);
            while let Some(i) = stack.pop() {
                atoms.push(AtomIndex::from(i));
                for &j in &adjacency[i] {
                    if molecule_of[j] == usize::MAX {
                        molecule_of[j] = id;
                        stack.push(j);
                    }
                }
            }
            atoms.sort();
            members.push(atoms);
        }
        Molecules {
            molecule_of,
            members,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
