//! Biological assembly expansion
//!
//! Assemblies are lists of Cartesian 4×4 matrices. They are applied to the
//! base atoms directly, with no lattice, packing or special-position
//! handling.

use std::convert::Infallible;
use std::str::FromStr;

use ahash::{AHashMap, AHashSet};
use lin_alg::f64::Vec3;
use serde::{Deserialize, Serialize};
use xtal_algos::{SpaceGroup, UnitCell};
use xtal_mol::{AtomRecord, Bond, SymOp, SymmetryBits};

use crate::engine::resolve_bonds;
use crate::error::ExpandResult;
use crate::request::ExpansionRequest;
use crate::result::ExpansionResult;

/// Display radius of assembly pseudo-atoms (Å)
pub const PARTICLE_RADIUS: f64 = 16.0;

/// Named set of row-major Cartesian matrices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioAssembly {
    pub name: String,
    pub matrices: Vec<[f64; 16]>,
}

impl BioAssembly {
    pub fn new(name: impl Into<String>, matrices: Vec<[f64; 16]>) -> Self {
        Self {
            name: name.into(),
            matrices,
        }
    }

    pub fn to_space_group(&self) -> SpaceGroup {
        SpaceGroup::from_bio_matrices(&self.matrices).with_name(self.name.clone())
    }
}

/// Replace atoms by pseudo-atoms before applying the assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParticleMode {
    #[default]
    Atoms,
    /// One particle per chain, at the chain centroid
    ByChain,
    /// One particle for the whole asymmetric unit
    BySymop,
}

/// Operator selection for assembly expansion.
///
/// Parsed from text such as `"#1;#3;"` (only operators 1 and 3),
/// `"!#2;"` (all but operator 2), `"#<4"` (operators 1 to 3) with optional
/// `BYCHAIN` / `BYSYMOP` keywords. Operators are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BioFilter {
    pub include: Vec<usize>,
    pub exclude: Vec<usize>,
    /// Operators numbered `limit` and above are skipped
    pub limit: Option<usize>,
    pub particles: ParticleMode,
}

impl BioFilter {
    pub fn parse(text: &str) -> Self {
        let upper = text.to_ascii_uppercase();
        let mut filter = Self::default();
        if upper.contains("BYCHAIN") {
            filter.particles = ParticleMode::ByChain;
        } else if upper.contains("BYSYMOP") {
            filter.particles = ParticleMode::BySymop;
        }

        let bytes = upper.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b'#' {
                i += 1;
                continue;
            }
            let negated = i > 0 && bytes[i - 1] == b'!';
            let less = bytes.get(i + 1) == Some(&b'<');
            let start = if less { i + 2 } else { i + 1 };
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if let Ok(n) = upper[start..end].parse::<usize>() {
                match (less, negated) {
                    (true, _) => filter.limit = Some(n),
                    (false, true) => filter.exclude.push(n),
                    (false, false) => filter.include.push(n),
                }
            }
            i = end.max(i + 1);
        }
        filter
    }

    /// Whether 1-based operator `number` is applied. Any exclusion turns
    /// the filter into exclude-only mode.
    pub fn allows(&self, number: usize) -> bool {
        if self.limit.is_some_and(|limit| number >= limit) {
            return false;
        }
        if !self.exclude.is_empty() {
            return !self.exclude.contains(&number);
        }
        self.include.is_empty() || self.include.contains(&number)
    }

    /// Number of operators considered out of `n_ops`
    pub fn operation_limit(&self, n_ops: usize) -> usize {
        match self.limit {
            Some(limit) => n_ops.min(limit.saturating_sub(1)),
            None => n_ops,
        }
    }

    fn referenced(&self) -> impl Iterator<Item = usize> + '_ {
        self.include.iter().chain(&self.exclude).copied()
    }
}

impl FromStr for BioFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

fn centroid(points: impl Iterator<Item = Vec3>) -> Vec3 {
    let mut sum = Vec3::new(0.0, 0.0, 0.0);
    let mut n = 0usize;
    for p in points {
        sum = sum + p;
        n += 1;
    }
    if n == 0 {
        sum
    } else {
        sum * (1.0 / n as f64)
    }
}

fn particle(name: String, chain: Option<String>, position: Vec3, site: usize) -> AtomRecord {
    let mut atom = AtomRecord::new(name, "Pt", position).with_radius(PARTICLE_RADIUS);
    atom.chain = chain;
    atom.atom_site = site;
    atom
}

/// One pseudo-atom per chain, in order of first appearance
fn chain_particles(atoms: &[AtomRecord], expandable: &[usize]) -> Vec<AtomRecord> {
    let mut order: Vec<Option<String>> = Vec::new();
    let mut members: AHashMap<Option<String>, Vec<Vec3>> = AHashMap::new();
    for &i in expandable {
        let chain = atoms[i].chain.clone();
        let entry = members.entry(chain.clone()).or_insert_with(|| {
            order.push(chain);
            Vec::new()
        });
        entry.push(atoms[i].position);
    }
    order
        .into_iter()
        .enumerate()
        .map(|(n, chain)| {
            let c = centroid(members.get(&chain).into_iter().flatten().copied());
            particle(format!("Pt{}", n + 1), chain, c, n)
        })
        .collect()
}

/// Apply the assembly operators of `group` to the base atoms.
///
/// Input positions are fractional in `cell` unless the request says
/// otherwise; a missing cell is the unit cube, so fractional and Cartesian
/// coincide.
pub(crate) fn expand(
    cell: &UnitCell,
    group: &mut SpaceGroup,
    atoms: &[AtomRecord],
    bonds: &[Bond],
    base_count: usize,
    request: &ExpansionRequest,
) -> ExpandResult<ExpansionResult> {
    let filter = request.bio.clone().unwrap_or_default();

    let mut base: Vec<AtomRecord> = atoms
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let mut a = a.clone();
            a.atom_site = i;
            if request.coordinates_are_fractional {
                a.position = cell.to_cartesian(a.position, false);
            }
            a
        })
        .collect();
    let mut base_bonds = bonds.to_vec();
    let mut expandable: Vec<usize> = (0..base_count)
        .filter(|&i| !base[i].ignore_symmetry)
        .collect();

    match filter.particles {
        ParticleMode::Atoms => {}
        ParticleMode::ByChain => {
            base = chain_particles(&base, &expandable);
            base_bonds.clear();
            expandable = (0..base.len()).collect();
        }
        ParticleMode::BySymop => {
            let c = centroid(expandable.iter().map(|&i| base[i].position));
            base = vec![particle("Pt".to_string(), None, c, 0)];
            base_bonds.clear();
            expandable = vec![0];
        }
    }

    group.finalize_against(&[]);
    let ops = group.final_operations()?;
    let n_ops = ops.len();
    for k in filter.referenced().filter(|&k| k == 0 || k > n_ops) {
        log::warn!("Biomolecule filter refers to operator #{k}, but only {n_ops} are defined");
    }
    let len = filter.operation_limit(n_ops);
    let slots = n_ops * 2;

    let mut out: Vec<AtomRecord> = Vec::with_capacity(base.len() * len.max(1));
    let mut is_expandable = vec![false; base.len()];
    for &i in &expandable {
        is_expandable[i] = true;
    }
    for (i, atom) in base.iter().enumerate() {
        let mut a = atom.clone();
        a.symmetry = SymmetryBits::with_len(n_ops);
        a.cell_slots = SymmetryBits::with_len(slots);
        if is_expandable[i] {
            a.symmetry.set(0);
            a.cell_slots.set(n_ops);
        }
        out.push(a);
    }
    let mut out_bonds = base_bonds.clone();
    let mut keys: AHashSet<_> = out_bonds.iter().map(Bond::key).collect();

    let mut applied = 1usize;
    for (i, op) in ops.iter().enumerate().take(len).skip(1) {
        if !filter.allows(i + 1) {
            continue;
        }
        applied += 1;
        let r = op.linear_3x3();
        let mut site_map = AHashMap::with_capacity(expandable.len());
        for &a in &expandable {
            let atom = &base[a];
            let p = op.apply(atom.position, Vec3::new(0.0, 0.0, 0.0));
            let mut copy = atom.copy_to(p, atom.atom_site, SymOp::new((i + 1) as u16, [0, 0, 0]));
            copy.symmetry = SymmetryBits::with_len(n_ops);
            copy.symmetry.set(i);
            copy.cell_slots = SymmetryBits::with_len(slots);
            copy.cell_slots.set(n_ops + i);
            if let Some(t) = &atom.tensor {
                copy.tensor = Some(t.rotated(&r));
            }
            site_map.insert(a, (out.len(), true));
            out.push(copy);
        }
        if request.apply_symmetry_to_bonds {
            resolve_bonds(&base_bonds, &site_map, &mut out_bonds, &mut keys);
        }
    }
    log::info!(
        "Applied {applied} of {n_ops} biomolecule operators to {} atoms",
        expandable.len()
    );

    let fractional = out
        .iter()
        .map(|a| cell.to_fractional(a.position, false))
        .collect();
    Ok(ExpansionResult {
        presymmetry_atom_count: base.len(),
        atoms: out,
        fractional,
        bonds: out_bonds,
        cell: cell.clone(),
        group: group.clone(),
        operations: ops,
        cell_translations: vec![[0, 0, 0]],
        cell_labels: vec![555],
        presymmetry_atom_index: 0,
        special_position_merges: 0,
    })
}
