//! Symmetry expansion engine
//!
//! An expansion runs in three phases:
//!
//! 1. **Seed** - base atoms are converted to fractional coordinates and
//!    placed as their own identity images.
//! 2. **Enumerate** - every cell translation (origin cell first) and every
//!    finalized operation is applied to every expandable base atom. Copies
//!    landing on an already placed atom of the same name merge into it.
//! 3. **Resolve** - base bonds are remapped onto the copies produced by
//!    each (cell, operation) pass.

use ahash::{AHashMap, AHashSet};
use lin_alg::f64::Vec3;
use xtal_algos::{SpaceGroup, UnitCell};
use xtal_mol::{AtomIndex, AtomRecord, Bond, SpatialGrid, SymOp, SymmetryBits};

use crate::biomolecule::{self, BioAssembly};
use crate::centroid;
use crate::error::{ExpandResult, PreconditionError};
use crate::request::ExpansionRequest;
use crate::result::ExpansionResult;
use crate::supercell;

/// Expands asymmetric units with one space group in one unit cell
#[derive(Debug, Clone)]
pub struct ExpansionEngine {
    cell: Option<UnitCell>,
    group: SpaceGroup,
}

impl ExpansionEngine {
    pub fn new(cell: UnitCell, group: SpaceGroup) -> Self {
        Self {
            cell: Some(cell),
            group,
        }
    }

    /// Engine without a unit cell; only biological assemblies can expand
    pub fn without_cell(group: SpaceGroup) -> Self {
        Self { cell: None, group }
    }

    /// Engine applying the Cartesian matrices of a biological assembly
    pub fn for_assembly(assembly: &BioAssembly, cell: Option<UnitCell>) -> Self {
        Self {
            cell,
            group: assembly.to_space_group(),
        }
    }

    pub fn cell(&self) -> Option<&UnitCell> {
        self.cell.as_ref()
    }

    /// The group, finalized once the first expansion has run
    pub fn group(&self) -> &SpaceGroup {
        &self.group
    }

    /// Expand `atoms` (an asymmetric unit, optionally followed by atoms to
    /// carry through unchanged) and the bonds between them.
    ///
    /// The caller's atoms are never modified. Operations are finalized
    /// against the first atom set expanded and reused afterwards.
    pub fn expand(
        &mut self,
        atoms: &[AtomRecord],
        bonds: &[Bond],
        request: &ExpansionRequest,
    ) -> ExpandResult<ExpansionResult> {
        request.cells.validate()?;
        for bond in bonds {
            bond.validate(atoms.len())?;
        }
        let base_count = match request.base_atom_count {
            Some(n) if n > atoms.len() => {
                return Err(PreconditionError::BaseCountOutOfRange {
                    requested: n,
                    available: atoms.len(),
                }
                .into())
            }
            Some(n) => n,
            None => atoms.len(),
        };

        if self.group.is_bio() {
            if request.wants_lattice() {
                return Err(PreconditionError::BioWithLatticeRange.into());
            }
            let cell = self.cell.clone().unwrap_or_default();
            return biomolecule::expand(&cell, &mut self.group, atoms, bonds, base_count, request);
        }

        let cell = self.cell.clone().ok_or(PreconditionError::MissingUnitCell)?;
        if atoms.is_empty() {
            log::warn!("No base atoms to expand");
            return Ok(ExpansionResult::empty(cell, self.group.clone()));
        }

        let seed = Seed::new(&cell, atoms, bonds, base_count, request.coordinates_are_fractional);
        log::info!(
            "Expanding {} base atoms with {} operations over {} cells",
            seed.expandable.len(),
            self.group.operation_count(),
            request.cells.cell_count()
        );
        let mut result = match &request.supercell {
            Some(sc) => supercell::expand(&cell, &mut self.group, &seed, sc, request)?,
            None => enumerate(&cell, &mut self.group, &seed, request)?,
        };
        if request.centroid_unit_cell {
            centroid::apply(&mut result, request);
        }
        log::info!(
            "Symmetry expansion produced {} atoms and {} bonds",
            result.atom_count(),
            result.bond_count()
        );
        Ok(result)
    }
}

/// Base atoms in fractional coordinates
#[derive(Debug, Clone)]
pub(crate) struct Seed {
    pub atoms: Vec<AtomRecord>,
    /// Base atom indices the operations are applied to
    pub expandable: Vec<usize>,
    pub bonds: Vec<Bond>,
}

impl Seed {
    pub fn new(
        cell: &UnitCell,
        atoms: &[AtomRecord],
        bonds: &[Bond],
        base_count: usize,
        fractional: bool,
    ) -> Self {
        let atoms: Vec<AtomRecord> = atoms
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let mut a = a.clone();
                a.atom_site = i;
                if !fractional {
                    a.position = cell.to_fractional(a.position, false);
                }
                a
            })
            .collect();
        let expandable = (0..base_count.min(atoms.len()))
            .filter(|&i| !atoms[i].ignore_symmetry)
            .collect();
        Self {
            atoms,
            expandable,
            bonds: bonds.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BoundingBox {
    min: Vec3,
    max: Vec3,
}

impl BoundingBox {
    fn around(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut min = Vec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Vec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min = Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        Self { min, max }
    }

    fn expanded(self, margin: f64) -> Self {
        let m = Vec3::new(margin, margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

/// Distance filter against the atoms of the origin-cell pass
struct NearBase {
    bounds: BoundingBox,
    grid: SpatialGrid,
    points: Vec<Vec3>,
    range: f64,
}

impl NearBase {
    fn new(points: Vec<Vec3>, range: f64) -> Self {
        let mut grid = SpatialGrid::with_capacity(range, points.len());
        for (i, p) in points.iter().enumerate() {
            grid.insert(*p, i);
        }
        Self {
            bounds: BoundingBox::around(points.iter().copied()).expanded(range),
            grid,
            points,
            range,
        }
    }

    fn accepts(&self, p: Vec3, scratch: &mut Vec<usize>) -> bool {
        self.bounds.contains(p) && self.grid.any_within(p, self.range, &self.points, scratch)
    }
}

/// Which placed atoms a special-position test looks at
#[derive(Debug, Clone, Copy)]
enum Scope {
    All,
    /// Atoms of the origin-cell pass plus those placed since `pass_start`
    CellAndBase { base_end: usize, pass_start: usize },
}

impl Scope {
    fn includes(self, index: usize) -> bool {
        match self {
            Scope::All => true,
            Scope::CellAndBase {
                base_end,
                pass_start,
            } => index < base_end || index >= pass_start,
        }
    }
}

/// Arena of placed atoms with a hash grid over their Cartesian positions
struct Placed {
    atoms: Vec<AtomRecord>,
    fractional: Vec<Vec3>,
    cartesian: Vec<Vec3>,
    grid: SpatialGrid,
    tolerance_sq: f64,
}

impl Placed {
    fn new(tolerance_sq: f64, capacity: usize) -> Self {
        Self {
            atoms: Vec::with_capacity(capacity),
            fractional: Vec::with_capacity(capacity),
            cartesian: Vec::with_capacity(capacity),
            grid: SpatialGrid::with_capacity(tolerance_sq.sqrt(), capacity),
            tolerance_sq,
        }
    }

    fn len(&self) -> usize {
        self.atoms.len()
    }

    fn push(&mut self, atom: AtomRecord, fractional: Vec3, cartesian: Vec3) -> usize {
        let index = self.push_fixed(atom, fractional, cartesian);
        self.grid.insert(cartesian, index);
        index
    }

    /// Place an atom that symmetry copies never merge onto
    fn push_fixed(&mut self, mut atom: AtomRecord, fractional: Vec3, cartesian: Vec3) -> usize {
        let index = self.atoms.len();
        atom.position = cartesian;
        self.atoms.push(atom);
        self.fractional.push(fractional);
        self.cartesian.push(cartesian);
        index
    }

    /// Lowest-index placed atom within tolerance of `p` carrying the same name
    fn find_site(&self, p: Vec3, atom: &AtomRecord, scope: Scope, scratch: &mut Vec<usize>) -> Option<usize> {
        self.grid.query_neighbors(p, scratch);
        scratch
            .iter()
            .copied()
            .filter(|&j| {
                scope.includes(j)
                    && (self.cartesian[j] - p).magnitude_squared() < self.tolerance_sq
                    && self.atoms[j].same_name(atom)
            })
            .min()
    }
}

/// Seed and enumerate one space group over the request's cell range
pub(crate) fn enumerate(
    cell: &UnitCell,
    group: &mut SpaceGroup,
    seed: &Seed,
    request: &ExpansionRequest,
) -> ExpandResult<ExpansionResult> {
    let tol = request.tolerances;

    // Seed
    let base_frac: Vec<Vec3> = seed
        .expandable
        .iter()
        .map(|&i| seed.atoms[i].position)
        .collect();
    if request.normalize {
        group.finalize_against(&base_frac);
    } else {
        group.finalize_against(&[]);
    }
    let ops = group.final_operations()?;
    let n_ops = ops.len();
    let lattice_op = group.lattice_op();
    let check_special = request.check_special_positions && n_ops > 1;
    let check_all = request.check_all_positions || (check_special && lattice_op.is_some());
    let range = request.symmetry_range;

    let original = request.cells.clamped(cell);
    let pad = request.centroid_unit_cell
        || request.pack_unit_cell
        || (range != 0.0 && original.is_single_cell());
    let scan = if pad {
        original.padded(cell.dimension().periodic_axes())
    } else {
        original
    };
    let cells = scan.cells_origin_first();
    let slots = n_ops * (cells.len() + 1);

    let mut is_expandable = vec![false; seed.atoms.len()];
    for &i in &seed.expandable {
        is_expandable[i] = true;
    }
    let mut placed = Placed::new(tol.special_position_sq, seed.atoms.len() * n_ops);
    for (i, atom) in seed.atoms.iter().enumerate() {
        let mut f = atom.position;
        if request.pack_unit_cell && is_expandable[i] {
            f = cell.unitize(f);
        }
        let mut base = atom.clone();
        base.symmetry = SymmetryBits::with_len(n_ops);
        base.cell_slots = SymmetryBits::with_len(slots);
        let p = cell.to_cartesian(f, false);
        if is_expandable[i] {
            base.symmetry.set(0);
            base.cell_slots.set(n_ops);
            placed.push(base, f, p);
        } else {
            placed.push_fixed(base, f, p);
        }
    }
    let mut bonds = seed.bonds.clone();
    let mut bond_keys: AHashSet<(AtomIndex, AtomIndex)> = bonds.iter().map(Bond::key).collect();

    let outer_box = (range < 0.0).then(|| {
        BoundingBox::around(seed.expandable.iter().map(|&i| placed.cartesian[i])).expanded(-range)
    });
    let mut near_base: Option<NearBase> = None;
    let mut base_end = placed.len();
    let mut merges = 0usize;
    let mut scratch = Vec::new();

    // Enumerate
    for (ci, t) in cells.iter().enumerate() {
        let offset = Vec3::new(t[0] as f64, t[1] as f64, t[2] as f64);
        let pass_start = if ci == 0 { 0 } else { placed.len() };
        let scope = if check_all {
            Scope::All
        } else {
            Scope::CellAndBase {
                base_end,
                pass_start,
            }
        };
        for (oi, op) in ops.iter().enumerate() {
            if ci == 0 && oi == 0 {
                continue;
            }
            if request.lattice_only && oi != 0 && Some(oi) != lattice_op {
                continue;
            }
            let rotation = (n_ops > 1).then(|| op.cartesian_linear(cell));
            let slot = (ci + 1) * n_ops + oi;
            let mut site_map: AHashMap<usize, (usize, bool)> =
                AHashMap::with_capacity(seed.expandable.len());

            for &a in &seed.expandable {
                let atom = &seed.atoms[a];
                let mut f = op.apply(atom.position, offset);
                if request.pack_unit_cell {
                    f = cell.unitize(f) + offset;
                    if !cell.is_within_cell(f, original.min, original.max, tol.pack_slop) {
                        continue;
                    }
                }
                let p = cell.to_cartesian(f, false);
                if outer_box.is_some_and(|b| !b.contains(p)) {
                    continue;
                }
                if ci > 0 {
                    if let Some(near) = &near_base {
                        if !near.accepts(p, &mut scratch) {
                            continue;
                        }
                    }
                }
                if check_special {
                    if let Some(j) = placed.find_site(p, atom, scope, &mut scratch) {
                        placed.atoms[j].symmetry.set(oi);
                        placed.atoms[j].cell_slots.set(slot);
                        site_map.insert(a, (j, false));
                        merges += 1;
                        continue;
                    }
                }

                let mut copy = atom.copy_to(p, atom.atom_site, SymOp::new((oi + 1) as u16, *t));
                copy.symmetry = SymmetryBits::with_len(n_ops);
                copy.symmetry.set(oi);
                copy.cell_slots = SymmetryBits::with_len(slots);
                copy.cell_slots.set(slot);
                if let (Some(tensor), Some(r)) = (&atom.tensor, &rotation) {
                    copy.tensor = Some(tensor.rotated(r));
                }
                let index = placed.push(copy, f, p);
                site_map.insert(a, (index, true));
            }

            // Resolve
            if request.apply_symmetry_to_bonds {
                resolve_bonds(&seed.bonds, &site_map, &mut bonds, &mut bond_keys);
            }
        }
        if ci == 0 {
            base_end = placed.len();
            if range > 0.0 {
                let points = (0..base_end)
                    .filter(|&j| j >= seed.atoms.len() || is_expandable[j])
                    .map(|j| placed.cartesian[j])
                    .collect();
                near_base = Some(NearBase::new(points, range));
            }
        }
    }

    if merges > 0 {
        log::debug!("Merged {merges} copies onto special positions");
    }

    let Placed {
        atoms, fractional, ..
    } = placed;
    Ok(ExpansionResult {
        atoms,
        fractional,
        bonds,
        cell: cell.clone(),
        group: group.clone(),
        operations: ops,
        cell_labels: cells.iter().map(|c| UnitCell::cell_to_code(*c)).collect(),
        cell_translations: cells,
        presymmetry_atom_index: 0,
        presymmetry_atom_count: seed.atoms.len(),
        special_position_merges: merges,
    })
}

/// Copy base bonds onto one (cell, operation) pass. A bond is added only
/// when at least one endpoint was created in this pass.
pub(crate) fn resolve_bonds(
    base_bonds: &[Bond],
    site_map: &AHashMap<usize, (usize, bool)>,
    bonds: &mut Vec<Bond>,
    keys: &mut AHashSet<(AtomIndex, AtomIndex)>,
) {
    for bond in base_bonds {
        let (Some(&(i1, new1)), Some(&(i2, new2))) = (
            site_map.get(&bond.atom1.as_usize()),
            site_map.get(&bond.atom2.as_usize()),
        ) else {
            continue;
        };
        if !(new1 || new2) || i1 == i2 {
            continue;
        }
        let copy = Bond::new(AtomIndex::from(i1), AtomIndex::from(i2), bond.order);
        if keys.insert(copy.key()) {
            bonds.push(copy);
        }
    }
}
