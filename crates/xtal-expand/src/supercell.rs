//! Supercell expansion
//!
//! The group is first enumerated densely over every cell the new basis
//! touches. That cloud is refractionalized in the new cell, wrapped and
//! deduplicated, then expanded over the requested cells with P1.

use ahash::AHashSet;
use lin_alg::f64::Vec3;
use xtal_algos::linalg::determinant_3x3;
use xtal_algos::{NotationOptions, SpaceGroup, SymmetryOperation, UnitCell};
use xtal_mol::{AtomIndex, AtomRecord, Bond, SpatialGrid};

use crate::engine::{enumerate, Seed};
use crate::error::{ExpandResult, PreconditionError};
use crate::request::{CellRange, ExpansionRequest, Supercell};
use crate::result::ExpansionResult;

const SINGULAR_DETERMINANT: f64 = 1e-6;

/// New a, b, c (rows, fractional in the old cell) and origin shift
fn basis(supercell: &Supercell) -> ExpandResult<([[f64; 3]; 3], Vec3)> {
    match supercell {
        Supercell::Matrix(rows) => Ok((*rows, Vec3::new(0.0, 0.0, 0.0))),
        Supercell::Notation(text) => {
            let xyz: String = text
                .chars()
                .map(|c| match c {
                    'a' | 'A' => 'x',
                    'b' | 'B' => 'y',
                    'c' | 'C' => 'z',
                    other => other,
                })
                .collect();
            let opts = NotationOptions {
                allow_scaling: true,
                normalize: false,
                ..NotationOptions::default()
            };
            let op = SymmetryOperation::parse_with(&xyz, opts)?;
            let m = op.linear_3x3();
            let rows = [
                [m[0], m[1], m[2]],
                [m[3], m[4], m[5]],
                [m[6], m[7], m[8]],
            ];
            Ok((rows, op.translation_3()))
        }
    }
}

fn row(r: [f64; 3]) -> Vec3 {
    Vec3::new(r[0], r[1], r[2])
}

/// Cells of the old lattice covering the new cell, padded by one
fn search_range(rows: &[[f64; 3]; 3], origin: Vec3) -> CellRange {
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for corner in 0..8 {
        let mut p = origin;
        for (k, r) in rows.iter().enumerate() {
            if corner & (1 << k) != 0 {
                p = p + row(*r);
            }
        }
        for (i, v) in [p.x, p.y, p.z].into_iter().enumerate() {
            lo[i] = lo[i].min(v);
            hi[i] = hi[i].max(v);
        }
    }
    let min = [0, 1, 2].map(|i| lo[i].floor() as i32 - 1);
    let max = [0, 1, 2].map(|i| hi[i].ceil() as i32 + 1);
    CellRange::new(min, max)
}

pub(crate) fn expand(
    cell: &UnitCell,
    group: &mut SpaceGroup,
    seed: &Seed,
    supercell: &Supercell,
    request: &ExpansionRequest,
) -> ExpandResult<ExpansionResult> {
    let (rows, origin) = basis(supercell)?;
    let flat = [
        rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
        rows[2][1], rows[2][2],
    ];
    let determinant = determinant_3x3(&flat);
    if determinant.abs() < SINGULAR_DETERMINANT {
        return Err(PreconditionError::SingularSupercell { determinant }.into());
    }

    let edges = rows.map(|r| cell.to_cartesian(row(r), true));
    let new_cell = UnitCell::from_points(cell.to_cartesian(origin, false), edges[0], edges[1], edges[2])
        .with_dimension(cell.dimension());
    log::info!(
        "Using supercell {:?} with {:.0} times the original volume",
        supercell,
        determinant.abs()
    );

    let dense_request = ExpansionRequest {
        cells: search_range(&rows, origin),
        supercell: None,
        pack_unit_cell: false,
        centroid_unit_cell: false,
        symmetry_range: 0.0,
        ..request.clone()
    };
    let dense = enumerate(cell, group, seed, &dense_request)?;

    // Wrap every dense atom into the new cell and drop repeats
    let tol = request.tolerances.special_position_sq;
    let mut kept: Vec<AtomRecord> = Vec::new();
    let mut kept_cart: Vec<Vec3> = Vec::new();
    let mut grid = SpatialGrid::with_capacity(tol.sqrt(), dense.atom_count());
    let mut mapped: Vec<usize> = Vec::with_capacity(dense.atom_count());
    let mut shifts: Vec<[i32; 3]> = Vec::with_capacity(dense.atom_count());
    let mut fixed: Vec<bool> = Vec::new();
    let mut scratch = Vec::new();
    let mut is_expandable = vec![false; seed.atoms.len()];
    for &i in &seed.expandable {
        is_expandable[i] = true;
    }
    for (i, atom) in dense.atoms.iter().enumerate() {
        let f = new_cell.to_fractional(atom.position, false);
        // Passthrough atoms keep their place and stay out of the final pass
        if i < seed.atoms.len() && !is_expandable[i] {
            let mut a = atom.clone();
            a.position = f;
            shifts.push([0, 0, 0]);
            mapped.push(kept.len());
            kept.push(a);
            kept_cart.push(atom.position);
            fixed.push(true);
            continue;
        }
        let u = new_cell.unitize(f);
        let d = u - f;
        shifts.push([d.x.round() as i32, d.y.round() as i32, d.z.round() as i32]);
        let p = new_cell.to_cartesian(u, false);

        grid.query_neighbors(p, &mut scratch);
        let repeat = scratch
            .iter()
            .copied()
            .filter(|&j| (kept_cart[j] - p).magnitude_squared() < tol && kept[j].same_name(atom))
            .min();
        match repeat {
            Some(j) => mapped.push(j),
            None => {
                let mut a = atom.clone();
                a.position = u;
                grid.insert(p, kept.len());
                mapped.push(kept.len());
                kept.push(a);
                kept_cart.push(p);
                fixed.push(false);
            }
        }
    }

    let mut keys = AHashSet::new();
    let mut bonds = Vec::new();
    for bond in &dense.bonds {
        let (a1, a2) = (bond.atom1.as_usize(), bond.atom2.as_usize());
        if shifts[a1] != shifts[a2] || mapped[a1] == mapped[a2] {
            continue;
        }
        let b = Bond::new(AtomIndex::from(mapped[a1]), AtomIndex::from(mapped[a2]), bond.order);
        if keys.insert(b.key()) {
            bonds.push(b);
        }
    }
    log::debug!(
        "Supercell holds {} of {} generated atoms",
        kept.len(),
        dense.atom_count()
    );

    let seed = Seed {
        expandable: (0..kept.len()).filter(|&i| !fixed[i]).collect(),
        atoms: kept,
        bonds,
    };
    let final_request = ExpansionRequest {
        supercell: None,
        base_atom_count: None,
        coordinates_are_fractional: true,
        ..request.clone()
    };
    let mut p1 = SpaceGroup::new();
    enumerate(&new_cell, &mut p1, &seed, &final_request)
}
