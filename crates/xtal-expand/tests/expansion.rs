use lin_alg::f64::Vec3;
use xtal_algos::{SpaceGroup, SymmetricTensor, UnitCell};
use xtal_expand::{
    CellRange, ExpandError, ExpansionEngine, ExpansionRequest, PreconditionError,
};
use xtal_mol::{AtomIndex, AtomRecord, Bond, MolError, SymOp};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn group(ops: &[&str]) -> SpaceGroup {
    SpaceGroup::from_notations(ops.iter().copied()).unwrap()
}

fn atom(name: &str, x: f64, y: f64, z: f64) -> AtomRecord {
    AtomRecord::new(name, "C", Vec3::new(x, y, z))
}

fn close(a: Vec3, b: Vec3) -> bool {
    (a - b).magnitude() < 1e-4
}

#[test]
fn screw_axis_copy_lands_in_cell() {
    init();
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), group(&["x,y,z", "-x,-y,z+1/2"]));
    let result = engine
        .expand(&[atom("C1", 0.1, 0.1, 0.0)], &[], &ExpansionRequest::new())
        .unwrap();

    assert_eq!(result.atom_count(), 2);
    assert_eq!(result.presymmetry_atom_count, 1);
    assert!(close(result.fractional[1], Vec3::new(0.9, 0.9, 0.5)));
    assert!(close(result.atoms[1].position, Vec3::new(4.5, 4.5, 2.5)));
    assert_eq!(result.atoms[1].symop, SymOp::new(2, [0, 0, 0]));
    assert_eq!(result.atoms[1].symop.to_pdb_string(), "2_555");
    assert_eq!(result.atoms[1].atom_site, 0);
    assert!(result.atoms[1].symmetry.contains(1));
    assert!(!result.atoms[1].symmetry.contains(0));
    assert_eq!(result.cell_labels, vec![555]);
}

#[test]
fn atom_on_inversion_center_is_not_duplicated() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), group(&["x,y,z", "-x,-y,-z"]));
    let result = engine
        .expand(&[atom("O1", 0.0, 0.0, 0.0)], &[], &ExpansionRequest::new())
        .unwrap();

    assert_eq!(result.atom_count(), 1);
    assert_eq!(result.special_position_merges, 1);
    let bits: Vec<usize> = result.atoms[0].symmetry.iter_ones().collect();
    assert_eq!(bits, vec![0, 1]);
    assert_eq!(result.atoms_for_operation(1).count(), 1);
}

#[test]
fn atom_on_two_fold_axis_is_merged() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), group(&["x,y,z", "-x,-y,z"]));
    let on_axis = engine
        .expand(&[atom("S1", 0.0, 0.0, 0.3)], &[], &ExpansionRequest::new())
        .unwrap();
    assert_eq!(on_axis.atom_count(), 1);
    assert!(on_axis.atoms[0].symmetry.contains(0));
    assert!(on_axis.atoms[0].symmetry.contains(1));

    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), group(&["x,y,z", "-x,-y,z"]));
    let general = engine
        .expand(&[atom("S1", 0.1, 0.2, 0.3)], &[], &ExpansionRequest::new())
        .unwrap();
    assert_eq!(general.atom_count(), 2);
    assert!(close(general.fractional[1], Vec3::new(0.9, 0.8, 0.3)));
}

#[test]
fn special_position_check_can_be_disabled() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), group(&["x,y,z", "-x,-y,-z"]));
    let request = ExpansionRequest::new().with_special_positions(false);
    let result = engine
        .expand(&[atom("O1", 0.0, 0.0, 0.0)], &[], &request)
        .unwrap();
    assert_eq!(result.atom_count(), 2);
    assert_eq!(result.special_position_merges, 0);
}

#[test]
fn differently_named_atoms_do_not_merge() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), group(&["x,y,z", "-x,-y,-z"]));
    let atoms = [atom("A", 0.0, 0.0, 0.0), atom("B", 0.0, 0.0, 0.0)];
    let result = engine.expand(&atoms, &[], &ExpansionRequest::new()).unwrap();
    // each inversion copy merges into its own namesake only
    assert_eq!(result.atom_count(), 2);
    assert_eq!(result.special_position_merges, 2);
}

#[test]
fn p21_c_orbit_of_a_centrosymmetric_site() {
    let mut engine = ExpansionEngine::new(
        UnitCell::cubic(6.0),
        group(&["x,y,z", "-x,y+1/2,-z+1/2", "-x,-y,-z", "x,-y+1/2,z+1/2"]),
    );
    let result = engine
        .expand(&[atom("Fe", 0.0, 0.0, 0.0)], &[], &ExpansionRequest::new())
        .unwrap();

    assert_eq!(result.atom_count(), 2);
    assert!(close(result.fractional[1], Vec3::new(0.0, 0.5, 0.5)));
    let first: Vec<usize> = result.atoms[0].symmetry.iter_ones().collect();
    let second: Vec<usize> = result.atoms[1].symmetry.iter_ones().collect();
    assert_eq!(first, vec![0, 2]);
    assert_eq!(second, vec![1, 3]);
    assert_eq!(result.site_multiplicity(Vec3::new(0.0, 0.0, 0.0)), 2);
    assert_eq!(result.site_multiplicity(Vec3::new(0.1, 0.2, 0.3)), 1);
}

#[test]
fn operation_list_is_closed() {
    let g = group(&["x,y,z", "-x,y+1/2,-z+1/2", "-x,-y,-z", "x,-y+1/2,z+1/2"]);
    assert!(g.is_closed());
    assert!(!group(&["x,y,z", "-y,x,z"]).is_closed());
}

#[test]
fn bonds_follow_every_copy() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), SpaceGroup::new());
    let atoms = [atom("C1", 0.1, 0.1, 0.1), atom("C2", 0.2, 0.1, 0.1)];
    let bonds = [Bond::single(AtomIndex(0), AtomIndex(1))];
    let request = ExpansionRequest::new()
        .with_cells(CellRange::from_counts(2, 1, 1))
        .with_bonds();
    let result = engine.expand(&atoms, &bonds, &request).unwrap();

    assert_eq!(result.atom_count(), 4);
    assert_eq!(result.bond_count(), result.atom_count() / 2);
    for bond in &result.bonds {
        assert!(bond.atom1 < bond.atom2);
        assert!(bond.atom2.as_usize() < result.atom_count());
    }
    assert_eq!(result.bonds[1], Bond::single(AtomIndex(2), AtomIndex(3)));
    assert_eq!(result.cell_translations, vec![[0, 0, 0], [1, 0, 0]]);
    assert_eq!(result.cell_labels, vec![555, 655]);
    assert!(result.atoms[2].cell_slots.contains(2));
}

#[test]
fn bonds_are_not_copied_unless_requested() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), SpaceGroup::new());
    let atoms = [atom("C1", 0.1, 0.1, 0.1), atom("C2", 0.2, 0.1, 0.1)];
    let bonds = [Bond::single(AtomIndex(0), AtomIndex(1))];
    let request = ExpansionRequest::new().with_cells(CellRange::from_counts(2, 1, 1));
    let result = engine.expand(&atoms, &bonds, &request).unwrap();
    assert_eq!(result.atom_count(), 4);
    assert_eq!(result.bond_count(), 1);
}

#[test]
fn finalize_runs_once_per_engine() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), group(&["x,y,z", "-x,-y,-z"]));
    let request = ExpansionRequest::new();
    let first = engine
        .expand(&[atom("C1", 0.1, 0.2, 0.3)], &[], &request)
        .unwrap();
    let second = engine
        .expand(&[atom("C1", 0.1, 0.2, 0.3)], &[], &request)
        .unwrap();
    assert_eq!(first.operation_notations(), second.operation_notations());
    assert_eq!(first.fractional, second.fractional);

    // a different atom set reuses the same finalized operations
    let third = engine
        .expand(&[atom("C1", -0.4, -0.4, -0.4)], &[], &request)
        .unwrap();
    assert_eq!(third.operation_notations(), first.operation_notations());
    assert!(close(third.fractional[1], Vec3::new(1.4, 1.4, 1.4)));
}

#[test]
fn normalization_can_be_disabled() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), group(&["x,y,z", "-x,-y,-z"]));
    let request = ExpansionRequest::new().without_normalization();
    let result = engine
        .expand(&[atom("C1", 0.1, 0.2, 0.3)], &[], &request)
        .unwrap();
    assert!(close(result.fractional[1], Vec3::new(-0.1, -0.2, -0.3)));
}

#[test]
fn lattice_only_applies_the_centering_operation() {
    let mut g = group(&["x,y,z", "-x,-y,z"]);
    g.set_lattice(-2).unwrap();
    assert_eq!(g.lattice_op(), Some(2));

    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), g.clone());
    let request = ExpansionRequest::new().lattice_only();
    let result = engine
        .expand(&[atom("C1", 0.1, 0.2, 0.3)], &[], &request)
        .unwrap();
    assert_eq!(result.atom_count(), 2);
    assert!(close(result.fractional[1], Vec3::new(0.6, 0.7, 0.8)));

    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), g);
    let full = engine
        .expand(&[atom("C1", 0.1, 0.2, 0.3)], &[], &ExpansionRequest::new())
        .unwrap();
    assert_eq!(full.atom_count(), 4);
}

#[test]
fn trailing_atoms_pass_through() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), group(&["x,y,z", "-x,-y,-z"]));
    let atoms = [
        atom("C1", 0.1, 0.2, 0.3),
        atom("W1", 0.3, 0.3, 0.3),
        atom("W2", 0.4, 0.4, 0.4).ignoring_symmetry(),
    ];
    let request = ExpansionRequest::new().with_base_atom_count(2);
    let result = engine.expand(&atoms, &[], &request).unwrap();

    // C1 and W1 expand, W2 ignores symmetry
    assert_eq!(result.atom_count(), 5);
    assert_eq!(result.presymmetry_atom_count, 3);
    assert!(close(result.atoms[2].position, Vec3::new(2.0, 2.0, 2.0)));
    assert!(result.atoms[2].symmetry.is_empty());

    let request = ExpansionRequest::new().with_base_atom_count(1);
    let result = engine.expand(&atoms, &[], &request).unwrap();
    assert_eq!(result.atom_count(), 4);
}

#[test]
fn copies_never_merge_onto_passthrough_atoms() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(10.0), group(&["x,y,z", "-x,-y,-z"]));
    // The second atom sits exactly where the inversion copy of the first lands
    let atoms = [atom("C1", 0.1, 0.2, 0.3), atom("C1", 0.9, 0.8, 0.7)];
    let request = ExpansionRequest::new().with_base_atom_count(1);
    let result = engine.expand(&atoms, &[], &request).unwrap();

    assert_eq!(result.atom_count(), 3);
    assert_eq!(result.special_position_merges, 0);
    assert!(result.atoms[1].symmetry.is_empty());
    assert!(close(result.fractional[2], Vec3::new(0.9, 0.8, 0.7)));
    assert!(result.atoms[2].symmetry.contains(1));
}

#[test]
fn positive_range_ignores_passthrough_neighbors() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(10.0), SpaceGroup::new());
    // W1 is within range of the C1 copy in the cell below, C1 itself is not
    let atoms = [atom("C1", 0.95, 0.5, 0.5), atom("W1", 0.05, 0.5, 0.5)];
    let request = ExpansionRequest::new()
        .with_base_atom_count(1)
        .with_symmetry_range(2.0);
    let result = engine.expand(&atoms, &[], &request).unwrap();

    assert_eq!(result.atom_count(), 2);
    assert_eq!(result.atoms[1].name.as_deref(), Some("W1"));
}

#[test]
fn tensors_are_rotated_with_the_copy() {
    let tensor = SymmetricTensor::from_components([0.01, 0.02, 0.03, 0.001, 0.002, 0.003]);
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), group(&["x,y,z", "-x,-y,z"]));
    let result = engine
        .expand(&[atom("C1", 0.1, 0.2, 0.3).with_tensor(tensor)], &[], &ExpansionRequest::new())
        .unwrap();

    let rotated = result.atoms[1].tensor.unwrap().components();
    let expected = [0.01, 0.02, 0.03, 0.001, -0.002, -0.003];
    for (r, e) in rotated.iter().zip(expected) {
        assert!((r - e).abs() < 1e-12);
    }
    assert_eq!(result.atoms[0].tensor, Some(tensor));
}

#[test]
fn cartesian_input_is_converted() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), group(&["x,y,z", "-x,-y,z+1/2"]));
    let request = ExpansionRequest::new().cartesian_input();
    let result = engine
        .expand(&[atom("C1", 0.5, 0.5, 0.0)], &[], &request)
        .unwrap();
    assert_eq!(result.atom_count(), 2);
    assert!(close(result.atoms[1].position, Vec3::new(4.5, 4.5, 2.5)));
}

#[test]
fn missing_unit_cell_is_rejected() {
    let mut engine = ExpansionEngine::without_cell(group(&["x,y,z", "-x,-y,z"]));
    let err = engine
        .expand(&[atom("C1", 0.1, 0.2, 0.3)], &[], &ExpansionRequest::new())
        .unwrap_err();
    assert_eq!(err, ExpandError::Precondition(PreconditionError::MissingUnitCell));
}

#[test]
fn invalid_input_is_rejected_before_expansion() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), SpaceGroup::new());
    let atoms = [atom("C1", 0.1, 0.2, 0.3)];

    let err = engine
        .expand(&atoms, &[], &ExpansionRequest::new().with_base_atom_count(3))
        .unwrap_err();
    assert_eq!(
        err,
        ExpandError::Precondition(PreconditionError::BaseCountOutOfRange {
            requested: 3,
            available: 1
        })
    );

    let bonds = [Bond::single(AtomIndex(0), AtomIndex(5))];
    let err = engine.expand(&atoms, &bonds, &ExpansionRequest::new()).unwrap_err();
    assert!(matches!(err, ExpandError::Mol(MolError::AtomIndexOutOfBounds(5, 1))));

    let empty = CellRange::new([0, 0, 0], [0, 1, 1]);
    let err = engine
        .expand(&atoms, &[], &ExpansionRequest::new().with_cells(empty))
        .unwrap_err();
    assert!(matches!(
        err,
        ExpandError::Precondition(PreconditionError::InvalidCellRange { .. })
    ));
    assert!(!engine.group().is_finalized());
}

#[test]
fn empty_base_set_gives_empty_result() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(5.0), SpaceGroup::new());
    let result = engine.expand(&[], &[], &ExpansionRequest::new()).unwrap();
    assert_eq!(result.atom_count(), 0);
    assert_eq!(result.bond_count(), 0);
}

#[test]
fn positive_range_keeps_copies_near_the_base_cell() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(10.0), SpaceGroup::new());
    let atoms = [atom("C1", 0.05, 0.5, 0.5), atom("C2", 0.95, 0.5, 0.5)];
    let result = engine
        .expand(&atoms, &[], &ExpansionRequest::new().with_symmetry_range(2.0))
        .unwrap();

    assert_eq!(result.atom_count(), 4);
    let mut xs: Vec<f64> = result.atoms.iter().map(|a| a.position.x).collect();
    xs.sort_by(f64::total_cmp);
    for (x, e) in xs.iter().zip([-0.5, 0.5, 9.5, 10.5]) {
        assert!((x - e).abs() < 1e-9);
    }
}

#[test]
fn negative_range_keeps_copies_near_the_base_atoms() {
    let mut engine = ExpansionEngine::new(UnitCell::cubic(10.0), SpaceGroup::new());
    let atoms = [atom("C1", 0.05, 0.5, 0.5)];
    let tight = engine
        .expand(&atoms, &[], &ExpansionRequest::new().with_symmetry_range(-1.0))
        .unwrap();
    assert_eq!(tight.atom_count(), 1);

    let wide = engine
        .expand(&atoms, &[], &ExpansionRequest::new().with_symmetry_range(-10.5))
        .unwrap();
    // every neighbor cell within 10.5 Å of the atom's box, on all three axes
    assert_eq!(wide.atom_count(), 27);
}
