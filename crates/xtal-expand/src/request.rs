//! Expansion request configuration
//!
//! [`ExpansionRequest`] is a plain serde value with chainable builders.
//! Everything numeric the engine compares against lives in [`Tolerances`].

use serde::{Deserialize, Serialize};
use xtal_algos::UnitCell;

use crate::biomolecule::BioFilter;
use crate::error::PreconditionError;

/// Half-open range `[min, max)` of integer cell translations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    pub min: [i32; 3],
    pub max: [i32; 3],
}

impl CellRange {
    pub fn new(min: [i32; 3], max: [i32; 3]) -> Self {
        Self { min, max }
    }

    /// The origin cell alone
    pub fn single() -> Self {
        Self::new([0, 0, 0], [1, 1, 1])
    }

    /// `nx × ny × nz` cells starting at the origin
    pub fn from_counts(nx: i32, ny: i32, nz: i32) -> Self {
        Self::new([0, 0, 0], [nx, ny, nz])
    }

    /// Classic three-digit cell codes; `555` is the origin cell and the
    /// maximum is inclusive, so `(555, 555)` is the origin cell alone
    pub fn from_cell_codes(min: i32, max: i32) -> Self {
        Self::new(
            UnitCell::cell_code_to_cell(min, false),
            UnitCell::cell_code_to_cell(max, true),
        )
    }

    pub fn validate(&self) -> Result<(), PreconditionError> {
        if (0..3).any(|i| self.max[i] <= self.min[i]) {
            return Err(PreconditionError::InvalidCellRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    pub fn is_single_cell(&self) -> bool {
        (0..3).all(|i| self.max[i] - self.min[i] == 1)
    }

    pub fn cell_count(&self) -> usize {
        (0..3)
            .map(|i| (self.max[i] - self.min[i]).max(0) as usize)
            .product()
    }

    /// Restrict non-periodic axes of `cell` to the single cell 0
    pub fn clamped(&self, cell: &UnitCell) -> Self {
        let mut r = *self;
        cell.clamp_cell_range(&mut r.min, &mut r.max);
        r
    }

    /// Grow by one cell on each side of the first `axes` axes
    pub fn padded(&self, axes: usize) -> Self {
        let mut r = *self;
        for i in 0..axes.min(3) {
            r.min[i] -= 1;
            r.max[i] += 1;
        }
        r
    }

    /// Every cell in the range, with the origin cell first
    pub fn cells_origin_first(&self) -> Vec<[i32; 3]> {
        let mut cells = Vec::with_capacity(self.cell_count() + 1);
        cells.push([0, 0, 0]);
        for x in self.min[0]..self.max[0] {
            for y in self.min[1]..self.max[1] {
                for z in self.min[2]..self.max[2] {
                    if [x, y, z] != [0, 0, 0] {
                        cells.push([x, y, z]);
                    }
                }
            }
        }
        cells
    }
}

impl Default for CellRange {
    fn default() -> Self {
        Self::single()
    }
}

/// New basis of a supercell in terms of the current cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Supercell {
    /// Rows are the new a, b and c vectors in fractional units of the old cell
    Matrix([[f64; 3]; 3]),
    /// Row notation such as `"a+b,-a+b,c"` or `"2x,y,z"`; a translation
    /// part shifts the new origin
    Notation(String),
}

/// Numeric thresholds used during expansion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Squared Cartesian distance (Å²) under which a copy merges into an
    /// already placed atom
    pub special_position_sq: f64,
    /// Fractional slop around the cell box when packing
    pub pack_slop: f64,
    /// Slop on the lower bound of the centroid test
    pub centroid_min_slop: f64,
    /// Slop on the upper bound of the centroid test
    pub centroid_max_slop: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            special_position_sq: 1e-4,
            pack_slop: 0.02,
            centroid_min_slop: 5e-6,
            centroid_max_slop: 5e-5,
        }
    }
}

/// What to expand and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionRequest {
    pub cells: CellRange,
    /// 0 = no distance filter; > 0 keeps copies within this distance (Å) of
    /// the base cell's atoms; < 0 keeps copies within |range| of the base
    /// atoms' bounding box
    pub symmetry_range: f64,
    pub check_special_positions: bool,
    /// Scan every placed atom for special positions, not just the current cell
    pub check_all_positions: bool,
    pub pack_unit_cell: bool,
    pub centroid_unit_cell: bool,
    pub centroid_packed: bool,
    pub supercell: Option<Supercell>,
    pub apply_symmetry_to_bonds: bool,
    /// Size of the asymmetric unit at the start of the atom array; later
    /// atoms are carried through unchanged
    pub base_atom_count: Option<usize>,
    /// Apply only the centering operation
    pub lattice_only: bool,
    /// Offset operations so the base atoms' images land in the cell
    pub normalize: bool,
    pub coordinates_are_fractional: bool,
    pub bio: Option<BioFilter>,
    pub tolerances: Tolerances,
}

impl Default for ExpansionRequest {
    fn default() -> Self {
        Self {
            cells: CellRange::single(),
            symmetry_range: 0.0,
            check_special_positions: true,
            check_all_positions: false,
            pack_unit_cell: false,
            centroid_unit_cell: false,
            centroid_packed: false,
            supercell: None,
            apply_symmetry_to_bonds: false,
            base_atom_count: None,
            lattice_only: false,
            normalize: true,
            coordinates_are_fractional: true,
            bio: None,
            tolerances: Tolerances::default(),
        }
    }
}

impl ExpansionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cells(mut self, cells: CellRange) -> Self {
        self.cells = cells;
        self
    }

    pub fn with_symmetry_range(mut self, range: f64) -> Self {
        self.symmetry_range = range;
        self
    }

    pub fn with_special_positions(mut self, check: bool) -> Self {
        self.check_special_positions = check;
        self
    }

    pub fn packed(mut self) -> Self {
        self.pack_unit_cell = true;
        self
    }

    /// Keep molecules whose centroid lies in the cell range; `packed` also
    /// keeps molecules with any atom inside
    pub fn centroid(mut self, packed: bool) -> Self {
        self.centroid_unit_cell = true;
        self.centroid_packed = packed;
        self
    }

    pub fn with_supercell(mut self, supercell: Supercell) -> Self {
        self.supercell = Some(supercell);
        self
    }

    pub fn with_bonds(mut self) -> Self {
        self.apply_symmetry_to_bonds = true;
        self
    }

    pub fn with_base_atom_count(mut self, count: usize) -> Self {
        self.base_atom_count = Some(count);
        self
    }

    pub fn lattice_only(mut self) -> Self {
        self.lattice_only = true;
        self
    }

    pub fn without_normalization(mut self) -> Self {
        self.normalize = false;
        self
    }

    pub fn cartesian_input(mut self) -> Self {
        self.coordinates_are_fractional = false;
        self
    }

    pub fn with_bio(mut self, filter: BioFilter) -> Self {
        self.bio = Some(filter);
        self
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Whether anything beyond the plain origin cell is asked for
    pub(crate) fn wants_lattice(&self) -> bool {
        self.cells != CellRange::single()
            || self.supercell.is_some()
            || self.pack_unit_cell
            || self.centroid_unit_cell
    }
}
