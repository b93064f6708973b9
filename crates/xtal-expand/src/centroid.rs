//! Molecule-centroid trimming
//!
//! After an expansion over a padded cell range, whole molecules are kept or
//! dropped depending on where their fractional centroid falls.

use lin_alg::f64::Vec3;
use xtal_mol::Molecules;

use crate::request::{CellRange, ExpansionRequest, Tolerances};
use crate::result::ExpansionResult;

struct Bounds {
    range: CellRange,
    axes: usize,
    tol: Tolerances,
    packed: bool,
}

impl Bounds {
    fn contains(&self, c: Vec3) -> bool {
        let c = [c.x, c.y, c.z];
        (0..self.axes).all(|i| {
            let (min, max) = (self.range.min[i] as f64, self.range.max[i] as f64);
            if c[i] + self.tol.centroid_min_slop <= min {
                return false;
            }
            if self.packed {
                c[i] - self.tol.centroid_min_slop <= max
            } else {
                c[i] + self.tol.centroid_max_slop <= max
            }
        })
    }
}

fn mean(points: impl Iterator<Item = Vec3>) -> Vec3 {
    let (sum, n) = points.fold((Vec3::new(0.0, 0.0, 0.0), 0usize), |(s, n), p| (s + p, n + 1));
    if n == 0 {
        sum
    } else {
        sum * (1.0 / n as f64)
    }
}

/// Indices of atoms surviving the centroid test
fn keep_mask(result: &ExpansionResult, bounds: &Bounds) -> Vec<bool> {
    let n = result.atom_count();
    let molecules = Molecules::find(n, &result.bonds);
    if molecules.len() <= 1 {
        return result.fractional.iter().map(|f| bounds.contains(*f)).collect();
    }
    let mut keep = vec![false; n];
    for members in &molecules.members {
        let fracs = members.iter().map(|a| result.fractional[a.as_usize()]);
        let inside = if bounds.packed {
            fracs.clone().any(|f| bounds.contains(f))
        } else {
            bounds.contains(mean(fracs))
        };
        if inside {
            for a in members {
                keep[a.as_usize()] = true;
            }
        }
    }
    keep
}

/// Drop molecules whose centroid lies outside the requested cells
pub(crate) fn apply(result: &mut ExpansionResult, request: &ExpansionRequest) {
    let bounds = Bounds {
        range: request.cells.clamped(&result.cell),
        axes: result.cell.dimension().periodic_axes(),
        tol: request.tolerances,
        packed: request.centroid_packed,
    };
    let keep = keep_mask(result, &bounds);
    let dropped = keep.iter().filter(|k| !**k).count();
    if dropped > 0 {
        log::debug!("Centroid filter dropped {dropped} of {} atoms", keep.len());
        result.retain_atoms(&keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(packed: bool) -> Bounds {
        Bounds {
            range: CellRange::single(),
            axes: 3,
            tol: Tolerances::default(),
            packed,
        }
    }

    #[test]
    fn test_lower_face_is_inside() {
        let b = bounds(false);
        assert!(b.contains(Vec3::new(0.0, 0.5, 0.5)));
        assert!(!b.contains(Vec3::new(-0.01, 0.5, 0.5)));
    }

    #[test]
    fn test_upper_face_depends_on_packing() {
        let on_face = Vec3::new(1.0, 0.5, 0.5);
        assert!(!bounds(false).contains(on_face));
        assert!(bounds(true).contains(on_face));
        assert!(!bounds(true).contains(Vec3::new(1.01, 0.5, 0.5)));
    }
}
