//! Geometric classification of symmetry operations
//!
//! A Cartesian frame at the origin is pushed through the operation. The
//! handedness of the image frame detects inversion; the relative rotation
//! between the frames (as a quaternion) gives the axis and angle, and the
//! image of the origin gives the translation, which is split into its
//! intrinsic (screw or glide) and location parts.

use lin_alg::f64::Vec3;
use serde::{Deserialize, Serialize};

use super::operation::SymmetryOperation;
use super::unit_cell::UnitCell;
use crate::linalg::{transform_3x3, try_invert_3x3, Quat, IDENTITY_3X3};

/// Below this length (Å or fractional units) a vector counts as zero
const ZERO_TOL: f64 = 1e-3;

/// Letter of a glide plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlideKind {
    A,
    B,
    C,
    /// Diagonal glide
    N,
    /// Diamond glide
    D,
}

impl GlideKind {
    pub fn letter(self) -> char {
        match self {
            GlideKind::A => 'a',
            GlideKind::B => 'b',
            GlideKind::C => 'c',
            GlideKind::N => 'n',
            GlideKind::D => 'd',
        }
    }
}

/// Geometric type of an operation with the parameters relevant to it.
///
/// Points and directions are Cartesian, in the frame of the cell the
/// operation was classified against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OperationKind {
    Identity,
    /// Pure translation
    Translation { vector: Vec3 },
    Inversion { center: Vec3 },
    /// Proper rotation, optionally a screw when `pitch` is non-zero.
    /// `angle` is signed for the canonical `axis` direction.
    Rotation {
        order: u32,
        angle: f64,
        axis_point: Vec3,
        axis: Vec3,
        pitch: Vec3,
    },
    /// Rotation followed by inversion through `center`
    RotoInversion {
        order: u32,
        angle: f64,
        axis: Vec3,
        center: Vec3,
    },
    Mirror { point: Vec3, normal: Vec3 },
    Glide {
        point: Vec3,
        normal: Vec3,
        translation: Vec3,
        kind: GlideKind,
    },
}

impl OperationKind {
    pub fn has_inversion(&self) -> bool {
        matches!(
            self,
            OperationKind::Inversion { .. }
                | OperationKind::RotoInversion { .. }
                | OperationKind::Mirror { .. }
                | OperationKind::Glide { .. }
        )
    }

    /// Short name such as `"C2 axis"`, `"3-bar axis"` or `"n-glide plane"`
    pub fn label(&self) -> String {
        match self {
            OperationKind::Identity => "identity".to_string(),
            OperationKind::Translation { .. } => "translation".to_string(),
            OperationKind::Inversion { .. } => "inversion center".to_string(),
            OperationKind::Rotation { order, pitch, .. } => {
                if pitch.magnitude() > ZERO_TOL {
                    format!("{order}-fold screw axis")
                } else {
                    format!("C{order} axis")
                }
            }
            OperationKind::RotoInversion { order, .. } => format!("{order}-bar axis"),
            OperationKind::Mirror { .. } => "mirror plane".to_string(),
            OperationKind::Glide { kind, .. } => format!("{}-glide plane", kind.letter()),
        }
    }
}

/// Classification together with the translation in both frames
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescription {
    pub kind: OperationKind,
    pub label: String,
    /// Translation part of the operation, fractional
    pub translation: Vec3,
    /// Screw, glide or lattice translation, fractional
    pub intrinsic_translation: Vec3,
    /// Image of the origin, Cartesian
    pub cartesian_translation: Vec3,
}

impl SymmetryOperation {
    /// Classify against a unit cube, where Cartesian and fractional agree
    pub fn classify(&self) -> OperationKind {
        self.describe(&UnitCell::default()).kind
    }

    /// Classify the operation in the Cartesian frame of `cell`
    pub fn describe(&self, cell: &UnitCell) -> OperationDescription {
        let zero = Vec3::new(0.0, 0.0, 0.0);
        let map = |c: Vec3| {
            if self.is_bio() {
                self.apply(c, zero)
            } else {
                cell.to_cartesian(self.apply(cell.to_fractional(c, true), zero), true)
            }
        };
        let to_frac = |c: Vec3| {
            if self.is_bio() {
                c
            } else {
                cell.to_fractional(c, true)
            }
        };

        let probes = [
            zero,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let mut p = probes.map(map);
        let t = p[0];
        let v = [p[1] - t, p[2] - t, p[3] - t];
        let inverted = v[0].cross(v[1]).dot(v[2]) < 0.0;
        if inverted {
            for i in 1..4 {
                p[i] = t - v[i - 1];
            }
        }

        let q = Quat::from_frame(p[0], p[1], p[2]).div(&Quat::from_frame(probes[0], probes[1], probes[2]));
        let (axis, raw_angle) = q.axis_angle();
        let angle = raw_angle.round();

        let kind = if angle == 0.0 {
            if inverted {
                OperationKind::Inversion {
                    center: round_vec(t * 0.5),
                }
            } else if to_frac(t).magnitude() < ZERO_TOL {
                OperationKind::Identity
            } else {
                OperationKind::Translation {
                    vector: round_vec(t),
                }
            }
        } else if inverted && angle == 180.0 {
            let normal = canonical_axis(axis).0;
            let along = t.dot(normal);
            let glide = t - normal * along;
            let point = round_vec(normal * (along * 0.5));
            if glide.magnitude() < ZERO_TOL {
                OperationKind::Mirror { point, normal }
            } else {
                OperationKind::Glide {
                    point,
                    normal,
                    translation: round_vec(glide),
                    kind: glide_kind(to_frac(glide)),
                }
            }
        } else {
            let order = (360.0 / angle).round() as u32;
            let (axis, sense) = canonical_axis(axis);
            if inverted {
                // fixed point of x -> Lx + t solves (I - L) x = t
                let l = self.cartesian_linear(cell);
                let mut m = IDENTITY_3X3;
                for (mi, li) in m.iter_mut().zip(l.iter()) {
                    *mi -= li;
                }
                let center = try_invert_3x3(&m)
                    .map(|inv| transform_3x3(&inv, t))
                    .unwrap_or(zero);
                OperationKind::RotoInversion {
                    order,
                    angle: angle * sense,
                    axis,
                    center: round_vec(center),
                }
            } else {
                let pitch = axis * t.dot(axis);
                let perp = t - pitch;
                let half = (angle * 0.5).to_radians();
                let axis_point = (perp + axis.cross(perp) * (half.cos() / half.sin())) * 0.5;
                OperationKind::Rotation {
                    order,
                    angle: angle * sense,
                    axis_point: round_vec(axis_point),
                    axis,
                    pitch: round_vec(pitch),
                }
            }
        };

        let intrinsic = match &kind {
            OperationKind::Translation { vector } => to_frac(*vector),
            OperationKind::Rotation { pitch, .. } => to_frac(*pitch),
            OperationKind::Glide { translation, .. } => to_frac(*translation),
            _ => zero,
        };
        OperationDescription {
            label: kind.label(),
            kind,
            translation: self.translation_3(),
            intrinsic_translation: round_vec(intrinsic),
            cartesian_translation: round_vec(t),
        }
    }
}

/// Point the axis into the upper half-space (`z > 0`, then `y > 0`, then
/// `x > 0`); the returned sign flips the rotation sense to match
fn canonical_axis(axis: Vec3) -> (Vec3, f64) {
    let a = round_vec(axis);
    let flip = a.z < 0.0 || (a.z == 0.0 && (a.y < 0.0 || (a.y == 0.0 && a.x < 0.0)));
    if flip {
        (a * -1.0, -1.0)
    } else {
        (a, 1.0)
    }
}

fn glide_kind(frac: Vec3) -> GlideKind {
    let c = [frac.x, frac.y, frac.z];
    let nonzero: Vec<usize> = (0..3).filter(|&i| c[i].abs() > ZERO_TOL).collect();
    let is_quarter = |v: f64| {
        let r = v.abs().fract();
        (r - 0.25).abs() < ZERO_TOL || (r - 0.75).abs() < ZERO_TOL
    };
    if nonzero.iter().any(|&i| is_quarter(c[i])) {
        GlideKind::D
    } else if nonzero.len() >= 2 {
        GlideKind::N
    } else {
        match nonzero.first() {
            Some(0) => GlideKind::A,
            Some(1) => GlideKind::B,
            _ => GlideKind::C,
        }
    }
}

fn round_vec(v: Vec3) -> Vec3 {
    let r = |x: f64| {
        let y = (x * 1e4).round() / 1e4;
        if y == 0.0 {
            0.0
        } else {
            y
        }
    };
    Vec3::new(r(v.x), r(v.y), r(v.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(s: &str) -> SymmetryOperation {
        SymmetryOperation::parse(s, 0).unwrap()
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).magnitude() < 1e-4
    }

    #[test]
    fn test_identity_and_translation() {
        assert_eq!(op("x,y,z").classify(), OperationKind::Identity);
        match op("x,y,z+1/2").classify() {
            OperationKind::Translation { vector } => {
                assert!(close(vector, Vec3::new(0.0, 0.0, 0.5)))
            }
            other => panic!("expected translation, got {other:?}"),
        }
    }

    #[test]
    fn test_twofold_axis() {
        match op("-x,-y,z").classify() {
            OperationKind::Rotation {
                order,
                pitch,
                axis,
                axis_point,
                ..
            } => {
                assert_eq!(order, 2);
                assert!(pitch.magnitude() < 1e-4);
                assert!(close(axis, Vec3::new(0.0, 0.0, 1.0)));
                assert!(close(axis_point, Vec3::new(0.0, 0.0, 0.0)));
            }
            other => panic!("expected rotation, got {other:?}"),
        }
        assert_eq!(op("-x,-y,z").classify().label(), "C2 axis");
    }

    #[test]
    fn test_inversion() {
        match op("-x,-y,-z").classify() {
            OperationKind::Inversion { center } => assert!(close(center, Vec3::new(0.0, 0.0, 0.0))),
            other => panic!("expected inversion, got {other:?}"),
        }
        match op("-x+1/2,-y,-z").classify() {
            OperationKind::Inversion { center } => {
                assert!(close(center, Vec3::new(0.25, 0.0, 0.0)))
            }
            other => panic!("expected inversion, got {other:?}"),
        }
    }

    #[test]
    fn test_screw_and_offset_axis() {
        let d = op("-x,-y,z+1/2").describe(&UnitCell::default());
        assert_eq!(d.label, "2-fold screw axis");
        assert!(close(d.intrinsic_translation, Vec3::new(0.0, 0.0, 0.5)));

        match op("-x+1/2,-y,z").classify() {
            OperationKind::Rotation { axis_point, pitch, .. } => {
                assert!(close(axis_point, Vec3::new(0.25, 0.0, 0.0)));
                assert!(pitch.magnitude() < 1e-4);
            }
            other => panic!("expected rotation, got {other:?}"),
        }
    }

    #[test]
    fn test_fourfold_and_sense() {
        match op("-y,x,z").classify() {
            OperationKind::Rotation { order, angle, axis, .. } => {
                assert_eq!(order, 4);
                assert!((angle - 90.0).abs() < 1e-6);
                assert!(close(axis, Vec3::new(0.0, 0.0, 1.0)));
            }
            other => panic!("expected rotation, got {other:?}"),
        }
        match op("y,-x,z").classify() {
            OperationKind::Rotation { angle, axis, .. } => {
                assert!((angle + 90.0).abs() < 1e-6);
                assert!(close(axis, Vec3::new(0.0, 0.0, 1.0)));
            }
            other => panic!("expected rotation, got {other:?}"),
        }
    }

    #[test]
    fn test_rotoinversion() {
        let kind = op("-y,x,-z").classify();
        match kind {
            OperationKind::RotoInversion { order, center, .. } => {
                assert_eq!(order, 4);
                assert!(close(center, Vec3::new(0.0, 0.0, 0.0)));
            }
            other => panic!("expected rotoinversion, got {other:?}"),
        }
        assert_eq!(kind.label(), "4-bar axis");
    }

    #[test]
    fn test_mirror_and_glides() {
        match op("x,-y,z").classify() {
            OperationKind::Mirror { normal, .. } => assert!(close(normal, Vec3::new(0.0, 1.0, 0.0))),
            other => panic!("expected mirror, got {other:?}"),
        }
        match op("x,-y+1/2,z").classify() {
            OperationKind::Mirror { point, .. } => assert!(close(point, Vec3::new(0.0, 0.25, 0.0))),
            other => panic!("expected mirror, got {other:?}"),
        }
        assert_eq!(op("x+1/2,-y,z").classify().label(), "a-glide plane");
        assert_eq!(op("x,-y,z+1/2").classify().label(), "c-glide plane");
        assert_eq!(op("x+1/2,-y,z+1/2").classify().label(), "n-glide plane");
        assert_eq!(op("x+1/4,-y,z+1/4").classify().label(), "d-glide plane");
    }

    #[test]
    fn test_describe_in_hexagonal_cell() {
        let cell = UnitCell::new([5.0, 5.0, 8.0], [90.0, 90.0, 120.0]);
        let d = op("-y,x-y,z").describe(&cell);
        match d.kind {
            OperationKind::Rotation { order, axis, .. } => {
                assert_eq!(order, 3);
                assert!(close(axis, Vec3::new(0.0, 0.0, 1.0)));
            }
            other => panic!("expected rotation, got {other:?}"),
        }
        let screw = op("-y,x-y,z+1/3").describe(&cell);
        assert_eq!(screw.label, "3-fold screw axis");
        assert!((screw.cartesian_translation.z - 8.0 / 3.0).abs() < 1e-3);
    }
}
