//! Quaternion math for frame-to-frame rotation analysis
//!
//! Symmetry operations are analysed by mapping a local coordinate frame and
//! comparing the quaternions of the frames before and after the operation.

use lin_alg::f64::Vec3;

/// A unit quaternion representing a rotation.
///
/// Stored as (w, x, y, z) where w is the scalar part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quat {
    /// Create a new quaternion
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Identity quaternion (no rotation)
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Extract a quaternion from a 3×3 row-major rotation matrix.
    ///
    /// The matrix is assumed to be a proper rotation (orthonormal, det=+1).
    /// Uses Shepperd's method for numerical stability.
    pub fn from_rotation_3x3(m: &[f64; 9]) -> Self {
        // m[row*3 + col]
        let m00 = m[0];
        let m11 = m[4];
        let m22 = m[8];
        let trace = m00 + m11 + m22;

        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0; // s = 4*w
            Self {
                w: 0.25 * s,
                x: (m[7] - m[5]) / s, // (m21 - m12) / s
                y: (m[2] - m[6]) / s, // (m02 - m20) / s
                z: (m[3] - m[1]) / s, // (m10 - m01) / s
            }
        } else if m00 > m11 && m00 > m22 {
            let s = (1.0 + m00 - m11 - m22).sqrt() * 2.0; // s = 4*x
            Self {
                w: (m[7] - m[5]) / s,
                x: 0.25 * s,
                y: (m[1] + m[3]) / s, // (m01 + m10) / s
                z: (m[2] + m[6]) / s, // (m02 + m20) / s
            }
        } else if m11 > m22 {
            let s = (1.0 + m11 - m00 - m22).sqrt() * 2.0; // s = 4*y
            Self {
                w: (m[2] - m[6]) / s,
                x: (m[1] + m[3]) / s,
                y: 0.25 * s,
                z: (m[5] + m[7]) / s, // (m12 + m21) / s
            }
        } else {
            let s = (1.0 + m22 - m00 - m11).sqrt() * 2.0; // s = 4*z
            Self {
                w: (m[3] - m[1]) / s,
                x: (m[2] + m[6]) / s,
                y: (m[5] + m[7]) / s,
                z: 0.25 * s,
            }
        };
        q.normalized()
    }

    /// Quaternion of the right-handed orthonormal frame spanned at `origin`
    /// by the direction to `px` (x axis) and the plane containing `pxy`.
    pub fn from_frame(origin: Vec3, px: Vec3, pxy: Vec3) -> Self {
        let vx = (px - origin).to_normalized();
        let vxy = pxy - origin;
        let vy = (vxy - vx * vxy.dot(vx)).to_normalized();
        let vz = vx.cross(vy);
        // Frame axes are the matrix columns
        Self::from_rotation_3x3(&[vx.x, vy.x, vz.x, vx.y, vy.y, vz.y, vx.z, vy.z, vz.z])
    }

    /// Convert this quaternion to a 3×3 row-major rotation matrix.
    pub fn to_rotation_3x3(&self) -> [f64; 9] {
        let Quat { w, x, y, z } = *self;

        let x2 = x + x;
        let y2 = y + y;
        let z2 = z + z;
        let xx = x * x2;
        let xy = x * y2;
        let xz = x * z2;
        let yy = y * y2;
        let yz = y * z2;
        let zz = z * z2;
        let wx = w * x2;
        let wy = w * y2;
        let wz = w * z2;

        [
            1.0 - (yy + zz),
            xy - wz,
            xz + wy,
            xy + wz,
            1.0 - (xx + zz),
            yz - wx,
            xz - wy,
            yz + wx,
            1.0 - (xx + yy),
        ]
    }

    /// Hamilton product `self * other`
    pub fn mul(&self, other: &Self) -> Self {
        Self {
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            x: self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            y: self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            z: self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        }
    }

    /// Inverse of a unit quaternion
    pub fn conjugate(&self) -> Self {
        Self {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Relative rotation `self * other⁻¹`: the rotation taking frame `other`
    /// onto frame `self`.
    pub fn div(&self, other: &Self) -> Self {
        self.mul(&other.conjugate()).normalized()
    }

    /// Dot product of two quaternions.
    pub fn dot(&self, other: &Self) -> f64 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Normalize this quaternion.
    pub fn normalized(&self) -> Self {
        let len = self.dot(self).sqrt();
        if len < 1e-10 {
            Self::identity()
        } else {
            let inv = 1.0 / len;
            Self {
                w: self.w * inv,
                x: self.x * inv,
                y: self.y * inv,
                z: self.z * inv,
            }
        }
    }

    /// Rotation angle in degrees, in `[0, 180]`, with its unit axis.
    ///
    /// The quaternion is flipped into the `w >= 0` hemisphere first, so the
    /// axis direction carries the sense of rotation. A zero rotation returns
    /// the z axis.
    pub fn axis_angle(&self) -> (Vec3, f64) {
        let q = if self.w < 0.0 {
            Self::new(-self.w, -self.x, -self.y, -self.z)
        } else {
            *self
        };
        let v = Vec3::new(q.x, q.y, q.z);
        let s = v.magnitude();
        if s < 1e-10 {
            return (Vec3::new(0.0, 0.0, 1.0), 0.0);
        }
        let angle = 2.0 * s.atan2(q.w);
        (v * (1.0 / s), angle.to_degrees())
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}
