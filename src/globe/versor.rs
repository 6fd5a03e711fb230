//! Unit quaternions ("versors") used to compose globe rotations.
//!
//! Components are stored as `w + xi + yj + zk`. Conversions to and from a
//! [`Rotation`] follow the yaw/pitch/roll convention of the projection engine,
//! so a drag can be computed as `start * delta(v0, v1)` and fed straight back
//! into [`Projection::set_rotation`](super::Projection::set_rotation).

use std::ops::Mul;

use glam::DVec3;

use super::projection::Rotation;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Versor {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Versor {
    pub const IDENTITY: Versor = Versor {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Rotation of `angle` radians about `axis`. A zero axis yields the identity.
    pub fn from_axis_angle(axis: DVec3, angle: f64) -> Self {
        let axis = axis.normalize_or_zero();
        if axis == DVec3::ZERO {
            return Self::IDENTITY;
        }
        let (s, c) = (angle / 2.0).sin_cos();
        Self::new(c, axis.x * s, axis.y * s, axis.z * s)
    }

    /// Versor equivalent of a yaw/pitch/roll triple (degrees).
    pub fn from_rotation(r: Rotation) -> Self {
        let (sl, cl) = (r.yaw.to_radians() / 2.0).sin_cos();
        let (sp, cp) = (r.pitch.to_radians() / 2.0).sin_cos();
        let (sg, cg) = (r.roll.to_radians() / 2.0).sin_cos();
        Self::new(
            cl * cp * cg + sl * sp * sg,
            sl * cp * cg - cl * sp * sg,
            cl * sp * cg + sl * cp * sg,
            cl * cp * sg - sl * sp * cg,
        )
    }

    /// Back to a yaw/pitch/roll triple (degrees).
    pub fn to_rotation(self) -> Rotation {
        let Self { w, x, y, z } = self;
        Rotation {
            yaw: (2.0 * (w * x + y * z))
                .atan2(1.0 - 2.0 * (x * x + y * y))
                .to_degrees(),
            pitch: (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin().to_degrees(),
            roll: (2.0 * (w * z + x * y))
                .atan2(1.0 - 2.0 * (y * y + z * z))
                .to_degrees(),
        }
    }

    /// Rotation carrying unit vector `v0` onto `v1`, expressed in rotation
    /// space (the cross product axis is permuted to match yaw/pitch/roll).
    pub fn delta(v0: DVec3, v1: DVec3) -> Self {
        let w = v0.cross(v1);
        let len = w.length();
        if len <= f64::EPSILON {
            return Self::IDENTITY;
        }
        let angle = v0.dot(v1).clamp(-1.0, 1.0).acos();
        Self::from_axis_angle(DVec3::new(w.z, -w.y, w.x) / len, angle)
    }

    #[inline]
    pub fn norm(self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalize(self) -> Self {
        let n = self.norm();
        if n <= f64::EPSILON {
            return Self::IDENTITY;
        }
        Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }
}

impl Default for Versor {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Versor {
    type Output = Versor;

    /// Hamilton product.
    fn mul(self, q: Versor) -> Versor {
        let p = self;
        Versor::new(
            p.w * q.w - p.x * q.x - p.y * q.y - p.z * q.z,
            p.w * q.x + p.x * q.w + p.y * q.z - p.z * q.y,
            p.w * q.y - p.x * q.z + p.y * q.w + p.z * q.x,
            p.w * q.z + p.x * q.y - p.y * q.x + p.z * q.w,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Rotation, b: Rotation) -> bool {
        (a.yaw - b.yaw).abs() < 1e-9 && (a.pitch - b.pitch).abs() < 1e-9 && (a.roll - b.roll).abs() < 1e-9
    }

    #[test]
    fn test_rotation_roundtrip() {
        for r in [
            Rotation::new(40.0, -20.0, 0.0),
            Rotation::new(-120.0, 60.0, 10.0),
            Rotation::new(0.0, 0.0, 0.0),
        ] {
            assert!(close(Versor::from_rotation(r).to_rotation(), r), "{r:?}");
        }
    }

    #[test]
    fn test_identity_multiply() {
        let q = Versor::from_rotation(Rotation::new(30.0, 10.0, 0.0));
        assert_eq!(q * Versor::IDENTITY, q);
        assert_eq!(Versor::IDENTITY * q, q);
    }

    #[test]
    fn test_composition_of_yaws() {
        let a = Versor::from_rotation(Rotation::new(20.0, 0.0, 0.0));
        let b = Versor::from_rotation(Rotation::new(25.0, 0.0, 0.0));
        let r = (a * b).to_rotation();
        assert!((r.yaw - 45.0).abs() < 1e-9);
        assert!(r.pitch.abs() < 1e-9);
    }

    #[test]
    fn test_delta_same_vector_is_identity() {
        let v = DVec3::new(0.0, 1.0, 0.0);
        assert_eq!(Versor::delta(v, v), Versor::IDENTITY);
    }

    #[test]
    fn test_delta_is_unit() {
        let q = Versor::delta(DVec3::X, DVec3::new(0.6, 0.8, 0.0));
        assert!((q.norm() - 1.0).abs() < 1e-12);
        // Rotating X toward Y about the polar axis is a pure yaw.
        let r = q.to_rotation();
        assert!((r.yaw - 0.8f64.asin().to_degrees()).abs() < 1e-9);
        assert!(r.pitch.abs() < 1e-9);
    }

    #[test]
    fn test_zero_axis_is_identity() {
        assert_eq!(Versor::from_axis_angle(DVec3::ZERO, 1.0), Versor::IDENTITY);
    }
}
