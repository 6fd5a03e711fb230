use std::f64::consts::PI;

use crate::geo::{wrap_lon, LonLat};

/// Clip angle of the orthographic projection: one hemisphere is always hidden.
pub const CLIP_ANGLE: f64 = 90.0;

/// Viewport dimensions in Braille dots.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Viewport center in dots.
    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }

    pub fn is_empty(&self) -> bool {
        !(self.width >= 1.0 && self.height >= 1.0)
    }
}

/// Globe orientation in degrees: yaw spins about the polar axis, pitch tilts
/// the poles toward or away from the viewer, roll turns the view about the
/// line of sight.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotation {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl Rotation {
    pub const fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Orientation that puts (lon, lat) at the center of the disk.
    pub fn centering(lon: f64, lat: f64) -> Self {
        Self::new(-lon, -lat, 0.0)
    }

    /// Same orientation with the roll dropped (keeps north up on screen).
    pub fn level(self) -> Self {
        Self { roll: 0.0, ..self }
    }

    /// Component-wise linear interpolation.
    pub fn lerp(self, to: Rotation, t: f64) -> Self {
        Self {
            yaw: self.yaw + (to.yaw - self.yaw) * t,
            pitch: self.pitch + (to.pitch - self.pitch) * t,
            roll: self.roll + (to.roll - self.roll) * t,
        }
    }
}

/// Orthographic projection of the rotated unit sphere onto the screen.
///
/// The trig of the current rotation is cached; every setter rebuilds it, so a
/// projection is always consistent with its rotation, scale, and translation.
#[derive(Clone, Debug)]
pub struct Projection {
    rotation: Rotation,
    /// Dots per unit of sphere radius
    scale: f64,
    /// Screen position of the disk center
    translate: (f64, f64),
    /// Adaptive sampling tolerance in dots
    precision: f64,
    delta_lambda: f64,
    cos_phi: f64,
    sin_phi: f64,
    cos_gamma: f64,
    sin_gamma: f64,
}

impl Projection {
    pub fn new(rotation: Rotation, precision: f64) -> Self {
        let mut projection = Self {
            rotation,
            scale: 1.0,
            translate: (0.0, 0.0),
            precision: precision.max(0.01),
            delta_lambda: 0.0,
            cos_phi: 1.0,
            sin_phi: 0.0,
            cos_gamma: 1.0,
            sin_gamma: 0.0,
        };
        projection.rebuild();
        projection
    }

    fn rebuild(&mut self) {
        self.delta_lambda = self.rotation.yaw.to_radians().rem_euclid(2.0 * PI);
        (self.sin_phi, self.cos_phi) = self.rotation.pitch.to_radians().sin_cos();
        (self.sin_gamma, self.cos_gamma) = self.rotation.roll.to_radians().sin_cos();
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
        self.rebuild();
    }

    /// A copy of this projection with a different rotation.
    pub fn with_rotation(&self, rotation: Rotation) -> Self {
        let mut copy = self.clone();
        copy.set_rotation(rotation);
        copy
    }

    /// Size the disk to `scale_factor * min(width, height) / 2` and center it.
    pub fn fit(&mut self, viewport: Viewport, scale_factor: f64) {
        self.scale = scale_factor * viewport.min_side() / 2.0;
        self.translate = viewport.center();
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn translate(&self) -> (f64, f64) {
        self.translate
    }

    pub fn precision(&self) -> f64 {
        self.precision
    }

    /// Rotate geographic radians into view-space radians.
    fn rotate(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let mut lambda = lambda + self.delta_lambda;
        if lambda > PI {
            lambda -= 2.0 * PI;
        } else if lambda < -PI {
            lambda += 2.0 * PI;
        }

        let cos_p = phi.cos();
        let x = lambda.cos() * cos_p;
        let y = lambda.sin() * cos_p;
        let z = phi.sin();
        let k = z * self.cos_phi + x * self.sin_phi;
        (
            (y * self.cos_gamma - k * self.sin_gamma).atan2(x * self.cos_phi - z * self.sin_phi),
            (k * self.cos_gamma + y * self.sin_gamma).clamp(-1.0, 1.0).asin(),
        )
    }

    /// Inverse of [`rotate`](Self::rotate).
    fn unrotate(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let cos_p = phi.cos();
        let x = lambda.cos() * cos_p;
        let y = lambda.sin() * cos_p;
        let z = phi.sin();
        let k = z * self.cos_gamma - y * self.sin_gamma;
        let lambda = (y * self.cos_gamma + z * self.sin_gamma).atan2(x * self.cos_phi + k * self.sin_phi);
        let phi = (k * self.cos_phi - x * self.sin_phi).clamp(-1.0, 1.0).asin();
        (lambda - self.delta_lambda, phi)
    }

    /// Screen position plus depth (positive = facing the viewer), ignoring the clip.
    fn project_raw(&self, lon: f64, lat: f64) -> ((f64, f64), f64) {
        let (lambda, phi) = self.rotate(lon.to_radians(), lat.to_radians());
        let cos_p = phi.cos();
        let x = cos_p * lambda.sin();
        let y = phi.sin();
        let depth = cos_p * lambda.cos();
        let (tx, ty) = self.translate;
        ((tx + x * self.scale, ty - y * self.scale), depth)
    }

    /// Project a geographic point to screen dots.
    /// Returns `None` for points on the hidden hemisphere.
    pub fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let (p, depth) = self.project_raw(lon, lat);
        (depth > CLIP_ANGLE.to_radians().cos()).then_some(p)
    }

    /// Where the point would land if the globe were transparent.
    pub fn project_unclipped(&self, lon: f64, lat: f64) -> (f64, f64) {
        self.project_raw(lon, lat).0
    }

    #[inline]
    pub fn is_visible(&self, lon: f64, lat: f64) -> bool {
        self.project_raw(lon, lat).1 > CLIP_ANGLE.to_radians().cos()
    }

    /// Unproject screen dots back to lon/lat.
    /// Returns `None` outside the projected disk.
    pub fn invert(&self, x: f64, y: f64) -> Option<LonLat> {
        if self.scale <= 0.0 {
            return None;
        }
        let (tx, ty) = self.translate;
        let sx = (x - tx) / self.scale;
        let sy = (ty - y) / self.scale;

        let r2 = sx * sx + sy * sy;
        if r2 > 1.0 {
            return None;
        }

        let lambda = sx.atan2((1.0 - r2).sqrt());
        let phi = sy.clamp(-1.0, 1.0).asin();
        let (lambda, phi) = self.unrotate(lambda, phi);
        Some((wrap_lon(lambda.to_degrees()), phi.to_degrees()))
    }

    /// True when the screen point falls on the projected disk.
    #[inline]
    pub fn disk_contains(&self, x: f64, y: f64) -> bool {
        let (tx, ty) = self.translate;
        let dx = x - tx;
        let dy = y - ty;
        dx * dx + dy * dy <= self.scale * self.scale
    }

    /// Geographic point currently at the center of the disk.
    pub fn center_lonlat(&self) -> LonLat {
        let (lambda, phi) = self.unrotate(0.0, 0.0);
        (wrap_lon(lambda.to_degrees()), phi.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted(rotation: Rotation) -> Projection {
        let mut p = Projection::new(rotation, 0.5);
        p.fit(Viewport::new(400.0, 200.0), 1.0);
        p
    }

    fn lon_diff(a: f64, b: f64) -> f64 {
        wrap_lon(a - b).abs()
    }

    #[test]
    fn test_center_projects_to_translate() {
        let p = fitted(Rotation::default());
        let (x, y) = p.project(0.0, 0.0).unwrap();
        assert!((x - 200.0).abs() < 1e-9);
        assert!((y - 100.0).abs() < 1e-9);
        assert!((p.scale() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_far_side_is_clipped() {
        let p = fitted(Rotation::default());
        assert!(p.project(180.0, 0.0).is_none());
        assert!(p.project(120.0, 10.0).is_none());
        assert!(!p.is_visible(-95.0, 0.0));
        assert!(p.is_visible(60.0, 50.0));
    }

    #[test]
    fn test_invert_outside_disk() {
        let p = fitted(Rotation::default());
        assert!(p.invert(0.0, 0.0).is_none());
        assert!(p.invert(200.0, 100.0).is_some());
    }

    #[test]
    fn test_roundtrip_near_hemisphere() {
        for rotation in [
            Rotation::new(40.0, -20.0, 0.0),
            Rotation::new(-150.0, 35.0, 0.0),
            Rotation::new(10.0, 30.0, 15.0),
        ] {
            let p = fitted(rotation);
            let (clon, clat) = p.center_lonlat();
            for dlon in [-60.0, -25.0, 0.0, 30.0, 70.0] {
                for dlat in [-50.0, -10.0, 0.0, 20.0, 55.0] {
                    let lon = wrap_lon(clon + dlon);
                    let lat = (clat + dlat).clamp(-85.0, 85.0);
                    let Some((x, y)) = p.project(lon, lat) else {
                        continue;
                    };
                    let (ilon, ilat) = p.invert(x, y).unwrap();
                    assert!(lon_diff(ilon, lon) < 1e-6, "{rotation:?} lon {lon} -> {ilon}");
                    assert!((ilat - lat).abs() < 1e-6, "{rotation:?} lat {lat} -> {ilat}");
                }
            }
        }
    }

    #[test]
    fn test_centering_rotation() {
        let p = fitted(Rotation::centering(90.0, 0.0));
        let (x, y) = p.project(90.0, 0.0).unwrap();
        assert!((x - 200.0).abs() < 1e-9);
        assert!((y - 100.0).abs() < 1e-9);

        let p = fitted(Rotation::centering(-30.0, 45.0));
        let (lon, lat) = p.center_lonlat();
        assert!(lon_diff(lon, -30.0) < 1e-9);
        assert!((lat - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_north_is_up() {
        let p = fitted(Rotation::default());
        let (_, y_north) = p.project(0.0, 30.0).unwrap();
        let (_, y_south) = p.project(0.0, -30.0).unwrap();
        assert!(y_north < y_south);
        let (x_east, _) = p.project(30.0, 0.0).unwrap();
        assert!(x_east > 200.0);
    }

    #[test]
    fn test_lerp_and_level() {
        let a = Rotation::new(0.0, 0.0, 0.0);
        let b = Rotation::new(-90.0, 10.0, 4.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(b.level().roll, 0.0);
    }
}
