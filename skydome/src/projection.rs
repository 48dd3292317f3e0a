//! Hemisphere-clipped orthographic projection of the celestial sphere.
//!
//! The view is described by a [`Rotation`] `(lambda, phi)` in degrees, applied
//! the way d3's `geoOrthographic().rotate([lambda, phi])` does: the sphere is
//! first spun by `lambda` about the polar axis and then tipped by `phi` about
//! the screen's horizontal axis. The point facing the viewer is therefore
//! `(ra = -lambda, dec = -phi)`.
//!
//! # Screen Geometry
//! ```text
//! rotated unit vector (x', y', z')
//! visible      iff x' >= -HORIZON_EPSILON
//! screen_x     =  tx + scale * y'
//! screen_y     =  ty - scale * z'      (SVG y grows downward)
//! ```
//! For the sky dome `scale = radius` and `(tx, ty) = (radius, radius)`, so every
//! visible point lands inside the disc of radius `radius` centred at
//! `(radius, radius)`. Points beyond 90° from the centre map to the non-finite
//! [`ScreenPoint::OFF_DISC`] sentinel.

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::coords::SphericalCoord;

/// Tolerance on the rotated x component when deciding horizon membership.
///
/// Points exactly 90° from the view centre are kept: `cos(90°)` evaluates to
/// about `6e-17` or `-6e-17` depending on the path through the trig functions,
/// and both must land on the disc rim rather than flicker in and out.
pub const HORIZON_EPSILON: f64 = 1e-12;

/// Orientation of the projection in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    /// Spin about the polar axis (added to right ascension)
    pub lambda: f64,
    /// Tilt about the screen's horizontal axis
    pub phi: f64,
}

impl Rotation {
    pub fn new(lambda: f64, phi: f64) -> Self {
        Self { lambda, phi }
    }

    /// Linear interpolation toward `target`; `t` is clamped to `[0, 1]`.
    pub fn lerp(&self, target: &Rotation, t: f64) -> Rotation {
        let t = t.clamp(0.0, 1.0);
        Rotation {
            lambda: self.lambda + (target.lambda - self.lambda) * t,
            phi: self.phi + (target.phi - self.phi) * t,
        }
    }

    /// Euclidean distance in (lambda, phi) degree space.
    pub fn distance_to(&self, target: &Rotation) -> f64 {
        (target.lambda - self.lambda).hypot(target.phi - self.phi)
    }

    /// The sky coordinate that faces the viewer under this rotation.
    pub fn center(&self) -> SphericalCoord {
        SphericalCoord::new(-self.lambda, -self.phi)
    }

    /// World → view rotation matrix.
    pub fn matrix(&self) -> Rotation3<f64> {
        let spin = Rotation3::from_axis_angle(&Vector3::z_axis(), self.lambda.to_radians());
        let tilt = Rotation3::from_axis_angle(&Vector3::y_axis(), -self.phi.to_radians());
        tilt * spin
    }
}

/// A projected screen position.
///
/// Off-disc points carry non-finite coordinates; see [`ScreenPoint::OFF_DISC`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    /// Sentinel for points on the far hemisphere
    pub const OFF_DISC: ScreenPoint = ScreenPoint {
        x: f64::NAN,
        y: f64::NAN,
    };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when both coordinates are finite, i.e. the point is on the disc
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance_to(&self, other: &ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// An orthographic projection with explicit scale and translation.
///
/// The sky dome uses [`ViewState::projection`]; the moon's phase disc uses a
/// second, much smaller projection centred on the moon's screen position.
#[derive(Debug, Clone, Copy)]
pub struct OrthographicProjection {
    rotation: Rotation3<f64>,
    scale: f64,
    translate: (f64, f64),
}

impl OrthographicProjection {
    pub fn new(rotation: &Rotation, scale: f64, translate: (f64, f64)) -> Self {
        Self {
            rotation: rotation.matrix(),
            scale,
            translate,
        }
    }

    /// Rotate a world unit vector into the view frame (x toward the viewer)
    pub fn to_view(&self, world: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * world
    }

    /// Rotate a view-frame vector back into world coordinates
    pub fn to_world(&self, view: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.inverse() * view
    }

    /// True when a view-frame vector lies on the visible hemisphere
    pub fn is_front(view: &Vector3<f64>) -> bool {
        view.x >= -HORIZON_EPSILON
    }

    /// Screen position of a view-frame vector, ignoring clipping
    pub fn view_to_screen(&self, view: &Vector3<f64>) -> ScreenPoint {
        ScreenPoint::new(
            self.translate.0 + self.scale * view.y,
            self.translate.1 - self.scale * view.z,
        )
    }

    /// Project a world unit vector, returning the off-disc sentinel for the far side
    pub fn project_vector(&self, world: &Vector3<f64>) -> ScreenPoint {
        let view = self.to_view(world);
        if Self::is_front(&view) {
            self.view_to_screen(&view)
        } else {
            ScreenPoint::OFF_DISC
        }
    }

    pub fn project(&self, coord: &SphericalCoord) -> ScreenPoint {
        self.project_vector(&coord.to_unit_vector())
    }

    /// Screen position of the horizon point at polar angle `theta` (radians,
    /// counter-clockwise from the disc's right-hand edge)
    pub fn horizon_point(&self, theta: f64) -> ScreenPoint {
        self.view_to_screen(&horizon_vector(theta))
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn translate(&self) -> (f64, f64) {
        self.translate
    }
}

/// View-frame unit vector on the horizon at polar angle `theta`.
pub fn horizon_vector(theta: f64) -> Vector3<f64> {
    let (sin_t, cos_t) = theta.sin_cos();
    Vector3::new(0.0, cos_t, sin_t)
}

/// Polar angle of a view-frame vector around the view axis.
pub fn horizon_angle(view: &Vector3<f64>) -> f64 {
    view.z.atan2(view.y)
}

/// Everything a draw pass needs to know about the current view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Current orientation, mutated only by the rotation animator
    pub rotation: Rotation,
    /// Disc radius in screen units
    pub radius: f64,
}

impl ViewState {
    pub fn new(rotation: Rotation, radius: f64) -> Self {
        Self { rotation, radius }
    }

    /// Projection for the sky disc: scale `radius`, centred at `(radius, radius)`
    pub fn projection(&self) -> OrthographicProjection {
        OrthographicProjection::new(&self.rotation, self.radius, (self.radius, self.radius))
    }

    /// Screen position of the disc centre
    pub fn disc_center(&self) -> ScreenPoint {
        ScreenPoint::new(self.radius, self.radius)
    }

    /// Copy of this view with a different rotation
    pub fn with_rotation(&self, rotation: Rotation) -> Self {
        Self {
            rotation,
            radius: self.radius,
        }
    }
}

/// Project a single coordinate under the given view.
///
/// Returns finite coordinates inside the disc for points within 90° of the
/// view centre and [`ScreenPoint::OFF_DISC`] otherwise.
pub fn project(coord: &SphericalCoord, view: &ViewState) -> ScreenPoint {
    view.projection().project(coord)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::angular_separation;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn view(lambda: f64, phi: f64, radius: f64) -> ViewState {
        ViewState::new(Rotation::new(lambda, phi), radius)
    }

    #[test]
    fn test_center_star_lands_on_disc_center() {
        let p = project(&SphericalCoord::new(0.0, 0.0), &view(0.0, 0.0, 300.0));
        assert_relative_eq!(p.x, 300.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_antipode_is_off_disc() {
        let p = project(&SphericalCoord::new(180.0, 0.0), &view(0.0, 0.0, 300.0));
        assert!(!p.is_finite());
        assert!(p.x.is_nan() && p.y.is_nan());
    }

    #[test]
    fn test_horizon_tie_break_includes_exact_boundary() {
        // Exactly 90° east of the centre sits on the right-hand rim
        let p = project(&SphericalCoord::new(90.0, 0.0), &view(0.0, 0.0, 300.0));
        assert!(p.is_finite());
        assert_relative_eq!(p.x, 600.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 300.0, epsilon = 1e-9);

        // The celestial pole is 90° from an equatorial centre
        let pole = project(&SphericalCoord::new(0.0, 90.0), &view(0.0, 0.0, 300.0));
        assert!(pole.is_finite());
        assert_relative_eq!(pole.y, 0.0, epsilon = 1e-9);

        // Just past the boundary is excluded
        let beyond = project(&SphericalCoord::new(90.0 + 1e-6, 0.0), &view(0.0, 0.0, 300.0));
        assert!(!beyond.is_finite());
    }

    #[test]
    fn test_north_is_up_and_east_is_right() {
        let v = view(0.0, 0.0, 100.0);
        let north = project(&SphericalCoord::new(0.0, 30.0), &v);
        let east = project(&SphericalCoord::new(30.0, 0.0), &v);
        assert!(north.y < 100.0);
        assert_relative_eq!(north.x, 100.0, epsilon = 1e-9);
        assert!(east.x > 100.0);
        assert_relative_eq!(east.y, 100.0, epsilon = 1e-9);
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(-122.4, -37.8)]
    #[case(92.0, 331.0)]
    #[case(-228.63065300575627, -37.8715926)]
    fn test_rotation_center_projects_to_disc_center(#[case] lambda: f64, #[case] phi: f64) {
        let v = view(lambda, phi, 250.0);
        let p = project(&v.rotation.center(), &v);
        assert_relative_eq!(p.x, 250.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 250.0, epsilon = 1e-6);
    }

    #[test]
    fn test_finite_iff_within_ninety_degrees() {
        let rotations = [(0.0, 0.0), (40.0, -20.0), (-228.6, -37.9), (170.0, 80.0)];
        for &(lambda, phi) in &rotations {
            let v = view(lambda, phi, 300.0);
            let center = v.rotation.center();
            for ra_step in 0..36 {
                for dec_step in 0..17 {
                    let coord = SphericalCoord::new(
                        ra_step as f64 * 10.0 + 3.0,
                        dec_step as f64 * 10.0 - 80.0 + 1.0,
                    );
                    let sep = angular_separation(&coord, &center);
                    if (sep - 90.0).abs() < 1e-6 {
                        continue;
                    }
                    let p = project(&coord, &v);
                    assert_eq!(
                        p.is_finite(),
                        sep < 90.0,
                        "coord {:?} at {:.3}° from centre, rotation ({}, {})",
                        coord,
                        sep,
                        lambda,
                        phi
                    );
                    if p.is_finite() {
                        assert!(p.distance_to(&v.disc_center()) <= 300.0 + 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn test_visibility_is_scale_invariant() {
        let coords = [
            SphericalCoord::new(10.0, 10.0),
            SphericalCoord::new(100.0, -5.0),
            SphericalCoord::new(250.0, 60.0),
        ];
        for coord in &coords {
            let small = project(coord, &view(30.0, -10.0, 10.0));
            let large = project(coord, &view(30.0, -10.0, 5000.0));
            assert_eq!(small.is_finite(), large.is_finite());
        }
    }

    #[test]
    fn test_lerp_endpoints_and_distance() {
        let a = Rotation::new(0.0, 0.0);
        let b = Rotation::new(30.0, -40.0);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        assert_eq!(a.lerp(&b, 2.0), b);
        assert_relative_eq!(a.lerp(&b, 0.5).lambda, 15.0);
        assert_relative_eq!(a.distance_to(&b), 50.0);
    }

    #[test]
    fn test_view_world_roundtrip() {
        let proj = view(-71.0, 22.0, 1.0).projection();
        let world = SphericalCoord::new(12.0, -33.0).to_unit_vector();
        let back = proj.to_world(&proj.to_view(&world));
        assert_relative_eq!(back, world, epsilon = 1e-12);
    }
}
