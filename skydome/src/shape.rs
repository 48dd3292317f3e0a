//! Sky shapes and their screen-space bounds.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::coords::SphericalCoord;
use crate::projection::ScreenPoint;

/// A ring of vertices; the closing edge back to the first vertex is implied.
pub type Ring = Vec<SphericalCoord>;

/// Geometry of a single sky object.
///
/// Stars and planets are points, constellation boundaries are polygons (more
/// than one ring for split constellations such as Serpens), and constellation
/// line art is a multi-line string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Point { coord: SphericalCoord, radius: f64 },
    Polygon { rings: Vec<Ring> },
    MultiLineString { lines: Vec<Vec<SphericalCoord>> },
}

impl Shape {
    pub fn point(coord: SphericalCoord, radius: f64) -> Self {
        Shape::Point { coord, radius }
    }

    pub fn polygon(rings: Vec<Ring>) -> Self {
        Shape::Polygon { rings }
    }

    /// Build a polygon from `[ra, dec]` pairs as delivered by the position service
    pub fn polygon_from_pairs(rings: &[Vec<[f64; 2]>]) -> Self {
        Shape::Polygon {
            rings: rings
                .iter()
                .map(|ring| ring.iter().map(|&p| SphericalCoord::from(p)).collect())
                .collect(),
        }
    }

    /// Build a multi-line string from `[ra, dec]` pairs
    pub fn lines_from_pairs(lines: &[Vec<[f64; 2]>]) -> Self {
        Shape::MultiLineString {
            lines: lines
                .iter()
                .map(|line| line.iter().map(|&p| SphericalCoord::from(p)).collect())
                .collect(),
        }
    }

    /// Polygon approximating the spherical cap of `radius` degrees around `center`.
    ///
    /// Vertices are `step` degrees apart and run clockwise seen from outside
    /// the sphere, so the interior is the cap itself.
    pub fn circle(center: SphericalCoord, radius: f64, step: f64) -> Self {
        let c = center.to_unit_vector();
        let east = Vector3::z().cross(&c);
        let east = if east.norm() < 1e-12 {
            Vector3::y()
        } else {
            east.normalize()
        };
        let north = c.cross(&east);
        let (sin_r, cos_r) = radius.to_radians().sin_cos();

        let steps = (360.0 / step.max(f64::EPSILON)).ceil().max(3.0) as usize;
        let ring = (0..steps)
            .map(|k| {
                let theta = -std::f64::consts::TAU * k as f64 / steps as f64;
                let v = c * cos_r + (east * theta.cos() + north * theta.sin()) * sin_r;
                SphericalCoord::from_vector(&v)
            })
            .collect();
        Shape::Polygon { rings: vec![ring] }
    }

    /// Same shape with every ring's vertex order reversed.
    ///
    /// Points and line strings are returned unchanged; only polygon interiors
    /// depend on winding.
    pub fn reversed(&self) -> Self {
        match self {
            Shape::Polygon { rings } => Shape::Polygon {
                rings: rings
                    .iter()
                    .map(|ring| ring.iter().rev().copied().collect())
                    .collect(),
            },
            other => other.clone(),
        }
    }
}

/// Axis-aligned screen rectangle enclosing a projected shape.
///
/// The empty box has `min = +inf` and `max = -inf`, so all four corners are
/// non-finite; that is how a shape entirely on the far hemisphere reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub const EMPTY: BoundingBox = BoundingBox {
        min_x: f64::INFINITY,
        min_y: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Bounds of the finite points in `points`; non-finite points are skipped
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a ScreenPoint>,
    {
        let mut bbox = Self::EMPTY;
        for p in points {
            bbox.include(p);
        }
        bbox
    }

    /// Grow the box to contain `p`; off-disc points are ignored
    pub fn include(&mut self, p: &ScreenPoint) {
        if !p.is_finite() {
            return;
        }
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    /// Corners as `[min_x, min_y, max_x, max_y]`
    pub fn corners(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Screen area; NaN for the empty box
    pub fn area(&self) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        self.width() * self.height()
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.corners().iter().all(|c| !c.is_finite())
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::angular_separation;

    #[test]
    fn test_empty_box_has_no_finite_corner() {
        let bbox = BoundingBox::from_points(&[ScreenPoint::OFF_DISC, ScreenPoint::OFF_DISC]);
        assert!(bbox.is_empty());
        assert!(bbox.area().is_nan());
    }

    #[test]
    fn test_box_skips_off_disc_points() {
        let points = [
            ScreenPoint::new(10.0, 40.0),
            ScreenPoint::OFF_DISC,
            ScreenPoint::new(30.0, 20.0),
        ];
        let bbox = BoundingBox::from_points(&points);
        assert_eq!(bbox, BoundingBox::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(bbox.area(), 400.0);
        assert_eq!(bbox.center(), ScreenPoint::new(20.0, 30.0));
    }

    #[test]
    fn test_reverse_twice_is_identity() {
        let shape = Shape::polygon_from_pairs(&[
            vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]],
            vec![[50.0, 5.0], [55.0, 5.0], [52.0, 9.0]],
        ]);
        let once = shape.reversed();
        assert_ne!(once, shape);
        assert_eq!(once.reversed(), shape);

        if let Shape::Polygon { rings } = &once {
            assert_eq!(rings[0][0], SphericalCoord::new(0.0, 10.0));
            assert_eq!(rings[1][0], SphericalCoord::new(52.0, 9.0));
        } else {
            panic!("reversed polygon changed kind");
        }
    }

    #[test]
    fn test_circle_vertices_sit_at_the_cap_radius() {
        let center = SphericalCoord::new(40.0, -20.0);
        let Shape::Polygon { rings } = Shape::circle(center, 25.0, 10.0) else {
            panic!("circle is not a polygon");
        };
        assert_eq!(rings[0].len(), 36);
        for v in &rings[0] {
            assert!((angular_separation(&center, v) - 25.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_reverse_leaves_points_alone() {
        let star = Shape::point(SphericalCoord::new(1.0, 2.0), 3.0);
        assert_eq!(star.reversed(), star);
    }
}
