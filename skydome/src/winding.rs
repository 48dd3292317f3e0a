//! Winding correction for constellation boundary polygons.
//!
//! Boundary rings come from the position service in absolute sky coordinates
//! with no regard for the current view. Read with the wrong orientation a ring
//! encloses the rest of the sphere, and its clipped outline floods most of the
//! disc. Such polygons are spotted by their screen bounding box covering more
//! than a set fraction of the disc's square, and repaired by reversing every
//! ring.
//!
//! Some circumpolar boundaries stay oversized in both orientations under
//! extreme rotations. Those come back as [`WindingDecision::Ambiguous`] and
//! must not be drawn.

use crate::clip::{ScreenPath, SphereClipper, DEFAULT_RESAMPLE_STEP_DEG};
use crate::projection::ViewState;
use crate::shape::{BoundingBox, Shape};
use crate::visibility::any_corner_finite;

/// Fraction of `(2r)^2` above which a polygon's bounding box reads as inverted
pub const DEFAULT_INVERSION_THRESHOLD: f64 = 0.75;

/// Outcome of checking a polygon's orientation under one view.
#[derive(Debug, Clone, PartialEq)]
pub enum WindingDecision {
    /// Polygon was fine as given
    Normal(Shape),
    /// Polygon was inverted; carries the ring-reversed copy
    Inverted(Shape),
    /// Inverted in both orientations; skip drawing
    Ambiguous,
}

impl WindingDecision {
    /// The polygon to draw, if any
    pub fn shape(&self) -> Option<&Shape> {
        match self {
            WindingDecision::Normal(shape) | WindingDecision::Inverted(shape) => Some(shape),
            WindingDecision::Ambiguous => None,
        }
    }

    pub fn into_shape(self) -> Option<Shape> {
        match self {
            WindingDecision::Normal(shape) | WindingDecision::Inverted(shape) => Some(shape),
            WindingDecision::Ambiguous => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, WindingDecision::Ambiguous)
    }
}

/// Corrected polygon together with its clipped screen geometry.
#[derive(Debug, Clone)]
pub struct Correction {
    pub decision: WindingDecision,
    /// Screen path of the corrected polygon; empty when ambiguous
    pub path: ScreenPath,
}

/// True when `bbox` covers more than `threshold` of the disc's bounding square.
///
/// An empty box has NaN area and is never inverted.
pub fn is_inverted(bbox: &BoundingBox, radius: f64, threshold: f64) -> bool {
    let disc_square = (2.0 * radius).powi(2);
    bbox.area() / disc_square > threshold
}

/// Applies the inversion heuristic with a configurable threshold.
#[derive(Debug, Clone, Copy)]
pub struct WindingCorrector {
    threshold: f64,
}

impl Default for WindingCorrector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_INVERSION_THRESHOLD,
        }
    }
}

impl WindingCorrector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Classify `shape` under `view`, reversing its rings when inverted.
    ///
    /// Only polygons are inspected; points and line strings are always
    /// [`WindingDecision::Normal`].
    pub fn correct(&self, shape: &Shape, view: &ViewState, clipper: &SphereClipper) -> Correction {
        let path = clipper.clip(shape);
        if !matches!(shape, Shape::Polygon { .. })
            || !is_inverted(&path.bounds(), view.radius, self.threshold)
        {
            return Correction {
                decision: WindingDecision::Normal(shape.clone()),
                path,
            };
        }

        let reversed = shape.reversed();
        let reversed_path = clipper.clip(&reversed);
        let reversed_bounds = reversed_path.bounds();
        if any_corner_finite(&reversed_bounds)
            && is_inverted(&reversed_bounds, view.radius, self.threshold)
        {
            log::warn!(
                "polygon inverted in both orientations at rotation ({:.2}, {:.2}); skipping",
                view.rotation.lambda,
                view.rotation.phi
            );
            return Correction {
                decision: WindingDecision::Ambiguous,
                path: ScreenPath::default(),
            };
        }

        log::debug!(
            "reversed inverted polygon at rotation ({:.2}, {:.2})",
            view.rotation.lambda,
            view.rotation.phi
        );
        Correction {
            decision: WindingDecision::Inverted(reversed),
            path: reversed_path,
        }
    }
}

/// Check and repair a polygon's winding under `view` with default settings
pub fn correct_winding(shape: &Shape, view: &ViewState) -> WindingDecision {
    let clipper = SphereClipper::new(view.projection(), DEFAULT_RESAMPLE_STEP_DEG);
    WindingCorrector::default()
        .correct(shape, view, &clipper)
        .decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::SphericalCoord;
    use crate::projection::Rotation;
    use crate::visibility::bounds;
    use nalgebra::Vector3;

    fn view() -> ViewState {
        ViewState::new(Rotation::new(0.0, 0.0), 300.0)
    }

    /// Square around (10, 5) wound so that its interior is everything else
    fn inside_out_square() -> Shape {
        Shape::polygon_from_pairs(&[vec![[0.0, -5.0], [20.0, -5.0], [20.0, 15.0], [0.0, 15.0]]])
    }

    /// Ring 80° from the view centre, visible all the way round
    fn wide_cap() -> Shape {
        let ring = (0..36)
            .map(|k| {
                let theta = (k as f64 * 10.0).to_radians();
                let angle = 80f64.to_radians();
                let v = Vector3::new(angle.cos(), angle.sin() * theta.cos(), angle.sin() * theta.sin());
                SphericalCoord::from_vector(&v)
            })
            .collect();
        Shape::polygon(vec![ring])
    }

    #[test]
    fn test_inverted_polygon_is_reversed_exactly_once() {
        let shape = inside_out_square();
        let naive = bounds(&shape, &view());
        assert!(naive.area() > 0.75 * 360000.0);

        let decision = correct_winding(&shape, &view());
        let corrected = match &decision {
            WindingDecision::Inverted(corrected) => corrected,
            other => panic!("expected Inverted, got {other:?}"),
        };
        assert_eq!(corrected, &shape.reversed());
        assert!(bounds(corrected, &view()).area() < 0.75 * 360000.0);
    }

    #[test]
    fn test_correction_is_idempotent() {
        let corrected = correct_winding(&inside_out_square(), &view())
            .into_shape()
            .unwrap();
        let again = correct_winding(&corrected, &view());
        assert_eq!(again, WindingDecision::Normal(corrected));
    }

    #[test]
    fn test_small_polygon_is_normal() {
        let shape = inside_out_square().reversed();
        assert_eq!(correct_winding(&shape, &view()), WindingDecision::Normal(shape));
    }

    #[test]
    fn test_hidden_polygon_is_normal() {
        let shape = Shape::polygon_from_pairs(&[vec![[170.0, 0.0], [180.0, 10.0], [190.0, 0.0]]]);
        assert!(!is_inverted(&bounds(&shape, &view()), 300.0, 0.75));
        assert_eq!(correct_winding(&shape, &view()), WindingDecision::Normal(shape.clone()));

        let clipper = SphereClipper::new(view().projection(), DEFAULT_RESAMPLE_STEP_DEG);
        let correction = WindingCorrector::default().correct(&shape, &view(), &clipper);
        assert!(!correction.decision.is_ambiguous());
        assert!(correction.path.is_empty());
    }

    #[test]
    fn test_split_polygon_rings_are_reversed_independently() {
        // Two inside-out squares, like the halves of Serpens
        let shape = Shape::polygon_from_pairs(&[
            vec![[0.0, -5.0], [20.0, -5.0], [20.0, 15.0], [0.0, 15.0]],
            vec![[-30.0, -20.0], [-15.0, -20.0], [-15.0, -5.0], [-30.0, -5.0]],
        ]);
        assert!(is_inverted(&bounds(&shape, &view()), 300.0, 0.75));

        let decision = correct_winding(&shape, &view());
        assert_eq!(decision, WindingDecision::Inverted(shape.reversed()));

        let corrected = decision.into_shape().unwrap();
        let Shape::Polygon { rings } = &corrected else {
            panic!("correction must keep the polygon");
        };
        assert_eq!(rings.len(), 2);
        let corrected_box = bounds(&corrected, &view());
        assert!(crate::visibility::is_visible(&corrected, &view()));
        assert!(corrected_box.area() < 0.75 * 360000.0);
        // Both halves survive: the box spans from the western ring to the eastern one
        assert!(corrected_box.min_x < 300.0 - 300.0 * 14f64.to_radians().sin());
        assert!(corrected_box.max_x > 300.0 + 300.0 * 19f64.to_radians().sin());
    }

    #[test]
    fn test_oversized_both_ways_is_ambiguous() {
        let shape = wide_cap();
        assert!(is_inverted(&bounds(&shape, &view()), 300.0, 0.75));
        assert!(is_inverted(&bounds(&shape.reversed(), &view()), 300.0, 0.75));

        let decision = correct_winding(&shape, &view());
        assert!(decision.is_ambiguous());
        assert!(decision.shape().is_none());
    }

    #[test]
    fn test_lines_are_never_corrected() {
        let lines = Shape::lines_from_pairs(&[vec![[-80.0, 0.0], [0.0, 80.0], [80.0, 0.0], [0.0, -80.0]]]);
        assert_eq!(correct_winding(&lines, &view()), WindingDecision::Normal(lines));
    }

    #[test]
    fn test_empty_box_is_not_inverted() {
        assert!(!is_inverted(&BoundingBox::EMPTY, 300.0, 0.75));
        assert!(is_inverted(&BoundingBox::new(0.0, 0.0, 600.0, 600.0), 300.0, 0.75));
        assert!(!is_inverted(&BoundingBox::new(0.0, 0.0, 600.0, 450.0), 300.0, 0.75));
    }
}
