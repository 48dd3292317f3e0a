//! Clipping of sky shapes against the visible hemisphere.
//!
//! Edges between vertices are great-circle arcs, not straight lines, so every
//! edge is resampled at a fixed angular step before projection. Where an edge
//! dips behind the horizon the visible run is cut at the exact crossing point.
//!
//! Polygons additionally need the horizon itself: once a ring leaves the
//! visible hemisphere, the clipped outline follows the disc rim until the ring
//! comes back. Which way round the rim to go, and whether the whole rim belongs
//! to the polygon, is decided by spherical containment.
//!
//! # Winding Convention
//! A ring's interior is the region on the right-hand side of its directed
//! edges when the sphere is seen from outside, i.e. rings drawn clockwise in an
//! `(ra, dec)` chart enclose the small region. A ring wound the other way
//! encloses everything else, which is exactly the case the
//! [`winding`](crate::winding) module detects and repairs.

use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;
use serde::Serialize;

use crate::coords::SphericalCoord;
use crate::projection::{horizon_angle, horizon_vector, OrthographicProjection, ScreenPoint};
use crate::shape::{BoundingBox, Shape};

/// Default angular resampling step for edges and horizon arcs, in degrees
pub const DEFAULT_RESAMPLE_STEP_DEG: f64 = 1.0;

/// Offset used to place the containment reference point beside an edge
const REFERENCE_OFFSET: f64 = 1e-7;

/// One connected run of screen points.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SubPath {
    pub points: Vec<ScreenPoint>,
    /// Closed subpaths return to their first point
    pub closed: bool,
}

/// Clipped screen-space geometry of a shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ScreenPath {
    pub subpaths: Vec<SubPath>,
}

impl ScreenPath {
    pub fn is_empty(&self) -> bool {
        self.subpaths.iter().all(|s| s.points.is_empty())
    }

    /// Bounds of every emitted point; empty paths give [`BoundingBox::EMPTY`]
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(self.subpaths.iter().flat_map(|s| s.points.iter()))
    }

    /// SVG path data (`M x,y L x,y ... Z`)
    pub fn to_svg_d(&self) -> String {
        let mut d = String::new();
        for sub in self.subpaths.iter().filter(|s| !s.points.is_empty()) {
            for (i, p) in sub.points.iter().enumerate() {
                let cmd = if i == 0 { 'M' } else { 'L' };
                d.push_str(&format!("{cmd}{:.2},{:.2}", p.x, p.y));
            }
            if sub.closed {
                d.push('Z');
            }
        }
        d
    }
}

/// Clips shapes against the visible hemisphere of one projection.
#[derive(Debug, Clone, Copy)]
pub struct SphereClipper {
    projection: OrthographicProjection,
    step: f64,
}

impl SphereClipper {
    /// Create a clipper; `step_deg` is the maximum angle between resampled points
    pub fn new(projection: OrthographicProjection, step_deg: f64) -> Self {
        let step_deg = if step_deg.is_finite() && step_deg > 0.0 {
            step_deg
        } else {
            DEFAULT_RESAMPLE_STEP_DEG
        };
        Self {
            projection,
            step: step_deg.to_radians(),
        }
    }

    pub fn projection(&self) -> &OrthographicProjection {
        &self.projection
    }

    /// Clip any shape to its visible screen geometry
    pub fn clip(&self, shape: &Shape) -> ScreenPath {
        match shape {
            Shape::Point { coord, .. } => self.clip_point(coord),
            Shape::MultiLineString { lines } => {
                let mut path = ScreenPath::default();
                for line in lines {
                    self.clip_line(line, &mut path);
                }
                path
            }
            Shape::Polygon { rings } => {
                let mut path = ScreenPath::default();
                for ring in rings {
                    self.clip_ring(ring, &mut path);
                }
                path
            }
        }
    }

    fn clip_point(&self, coord: &SphericalCoord) -> ScreenPath {
        let p = self.projection.project(coord);
        if !p.is_finite() {
            return ScreenPath::default();
        }
        ScreenPath {
            subpaths: vec![SubPath {
                points: vec![p],
                closed: false,
            }],
        }
    }

    fn to_view(&self, coords: &[SphericalCoord]) -> Vec<Vector3<f64>> {
        coords
            .iter()
            .map(|c| self.projection.to_view(&c.to_unit_vector()))
            .collect()
    }

    fn screen(&self, view: &Vector3<f64>) -> ScreenPoint {
        self.projection.view_to_screen(view)
    }

    fn clip_line(&self, line: &[SphericalCoord], path: &mut ScreenPath) {
        if line.len() < 2 {
            return;
        }
        let vertices = self.to_view(line);
        let mut samples = Vec::new();
        for pair in vertices.windows(2) {
            samples.extend(resample_arc(&pair[0], &pair[1], self.step));
        }
        if let Some(last) = vertices.last() {
            samples.push(*last);
        }

        let mut current: Vec<ScreenPoint> = Vec::new();
        for (i, sample) in samples.iter().enumerate() {
            let visible = OrthographicProjection::is_front(sample);
            let prev_visible = i > 0 && OrthographicProjection::is_front(&samples[i - 1]);

            if visible {
                if i > 0 && !prev_visible {
                    current.push(self.screen(&horizon_crossing(&samples[i - 1], sample)));
                }
                current.push(self.screen(sample));
            } else if prev_visible {
                current.push(self.screen(&horizon_crossing(&samples[i - 1], sample)));
                path.subpaths.push(SubPath {
                    points: std::mem::take(&mut current),
                    closed: false,
                });
            }
        }
        if current.len() > 1 {
            path.subpaths.push(SubPath {
                points: current,
                closed: false,
            });
        }
    }

    fn clip_ring(&self, ring: &[SphericalCoord], path: &mut ScreenPath) {
        let vertices = ring_vertices(&self.to_view(ring));
        if vertices.len() < 3 {
            log::debug!("skipping degenerate ring with {} vertices", vertices.len());
            return;
        }

        let n = vertices.len();
        let mut samples = Vec::new();
        for i in 0..n {
            samples.extend(resample_arc(&vertices[i], &vertices[(i + 1) % n], self.step));
        }
        let visible: Vec<bool> = samples.iter().map(OrthographicProjection::is_front).collect();

        if visible.iter().all(|&v| v) {
            path.subpaths.push(SubPath {
                points: samples.iter().map(|s| self.screen(s)).collect(),
                closed: true,
            });
            // Ring wound the other way: the rest of the dome is inside it too
            if ring_contains(&vertices, &horizon_vector(0.0)) {
                path.subpaths.push(self.full_horizon());
            }
            return;
        }

        if !visible.iter().any(|&v| v) {
            if ring_contains(&vertices, &horizon_vector(0.0)) {
                path.subpaths.push(self.full_horizon());
            }
            return;
        }

        let runs = self.visible_runs(&samples, &visible);
        self.stitch_runs(&vertices, &runs, path);
    }

    /// Split a closed sample loop into visible runs bounded by horizon crossings
    fn visible_runs(&self, samples: &[Vector3<f64>], visible: &[bool]) -> Vec<Run> {
        let m = samples.len();
        let Some(start) = (0..m).find(|&i| visible[i] && !visible[(i + m - 1) % m]) else {
            return Vec::new();
        };

        let mut runs = Vec::new();
        let mut current: Option<Run> = None;
        for offset in 0..=m {
            let i = (start + offset) % m;
            let prev = (i + m - 1) % m;
            match (visible[prev], visible[i]) {
                (false, true) => {
                    let entry = horizon_crossing(&samples[prev], &samples[i]);
                    current = Some(Run {
                        entry_angle: horizon_angle(&entry),
                        exit_angle: 0.0,
                        points: vec![self.screen(&entry), self.screen(&samples[i])],
                    });
                }
                (true, true) => {
                    if offset < m {
                        if let Some(run) = current.as_mut() {
                            run.points.push(self.screen(&samples[i]));
                        }
                    }
                }
                (true, false) => {
                    let exit = horizon_crossing(&samples[prev], &samples[i]);
                    if let Some(mut run) = current.take() {
                        run.exit_angle = horizon_angle(&exit);
                        run.points.push(self.screen(&exit));
                        runs.push(run);
                    }
                }
                (false, false) => {}
            }
            if offset == m {
                break;
            }
        }
        runs
    }

    /// Join visible runs along the horizon into closed outlines
    fn stitch_runs(&self, vertices: &[Vector3<f64>], runs: &[Run], path: &mut ScreenPath) {
        if runs.is_empty() {
            return;
        }
        let direction = self.rim_direction(vertices, runs);

        let mut used = vec![false; runs.len()];
        for first in 0..runs.len() {
            if used[first] {
                continue;
            }
            let mut points = Vec::new();
            let mut current = first;
            loop {
                used[current] = true;
                let run = &runs[current];
                points.extend_from_slice(&run.points);

                let (next, sweep) = nearest_entry(runs, run.exit_angle, direction);
                self.push_rim_arc(&mut points, run.exit_angle, sweep * direction);

                if next == first || used[next] {
                    break;
                }
                current = next;
            }
            path.subpaths.push(SubPath {
                points,
                closed: true,
            });
        }
    }

    /// +1.0 to follow the rim counter-clockwise, -1.0 for clockwise.
    ///
    /// Picks the direction whose first rim arc lies inside the ring.
    fn rim_direction(&self, vertices: &[Vector3<f64>], runs: &[Run]) -> f64 {
        let exit = runs[0].exit_angle;
        for direction in [-1.0, 1.0] {
            let (_, sweep) = nearest_entry(runs, exit, direction);
            let mid = horizon_vector(exit + direction * sweep / 2.0);
            if ring_contains(vertices, &mid) {
                return direction;
            }
        }
        log::debug!("no rim arc tested inside ring; defaulting to clockwise");
        -1.0
    }

    /// Rim points strictly between `from` and `from + signed_sweep`, including
    /// every cardinal point the arc passes so the box reaches the rim
    fn push_rim_arc(&self, points: &mut Vec<ScreenPoint>, from: f64, signed_sweep: f64) {
        let steps = (signed_sweep.abs() / self.step).ceil() as usize;
        let mut thetas: Vec<f64> = (1..steps)
            .map(|k| from + signed_sweep * k as f64 / steps as f64)
            .collect();
        thetas.extend(cardinal_angles(from, signed_sweep));

        let direction = signed_sweep.signum();
        thetas.sort_by(|a, b| ((a - from) * direction).total_cmp(&((b - from) * direction)));
        points.extend(thetas.into_iter().map(|theta| self.projection.horizon_point(theta)));
    }

    fn full_horizon(&self) -> SubPath {
        // Multiple of four so the samples include the rim's extreme points
        let quarter_steps = ((TAU / self.step - 1e-9) / 4.0).ceil().max(2.0) as usize;
        let steps = quarter_steps * 4;
        SubPath {
            points: (0..steps)
                .map(|k| self.projection.horizon_point(TAU * k as f64 / steps as f64))
                .collect(),
            closed: true,
        }
    }
}

/// A visible stretch of a ring, from the horizon entry to the horizon exit.
#[derive(Debug, Clone)]
struct Run {
    entry_angle: f64,
    exit_angle: f64,
    points: Vec<ScreenPoint>,
}

/// First run entry reached from `from` travelling in `direction` along the rim,
/// with the (non-negative) sweep needed to get there.
fn nearest_entry(runs: &[Run], from: f64, direction: f64) -> (usize, f64) {
    runs.iter()
        .enumerate()
        .map(|(i, run)| (i, ((run.entry_angle - from) * direction).rem_euclid(TAU)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or((0, 0.0))
}

/// Multiples of a quarter turn lying strictly inside the arc `from .. from + signed_sweep`.
fn cardinal_angles(from: f64, signed_sweep: f64) -> Vec<f64> {
    const QUARTER: f64 = PI / 2.0;
    const MARGIN: f64 = 1e-9;
    let (lo, hi) = if signed_sweep >= 0.0 {
        (from, from + signed_sweep)
    } else {
        (from + signed_sweep, from)
    };
    let first = ((lo + MARGIN) / QUARTER).ceil() as i64;
    let last = ((hi - MARGIN) / QUARTER).floor() as i64;
    (first..=last).map(|k| k as f64 * QUARTER).collect()
}

/// Drop a repeated closing vertex and consecutive duplicates.
fn ring_vertices(vertices: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
    let mut out: Vec<Vector3<f64>> = Vec::with_capacity(vertices.len());
    for v in vertices {
        if out.last().is_some_and(|last| (last - v).norm() < 1e-12) {
            continue;
        }
        out.push(*v);
    }
    while out.len() > 1 && (out[0] - out[out.len() - 1]).norm() < 1e-12 {
        out.pop();
    }
    out
}

/// Points along the great-circle arc from `a` (inclusive) to `b` (exclusive).
fn resample_arc(a: &Vector3<f64>, b: &Vector3<f64>, step: f64) -> Vec<Vector3<f64>> {
    let theta = a.angle(b);
    if theta < 1e-12 || (PI - theta) < 1e-9 {
        return vec![*a];
    }
    let steps = (theta / step).ceil().max(1.0) as usize;
    let sin_theta = theta.sin();
    (0..steps)
        .map(|k| {
            let t = k as f64 / steps as f64;
            (a * ((1.0 - t) * theta).sin() + b * (t * theta).sin()) / sin_theta
        })
        .collect()
}

/// Point where the arc between two view-frame samples meets the horizon.
///
/// The chord point with zero x component lies on the same great circle, so
/// normalising it gives the crossing exactly.
fn horizon_crossing(a: &Vector3<f64>, b: &Vector3<f64>) -> Vector3<f64> {
    let denom = a.x - b.x;
    let t = if denom.abs() < f64::EPSILON {
        0.5
    } else {
        (a.x / denom).clamp(0.0, 1.0)
    };
    let mut p = a + (b - a) * t;
    p.x = 0.0;
    let norm = p.norm();
    if norm < 1e-15 {
        return horizon_vector(0.0);
    }
    p / norm
}

/// True if `p` lies inside the ring (right-hand side of its directed edges).
///
/// Counts crossings between the minor arc from a reference point known to be
/// inside (just right of one edge's midpoint) and every ring edge.
pub fn ring_contains(vertices: &[Vector3<f64>], p: &Vector3<f64>) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        let a = &vertices[i];
        let b = &vertices[(i + 1) % n];
        let normal = a.cross(b);
        let normal_len = normal.norm();
        let mid = a + b;
        if normal_len < 1e-12 || mid.norm() < 1e-12 {
            continue;
        }
        let reference = (mid.normalize() - normal / normal_len * REFERENCE_OFFSET).normalize();
        let alignment = reference.dot(p);
        if alignment < -1.0 + 1e-9 {
            // p is antipodal to this reference; the arc between them is undefined
            continue;
        }
        if alignment > 1.0 - 1e-15 {
            return true;
        }

        let crossings = (0..n)
            .filter(|&j| arcs_intersect(&reference, p, &vertices[j], &vertices[(j + 1) % n]))
            .count();
        return crossings % 2 == 0;
    }
    false
}

/// True if minor arcs `p→q` and `a→b` cross at a single interior point
fn arcs_intersect(p: &Vector3<f64>, q: &Vector3<f64>, a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
    let n1 = p.cross(q);
    let n2 = a.cross(b);
    if n1.dot(a) * n1.dot(b) >= 0.0 {
        return false;
    }
    if n2.dot(p) * n2.dot(q) >= 0.0 {
        return false;
    }
    let x = n1.cross(&n2);
    x.dot(&(p + q)) * x.dot(&(a + b)) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{Rotation, ViewState};
    use approx::assert_relative_eq;

    fn clipper(lambda: f64, phi: f64, radius: f64) -> SphereClipper {
        let view = ViewState::new(Rotation::new(lambda, phi), radius);
        SphereClipper::new(view.projection(), DEFAULT_RESAMPLE_STEP_DEG)
    }

    /// Clockwise in (ra, dec): interior is the small square
    fn small_square(ra: f64, dec: f64, half: f64) -> Vec<SphericalCoord> {
        vec![
            SphericalCoord::new(ra - half, dec - half),
            SphericalCoord::new(ra - half, dec + half),
            SphericalCoord::new(ra + half, dec + half),
            SphericalCoord::new(ra + half, dec - half),
        ]
    }

    fn vectors(coords: &[SphericalCoord]) -> Vec<Vector3<f64>> {
        coords.iter().map(|c| c.to_unit_vector()).collect()
    }

    #[test]
    fn test_clockwise_ring_contains_its_center() {
        let ring = vectors(&small_square(20.0, 10.0, 5.0));
        assert!(ring_contains(&ring, &SphericalCoord::new(20.0, 10.0).to_unit_vector()));
        assert!(!ring_contains(&ring, &SphericalCoord::new(200.0, -10.0).to_unit_vector()));
        assert!(!ring_contains(&ring, &SphericalCoord::new(40.0, 10.0).to_unit_vector()));
    }

    #[test]
    fn test_counter_clockwise_ring_contains_the_rest_of_the_sphere() {
        let mut coords = small_square(20.0, 10.0, 5.0);
        coords.reverse();
        let ring = vectors(&coords);
        assert!(!ring_contains(&ring, &SphericalCoord::new(20.0, 10.0).to_unit_vector()));
        assert!(ring_contains(&ring, &SphericalCoord::new(200.0, -10.0).to_unit_vector()));
    }

    #[test]
    fn test_front_ring_is_a_single_closed_subpath() {
        let shape = Shape::polygon(vec![small_square(0.0, 0.0, 10.0)]);
        let path = clipper(0.0, 0.0, 300.0).clip(&shape);
        assert_eq!(path.subpaths.len(), 1);
        assert!(path.subpaths[0].closed);

        // Side edges are meridians, widest at the equator
        let bbox = path.bounds();
        let half_width = 300.0 * 10f64.to_radians().sin();
        assert_relative_eq!(bbox.min_x, 300.0 - half_width, epsilon = 1e-6);
        assert_relative_eq!(bbox.max_x, 300.0 + half_width, epsilon = 1e-6);
        // Top and bottom edges are great circles bulging toward the poles
        assert!(bbox.height() > bbox.width());
    }

    #[test]
    fn test_reversed_front_ring_covers_the_disc() {
        let mut coords = small_square(0.0, 0.0, 10.0);
        coords.reverse();
        let path = clipper(0.0, 0.0, 300.0).clip(&Shape::polygon(vec![coords]));
        assert_eq!(path.subpaths.len(), 2);
        let bbox = path.bounds();
        assert_relative_eq!(bbox.min_x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max_x, 600.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.min_y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max_y, 600.0, epsilon = 1e-6);
    }

    #[test]
    fn test_hidden_ring_is_empty() {
        let shape = Shape::polygon(vec![small_square(180.0, 0.0, 10.0)]);
        let path = clipper(0.0, 0.0, 300.0).clip(&shape);
        assert!(path.is_empty());
        assert!(path.bounds().is_empty());
    }

    #[test]
    fn test_ring_straddling_horizon_follows_the_rim() {
        // Square centred on the eastern horizon point
        let shape = Shape::polygon(vec![small_square(90.0, 0.0, 10.0)]);
        let path = clipper(0.0, 0.0, 300.0).clip(&shape);
        assert_eq!(path.subpaths.len(), 1);

        let bbox = path.bounds();
        // Right edge of the clipped region touches the rim
        assert_relative_eq!(bbox.max_x, 600.0, epsilon = 1e-6);
        // and the region stays a thin sliver near it
        assert!(bbox.min_x > 580.0);
        assert!(bbox.height() < 2.0 * 300.0 * 12f64.to_radians().sin());
        for p in &path.subpaths[0].points {
            assert!(p.distance_to(&ScreenPoint::new(300.0, 300.0)) <= 300.0 + 1e-6);
        }
    }

    #[test]
    fn test_reversed_ring_straddling_horizon_takes_the_long_way() {
        let mut coords = small_square(90.0, 0.0, 10.0);
        coords.reverse();
        let path = clipper(0.0, 0.0, 300.0).clip(&Shape::polygon(vec![coords]));
        let bbox = path.bounds();
        // The rim arc passes the disc's left, top and bottom extremes
        assert_relative_eq!(bbox.min_x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.min_y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(bbox.max_y, 600.0, epsilon = 1e-6);
        assert!(bbox.area() > 0.75 * 600.0 * 600.0);
    }

    #[test]
    fn test_cardinal_angles_inside_arc() {
        let quarter = PI / 2.0;
        assert_eq!(cardinal_angles(-0.2, 0.4), vec![0.0]);
        assert_eq!(cardinal_angles(0.2, -0.4), vec![0.0]);
        assert_eq!(cardinal_angles(0.1, 3.2), vec![quarter, PI]);
        assert!(cardinal_angles(0.1, 0.2).is_empty());
        // Endpoints already sit on the rim and are not repeated
        assert!(cardinal_angles(0.0, quarter).is_empty());
    }

    #[test]
    fn test_line_is_cut_at_the_horizon() {
        let line = vec![SphericalCoord::new(0.0, 0.0), SphericalCoord::new(120.0, 0.0)];
        let path = clipper(0.0, 0.0, 100.0).clip(&Shape::MultiLineString { lines: vec![line] });
        assert_eq!(path.subpaths.len(), 1);
        let sub = &path.subpaths[0];
        assert!(!sub.closed);
        let last = sub.points.last().copied().unwrap();
        assert_relative_eq!(last.x, 200.0, epsilon = 1e-9);
        assert_relative_eq!(last.y, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_line_reentering_front_starts_new_subpath() {
        // Leaves through the east rim, passes behind, comes back through the west rim
        let line = vec![
            SphericalCoord::new(60.0, 0.0),
            SphericalCoord::new(150.0, 0.0),
            SphericalCoord::new(210.0, 0.0),
            SphericalCoord::new(300.0, 0.0),
        ];
        let path = clipper(0.0, 0.0, 100.0).clip(&Shape::MultiLineString { lines: vec![line] });
        assert_eq!(path.subpaths.len(), 2);
        let entry = path.subpaths[1].points[0];
        assert_relative_eq!(entry.x, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_ring_yields_nothing() {
        let ring = vec![
            SphericalCoord::new(0.0, 0.0),
            SphericalCoord::new(5.0, 0.0),
            SphericalCoord::new(0.0, 0.0),
        ];
        let path = clipper(0.0, 0.0, 100.0).clip(&Shape::polygon(vec![ring]));
        assert!(path.is_empty());
    }

    #[test]
    fn test_svg_path_data() {
        let path = ScreenPath {
            subpaths: vec![SubPath {
                points: vec![ScreenPoint::new(1.0, 2.0), ScreenPoint::new(3.5, 4.25)],
                closed: true,
            }],
        };
        assert_eq!(path.to_svg_d(), "M1.00,2.00L3.50,4.25Z");
    }
}
