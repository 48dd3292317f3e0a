//! One draw pass over a sky snapshot.
//!
//! [`SkyRenderer::render`] is a pure function of the view, the snapshot, the
//! draw mode and the hover label slots. It runs the whole pipeline for every
//! object (projection, clipping, visibility, winding correction, then label
//! placement) and returns an ordered list of surface-independent draw
//! commands, back to front.

use serde::Serialize;

use crate::catalog::{Constellation, SkyObject, SkySnapshot};
use crate::clip::{ScreenPath, SphereClipper, SubPath};
use crate::config::SkyConfig;
use crate::coords::{SkyPosition, SphericalCoord};
use crate::labels::{
    point_label_offset, HoverState, HoverTarget, LabelAnchor, LabelPlacement, LabelSize,
    LabelSlots, ObjectCategory, ObjectId, TextAnchor,
};
use crate::projection::{OrthographicProjection, Rotation, ScreenPoint, ViewState};
use crate::shape::Shape;
use crate::visibility::any_corner_finite;
use crate::winding::WindingDecision;

/// Fill used for stars and planets in night mode
pub const NIGHT_MODE_COLOR: &str = "#a53529";

/// Font size assumed when estimating label extents
pub const LABEL_FONT_SIZE: f64 = 12.0;

/// Ecliptic drawn as a line through the equinoxes and solstices
const ECLIPTIC: [[f64; 2]; 5] = [[0.0, 0.0], [90.0, -23.4], [180.0, 0.0], [270.0, 23.4], [0.0, 0.0]];

/// Minimum radius of the invisible hover surround around point objects
const MIN_SURROUND_RADIUS: f64 = 4.0;

/// How much of the sky a pass draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DrawMode {
    /// Everything, with labels and constellations
    Full,
    /// Bright objects only, no labels or constellations
    Transition,
}

/// Presentation attributes shared by every command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Style {
    pub class: String,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: Option<f64>,
    pub opacity: f64,
}

impl Style {
    pub fn class(class: &str) -> Self {
        Self {
            class: class.to_string(),
            fill: None,
            stroke: None,
            stroke_width: None,
            opacity: 1.0,
        }
    }

    pub fn fill(mut self, fill: &str) -> Self {
        self.fill = Some(fill.to_string());
        self
    }

    pub fn stroke(mut self, stroke: &str, width: f64) -> Self {
        self.stroke = Some(stroke.to_string());
        self.stroke_width = Some(width);
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }
}

/// An invisible circle that makes a small object easier to hover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HitArea {
    pub id: ObjectId,
    pub radius: f64,
}

/// A single drawing instruction in screen coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawCommand {
    /// The sky disc itself
    Background { center: ScreenPoint, radius: f64, class: String },
    Path { path: ScreenPath, style: Style },
    Circle {
        center: ScreenPoint,
        radius: f64,
        style: Style,
        hit: Option<HitArea>,
    },
    Text {
        position: ScreenPoint,
        text: String,
        anchor: TextAnchor,
        dx_em: f64,
        dy_em: f64,
        style: Style,
    },
}

/// What a pass ended up drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FrameStats {
    pub stars: usize,
    pub planets: usize,
    pub constellations: usize,
    /// Constellations inverted in both orientations and left out
    pub ambiguous_constellations: usize,
    pub sun_visible: bool,
    pub moon_visible: bool,
}

/// Result of one draw pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub mode: DrawMode,
    pub view: ViewState,
    /// Sky contents, clipped to the disc
    pub commands: Vec<DrawCommand>,
    /// Decorations drawn beside the disc, outside the sky clip
    pub overlay: Vec<DrawCommand>,
    pub stats: FrameStats,
}

impl Frame {
    /// Topmost object whose hover area contains `point`
    pub fn hit_test(&self, point: &ScreenPoint) -> Option<ObjectId> {
        self.commands.iter().rev().find_map(|command| match command {
            DrawCommand::Circle {
                center,
                hit: Some(hit),
                ..
            } if center.distance_to(point) <= hit.radius => Some(hit.id),
            _ => None,
        })
    }
}

/// Compass rose in the top-right corner beside the disc.
///
/// Seen from below, east and west swap places compared with a map, so west
/// sits on the right. Four spikes around a centre point, one letter per spike.
pub fn compass_rose(radius: f64) -> Vec<DrawCommand> {
    let size = radius / 5.0;
    let c = size / 2.0;
    let nub = c - size / 8.0;
    let (shift_x, shift_y) = (2.0 * radius - size, size / 3.0);
    let spike = [(c, c), (c, 0.0), (nub, nub)];
    // (letter, anchor, dy in em standing in for the baseline alignment)
    let letters = [
        ("W", TextAnchor::Start, 0.35),
        ("S", TextAnchor::Middle, 0.8),
        ("E", TextAnchor::End, 0.35),
        ("N", TextAnchor::Middle, 0.0),
    ];

    let mut commands = Vec::with_capacity(8);
    for (i, (letter, anchor, dy_em)) in letters.into_iter().enumerate() {
        // Quarter turns clockwise on screen (y grows downward)
        let (sin_t, cos_t) = (i as f64 * std::f64::consts::FRAC_PI_2).sin_cos();
        let points = spike
            .iter()
            .map(|&(x, y)| {
                let (dx, dy) = (x - c, y - c);
                ScreenPoint::new(
                    shift_x + c + dx * cos_t - dy * sin_t,
                    shift_y + c + dx * sin_t + dy * cos_t,
                )
            })
            .collect();
        commands.push(DrawCommand::Path {
            path: ScreenPath {
                subpaths: vec![SubPath { points, closed: true }],
            },
            style: Style::class("compass compass-spike"),
        });
        commands.push(DrawCommand::Text {
            position: ScreenPoint::new(
                shift_x + (c + 10.0) * (1.0 + cos_t) - 10.0,
                shift_y + (c + 5.0) * (1.0 + sin_t) - 5.0,
            ),
            text: letter.to_string(),
            anchor,
            dx_em: 0.0,
            dy_em,
            style: Style::class("compass compass-letter"),
        });
    }
    commands
}

/// Drawn radius of a star or planet of magnitude `magnitude`
pub fn star_radius(magnitude: f64) -> f64 {
    ((5.0 - magnitude) * 0.5).max(0.5)
}

/// Opacity of a star or planet; anything brighter than magnitude 0 is opaque
pub fn star_opacity(magnitude: f64) -> f64 {
    if magnitude < 0.0 {
        1.0
    } else {
        ((5.0 - magnitude) / 5.0).clamp(0.0, 1.0)
    }
}

/// Builds frames from snapshots under a fixed configuration.
#[derive(Debug, Clone)]
pub struct SkyRenderer {
    config: SkyConfig,
}

impl SkyRenderer {
    pub fn new(config: SkyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SkyConfig {
        &self.config
    }

    fn clipper(&self, projection: OrthographicProjection) -> SphereClipper {
        SphereClipper::new(projection, self.config.resample_step_deg)
    }

    /// Radius of the sun and moon discs
    fn body_radius(view: &ViewState) -> f64 {
        view.radius / 42.0
    }

    fn fill_for<'a>(&self, color: &'a str) -> &'a str {
        if self.config.night_mode {
            NIGHT_MODE_COLOR
        } else {
            color
        }
    }

    /// Draw everything visible under `view`
    pub fn render(
        &self,
        view: &ViewState,
        snapshot: &SkySnapshot,
        mode: DrawMode,
        labels: &LabelSlots,
    ) -> Frame {
        let mut frame = Frame {
            mode,
            view: *view,
            commands: Vec::new(),
            overlay: compass_rose(view.radius),
            stats: FrameStats::default(),
        };
        let clipper = self.clipper(view.projection());

        self.draw_background(view, snapshot, &mut frame);
        if self.config.show_ecliptic {
            self.draw_ecliptic(&clipper, &mut frame);
        }
        if mode == DrawMode::Full {
            for (i, constellation) in snapshot.constellations.iter().enumerate() {
                self.draw_constellation(view, &clipper, i, constellation, &mut frame);
            }
        }
        let stars = self.draw_points(view, mode, ObjectCategory::Star, &snapshot.stars, &mut frame);
        let sun_visible = match &snapshot.sun {
            Some(sun) => self.draw_sun(view, mode, sun, &mut frame),
            None => false,
        };
        let planets = self.draw_planets(view, mode, &snapshot.planets, &mut frame);
        let moon_visible = match &snapshot.moon {
            Some(moon) => self.draw_moon(view, mode, &moon.body, moon.colong, &mut frame),
            None => false,
        };
        frame.stats.stars = stars;
        frame.stats.sun_visible = sun_visible;
        frame.stats.planets = planets;
        frame.stats.moon_visible = moon_visible;
        if mode == DrawMode::Full {
            self.draw_hover_labels(labels, &mut frame);
        }

        log::debug!(
            "{:?} frame at ({:.2}, {:.2}): {} commands, {:?}",
            mode,
            view.rotation.lambda,
            view.rotation.phi,
            frame.commands.len(),
            frame.stats
        );
        frame
    }

    fn draw_background(&self, view: &ViewState, snapshot: &SkySnapshot, frame: &mut Frame) {
        let sun_up = snapshot
            .sun
            .as_ref()
            .is_some_and(|sun| view.projection().project(&sun.coord()).is_finite());
        let class = if sun_up { "sky-background day-sky" } else { "sky-background night-sky" };
        frame.commands.push(DrawCommand::Background {
            center: view.disc_center(),
            radius: view.radius,
            class: class.to_string(),
        });
    }

    fn draw_ecliptic(&self, clipper: &SphereClipper, frame: &mut Frame) {
        let line = Shape::lines_from_pairs(&[ECLIPTIC.to_vec()]);
        let path = clipper.clip(&line);
        if path.is_empty() {
            return;
        }
        frame.commands.push(DrawCommand::Path {
            path,
            style: Style::class("ecliptic").stroke("red", 2.0).opacity(0.6),
        });
    }

    /// Label anchor for a constellation, or `None` when it is not drawn.
    ///
    /// The label follows the line art when any of it is visible, and the
    /// corrected boundary otherwise.
    pub fn constellation_label(&self, view: &ViewState, constellation: &Constellation) -> Option<LabelAnchor> {
        let clipper = self.clipper(view.projection());
        let correction = self
            .config
            .winding_corrector()
            .correct(&constellation.boundary(), view, &clipper);
        if correction.decision.is_ambiguous() || correction.path.is_empty() {
            return None;
        }
        Some(self.label_for(view, &clipper, constellation, &correction.path))
    }

    fn label_for(
        &self,
        view: &ViewState,
        clipper: &SphereClipper,
        constellation: &Constellation,
        bounds_path: &ScreenPath,
    ) -> LabelAnchor {
        let line_box = clipper.clip(&constellation.lines()).bounds();
        let bbox = if any_corner_finite(&line_box) {
            line_box
        } else {
            bounds_path.bounds()
        };
        let size = LabelSize::estimate(&constellation.name, LABEL_FONT_SIZE);
        self.config.label_placer().place(&bbox, view.radius, Some(size))
    }

    fn draw_constellation(
        &self,
        view: &ViewState,
        clipper: &SphereClipper,
        index: usize,
        constellation: &Constellation,
        frame: &mut Frame,
    ) {
        let correction = self
            .config
            .winding_corrector()
            .correct(&constellation.boundary(), view, clipper);
        if let WindingDecision::Ambiguous = correction.decision {
            log::warn!("constellation {} ({index}) skipped: ambiguous winding", constellation.name);
            frame.stats.ambiguous_constellations += 1;
            return;
        }
        if !any_corner_finite(&correction.path.bounds()) {
            return;
        }

        let anchor = self.label_for(view, clipper, constellation, &correction.path);
        frame.commands.push(DrawCommand::Path {
            path: correction.path,
            style: Style::class("constellation-bounds"),
        });
        let lines = clipper.clip(&constellation.lines());
        if !lines.is_empty() {
            frame.commands.push(DrawCommand::Path {
                path: lines,
                style: Style::class("constellation-line"),
            });
        }
        frame.commands.push(DrawCommand::Text {
            position: ScreenPoint::new(anchor.x, anchor.y),
            text: constellation.name.clone(),
            anchor: anchor.text_anchor,
            dx_em: 0.0,
            dy_em: 0.0,
            style: Style::class("constellation-label sky-label"),
        });
        frame.stats.constellations += 1;
    }

    /// Draw one point object; returns whether it landed on the disc
    fn draw_point(
        &self,
        view: &ViewState,
        mode: DrawMode,
        id: ObjectId,
        object: &SkyObject,
        radius: f64,
        frame: &mut Frame,
    ) -> bool {
        if mode == DrawMode::Transition && object.magnitude >= self.config.transition_magnitude_cutoff {
            return false;
        }
        let center = view.projection().project(&object.coord());
        if !center.is_finite() {
            return false;
        }

        let class = id.category.as_str();
        let mut style = Style::class(class).fill(self.fill_for(&object.color));
        if mode == DrawMode::Full {
            style = style.opacity(star_opacity(object.magnitude));
        }
        let hit = (mode == DrawMode::Full && object.name.is_some()).then(|| HitArea {
            id,
            radius: radius.max(MIN_SURROUND_RADIUS),
        });
        frame.commands.push(DrawCommand::Circle {
            center,
            radius,
            style,
            hit,
        });
        true
    }

    fn draw_points(
        &self,
        view: &ViewState,
        mode: DrawMode,
        category: ObjectCategory,
        objects: &[SkyObject],
        frame: &mut Frame,
    ) -> usize {
        let mut drawn = 0;
        for (i, object) in objects.iter().enumerate() {
            let id = ObjectId::new(category, i);
            if self.draw_point(view, mode, id, object, star_radius(object.magnitude), frame) {
                drawn += 1;
            }
        }
        drawn
    }

    fn draw_sun(&self, view: &ViewState, mode: DrawMode, sun: &SkyObject, frame: &mut Frame) -> bool {
        let id = ObjectId::new(ObjectCategory::Sun, 0);
        self.draw_point(view, mode, id, sun, Self::body_radius(view), frame)
    }

    fn draw_planets(&self, view: &ViewState, mode: DrawMode, planets: &[SkyObject], frame: &mut Frame) -> usize {
        let drawn = self.draw_points(view, mode, ObjectCategory::Planet, planets, frame);
        if mode == DrawMode::Full && self.config.reveal_planets {
            for planet in planets {
                let center = view.projection().project(&planet.coord());
                if !center.is_finite() {
                    continue;
                }
                frame.commands.push(DrawCommand::Circle {
                    center,
                    radius: 3.0 * Self::body_radius(view),
                    style: Style::class("planet-highlight").stroke("red", 2.0).opacity(0.5),
                    hit: None,
                });
            }
        }
        drawn
    }

    /// Moon disc with its lit hemisphere, seen through a small projection
    /// centred on the moon's screen position.
    fn draw_moon(&self, view: &ViewState, mode: DrawMode, moon: &SkyObject, colong: f64, frame: &mut Frame) -> bool {
        let center = view.projection().project(&moon.coord());
        if !center.is_finite() {
            return false;
        }
        let radius = Self::body_radius(view);
        let hit = (mode == DrawMode::Full).then(|| HitArea {
            id: ObjectId::new(ObjectCategory::Moon, 0),
            radius: radius.max(MIN_SURROUND_RADIUS),
        });
        frame.commands.push(DrawCommand::Circle {
            center,
            radius,
            style: Style::class("moon-sphere").opacity(0.0),
            hit,
        });

        let moon_projection = OrthographicProjection::new(&Rotation::default(), radius, (center.x, center.y));
        let lit = Shape::circle(SphericalCoord::new(90.0 - colong, 0.0), 90.0, 6.0);
        let path = self.clipper(moon_projection).clip(&lit);
        if !path.is_empty() {
            frame.commands.push(DrawCommand::Path {
                path,
                style: Style::class("lit-moon").fill("white").stroke("white", 1.0),
            });
        }
        true
    }

    fn draw_hover_labels(&self, labels: &LabelSlots, frame: &mut Frame) {
        for label in labels.shown() {
            let (HoverState::ShownFor(id), Some(placement)) = (label.state(), label.placement()) else {
                continue;
            };
            let class = format!("{}-label sky-label", id.category.as_str());
            let (position, anchor, dx_em, dy_em) = match placement {
                LabelPlacement::Shape(a) => (ScreenPoint::new(a.x, a.y), a.text_anchor, 0.0, 0.0),
                LabelPlacement::Point { point, offset } => {
                    (*point, offset.text_anchor, offset.dx_em, offset.dy_em)
                }
            };
            frame.commands.push(DrawCommand::Text {
                position,
                text: label.text().to_string(),
                anchor,
                dx_em,
                dy_em,
                style: Style::class(&class).opacity(label.opacity()),
            });
        }
    }

    /// Build the hover label content for `id` under `view`.
    ///
    /// Returns `None` for unknown, unnamed or off-disc objects.
    pub fn hover_target(&self, view: &ViewState, snapshot: &SkySnapshot, id: ObjectId) -> Option<HoverTarget> {
        let point_target = |object: &SkyObject, text: String| {
            object.name.as_ref()?;
            let point = view.projection().project(&object.coord());
            if !point.is_finite() {
                return None;
            }
            Some(HoverTarget {
                id,
                text,
                placement: LabelPlacement::Point {
                    point,
                    offset: point_label_offset(&point, view.radius),
                },
            })
        };

        match id.category {
            ObjectCategory::Star => {
                let star = snapshot.stars.get(id.index)?;
                point_target(star, star.label().to_string())
            }
            ObjectCategory::Planet => {
                let planet = snapshot.planets.get(id.index)?;
                point_target(planet, planet.label().to_string())
            }
            ObjectCategory::Sun => {
                let sun = snapshot.sun.as_ref()?;
                point_target(sun, sun.label().to_string())
            }
            ObjectCategory::Moon => {
                let moon = snapshot.moon.as_ref()?;
                let text = match &moon.phase {
                    Some(phase) => format!("{} ({phase})", moon.body.label()),
                    None => moon.body.label().to_string(),
                };
                point_target(&moon.body, text)
            }
            ObjectCategory::Constellation => {
                let constellation = snapshot.constellations.get(id.index)?;
                let anchor = self.constellation_label(view, constellation)?;
                Some(HoverTarget {
                    id,
                    text: constellation.name.clone(),
                    placement: LabelPlacement::Shape(anchor),
                })
            }
        }
    }
}
