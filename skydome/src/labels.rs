//! Label anchors and the hover label slots.
//!
//! Shape labels (constellations) are placed from the shape's screen bounding
//! box: vertically just outside the box on the side away from the disc centre,
//! horizontally at the box midpoint unless that would push the text off the
//! round viewport. Point labels (stars, planets) only pick an anchor and an em
//! offset from the quadrant the point sits in.
//!
//! Each object category owns exactly one [`HoverLabel`], repositioned and
//! retexted on every hover rather than created per object.

use serde::{Deserialize, Serialize};

use crate::projection::ScreenPoint;
use crate::shape::BoundingBox;

/// Default divisor giving the label padding as `radius / divisor`
pub const DEFAULT_PADDING_DIVISOR: f64 = 80.0;

/// Opacity of a shown hover label
pub const SHOWN_OPACITY: f64 = 0.9;

/// Horizontal alignment of text relative to its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

impl TextAnchor {
    /// Value of the SVG `text-anchor` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAnchor::Start => "start",
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// Measured size of a rendered label in screen units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelSize {
    pub width: f64,
    pub height: f64,
}

impl LabelSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Rough size of `text` at `font_size`, for surfaces that cannot measure text
    pub fn estimate(text: &str, font_size: f64) -> Self {
        Self {
            width: text.chars().count() as f64 * font_size * 0.6,
            height: font_size,
        }
    }

    /// Finite and non-negative in both dimensions
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width >= 0.0 && self.height >= 0.0
    }
}

/// Where to draw a shape's label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelAnchor {
    pub x: f64,
    pub y: f64,
    pub text_anchor: TextAnchor,
}

/// True if `(x, y)` lies strictly inside the disc of `radius` centred at `(radius, radius)`
pub fn is_point_on_circle(x: f64, y: f64, radius: f64) -> bool {
    (x - radius).hypot(y - radius) < radius
}

/// Places shape labels with a padding of `radius / padding_divisor`.
#[derive(Debug, Clone, Copy)]
pub struct LabelPlacer {
    padding_divisor: f64,
}

impl Default for LabelPlacer {
    fn default() -> Self {
        Self {
            padding_divisor: DEFAULT_PADDING_DIVISOR,
        }
    }
}

impl LabelPlacer {
    pub fn new(padding_divisor: f64) -> Self {
        Self { padding_divisor }
    }

    /// Label anchor for a shape with screen bounds `bbox`.
    ///
    /// Without usable label metrics the horizontal midpoint is kept.
    pub fn place(&self, bbox: &BoundingBox, radius: f64, size: Option<LabelSize>) -> LabelAnchor {
        let offset = radius / self.padding_divisor;
        let center = bbox.center();

        let y = if center.y < radius {
            bbox.max_y + offset
        } else {
            bbox.min_y - offset
        };

        let midpoint = LabelAnchor {
            x: center.x,
            y,
            text_anchor: TextAnchor::Middle,
        };
        let Some(size) = size.filter(LabelSize::is_valid) else {
            return midpoint;
        };

        let left = center.x - size.width / 2.0;
        let right = center.x + size.width / 2.0;
        let top = y;
        let bottom = y + size.height;

        let left_off = !is_point_on_circle(left, bottom, radius) && !is_point_on_circle(left, top, radius);
        let right_off =
            !is_point_on_circle(right, bottom, radius) && !is_point_on_circle(right, top, radius);

        if left_off {
            LabelAnchor {
                x: bbox.max_x,
                y,
                text_anchor: TextAnchor::Start,
            }
        } else if right_off {
            LabelAnchor {
                x: bbox.min_x,
                y,
                text_anchor: TextAnchor::End,
            }
        } else {
            midpoint
        }
    }
}

/// Place a shape label with the default padding
pub fn place_label(bbox: &BoundingBox, radius: f64, size: Option<LabelSize>) -> LabelAnchor {
    LabelPlacer::default().place(bbox, radius, size)
}

/// Anchor and em offsets for a label next to a point object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLabel {
    pub text_anchor: TextAnchor,
    pub dx_em: f64,
    pub dy_em: f64,
}

/// Label offsets for a point at `point`: text extends toward the disc centre
/// horizontally, and drops below points in the top quarter of the disc.
pub fn point_label_offset(point: &ScreenPoint, radius: f64) -> PointLabel {
    let (text_anchor, dx_em) = if point.x < radius {
        (TextAnchor::Start, 0.35)
    } else {
        (TextAnchor::End, -0.35)
    };
    let dy_em = if point.y < radius / 2.0 { 0.70 } else { -0.35 };
    PointLabel {
        text_anchor,
        dx_em,
        dy_em,
    }
}

/// Object categories with their own hover label slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectCategory {
    Star,
    Planet,
    Constellation,
    Sun,
    Moon,
}

impl ObjectCategory {
    pub const ALL: [ObjectCategory; 5] = [
        ObjectCategory::Star,
        ObjectCategory::Planet,
        ObjectCategory::Constellation,
        ObjectCategory::Sun,
        ObjectCategory::Moon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectCategory::Star => "star",
            ObjectCategory::Planet => "planet",
            ObjectCategory::Constellation => "constellation",
            ObjectCategory::Sun => "sun",
            ObjectCategory::Moon => "moon",
        }
    }
}

/// Identifies one object in a snapshot: its category and index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    pub category: ObjectCategory,
    pub index: usize,
}

impl ObjectId {
    pub fn new(category: ObjectCategory, index: usize) -> Self {
        Self { category, index }
    }
}

/// Where a hover label goes on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelPlacement {
    /// Shape label from [`place_label`]
    Shape(LabelAnchor),
    /// Point label at `point` with offsets from [`point_label_offset`]
    Point { point: ScreenPoint, offset: PointLabel },
}

/// Everything needed to show the hover label for one object.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverTarget {
    pub id: ObjectId,
    pub text: String,
    pub placement: LabelPlacement,
}

/// Observable state of a hover label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverState {
    Hidden,
    ShownFor(ObjectId),
}

/// Single reusable label for one object category.
///
/// Hiding keeps the previous text and placement; showing a new object
/// overwrites both without passing through [`HoverState::Hidden`].
#[derive(Debug, Clone, PartialEq)]
pub struct HoverLabel {
    state: HoverState,
    text: String,
    placement: Option<LabelPlacement>,
}

impl Default for HoverLabel {
    fn default() -> Self {
        Self::new()
    }
}

impl HoverLabel {
    pub fn new() -> Self {
        Self {
            state: HoverState::Hidden,
            text: String::new(),
            placement: None,
        }
    }

    /// Show the label for `target`, or hide it with `None`
    pub fn set_hover_target(&mut self, target: Option<HoverTarget>) {
        match target {
            Some(target) => {
                log::debug!("hover label shown for {:?} ({})", target.id, target.text);
                self.state = HoverState::ShownFor(target.id);
                self.text = target.text;
                self.placement = Some(target.placement);
            }
            None => {
                if self.state != HoverState::Hidden {
                    log::debug!("hover label hidden");
                }
                self.state = HoverState::Hidden;
            }
        }
    }

    pub fn state(&self) -> HoverState {
        self.state
    }

    pub fn is_shown(&self) -> bool {
        matches!(self.state, HoverState::ShownFor(_))
    }

    pub fn opacity(&self) -> f64 {
        if self.is_shown() {
            SHOWN_OPACITY
        } else {
            0.0
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn placement(&self) -> Option<&LabelPlacement> {
        self.placement.as_ref()
    }
}

/// One hover label per object category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelSlots {
    star: HoverLabel,
    planet: HoverLabel,
    constellation: HoverLabel,
    sun: HoverLabel,
    moon: HoverLabel,
}

impl LabelSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, category: ObjectCategory) -> &HoverLabel {
        match category {
            ObjectCategory::Star => &self.star,
            ObjectCategory::Planet => &self.planet,
            ObjectCategory::Constellation => &self.constellation,
            ObjectCategory::Sun => &self.sun,
            ObjectCategory::Moon => &self.moon,
        }
    }

    pub fn slot_mut(&mut self, category: ObjectCategory) -> &mut HoverLabel {
        match category {
            ObjectCategory::Star => &mut self.star,
            ObjectCategory::Planet => &mut self.planet,
            ObjectCategory::Constellation => &mut self.constellation,
            ObjectCategory::Sun => &mut self.sun,
            ObjectCategory::Moon => &mut self.moon,
        }
    }

    /// Route a hover to its category's slot
    pub fn hover(&mut self, target: HoverTarget) {
        self.slot_mut(target.id.category).set_hover_target(Some(target));
    }

    /// Hide the slot for `category`
    pub fn unhover(&mut self, category: ObjectCategory) {
        self.slot_mut(category).set_hover_target(None);
    }

    /// Hide every slot
    pub fn hide_all(&mut self) {
        for category in ObjectCategory::ALL {
            self.unhover(category);
        }
    }

    /// Slots currently shown, in category order
    pub fn shown(&self) -> impl Iterator<Item = &HoverLabel> {
        ObjectCategory::ALL
            .into_iter()
            .map(|c| self.slot(c))
            .filter(|label| label.is_shown())
    }
}
