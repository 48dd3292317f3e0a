//! Visibility of projected shapes.
//!
//! A shape is visible when any corner of its clipped screen bounding box is
//! finite. Partially visible shapes keep finite bounds from the part that lands
//! on the disc; a shape wholly on the far hemisphere contributes no points and
//! keeps the all-infinite [`BoundingBox::EMPTY`].

use crate::clip::{ScreenPath, SphereClipper, DEFAULT_RESAMPLE_STEP_DEG};
use crate::projection::ViewState;
use crate::shape::{BoundingBox, Shape};

/// True if any corner of the box is finite
pub fn any_corner_finite(bbox: &BoundingBox) -> bool {
    bbox.corners().iter().any(|c| c.is_finite())
}

/// Clip a shape under `view` with the default resampling step
pub fn project_shape(shape: &Shape, view: &ViewState) -> ScreenPath {
    SphereClipper::new(view.projection(), DEFAULT_RESAMPLE_STEP_DEG).clip(shape)
}

/// Screen bounding box of the visible part of `shape`
pub fn bounds(shape: &Shape, view: &ViewState) -> BoundingBox {
    project_shape(shape, view).bounds()
}

/// Whether any part of `shape` lands on the disc under `view`.
///
/// Degenerate rings and empty line groups produce no screen points and are
/// therefore never visible.
pub fn is_visible(shape: &Shape, view: &ViewState) -> bool {
    any_corner_finite(&bounds(shape, view))
}
