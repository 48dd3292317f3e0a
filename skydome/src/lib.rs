//! Celestial sphere projection for a planetarium sky dome.
//!
//! Stars, planets, the sun, the moon and constellation outlines are supplied as
//! spherical coordinates (right ascension / declination in degrees) by an
//! external position service. This crate maps them through a hemisphere-clipped
//! orthographic projection onto a disc of radius `r` centred at `(r, r)`, decides
//! what is visible, fixes boundary polygons whose winding makes them cover the
//! whole dome, and picks label anchors that stay on the disc.
//!
//! # Layers
//!
//! - [`projection`]: coordinate → screen point under a [`ViewState`]
//! - [`clip`]: great-circle resampling and horizon clipping of rings and lines
//! - [`visibility`]: bounding boxes and the "any corner finite" visibility test
//! - [`winding`]: `Normal | Inverted | Ambiguous` classification of boundary polygons
//! - [`labels`]: label anchors and the single-slot hover label state machine
//! - [`animator`]: cancellable linear rotation transitions driven by a [`animator::Scheduler`]
//! - [`render`]: `(ViewState, SkySnapshot, DrawMode) -> Frame`
//! - [`svg`]: frame serialisation to SVG and PNG
//!
//! # Examples
//!
//! ```rust
//! use skydome::{project, Rotation, SphericalCoord, ViewState};
//!
//! let view = ViewState::new(Rotation::new(0.0, 0.0), 300.0);
//! let center = project(&SphericalCoord::new(0.0, 0.0), &view);
//! assert_eq!((center.x, center.y), (300.0, 300.0));
//!
//! let antipode = project(&SphericalCoord::new(180.0, 0.0), &view);
//! assert!(!antipode.is_finite());
//! ```

use thiserror::Error;

pub mod animator;
pub mod args;
pub mod catalog;
pub mod clip;
pub mod config;
pub mod coords;
pub mod labels;
pub mod projection;
pub mod render;
pub mod shape;
pub mod svg;
pub mod visibility;
pub mod winding;

pub use catalog::{Constellation, Moon, SkyObject, SkySnapshot};
pub use config::SkyConfig;
pub use coords::{angular_separation, SphericalCoord};
pub use projection::{project, Rotation, ScreenPoint, ViewState};
pub use render::{DrawMode, Frame, SkyRenderer};
pub use shape::{BoundingBox, Shape};
pub use visibility::is_visible;
pub use winding::{correct_winding, WindingDecision};

/// Errors raised at the data and output boundaries of the sky dome.
///
/// Geometry itself never fails: off-disc points, ambiguous windings and missing
/// label metrics are all recovered locally. Only loading snapshots and config,
/// and writing rendered output, can produce a `SkyError`.
#[derive(Debug, Error)]
pub enum SkyError {
    /// Filesystem failure while reading or writing a snapshot, config or image.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot or config JSON could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot contents failed validation (non-finite or out-of-range angles).
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Configuration values are outside their usable range.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// SVG parsing or rasterisation failed.
    #[error("Render error: {0}")]
    Render(String),
}

/// Standard Result type for sky dome operations.
pub type Result<T> = std::result::Result<T, SkyError>;
