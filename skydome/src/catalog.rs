//! Sky snapshot records as delivered by the position service.
//!
//! A snapshot is everything the dome needs for one location and time: the star
//! catalogue, constellation outlines, planets, the sun (under the service's
//! `sundata` key), the moon with its co-longitude, and the rotation that puts
//! the observer's zenith at the centre of the disc.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coords::{SkyPosition, SphericalCoord};
use crate::labels::{ObjectCategory, ObjectId};
use crate::projection::Rotation;
use crate::shape::Shape;
use crate::{Result, SkyError};

fn default_color() -> String {
    "#ffffff".to_string()
}

/// A star, planet or the sun.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyObject {
    #[serde(default)]
    pub name: Option<String>,
    /// Right ascension in degrees
    pub ra: f64,
    /// Declination in degrees
    pub dec: f64,
    /// Apparent visual magnitude (smaller is brighter)
    #[serde(default)]
    pub magnitude: f64,
    /// CSS colour string
    #[serde(default = "default_color")]
    pub color: String,
}

impl SkyObject {
    pub fn new(name: Option<&str>, ra: f64, dec: f64, magnitude: f64, color: &str) -> Self {
        Self {
            name: name.map(str::to_string),
            ra,
            dec,
            magnitude,
            color: color.to_string(),
        }
    }

    /// Name for labels; unnamed objects get an empty string
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    fn validate(&self, what: &str, index: usize) -> Result<()> {
        if !self.coord().is_valid() {
            return Err(SkyError::InvalidSnapshot(format!(
                "{what} {index} ({}) has invalid position ({}, {})",
                self.label(),
                self.ra,
                self.dec
            )));
        }
        if !self.magnitude.is_finite() {
            return Err(SkyError::InvalidSnapshot(format!(
                "{what} {index} ({}) has non-finite magnitude",
                self.label()
            )));
        }
        Ok(())
    }
}

impl SkyPosition for SkyObject {
    fn ra(&self) -> f64 {
        self.ra
    }

    fn dec(&self) -> f64 {
        self.dec
    }
}

/// The moon: a sky object plus the data needed to draw its phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moon {
    #[serde(flatten)]
    pub body: SkyObject,
    /// Lunar co-longitude in degrees
    pub colong: f64,
    /// Phase description shown in the hover label
    #[serde(default)]
    pub phase: Option<String>,
}

impl SkyPosition for Moon {
    fn ra(&self) -> f64 {
        self.body.ra
    }

    fn dec(&self) -> f64 {
        self.body.dec
    }
}

/// Constellation boundary rings and line art, as `[ra, dec]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constellation {
    pub name: String,
    /// One ring for most constellations, several for split ones like Serpens
    #[serde(default)]
    pub bound_verts: Vec<Vec<[f64; 2]>>,
    #[serde(default)]
    pub line_groups: Vec<Vec<[f64; 2]>>,
}

impl Constellation {
    pub fn boundary(&self) -> Shape {
        Shape::polygon_from_pairs(&self.bound_verts)
    }

    pub fn lines(&self) -> Shape {
        Shape::lines_from_pairs(&self.line_groups)
    }

    fn validate(&self, index: usize) -> Result<()> {
        let bad = self
            .bound_verts
            .iter()
            .chain(self.line_groups.iter())
            .flatten()
            .find(|p| !SphericalCoord::from(**p).is_valid());
        match bad {
            Some(p) => Err(SkyError::InvalidSnapshot(format!(
                "constellation {index} ({}) has invalid vertex ({}, {})",
                self.name, p[0], p[1]
            ))),
            None => Ok(()),
        }
    }
}

/// Everything to draw for one place and time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkySnapshot {
    #[serde(default)]
    pub stars: Vec<SkyObject>,
    #[serde(default)]
    pub constellations: Vec<Constellation>,
    #[serde(default)]
    pub planets: Vec<SkyObject>,
    #[serde(default, rename = "sundata")]
    pub sun: Option<SkyObject>,
    #[serde(default)]
    pub moon: Option<Moon>,
    /// Rotation placing the observer's zenith at the disc centre
    #[serde(default)]
    pub rotation: Option<Rotation>,
}

impl SkySnapshot {
    /// Parse and validate a snapshot from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: SkySnapshot = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Load and validate a snapshot from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&json)?;
        log::info!(
            "loaded snapshot from {}: {} stars, {} constellations, {} planets",
            path.display(),
            snapshot.stars.len(),
            snapshot.constellations.len(),
            snapshot.planets.len()
        );
        Ok(snapshot)
    }

    /// Save as pretty-printed JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Find an object by name (case-insensitive), searching every category
    pub fn find_object(&self, name: &str) -> Option<ObjectId> {
        let matches = |object: &SkyObject| {
            object
                .name
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        };
        let find_in = |category, objects: &[SkyObject]| {
            objects
                .iter()
                .position(matches)
                .map(|i| ObjectId::new(category, i))
        };

        find_in(ObjectCategory::Star, &self.stars)
            .or_else(|| find_in(ObjectCategory::Planet, &self.planets))
            .or_else(|| {
                self.constellations
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(name))
                    .map(|i| ObjectId::new(ObjectCategory::Constellation, i))
            })
            .or_else(|| {
                self.sun
                    .as_ref()
                    .filter(|sun| matches(*sun))
                    .map(|_| ObjectId::new(ObjectCategory::Sun, 0))
            })
            .or_else(|| {
                self.moon
                    .as_ref()
                    .filter(|moon| matches(&moon.body))
                    .map(|_| ObjectId::new(ObjectCategory::Moon, 0))
            })
    }

    /// Reject non-finite values and declinations outside ±90°
    pub fn validate(&self) -> Result<()> {
        for (i, star) in self.stars.iter().enumerate() {
            star.validate("star", i)?;
        }
        for (i, planet) in self.planets.iter().enumerate() {
            planet.validate("planet", i)?;
        }
        if let Some(sun) = &self.sun {
            sun.validate("sun", 0)?;
        }
        if let Some(moon) = &self.moon {
            moon.body.validate("moon", 0)?;
            if !moon.colong.is_finite() {
                return Err(SkyError::InvalidSnapshot(
                    "moon co-longitude is not finite".to_string(),
                ));
            }
        }
        for (i, constellation) in self.constellations.iter().enumerate() {
            constellation.validate(i)?;
        }
        if let Some(rotation) = &self.rotation {
            if !rotation.lambda.is_finite() || !rotation.phi.is_finite() {
                return Err(SkyError::InvalidSnapshot(format!(
                    "rotation ({}, {}) is not finite",
                    rotation.lambda, rotation.phi
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r##"{
        "stars": [
            {"ra": 88.79, "dec": 7.41, "magnitude": 0.5, "name": "Betelgeuse", "color": "#ffcc6f"},
            {"ra": 10.0, "dec": -5.0, "magnitude": 4.1, "name": null}
        ],
        "constellations": [
            {"name": "Ori",
             "bound_verts": [[[70.0, -10.0], [70.0, 20.0], [95.0, 20.0], [95.0, -10.0]]],
             "line_groups": [[[88.79, 7.41], [78.63, -8.2]]]}
        ],
        "planets": [{"ra": 120.0, "dec": 20.0, "magnitude": -2.0, "name": "Jupiter", "color": "#e0c080"}],
        "sundata": {"ra": 200.0, "dec": -10.0, "magnitude": -26.7, "name": "Sun", "color": "#ffff00"},
        "moon": {"ra": 30.0, "dec": 12.0, "magnitude": -10.0, "name": "Moon", "colong": 45.0, "phase": "Waxing Crescent"},
        "rotation": {"lambda": -122.4, "phi": -37.8}
    }"##;

    #[test]
    fn test_parse_service_json() {
        let snapshot = SkySnapshot::from_json(SAMPLE).unwrap();
        assert_eq!(snapshot.stars.len(), 2);
        assert_eq!(snapshot.stars[1].name, None);
        assert_eq!(snapshot.stars[1].color, "#ffffff");
        assert_eq!(snapshot.sun.as_ref().map(|s| s.label()), Some("Sun"));

        let moon = snapshot.moon.as_ref().unwrap();
        assert_eq!(moon.colong, 45.0);
        assert_eq!(moon.body.label(), "Moon");
        assert_eq!(moon.phase.as_deref(), Some("Waxing Crescent"));

        assert_eq!(snapshot.rotation, Some(Rotation::new(-122.4, -37.8)));
        assert!(matches!(snapshot.constellations[0].boundary(), Shape::Polygon { ref rings } if rings.len() == 1));
    }

    #[test]
    fn test_find_object_by_name() {
        let snapshot = SkySnapshot::from_json(SAMPLE).unwrap();
        assert_eq!(
            snapshot.find_object("betelgeuse"),
            Some(ObjectId::new(ObjectCategory::Star, 0))
        );
        assert_eq!(
            snapshot.find_object("Jupiter"),
            Some(ObjectId::new(ObjectCategory::Planet, 0))
        );
        assert_eq!(
            snapshot.find_object("Ori"),
            Some(ObjectId::new(ObjectCategory::Constellation, 0))
        );
        assert_eq!(
            snapshot.find_object("moon"),
            Some(ObjectId::new(ObjectCategory::Moon, 0))
        );
        assert_eq!(snapshot.find_object("Pluto"), None);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let snapshot = SkySnapshot::from_json("{}").unwrap();
        assert!(snapshot.stars.is_empty());
        assert!(snapshot.sun.is_none());
        assert!(snapshot.rotation.is_none());
    }

    #[test]
    fn test_invalid_declination_is_rejected() {
        let json = r#"{"stars": [{"ra": 0.0, "dec": 95.0, "magnitude": 1.0}]}"#;
        let err = SkySnapshot::from_json(json).unwrap_err();
        assert!(matches!(err, SkyError::InvalidSnapshot(_)));
        assert!(err.to_string().contains("star 0"));
    }

    #[test]
    fn test_invalid_constellation_vertex_is_rejected() {
        let json = r#"{"constellations": [{"name": "Bad", "bound_verts": [[[0.0, 0.0], [10.0, -91.0], [5.0, 5.0]]]}]}"#;
        assert!(matches!(
            SkySnapshot::from_json(json),
            Err(SkyError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_a_json_error() {
        assert!(matches!(
            SkySnapshot::from_json("{\"stars\": ["),
            Err(SkyError::Json(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snapshot = SkySnapshot::from_json(SAMPLE).unwrap();
        snapshot.save_to_file(&path).unwrap();
        assert_eq!(SkySnapshot::load_from_file(&path).unwrap(), snapshot);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = SkySnapshot::load_from_file(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(SkyError::Io(_))));
    }
}
