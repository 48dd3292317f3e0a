//! Command line argument types shared by the sky dome binaries.

use std::time::Duration;

use crate::projection::Rotation;

/// Parse a rotation string in format "lambda,phi" (degrees)
pub fn parse_rotation(s: &str) -> Result<Rotation, String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        return Err("Rotation must be in format 'lambda,phi'".to_string());
    }

    let lambda = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid lambda value".to_string())?;
    let phi = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid phi value".to_string())?;

    if !lambda.is_finite() || !phi.is_finite() {
        return Err("Rotation angles must be finite".to_string());
    }
    Ok(Rotation::new(lambda, phi))
}

/// Parse duration string with units (e.g., "1.5s", "16ms", "2000us")
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    let (num_str, unit) = if let Some(num) = s.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = s.strip_suffix("us") {
        (num, "us")
    } else if let Some(num) = s.strip_suffix('s') {
        (num, "s")
    } else {
        // Bare numbers are milliseconds, the natural unit for frame intervals
        (s, "ms")
    };

    let value: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid numeric value: {}", num_str))?;

    if !value.is_finite() || value < 0.0 {
        return Err("Duration must be a non-negative number".to_string());
    }

    let seconds = match unit {
        "us" => value / 1e6,
        "ms" => value / 1e3,
        _ => value,
    };
    let duration = Duration::from_secs_f64(seconds);
    if duration.is_zero() {
        return Err("Duration must be greater than zero".to_string());
    }
    Ok(duration)
}

/// Wrapper for Duration that parses from the command line and has a nice Display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationArg(pub Duration);

impl std::str::FromStr for DurationArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).map(DurationArg)
    }
}

impl std::fmt::Display for DurationArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let duration = self.0;
        let total_ms = duration.as_millis();

        if total_ms >= 1000 && total_ms % 1000 == 0 {
            write!(f, "{}s", total_ms / 1000)
        } else if total_ms >= 1000 {
            write!(f, "{:.3}s", duration.as_secs_f64())
        } else {
            write!(f, "{}ms", total_ms)
        }
    }
}

impl Default for DurationArg {
    /// One frame at 60 Hz
    fn default() -> Self {
        DurationArg(Duration::from_micros(16_667))
    }
}
