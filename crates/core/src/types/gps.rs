//! GPS coordinate type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`GpsCoord`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GpsError {
    /// The input is not a `latitude, longitude` pair.
    #[error("GPS coordinate must be \"latitude, longitude\"")]
    Malformed,
    /// Latitude is outside [-90, 90].
    #[error("latitude {0} is out of range")]
    LatitudeOutOfRange(f64),
    /// Longitude is outside [-180, 180].
    #[error("longitude {0} is out of range")]
    LongitudeOutOfRange(f64),
}

/// A `latitude, longitude` pair.
///
/// Stored as the original free-form string was, but only after both components
/// parse as in-range decimal degrees.
///
/// ```
/// use entrega_core::GpsCoord;
///
/// let coord = GpsCoord::parse("-23.5505, -46.6333").unwrap();
/// assert_eq!(coord.latitude(), -23.5505);
/// assert!(GpsCoord::parse("91, 0").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoord {
    latitude: f64,
    longitude: f64,
}

impl GpsCoord {
    /// Parse a `latitude, longitude` string.
    ///
    /// # Errors
    ///
    /// Returns `GpsError` if the input is not two comma-separated decimal
    /// numbers, or either component is out of range.
    pub fn parse(s: &str) -> Result<Self, GpsError> {
        let (lat, long) = s.split_once(',').ok_or(GpsError::Malformed)?;

        let latitude: f64 = lat.trim().parse().map_err(|_| GpsError::Malformed)?;
        let longitude: f64 = long.trim().parse().map_err(|_| GpsError::Malformed)?;

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GpsError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GpsError::LongitudeOutOfRange(longitude));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for GpsCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

impl std::str::FromStr for GpsCoord {
    type Err = GpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let coord = GpsCoord::parse("-23.5505, -46.6333").unwrap();
        assert!((coord.latitude() - -23.5505).abs() < f64::EPSILON);
        assert!((coord.longitude() - -46.6333).abs() < f64::EPSILON);
        assert!(GpsCoord::parse("0,0").is_ok());
        assert!(GpsCoord::parse("90, 180").is_ok());
    }

    #[test]
    fn test_parse_out_of_range() {
        assert_eq!(
            GpsCoord::parse("90.1, 0"),
            Err(GpsError::LatitudeOutOfRange(90.1))
        );
        assert_eq!(
            GpsCoord::parse("0, -180.5"),
            Err(GpsError::LongitudeOutOfRange(-180.5))
        );
    }

    #[test]
    fn test_parse_malformed() {
        assert_eq!(GpsCoord::parse("not a coordinate"), Err(GpsError::Malformed));
        assert_eq!(GpsCoord::parse("12.3"), Err(GpsError::Malformed));
        assert_eq!(GpsCoord::parse("a, b"), Err(GpsError::Malformed));
    }

    #[test]
    fn test_display_roundtrip() {
        let coord = GpsCoord::parse("10.5, 20.25").unwrap();
        assert_eq!(coord.to_string(), "10.5, 20.25");
    }
}
