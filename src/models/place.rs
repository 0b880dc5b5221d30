//! Places and map models

use serde::{Deserialize, Serialize};

/// A point on the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A point of interest returned by the places lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResult {
    pub name: String,
    pub location: Coordinate,
}

/// What a pin on the map stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    /// The coordinate the search was centred on
    Current,
    /// A search result
    Place,
}

/// A marker rendered on the map surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPin {
    pub label: String,
    pub position: Coordinate,
    pub kind: PinKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validity() {
        assert!(Coordinate::new(20.5937, 78.9629).is_valid());
        assert!(Coordinate::new(-90.0, 180.0).is_valid());
        assert!(!Coordinate::new(90.5, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.1).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }
}
