//! Location finder view
//!
//! Holds the coordinate a search is centred on and the last successful
//! result list. Device geolocation happens in the browser; the outcome is
//! handed to [`LocationFinder::locate`] as a reading. A failed reading keeps
//! the configured fallback, and a failed search keeps the previous results.

use std::sync::Arc;

use crate::config::MapsConfig;
use crate::models::{Coordinate, MapPin, Notice, PinKind, PlaceResult};
use crate::stores::{NearbySearch, PlacesError, PlacesLookup, PlacesStatus};

const CURRENT_LOCATION_LABEL: &str = "Your Location";
const FALLBACK_NOTICE: &str = "Using default location.";
const NO_RESULTS_NOTICE: &str = "No hospitals found nearby.";

/// Why the device could not report a position
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeolocationError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    Unavailable,
    #[error("timed out")]
    Timeout,
    #[error("geolocation not supported")]
    Unsupported,
    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },
}

impl GeolocationError {
    /// Map a browser `GeolocationPositionError.code`; 0 means the browser
    /// has no geolocation support
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => Self::Unsupported,
            1 => Self::PermissionDenied,
            3 => Self::Timeout,
            _ => Self::Unavailable,
        }
    }
}

pub struct LocationFinder {
    places: Arc<dyn PlacesLookup>,
    fallback: Coordinate,
    radius_meters: u32,
    category: String,
    current: Coordinate,
    results: Vec<PlaceResult>,
    notice: Option<Notice>,
}

impl LocationFinder {
    /// A finder centred on the fallback coordinate
    pub fn new(places: Arc<dyn PlacesLookup>, maps: &MapsConfig) -> Self {
        let fallback = maps.fallback();
        Self {
            places,
            fallback,
            radius_meters: maps.radius_meters,
            category: maps.category.clone(),
            current: fallback,
            results: Vec::new(),
            notice: None,
        }
    }

    /// Seed the result list, e.g. with what the browser currently shows
    pub fn with_results(mut self, results: Vec<PlaceResult>) -> Self {
        self.results = results;
        self
    }

    /// Adopt a device reading, falling back on any failure.
    pub fn locate(&mut self, reading: Result<Coordinate, GeolocationError>) -> Coordinate {
        let reading = reading.and_then(|coordinate| {
            if coordinate.is_valid() {
                Ok(coordinate)
            } else {
                Err(GeolocationError::InvalidCoordinate {
                    lat: coordinate.lat,
                    lng: coordinate.lng,
                })
            }
        });

        match reading {
            Ok(coordinate) => {
                self.current = coordinate;
            }
            Err(e) => {
                tracing::warn!("Error getting location: {}", e);
                self.current = self.fallback;
                self.notice = Some(Notice::info(FALLBACK_NOTICE));
            }
        }

        self.current
    }

    /// Run one nearby search around the current coordinate.
    ///
    /// Only an OK status replaces the result list.
    pub async fn search(&mut self) -> Result<usize, PlacesError> {
        let request = NearbySearch {
            location: self.current,
            radius_meters: self.radius_meters,
            category: self.category.clone(),
        };

        match self.places.nearby_search(&request).await {
            Ok(results) => {
                tracing::debug!(
                    lat = request.location.lat,
                    lng = request.location.lng,
                    count = results.len(),
                    "Nearby search succeeded"
                );
                self.results = results;
                Ok(self.results.len())
            }
            Err(e) => {
                self.notice = Some(match &e {
                    PlacesError::Status(PlacesStatus::ZeroResults) => {
                        tracing::info!("Nearby search returned no results");
                        Notice::info(NO_RESULTS_NOTICE)
                    }
                    PlacesError::Status(status) => {
                        tracing::warn!("Nearby search failed with status {}", status);
                        Notice::error(format!("Hospital search failed ({}).", status))
                    }
                    PlacesError::Unavailable(reason) => {
                        tracing::error!("Nearby search unavailable: {}", reason);
                        Notice::error("Hospital search is unavailable right now.")
                    }
                });
                Err(e)
            }
        }
    }

    /// Pins for the map: the current coordinate first, then each result
    pub fn pins(&self) -> Vec<MapPin> {
        std::iter::once(MapPin {
            label: CURRENT_LOCATION_LABEL.to_string(),
            position: self.current,
            kind: PinKind::Current,
        })
        .chain(self.results.iter().map(|place| MapPin {
            label: place.name.clone(),
            position: place.location,
            kind: PinKind::Place,
        }))
        .collect()
    }

    pub fn current(&self) -> Coordinate {
        self.current
    }

    pub fn results(&self) -> &[PlaceResult] {
        &self.results
    }

    pub fn radius_meters(&self) -> u32 {
        self.radius_meters
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted places lookup that records every request
    struct ScriptedPlaces {
        replies: Mutex<Vec<Result<Vec<PlaceResult>, PlacesError>>>,
        requests: Mutex<Vec<NearbySearch>>,
    }

    impl ScriptedPlaces {
        fn new(replies: Vec<Result<Vec<PlaceResult>, PlacesError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PlacesLookup for ScriptedPlaces {
        async fn nearby_search(
            &self,
            request: &NearbySearch,
        ) -> Result<Vec<PlaceResult>, PlacesError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies.lock().unwrap().remove(0)
        }
    }

    fn hospital(name: &str, lat: f64, lng: f64) -> PlaceResult {
        PlaceResult {
            name: name.to_string(),
            location: Coordinate::new(lat, lng),
        }
    }

    #[test]
    fn test_geolocation_error_codes() {
        assert_eq!(GeolocationError::from_code(1), GeolocationError::PermissionDenied);
        assert_eq!(GeolocationError::from_code(2), GeolocationError::Unavailable);
        assert_eq!(GeolocationError::from_code(3), GeolocationError::Timeout);
        assert_eq!(GeolocationError::from_code(0), GeolocationError::Unsupported);
    }

    #[test]
    fn test_locate_denied_keeps_fallback() {
        let mut finder = LocationFinder::new(ScriptedPlaces::new(vec![]), &MapsConfig::default());

        let at = finder.locate(Err(GeolocationError::PermissionDenied));

        assert_eq!(at, Coordinate::new(20.5937, 78.9629));
        assert_eq!(finder.notice(), Some(&Notice::info("Using default location.")));
    }

    #[test]
    fn test_locate_invalid_reading_falls_back() {
        let mut finder = LocationFinder::new(ScriptedPlaces::new(vec![]), &MapsConfig::default());

        finder.locate(Ok(Coordinate::new(120.0, 0.0)));
        assert_eq!(finder.current(), MapsConfig::default().fallback());
    }

    #[test]
    fn test_locate_adopts_device_position() {
        let mut finder = LocationFinder::new(ScriptedPlaces::new(vec![]), &MapsConfig::default());

        finder.locate(Ok(Coordinate::new(12.9716, 77.5946)));
        assert_eq!(finder.current(), Coordinate::new(12.9716, 77.5946));
        assert!(finder.notice().is_none());
    }

    #[tokio::test]
    async fn test_search_uses_configured_radius_and_category() {
        let places = ScriptedPlaces::new(vec![Ok(vec![hospital("City Hospital", 12.97, 77.59)])]);
        let mut finder = LocationFinder::new(places.clone(), &MapsConfig::default());
        finder.locate(Ok(Coordinate::new(12.9716, 77.5946)));

        assert_eq!(finder.search().await.unwrap(), 1);

        let requests = places.requests.lock().unwrap();
        assert_eq!(requests[0].radius_meters, 5000);
        assert_eq!(requests[0].category, "hospital");
        assert_eq!(requests[0].location, Coordinate::new(12.9716, 77.5946));
    }

    #[tokio::test]
    async fn test_pins_include_current_location_first() {
        let places = ScriptedPlaces::new(vec![Ok(vec![
            hospital("City Hospital", 12.97, 77.59),
            hospital("Lake Clinic", 12.98, 77.60),
        ])]);
        let mut finder = LocationFinder::new(places, &MapsConfig::default());
        finder.search().await.unwrap();

        let pins = finder.pins();
        assert_eq!(pins.len(), 3);
        assert_eq!(pins[0].kind, PinKind::Current);
        assert_eq!(pins[0].position, finder.current());
        assert_eq!(pins[1].label, "City Hospital");
        assert_eq!(pins[2].kind, PinKind::Place);
    }

    #[tokio::test]
    async fn test_non_ok_status_keeps_previous_results() {
        let places = ScriptedPlaces::new(vec![
            Ok(vec![hospital("City Hospital", 12.97, 77.59)]),
            Err(PlacesError::Status(PlacesStatus::OverQueryLimit)),
        ]);
        let mut finder = LocationFinder::new(places, &MapsConfig::default());

        finder.search().await.unwrap();
        let err = finder.search().await.unwrap_err();

        assert!(matches!(err, PlacesError::Status(PlacesStatus::OverQueryLimit)));
        assert_eq!(finder.results().len(), 1);
        assert_eq!(finder.results()[0].name, "City Hospital");
        assert!(finder.notice().map_or(false, Notice::is_error));
    }

    #[tokio::test]
    async fn test_zero_results_is_info_and_keeps_results() {
        let places = ScriptedPlaces::new(vec![Err(PlacesError::Status(PlacesStatus::ZeroResults))]);
        let mut finder = LocationFinder::new(places, &MapsConfig::default())
            .with_results(vec![hospital("Shown Before", 1.0, 1.0)]);

        assert!(finder.search().await.is_err());
        assert_eq!(finder.results().len(), 1);
        assert_eq!(finder.notice(), Some(&Notice::info("No hospitals found nearby.")));
    }
}
