//! Places nearby-search client
//!
//! `GET {places_url}?location=<lat>,<lng>&radius=<m>&type=<category>&key=<key>`
//! answers `{ "results": [...], "status": "OK" | ... }`. Only `OK` counts as
//! success; every other status comes back as [`PlacesError::Status`].

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::{Coordinate, PlaceResult};
use crate::stores::{NearbySearch, PlacesError, PlacesLookup, PlacesStatus};

pub struct PlacesClient {
    client: reqwest::Client,
    places_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    #[serde(default)]
    results: Vec<RawPlace>,
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlace {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Coordinate,
}

impl RawPlace {
    /// Results without a location cannot be pinned and are dropped
    fn into_place(self) -> Option<PlaceResult> {
        let location = self.geometry?.location;
        Some(PlaceResult {
            name: self.name.unwrap_or_default(),
            location,
        })
    }
}

impl PlacesClient {
    pub fn new(
        client: reqwest::Client,
        places_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            places_url: places_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl PlacesLookup for PlacesClient {
    async fn nearby_search(&self, request: &NearbySearch) -> Result<Vec<PlaceResult>, PlacesError> {
        let location = format!("{},{}", request.location.lat, request.location.lng);
        let radius = request.radius_meters.to_string();

        let response = self
            .client
            .get(&self.places_url)
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("type", request.category.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PlacesError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PlacesError::Unavailable(format!(
                "places service answered HTTP {}",
                response.status()
            )));
        }

        let body: NearbyResponse = response
            .json()
            .await
            .map_err(|e| PlacesError::Unavailable(format!("Malformed places response: {}", e)))?;

        match PlacesStatus::parse(&body.status) {
            PlacesStatus::Ok => Ok(body.results.into_iter().filter_map(RawPlace::into_place).collect()),
            status => {
                if let Some(message) = body.error_message {
                    tracing::warn!(%status, "Places lookup error: {}", message);
                }
                Err(PlacesError::Status(status))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> PlacesClient {
        PlacesClient::new(
            reqwest::Client::new(),
            format!("{}/maps/api/place/nearbysearch/json", server.uri()),
            "maps-key",
        )
    }

    fn request() -> NearbySearch {
        NearbySearch {
            location: Coordinate::new(12.9716, 77.5946),
            radius_meters: 5000,
            category: "hospital".to_string(),
        }
    }

    #[tokio::test]
    async fn test_nearby_search_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps/api/place/nearbysearch/json"))
            .and(query_param("location", "12.9716,77.5946"))
            .and(query_param("radius", "5000"))
            .and(query_param("type", "hospital"))
            .and(query_param("key", "maps-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    { "name": "City Hospital", "geometry": { "location": { "lat": 12.97, "lng": 77.59 } } },
                    { "name": "No Geometry Clinic" },
                    { "name": "Lake Clinic", "geometry": { "location": { "lat": 12.98, "lng": 77.6 } } }
                ],
                "status": "OK"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let places = client(&server).nearby_search(&request()).await.unwrap();

        assert_eq!(places.len(), 2);
        assert_eq!(places[0].name, "City Hospital");
        assert_eq!(places[0].location, Coordinate::new(12.97, 77.59));
        assert_eq!(places[1].name, "Lake Clinic");
    }

    #[tokio::test]
    async fn test_non_ok_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [],
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid."
            })))
            .mount(&server)
            .await;

        let err = client(&server).nearby_search(&request()).await.unwrap_err();
        assert!(matches!(err, PlacesError::Status(PlacesStatus::RequestDenied)));
    }

    #[tokio::test]
    async fn test_zero_results_is_not_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [],
                "status": "ZERO_RESULTS"
            })))
            .mount(&server)
            .await;

        let err = client(&server).nearby_search(&request()).await.unwrap_err();
        assert!(matches!(err, PlacesError::Status(PlacesStatus::ZeroResults)));
    }

    #[tokio::test]
    async fn test_unknown_status_maps_to_unknown_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "BRAND_NEW" })))
            .mount(&server)
            .await;

        let err = client(&server).nearby_search(&request()).await.unwrap_err();
        assert!(matches!(err, PlacesError::Status(PlacesStatus::UnknownError)));
    }

    #[tokio::test]
    async fn test_http_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).nearby_search(&request()).await.unwrap_err();
        assert!(matches!(err, PlacesError::Unavailable(_)));
    }
}
