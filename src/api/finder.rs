//! Hospital finder
//!
//! Handles:
//! - GET /hospital-finder - the map page
//! - GET /api/v1/places/nearby - one locate + search cycle
//!
//! The browser owns device geolocation and the map surface. It reports its
//! reading as `lat`/`lng`, or a geolocation error code as `error`, and draws
//! the pins this endpoint returns. When the lookup fails `places` is `null`
//! and the browser keeps the pins it already shows.

use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::api::middleware::{AppState, SessionContext};
use crate::api::responses::render_page;
use crate::models::{Coordinate, MapPin, Notice, PlaceResult};
use crate::services::{GeolocationError, LocationFinder};
use crate::templates::StandardVars;

pub const FINDER_PATH: &str = "/hospital-finder";

/// Build the finder page router
pub fn page_router() -> Router<AppState> {
    Router::new().route(FINDER_PATH, get(finder_page))
}

/// Build the places API router (nested under `/api/v1`)
pub fn api_router() -> Router<AppState> {
    Router::new().route("/places/nearby", get(nearby))
}

/// Raw query parameters. Kept as strings so a malformed reading falls back
/// to the default location instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct NearbyQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    /// Browser geolocation error code
    pub error: Option<String>,
}

fn parse_param<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|v| v.trim().parse().ok())
}

impl NearbyQuery {
    /// The device reading this query describes
    pub fn reading(&self) -> Result<Coordinate, GeolocationError> {
        if let Some(code) = self.error.as_deref() {
            return Err(parse_param(Some(code))
                .map(GeolocationError::from_code)
                .unwrap_or(GeolocationError::Unavailable));
        }

        let lat: Option<f64> = parse_param(self.lat.as_deref());
        let lng: Option<f64> = parse_param(self.lng.as_deref());
        match (lat, lng) {
            (Some(lat), Some(lng)) => Ok(Coordinate::new(lat, lng)),
            _ => {
                if self.lat.is_some() || self.lng.is_some() {
                    tracing::debug!(lat = ?self.lat, lng = ?self.lng, "Ignoring malformed coordinate");
                }
                Err(GeolocationError::Unavailable)
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NearbyResponse {
    pub center: Coordinate,
    pub radius_meters: u32,
    pub category: String,
    pub pins: Vec<MapPin>,
    /// `None` when the lookup failed
    pub places: Option<Vec<PlaceResult>>,
    pub notice: Option<Notice>,
}

/// GET /hospital-finder
async fn finder_page(State(state): State<AppState>, context: SessionContext) -> Response {
    let maps = &state.config.maps;

    let mut page = TeraContext::new();
    page.insert("center", &maps.fallback());
    page.insert("radius_meters", &maps.radius_meters);
    page.insert("category", &maps.category);
    page.insert("maps_api_key", maps.api_key.as_deref().unwrap_or_default());

    let vars = StandardVars::new(FINDER_PATH, context.session());
    render_page(&state, "hospital_finder.html", &page, &vars)
}

/// GET /api/v1/places/nearby
async fn nearby(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> Json<NearbyResponse> {
    let mut finder = LocationFinder::new(state.places.clone(), &state.config.maps);
    finder.locate(query.reading());

    let places = match finder.search().await {
        Ok(_) => Some(finder.results().to_vec()),
        Err(_) => None,
    };

    Json(NearbyResponse {
        center: finder.current(),
        radius_meters: finder.radius_meters(),
        category: finder.category().to_string(),
        pins: finder.pins(),
        places,
        notice: finder.notice().cloned(),
    })
}
