//! Cached places lookup
//!
//! Wraps any [`PlacesLookup`] and keeps successful answers for the
//! configured TTL. Non-OK statuses are never cached, so a transient
//! `OVER_QUERY_LIMIT` does not stick.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{CacheLayer, MemoryCache};
use crate::models::PlaceResult;
use crate::stores::{NearbySearch, PlacesError, PlacesLookup};

pub struct CachedPlacesLookup {
    inner: Arc<dyn PlacesLookup>,
    cache: MemoryCache,
    ttl: Duration,
}

impl CachedPlacesLookup {
    pub fn new(inner: Arc<dyn PlacesLookup>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: MemoryCache::with_capacity_and_ttl(1_000, ttl),
            ttl,
        }
    }
}

/// Coordinates are rounded to 4 decimals (about 11 m) so nearby readings share an entry
pub fn cache_key(request: &NearbySearch) -> String {
    format!(
        "places:{:.4},{:.4}:{}:{}",
        request.location.lat, request.location.lng, request.radius_meters, request.category
    )
}

#[async_trait]
impl PlacesLookup for CachedPlacesLookup {
    async fn nearby_search(&self, request: &NearbySearch) -> Result<Vec<PlaceResult>, PlacesError> {
        let key = cache_key(request);

        match self.cache.get::<Vec<PlaceResult>>(&key).await {
            Ok(Some(results)) => {
                tracing::debug!(key = %key, "Places cache hit");
                return Ok(results);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Places cache read failed: {:#}", e),
        }

        let results = self.inner.nearby_search(request).await?;

        if let Err(e) = self.cache.set(&key, &results, self.ttl).await {
            tracing::warn!("Places cache write failed: {:#}", e);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;
    use crate::stores::PlacesStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPlaces {
        calls: AtomicUsize,
        status: Option<PlacesStatus>,
    }

    #[async_trait]
    impl PlacesLookup for CountingPlaces {
        async fn nearby_search(
            &self,
            _request: &NearbySearch,
        ) -> Result<Vec<PlaceResult>, PlacesError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.status {
                Some(status) => Err(PlacesError::Status(status)),
                None => Ok(vec![PlaceResult {
                    name: "City Hospital".to_string(),
                    location: Coordinate::new(12.97, 77.59),
                }]),
            }
        }
    }

    fn request(lat: f64, lng: f64) -> NearbySearch {
        NearbySearch {
            location: Coordinate::new(lat, lng),
            radius_meters: 5000,
            category: "hospital".to_string(),
        }
    }

    #[test]
    fn test_cache_key_rounds_coordinates() {
        assert_eq!(
            cache_key(&request(12.971_64, 77.594_62)),
            "places:12.9716,77.5946:5000:hospital"
        );
        assert_eq!(cache_key(&request(12.971_61, 77.594_59)), cache_key(&request(12.971_64, 77.594_62)));
    }

    #[tokio::test]
    async fn test_ok_results_cached() {
        let inner = Arc::new(CountingPlaces {
            calls: AtomicUsize::new(0),
            status: None,
        });
        let cached = CachedPlacesLookup::new(inner.clone(), Duration::from_secs(60));

        let first = cached.nearby_search(&request(12.97, 77.59)).await.unwrap();
        let second = cached.nearby_search(&request(12.97, 77.59)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        cached.nearby_search(&request(28.61, 77.20)).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let inner = Arc::new(CountingPlaces {
            calls: AtomicUsize::new(0),
            status: Some(PlacesStatus::OverQueryLimit),
        });
        let cached = CachedPlacesLookup::new(inner.clone(), Duration::from_secs(60));

        assert!(cached.nearby_search(&request(12.97, 77.59)).await.is_err());
        assert!(cached.nearby_search(&request(12.97, 77.59)).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
