use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::Coordinates;
use crate::config::GeoConfig;

/// Address string to coordinates, or `None` when the address cannot be
/// resolved. Implementations memoize, including negative results.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Option<Coordinates>;
}

#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
}

/// Nominatim (OpenStreetMap) geocoder with an in-process memo cache and a
/// self-imposed delay between upstream calls to respect the public API quota.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    delay: Duration,
    // normalized address -> result; negative lookups are cached too so a bad
    // address does not hit the API on every read
    cache: Mutex<HashMap<String, Option<Coordinates>>>,
    last_call: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    pub fn new(cfg: &GeoConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: cfg.nominatim_url.trim_end_matches('/').to_string(),
            delay: Duration::from_millis(cfg.geocode_delay_ms),
            cache: Mutex::new(HashMap::new()),
            last_call: Mutex::new(None),
        }
    }

    fn normalize(address: &str) -> String {
        address.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }

    async fn throttle(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn lookup(&self, address: &str) -> anyhow::Result<Option<Coordinates>> {
        let url = format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(address)
        );
        let hits: Vec<NominatimHit> = self
            .client
            .get(&url)
            .header("User-Agent", "FoodLink/1.0 (surplus food coordination)")
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(hit) = hits.first() else {
            return Ok(None);
        };
        let lat: f64 = hit.lat.parse()?;
        let lng: f64 = hit.lon.parse()?;
        Ok(Some(Coordinates::new(lat, lng)))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Option<Coordinates> {
        let key = Self::normalize(address);
        if key.is_empty() {
            return None;
        }
        if let Some(cached) = self.cache.lock().await.get(&key) {
            return *cached;
        }

        self.throttle().await;
        let result = match self.lookup(address).await {
            Ok(coords) => {
                debug!(%address, found = coords.is_some(), "geocoded");
                coords
            }
            Err(e) => {
                // upstream failure is not a negative result; do not cache it
                warn!(error = %e, %address, "geocoding failed");
                return None;
            }
        };

        self.cache.lock().await.insert(key, result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(
            NominatimGeocoder::normalize("  12  Galle   Road, Colombo "),
            "12 galle road, colombo"
        );
        assert_eq!(NominatimGeocoder::normalize("   "), "");
    }
}
