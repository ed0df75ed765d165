use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::warn;

use super::Coordinates;
use crate::config::GeoConfig;

/// Road-network distance between two points. `None` means the caller must
/// fall back to the straight-line distance.
#[async_trait]
pub trait RouteEstimator: Send + Sync {
    async fn route_distance_km(&self, from: Coordinates, to: Coordinates) -> Option<f64>;
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64, // meters
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

/// Cache key: coordinates rounded to ~11 m so nearby reads share an entry.
fn cache_key(from: Coordinates, to: Coordinates) -> (i64, i64, i64, i64) {
    let r = |v: f64| (v * 10_000.0).round() as i64;
    (r(from.lat), r(from.lng), r(to.lat), r(to.lng))
}

/// OSRM router with a bounded timeout and a short-TTL result cache; external
/// routing calls are rate- and latency-sensitive.
pub struct OsrmRouter {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    cache_ttl: Duration,
    cache: Mutex<HashMap<(i64, i64, i64, i64), (Instant, f64)>>,
}

impl OsrmRouter {
    pub fn new(cfg: &GeoConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: cfg.osrm_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(cfg.route_timeout_secs),
            cache_ttl: Duration::from_secs(cfg.route_cache_ttl_secs),
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn fetch(&self, from: Coordinates, to: Coordinates) -> anyhow::Result<f64> {
        // OSRM wants lng,lat order
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=false",
            self.base_url, from.lng, from.lat, to.lng, to.lat
        );
        let resp: OsrmResponse = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if resp.code != "Ok" {
            anyhow::bail!("osrm returned code {}", resp.code);
        }
        let route = resp
            .routes
            .first()
            .ok_or_else(|| anyhow::anyhow!("osrm returned no routes"))?;
        Ok(route.distance / 1000.0)
    }
}

#[async_trait]
impl RouteEstimator for OsrmRouter {
    async fn route_distance_km(&self, from: Coordinates, to: Coordinates) -> Option<f64> {
        let key = cache_key(from, to);
        {
            let cache = self.cache.lock().await;
            if let Some((at, km)) = cache.get(&key) {
                if at.elapsed() < self.cache_ttl {
                    return Some(*km);
                }
            }
        }

        match self.fetch(from, to).await {
            Ok(km) => {
                self.cache.lock().await.insert(key, (Instant::now(), km));
                Some(km)
            }
            Err(e) => {
                warn!(error = %e, "route distance failed, caller falls back to haversine");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_for_nearby_points() {
        let a = Coordinates::new(6.92710, 79.86120);
        let b = Coordinates::new(6.92712, 79.86118);
        let to = Coordinates::new(7.0, 80.0);
        assert_eq!(cache_key(a, to), cache_key(b, to));
    }

    #[test]
    fn cache_key_distinguishes_direction() {
        let a = Coordinates::new(6.9, 79.9);
        let b = Coordinates::new(7.0, 80.0);
        assert_ne!(cache_key(a, b), cache_key(b, a));
    }
}
