pub mod geocode;
pub mod routing;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use geocode::{Geocoder, NominatimGeocoder};
pub use routing::{OsrmRouter, RouteEstimator};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Great-circle distance in kilometers.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Road-route distance first, straight-line fallback. Routing outages degrade
/// the number, never the request.
#[derive(Clone)]
pub struct DistanceEngine {
    router: Arc<dyn RouteEstimator>,
}

impl DistanceEngine {
    pub fn new(router: Arc<dyn RouteEstimator>) -> Self {
        Self { router }
    }

    pub async fn distance_km(&self, from: Coordinates, to: Coordinates) -> f64 {
        match self.router.route_distance_km(from, to).await {
            Some(km) => km,
            None => haversine_km(from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoRoute;
    struct FixedRoute(f64);

    #[async_trait::async_trait]
    impl RouteEstimator for NoRoute {
        async fn route_distance_km(&self, _: Coordinates, _: Coordinates) -> Option<f64> {
            None
        }
    }

    #[async_trait::async_trait]
    impl RouteEstimator for FixedRoute {
        async fn route_distance_km(&self, _: Coordinates, _: Coordinates) -> Option<f64> {
            Some(self.0)
        }
    }

    #[test]
    fn haversine_colombo_to_kandy() {
        let colombo = Coordinates::new(6.9271, 79.8612);
        let kandy = Coordinates::new(7.2906, 80.6337);
        let d = haversine_km(colombo, kandy);
        // ~94 km straight line
        assert!(d > 90.0 && d < 100.0, "got {d}");
    }

    #[test]
    fn haversine_zero_for_same_point() {
        let p = Coordinates::new(6.9271, 79.8612);
        assert!(haversine_km(p, p) < 0.001);
    }

    #[tokio::test]
    async fn distance_engine_prefers_route() {
        let engine = DistanceEngine::new(Arc::new(FixedRoute(12.5)));
        let a = Coordinates::new(6.9, 79.9);
        let b = Coordinates::new(7.0, 80.0);
        assert_eq!(engine.distance_km(a, b).await, 12.5);
    }

    #[tokio::test]
    async fn distance_engine_falls_back_to_haversine() {
        let engine = DistanceEngine::new(Arc::new(NoRoute));
        let a = Coordinates::new(6.9271, 79.8612);
        let b = Coordinates::new(7.2906, 80.6337);
        let d = engine.distance_km(a, b).await;
        assert!((d - haversine_km(a, b)).abs() < 1e-9);
    }
}
