use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

/// Hard latitude/longitude rectangle used to sanity-check every coordinate
/// pair accepted from a client. Values outside are treated as absent.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ServiceRegion {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl ServiceRegion {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Pickups whose total route distance exceeds this are hidden from drivers.
    pub driver_radius_km: f64,
    /// Forward window for the expiring-soon warning sweep.
    pub expiry_warning_minutes: i64,
    /// Interval between expiry-deletion sweep runs.
    pub expiry_sweep_minutes: u64,
    /// Interval between warning sweep runs.
    pub warning_sweep_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoConfig {
    pub nominatim_url: String,
    pub osrm_url: String,
    /// Self-imposed delay between geocoding calls (third-party quota).
    pub geocode_delay_ms: u64,
    pub route_timeout_secs: u64,
    pub route_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub region: ServiceRegion,
    pub matching: MatchingConfig,
    pub geo: GeoConfig,
    pub minio_endpoint: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "foodlink".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "foodlink-users".into()),
        };
        // Default service region: Sri Lanka.
        let region = ServiceRegion {
            min_lat: env_or("REGION_MIN_LAT", 5.7),
            max_lat: env_or("REGION_MAX_LAT", 10.0),
            min_lng: env_or("REGION_MIN_LNG", 79.4),
            max_lng: env_or("REGION_MAX_LNG", 82.1),
        };
        let matching = MatchingConfig {
            driver_radius_km: env_or("DRIVER_RADIUS_KM", 40.0),
            expiry_warning_minutes: env_or("EXPIRY_WARNING_MINUTES", 120),
            expiry_sweep_minutes: env_or("EXPIRY_SWEEP_MINUTES", 30),
            warning_sweep_minutes: env_or("WARNING_SWEEP_MINUTES", 60),
        };
        let geo = GeoConfig {
            nominatim_url: std::env::var("NOMINATIM_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".into()),
            osrm_url: std::env::var("OSRM_URL")
                .unwrap_or_else(|_| "https://router.project-osrm.org".into()),
            geocode_delay_ms: env_or("GEOCODE_DELAY_MS", 1000),
            route_timeout_secs: env_or("ROUTE_TIMEOUT_SECS", 5),
            route_cache_ttl_secs: env_or("ROUTE_CACHE_TTL_SECS", 600),
        };
        Ok(Self {
            database_url,
            jwt,
            region,
            matching,
            geo,
            minio_endpoint: std::env::var("MINIO_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:9000".into()),
            minio_bucket: std::env::var("MINIO_BUCKET").unwrap_or_else(|_| "foodlink".into()),
            minio_access_key: std::env::var("MINIO_ACCESS_KEY").unwrap_or_default(),
            minio_secret_key: std::env::var("MINIO_SECRET_KEY").unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_contains_accepts_inside_and_rejects_outside() {
        let region = ServiceRegion {
            min_lat: 5.7,
            max_lat: 10.0,
            min_lng: 79.4,
            max_lng: 82.1,
        };
        // Colombo
        assert!(region.contains(6.9271, 79.8612));
        // edges are inclusive
        assert!(region.contains(5.7, 79.4));
        assert!(region.contains(10.0, 82.1));
        // London
        assert!(!region.contains(51.5074, -0.1278));
        // right latitude, wrong longitude
        assert!(!region.contains(6.9, 100.0));
    }
}
