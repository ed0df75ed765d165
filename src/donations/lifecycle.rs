use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    Pending,
    Approved,
    Assigned,
    PickedUp,
    Delivered,
    Cancelled,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Assigned => "assigned",
            Self::PickedUp => "picked_up",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "assigned" => Some(Self::Assigned),
            "picked_up" => Some(Self::PickedUp),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodCategory {
    CookedMeals,
    Bakery,
    FruitsVegetables,
    Dairy,
    Packaged,
    Beverages,
}

impl FoodCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CookedMeals => "cooked_meals",
            Self::Bakery => "bakery",
            Self::FruitsVegetables => "fruits_vegetables",
            Self::Dairy => "dairy",
            Self::Packaged => "packaged",
            Self::Beverages => "beverages",
        }
    }

    /// Accepts both wire form and human labels ("Cooked Meals").
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "cooked_meals" => Some(Self::CookedMeals),
            "bakery" => Some(Self::Bakery),
            "fruits_vegetables" | "produce" => Some(Self::FruitsVegetables),
            "dairy" => Some(Self::Dairy),
            "packaged" => Some(Self::Packaged),
            "beverages" => Some(Self::Beverages),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    Hot,
    Cold,
    Dry,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Cold => "cold",
            Self::Dry => "dry",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hot" => Some(Self::Hot),
            "cold" => Some(Self::Cold),
            "dry" => Some(Self::Dry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Cooked,
    Packed,
    Other,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cooked => "cooked",
            Self::Packed => "packed",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cooked" => Some(Self::Cooked),
            "packed" => Some(Self::Packed),
            "other" | "" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Expiry at creation time, in priority order: donor-declared date wins, then
/// the product-type rules. Pure and side-effect-free; the sweep relies on it
/// never consulting the clock itself.
pub fn compute_expiry(
    now: OffsetDateTime,
    product_type: ProductType,
    user_expiry: Option<OffsetDateTime>,
    package_expiry: Option<OffsetDateTime>,
) -> OffsetDateTime {
    if let Some(explicit) = user_expiry {
        return explicit;
    }
    match product_type {
        ProductType::Cooked => now + Duration::days(2),
        ProductType::Packed => package_expiry.unwrap_or(now + Duration::days(7)),
        ProductType::Other => now + Duration::days(3),
    }
}

/// FL-YYYYMMDD-NN, zero-padded, per-day sequential.
pub fn tracking_code(date: Date, seq: i32) -> String {
    format!(
        "FL-{:04}{:02}{:02}-{:02}",
        date.year(),
        date.month() as u8,
        date.day(),
        seq
    )
}

/// Donor may edit or cancel until a driver has committed to the job.
pub fn donor_can_modify(status: DonationStatus, driver_id: Option<Uuid>) -> bool {
    matches!(status, DonationStatus::Pending | DonationStatus::Approved)
        || (status == DonationStatus::Assigned && driver_id.is_none())
}

/// Claimable by a receiver: still unclaimed and in a pre-assignment status.
pub fn receiver_can_claim(
    status: DonationStatus,
    receiver_id: Option<Uuid>,
    expires_at: OffsetDateTime,
    now: OffsetDateTime,
) -> bool {
    receiver_id.is_none()
        && matches!(status, DonationStatus::Pending | DonationStatus::Approved)
        && expires_at > now
}

pub fn is_valid_time_of_day(s: &str) -> bool {
    lazy_static! {
        static ref TIME_RE: Regex = Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").unwrap();
    }
    TIME_RE.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn expiry_user_declared_wins_over_everything() {
        let now = datetime!(2024-06-01 12:00 UTC);
        let explicit = datetime!(2024-06-10 00:00 UTC);
        let package = datetime!(2024-06-05 00:00 UTC);
        assert_eq!(
            compute_expiry(now, ProductType::Cooked, Some(explicit), Some(package)),
            explicit
        );
    }

    #[test]
    fn expiry_cooked_is_two_days() {
        let now = datetime!(2024-06-01 12:00 UTC);
        assert_eq!(
            compute_expiry(now, ProductType::Cooked, None, None),
            now + Duration::days(2)
        );
    }

    #[test]
    fn expiry_packed_uses_package_date_then_week_fallback() {
        let now = datetime!(2024-06-01 12:00 UTC);
        let package = datetime!(2024-06-20 00:00 UTC);
        assert_eq!(
            compute_expiry(now, ProductType::Packed, None, Some(package)),
            package
        );
        assert_eq!(
            compute_expiry(now, ProductType::Packed, None, None),
            now + Duration::days(7)
        );
    }

    #[test]
    fn expiry_unknown_type_is_three_days() {
        let now = datetime!(2024-06-01 12:00 UTC);
        assert_eq!(
            compute_expiry(now, ProductType::Other, None, None),
            now + Duration::days(3)
        );
    }

    #[test]
    fn expiry_is_shift_invariant_on_computed_branches() {
        let now = datetime!(2024-06-01 12:00 UTC);
        let delta = Duration::hours(37);
        for pt in [ProductType::Cooked, ProductType::Packed, ProductType::Other] {
            let base = compute_expiry(now, pt, None, None);
            let shifted = compute_expiry(now + delta, pt, None, None);
            assert_eq!(shifted, base + delta, "branch {pt:?}");
        }
    }

    #[test]
    fn tracking_code_format() {
        let date = time::macros::date!(2024 - 06 - 01);
        assert_eq!(tracking_code(date, 1), "FL-20240601-01");
        assert_eq!(tracking_code(date, 9), "FL-20240601-09");
        assert_eq!(tracking_code(date, 42), "FL-20240601-42");
    }

    #[test]
    fn donor_modify_guard_blocks_once_driver_attached() {
        let driver = Some(Uuid::new_v4());
        assert!(donor_can_modify(DonationStatus::Pending, None));
        assert!(donor_can_modify(DonationStatus::Approved, None));
        assert!(donor_can_modify(DonationStatus::Assigned, None));
        assert!(!donor_can_modify(DonationStatus::Assigned, driver));
        assert!(!donor_can_modify(DonationStatus::PickedUp, driver));
        assert!(!donor_can_modify(DonationStatus::Delivered, driver));
        assert!(!donor_can_modify(DonationStatus::Cancelled, None));
    }

    #[test]
    fn claim_guard_requires_unclaimed_fresh_listing() {
        let now = datetime!(2024-06-01 12:00 UTC);
        let fresh = now + Duration::hours(4);
        let stale = now - Duration::minutes(1);
        assert!(receiver_can_claim(DonationStatus::Pending, None, fresh, now));
        assert!(receiver_can_claim(DonationStatus::Approved, None, fresh, now));
        assert!(!receiver_can_claim(DonationStatus::Pending, Some(Uuid::new_v4()), fresh, now));
        assert!(!receiver_can_claim(DonationStatus::Assigned, None, fresh, now));
        assert!(!receiver_can_claim(DonationStatus::Pending, None, stale, now));
    }

    #[test]
    fn category_parse_accepts_human_labels() {
        assert_eq!(FoodCategory::parse("Cooked Meals"), Some(FoodCategory::CookedMeals));
        assert_eq!(FoodCategory::parse("bakery"), Some(FoodCategory::Bakery));
        assert_eq!(FoodCategory::parse("produce"), Some(FoodCategory::FruitsVegetables));
        assert_eq!(FoodCategory::parse("plutonium"), None);
    }

    #[test]
    fn storage_and_product_type_parse() {
        assert_eq!(StorageType::parse("Hot"), Some(StorageType::Hot));
        assert_eq!(StorageType::parse("frozen"), None);
        assert_eq!(ProductType::parse("cooked"), Some(ProductType::Cooked));
        assert_eq!(ProductType::parse(""), Some(ProductType::Other));
    }

    #[test]
    fn time_of_day_validation() {
        assert!(is_valid_time_of_day("09:30"));
        assert!(is_valid_time_of_day("23:59"));
        assert!(!is_valid_time_of_day("24:00"));
        assert!(!is_valid_time_of_day("9:30"));
        assert!(!is_valid_time_of_day("09:60"));
        assert!(!is_valid_time_of_day("morning"));
    }
}
