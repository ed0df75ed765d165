mod claims;
mod extractors;
mod jwt;

pub use claims::{Claims, Role};
pub use extractors::Actor;
pub use jwt::JwtKeys;
