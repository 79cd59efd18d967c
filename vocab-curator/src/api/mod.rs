//! HTTP API handlers for vocab-curator

pub mod corrections;
pub mod curation;
pub mod health;
pub mod reviews;
pub mod schema;

pub use corrections::correction_routes;
pub use curation::curation_routes;
pub use health::health_routes;
pub use reviews::review_routes;
pub use schema::schema_routes;
