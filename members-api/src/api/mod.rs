//! HTTP handlers

pub mod health;
pub mod members;
pub mod upload;

pub use health::health_routes;
pub use members::member_routes;
pub use upload::upload_routes;
