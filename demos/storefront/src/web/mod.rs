// demos/storefront/src/web/mod.rs

pub mod bridge;
pub mod routes;

pub use routes::configure_app_routes;
