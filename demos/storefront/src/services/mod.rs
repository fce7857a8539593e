// demos/storefront/src/services/mod.rs
pub mod inventory;
pub mod notifier;
