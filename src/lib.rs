//! Service Areas - a provider / service area API with point-in-polygon lookup
//!
//! This library provides the models, storage, spatial index and HTTP router
//! used by the `server` binary.

pub mod api;
pub mod models;
pub mod pip;
pub mod store;
pub mod validation;

pub use models::{Provider, ProviderInArea, ServiceArea};
pub use store::{Store, StoreError};
