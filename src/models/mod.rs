//! Core data models for the service area API.

pub mod provider;
pub mod service_area;

pub use provider::{NewProvider, Provider, ProviderPayload};
pub use service_area::{NewServiceArea, ProviderInArea, ServiceArea, ServiceAreaPayload};
