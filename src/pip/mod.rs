//! Point-in-Polygon (PIP) lookup for service areas.
//!
//! Parses GeoJSON area geometries and answers containment queries
//! using an R-tree spatial index.

mod geometry;
mod index;

pub use geometry::{AreaGeometry, GeometryError};
pub use index::AreaSpatialIndex;
