//! Spatial index for fast service area lookups.

use geo::{BoundingRect, Contains, MultiPolygon, Point};
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Wrapper for R-tree indexing of service area geometries
#[derive(Debug, Clone)]
pub(crate) struct IndexedArea {
    pub id: u64,
    pub geometry: Arc<MultiPolygon<f64>>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedArea {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PartialEq for IndexedArea {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl IndexedArea {
    /// Returns `None` for empty geometries, which have no bounding box.
    pub fn new(id: u64, geometry: MultiPolygon<f64>) -> Option<Self> {
        let rect = geometry.bounding_rect()?;
        Some(Self {
            id,
            geometry: Arc::new(geometry),
            envelope: AABB::from_corners(
                [rect.min().x, rect.min().y],
                [rect.max().x, rect.max().y],
            ),
        })
    }
}

/// Spatial index over service area polygons using an R-tree
#[derive(Default)]
pub struct AreaSpatialIndex {
    tree: RTree<IndexedArea>,
    by_id: HashMap<u64, IndexedArea>,
}

impl AreaSpatialIndex {
    /// Build spatial index from `(id, geometry)` pairs
    pub fn build(areas: Vec<(u64, MultiPolygon<f64>)>) -> Self {
        info!("Building spatial index for {} service areas...", areas.len());

        let indexed: Vec<IndexedArea> = areas
            .into_iter()
            .filter_map(|(id, geometry)| IndexedArea::new(id, geometry))
            .collect();

        let by_id = indexed.iter().map(|ia| (ia.id, ia.clone())).collect();
        let tree = RTree::bulk_load(indexed);

        info!("Spatial index built with {} entries", tree.size());

        Self { tree, by_id }
    }

    /// Insert or replace the geometry stored under `id`.
    ///
    /// Returns false when the geometry is empty and could not be indexed.
    pub fn upsert(&mut self, id: u64, geometry: MultiPolygon<f64>) -> bool {
        self.remove(id);

        let Some(indexed) = IndexedArea::new(id, geometry) else {
            return false;
        };

        self.tree.insert(indexed.clone());
        self.by_id.insert(id, indexed);
        debug!("Indexed service area {}", id);
        true
    }

    pub fn remove(&mut self, id: u64) -> bool {
        match self.by_id.remove(&id) {
            Some(indexed) => {
                self.tree.remove(&indexed);
                debug!("Removed service area {} from index", id);
                true
            }
            None => false,
        }
    }

    /// Find all service areas containing a point, ordered by id
    pub fn lookup(&self, lon: f64, lat: f64) -> Vec<u64> {
        let point = Point::new(lon, lat);
        let query_envelope = AABB::from_point([lon, lat]);

        // Envelope intersection gives candidates, exact containment filters them
        let mut ids: Vec<u64> = self
            .tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|ia| ia.geometry.contains(&point))
            .map(|ia| ia.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    #[cfg(test)]
    fn contains_id(&self, id: u64) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Get total number of indexed areas
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
