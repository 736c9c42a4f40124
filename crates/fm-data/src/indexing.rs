//! Stable indexing of locations.
//!
//! Maps location ids to contiguous indices (0..N) in the order the locations
//! were given, and keeps one centroid per index for O(1) endpoint lookup.

use std::collections::HashMap;

use fm_core::{LocationId, LocationIdx, Real};

use crate::error::{DataError, DataResult};
use crate::model::FlowLocation;

/// Id/centroid lookup over a location list.
///
/// If an id occurs more than once the last occurrence wins the lookup; dataset
/// validation rejects such lists before they get here.
#[derive(Debug, Clone, Default)]
pub struct LocationIndex {
    /// Contiguous list of ids (index -> id).
    ids: Vec<LocationId>,

    /// Centroid per index.
    centroids: Vec<[Real; 2]>,

    /// Reverse lookup: id -> index.
    by_id: HashMap<LocationId, LocationIdx>,
}

impl LocationIndex {
    /// Build an index in one pass over the locations.
    pub fn from_locations<L: FlowLocation>(locations: &[L]) -> Self {
        let mut ids = Vec::with_capacity(locations.len());
        let mut centroids = Vec::with_capacity(locations.len());
        let mut by_id = HashMap::with_capacity(locations.len());

        for (i, loc) in locations.iter().enumerate() {
            let idx = LocationIdx::from_index(i as u32);
            ids.push(loc.id().clone());
            centroids.push(loc.centroid());
            by_id.insert(loc.id().clone(), idx);
        }

        Self {
            ids,
            centroids,
            by_id,
        }
    }

    /// Number of indexed locations.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Index of an id, if present.
    pub fn get(&self, id: &str) -> Option<LocationIdx> {
        self.by_id.get(id).copied()
    }

    /// Index of an id, or an error naming the id.
    pub fn idx(&self, id: &LocationId) -> DataResult<LocationIdx> {
        self.get(id.as_str())
            .ok_or_else(|| DataError::IdNotFound { id: id.clone() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Id stored at an index (panics if out of bounds).
    pub fn id(&self, idx: LocationIdx) -> &LocationId {
        &self.ids[idx.index() as usize]
    }

    /// Centroid stored at an index (panics if out of bounds).
    pub fn centroid(&self, idx: LocationIdx) -> [Real; 2] {
        self.centroids[idx.index() as usize]
    }

    /// Centroid of an id, if present.
    pub fn centroid_of(&self, id: &str) -> Option<[Real; 2]> {
        self.get(id).map(|idx| self.centroid(idx))
    }

    /// All ids in index order.
    pub fn ids(&self) -> &[LocationId] {
        &self.ids
    }
}
