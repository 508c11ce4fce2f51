use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::core::{AnchorPoint, BeaconId, SEED_ANCHORS};
use crate::validation::error::{PositioningError, PositioningResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryStatus {
    /// Waiting for the metadata feed to be staged and materialized
    Pending,
    /// Read-only from here on
    Loaded,
}

/// Beacon id to anchor lookup.
///
/// Built from seed anchors; optionally waits for one metadata feed whose rows
/// are merged in (overriding seeds with the same id) the first time the
/// session materializes it.
#[derive(Debug, Clone)]
pub struct AnchorRegistry {
    anchors: HashMap<BeaconId, AnchorPoint>,
    staged_feed: Option<Vec<AnchorPoint>>,
    status: RegistryStatus,
}

impl Default for AnchorRegistry {
    fn default() -> Self {
        Self::from_anchors(seed_anchors())
    }
}

impl AnchorRegistry {
    /// Registry that is usable immediately
    pub fn from_anchors<I: IntoIterator<Item = AnchorPoint>>(anchors: I) -> Self {
        Self {
            anchors: index(anchors),
            staged_feed: None,
            status: RegistryStatus::Loaded,
        }
    }

    /// Registry that stays pending until a feed is staged and materialized
    pub fn awaiting_feed<I: IntoIterator<Item = AnchorPoint>>(seed: I) -> Self {
        Self {
            anchors: index(seed),
            staged_feed: None,
            status: RegistryStatus::Pending,
        }
    }

    /// Hand over the fetched feed. Ignored once the registry is loaded.
    pub fn stage_feed(&mut self, feed: Vec<AnchorPoint>) -> bool {
        if self.status == RegistryStatus::Loaded {
            warn!(rows = feed.len(), "anchor feed arrived after registry was loaded, ignoring");
            return false;
        }
        debug!(rows = feed.len(), "anchor feed staged");
        self.staged_feed = Some(feed);
        true
    }

    pub fn has_staged_feed(&self) -> bool {
        self.staged_feed.is_some()
    }

    /// Merge the staged feed into the active anchors, once.
    ///
    /// Returns the number of active anchors when this call loaded the registry.
    pub fn materialize(&mut self) -> Option<usize> {
        if self.status == RegistryStatus::Loaded {
            return None;
        }
        let feed = self.staged_feed.take()?;
        let rows = feed.len();
        for anchor in feed {
            self.anchors.insert(anchor.beacon_id, anchor);
        }
        self.status = RegistryStatus::Loaded;
        info!(rows, active = self.anchors.len(), "anchor registry loaded");
        Some(self.anchors.len())
    }

    pub fn status(&self) -> RegistryStatus {
        self.status
    }

    pub fn is_loaded(&self) -> bool {
        self.status == RegistryStatus::Loaded
    }

    pub fn resolve(&self, beacon_id: BeaconId) -> PositioningResult<&AnchorPoint> {
        self.anchors
            .get(&beacon_id)
            .ok_or(PositioningError::UnknownBeacon { beacon_id })
    }

    pub fn get(&self, beacon_id: BeaconId) -> Option<&AnchorPoint> {
        self.anchors.get(&beacon_id)
    }

    /// Active anchors ordered by beacon id
    pub fn anchors(&self) -> Vec<&AnchorPoint> {
        let mut anchors: Vec<&AnchorPoint> = self.anchors.values().collect();
        anchors.sort_by_key(|a| a.beacon_id);
        anchors
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// The anchors installed with the floor deployment
pub fn seed_anchors() -> Vec<AnchorPoint> {
    SEED_ANCHORS
        .iter()
        .map(|&(id, x, z)| AnchorPoint::new(id, x, z))
        .collect()
}

fn index<I: IntoIterator<Item = AnchorPoint>>(anchors: I) -> HashMap<BeaconId, AnchorPoint> {
    anchors.into_iter().map(|a| (a.beacon_id, a)).collect()
}
