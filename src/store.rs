//! Displayed-incident store and diff engine.
//!
//! The store holds the incidents currently on screen. Each poll hands it the
//! fresh feed entries; [`IncidentStore::update`] reconciles them against what
//! is stored and reports which incidents were added, updated, removed or left
//! alone, so the presentation layer only touches what changed.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::feed::FeedEntry;
use crate::incident::{GeoPoint, Incident};

/// Smallest lat/lon rectangle holding a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    /// Componentwise minimum
    pub sw: GeoPoint,
    /// Componentwise maximum
    pub ne: GeoPoint,
}

impl Bounds {
    /// Bounds of `points`, or `None` if there are none.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        points.into_iter().fold(None, |bounds, point| {
            Some(match bounds {
                None => Self { sw: point, ne: point },
                Some(bounds) => bounds.extended(point),
            })
        })
    }

    fn extended(self, point: GeoPoint) -> Self {
        Self {
            sw: GeoPoint {
                lat: self.sw.lat.min(point.lat),
                lon: self.sw.lon.min(point.lon),
            },
            ne: GeoPoint {
                lat: self.ne.lat.max(point.lat),
                lon: self.ne.lon.max(point.lon),
            },
        }
    }

    /// Check if a point is within the bounding box.
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.sw.lat
            && point.lat <= self.ne.lat
            && point.lon >= self.sw.lon
            && point.lon <= self.ne.lon
    }

    /// Midpoint of the box.
    #[must_use]
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: (self.sw.lat + self.ne.lat) / 2.0,
            lon: (self.sw.lon + self.ne.lon) / 2.0,
        }
    }
}

/// Result of one [`IncidentStore::update`].
///
/// Every incident of the batch lands in exactly one of `added`, `updated`
/// and `unchanged`; `removed` holds the stored incidents the batch no longer
/// mentions.
#[derive(Debug, Clone, Default)]
pub struct Diff {
    /// New IDs, in batch order
    pub added: Vec<Arc<Incident>>,
    /// Known IDs whose log type or detail count changed, in batch order
    pub updated: Vec<Arc<Incident>>,
    /// IDs that left the feed, in the store's previous order
    pub removed: Vec<Arc<Incident>>,
    /// Known IDs with nothing to re-render; these are the stored records
    pub unchanged: Vec<Arc<Incident>>,
}

impl Diff {
    /// True when nothing needs re-rendering.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Per-category counts.
    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            added: self.added.len(),
            updated: self.updated.len(),
            removed: self.removed.len(),
            unchanged: self.unchanged.len(),
        }
    }
}

/// Counts of a [`Diff`], for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} updated, {} removed, {} unchanged",
            self.added, self.updated, self.removed, self.unchanged
        )
    }
}

/// The incidents currently displayed, keyed by feed ID.
#[derive(Debug, Default)]
pub struct IncidentStore {
    incidents: HashMap<String, Arc<Incident>>,
    /// IDs in the order of the latest batch
    order: Vec<String>,
    bounds: Option<Bounds>,
}

impl IncidentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile the store with a freshly fetched batch.
    ///
    /// Entries that fail to parse are logged and skipped. If an ID appears
    /// more than once, its last entry wins and keeps the position of the
    /// first. Unchanged incidents keep their stored record, so the `Arc`s
    /// handed out earlier stay current.
    pub fn update(&mut self, batch: &[FeedEntry]) -> Diff {
        let records = parse_batch(batch);
        let batch_ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();

        let mut diff = Diff::default();

        for id in &self.order {
            if !batch_ids.contains(id.as_str()) {
                if let Some(gone) = self.incidents.remove(id) {
                    diff.removed.push(gone);
                }
            }
        }

        let order: Vec<String> = records.iter().map(|r| r.id.clone()).collect();

        for record in records {
            match self.incidents.entry(record.id.clone()) {
                Entry::Vacant(slot) => {
                    let record = Arc::new(record);
                    slot.insert(Arc::clone(&record));
                    diff.added.push(record);
                }
                Entry::Occupied(mut slot) => {
                    if record.is_unchanged_from(slot.get()) {
                        diff.unchanged.push(Arc::clone(slot.get()));
                    } else {
                        let record = Arc::new(record);
                        slot.insert(Arc::clone(&record));
                        diff.updated.push(record);
                    }
                }
            }
        }

        self.order = order;
        self.bounds = Bounds::from_points(self.iter().filter_map(|i| i.geolocation));

        debug_assert_eq!(self.order.len(), self.incidents.len());
        debug!("store update: {}", diff.summary());
        diff
    }

    /// Look up a displayed incident.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<Incident>> {
        self.incidents.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// Displayed incidents, in the order of the latest batch.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Incident>> {
        self.order.iter().filter_map(|id| self.incidents.get(id))
    }

    /// Bounds of every geolocated incident, `None` if there are none.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Incidents carrying a SigAlert.
    pub fn alerts(&self) -> impl Iterator<Item = &Arc<Incident>> {
        self.iter().filter(|i| i.has_alert)
    }
}

/// Parse a batch, dropping malformed entries and folding repeated IDs.
fn parse_batch(batch: &[FeedEntry]) -> Vec<Incident> {
    let mut records: Vec<Incident> = Vec::with_capacity(batch.len());
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(batch.len());

    for entry in batch {
        match Incident::parse(entry) {
            Ok(incident) => {
                if let Some(&at) = positions.get(&incident.id) {
                    debug!(id = %incident.id, "repeated ID in batch, keeping the later entry");
                    records[at] = incident;
                } else {
                    positions.insert(incident.id.clone(), records.len());
                    records.push(incident);
                }
            }
            Err(e) => warn!(id = ?entry.id, "skipping feed entry: {e}"),
        }
    }

    records
}
