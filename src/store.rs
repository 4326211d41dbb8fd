//! Feed state: raw records, load status, magnitude threshold and the
//! derived visible set.
//!
//! The state lives inside a `tokio::sync::watch` channel. Every mutation that
//! changes `records` or `threshold` recomputes the visible set and notifies
//! subscribers; anything else leaves the channel untouched.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::FeedSource;
use crate::errors::FEED_LOAD_FAILURE;
use crate::models::EventRecord;

/// Load status of the feed. Leaves `Loading` exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeedStatus {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

impl FeedStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed(_) => "failed",
        }
    }

    /// User-facing failure message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Records passing the magnitude threshold, in feed order.
///
/// A view over the shared record list: it holds indices, never copies.
/// Clones share identity; only a recomputation produces a new one.
#[derive(Debug, Clone)]
pub struct VisibleSet {
    records: Arc<[EventRecord]>,
    indices: Arc<[usize]>,
}

impl VisibleSet {
    fn derive(records: &Arc<[EventRecord]>, threshold: f64) -> Self {
        let indices: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.magnitude() >= threshold)
            .map(|(i, _)| i)
            .collect();

        Self {
            records: Arc::clone(records),
            indices: indices.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> + '_ {
        self.indices.iter().map(|&i| &self.records[i])
    }

    /// Whether both handles come from the same recomputation.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.indices, &other.indices)
    }
}

/// Snapshot of everything the store owns.
#[derive(Debug, Clone)]
pub struct FeedState {
    status: FeedStatus,
    records: Arc<[EventRecord]>,
    threshold: f64,
    visible: VisibleSet,
}

impl FeedState {
    fn new(threshold: f64) -> Self {
        let records: Arc<[EventRecord]> = Arc::from(Vec::new());
        let visible = VisibleSet::derive(&records, threshold);
        Self {
            status: FeedStatus::Loading,
            records,
            threshold,
            visible,
        }
    }

    #[must_use]
    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn visible(&self) -> &VisibleSet {
        &self.visible
    }

    fn recompute(&mut self) {
        self.visible = VisibleSet::derive(&self.records, self.threshold);
    }
}

/// Owner of the feed state.
#[derive(Debug)]
pub struct FeedStore {
    state: watch::Sender<FeedState>,
    initialized: AtomicBool,
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedStore {
    /// Create a store in `Loading` state with threshold 0.
    #[must_use]
    pub fn new() -> Self {
        Self::with_threshold(0.0)
    }

    #[must_use]
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            state: watch::Sender::new(FeedState::new(threshold)),
            initialized: AtomicBool::new(false),
        }
    }

    /// Load the feed. Only the first call fetches; later calls are ignored.
    ///
    /// Every fetch error ends in `Failed` with the fixed user-facing message.
    pub async fn initialize<S: FeedSource>(&self, source: &S) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            warn!("feed store already initialized, ignoring");
            return;
        }

        match source.fetch().await {
            Ok(records) => {
                info!("loaded {} earthquake events", records.len());
                self.state.send_modify(|state| {
                    state.status = FeedStatus::Ready;
                    state.records = records.into();
                    state.recompute();
                });
            }
            Err(e) => {
                warn!("feed load failed: {e}");
                self.state.send_modify(|state| {
                    state.status = FeedStatus::Failed(FEED_LOAD_FAILURE.to_string());
                    state.records = Arc::from(Vec::new());
                    state.recompute();
                });
            }
        }
    }

    /// Set the minimum magnitude. Any value is accepted as-is.
    ///
    /// Returns whether the visible set was recomputed; setting the current
    /// value again is a no-op and publishes nothing.
    pub fn set_threshold(&self, value: f64) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if state.threshold.to_bits() == value.to_bits() {
                return false;
            }
            state.threshold = value;
            state.recompute();
            true
        });

        if changed {
            debug!(
                "threshold set to {value}, {} events visible",
                self.state.borrow().visible.len()
            );
        }
        changed
    }

    /// Current visible set. Same identity until records or threshold change.
    #[must_use]
    pub fn visible_records(&self) -> VisibleSet {
        self.state.borrow().visible.clone()
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.state.borrow().threshold
    }

    #[must_use]
    pub fn status(&self) -> FeedStatus {
        self.state.borrow().status.clone()
    }

    /// Cheap clone of the whole state.
    #[must_use]
    pub fn snapshot(&self) -> FeedState {
        self.state.borrow().clone()
    }

    /// Receive a notification after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::errors::QuakeMapError;
    use crate::models::Position;

    pub(crate) fn record(id: &str, mag: f64, lon: f64, lat: f64, depth: f64) -> EventRecord {
        EventRecord::new(
            id,
            Position {
                longitude: lon,
                latitude: lat,
                depth_km: depth,
            },
            mag,
            Some(format!("near {id}")),
            1_700_000_000_000,
        )
    }

    /// Source that hands out a fixed result and counts fetches.
    pub(crate) struct StaticSource {
        records: Option<Vec<EventRecord>>,
        pub(crate) calls: AtomicUsize,
    }

    impl StaticSource {
        pub(crate) fn ok(records: Vec<EventRecord>) -> Self {
            Self {
                records: Some(records),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                records: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl FeedSource for StaticSource {
        async fn fetch(&self) -> Result<Vec<EventRecord>, QuakeMapError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.records
                .clone()
                .ok_or_else(|| QuakeMapError::InvalidResponse("connection reset".into()))
        }
    }

    fn ids(set: &VisibleSet) -> Vec<&str> {
        set.iter().map(EventRecord::id).collect()
    }

    #[tokio::test]
    async fn test_starts_loading_then_ready() {
        let store = FeedStore::new();
        assert_eq!(store.status(), FeedStatus::Loading);
        assert!(store.visible_records().is_empty());

        let source = StaticSource::ok(vec![record("a", 1.0, 0.0, 0.0, 5.0)]);
        store.initialize(&source).await;

        assert_eq!(store.status(), FeedStatus::Ready);
        assert_eq!(store.snapshot().records().len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_fetches_once() {
        let store = FeedStore::new();
        let source = StaticSource::ok(vec![record("a", 1.0, 0.0, 0.0, 5.0)]);

        store.initialize(&source).await;
        store.initialize(&source).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_sets_fixed_message() {
        let store = FeedStore::new();
        store.initialize(&StaticSource::failing()).await;

        let status = store.status();
        assert_eq!(status, FeedStatus::Failed(FEED_LOAD_FAILURE.to_string()));
        assert_eq!(status.message(), Some("Failed to load earthquake data"));
        assert!(store.visible_records().is_empty());
    }

    #[tokio::test]
    async fn test_filter_matches_set_builder() {
        let records = vec![
            record("a", 2.0, 0.0, 0.0, 5.0),
            record("b", -0.5, 0.0, 0.0, 5.0),
            record("c", 3.0, 0.0, 0.0, 5.0),
            record("d", 4.7, 0.0, 0.0, 5.0),
            record("e", 2.9999, 0.0, 0.0, 5.0),
        ];
        let store = FeedStore::new();
        store.initialize(&StaticSource::ok(records.clone())).await;

        for t in [-1.0, 0.0, 2.0, 3.0, 4.7, 9.0] {
            store.set_threshold(t);
            let expected: Vec<&str> = records
                .iter()
                .filter(|r| r.magnitude() >= t)
                .map(EventRecord::id)
                .collect();
            assert_eq!(ids(&store.visible_records()), expected, "threshold {t}");
        }
    }

    #[tokio::test]
    async fn test_same_threshold_keeps_identity() {
        let store = FeedStore::new();
        store
            .initialize(&StaticSource::ok(vec![record("a", 2.0, 0.0, 0.0, 5.0)]))
            .await;
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        assert!(store.set_threshold(1.5));
        let first = store.visible_records();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        assert!(!store.set_threshold(1.5));
        assert!(store.visible_records().same_as(&first));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_threshold_not_clamped() {
        let store = FeedStore::new();
        store
            .initialize(&StaticSource::ok(vec![record("a", 9.1, 0.0, 0.0, 5.0)]))
            .await;

        store.set_threshold(42.0);
        assert_eq!(store.threshold(), 42.0);
        assert!(store.visible_records().is_empty());

        store.set_threshold(-3.0);
        assert_eq!(store.visible_records().len(), 1);
    }

    #[tokio::test]
    async fn test_records_arrival_changes_identity() {
        let store = FeedStore::new();
        let before = store.visible_records();
        store
            .initialize(&StaticSource::ok(vec![record("a", 2.0, 0.0, 0.0, 5.0)]))
            .await;

        assert!(!store.visible_records().same_as(&before));
    }
}
