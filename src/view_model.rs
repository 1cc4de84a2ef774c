//! Translates store transitions into render-ready chart state.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::analyzers::aggregate::aggregate;
use crate::analyzers::types::{ChartStats, DateRange};
use crate::error::FeedError;
use crate::fetch::HttpClient;
use crate::store::{FeedStore, FetchState, Subscription};

/// Snapshot handed to the renderer. A new value is built for every emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartViewState {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub asteroids_per_day: Vec<usize>,
    pub fastest_asteroid_name: String,
    pub fastest_asteroid_speed: f64,
    pub closest_asteroid_name: String,
    pub closest_asteroid_distance: f64,
    /// `None` means no objects were aggregated; render nothing for it.
    pub average_asteroid_size: Option<f64>,
    pub is_loading: bool,
}

impl ChartViewState {
    /// Empty chart for `range`, waiting on its first load.
    pub fn initial(range: DateRange) -> Self {
        Self {
            start_date: range.start,
            end_date: range.end,
            asteroids_per_day: Vec::new(),
            fastest_asteroid_name: String::new(),
            fastest_asteroid_speed: 0.0,
            closest_asteroid_name: String::new(),
            closest_asteroid_distance: 0.0,
            average_asteroid_size: None,
            is_loading: true,
        }
    }

    pub fn from_stats(range: DateRange, stats: ChartStats) -> Self {
        Self {
            start_date: range.start,
            end_date: range.end,
            asteroids_per_day: stats.asteroids_per_day,
            fastest_asteroid_name: stats.fastest.name,
            fastest_asteroid_speed: stats.fastest.value,
            closest_asteroid_name: stats.closest.name,
            closest_asteroid_distance: stats.closest.value,
            average_asteroid_size: stats.average_size,
            is_loading: false,
        }
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.start_date, self.end_date)
    }

    fn with_loading(&self, is_loading: bool) -> Self {
        Self {
            is_loading,
            ..self.clone()
        }
    }
}

/// Render callback for [`ChartViewModel`].
pub trait ChartView {
    fn render(&mut self, state: &ChartViewState);
}

/// Holds the selected date range, listens to a [`FeedStore`] and pushes a
/// fresh [`ChartViewState`] to its [`ChartView`] on every transition.
///
/// Transitions are only applied when the owner drives
/// [`process_next`](Self::process_next) or
/// [`process_pending`](Self::process_pending), so rendering happens on the
/// owner's task and never concurrently with itself.
pub struct ChartViewModel<C, V> {
    store: Arc<FeedStore<C>>,
    view: V,
    range: DateRange,
    state: ChartViewState,
    subscription: Option<Subscription>,
    last_error: Option<Arc<FeedError>>,
}

impl<C: HttpClient + 'static, V: ChartView> ChartViewModel<C, V> {
    pub fn new(store: Arc<FeedStore<C>>, view: V, range: DateRange) -> Self {
        Self {
            store,
            view,
            range,
            state: ChartViewState::initial(range),
            subscription: None,
            last_error: None,
        }
    }

    /// View model selecting the trailing week before `today`.
    pub fn with_default_range(store: Arc<FeedStore<C>>, view: V, today: NaiveDate) -> Self {
        Self::new(store, view, DateRange::trailing_week(today))
    }

    pub fn state(&self) -> &ChartViewState {
        &self.state
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_some()
    }

    /// Error carried by the most recent `Failed` transition.
    pub fn last_error(&self) -> Option<&FeedError> {
        self.last_error.as_deref()
    }

    /// Subscribes to the store and requests the current range.
    ///
    /// Returns the fetch handle, or `None` when the store was already loading.
    pub fn activate(&mut self) -> Option<JoinHandle<()>> {
        if self.subscription.is_none() {
            self.subscription = Some(self.store.subscribe());
        }
        self.fetch()
    }

    /// Unsubscribes. Nothing is rendered until the next [`activate`](Self::activate).
    pub fn deactivate(&mut self) {
        if let Some(sub) = self.subscription.take() {
            self.store.unsubscribe(sub.id());
        }
    }

    /// Replaces the selected range and immediately requests it.
    ///
    /// The range is not validated here; an inverted range charts as empty.
    pub fn apply_filters(&mut self, start: NaiveDate, end: NaiveDate) -> Option<JoinHandle<()>> {
        self.range = DateRange::new(start, end);
        debug!(%start, %end, "Filters applied");
        self.fetch()
    }

    /// Waits for the next store transition and renders it.
    ///
    /// Returns the transition, or `None` when inactive.
    pub async fn process_next(&mut self) -> Option<FetchState> {
        let next = self.subscription.as_mut()?.recv().await?;
        self.handle(&next);
        Some(next)
    }

    /// Renders every transition already delivered, without waiting.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(next) = self.subscription.as_mut().and_then(Subscription::try_recv) {
            self.handle(&next);
            handled += 1;
        }
        handled
    }

    fn fetch(&self) -> Option<JoinHandle<()>> {
        self.store.fetch_feed(self.range.start, Some(self.range.end))
    }

    fn handle(&mut self, transition: &FetchState) {
        self.state = match transition {
            FetchState::Idle => {
                debug!("Store idle");
                return;
            }
            FetchState::Loading => self.state.with_loading(true),
            FetchState::Loaded(payload) => {
                ChartViewState::from_stats(self.range, aggregate(payload, self.range))
            }
            FetchState::Failed(err) => {
                warn!(error = %err, "Feed unavailable, keeping previous chart");
                self.last_error = Some(Arc::clone(err));
                self.state.with_loading(false)
            }
        };
        self.view.render(&self.state);
    }
}
