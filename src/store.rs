//! Fetch lifecycle for the NEO feed.
//!
//! [`FeedStore`] owns a [`FetchState`] and moves it through
//! `Idle -> Loading -> Loaded | Failed -> Loading -> ...`. Every transition is
//! pushed, in order, to each live [`Subscription`]. While a fetch is in flight
//! further fetch requests are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info};

use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::model::{DATE_FORMAT, FeedPayload};
use crate::parser::parse_feed;

#[derive(Debug, Clone)]
pub enum FetchState {
    Idle,
    Loading,
    Loaded(Arc<FeedPayload>),
    Failed(Arc<FeedError>),
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn payload(&self) -> Option<&FeedPayload> {
        match self {
            FetchState::Loaded(payload) => Some(payload.as_ref()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FeedError> {
        match self {
            FetchState::Failed(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FetchState::Idle => "idle",
            FetchState::Loading => "loading",
            FetchState::Loaded(_) => "loaded",
            FetchState::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving end of a store subscription.
///
/// The first value received is the store's state at subscribe time; every
/// later transition follows in order. Dropping the subscription (or calling
/// [`FeedStore::unsubscribe`]) stops delivery.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::UnboundedReceiver<FetchState>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next state. `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<FetchState> {
        self.rx.recv().await
    }

    /// Returns the next already-delivered state without waiting.
    pub fn try_recv(&mut self) -> Option<FetchState> {
        self.rx.try_recv().ok()
    }
}

struct Inner {
    state: FetchState,
    observers: Vec<(SubscriptionId, mpsc::UnboundedSender<FetchState>)>,
    next_id: u64,
}

impl Inner {
    fn transition(&mut self, next: FetchState) {
        debug!(from = self.state.label(), to = next.label(), "Feed state transition");
        self.state = next;
        let state = &self.state;
        self.observers.retain(|(_, tx)| tx.send(state.clone()).is_ok());
    }
}

/// Fetches the date-ranged feed and broadcasts its load state.
///
/// Construct one per application and share it behind an [`Arc`]; fetches are
/// spawned onto the current tokio runtime.
pub struct FeedStore<C> {
    client: C,
    endpoint: Url,
    inner: Mutex<Inner>,
}

impl FeedStore<UrlParam<BasicClient>> {
    /// Store that calls `config.endpoint` with `config.api_key` as `api_key`.
    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(
            UrlParam::api_key(BasicClient::new(), config.api_key.clone()),
            config.endpoint.clone(),
        )
    }
}

impl<C: HttpClient + 'static> FeedStore<C> {
    pub fn new(client: C, endpoint: Url) -> Self {
        Self {
            client,
            endpoint,
            inner: Mutex::new(Inner {
                state: FetchState::Idle,
                observers: Vec::new(),
                next_id: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> FetchState {
        self.lock().state.clone()
    }

    /// Registers a new observer. The current state is delivered immediately.
    pub fn subscribe(&self) -> Subscription {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(inner.state.clone());
        inner.observers.push((id, tx));
        debug!(subscription = id.0, observers = inner.observers.len(), "Subscribed");

        Subscription { id, rx }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.lock();
        inner.observers.retain(|(sid, _)| *sid != id);
        debug!(subscription = id.0, observers = inner.observers.len(), "Unsubscribed");
    }

    /// Starts fetching the feed for `start ..= end`.
    ///
    /// Without `end` the upstream API picks its own default window. Returns
    /// `None` without doing anything if a fetch is already in flight;
    /// otherwise the state is already `Loading` when this returns and the
    /// handle resolves after the final `Loaded` or `Failed` transition.
    ///
    /// The fetch runs on the current tokio runtime. Called outside one, it
    /// logs an error and returns `None` with the state untouched.
    pub fn fetch_feed(
        self: &Arc<Self>,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Option<JoinHandle<()>> {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, %start, ?end, "No tokio runtime, fetch not started");
                return None;
            }
        };

        {
            let mut inner = self.lock();
            if inner.state.is_loading() {
                debug!(%start, ?end, "Fetch already in flight, request dropped");
                return None;
            }
            inner.transition(FetchState::Loading);
        }

        let url = self.feed_url(start, end);
        let store = Arc::clone(self);
        let span = tracing::info_span!("fetch_feed", %start, end = ?end);

        Some(runtime.spawn(
            async move {
                info!("Fetching NEO feed");
                let next = match store.load(url).await {
                    Ok(payload) => {
                        info!(
                            element_count = payload.element_count,
                            days = payload.near_earth_objects.len(),
                            "Feed loaded"
                        );
                        FetchState::Loaded(Arc::new(payload))
                    }
                    Err(e) => {
                        error!(error = %e, kind = ?e.kind(), "Feed fetch failed");
                        FetchState::Failed(Arc::new(e))
                    }
                };
                store.lock().transition(next);
            }
            .instrument(span),
        ))
    }

    fn feed_url(&self, start: NaiveDate, end: Option<NaiveDate>) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("start_date", &start.format(DATE_FORMAT).to_string());
            if let Some(end) = end {
                query.append_pair("end_date", &end.format(DATE_FORMAT).to_string());
            }
        }
        url
    }

    async fn load(&self, url: Url) -> Result<FeedPayload, FeedError> {
        let bytes = fetch_bytes(&self.client, url).await?;
        Ok(parse_feed(&bytes)?)
    }
}
