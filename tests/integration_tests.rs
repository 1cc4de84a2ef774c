use std::sync::Arc;

use chrono::NaiveDate;
use neostats::analyzers::aggregate::aggregate;
use neostats::analyzers::types::DateRange;
use neostats::config::FeedConfig;
use neostats::error::FeedErrorKind;
use neostats::fetch::BasicClient;
use neostats::fetch::auth::UrlParam;
use neostats::model::{Dimension, FeedPayload};
use neostats::parser::parse_feed;
use neostats::store::{FeedStore, FetchState, Subscription};
use neostats::view_model::{ChartView, ChartViewModel, ChartViewState};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIXTURE: &[u8] = include_bytes!("fixtures/feed_2021-07-01.json");
const FEED_PATH: &str = "/neo/rest/v1/feed";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn store_for(endpoint: &str) -> Arc<FeedStore<UrlParam<BasicClient>>> {
    let config = FeedConfig::new(endpoint, "TEST_KEY").expect("valid config");
    Arc::new(FeedStore::from_config(&config))
}

fn drain(sub: &mut Subscription) -> Vec<FetchState> {
    std::iter::from_fn(|| sub.try_recv()).collect()
}

fn labels(states: &[FetchState]) -> Vec<&'static str> {
    states
        .iter()
        .map(|s| match s {
            FetchState::Idle => "idle",
            FetchState::Loading => "loading",
            FetchState::Loaded(_) => "loaded",
            FetchState::Failed(_) => "failed",
        })
        .collect()
}

async fn serve(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(template)
        .mount(server)
        .await;
}

#[derive(Default)]
struct Recorder(Vec<ChartViewState>);

impl ChartView for Recorder {
    fn render(&mut self, state: &ChartViewState) {
        self.0.push(state.clone());
    }
}

#[test]
fn test_full_pipeline() {
    let payload = parse_feed(FIXTURE).expect("Failed to parse feed");
    assert_eq!(payload.element_count, 3);
    assert_eq!(payload.object_count(), 3);

    let stats = aggregate(&payload, DateRange::new(date(2021, 7, 1), date(2021, 7, 3)));

    assert_eq!(stats.asteroids_per_day, vec![2, 0, 1]);
    assert_eq!(stats.fastest.name, "(2021 NA)");
    assert_eq!(stats.fastest.value, 72000.25);
    // Largest miss distance wins, including later approaches of the same object.
    assert_eq!(stats.closest.name, "465633 (2009 JR5)");
    assert_eq!(stats.closest.value, 50000000.5);

    let expected = ((0.2251930467 + 0.5035469604) / 2.0 + 0.2 + 0.1) / 3.0;
    let avg = stats.average_size.expect("objects present");
    assert!((avg - expected).abs() < 1e-9, "avg {avg} != {expected}");
}

#[test]
fn test_fixture_round_trips_through_wire_json() {
    let payload = parse_feed(FIXTURE).unwrap();
    let encoded = serde_json::to_string(&payload).unwrap();

    assert!(encoded.contains("\"close_approach_data\""));
    assert!(encoded.contains("\"kilometers_per_hour\":\"65260.5699103704\""));
    assert!(encoded.contains("\"estimated_diameter_min\""));

    let decoded: FeedPayload = parse_feed(encoded.as_bytes()).unwrap();
    assert_eq!(decoded, payload);

    let neo = &decoded.near_earth_objects["2021-07-01"][0];
    assert_eq!(neo.neo_reference_id.as_deref(), Some("2465633"));
    assert!(neo.is_potentially_hazardous_asteroid);
    assert_eq!(neo.close_approach_data.len(), 2);
    assert_eq!(
        neo.estimated_diameter.get(Dimension::Kilometers).estimated_diameter_max,
        0.5035469604
    );
}

#[tokio::test]
async fn test_store_loads_feed_with_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .and(query_param("start_date", "2021-07-01"))
        .and(query_param("end_date", "2021-07-03"))
        .and(query_param("api_key", "TEST_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(FIXTURE.to_vec(), "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&format!("{}{FEED_PATH}", server.uri()));
    let mut sub = store.subscribe();

    let handle = store
        .fetch_feed(date(2021, 7, 1), Some(date(2021, 7, 3)))
        .expect("fetch started");
    assert!(store.state().is_loading());
    handle.await.unwrap();

    let states = drain(&mut sub);
    assert_eq!(labels(&states), vec!["idle", "loading", "loaded"]);
    let payload = states[2].payload().unwrap();
    assert_eq!(payload.element_count, 3);
}

#[tokio::test]
async fn test_store_omits_end_date_when_absent() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_raw(FIXTURE.to_vec(), "application/json"),
    )
    .await;

    let store = store_for(&format!("{}{FEED_PATH}", server.uri()));
    store.fetch_feed(date(2021, 7, 1), None).unwrap().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let keys: Vec<String> = requests[0]
        .url
        .query_pairs()
        .map(|(k, _)| k.into_owned())
        .collect();
    assert_eq!(keys, vec!["start_date", "api_key"]);
}

#[tokio::test]
async fn test_fetch_while_loading_issues_single_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(FIXTURE.to_vec(), "application/json")
                .set_delay(std::time::Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&format!("{}{FEED_PATH}", server.uri()));
    let mut sub = store.subscribe();

    let first = store.fetch_feed(date(2021, 7, 1), Some(date(2021, 7, 3)));
    let second = store.fetch_feed(date(2021, 8, 1), Some(date(2021, 8, 3)));
    assert!(first.is_some());
    assert!(second.is_none());
    assert!(store.state().is_loading());

    first.unwrap().await.unwrap();
    assert_eq!(labels(&drain(&mut sub)), vec!["idle", "loading", "loaded"]);
}

#[tokio::test]
async fn test_transport_failure_then_refetch() {
    // Bind then release a port so nothing is listening on it.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let store = store_for(&format!("http://127.0.0.1:{port}{FEED_PATH}"));
    let mut sub = store.subscribe();

    store.fetch_feed(date(2021, 7, 1), None).unwrap().await.unwrap();

    let state = store.state();
    let err = state.error().expect("failed state");
    assert_eq!(err.kind(), FeedErrorKind::Transport);

    let retry = store.fetch_feed(date(2021, 7, 1), None);
    assert!(retry.is_some());
    assert!(store.state().is_loading());
    retry.unwrap().await.unwrap();

    assert_eq!(
        labels(&drain(&mut sub)),
        vec!["idle", "loading", "failed", "loading", "failed"]
    );
}

#[tokio::test]
async fn test_http_error_status_is_transport_failure() {
    let server = MockServer::start().await;
    serve(&server, ResponseTemplate::new(429)).await;

    let store = store_for(&format!("{}{FEED_PATH}", server.uri()));
    store.fetch_feed(date(2021, 7, 1), None).unwrap().await.unwrap();

    assert_eq!(
        store.state().error().map(|e| e.kind()),
        Some(FeedErrorKind::Transport)
    );
}

#[tokio::test]
async fn test_missing_kilometers_fails_decode() {
    let mut body: serde_json::Value = serde_json::from_slice(FIXTURE).unwrap();
    body["near_earth_objects"]["2021-07-01"][0]["estimated_diameter"]
        .as_object_mut()
        .unwrap()
        .remove("kilometers");

    let server = MockServer::start().await;
    serve(&server, ResponseTemplate::new(200).set_body_json(body)).await;

    let store = store_for(&format!("{}{FEED_PATH}", server.uri()));
    let mut sub = store.subscribe();
    store.fetch_feed(date(2021, 7, 1), None).unwrap().await.unwrap();

    let states = drain(&mut sub);
    assert_eq!(labels(&states), vec!["idle", "loading", "failed"]);
    assert_eq!(
        states[2].error().map(|e| e.kind()),
        Some(FeedErrorKind::Decode)
    );
}

#[tokio::test]
async fn test_view_model_renders_loaded_chart_and_refilters() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_raw(FIXTURE.to_vec(), "application/json"),
    )
    .await;

    let store = store_for(&format!("{}{FEED_PATH}", server.uri()));
    let mut vm = ChartViewModel::new(
        Arc::clone(&store),
        Recorder::default(),
        DateRange::new(date(2021, 7, 1), date(2021, 7, 3)),
    );

    vm.activate().expect("fetch started").await.unwrap();
    vm.process_pending();

    let rendered = &vm.view().0;
    assert_eq!(rendered.len(), 2);
    assert!(rendered[0].is_loading);
    assert_eq!(rendered[1].asteroids_per_day, vec![2, 0, 1]);
    assert_eq!(rendered[1].fastest_asteroid_name, "(2021 NA)");
    assert!(!vm.state().is_loading);

    vm.apply_filters(date(2021, 7, 3), date(2021, 7, 4))
        .expect("refetch started")
        .await
        .unwrap();
    vm.process_pending();

    assert_eq!(vm.state().start_date, date(2021, 7, 3));
    assert_eq!(vm.state().asteroids_per_day, vec![1, 0]);
    assert_eq!(vm.view().0.len(), 4);
}

#[tokio::test]
async fn test_view_model_keeps_chart_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .and(query_param("start_date", "2021-07-01"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(FIXTURE.to_vec(), "application/json"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .and(query_param("start_date", "2021-09-01"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = store_for(&format!("{}{FEED_PATH}", server.uri()));
    let mut vm = ChartViewModel::new(
        Arc::clone(&store),
        Recorder::default(),
        DateRange::new(date(2021, 7, 1), date(2021, 7, 3)),
    );
    vm.activate().unwrap().await.unwrap();
    vm.process_pending();
    let loaded = vm.state().clone();

    vm.apply_filters(date(2021, 9, 1), date(2021, 9, 2))
        .unwrap()
        .await
        .unwrap();
    vm.process_pending();

    assert_eq!(vm.state(), &ChartViewState { is_loading: false, ..loaded });
    assert_eq!(
        vm.last_error().map(|e| e.kind()),
        Some(FeedErrorKind::Transport)
    );
}

#[tokio::test]
async fn test_view_model_process_next_follows_transitions() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_raw(FIXTURE.to_vec(), "application/json"),
    )
    .await;

    let store = store_for(&format!("{}{FEED_PATH}", server.uri()));
    let mut vm = ChartViewModel::new(
        store,
        Recorder::default(),
        DateRange::new(date(2021, 7, 1), date(2021, 7, 1)),
    );
    vm.activate();

    let mut seen = Vec::new();
    while let Some(state) = vm.process_next().await {
        let done = matches!(state, FetchState::Loaded(_) | FetchState::Failed(_));
        seen.push(state);
        if done {
            break;
        }
    }

    assert_eq!(labels(&seen), vec!["idle", "loading", "loaded"]);
    assert_eq!(vm.state().asteroids_per_day, vec![2]);
}

#[tokio::test]
async fn test_view_model_resumes_after_reactivation() {
    let server = MockServer::start().await;
    serve(
        &server,
        ResponseTemplate::new(200).set_body_raw(FIXTURE.to_vec(), "application/json"),
    )
    .await;

    let store = store_for(&format!("{}{FEED_PATH}", server.uri()));
    let mut vm = ChartViewModel::new(
        Arc::clone(&store),
        Recorder::default(),
        DateRange::new(date(2021, 7, 1), date(2021, 7, 3)),
    );
    vm.activate().unwrap().await.unwrap();
    vm.process_pending();
    assert_eq!(vm.view().0.len(), 2);

    vm.deactivate();
    assert!(!vm.is_active());
    store
        .fetch_feed(date(2021, 7, 3), Some(date(2021, 7, 4)))
        .expect("fetch started")
        .await
        .unwrap();
    assert_eq!(vm.process_pending(), 0);
    assert_eq!(vm.view().0.len(), 2);
    assert!(matches!(store.state(), FetchState::Loaded(_)));

    vm.activate().expect("refetch started").await.unwrap();
    assert!(vm.is_active());
    assert_eq!(vm.process_pending(), 3);

    // Replayed current state, then the fresh fetch.
    let rendered = &vm.view().0[2..];
    assert_eq!(rendered.len(), 3);
    assert!(!rendered[0].is_loading);
    assert_eq!(rendered[0].asteroids_per_day, vec![2, 0, 1]);
    assert!(rendered[1].is_loading);
    assert_eq!(rendered[1].asteroids_per_day, vec![2, 0, 1]);
    assert!(!rendered[2].is_loading);
    assert_eq!(rendered[2].start_date, date(2021, 7, 1));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}
