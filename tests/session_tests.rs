use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::watch;

use swipe_session::{
    error::AppError,
    middleware::REQUEST_ID_HEADER,
    models::{RecommendationRequest, SessionIdentity},
    services::{HttpRecommendationProvider, RecommendationProvider},
    session::{RefillKind, RefillOutcome},
    Direction, ItemId, Session, SessionConfig,
};

const COOKIE: &str = "session=ok";

/// In-process stand-in for the recommendation service
#[derive(Clone, Default)]
struct FakeService {
    requests: Arc<Mutex<Vec<RecommendationRequest>>>,
    request_ids: Arc<Mutex<Vec<String>>>,
    initial: Arc<Mutex<Value>>,
    batches: Arc<Mutex<VecDeque<(StatusCode, Value)>>>,
}

impl FakeService {
    fn with_initial(initial: Value) -> Self {
        let service = Self::default();
        *service.initial.lock().unwrap() = initial;
        service
    }

    fn push_batch(&self, status: StatusCode, body: Value) {
        self.batches.lock().unwrap().push_back((status, body));
    }

    fn requests(&self) -> Vec<RecommendationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("cookie")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains(COOKIE))
        .unwrap_or(false)
}

fn track_request_id(service: &FakeService, headers: &HeaderMap) {
    if let Some(id) = headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
        service.request_ids.lock().unwrap().push(id.to_string());
    }
}

async fn status(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if authorized(&headers) {
        (StatusCode::OK, Json(json!({ "user": "tester" })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Please log in" })))
    }
}

async fn recommend_initial(
    State(service): State<FakeService>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    track_request_id(&service, &headers);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Please log in" })));
    }
    let body = service.initial.lock().unwrap().clone();
    (StatusCode::OK, Json(body))
}

async fn recommend(
    State(service): State<FakeService>,
    headers: HeaderMap,
    Json(request): Json<RecommendationRequest>,
) -> (StatusCode, Json<Value>) {
    track_request_id(&service, &headers);
    service.requests.lock().unwrap().push(request);
    let next = service.batches.lock().unwrap().pop_front();
    let (status, body) = next.unwrap_or((StatusCode::OK, json!({ "recommendations": [] })));
    (status, Json(body))
}

async fn spawn_service(service: FakeService) -> String {
    let app = Router::new()
        .route("/status", get(status))
        .route("/recommend/initial", get(recommend_initial))
        .route("/recommend", post(recommend))
        .with_state(service);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn provider(base_url: &str, cookie: Option<&str>) -> HttpRecommendationProvider {
    HttpRecommendationProvider::new(base_url, Duration::from_secs(5), cookie).unwrap()
}

fn movie(id: u64) -> Value {
    json!({
        "movieId": id,
        "title": format!("Movie {}", id),
        "genres": ["Drama"],
        "poster_url": format!("https://img/{}.jpg", id),
    })
}

fn session_config() -> SessionConfig {
    SessionConfig {
        settle_duration: Duration::from_millis(20),
        ..SessionConfig::default()
    }
}

fn ids(items: &[swipe_session::Item]) -> Vec<ItemId> {
    items.iter().map(|item| item.id.clone()).collect()
}

#[tokio::test]
async fn test_check_auth_status() {
    let base_url = spawn_service(FakeService::default()).await;

    assert!(provider(&base_url, Some(COOKIE)).check_auth_status().await.unwrap());
    assert!(!provider(&base_url, None).check_auth_status().await.unwrap());
}

#[tokio::test]
async fn test_fetch_initial_decodes_identity_and_items() {
    let service = FakeService::with_initial(json!({
        "userId": "u1",
        "recommendations": [movie(1), movie(2)],
    }));
    let base_url = spawn_service(service.clone()).await;

    let initial = provider(&base_url, Some(COOKIE)).fetch_initial().await.unwrap();

    assert_eq!(initial.user_id, SessionIdentity::Text("u1".to_string()));
    assert_eq!(initial.recommendations.len(), 2);
    assert_eq!(initial.recommendations[1].genres, vec!["Drama"]);
    assert_eq!(service.request_ids.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_fetch_initial_unauthorized_is_not_authenticated() {
    let base_url = spawn_service(FakeService::default()).await;

    let err = provider(&base_url, None).fetch_initial().await.unwrap_err();
    assert!(matches!(err, AppError::NotAuthenticated));
}

#[tokio::test]
async fn test_fetch_more_server_error_carries_message() {
    let service = FakeService::default();
    service.push_batch(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "message": "Error storing interactions" }),
    );
    let base_url = spawn_service(service).await;

    let request = RecommendationRequest {
        user_id: SessionIdentity::Numeric(7),
        liked_movie_ids: vec![],
        disliked_movie_ids: vec![ItemId::Numeric(3)],
    };
    let err = provider(&base_url, Some(COOKIE))
        .fetch_more(&request)
        .await
        .unwrap_err();
    match err {
        AppError::ExternalApi { status, message } => {
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(message, "Error storing interactions");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_more_message_only_response_is_empty_batch() {
    let service = FakeService::default();
    service.push_batch(
        StatusCode::OK,
        json!({ "message": "No new movies left to recommend." }),
    );
    let base_url = spawn_service(service.clone()).await;

    let request = RecommendationRequest {
        user_id: SessionIdentity::Numeric(7),
        liked_movie_ids: vec![ItemId::Numeric(1)],
        disliked_movie_ids: vec![],
    };
    let batch = provider(&base_url, Some(COOKIE))
        .fetch_more(&request)
        .await
        .unwrap();

    assert!(batch.recommendations.is_empty());
    assert_eq!(service.requests(), vec![request]);
}

#[tokio::test]
async fn test_end_to_end_session_against_service() {
    let service = FakeService::with_initial(json!({
        "userId": "u1",
        "recommendations": [movie(1), movie(2)],
    }));
    service.push_batch(
        StatusCode::OK,
        json!({ "recommendations": [movie(3), movie(4)] }),
    );
    let base_url = spawn_service(service.clone()).await;

    let (_auth_tx, auth_rx) = watch::channel(true);
    let session = Session::new(
        Arc::new(provider(&base_url, Some(COOKIE))),
        auth_rx,
        session_config(),
    );

    session.on_authenticated().await;
    assert_eq!(
        ids(&session.queue().await),
        vec![ItemId::Numeric(1), ItemId::Numeric(2)]
    );

    let accept = session.trigger_decision(Direction::Accept).await;
    assert!(accept.wait_refill().await.is_none());
    assert_eq!(ids(&session.accepted().await), vec![ItemId::Numeric(2)]);
    assert_eq!(ids(&session.queue().await), vec![ItemId::Numeric(1)]);

    let reject = session.trigger_decision(Direction::Reject).await;
    let refill = reject.wait_refill().await;
    assert_eq!(
        refill,
        Some(RefillOutcome::Appended {
            kind: RefillKind::Incremental,
            received: 2,
            appended: 2,
        })
    );

    assert_eq!(ids(&session.rejected().await), vec![ItemId::Numeric(1)]);
    assert_eq!(
        ids(&session.queue().await),
        vec![ItemId::Numeric(3), ItemId::Numeric(4)]
    );

    let requests = service.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user_id, SessionIdentity::Text("u1".to_string()));
    assert_eq!(requests[0].liked_movie_ids, vec![ItemId::Numeric(2)]);
    assert_eq!(requests[0].disliked_movie_ids, vec![ItemId::Numeric(1)]);
}

#[tokio::test]
async fn test_service_failure_leaves_queue_empty() {
    let service = FakeService::with_initial(json!({
        "userId": 5,
        "recommendations": [movie(1)],
    }));
    service.push_batch(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "message": "Error storing interactions", "error_details": "db down" }),
    );
    let base_url = spawn_service(service).await;

    let (_auth_tx, auth_rx) = watch::channel(true);
    let session = Session::new(
        Arc::new(provider(&base_url, Some(COOKIE))),
        auth_rx,
        session_config(),
    );
    session.on_authenticated().await;

    let outcome = session.trigger_decision(Direction::Accept).await;
    match outcome.wait_refill().await {
        Some(RefillOutcome::Failed { kind, error }) => {
            assert_eq!(kind, RefillKind::Incremental);
            assert!(error.contains("Error storing interactions"));
        }
        other => panic!("unexpected refill outcome: {other:?}"),
    }

    let view = session.snapshot().await;
    assert!(view.no_more_items());
    assert_eq!(ids(&view.accepted), vec![ItemId::Numeric(1)]);

    // A manual retry goes through the same incremental path
    let retry = session.request_refill().await;
    assert_eq!(
        retry,
        RefillOutcome::Exhausted {
            kind: RefillKind::Incremental
        }
    );
}

#[tokio::test]
async fn test_login_transition_triggers_initial_fetch() {
    let service = FakeService::with_initial(json!({
        "userId": "u9",
        "recommendations": [movie(10)],
    }));
    let base_url = spawn_service(service).await;

    let (auth_tx, auth_rx) = watch::channel(false);
    let session = Session::new(
        Arc::new(provider(&base_url, Some(COOKIE))),
        auth_rx,
        session_config(),
    );
    let mut view_rx = session.subscribe();
    let watcher = session.watch_auth();

    assert_eq!(
        session.request_refill().await,
        RefillOutcome::Skipped(swipe_session::session::SkipReason::NotAuthenticated)
    );

    auth_tx.send(true).unwrap();
    view_rx
        .wait_for(|view| view.session_identity.is_some())
        .await
        .unwrap();
    assert_eq!(ids(&session.queue().await), vec![ItemId::Numeric(10)]);

    drop(auth_tx);
    watcher.await.unwrap();
}
