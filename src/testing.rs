//! In-process stand-in for the upstream order API, served by axum on an
//! ephemeral port so tests exercise the real reqwest client.

use crate::upstream::UpstreamClient;
use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: HashMap<String, String>,
}

#[derive(Default)]
struct StubState {
    /// When set, only this refresh token is accepted and it rotates on use.
    valid_refresh_token: Option<String>,
    issued: VecDeque<(String, String)>,
    issue_count: usize,
    refresh_failure: Option<StatusCode>,
    refresh_body: Option<String>,
    refresh_delay: Duration,
    orders_body: HashMap<String, String>,
    orders_failure: Option<StatusCode>,
    log: Vec<RecordedRequest>,
}

#[derive(Clone, Default)]
pub struct StubUpstream {
    state: Arc<Mutex<StubState>>,
}

impl StubUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().unwrap()
    }

    /// Accept only `token`, invalidating each refresh token once used.
    pub fn rotating_from(self, token: &str) -> Self {
        self.lock().valid_refresh_token = Some(token.to_string());
        self
    }

    pub fn issue(self, access: &str, refresh: &str) -> Self {
        self.lock()
            .issued
            .push_back((access.to_string(), refresh.to_string()));
        self
    }

    pub fn refresh_delay(self, delay: Duration) -> Self {
        self.lock().refresh_delay = delay;
        self
    }

    pub fn set_refresh_failure(&self, status: Option<StatusCode>) {
        self.lock().refresh_failure = status;
    }

    pub fn set_refresh_body(&self, body: &str) {
        self.lock().refresh_body = Some(body.to_string());
    }

    pub fn set_orders(&self, path: &str, body: &str) {
        self.lock()
            .orders_body
            .insert(path.to_string(), body.to_string());
    }

    pub fn set_orders_failure(&self, status: Option<StatusCode>) {
        self.lock().orders_failure = status;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().log.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.lock().log.iter().map(|r| r.path.clone()).collect()
    }

    pub fn refresh_count(&self) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|r| r.path == "/refresh_token")
            .count()
    }

    pub async fn spawn(&self) -> String {
        let router = Router::new()
            .route("/refresh_token", post(refresh_handler))
            .route("/get_all_orders", post(orders_handler))
            .route("/get_all_orders_lazada", post(orders_handler))
            .route("/get_all_orders_tiktok", post(orders_handler))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{addr}")
    }

    pub async fn spawn_client(&self) -> UpstreamClient {
        let base_url = self.spawn().await;
        UpstreamClient::with_base_url(&base_url, Duration::from_secs(5)).unwrap()
    }
}

async fn refresh_handler(
    State(stub): State<StubUpstream>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    // the real upstream spends the presented token as soon as it sees it,
    // before the reply is written
    let (delay, response) = {
        let mut state = stub.lock();
        state.log.push(RecordedRequest {
            path: "/refresh_token".to_string(),
            query: query.clone(),
        });
        (state.refresh_delay, exchange(&mut state, &query))
    };

    tokio::time::sleep(delay).await;
    response
}

fn exchange(state: &mut StubState, query: &HashMap<String, String>) -> Response {
    if let Some(status) = state.refresh_failure {
        return (status, "upstream refused").into_response();
    }
    if let Some(body) = state.refresh_body.clone() {
        return body.into_response();
    }

    let presented = query.get("refresh_token").cloned().unwrap_or_default();
    if let Some(valid) = &state.valid_refresh_token {
        if *valid != presented {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "invalid refresh token" })),
            )
                .into_response();
        }
    }

    state.issue_count += 1;
    let n = state.issue_count;
    let (access, refresh) = state
        .issued
        .pop_front()
        .unwrap_or_else(|| (format!("access-{n}"), format!("refresh-{n}")));

    if state.valid_refresh_token.is_some() {
        state.valid_refresh_token = Some(refresh.clone());
    }

    Json(serde_json::json!({
        "access_token": access,
        "refresh_token": refresh,
    }))
    .into_response()
}

async fn orders_handler(
    State(stub): State<StubUpstream>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut state = stub.lock();
    let path = uri.path().to_string();
    state.log.push(RecordedRequest {
        path: path.clone(),
        query,
    });

    if let Some(status) = state.orders_failure {
        return (status, "orders unavailable").into_response();
    }

    let body = state
        .orders_body
        .get(&path)
        .cloned()
        .unwrap_or_else(|| r#"{"order_detail": []}"#.to_string());

    ([("content-type", "application/json")], body).into_response()
}

pub fn order_json(order_sn: &str, create_time: i64, buyer: &str) -> serde_json::Value {
    serde_json::json!({
        "order_sn": order_sn,
        "create_time": create_time,
        "buyer_username": buyer,
        "cod": false,
        "order_status": "READY_TO_SHIP",
        "item_list": [{
            "model_sku": format!("SKU-{order_sn}"),
            "model_name": "Black,M",
            "model_discounted_price": 199.0,
            "image_info": { "image_url": "https://cf.example.com/file/img" }
        }]
    })
}

pub fn order_list_body(orders: &[serde_json::Value]) -> String {
    serde_json::json!({ "order_detail": orders }).to_string()
}
