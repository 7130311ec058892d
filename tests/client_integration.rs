use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json, Router,
};
use fabric_gateway_http::{
    operations, resources::codes, ClientOptions, DispatchState, GatewayClient, GatewayError,
    GatewaySettings, Outcome, PemDirectoryStore,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

const HSTS: &str = "max-age=31536000; includeSubDomains";

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    body: Option<JsonValue>,
    headers: Vec<(header::HeaderName, &'static str)>,
    nosniff: bool,
    delay: Duration,
}

impl MockResponse {
    fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: None,
            headers: Vec::new(),
            nosniff: true,
            delay: Duration::from_millis(0),
        }
    }

    fn json(status: StatusCode, body: JsonValue) -> Self {
        Self {
            body: Some(body),
            ..Self::empty(status)
        }
    }

    fn fabric_error(status: StatusCode, code: &str) -> Self {
        Self::json(status, json!({"Error": {"Code": code, "Message": "mock"}}))
    }

    fn with_header(mut self, name: header::HeaderName, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }

    fn without_nosniff(mut self) -> Self {
        self.nosniff = false;
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug)]
struct Recorded {
    method: Method,
    path_and_query: String,
    authorization: Option<String>,
    content_type: Option<String>,
    body: String,
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    recorded: Arc<Mutex<Vec<Recorded>>>,
    hits: Arc<AtomicUsize>,
    hsts: Option<&'static str>,
}

async fn gateway_handler(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    state
        .recorded
        .lock()
        .expect("recorded mutex must not be poisoned")
        .push(Recorded {
            method,
            path_and_query: uri
                .path_and_query()
                .map(|pq| pq.as_str().to_owned())
                .unwrap_or_default(),
            authorization: text(header::AUTHORIZATION),
            content_type: text(header::CONTENT_TYPE),
            body,
        });

    let mock = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::fabric_error(StatusCode::INTERNAL_SERVER_ERROR, "NO_MOCK_RESPONSE")
        })
    };

    if !mock.delay.is_zero() {
        tokio::time::sleep(mock.delay).await;
    }

    let mut response = match mock.body {
        Some(body) => (mock.status, Json(body)).into_response(),
        None => mock.status.into_response(),
    };
    let response_headers = response.headers_mut();
    if mock.nosniff {
        response_headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
    }
    if let Some(hsts) = state.hsts {
        response_headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(hsts),
        );
    }
    for (name, value) in mock.headers {
        response_headers.append(name, HeaderValue::from_static(value));
    }
    response
}

struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    recorded: Arc<Mutex<Vec<Recorded>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn recorded(&self) -> Vec<Recorded> {
        self.recorded
            .lock()
            .expect("recorded mutex must not be poisoned")
            .clone()
    }

    fn client(&self) -> GatewayClient {
        GatewayClient::new([self.base_url.clone()])
            .expect("client must build")
            .with_hsts_header(HSTS)
            .with_options(fast_options())
            .expect("options must apply")
    }
}

async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    spawn_server_with_hsts(responses, Some(HSTS)).await
}

async fn spawn_server_with_hsts(
    responses: Vec<MockResponse>,
    hsts: Option<&'static str>,
) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        recorded: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(AtomicUsize::new(0)),
        hsts,
    };

    let app = Router::new()
        .fallback(gateway_handler)
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        recorded: state.recorded,
        task,
    }
}

fn fast_options() -> ClientOptions {
    ClientOptions {
        timeout_ms: 2_000,
        retry_backoff_ms: 10,
        ..ClientOptions::default()
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct Node {
    name: String,
}

#[tokio::test]
async fn query_decodes_nodes_from_versioned_uri() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!([{"Name": "_Node_0"}, {"Name": "_Node_1"}]),
    )])
    .await;

    let nodes: Vec<Node> = server
        .client()
        .query(&operations::get_nodes())
        .await
        .expect("query must succeed");

    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].name, "_Node_0");

    let recorded = server.recorded();
    assert_eq!(recorded[0].method, Method::GET);
    assert_eq!(recorded[0].path_and_query, "/Nodes?api-version=1.0");
}

#[tokio::test]
async fn retries_on_service_unavailable_and_gateway_timeout() {
    let server = spawn_server(vec![
        MockResponse::empty(StatusCode::SERVICE_UNAVAILABLE),
        MockResponse::empty(StatusCode::GATEWAY_TIMEOUT),
        MockResponse::json(StatusCode::OK, json!([])),
    ])
    .await;

    let outcome = server
        .client()
        .execute(&operations::get_nodes())
        .await
        .expect("third attempt must succeed");

    assert!(outcome.is_success());
    assert_eq!(outcome.response().attempts, 3);
    assert_eq!(outcome.response().retries, 2);
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn stops_at_attempt_bound() {
    let server = spawn_server(vec![MockResponse::empty(StatusCode::SERVICE_UNAVAILABLE); 5]).await;
    let client = server
        .client()
        .with_options(ClientOptions {
            max_attempts: 3,
            ..fast_options()
        })
        .expect("options must apply");

    let err = client
        .execute(&operations::get_nodes())
        .await
        .expect_err("must exhaust attempts");

    match err {
        GatewayError::AttemptsExhausted {
            attempts, status, ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(status, Some(503));
        }
        other => panic!("expected attempts exhausted, got {other:?}"),
    }
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn request_timeout_is_retried() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::OK, json!([])).with_delay(Duration::from_millis(500)),
        MockResponse::json(StatusCode::OK, json!([{"Name": "n"}])),
    ])
    .await;
    let client = server
        .client()
        .with_options(ClientOptions {
            timeout_ms: 100,
            ..fast_options()
        })
        .expect("options must apply");

    let nodes: Vec<Node> = client
        .query(&operations::get_nodes())
        .await
        .expect("retry after timeout must succeed");

    assert_eq!(nodes.len(), 1);
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn missing_nosniff_is_fatal_without_retry() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::OK, json!([])).without_nosniff(),
        MockResponse::json(StatusCode::OK, json!([])),
    ])
    .await;

    let err = server
        .client()
        .execute(&operations::get_nodes())
        .await
        .expect_err("header contract must fail");

    match err {
        GatewayError::HeaderContractViolation { header, actual, .. } => {
            assert_eq!(header, "X-Content-Type-Options");
            assert_eq!(actual, "");
        }
        other => panic!("expected header violation, got {other:?}"),
    }
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn hsts_mismatch_on_error_response_is_fatal() {
    let server = spawn_server_with_hsts(
        vec![MockResponse::fabric_error(
            StatusCode::NOT_FOUND,
            codes::NAME_DOES_NOT_EXIST,
        )],
        Some("max-age=1"),
    )
    .await;

    let err = server
        .client()
        .execute(
            &operations::name_exists("fabric:/missing")
                .expect("must build")
                .expect_status(StatusCode::NOT_FOUND),
        )
        .await
        .expect_err("header contract must fail");

    assert!(matches!(
        err,
        GatewayError::HeaderContractViolation {
            header: "Strict-Transport-Security",
            status: 404,
            ..
        }
    ));
}

#[tokio::test]
async fn declared_not_found_is_expected_failure() {
    let server = spawn_server(vec![MockResponse::fabric_error(
        StatusCode::NOT_FOUND,
        codes::NAME_DOES_NOT_EXIST,
    )])
    .await;

    let outcome = server
        .client()
        .execute(
            &operations::name_exists("fabric:/missing")
                .expect("must build")
                .expect_status(StatusCode::NOT_FOUND),
        )
        .await
        .expect("expected failure must not be an error");

    match outcome {
        Outcome::ExpectedFailure(response) => {
            assert_eq!(response.description, codes::NAME_DOES_NOT_EXIST);
            assert_eq!(response.attempts, 1);
        }
        other => panic!("expected failure outcome, got {other:?}"),
    }
    assert_eq!(
        server.recorded()[0].path_and_query,
        "/Names/missing?api-version=4.0"
    );
}

#[tokio::test]
async fn retried_create_tolerates_already_exists() {
    let server = spawn_server(vec![
        MockResponse::empty(StatusCode::SERVICE_UNAVAILABLE),
        MockResponse::fabric_error(StatusCode::CONFLICT, codes::APPLICATION_ALREADY_EXISTS),
    ])
    .await;

    let outcome = server
        .client()
        .execute(
            &operations::create_application("fabric:/app", "AppType", "1.0", &[])
                .expect("must build"),
        )
        .await
        .expect("tolerated code must succeed");

    assert!(outcome.is_success());
    assert!(outcome.response().completed_on_retry);

    let recorded = server.recorded();
    assert_eq!(recorded.len(), 2);
    assert_eq!(recorded[1].method, Method::POST);
    assert_eq!(
        recorded[1].content_type.as_deref(),
        Some("application/json; charset=utf-8")
    );
    let sent: JsonValue = serde_json::from_str(&recorded[1].body).expect("body must be JSON");
    assert_eq!(sent["Name"], "fabric:/app");
    assert_eq!(sent["TypeVersion"], "1.0");
}

#[tokio::test]
async fn already_exists_without_retry_is_fatal() {
    let server = spawn_server(vec![MockResponse::fabric_error(
        StatusCode::CONFLICT,
        codes::APPLICATION_ALREADY_EXISTS,
    )])
    .await;

    let err = server
        .client()
        .execute(
            &operations::create_application("fabric:/app", "AppType", "1.0", &[])
                .expect("must build"),
        )
        .await
        .expect_err("first-attempt conflict must fail");

    match err {
        GatewayError::Http {
            status,
            description,
            body,
            ..
        } => {
            assert_eq!(status, 409);
            assert_eq!(description, codes::APPLICATION_ALREADY_EXISTS);
            assert!(body.contains("mock"));
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn negotiate_challenge_escalates_to_default_credentials() {
    let server = spawn_server(vec![
        MockResponse::empty(StatusCode::UNAUTHORIZED)
            .with_header(header::WWW_AUTHENTICATE, "Negotiate"),
        MockResponse::json(StatusCode::OK, json!([])),
    ])
    .await;
    let client = server
        .client()
        .with_bearer("abc")
        .with_credential_store(Arc::new(
            PemDirectoryStore::new(std::env::temp_dir()).with_negotiate_token("kerberos-ticket"),
        ));

    let outcome = client
        .execute(&operations::get_nodes())
        .await
        .expect("escalated attempt must succeed");

    assert!(outcome
        .response()
        .trace
        .contains(&DispatchState::EscalatingToDefaultCredentials));
    let recorded = server.recorded();
    assert_eq!(recorded[0].authorization.as_deref(), Some("Bearer abc"));
    assert_eq!(
        recorded[1].authorization.as_deref(),
        Some("Negotiate kerberos-ticket")
    );
}

fn settings_for(server: &TestServer, negotiate_token: Option<&str>) -> GatewaySettings {
    GatewaySettings {
        endpoints: vec![server.base_url.clone()],
        negotiate_token: negotiate_token.map(str::to_owned),
        hsts_header: HSTS.to_owned(),
        options: fast_options(),
        ..GatewaySettings::default()
    }
}

#[tokio::test]
async fn settings_negotiate_token_answers_challenge() {
    let server = spawn_server(vec![
        MockResponse::empty(StatusCode::UNAUTHORIZED)
            .with_header(header::WWW_AUTHENTICATE, "Negotiate"),
        MockResponse::json(StatusCode::OK, json!([])),
    ])
    .await;
    let client = GatewayClient::from_settings(settings_for(&server, Some("settings-ticket")))
        .expect("client must build");

    let outcome = client
        .execute(&operations::get_nodes())
        .await
        .expect("escalated attempt must succeed");

    assert!(outcome.is_success());
    assert_eq!(outcome.response().attempts, 2);
    let recorded = server.recorded();
    assert_eq!(recorded[0].authorization, None);
    assert_eq!(
        recorded[1].authorization.as_deref(),
        Some("Negotiate settings-ticket")
    );
}

#[tokio::test]
async fn settings_without_negotiate_token_fail_on_challenge() {
    let server = spawn_server(vec![MockResponse::empty(StatusCode::UNAUTHORIZED)
        .with_header(header::WWW_AUTHENTICATE, "Negotiate")])
    .await;
    let client =
        GatewayClient::from_settings(settings_for(&server, None)).expect("client must build");

    let err = client
        .execute(&operations::get_nodes())
        .await
        .expect_err("must fail");

    assert!(matches!(err, GatewayError::Credential { .. }), "{err:?}");
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn unsupported_challenge_is_fatal() {
    let server = spawn_server(vec![MockResponse::empty(StatusCode::UNAUTHORIZED)
        .with_header(header::WWW_AUTHENTICATE, "Basic realm=\"gateway\"")])
    .await;

    let err = server
        .client()
        .execute(&operations::get_nodes())
        .await
        .expect_err("must fail");

    assert!(matches!(err, GatewayError::UnsupportedChallenge { status: 401, .. }));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn forbidden_without_certificate_is_fatal() {
    let server = spawn_server(vec![MockResponse::empty(StatusCode::FORBIDDEN)]).await;

    let err = server
        .client()
        .execute(&operations::get_cluster_manifest())
        .await
        .expect_err("must fail");

    assert_eq!(err.status(), Some(403));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn collect_pages_follows_continuation_token() {
    let server = spawn_server(vec![
        MockResponse::json(
            StatusCode::OK,
            json!({"ContinuationToken": "app2", "Items": [{"Name": "fabric:/app1"}]}),
        ),
        MockResponse::json(
            StatusCode::OK,
            json!({"ContinuationToken": "", "Items": [{"Name": "fabric:/app2"}]}),
        ),
    ])
    .await;

    let apps: Vec<Node> = server
        .client()
        .collect_pages(&operations::get_applications("2.0"))
        .await
        .expect("paging must succeed");

    assert_eq!(apps.len(), 2);
    assert_eq!(apps[1].name, "fabric:/app2");

    let recorded = server.recorded();
    assert_eq!(recorded[0].path_and_query, "/Applications?api-version=2.0");
    assert_eq!(
        recorded[1].path_and_query,
        "/Applications?api-version=2.0&ContinuationToken=app2"
    );
}

#[tokio::test]
async fn execute_with_overrides_operation_body() {
    let server = spawn_server(vec![MockResponse::empty(StatusCode::OK)]).await;

    server
        .client()
        .execute_with(
            &operations::report_cluster_health(json!({})),
            &json!({"SourceId": "test", "Property": "p", "HealthState": "Ok"}),
        )
        .await
        .expect("report must succeed");

    let recorded = server.recorded();
    assert_eq!(
        recorded[0].path_and_query,
        "/$/ReportClusterHealth?api-version=3.0"
    );
    assert!(recorded[0].body.contains("\"SourceId\":\"test\""));
}
