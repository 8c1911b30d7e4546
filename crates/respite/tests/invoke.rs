//! End-to-end tests of `RespiteClient::invoke` against in-memory ports.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use respite::{
    md5_hex, Args, Brand, ClientConfig, ConfigStore, FixedClock, HttpRequest, HttpResponse,
    Md5Placement, MetaContext, MetaSource, Namespace, Pass, RequestPath, RespiteClient,
    RespiteError, Response, ServiceEntry, ServiceName, Signer, StaticConfigStore, Transport,
    TransportError, AUTH_HEADER, BODY_AUTH_KEY, DIAGNOSTICS_TARGET, META_CALLER,
};
use serde_json::{json, Value};

const PASS: &str = "jdDU&9dk1S";
const TIMESTAMP: i64 = 1_368_823_114;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
    reply: Result<HttpResponse, TransportError>,
}

impl RecordingTransport {
    fn replying(status: u16, body: Value) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Ok(HttpResponse {
                status,
                body: serde_json::to_vec(&body).unwrap(),
            }),
        })
    }

    fn failing(err: TransportError) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Err(err),
        })
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn last(&self) -> HttpRequest {
        self.requests().pop().expect("no request was sent")
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone()
    }
}

struct CountingStore {
    inner: StaticConfigStore,
    lookups: AtomicUsize,
}

impl ConfigStore for CountingStore {
    fn service(&self, key: &str) -> Option<ServiceEntry> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.service(key)
    }

    fn brand(&self) -> Option<Brand> {
        self.inner.brand()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn store() -> StaticConfigStore {
    StaticConfigStore::new()
        .with_service(
            "service_name_service",
            ServiceEntry {
                host: Some("rpc.example.test".into()),
                ..Default::default()
            },
        )
        .with_brand(Brand::new("company_brand").unwrap())
}

fn config() -> ClientConfig {
    ClientConfig::new(ServiceName::new("service_name").unwrap()).with_diagnostics(false)
}

fn client(config: ClientConfig, transport: Arc<RecordingTransport>) -> RespiteClient {
    RespiteClient::new(config, Arc::new(store()), transport)
        .with_clock(Arc::new(FixedClock(TIMESTAMP)))
        .with_meta_context(MetaContext {
            remote_ip: Some("cmdline".into()),
            remote_user: Some("paul".into()),
        })
}

fn body_of(request: &HttpRequest) -> Args {
    serde_json::from_slice(&request.body).unwrap()
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` under an `info`-level fmt subscriber and returns what it logged.
fn captured_logs(f: impl FnOnce()) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    buffer.contents()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_invoke_posts_to_resolved_url_with_meta() {
    let transport = RecordingTransport::replying(200, json!({"greeting": "hi"}));
    let client = client(config(), transport.clone());

    let response = client.invoke_json("hello", json!({"name": "world"})).unwrap();
    assert_eq!(response.get("greeting"), Some(&json!("hi")));

    let request = transport.last();
    assert_eq!(request.url, "https://rpc.example.test:443/service_name/hello/company_brand");
    assert_eq!(request.header("Content-Type"), Some("x-application/json"));
    assert_eq!(request.header(AUTH_HEADER), None);

    let body = body_of(&request);
    assert_eq!(body["name"], "world");
    assert_eq!(body["_i"], "cmdline");
    assert_eq!(body["_w"], "paul");
    assert!(body.contains_key(META_CALLER));
}

#[test]
fn test_caller_trace_points_at_call_site() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(config(), transport.clone());

    client.invoke("hello", Args::new()).unwrap();

    let body = body_of(&transport.last());
    let trace = body[META_CALLER].as_str().unwrap();
    assert!(trace.contains("invoke.rs"), "trace was {trace}");
    assert!(trace.ends_with("; hello"), "trace was {trace}");
}

#[test]
fn test_namespace_prefixes_wire_method() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(
        config().with_namespace(Namespace::new("test").unwrap()),
        transport.clone(),
    );

    client.invoke("something", Args::new()).unwrap();
    assert!(transport.last().url.ends_with("/service_name/test_something/company_brand"));
}

#[test]
fn test_any_method_name_is_dispatched() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(config(), transport.clone());

    for method in ["hello", "methods", "does_not_exist_anywhere"] {
        client.invoke(method, Args::new()).unwrap();
    }
    assert_eq!(transport.requests().len(), 3);
}

#[test]
fn test_trace_disabled_never_sends_caller() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(config().with_trace(false), transport.clone());

    client.invoke_json("a", json!({"x": 1})).unwrap();
    client.invoke_json("b", json!({"_c": "explicit"})).unwrap();

    for request in transport.requests() {
        assert!(!body_of(&request).contains_key(META_CALLER));
    }
}

#[test]
fn test_standard_signing_covers_transmitted_bytes() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(config().with_pass(Pass::new(PASS)), transport.clone());

    client.invoke_json("hello", json!({"b": 2, "a": 1})).unwrap();

    let request = transport.last();
    let path = RequestPath {
        path: "service_name".into(),
        method: respite::MethodName::qualify(None, "hello"),
        brand: Brand::new("company_brand"),
    };
    let expected = Signer::sign(&request.body, &path, &Pass::new(PASS), TIMESTAMP);
    let header = request.header(AUTH_HEADER).unwrap();
    assert_eq!(header, expected.header_value());
    assert!(header.ends_with(":1368823114"));
}

#[test]
fn test_signing_disabled_sends_no_auth() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(
        config().with_pass(Pass::new(PASS)).with_signing(false),
        transport.clone(),
    );

    client.invoke("hello", Args::new()).unwrap();

    let request = transport.last();
    assert_eq!(request.header(AUTH_HEADER), None);
    assert!(!body_of(&request).contains_key(BODY_AUTH_KEY));
}

#[test]
fn test_md5_pass_in_header() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(
        config().with_pass(Pass::new(PASS)).with_md5_pass(Md5Placement::Header),
        transport.clone(),
    );

    client.invoke("hello", Args::new()).unwrap();
    assert_eq!(
        transport.last().header(AUTH_HEADER),
        Some("b39fc4d2b6ffb1a3cbe50598f14a9dbe")
    );
}

#[test]
fn test_md5_pass_in_body() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(
        config().with_pass(Pass::new(PASS)).with_md5_pass(Md5Placement::Body),
        transport.clone(),
    );

    client.invoke("hello", Args::new()).unwrap();

    let request = transport.last();
    assert_eq!(request.header(AUTH_HEADER), None);
    assert_eq!(body_of(&request)[BODY_AUTH_KEY], md5_hex(PASS));
}

#[test]
fn test_signing_without_pass_fails_before_sending() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(config().with_signing(true), transport.clone());

    let err = client.invoke("hello", Args::new()).unwrap_err();
    assert!(matches!(err, RespiteError::Signing(_)));
    assert!(transport.requests().is_empty());
}

#[test]
fn test_unknown_service_fails_before_sending() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(
        ClientConfig::new(ServiceName::new("unknown").unwrap()).with_diagnostics(false),
        transport.clone(),
    );

    let err = client.invoke("hello", Args::new()).unwrap_err();
    assert!(matches!(err, RespiteError::ConfigNotFound { .. }));
    assert!(transport.requests().is_empty());
}

#[test]
fn test_transport_failure_is_terminal_and_not_retried() {
    let transport = RecordingTransport::failing(TransportError::Connect {
        url: "https://rpc.example.test:443/".into(),
        message: "connection refused".into(),
    });
    let client = client(config(), transport.clone());

    let err = client.invoke("hello", Args::new()).unwrap_err();
    assert!(matches!(err, RespiteError::Transport(TransportError::Connect { .. })));
    assert_eq!(transport.requests().len(), 1);
}

#[test]
fn test_http_and_application_errors_share_one_shape() {
    let http = RecordingTransport::replying(500, json!({"detail": "boom"}));
    let response = client(config(), http).invoke("hello", Args::new()).unwrap();
    assert!(response.is_error());

    let app = RecordingTransport::replying(200, json!({"error": "No such method"}));
    let response = client(config(), app).invoke("hello", Args::new()).unwrap();
    assert!(response.is_error());
    assert_eq!(
        response.as_reply().and_then(|reply| reply.error_message()),
        Some("No such method".to_string())
    );
}

#[test]
fn test_flat_mode_returns_decoded_map() {
    let body = json!({"a": 1, "b": [true]});
    let transport = RecordingTransport::replying(200, body.clone());
    let response = client(config().with_flat(true), transport)
        .invoke("hello", Args::new())
        .unwrap();

    match response {
        Response::Flat(map) => assert_eq!(Value::Object(map), body),
        other => panic!("expected flat response, got {other:?}"),
    }
}

#[test]
fn test_fixed_and_suppressed_meta() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(
        config()
            .with_remote_ip(MetaSource::Suppressed)
            .with_remote_user(MetaSource::Fixed("batch".into()))
            .with_admin_token(MetaSource::Fixed("admin-token".into())),
        transport.clone(),
    );

    client.invoke("hello", Args::new()).unwrap();

    let body = body_of(&transport.last());
    assert!(!body.contains_key("_i"));
    assert_eq!(body["_w"], "batch");
    assert_eq!(body["_t"], "admin-token");
}

#[test]
fn test_connection_is_resolved_once() {
    let store = Arc::new(CountingStore {
        inner: store(),
        lookups: AtomicUsize::new(0),
    });
    let transport = RecordingTransport::replying(200, json!({}));
    let client = RespiteClient::new(config(), store.clone(), transport)
        .with_clock(Arc::new(FixedClock(TIMESTAMP)));

    client.invoke("one", Args::new()).unwrap();
    let after_first = store.lookups.load(Ordering::SeqCst);
    client.invoke("two", Args::new()).unwrap();

    assert_eq!(after_first, 1);
    assert_eq!(store.lookups.load(Ordering::SeqCst), after_first);
}

#[test]
fn test_invoke_json_rejects_non_object() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(config(), transport.clone());

    let err = client.invoke_json("hello", json!("not an object")).unwrap_err();
    assert!(matches!(err, RespiteError::InvalidArguments { .. }));
    assert!(transport.requests().is_empty());
}

#[test]
fn test_diagnostics_do_not_alter_request() {
    let quiet = RecordingTransport::replying(200, json!({}));
    let loud = RecordingTransport::replying(200, json!({}));
    let base = config().with_pass(Pass::new(PASS)).with_trace(false);

    client(base.clone().with_diagnostics(false), quiet.clone())
        .invoke_json("hello", json!({"id": 1}))
        .unwrap();
    client(base.with_diagnostics(true), loud.clone())
        .invoke_json("hello", json!({"id": 1}))
        .unwrap();

    assert_eq!(quiet.last(), loud.last());
}

#[test]
fn test_diagnostics_log_url_and_headers() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(
        config().with_pass(Pass::new(PASS)).with_diagnostics(true),
        transport.clone(),
    );

    let logs = captured_logs(|| {
        client.invoke_json("hello", json!({"id": 1})).unwrap();
    });

    let auth = transport.last().header(AUTH_HEADER).unwrap().to_string();
    assert!(logs.contains(DIAGNOSTICS_TARGET), "logs: {logs}");
    assert!(logs.contains("https://rpc.example.test:443/service_name/hello/company_brand"));
    assert!(logs.contains(AUTH_HEADER), "logs: {logs}");
    assert!(logs.contains(&auth), "logs: {logs}");
}

#[test]
fn test_no_wire_log_when_diagnostics_off() {
    let transport = RecordingTransport::replying(200, json!({}));
    let client = client(config().with_pass(Pass::new(PASS)), transport.clone());

    let logs = captured_logs(|| {
        client.invoke_json("hello", json!({"id": 1})).unwrap();
    });

    assert_eq!(transport.requests().len(), 1);
    assert!(!logs.contains(DIAGNOSTICS_TARGET), "logs: {logs}");
    assert!(!logs.contains("rpc.example.test"), "logs: {logs}");
    assert!(!logs.contains(AUTH_HEADER), "logs: {logs}");
}
