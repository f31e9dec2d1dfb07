//! Throwaway local HTTP endpoint that records what channels send.

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::Router;
use ict_core::Payload;

use crate::traits::Alert;

pub(crate) const SAMPLE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../testdata/sample_payload.json"
));

pub(crate) fn sample_alert(analysis: &str) -> Alert {
    Alert::new(
        Payload::from_json(SAMPLE).unwrap(),
        analysis.to_string(),
        None,
    )
}

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub path: String,
    pub content_type: String,
    pub body: String,
}

#[derive(Clone)]
struct FakeState {
    requests: Arc<Mutex<Vec<Recorded>>>,
    respond: fn(&str) -> (u16, &'static str),
}

pub(crate) struct FakeEndpoint {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeEndpoint {
    /// Start a server answering every request with `respond(path)`.
    pub async fn start(respond: fn(&str) -> (u16, &'static str)) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState { requests: requests.clone(), respond };
        let app = Router::new().fallback(record).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url: format!("http://{addr}"), requests }
    }

    /// Always 200 with a Telegram-style `{"ok":true}` body.
    pub async fn ok() -> Self {
        Self::start(|_| (200, r#"{"ok":true}"#)).await
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn record(
    State(state): State<FakeState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let path = uri.path().to_string();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let (status, reply) = (state.respond)(&path);
    state.requests.lock().unwrap().push(Recorded {
        path,
        content_type,
        body: String::from_utf8_lossy(&body).into_owned(),
    });
    (StatusCode::from_u16(status).unwrap(), reply)
}

/// Pull the `payload_json` part out of a recorded multipart body.
pub(crate) fn multipart_json(body: &str) -> serde_json::Value {
    let text = multipart_text(body, "payload_json").expect("payload_json part");
    serde_json::from_str(&text).unwrap()
}

/// Text content of a named multipart field.
pub(crate) fn multipart_text(body: &str, field: &str) -> Option<String> {
    let marker = format!("name=\"{field}\"");
    let start = body.find(&marker)?;
    let rest = &body[start + marker.len()..];
    let value_start = rest.find("\r\n\r\n")? + 4;
    let rest = &rest[value_start..];
    let value_end = rest.find("\r\n--")?;
    Some(rest[..value_end].to_string())
}
