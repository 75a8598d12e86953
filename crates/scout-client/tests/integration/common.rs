use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

pub const TEST_API_KEY: &str = "gc_test_key";

/// One request the fake service received.
#[derive(Debug, Clone)]
pub struct Received {
    pub path: String,
    pub api_key: Option<String>,
    pub body: Value,
}

/// Stand-in for the remote scout service.
#[derive(Clone)]
pub struct FakeHq {
    pub base_url: Url,
    received: Arc<Mutex<Vec<Received>>>,
    ingest_status: Arc<Mutex<StatusCode>>,
}

impl FakeHq {
    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    pub fn received_on(&self, path: &str) -> Vec<Received> {
        self.received()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Force every authenticated ingest call to answer with `status`.
    pub fn fail_ingest_with(&self, status: StatusCode) {
        *self.ingest_status.lock().unwrap() = status;
    }

    /// Wait until `count` requests have arrived on `path`.
    pub async fn wait_for(&self, path: &str, count: usize) -> Vec<Received> {
        for _ in 0..100 {
            let seen = self.received_on(path);
            if seen.len() >= count {
                return seen;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {count} request(s) on {path}");
    }
}

/// Serve one connection that answers with `status_line` and a body cut off
/// well short of its declared `Content-Length`.
pub async fn start_truncating_server(status_line: &'static str) -> anyhow::Result<Url> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        read_request(&mut socket).await;
        let response = format!(
            "{status_line}\r\nContent-Type: application/json\r\n\
             Content-Length: 100\r\n\r\n{{\"detail\":"
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    Ok(Url::parse(&format!("http://{addr}"))?)
}

/// Read one request, headers and body, off `socket`.
async fn read_request(socket: &mut TcpStream) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        request.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&request);
        let Some(end) = text.find("\r\n\r\n") else {
            continue;
        };
        let content_length = text[..end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if request.len() >= end + 4 + content_length {
            return;
        }
    }
}

/// Start the fake service on an ephemeral port.
pub async fn start_fake_hq() -> anyhow::Result<FakeHq> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;

    let hq = FakeHq {
        base_url: Url::parse(&format!("http://{addr}"))?,
        received: Arc::new(Mutex::new(Vec::new())),
        ingest_status: Arc::new(Mutex::new(StatusCode::OK)),
    };

    let app = Router::new()
        .route("/api/ingest/loads", post(ingest))
        .route("/api/scout/heartbeat", post(heartbeat))
        .with_state(hq.clone());

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(hq)
}

fn record(hq: &FakeHq, uri: &Uri, headers: &HeaderMap, body: &Value) -> bool {
    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let authorized = api_key.as_deref() == Some(TEST_API_KEY);
    hq.received.lock().unwrap().push(Received {
        path: uri.path().to_string(),
        api_key,
        body: body.clone(),
    });
    authorized
}

async fn ingest(
    State(hq): State<FakeHq>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !record(&hq, &uri, &headers, &body) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid API key"})),
        );
    }

    let status = *hq.ingest_status.lock().unwrap();
    if !status.is_success() {
        return (status, Json(json!({"detail": "ingest unavailable"})));
    }

    let loads = body.as_array().cloned().unwrap_or_default();
    let hot = loads
        .iter()
        .filter_map(|l| l["price"].as_str())
        .filter(|p| {
            let digits: String = p.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse::<u64>().unwrap_or(0) >= 2000
        })
        .count();

    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "new_loads": loads.len(),
            "updated_loads": 0,
            "hot": hot,
        })),
    )
}

async fn heartbeat(
    State(hq): State<FakeHq>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    if record(&hq, &uri, &headers, &body) {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}
