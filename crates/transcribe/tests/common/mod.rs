use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use url::Url;

pub const TOKEN: &str = "test-token";
pub const API_KEY: &str = "test-key";

/// Everything the mock apis received
#[derive(Debug, Default)]
pub struct Seen {
    /// (bucket, object, size)
    pub uploads: Mutex<Vec<(String, String, usize)>>,
    pub deletes: Mutex<Vec<(String, String)>>,
    pub recognize: Mutex<Option<Value>>,
    pub polls: AtomicUsize,
}

impl Seen {
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

pub struct MockApis {
    pub url: Url,
    pub seen: Arc<Seen>,
    _server: JoinHandle<Result<(), std::io::Error>>,
}

fn authorized(headers: &HeaderMap, secret: &str) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {secret}"))
}

async fn whisper(headers: HeaderMap, mut multipart: Multipart) -> Response {
    if !authorized(&headers, API_KEY) {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }

    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_owned();
        let value = match field.file_name().map(str::to_owned) {
            Some(file_name) => file_name,
            None => field.text().await.unwrap(),
        };
        fields.push(format!("{name}={value}"));
    }
    Json(json!({ "text": fields.join(" ") })).into_response()
}

#[derive(serde::Deserialize)]
struct UploadQuery {
    #[serde(rename = "uploadType")]
    upload_type: String,
    name: String,
}

async fn upload(
    State(seen): State<Arc<Seen>>,
    Path(bucket): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    if !authorized(&headers, TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    assert_eq!(query.upload_type, "media");
    seen.uploads
        .lock()
        .unwrap()
        .push((bucket, query.name.clone(), body.len()));
    Json(json!({ "name": query.name })).into_response()
}

async fn remove(
    State(seen): State<Arc<Seen>>,
    Path((bucket, object)): Path<(String, String)>,
) -> StatusCode {
    seen.deletes.lock().unwrap().push((bucket, object));
    StatusCode::NO_CONTENT
}

async fn speech(
    State(seen): State<Arc<Seen>>,
    Path(action): Path<String>,
    Json(request): Json<Value>,
) -> Response {
    if action != "speech:longrunningrecognize" {
        return StatusCode::NOT_FOUND.into_response();
    }
    let name = if request["config"]["languageCode"] == "xx-FAIL" {
        "failing"
    } else {
        "42"
    };
    *seen.recognize.lock().unwrap() = Some(request);
    Json(json!({ "name": name })).into_response()
}

async fn operation(State(seen): State<Arc<Seen>>, Path(name): Path<String>) -> Json<Value> {
    let poll = seen.polls.fetch_add(1, Ordering::SeqCst);
    if name == "failing" {
        return Json(json!({
            "name": name,
            "done": true,
            "error": { "code": 3, "message": "bad language" },
        }));
    }
    if poll == 0 {
        return Json(json!({ "name": name }));
    }
    Json(json!({
        "name": name,
        "done": true,
        "response": {
            "results": [
                { "alternatives": [{ "transcript": "Hello and welcome." }] },
                { "alternatives": [{ "transcript": " Goodbye." }] },
            ]
        },
    }))
}

pub async fn mock_apis() -> MockApis {
    let seen = Arc::new(Seen::default());
    let app = Router::new()
        .route("/v1/audio/transcriptions", post(whisper))
        .route("/upload/storage/v1/b/:bucket/o", post(upload))
        .route("/storage/v1/b/:bucket/o/:object", delete(remove))
        .route("/v1/:action", post(speech))
        .route("/v1/operations/:name", get(operation))
        .with_state(Arc::clone(&seen));

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = axum::serve(listener, app.layer(TraceLayer::new_for_http()));
    let server = tokio::task::spawn(async move { server.await });

    MockApis {
        url: Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap(),
        seen,
        _server: server,
    }
}

/// A short silent 16 bit pcm wav file
pub fn wav(sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample = 16u16;
    let block_align = channels * bits_per_sample / 8;
    let byte_rate = sample_rate * u32::from(block_align);
    let data = vec![0u8; usize::from(block_align) * 100];

    let mut wav = Vec::new();
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes());
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data.len() as u32).to_le_bytes());
    wav.extend_from_slice(&data);
    wav
}

pub fn setup_tracing() {
    use tracing_subscriber::filter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter::EnvFilter::builder().parse("transcribe=debug,info").unwrap());

    let _ignore_err = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer())
        .try_init();
}
