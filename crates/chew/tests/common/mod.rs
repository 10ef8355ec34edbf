use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use url::Url;

pub const ROBOTS: &str = "User-agent: *\nDisallow: /private\n";

pub const PAGE: &str = r#"<html><body>
<nav><ul><li>Home</li></ul></nav>
<h1>Welcome</h1>
<p>First paragraph.</p>
<footer><p>Copyright</p></footer>
</body></html>"#;

pub const NOTES: &str = "# Notes\n\nSome **important** text.";

/// How the server answers `/robots.txt`
#[derive(Debug, Clone, Copy)]
pub enum RobotsTxt {
    Text(&'static str),
    Status(StatusCode),
    /// answers with [`ROBOTS`] only after this long
    Slow(Duration),
}

/// Requests the server saw, per route
#[derive(Debug, Default)]
pub struct Hits {
    pub robots: AtomicUsize,
    pub flaky: AtomicUsize,
    pub page: AtomicUsize,
}

impl Hits {
    pub fn robots(&self) -> usize {
        self.robots.load(Ordering::SeqCst)
    }
    pub fn flaky(&self) -> usize {
        self.flaky.load(Ordering::SeqCst)
    }
    pub fn page(&self) -> usize {
        self.page.load(Ordering::SeqCst)
    }
}

/// Requests to `/flaky` that fail before it starts answering
pub const FLAKY_FAILURES: usize = 2;

pub struct TestServer {
    pub url: Url,
    pub hits: Arc<Hits>,
    _server: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        self.url.join(path).unwrap().to_string()
    }
}

#[derive(Clone)]
struct ServerState {
    hits: Arc<Hits>,
    robots: RobotsTxt,
}

async fn robots(State(state): State<ServerState>) -> axum::response::Response {
    state.hits.robots.fetch_add(1, Ordering::SeqCst);
    let text = match state.robots {
        RobotsTxt::Text(text) => text,
        RobotsTxt::Status(status) => return status.into_response(),
        RobotsTxt::Slow(delay) => {
            tokio::time::sleep(delay).await;
            ROBOTS
        }
    };
    ([(header::CONTENT_TYPE, "text/plain")], text).into_response()
}

async fn page(State(state): State<ServerState>) -> impl IntoResponse {
    state.hits.page.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], PAGE)
}

async fn flaky(State(state): State<ServerState>) -> axum::response::Response {
    let seen = state.hits.flaky.fetch_add(1, Ordering::SeqCst);
    if seen < FLAKY_FAILURES {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ([(header::CONTENT_TYPE, "text/plain")], "finally").into_response()
}

pub async fn server() -> TestServer {
    server_with(RobotsTxt::Text(ROBOTS)).await
}

pub async fn server_with(robots_txt: RobotsTxt) -> TestServer {
    let hits = Arc::new(Hits::default());
    let app = Router::new()
        .route("/robots.txt", get(robots))
        .route("/page.html", get(page))
        .route(
            "/notes.md",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], NOTES) }),
        )
        .route(
            "/page.md",
            get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<p>snake_case_name</p>") }),
        )
        .route(
            "/table.csv",
            get(|| async { ([(header::CONTENT_TYPE, "text/csv")], "a,b\n1,2\n") }),
        )
        .route(
            "/data",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], r#"{"b":1,"a":2}"#) }),
        )
        .route(
            "/private/secret.html",
            get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<p>secret</p>") }),
        )
        .route(
            "/logo.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![0x89u8, b'P', b'N', b'G']) }),
        )
        .route(
            "/broken.json",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], "{not json") }),
        )
        .route("/flaky", get(flaky))
        .with_state(ServerState {
            hits: Arc::clone(&hits),
            robots: robots_txt,
        });

    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = axum::serve(listener, app.layer(TraceLayer::new_for_http()));
    let server = tokio::task::spawn(async move { server.await });

    let url = Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
    tracing::debug!("testserver listening on {url}");
    TestServer {
        url,
        hits,
        _server: server,
    }
}

pub fn setup_tracing() {
    use tracing_subscriber::filter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter::EnvFilter::builder().parse("chew=debug,info").unwrap());

    let fmt = fmt::layer().with_test_writer().with_line_number(true);

    let _ignore_err = tracing_subscriber::registry()
        .with(filter)
        .with(fmt)
        .try_init();
}
