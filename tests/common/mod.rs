#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;

/// Maps a request path to a status and body. For 3xx statuses a body starting
/// with `/` is sent as the `Location` header instead.
pub type Route = fn(&str) -> (StatusCode, &'static str);

/// One request as the target saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Clone)]
struct Target {
    requests: Arc<Mutex<Vec<Recorded>>>,
    route: Route,
}

/// In-process HTTP target answering every path through `route`.
pub struct TestTarget {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl TestTarget {
    pub async fn spawn(route: Route) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = Target {
            requests: requests.clone(),
            route,
        };
        let app = Router::new().fallback(serve).with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Requested paths, sorted.
    pub fn hits(&self) -> Vec<String> {
        let mut hits: Vec<String> = self.requests().into_iter().map(|r| r.path).collect();
        hits.sort();
        hits
    }

    /// Every request in arrival order.
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve(
    State(target): State<Target>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = uri.path().to_string();
    target.requests.lock().unwrap().push(Recorded {
        method,
        path: path.clone(),
        headers,
        body,
    });
    let (status, text) = (target.route)(&path);
    if status.is_redirection() && text.starts_with('/') {
        (status, [(LOCATION, text)], "").into_response()
    } else {
        (status, text).into_response()
    }
}

pub fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
