//! Throwaway Awair device for client and poller tests.

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum StubResponse {
    Body { status: u16, body: String },
    /// Never answers within any sane client timeout.
    Hang,
}

impl StubResponse {
    pub fn json(body: &str) -> Self {
        StubResponse::Body {
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        StubResponse::Body {
            status,
            body: body.to_string(),
        }
    }
}

pub struct DeviceStub {
    pub url: String,
    response: Arc<Mutex<StubResponse>>,
}

impl DeviceStub {
    pub async fn start(initial: StubResponse) -> Self {
        let response = Arc::new(Mutex::new(initial));
        let app = Router::new()
            .route("/air-data/latest", get(air_data))
            .with_state(Arc::clone(&response));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/air-data/latest"),
            response,
        }
    }

    pub fn respond_with(&self, next: StubResponse) {
        *self.response.lock().unwrap() = next;
    }
}

async fn air_data(State(response): State<Arc<Mutex<StubResponse>>>) -> Response {
    let current = response.lock().unwrap().clone();
    match current {
        StubResponse::Body { status, body } => (
            StatusCode::from_u16(status).unwrap(),
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        StubResponse::Hang => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}

/// A URL nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/air-data/latest")
}
