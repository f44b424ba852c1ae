// Shared fakes for the host seams: a scripted HTTP transport and a counting token provider.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use racedata::auth::{HostSession, HttpRequest, HttpResponse, HttpTransport, Method, TokenProvider};
use racedata::config::Environment;
use racedata::errors::{DataError, Result};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const BASE_URL: &str = "https://racing-test.crm6.dynamics.com";
pub const API_ROOT: &str = "https://racing-test.crm6.dynamics.com/api/data/v9.2";

/// Records every request. Answers from the scripted queue first, then from the first route
/// whose fragment occurs in the URL, then with a Dataverse-style 404.
#[derive(Default)]
pub struct MockTransport {
    requests: Mutex<Vec<HttpRequest>>,
    scripted: Mutex<VecDeque<HttpResponse>>,
    routes: Mutex<Vec<(String, HttpResponse)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: HttpResponse) {
        self.scripted.lock().push_back(response);
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push(HttpResponse::new(status, body.to_string()));
    }

    pub fn route(&self, fragment: &str, response: HttpResponse) {
        self.routes.lock().push((fragment.to_string(), response));
    }

    pub fn route_json(&self, fragment: &str, body: Value) {
        self.route(fragment, HttpResponse::new(200, body.to_string()));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn count_method(&self, method: Method) -> usize {
        self.requests.lock().iter().filter(|r| r.method == method).count()
    }

    pub fn last(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        self.requests.lock().push(request);
        if let Some(scripted) = self.scripted.lock().pop_front() {
            return Ok(scripted);
        }
        let routed = self
            .routes
            .lock()
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, r)| r.clone());
        Ok(routed.unwrap_or_else(|| {
            HttpResponse::new(404, r#"{"error":{"code":"0x80040217","message":"Entity does not exist"}}"#)
                .with_status_text("Not Found")
        }))
    }
}

/// Hands out `token-1`, `token-2`, ... and counts calls.
#[derive(Default)]
pub struct CountingTokenProvider {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl CountingTokenProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TokenProvider for CountingTokenProvider {
    async fn get_token(&self, resource: &str) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(DataError::Network(format!("token endpoint unreachable for {resource}")));
        }
        Ok(format!("token-{n}"))
    }
}

pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub provider: Arc<CountingTokenProvider>,
    pub session: HostSession,
    pub env: Environment,
}

/// Fresh session plus an environment with fast retries and no effective rate limit.
pub fn harness(env_name: &str) -> Harness {
    let transport = MockTransport::new();
    let provider = CountingTokenProvider::new();
    let session = HostSession::new(provider.clone(), transport.clone());
    let env = Environment {
        requests_per_second: 1000.0,
        burst_capacity: 0.0,
        cooldown_ms: 0,
        retry_attempts: 2,
        retry_delay_ms: 10,
        ..Environment::new(env_name, BASE_URL)
    };
    Harness { transport, provider, session, env }
}
