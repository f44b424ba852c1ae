use super::session::{HostSession, TokenProvider};
use super::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::config::Environment;
use crate::errors::{DataError, Result};
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Tokens are refreshed once they are this close to expiring.
pub const REFRESH_BUFFER: Duration = Duration::from_secs(5 * 60);
/// Assumed lifetime of a token handed out by the provider.
pub const TOKEN_VALIDITY: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Debug)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: Instant,
}

impl CachedToken {
    fn usable_at(&self, now: Instant) -> bool {
        now + REFRESH_BUFFER < self.expires_at
    }
}

/// Per-call request shape for [`AuthService::make_authenticated_request`].
#[derive(Clone, Debug, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self { method: Method::Get, body: None, headers: Vec::new() }
    }

    pub fn post(body: Value) -> Self {
        Self { method: Method::Post, body: Some(body), headers: Vec::new() }
    }

    pub fn patch(body: Value) -> Self {
        Self { method: Method::Patch, body: Some(body), headers: Vec::new() }
    }

    pub fn delete() -> Self {
        Self { method: Method::Delete, body: None, headers: Vec::new() }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

type RegistryKey = (Uuid, String);

static REGISTRY: LazyLock<Mutex<HashMap<RegistryKey, Arc<AuthService>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Token cache and authenticated HTTP for one (host session, environment) pair.
pub struct AuthService {
    session_id: Uuid,
    environment: Environment,
    provider: Arc<dyn TokenProvider>,
    transport: Arc<dyn HttpTransport>,
    token: RwLock<Option<CachedToken>>,
    refresh: tokio::sync::Mutex<()>,
}

impl AuthService {
    /// The shared instance for `session` and `env`, created on first use. Later calls with the
    /// same environment name return that instance even if `env` differs.
    pub fn for_environment(session: &HostSession, env: &Environment) -> Arc<Self> {
        let key = (session.id, env.name.clone());
        REGISTRY
            .lock()
            .entry(key)
            .or_insert_with(|| {
                log::debug!("auth: new service for session {} / {}", session.id, env.name);
                Arc::new(Self {
                    session_id: session.id,
                    environment: env.clone(),
                    provider: session.token_provider.clone(),
                    transport: session.transport.clone(),
                    token: RwLock::new(None),
                    refresh: tokio::sync::Mutex::new(()),
                })
            })
            .clone()
    }

    /// Forget every instance created for `session`. Returns how many were dropped.
    pub fn release(session: &HostSession) -> usize {
        let mut registry = REGISTRY.lock();
        let before = registry.len();
        registry.retain(|(id, _), _| *id != session.id);
        before - registry.len()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Cached bearer token, refreshed through the provider when it is within
    /// [`REFRESH_BUFFER`] of expiry. Concurrent refreshes share one provider call.
    pub async fn get_access_token(&self) -> Result<String> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }
        let _refresh = self.refresh.lock().await;
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        let resource = self.environment.resource_url();
        let token = self.provider.get_token(resource).await.map_err(|e| {
            log::error!("auth: token acquisition failed for {}: {e}", self.environment.name);
            DataError::Token { environment: self.environment.name.clone(), message: e.to_string() }
        })?;
        *self.token.write() =
            Some(CachedToken { token: token.clone(), expires_at: Instant::now() + TOKEN_VALIDITY });
        crate::dev_trace!("auth", "token_refresh", "environment" => self.environment.name.as_str());
        Ok(token)
    }

    pub fn clear_token_cache(&self) {
        *self.token.write() = None;
    }

    pub fn has_valid_token(&self) -> bool {
        self.cached().is_some()
    }

    fn cached(&self) -> Option<String> {
        let now = Instant::now();
        self.token.read().as_ref().filter(|t| t.usable_at(now)).map(|t| t.token.clone())
    }

    /// Perform an authenticated call and decode its JSON body. A 401 clears the token and
    /// retries after the environment's retry delay, up to its retry attempts.
    pub async fn make_authenticated_request<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let body = match &options.body {
            Some(v) => Some(serde_json::to_string(v)?),
            None => None,
        };
        let mut unauthorized = 0u32;
        loop {
            let token = self.get_access_token().await?;
            let request = build_request(url, &options, body.clone(), &token);
            log::debug!("auth: {} {url}", options.method);
            let response = self.transport.send(request).await?;

            if response.status == 401 && unauthorized < self.environment.retry_attempts {
                unauthorized += 1;
                log::warn!(
                    "auth: 401 from {url}, refreshing token (attempt {unauthorized}/{})",
                    self.environment.retry_attempts
                );
                self.clear_token_cache();
                tokio::time::sleep(self.environment.retry_delay()).await;
                continue;
            }
            if !response.is_success() {
                return Err(http_error(&response));
            }
            return decode_body(&response.body);
        }
    }
}

fn build_request(url: &str, options: &RequestOptions, body: Option<String>, token: &str) -> HttpRequest {
    let mut headers = vec![
        ("Authorization".to_string(), format!("Bearer {token}")),
        ("Accept".to_string(), "application/json".to_string()),
        ("Content-Type".to_string(), "application/json; charset=utf-8".to_string()),
        ("OData-MaxVersion".to_string(), "4.0".to_string()),
        ("OData-Version".to_string(), "4.0".to_string()),
    ];
    if options.method.wants_representation() {
        headers.push(("Prefer".to_string(), "return=representation".to_string()));
    }
    headers.extend(options.headers.iter().cloned());
    HttpRequest { method: options.method, url: url.to_string(), headers, body }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn http_error(response: &HttpResponse) -> DataError {
    let message = serde_json::from_str::<ErrorEnvelope>(&response.body)
        .map(|e| e.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if response.status_text.is_empty() {
                format!("request failed with status {}", response.status)
            } else {
                response.status_text.clone()
            }
        });
    DataError::Http { status: response.status, message }
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    if body.trim().is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_str(body)?)
}
