use super::transport::HttpTransport;
use crate::errors::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Host-provided access-token source. The crate never runs OAuth flows itself.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self, resource: &str) -> Result<String>;
}

/// What the hosting page hands over: its token provider and HTTP transport. Each session gets
/// its own id so auth singletons from different hosts never mix.
#[derive(Clone)]
pub struct HostSession {
    pub id: Uuid,
    pub token_provider: Arc<dyn TokenProvider>,
    pub transport: Arc<dyn HttpTransport>,
}

impl HostSession {
    pub fn new(token_provider: Arc<dyn TokenProvider>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { id: Uuid::new_v4(), token_provider, transport }
    }
}

impl fmt::Debug for HostSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostSession").field("id", &self.id).finish_non_exhaustive()
    }
}
