use super::options::CallOptions;
use crate::auth::{AuthService, HostSession, RequestOptions};
use crate::cache::{Cache, CacheConfig, CacheStats, Cacheable, DurableStore};
use crate::config::Environment;
use crate::error_handler::{ErrorContext, ErrorHandler, ErrorKind};
use crate::errors::{DataError, Result};
use crate::odata::{self, ListResult, ODataQuery};
use crate::throttle::{Throttle, ThrottleConfig, ThrottleStats};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Pages followed by [`EntityService::get_all`] before it gives up.
pub const MAX_PAGES: usize = 100;

/// What a service keeps per cache key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum CachedResult<T> {
    Entity(T),
    List(ListResult<T>),
    All(Vec<T>),
}

/// Cached, throttled, authenticated CRUD over one Dataverse table.
pub struct EntityService<T> {
    table: String,
    environment: Environment,
    api_root: String,
    auth: Arc<AuthService>,
    cache: Cache<CachedResult<T>>,
    throttle: Throttle,
    errors: Arc<ErrorHandler>,
    lists_pattern: Regex,
}

impl<T> Clone for EntityService<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            environment: self.environment.clone(),
            api_root: self.api_root.clone(),
            auth: self.auth.clone(),
            cache: self.cache.clone(),
            throttle: self.throttle.clone(),
            errors: self.errors.clone(),
            lists_pattern: self.lists_pattern.clone(),
        }
    }
}

impl<T: Cacheable> EntityService<T> {
    pub fn new(table: impl Into<String>, environment: &Environment, session: &HostSession) -> Result<Self> {
        let table = table.into();
        let cache = Cache::new(cache_config(&table, environment));
        Self::assemble(table, environment, session, cache)
    }

    /// Like [`Self::new`], mirroring the cache into `store` when the environment has
    /// `persist_cache` set.
    pub fn with_store(
        table: impl Into<String>,
        environment: &Environment,
        session: &HostSession,
        store: Arc<dyn DurableStore>,
    ) -> Result<Self> {
        let table = table.into();
        let cache = Cache::with_store(cache_config(&table, environment), store);
        Self::assemble(table, environment, session, cache)
    }

    fn assemble(
        table: String,
        environment: &Environment,
        session: &HostSession,
        cache: Cache<CachedResult<T>>,
    ) -> Result<Self> {
        if table.is_empty() {
            return Err(DataError::Config("table name must not be empty".into()));
        }
        environment.validate()?;
        let lists_pattern = Regex::new(&format!("^{}:(list|all)(\\?|$)", regex::escape(&table)))
            .map_err(|e| DataError::Config(e.to_string()))?;
        Ok(Self {
            api_root: environment.api_root(),
            auth: AuthService::for_environment(session, environment),
            throttle: Throttle::new(
                format!("{}/{table}", environment.name),
                ThrottleConfig::for_environment(environment),
            ),
            errors: ErrorHandler::global(),
            environment: environment.clone(),
            cache,
            lists_pattern,
            table,
        })
    }

    /// Report failures to `handler` instead of the process-wide one.
    #[must_use]
    pub fn with_error_handler(mut self, handler: Arc<ErrorHandler>) -> Self {
        self.errors = handler;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    pub fn auth(&self) -> &Arc<AuthService> {
        &self.auth
    }

    pub async fn get_by_id(&self, id: &str, query: Option<&ODataQuery>) -> Result<Option<T>> {
        self.get_by_id_with(id, query, CallOptions::default()).await
    }

    /// One entity, or `None` when the server reports it does not exist.
    pub async fn get_by_id_with(
        &self,
        id: &str,
        query: Option<&ODataQuery>,
        options: CallOptions,
    ) -> Result<Option<T>> {
        let key = self.entity_key(id, query);
        if !options.bypass_cache
            && let Some(CachedResult::Entity(hit)) = self.cache.get(&key)
        {
            return Ok(Some(hit));
        }

        let url = odata::entity_url(&self.api_root, &self.table, id, query);
        let fetched = self
            .send(url, RequestOptions::get())
            .await
            .and_then(|body| Ok(serde_json::from_value::<T>(body)?));
        match fetched {
            Ok(entity) => {
                self.store(&key, CachedResult::Entity(entity.clone()), options.ttl);
                Ok(Some(entity))
            }
            Err(e) => {
                let failure = self.errors.handle_error(&e, self.context("get_by_id").with_entity(id), None);
                if failure.kind == ErrorKind::NotFound {
                    log::debug!("{}: {id} not found", self.table);
                    Ok(None)
                } else {
                    Err(DataError::Service(Box::new(failure)))
                }
            }
        }
    }

    pub async fn get_list(&self, query: Option<&ODataQuery>) -> Result<ListResult<T>> {
        self.get_list_with(query, CallOptions::default()).await
    }

    pub async fn get_list_with(&self, query: Option<&ODataQuery>, options: CallOptions) -> Result<ListResult<T>> {
        let key = self.list_key("list", query);
        if !options.bypass_cache
            && let Some(CachedResult::List(hit)) = self.cache.get(&key)
        {
            return Ok(hit);
        }

        let url = odata::collection_url(&self.api_root, &self.table, query);
        let page = self
            .send(url, RequestOptions::get())
            .await
            .and_then(ListResult::<T>::from_response)
            .map_err(|e| self.fail(&e, self.context("get_list")))?;
        self.store(&key, CachedResult::List(page.clone()), options.ttl);
        Ok(page)
    }

    pub async fn get_all(&self, query: Option<&ODataQuery>) -> Result<Vec<T>> {
        self.get_all_with(query, CallOptions::default()).await
    }

    /// Every page of the collection, following `@odata.nextLink` up to [`MAX_PAGES`].
    pub async fn get_all_with(&self, query: Option<&ODataQuery>, options: CallOptions) -> Result<Vec<T>> {
        let key = self.list_key("all", query);
        if !options.bypass_cache
            && let Some(CachedResult::All(hit)) = self.cache.get(&key)
        {
            return Ok(hit);
        }

        let mut url = odata::collection_url(&self.api_root, &self.table, query);
        let mut items = Vec::new();
        let mut pages = 0usize;
        loop {
            let page = self
                .send(url, RequestOptions::get())
                .await
                .and_then(ListResult::<T>::from_response)
                .map_err(|e| self.fail(&e, self.context("get_all")))?;
            pages += 1;
            items.extend(page.value);
            match page.next_link {
                Some(next) if pages < MAX_PAGES => url = next,
                Some(_) => {
                    log::warn!(
                        "{}: stopped paging after {MAX_PAGES} pages ({} items), results are incomplete",
                        self.table,
                        items.len()
                    );
                    break;
                }
                None => break,
            }
        }
        self.store(&key, CachedResult::All(items.clone()), options.ttl);
        Ok(items)
    }

    pub async fn create<D: Serialize + ?Sized>(&self, data: &D) -> Result<T> {
        let ctx = self.context("create");
        let body = serde_json::to_value(data).map_err(|e| self.fail(&DataError::from(e), ctx.clone()))?;
        let url = odata::collection_url(&self.api_root, &self.table, None);
        let created = self
            .send(url, RequestOptions::post(body))
            .await
            .and_then(|v| Ok(serde_json::from_value::<T>(v)?))
            .map_err(|e| self.fail(&e, ctx))?;
        self.invalidate_lists();
        Ok(created)
    }

    /// PATCH `data` onto `id`. When the server answers without a representation the entity is
    /// read back.
    pub async fn update<D: Serialize + ?Sized>(&self, id: &str, data: &D) -> Result<T> {
        let ctx = self.context("update").with_entity(id);
        let body = serde_json::to_value(data).map_err(|e| self.fail(&DataError::from(e), ctx.clone()))?;
        let url = odata::entity_url(&self.api_root, &self.table, id, None);
        let returned = self
            .send(url, RequestOptions::patch(body))
            .await
            .and_then(|v| Ok(serde_json::from_value::<Option<T>>(v)?))
            .map_err(|e| self.fail(&e, ctx.clone()));
        self.invalidate_entity(id);
        self.invalidate_lists();
        match returned? {
            Some(entity) => Ok(entity),
            None => self
                .get_by_id_with(id, None, CallOptions::fresh())
                .await?
                .ok_or_else(|| {
                    let e = ErrorHandler::create_error(
                        ErrorKind::NotFound,
                        format!("{} {id} not found after update", self.table),
                        None,
                        Some(&ctx),
                    );
                    self.fail(&e, ctx)
                }),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let url = odata::entity_url(&self.api_root, &self.table, id, None);
        self.send(url, RequestOptions::delete())
            .await
            .map_err(|e| self.fail(&e, self.context("delete").with_entity(id)))?;
        self.invalidate_entity(id);
        self.invalidate_lists();
        Ok(())
    }

    /// Drop every cached read of `id`, whatever query options it was fetched with.
    pub fn invalidate_entity(&self, id: &str) -> usize {
        match Regex::new(&format!("^{}:id:{}(\\?|$)", regex::escape(&self.table), regex::escape(id))) {
            Ok(pattern) => self.cache.invalidate_by_pattern(&pattern),
            Err(e) => {
                log::warn!("{}: cannot invalidate {id}: {e}", self.table);
                0
            }
        }
    }

    /// Drop every cached list and get-all result for the table.
    pub fn invalidate_lists(&self) -> usize {
        self.cache.invalidate_by_pattern(&self.lists_pattern)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn throttle_stats(&self) -> ThrottleStats {
        self.throttle.stats()
    }

    /// Cache keys: `{table}:id:{id}{?query}`, `{table}:list{?query}`, `{table}:all{?query}`.
    fn entity_key(&self, id: &str, query: Option<&ODataQuery>) -> String {
        format!("{}:id:{id}{}", self.table, query.map(ODataQuery::to_query_string).unwrap_or_default())
    }

    fn list_key(&self, kind: &str, query: Option<&ODataQuery>) -> String {
        format!("{}:{kind}{}", self.table, query.map(ODataQuery::to_query_string).unwrap_or_default())
    }

    fn store(&self, key: &str, value: CachedResult<T>, ttl: Option<Duration>) {
        match ttl {
            Some(ttl) => self.cache.set_with_ttl(key, value, ttl),
            None => self.cache.set(key, value),
        }
    }

    /// Throttled, authenticated round trip returning the decoded JSON body.
    async fn send(&self, url: String, request: RequestOptions) -> Result<Value> {
        let auth = self.auth.clone();
        self.throttle
            .execute(move || {
                let auth = auth.clone();
                let url = url.clone();
                let request = request.clone();
                async move { auth.make_authenticated_request::<Value>(&url, request).await }
            })
            .await
    }

    fn context(&self, operation: &str) -> ErrorContext {
        ErrorContext::new("EntityService", operation).with_table(self.table.as_str())
    }

    fn fail(&self, error: &DataError, context: ErrorContext) -> DataError {
        DataError::Service(Box::new(self.errors.handle_error(error, context, None)))
    }
}

fn cache_config(table: &str, environment: &Environment) -> CacheConfig {
    CacheConfig {
        default_ttl: environment.cache_ttl(),
        max_entries: environment.cache_max_entries,
        persist: environment.persist_cache,
        ..CacheConfig::default()
    }
    .with_prefix(format!("racedata:{}:{table}:", environment.name))
}
