use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::{decode, Resource, SwapiClient};
use crate::error::FetchError;
use crate::storage::PageCache;
use crate::types::Page;

/// Fetches one page of a list. `cursor` is `None` for the first page.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Clone + Send + Sync + 'static;

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Self::Item>, FetchError>;
}

/// A [`PageSource`] backed by the REST API, with an optional TTL cache of page bodies.
pub struct RemotePages<T> {
    client: SwapiClient,
    resource: Resource,
    cache: Option<Arc<dyn PageCache>>,
    ttl_secs: i64,
    refresh: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T> RemotePages<T> {
    pub fn new(client: SwapiClient, resource: Resource) -> Self {
        Self { client, resource, cache: None, ttl_secs: 0, refresh: false, _item: PhantomData }
    }

    pub fn with_cache(mut self, cache: Arc<dyn PageCache>, ttl_secs: i64) -> Self {
        self.cache = Some(cache);
        self.ttl_secs = ttl_secs;
        self
    }

    /// Skip cache reads; fresh bodies are still written back.
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn resource(&self) -> Resource { self.resource }
}

pub fn cache_key(resource: Resource, cursor: Option<&str>) -> String {
    format!("{}|page|{}", resource.as_str(), cursor.unwrap_or("first"))
}

#[async_trait]
impl<T> PageSource for RemotePages<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Item = T;

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<T>, FetchError> {
        let key = cache_key(self.resource, cursor);
        let url = self.client.page_url(self.resource, cursor)?;
        let now = current_epoch();

        if let (Some(cache), false) = (&self.cache, self.refresh) {
            match cache.get_cache(&key, now).await {
                Ok(Some(body)) => match decode::<Page<T>>(url.as_str(), &body) {
                    Ok(page) => {
                        debug!(%key, "page cache hit");
                        return Ok(page);
                    }
                    Err(e) => warn!(%key, error = %e, "discarding unreadable cached page"),
                },
                Ok(None) => debug!(%key, "page cache miss"),
                Err(e) => warn!(%key, error = %e, "page cache read failed"),
            }
        }

        let body = self.client.fetch_page_body(self.resource, cursor).await?;
        let page = decode::<Page<T>>(url.as_str(), &body)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put_cache(&key, &body, now.saturating_add(self.ttl_secs)).await {
                warn!(%key, error = %e, "page cache write failed");
            }
        }
        Ok(page)
    }
}

pub(crate) fn current_epoch() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
