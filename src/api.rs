use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::Settings;
use crate::error::FetchError;
use crate::types::{Movie, Page, Person};

/// List endpoints the client knows how to page through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Films,
    People,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Films => "films",
            Resource::People => "people",
        }
    }

    fn path(&self) -> String {
        format!("{}/", self.as_str())
    }
}

/// Thin HTTP client over the REST API. Cheap to clone.
#[derive(Clone, Debug)]
pub struct SwapiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SwapiClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()
            .context("building HTTP client")?;
        Ok(Self { http, base_url: settings.base_url.clone() })
    }

    pub fn base_url(&self) -> &Url { &self.base_url }

    /// URL of the first page of `resource`.
    pub fn first_page_url(&self, resource: Resource) -> Result<Url, FetchError> {
        self.base_url
            .join(&resource.path())
            .map_err(|e| FetchError::Network(format!("bad endpoint for {}: {e}", resource.as_str())))
    }

    /// URL for a page: the first page when `cursor` is `None`, otherwise the cursor itself.
    pub fn page_url(&self, resource: Resource, cursor: Option<&str>) -> Result<Url, FetchError> {
        match cursor {
            None => self.first_page_url(resource),
            Some(c) => Url::parse(c).map_err(|e| FetchError::Network(format!("invalid cursor {c:?}: {e}"))),
        }
    }

    /// Fetch the raw body of a page. Kept separate from decoding so the body can be cached.
    pub async fn fetch_page_body(&self, resource: Resource, cursor: Option<&str>) -> Result<String, FetchError> {
        let url = self.page_url(resource, cursor)?;
        self.get_text(url).await
    }

    pub async fn fetch_page<T: DeserializeOwned>(&self, resource: Resource, cursor: Option<&str>) -> Result<Page<T>, FetchError> {
        let url = self.page_url(resource, cursor)?;
        let body = self.get_text(url.clone()).await?;
        decode(url.as_str(), &body)
    }

    pub async fn fetch_movies_page(&self, cursor: Option<&str>) -> Result<Page<Movie>, FetchError> {
        self.fetch_page(Resource::Films, cursor).await
    }

    pub async fn fetch_people_page(&self, cursor: Option<&str>) -> Result<Page<Person>, FetchError> {
        self.fetch_page(Resource::People, cursor).await
    }

    pub async fn fetch_movie(&self, id: &str) -> Result<Movie, FetchError> {
        self.fetch_detail(Resource::Films, id).await
    }

    pub async fn fetch_person(&self, id: &str) -> Result<Person, FetchError> {
        self.fetch_detail(Resource::People, id).await
    }

    async fn fetch_detail<T: DeserializeOwned>(&self, resource: Resource, id: &str) -> Result<T, FetchError> {
        let id = id.trim().trim_matches('/');
        if id.is_empty() {
            return Err(FetchError::NotFound(format!("{}: empty id", resource.as_str())));
        }
        let url = self
            .first_page_url(resource)?
            .join(&format!("{id}/"))
            .map_err(|e| FetchError::Network(format!("bad detail id {id:?}: {e}")))?;
        let body = self.get_text(url.clone()).await?;
        if body.trim().is_empty() {
            return Err(FetchError::NotFound(url.to_string()));
        }
        decode(url.as_str(), &body)
    }

    async fn get_text(&self, url: Url) -> Result<String, FetchError> {
        debug!(%url, "GET");
        let resp = self.http.get(url.clone()).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Network(format!("{url} returned {status}")));
        }
        Ok(resp.text().await?)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Decode { url: url.to_string(), message: e.to_string() })
}
