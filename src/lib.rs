pub mod api;
pub mod config;
pub mod dao;
pub mod db;
pub mod error;
pub mod favorites;
pub mod loader;
pub mod mapping;
pub mod pages;
pub mod storage;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::api::Resource;
    pub use crate::config::Settings;
    pub use crate::error::FetchError;
    pub use crate::loader::{LoadOutcome, PageState, PagedLoader, ScrollPosition};
    pub use crate::pages::{PageSource, RemotePages};
    pub use crate::types::{Movie, MovieDetailEntity, Page, Person};
    pub use crate::{LibraryStats, Swapi};
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::{Resource, SwapiClient};
use crate::config::Settings;
use crate::db::Database;
use crate::loader::PagedLoader;
use crate::pages::{current_epoch, RemotePages};
use crate::storage::{DetailStore, PageCache};
use crate::types::{Movie, MovieDetailEntity, Person};

pub type MovieLoader = PagedLoader<RemotePages<Movie>>;
pub type PeopleLoader = PagedLoader<RemotePages<Person>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryStats {
    pub stored_movies: usize,
    pub favorite_movies: usize,
    pub cache_entries: usize,
    pub expired_cache_entries: usize,
}

/// Async library entry point. Owns the database and the HTTP client.
pub struct Swapi {
    db: Database,
    client: SwapiClient,
    page_ttl_secs: i64,
}

impl Swapi {
    /// Connect the database and (optionally) run migrations.
    pub async fn connect(settings: &Settings, run_migrations: bool) -> Result<Self> {
        let db = Database::connect(settings.database_url.as_deref()).await?;
        if run_migrations { db.run_migrations().await?; }
        let client = SwapiClient::new(settings)?;
        info!(base_url = %settings.base_url, "swapi ready");
        Ok(Self { db, client, page_ttl_secs: settings.page_ttl_secs })
    }

    pub fn database(&self) -> &Database { &self.db }
    pub fn client(&self) -> &SwapiClient { &self.client }

    fn pages<T>(&self, resource: Resource, refresh: bool) -> RemotePages<T> {
        let cache: Arc<dyn PageCache> = Arc::new(self.db.clone());
        RemotePages::new(self.client.clone(), resource)
            .with_cache(cache, self.page_ttl_secs)
            .refresh(refresh)
    }

    /// Paged list of films, bound to `lifetime`.
    pub fn movies_loader(&self, lifetime: &CancellationToken, refresh: bool) -> MovieLoader {
        PagedLoader::with_cancellation(self.pages(Resource::Films, refresh), lifetime)
    }

    /// Paged list of characters, bound to `lifetime`.
    pub fn people_loader(&self, lifetime: &CancellationToken, refresh: bool) -> PeopleLoader {
        PagedLoader::with_cancellation(self.pages(Resource::People, refresh), lifetime)
    }

    /// Fetch one film, persist it as viewed and overlay its favorite flag.
    pub async fn movie_detail(&self, id: &str) -> Result<Movie> {
        let movie = self.client.fetch_movie(id).await.with_context(|| format!("fetching film {id}"))?;
        favorites::record_detail_view(&self.db, movie).await
    }

    pub async fn person_detail(&self, id: &str) -> Result<Person> {
        self.client.fetch_person(id).await.with_context(|| format!("fetching person {id}"))
    }

    pub async fn toggle_favorite(&self, movie: &Movie) -> Result<MovieDetailEntity> {
        favorites::toggle_favorite(&self.db, movie).await
    }

    /// Overlay stored favorite flags onto a list of movies.
    pub async fn overlay_favorites(&self, movies: &mut [Movie]) -> Result<()> {
        favorites::overlay_favorites(&self.db, movies).await
    }

    pub async fn favorites(&self) -> Result<Vec<MovieDetailEntity>> {
        dao::list_movie_details(self.db.pool(), true).await
    }

    pub async fn stored_details(&self) -> Result<Vec<MovieDetailEntity>> {
        self.db.list().await
    }

    /// Drop a stored detail row. Returns rows removed.
    pub async fn remove_detail(&self, title: &str) -> Result<u64> {
        self.db.remove(title).await
    }

    /// Clear cache entries by prefix (e.g. `"films|"`). Returns number of rows removed.
    pub async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64> {
        self.db.clear_cache_prefix(prefix).await
    }

    /// Vacuum/compact the database (SQLite only; no-op on others).
    pub async fn vacuum_db(&self) -> Result<()> { self.db.vacuum().await }

    pub async fn library_stats(&self) -> Result<LibraryStats> {
        let (stored, favorite) = dao::count_movie_details(self.db.pool()).await?;
        let (live, expired) = self.db.cache_counts(current_epoch()).await?;
        Ok(LibraryStats {
            stored_movies: stored as usize,
            favorite_movies: favorite as usize,
            cache_entries: (live + expired) as usize,
            expired_cache_entries: expired as usize,
        })
    }
}
