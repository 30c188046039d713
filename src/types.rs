use serde::{Deserialize, Serialize};

/// A film as returned by `GET films/`. Upstream does not guarantee any field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub title: Option<String>,
    pub episode_id: Option<i64>,
    pub opening_crawl: Option<String>,
    pub director: Option<String>,
    pub producer: Option<String>,
    pub release_date: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub characters: Vec<String>,
    // Local overlay, never sent by the API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

/// A character as returned by `GET people/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: Option<String>,
    pub height: Option<String>,
    pub mass: Option<String>,
    pub hair_color: Option<String>,
    pub eye_color: Option<String>,
    pub birth_year: Option<String>,
    pub homeworld: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub films: Vec<String>,
}

impl Person {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Cursor for the following page; `None` when upstream sent `null` or `""`.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Locally persisted movie row. `title` is the key; `is_favorite` is the
/// only column changed in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieDetailEntity {
    pub title: String,
    pub episode_id: Option<i64>,
    pub opening_crawl: Option<String>,
    pub release_date: Option<String>,
    pub is_favorite: bool,
}
