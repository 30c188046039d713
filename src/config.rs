use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://swapi.dev/api/";
pub const DEFAULT_PAGE_TTL_SECS: i64 = 60 * 60;

/// Runtime settings: defaults, then an optional TOML file, then `SWAPI_*` env vars.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: Url,
    /// `None` selects a SQLite file in the user's data directory.
    pub database_url: Option<String>,
    pub page_ttl_secs: i64,
    pub user_agent: String,
}

// On-disk shape; every key optional.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default)]
    page_ttl_secs: Option<i64>,
    #[serde(default)]
    user_agent: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL parses"),
            database_url: None,
            page_ttl_secs: DEFAULT_PAGE_TTL_SECS,
            user_agent: format!("swapi/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Settings {
    /// Load from `path` if given, else from `<config dir>/swapi.toml` when it exists,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = Self::default();
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };
        if let Some(file) = file {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading config file: {}", file.display()))?;
            settings.merge_toml(&text)
                .with_context(|| format!("parsing config file: {}", file.display()))?;
        }
        settings.apply_env(|k| std::env::var(k).ok())?;
        Ok(settings)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = normalize_base_url(base_url)?;
        Ok(self)
    }

    pub fn with_database_url(mut self, database_url: Option<String>) -> Self {
        self.database_url = database_url;
        self
    }

    fn merge_toml(&mut self, text: &str) -> Result<()> {
        let file: FileSettings = toml::from_str(text)?;
        if let Some(u) = file.base_url { self.base_url = normalize_base_url(&u)?; }
        if file.database_url.is_some() { self.database_url = file.database_url; }
        if let Some(ttl) = file.page_ttl_secs { self.page_ttl_secs = check_ttl(ttl)?; }
        if let Some(ua) = file.user_agent { self.user_agent = ua; }
        Ok(())
    }

    fn apply_env<F>(&mut self, get: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(u) = get("SWAPI_BASE_URL") {
            self.base_url = normalize_base_url(&u).context("SWAPI_BASE_URL")?;
        }
        if let Some(db) = get("SWAPI_DATABASE_URL").filter(|s| !s.trim().is_empty()) {
            self.database_url = Some(db);
        }
        if let Some(ttl) = get("SWAPI_PAGE_TTL_SECS").and_then(|s| s.parse().ok()) {
            self.page_ttl_secs = check_ttl(ttl).context("SWAPI_PAGE_TTL_SECS")?;
        }
        Ok(())
    }
}

/// Parse and force a trailing slash so `join("films/")` appends instead of replacing.
pub fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut s = raw.trim().to_string();
    if !s.ends_with('/') { s.push('/'); }
    let url = Url::parse(&s).with_context(|| format!("invalid base URL: {raw}"))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("base URL cannot be used as a base: {raw}");
    }
    Ok(url)
}

fn check_ttl(ttl: i64) -> Result<i64> {
    if ttl < 0 {
        anyhow::bail!("page TTL must not be negative: {ttl}");
    }
    Ok(ttl)
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "swapi", "swapi").map(|p| p.config_dir().join("swapi.toml"))
}
