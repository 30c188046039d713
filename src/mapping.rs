use crate::types::{Movie, MovieDetailEntity};

/// Stored in place of a missing movie title.
pub const DEFAULT_TITLE: &str = "No Title";

pub fn to_detail_record(movie: &Movie) -> MovieDetailEntity {
    MovieDetailEntity {
        title: movie.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        episode_id: movie.episode_id,
        opening_crawl: movie.opening_crawl.clone(),
        release_date: movie.release_date.clone(),
        is_favorite: movie.is_favorite.unwrap_or(false),
    }
}

/// Inverse of [`to_detail_record`]. Columns the row does not store come back empty.
pub fn to_remote(entity: &MovieDetailEntity) -> Movie {
    Movie {
        title: Some(entity.title.clone()),
        episode_id: entity.episode_id,
        opening_crawl: entity.opening_crawl.clone(),
        release_date: entity.release_date.clone(),
        is_favorite: Some(entity.is_favorite),
        ..Movie::default()
    }
}

/// Key a movie is stored under.
pub fn detail_key(movie: &Movie) -> &str {
    movie.title.as_deref().unwrap_or(DEFAULT_TITLE)
}

/// Numeric id embedded in a canonical resource URL, e.g. `.../films/3/` -> `"3"`.
pub fn id_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next()?;
    if !last.is_empty() && last.chars().all(|c| c.is_ascii_digit()) {
        Some(last.to_string())
    } else {
        None
    }
}
