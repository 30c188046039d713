use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::mapping::{detail_key, to_detail_record};
use crate::storage::DetailStore;
use crate::types::{Movie, MovieDetailEntity};

/// Flip the favorite flag of `movie`, creating its row on first toggle.
/// Stored copies of the remote fields are left as they are.
pub async fn toggle_favorite<S>(store: &S, movie: &Movie) -> Result<MovieDetailEntity>
where
    S: DetailStore + ?Sized,
{
    let key = detail_key(movie);
    let existing = store
        .get(key)
        .await
        .with_context(|| format!("reading favorite state: {key}"))?;

    let record = match existing {
        Some(mut row) => {
            row.is_favorite = !row.is_favorite;
            row
        }
        None => {
            let mut row = to_detail_record(movie);
            row.is_favorite = true;
            row
        }
    };
    store
        .put(&record)
        .await
        .with_context(|| format!("saving favorite state: {key}"))?;
    info!(title = %record.title, is_favorite = record.is_favorite, "favorite toggled");
    Ok(record)
}

/// Persist a freshly fetched movie, keeping any stored favorite flag, and
/// return the movie with that flag overlaid.
pub async fn record_detail_view<S>(store: &S, movie: Movie) -> Result<Movie>
where
    S: DetailStore + ?Sized,
{
    let key = detail_key(&movie).to_string();
    let stored_flag = store
        .get(&key)
        .await
        .with_context(|| format!("reading movie detail: {key}"))?
        .map(|row| row.is_favorite)
        .unwrap_or(false);

    let mut record = to_detail_record(&movie);
    record.is_favorite = stored_flag;
    store
        .put(&record)
        .await
        .with_context(|| format!("saving movie detail: {key}"))?;
    debug!(title = %key, is_favorite = stored_flag, "detail view recorded");

    Ok(Movie { is_favorite: Some(stored_flag), ..movie })
}

/// Set `is_favorite` on each movie from the store. Unknown titles become `false`.
pub async fn overlay_favorites<S>(store: &S, movies: &mut [Movie]) -> Result<()>
where
    S: DetailStore + ?Sized,
{
    let flags: HashMap<String, bool> = store
        .list()
        .await
        .context("listing movie details")?
        .into_iter()
        .map(|row| (row.title, row.is_favorite))
        .collect();
    for m in movies.iter_mut() {
        m.is_favorite = Some(flags.get(detail_key(m)).copied().unwrap_or(false));
    }
    Ok(())
}
