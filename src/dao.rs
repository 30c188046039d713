use anyhow::Result;
use sqlx::AnyPool;

use crate::types::MovieDetailEntity;

type DetailRow = (String, i64, i64, String, String, i64);

// The Any driver refuses to decode SQL NULL into Option<_>, so nullable
// columns are read through COALESCE and mapped back here. An empty text
// column reads as None.
const DETAIL_COLUMNS: &str = "title, COALESCE(episode_id, 0), episode_id IS NULL, \
     COALESCE(opening_crawl, ''), COALESCE(release_date, ''), is_favorite";

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn entity_from_row((title, episode_id, episode_null, opening_crawl, release_date, is_favorite): DetailRow) -> MovieDetailEntity {
    MovieDetailEntity {
        title,
        episode_id: (episode_null == 0).then_some(episode_id),
        opening_crawl: non_empty(opening_crawl),
        release_date: non_empty(release_date),
        is_favorite: is_favorite != 0,
    }
}

/// Write a full row, favorite flag included.
pub async fn upsert_movie_detail(pool: &AnyPool, e: &MovieDetailEntity) -> Result<()> {
    sqlx::query(
        "INSERT INTO movie_details(title, episode_id, opening_crawl, release_date, is_favorite)\n         VALUES(?, ?, ?, ?, ?)\n         ON CONFLICT(title) DO UPDATE SET\n           episode_id=excluded.episode_id, opening_crawl=excluded.opening_crawl,\n           release_date=excluded.release_date, is_favorite=excluded.is_favorite,\n           updated_at=CURRENT_TIMESTAMP",
    )
    .bind(&e.title)
    .bind(e.episode_id)
    .bind(&e.opening_crawl)
    .bind(&e.release_date)
    .bind(i64::from(e.is_favorite))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_movie_detail(pool: &AnyPool, title: &str) -> Result<Option<MovieDetailEntity>> {
    let row = sqlx::query_as::<_, DetailRow>(&format!(
        "SELECT {DETAIL_COLUMNS} FROM movie_details WHERE title = ? LIMIT 1"
    ))
    .bind(title)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(entity_from_row))
}

pub async fn list_movie_details(pool: &AnyPool, favorites_only: bool) -> Result<Vec<MovieDetailEntity>> {
    let sql = if favorites_only {
        format!("SELECT {DETAIL_COLUMNS} FROM movie_details WHERE is_favorite = 1 ORDER BY episode_id NULLS LAST, title")
    } else {
        format!("SELECT {DETAIL_COLUMNS} FROM movie_details ORDER BY episode_id NULLS LAST, title")
    };
    let rows = sqlx::query_as::<_, DetailRow>(&sql).fetch_all(pool).await?;
    Ok(rows.into_iter().map(entity_from_row).collect())
}

pub async fn delete_movie_detail(pool: &AnyPool, title: &str) -> Result<u64> {
    let res = sqlx::query("DELETE FROM movie_details WHERE title = ?")
        .bind(title)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn count_movie_details(pool: &AnyPool) -> Result<(i64, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movie_details").fetch_one(pool).await?;
    let favorites: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movie_details WHERE is_favorite = 1")
        .fetch_one(pool)
        .await?;
    Ok((total, favorites))
}
