use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use swapi::api::{Resource, SwapiClient};
use swapi::config::Settings;
use swapi::db::Database;
use swapi::error::FetchError;
use swapi::favorites::toggle_favorite;
use swapi::loader::LoadOutcome;
use swapi::pages::{cache_key, PageSource, RemotePages};
use swapi::storage::{DetailStore, PageCache};
use swapi::types::{Movie, MovieDetailEntity};
use swapi::Swapi;

fn sqlite_url(dir: &TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("swapi.db").display())
}

async fn open_db(dir: &TempDir) -> Database {
    let db = Database::connect(Some(&sqlite_url(dir))).await.unwrap();
    db.run_migrations().await.unwrap();
    db
}

fn entity(title: &str, episode: i64, favorite: bool) -> MovieDetailEntity {
    MovieDetailEntity {
        title: title.to_string(),
        episode_id: Some(episode),
        opening_crawl: None,
        release_date: Some("1980-05-17".to_string()),
        is_favorite: favorite,
    }
}

fn films_body() -> serde_json::Value {
    json!({
        "count": 2,
        "next": null,
        "previous": null,
        "results": [
            { "title": "A New Hope", "episode_id": 4, "url": "https://swapi.dev/api/films/1/" },
            { "title": "The Empire Strikes Back", "episode_id": 5, "url": "https://swapi.dev/api/films/2/" },
        ],
    })
}

#[tokio::test]
async fn detail_rows_round_trip() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir).await;

    assert!(db.get("The Empire Strikes Back").await.unwrap().is_none());
    db.put(&entity("The Empire Strikes Back", 5, false)).await.unwrap();
    db.put(&entity("A New Hope", 4, true)).await.unwrap();

    let row = db.get("A New Hope").await.unwrap().unwrap();
    assert_eq!(row, entity("A New Hope", 4, true));

    let titles: Vec<String> = db.list().await.unwrap().into_iter().map(|r| r.title).collect();
    assert_eq!(titles, vec!["A New Hope", "The Empire Strikes Back"]);

    db.put(&entity("A New Hope", 4, false)).await.unwrap();
    assert!(!db.get("A New Hope").await.unwrap().unwrap().is_favorite);

    assert_eq!(db.remove("A New Hope").await.unwrap(), 1);
    assert_eq!(db.remove("A New Hope").await.unwrap(), 0);
    assert_eq!(db.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn rows_with_absent_fields_read_back() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir).await;

    let bare = MovieDetailEntity {
        title: "A New Hope".into(),
        episode_id: None,
        opening_crawl: None,
        release_date: None,
        is_favorite: false,
    };
    db.put(&bare).await.unwrap();
    assert_eq!(db.get("A New Hope").await.unwrap(), Some(bare.clone()));
    assert_eq!(db.list().await.unwrap(), vec![bare]);
}

#[tokio::test]
async fn toggling_a_sparse_movie_twice_flips_back() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir).await;
    let movie = Movie { title: Some("A New Hope".into()), episode_id: Some(4), ..Movie::default() };

    assert!(toggle_favorite(&db, &movie).await.unwrap().is_favorite);
    let row = toggle_favorite(&db, &movie).await.unwrap();
    assert!(!row.is_favorite);
    assert_eq!(row.episode_id, Some(4));
    assert!(row.opening_crawl.is_none());
    assert_eq!(db.list().await.unwrap(), vec![row]);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir).await;
    db.run_migrations().await.unwrap();
    db.vacuum().await.unwrap();
}

#[tokio::test]
async fn page_cache_respects_expiry_and_prefix() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir).await;

    db.put_cache("films|page|first", "{}", 100).await.unwrap();
    db.put_cache("people|page|first", "{}", 100).await.unwrap();
    assert_eq!(db.get_cache("films|page|first", 50).await.unwrap().as_deref(), Some("{}"));
    assert!(db.get_cache("films|page|first", 100).await.unwrap().is_none());
    assert_eq!(db.cache_counts(50).await.unwrap(), (2, 0));
    assert_eq!(db.cache_counts(150).await.unwrap(), (0, 2));

    assert_eq!(db.clear_cache_prefix(Some("films|")).await.unwrap(), 1);
    assert!(db.get_cache("people|page|first", 50).await.unwrap().is_some());
    assert_eq!(db.clear_cache_prefix(None).await.unwrap(), 1);
}

#[tokio::test]
async fn remote_pages_are_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/films/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(films_body()))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db = open_db(&dir).await;
    let settings = Settings::default().with_base_url(&format!("{}/api/", server.uri())).unwrap();
    let client = SwapiClient::new(&settings).unwrap();
    let cache: Arc<dyn PageCache> = Arc::new(db.clone());

    let pages = RemotePages::<Movie>::new(client.clone(), Resource::Films).with_cache(cache.clone(), 3600);
    let first = pages.fetch_page(None).await.unwrap();
    let second = pages.fetch_page(None).await.unwrap();
    assert_eq!(first, second);
    assert!(db.get_cache(&cache_key(Resource::Films, None), 0).await.unwrap().is_some());

    // refresh bypasses the read but still goes to the server
    let fresh = RemotePages::<Movie>::new(client, Resource::Films).with_cache(cache, 3600).refresh(true);
    assert_eq!(fresh.fetch_page(None).await.unwrap().results.len(), 2);
}

#[tokio::test]
async fn unbounded_ttl_saturates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/films/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(films_body()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db = open_db(&dir).await;
    let settings = Settings::default().with_base_url(&format!("{}/api/", server.uri())).unwrap();
    let cache: Arc<dyn PageCache> = Arc::new(db.clone());

    let pages = RemotePages::<Movie>::new(SwapiClient::new(&settings).unwrap(), Resource::Films)
        .with_cache(cache, i64::MAX);
    assert_eq!(pages.fetch_page(None).await.unwrap().results.len(), 2);
    assert_eq!(pages.fetch_page(None).await.unwrap().results.len(), 2);
    assert!(db.get_cache(&cache_key(Resource::Films, None), i64::MAX - 1).await.unwrap().is_some());
}

#[tokio::test]
async fn decode_error_names_the_request_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/films/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let settings = Settings::default().with_base_url(&format!("{}/api/", server.uri())).unwrap();
    let pages = RemotePages::<Movie>::new(SwapiClient::new(&settings).unwrap(), Resource::Films);
    match pages.fetch_page(None).await {
        Err(FetchError::Decode { url, .. }) => assert_eq!(url, format!("{}/api/films/", server.uri())),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn favorites_flow_through_the_facade() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/films/1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "A New Hope",
            "episode_id": 4,
            "release_date": "1977-05-25",
            "url": "https://swapi.dev/api/films/1/",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/films/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(films_body()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let settings = Settings::default()
        .with_base_url(&format!("{}/api/", server.uri()))
        .unwrap()
        .with_database_url(Some(sqlite_url(&dir)));
    let app = Swapi::connect(&settings, true).await.unwrap();

    let movie = app.movie_detail("1").await.unwrap();
    assert_eq!(movie.is_favorite, Some(false));
    assert_eq!(app.stored_details().await.unwrap().len(), 1);
    assert!(app.favorites().await.unwrap().is_empty());

    let row = app.toggle_favorite(&movie).await.unwrap();
    assert!(row.is_favorite);
    assert_eq!(app.favorites().await.unwrap(), vec![row.clone()]);

    // viewing again keeps the flag
    assert_eq!(app.movie_detail("1").await.unwrap().is_favorite, Some(true));

    let lifetime = CancellationToken::new();
    let loader = app.movies_loader(&lifetime, false);
    assert_eq!(loader.load().await, LoadOutcome::Loaded { appended: 2 });
    let mut movies = loader.items();
    app.overlay_favorites(&mut movies).await.unwrap();
    assert_eq!(movies[0].is_favorite, Some(true));
    assert_eq!(movies[1].is_favorite, Some(false));

    let stats = app.library_stats().await.unwrap();
    assert_eq!(stats.stored_movies, 1);
    assert_eq!(stats.favorite_movies, 1);
    assert_eq!(stats.cache_entries, 1);

    assert!(!app.toggle_favorite(&movie).await.unwrap().is_favorite);
    assert!(app.favorites().await.unwrap().is_empty());

    assert_eq!(app.remove_detail("A New Hope").await.unwrap(), 1);
    assert!(app.stored_details().await.unwrap().is_empty());
}
