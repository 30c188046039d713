mod cli;

use anyhow::Result;
use clap::Parser;
use swapi::loader::{LoadOutcome, PagedLoader, PageState, ScrollPosition};
use swapi::mapping::id_from_url;
use swapi::pages::PageSource;
use swapi::config::Settings;
use swapi::Swapi;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("swapi=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let settings = match cli.database_url {
        Some(url) => settings.with_database_url(Some(url)),
        None => settings,
    };
    let app = Swapi::connect(&settings, true).await?;
    let lifetime = CancellationToken::new();

    match cli.command {
        Commands::Movies { pages, refresh } => {
            let loader = app.movies_loader(&lifetime, refresh);
            let mut movies = load_pages(&loader, pages).await;
            app.overlay_favorites(&mut movies).await?;
            for m in &movies {
                let star = if m.is_favorite == Some(true) { "*" } else { " " };
                println!(
                    "{star} [{}] {} (episode {}, {})",
                    m.url.as_deref().and_then(id_from_url).unwrap_or_default(),
                    m.title.as_deref().unwrap_or(swapi::mapping::DEFAULT_TITLE),
                    m.episode_id.map(|e| e.to_string()).unwrap_or_else(|| "?".into()),
                    m.director.as_deref().unwrap_or("unknown director"),
                );
            }
            print_tail(&loader);
        }
        Commands::People { pages, refresh } => {
            let loader = app.people_loader(&lifetime, refresh);
            for p in load_pages(&loader, pages).await {
                println!(
                    "[{}] {} (born {}, {} films)",
                    p.url.as_deref().and_then(id_from_url).unwrap_or_default(),
                    p.display_name(),
                    p.birth_year.as_deref().unwrap_or("unknown"),
                    p.films.len(),
                );
            }
            print_tail(&loader);
        }
        Commands::Movie { id } => {
            let m = app.movie_detail(&id).await?;
            println!("{}", m.title.as_deref().unwrap_or(swapi::mapping::DEFAULT_TITLE));
            if let Some(ep) = m.episode_id { println!("Episode: {ep}"); }
            if let Some(d) = &m.release_date { println!("Released: {d}"); }
            if let Some(d) = &m.director { println!("Director: {d}"); }
            println!("Favorite: {}", m.is_favorite.unwrap_or(false));
            if let Some(crawl) = &m.opening_crawl { println!("\n{crawl}"); }
        }
        Commands::Person { id } => {
            let p = app.person_detail(&id).await?;
            println!("Name: {}", p.display_name());
            println!("Height: {}", p.height.as_deref().unwrap_or("unknown"));
            println!("Mass: {}", p.mass.as_deref().unwrap_or("unknown"));
            println!("Hair: {}", p.hair_color.as_deref().unwrap_or("unknown"));
            println!("Eyes: {}", p.eye_color.as_deref().unwrap_or("unknown"));
            println!("Born: {}", p.birth_year.as_deref().unwrap_or("unknown"));
            for f in &p.films { println!("Movie: {f}"); }
        }
        Commands::Favorite { id } => {
            let m = app.movie_detail(&id).await?;
            let row = app.toggle_favorite(&m).await?;
            println!("{}: {}", row.title, if row.is_favorite { "favorite" } else { "not favorite" });
        }
        Commands::Favorites => {
            for row in app.favorites().await? {
                let ep = row.episode_id.map(|e| e.to_string()).unwrap_or_else(|| "?".into());
                println!("{} (episode {ep})", row.title);
            }
        }
        Commands::Forget { title } => {
            let n = app.remove_detail(&title).await?;
            println!("Removed {n} row(s)");
        }
        Commands::CacheClear { prefix } => {
            let n = app.clear_cache_prefix(prefix.as_deref()).await?;
            println!("Cleared {n} cache entries");
        }
        Commands::Stats => {
            let s = app.library_stats().await?;
            println!("Stored films: {} ({} favorite)", s.stored_movies, s.favorite_movies);
            println!("Cache entries: {} ({} expired)", s.cache_entries, s.expired_cache_entries);
        }
        Commands::Vacuum => {
            app.vacuum_db().await?;
            println!("Database compacted");
        }
    }

    lifetime.cancel();
    Ok(())
}

// Drive a loader the way a list view would: load, then report the last row
// as visible until enough pages are in or the list ends.
async fn load_pages<S: PageSource>(loader: &PagedLoader<S>, pages: u64) -> Vec<S::Item> {
    let mut loaded = 0;
    let mut outcome = loader.load().await;
    while let LoadOutcome::Loaded { .. } = outcome {
        loaded += 1;
        if loaded >= pages { break; }
        let total = loader.items().len();
        let last = total.checked_sub(1);
        outcome = loader.on_scroll(ScrollPosition::new(last, total)).await;
    }
    loader.items()
}

fn print_tail<S: PageSource>(loader: &PagedLoader<S>) {
    match loader.state() {
        PageState::Error => eprintln!("Error loading page; showing what was loaded"),
        PageState::Success { next_cursor: Some(_), .. } => eprintln!("(more pages available)"),
        _ => {}
    }
}
