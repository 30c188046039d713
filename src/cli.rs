use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Browse films and characters, and keep a local list of favorite films
#[derive(Parser)]
#[command(name = "swapi")]
#[command(about = "A CLI for browsing the Star Wars API with local favorites", long_about = None)]
pub struct Cli {
    /// Path to a TOML settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the database URL (e.g. sqlite://swapi.db?mode=rwc)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List films, page by page
    Movies {
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        pages: u64,
        /// Bypass the page cache
        #[arg(long)]
        refresh: bool,
    },
    /// List characters, page by page
    People {
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        pages: u64,
        /// Bypass the page cache
        #[arg(long)]
        refresh: bool,
    },
    /// Show one film by id
    Movie {
        id: String,
    },
    /// Show one character by id
    Person {
        id: String,
    },
    /// Toggle a film's favorite flag
    Favorite {
        id: String,
    },
    /// List favorite films
    Favorites,
    /// Remove a stored film by title
    Forget {
        title: String,
    },
    /// Clear cached pages
    CacheClear {
        /// Only keys starting with this prefix (e.g. "people|")
        #[arg(short, long)]
        prefix: Option<String>,
    },
    /// Show counts of stored films and cache entries
    Stats,
    /// Compact the database
    Vacuum,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn zero_pages_is_rejected() {
        assert!(Cli::try_parse_from(["swapi", "movies", "--pages", "0"]).is_err());
        assert!(Cli::try_parse_from(["swapi", "people", "-p", "0"]).is_err());
    }

    #[test]
    fn pages_default_to_one() {
        let cli = Cli::try_parse_from(["swapi", "movies"]).unwrap();
        assert!(matches!(cli.command, Commands::Movies { pages: 1, refresh: false }));
    }
}
