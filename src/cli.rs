use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Extensible CLI for debugging and development
#[derive(Parser)]
#[command(name = "presswork")]
#[command(about = "A CLI tool for fetching and inspecting WordPress content", long_about = None)]
pub struct Cli {
    /// Base URL of the WordPress install (overrides the config file)
    #[arg(long)]
    pub url: Option<String>,

    /// Language code sent with each request
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Cache database URL (defaults to a SQLite file in the data dir)
    #[arg(long)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a page by slug
    Page {
        slug: String,
        /// Ask the API to embed linked resources
        #[arg(long)]
        embed: bool,
        /// Bypass the response cache
        #[arg(long)]
        refresh: bool,
    },
    /// Fetch a post by slug
    Post {
        slug: String,
        #[arg(long)]
        embed: bool,
        #[arg(long)]
        refresh: bool,
    },
    /// Fetch one menu by slug, or all menus configured for the site
    Menu {
        slug: Option<String>,
    },
    /// Resolve page metadata for a slug
    Meta {
        slug: String,
        /// Treat the slug as a post instead of a page
        #[arg(long)]
        post: bool,
    },
    /// Run a loader request over one or more slugs
    Load {
        slugs: Vec<String>,
        /// Also derive page metadata from the request
        #[arg(long)]
        meta: bool,
    },
    /// Cache maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Remove cached responses, optionally only those under a key prefix
    Clear {
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Show cache and store counts
    Stats,
    /// Compact the cache database
    Vacuum,
}
