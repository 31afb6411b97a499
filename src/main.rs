mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{CacheCommands, Cli, Commands};
use presswork::config::PluginConfig;
use presswork::types::{ContentType, LoaderItem, LoaderRequest, LoaderRequestElement};
use presswork::Presswork;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PluginConfig::from_file(path)?,
        None => {
            let url = cli
                .url
                .clone()
                .context("either --url or --config is required")?;
            let mut config = PluginConfig::new(url, cli.lang.clone());
            config.apply_env();
            config
        }
    };
    if let Some(url) = &cli.url {
        config.url = url.clone();
    }
    init_tracing(config.debug);
    config.validate()?;

    let pw = Presswork::connect(config, cli.database_url.as_deref(), true).await?;

    match cli.command {
        Commands::Page { slug, embed, refresh } => {
            let value = if embed {
                let mut element = LoaderRequestElement::from_slug(slug);
                element.embed = true;
                let request = LoaderRequest::from(element);
                let outcome = pw.load(&request, false).await?;
                outcome.data.into_iter().next().map(|f| f.value).unwrap_or_default()
            } else {
                pw.fetch_page_cached(&slug, refresh).await?
            };
            print_json(&value)?;
        }
        Commands::Post { slug, embed, refresh } => {
            let mut element = LoaderRequestElement::from_slug(slug.clone());
            element.content_type = Some(ContentType::Post);
            element.embed = embed;
            if embed {
                let outcome = pw.load(&LoaderRequest::from(element), false).await?;
                let value = outcome.data.into_iter().next().map(|f| f.value).unwrap_or_default();
                print_json(&value)?;
            } else {
                print_json(&pw.fetch_post_cached(&slug, refresh).await?)?;
            }
        }
        Commands::Menu { slug } => match slug {
            Some(slug) => print_json(&pw.fetch_menu(&slug).await?)?,
            None => {
                for fetched in pw.load_menus().await? {
                    println!("# {}", fetched.element.data_name());
                    print_json(&fetched.value)?;
                }
            }
        },
        Commands::Meta { slug, post } => {
            let content_type = if post { ContentType::Post } else { ContentType::Page };
            let meta = pw.fetch_meta(content_type, &slug).await?;
            println!("title:       {}", meta.title.as_deref().unwrap_or("-"));
            println!("description: {}", meta.description.as_deref().unwrap_or("-"));
            println!("link:        {}", meta.link.as_deref().unwrap_or("-"));
        }
        Commands::Load { slugs, meta } => {
            anyhow::ensure!(!slugs.is_empty(), "at least one slug is required");
            let request = if slugs.len() == 1 {
                LoaderRequest::from(slugs[0].as_str())
            } else {
                LoaderRequest::List(slugs.iter().map(|s| LoaderItem::from(s.as_str())).collect())
            };
            let outcome = pw.load(&request, meta).await?;
            for fetched in &outcome.data {
                println!("# {}", fetched.element.data_name());
                print_json(&fetched.value)?;
            }
            if let Some(meta) = &outcome.meta {
                println!("# meta");
                println!("{}", serde_json::to_string_pretty(meta)?);
            }
        }
        Commands::Cache { command } => match command {
            CacheCommands::Clear { prefix } => {
                let removed = pw.clear_cache_prefix(prefix.as_deref()).await?;
                println!("Removed {removed} cached entries");
            }
            CacheCommands::Stats => {
                let stats = pw.stats().await?;
                println!("cache entries:   {}", stats.cache.entries);
                println!("expired entries: {}", stats.cache.expired_entries);
                println!("store keys:      {}", stats.store_keys);
            }
            CacheCommands::Vacuum => {
                pw.vacuum_db().await?;
                println!("Cache database compacted");
            }
        },
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing(debug: bool) {
    let default = if debug { "presswork=debug,info" } else { "presswork=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
