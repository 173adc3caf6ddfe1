use std::path::PathBuf;
use clap::{Parser, Subcommand};
use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chiral::ChiralClient;
use chiral_core::{ClientConfig, ClientConfigBuilder};

#[derive(Parser)]
#[command(name = "chiral")]
#[command(about = "Related content from a Chiral network for static sites", long_about = None)]
struct Cli {
    /// Configuration file (JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Hub URL, overrides the configuration file and CHIRAL_HUB_URL
    #[arg(long, global = true)]
    hub_url: Option<String>,

    /// Data directory for the persistent cache
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Display locale (en, zh-CN, zh-TW, ja)
    #[arg(short, long, global = true)]
    locale: Option<String>,

    /// Bypass the cache for this invocation
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List content related to a page
    Related {
        /// Canonical URL of the page
        page_url: String,

        /// Number of items (1-20)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Print items as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render the related-content block for a page as HTML
    Render {
        /// Canonical URL of the page
        page_url: String,

        /// Number of items (1-20)
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Check that the hub is reachable
    TestConnection,

    /// Manage the local cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show version and effective configuration
    Info,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cached entry
    Clear,

    /// Show cache statistics
    Stats,

    /// Remove expired entries
    Clean,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "chiral=info,chiral_core=info".into())
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let client = create_client(&cli)?;

    match cli.command {
        Commands::Related { ref page_url, count, json } => {
            let items = client.related(page_url, count).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("No related content found.");
            } else {
                println!("Related content ({}):", items.len());
                for (i, item) in items.iter().enumerate() {
                    println!("  {}. {}", i + 1, item.title);
                    println!("     {}", item.url);
                    if let Some(label) = client.renderer().source_label(item) {
                        println!("     Source: {}", label);
                    }
                }
            }
        }

        Commands::Render { ref page_url, count } => {
            println!("{}", client.render(page_url, count).await);
        }

        Commands::TestConnection => {
            let hub = client.config().hub_url.clone();
            if client.test_connection().await {
                println!("✓ Hub reachable: {}", hub);
            } else {
                anyhow::bail!("hub not reachable: {}", hub);
            }
        }

        Commands::Cache { ref action } => match action {
            CacheAction::Clear => {
                let cleared = client.clear_cache();
                println!("Cleared {} cached entries", cleared);
            }
            CacheAction::Stats => {
                let stats = client.cache_stats();
                if !stats.available {
                    println!("Cache unavailable");
                } else {
                    println!("Cache Statistics:");
                    println!("  Items:   {}", stats.total_items);
                    println!("  Live:    {}", stats.live_items());
                    println!("  Expired: {}", stats.expired_items);
                    println!("  Size:    {} bytes", stats.total_size_bytes);
                }
            }
            CacheAction::Clean => {
                let cleaned = client.clean_expired_cache();
                println!("Removed {} expired entries", cleaned);
            }
        },

        Commands::Info => {
            let info = client.info();
            println!("chiral {}", info.version);
            println!("  Hub:       {} ({})", info.hub_url, info.network_name);
            println!("  Count:     {}", info.count);
            println!(
                "  Cache:     {} (ttl: {}s, store: {})",
                if info.cache_enabled { "enabled" } else { "disabled" },
                info.cache_ttl_secs,
                if info.cache_available { "available" } else { "unavailable" }
            );
            println!("  Locale:    {} (available: {})", info.locale, info.available_locales.join(", "));
        }
    }

    Ok(())
}

fn default_data_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("chiral"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut builder = match &cli.config {
        Some(path) => ClientConfigBuilder::from_file(path)?,
        None => ClientConfig::builder(),
    }
    .with_env();

    if let Some(hub_url) = &cli.hub_url {
        builder = builder.hub_url(hub_url.clone());
    }
    if let Some(locale) = &cli.locale {
        builder = builder.locale(locale.clone());
    }
    if cli.no_cache {
        builder = builder.enable_cache(false);
    }

    Ok(builder.build()?)
}

fn create_client(cli: &Cli) -> Result<ChiralClient> {
    let config = load_config(cli)?;
    let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
    Ok(ChiralClient::from_config_with_data_dir(config, &data_dir)?)
}
