use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ladder_stats::api::{build_router, cors_layer, state::AppState};
use ladder_stats::cache::StatCache;
use ladder_stats::calculate::PlayerReport;
use ladder_stats::config::AppConfig;
use ladder_stats::models::{CommunityId, PlayerId, QueueFilter, Scope, StatKind, TimeWindow, UserRecord};
use ladder_stats::query::LeaderboardQuery;
use ladder_stats::source::{HttpMatchSource, MatchSource};
use ladder_stats::storage::{JsonlStore, StorageConfig};

#[derive(Parser)]
#[command(name = "ladder-stats")]
#[command(about = "Per-community leaderboard statistics with a background-refreshed cache")]
#[command(version)]
struct Cli {
    /// Path to configuration file (defaults to ./ladder-stats.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server with background refresh
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port number
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print a community leaderboard
    Leaderboard {
        community: String,

        /// Statistic to rank by (e.g. win_rate, average_score, current_rating)
        #[arg(long, default_value = "win_rate")]
        stat: StatKind,

        /// all_time, weekly or seasonal
        #[arg(long, default_value = "all_time")]
        window: TimeWindow,

        /// global or community
        #[arg(long, default_value = "global")]
        scope: Scope,

        /// all, team or solo
        #[arg(long, default_value = "all")]
        queue: QueueFilter,
    },

    /// Rebuild a community's cache now
    Refresh { community: String },

    /// Show cache freshness for a community, or for every known community
    Info { community: Option<String> },

    /// Delete cached data
    Clear {
        /// Community to clear
        community: Option<String>,

        /// Clear every community
        #[arg(long)]
        all: bool,
    },

    /// Add a user to a community roster
    AddMember {
        community: String,
        user_id: String,

        /// Display name shown on leaderboards
        #[arg(long)]
        name: String,
    },

    /// Compute a player's full report from live match data
    Report { community: String, player: String },
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn community_id(raw: &str) -> Result<CommunityId> {
    let id = CommunityId::from(raw);
    if !id.is_path_safe() {
        bail!("Invalid community id: {:?}", raw);
    }
    Ok(id)
}

struct Services {
    store: Arc<JsonlStore>,
    source: Arc<dyn MatchSource>,
    cache: Arc<StatCache>,
}

fn build_services(config: &AppConfig) -> Result<Services> {
    let store = Arc::new(JsonlStore::new(StorageConfig::new(config.data_dir.clone())));
    let source: Arc<dyn MatchSource> = Arc::new(
        HttpMatchSource::new(config.source_config()?).context("Failed to build match source")?,
    );
    let cache = Arc::new(StatCache::new(
        source.clone(),
        store.clone(),
        config.cache_config()?,
        config.season(),
    ));
    Ok(Services {
        store,
        source,
        cache,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_tracing(&config.log_level, cli.json_logs);

    tracing::info!("Starting ladder-stats v{}", env!("CARGO_PKG_VERSION"));

    let services = build_services(&config)?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let hydrated = services.cache.hydrate().await;
            tracing::info!("Loaded {} cached communities from disk", hydrated);
            let scheduler = services.cache.spawn_refresh_ahead();

            let state = AppState {
                cache: services.cache.clone(),
                source: services.source.clone(),
            };
            let app = build_router(state).layer(cors_layer(&config.server.cors_origin));

            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app).await?;

            scheduler.abort();
        }
        Commands::Leaderboard {
            community,
            stat,
            window,
            scope,
            queue,
        } => {
            let community = community_id(&community)?;
            services.cache.hydrate().await;
            // No process stays behind to finish a background refresh
            services.cache.refresh_if_stale(&community).await?;

            let query = LeaderboardQuery::new(stat)
                .window(window)
                .scope(scope)
                .queue(queue);
            let rows = services.cache.leaderboard(&community, &query).await?;
            services.cache.save_snapshot(&community).await?;

            println!("{} leaderboard for {}", stat, community);
            if rows.is_empty() {
                println!("  (no eligible players)");
            }
            for row in rows {
                println!(
                    "  {:>2}. {:<24} {:>10.3}",
                    row.position, row.display_name, row.value
                );
            }
        }
        Commands::Refresh { community } => {
            let community = community_id(&community)?;
            services.cache.hydrate().await;

            let outcome = services.cache.refresh_cache(&community).await?;
            services.cache.save_snapshot(&community).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Info { community } => {
            let communities = match community {
                Some(raw) => vec![community_id(&raw)?],
                None => services.store.list_communities()?,
            };
            services.cache.hydrate().await;

            for community in communities {
                match services.cache.cache_info(&community).await {
                    Some(info) => println!("{}", serde_json::to_string_pretty(&info)?),
                    None => println!("No cache for community {}", community),
                }
            }
        }
        Commands::Clear { community, all } => match (community, all) {
            (_, true) => {
                let cleared = services.cache.clear_all_caches().await;
                println!("Cleared {} communities", cleared);
            }
            (Some(community), false) => {
                let community = community_id(&community)?;
                services.cache.clear_cache(&community).await;
                println!("Cleared {}", community);
            }
            (None, false) => bail!("Specify a community or --all"),
        },
        Commands::AddMember {
            community,
            user_id,
            name,
        } => {
            let community = community_id(&community)?;
            let member = UserRecord::new(PlayerId::from(user_id.as_str()), name);
            services.store.add_member(&community, &member)?;
            println!("Added {} to {}", member.user_id, community);
        }
        Commands::Report { community, player } => {
            let community = community_id(&community)?;
            let player = PlayerId::from(player.as_str());

            let matches = services.source.all_matches(&player, &community).await?;
            let report = PlayerReport::compute(&matches, &player);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
