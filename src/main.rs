use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use player_scraper::constants::{DEFAULT_CONFIG_PATH, DEFAULT_LOG_DIR};
use player_scraper::exporter::resolve_output;
use player_scraper::pipeline::unique_players;
use player_scraper::{
    logging, roster, Config, ExportFormat, HttpFetcher, Pipeline, PlayerStore, ProfileParser,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "player_scraper")]
#[command(about = "Scrapes player profile pages and exports their statistics")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape player profiles and export them
    Scrape {
        /// Player names (comma-separated)
        #[arg(long)]
        players: Option<String>,
        /// File with one player name per line
        #[arg(long)]
        players_file: Option<PathBuf>,
        /// Add every player from the online list (and the roster of players seen before)
        #[arg(long)]
        online: bool,
        /// Output format; inferred from --output when omitted
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,
        /// Output file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Don't update the player store
        #[arg(long)]
        no_store: bool,
    },
    /// Print a stored player record
    Show {
        #[arg(long)]
        player: String,
    },
    /// List stored players whose field equals a value
    Search {
        #[arg(long)]
        field: String,
        #[arg(long)]
        value: String,
    },
}

async fn scrape(
    config: &Config,
    players: Option<String>,
    players_file: Option<PathBuf>,
    online: bool,
    format: Option<ExportFormat>,
    output: Option<PathBuf>,
    no_store: bool,
) -> anyhow::Result<()> {
    let parser = ProfileParser::new(&config.fields)?;
    let fetcher = HttpFetcher::from_config(config)?;

    let mut names: Vec<String> = Vec::new();
    if let Some(list) = players {
        names.extend(list.split(',').map(|s| s.trim().to_string()));
    }
    if let Some(path) = players_file {
        names.extend(
            roster::read_player_file(&path)
                .with_context(|| format!("reading players file {}", path.display()))?,
        );
    }
    if online {
        let Some(url) = config.site.online_url.as_deref() else {
            bail!("--online requires site.online_url in the config");
        };
        let roster_path = PathBuf::from(&config.storage.roster_file);
        names.extend(roster::refresh(&fetcher, url, &roster_path).await?);
    }

    let pipeline = Pipeline::new(Box::new(fetcher), parser, config.site.profile_url.clone());

    println!("🔄 Scraping {} players...", unique_players(&names).len());
    let (exporter, result) = pipeline.run(&names).await?;

    println!("\n📊 Results:");
    println!("   Total players: {}", result.total);
    println!("   Processed: {}", result.processed);
    println!("   Failed: {}", result.failed.len());
    println!("   Elapsed: {:.2}s", result.elapsed.as_secs_f64());
    if !result.failed.is_empty() {
        println!("\n⚠️  Failures:");
        for failure in &result.failed {
            println!("   - {}: {}", failure.player, failure.error);
        }
    }

    if exporter.is_empty() {
        bail!("no player could be scraped");
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let (path, format) = resolve_output(format, output, &config.storage.output_dir, &timestamp);
    exporter
        .export(&path, format)
        .with_context(|| format!("exporting to {}", path.display()))?;
    println!("💾 Saved {} records to {}", exporter.len(), path.display());

    if !no_store {
        let mut store = PlayerStore::open(&config.storage.store_file);
        for record in exporter.records() {
            store.upsert(record.clone());
        }
        store.save()?;
    }

    Ok(())
}

fn show(config: &Config, player: &str) -> anyhow::Result<()> {
    let store = PlayerStore::open(&config.storage.store_file);
    let Some(stored) = store.get(player) else {
        bail!("player '{}' not found in store", player);
    };

    println!("📦 {} (last updated {})", stored.record.player, stored.last_updated);
    for (name, value) in stored.record.fields.iter() {
        println!("   {name}: {value}");
    }
    println!("   source: {}", stored.record.source);
    Ok(())
}

fn search(config: &Config, field: &str, value: &str) -> anyhow::Result<()> {
    let store = PlayerStore::open(&config.storage.store_file);
    let matches = store.find_by_field(field, value);
    if matches.is_empty() {
        println!("❌ No stored players have {field} = '{value}'");
        return Ok(());
    }

    println!("🔎 {} players with {field} = '{value}':", matches.len());
    for (name, _) in matches {
        println!("   {name}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging(DEFAULT_LOG_DIR);

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading config {}", cli.config.display()))?;
    info!("Loaded config with {} fields", config.fields.len());

    let outcome = match cli.command {
        Commands::Scrape {
            players,
            players_file,
            online,
            format,
            output,
            no_store,
        } => scrape(&config, players, players_file, online, format, output, no_store).await,
        Commands::Show { player } => show(&config, &player),
        Commands::Search { field, value } => search(&config, &field, &value),
    };

    if let Err(e) = &outcome {
        error!("Command failed: {:#}", e);
    }
    outcome
}
