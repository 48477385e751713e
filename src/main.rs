//! Binary entrypoint for the plotward CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml`
//! - `status [--json]` - per-world plot counts from the store
//! - `inspect <world> <id>` - dump one plot record
//! - `sweep [--dry-run]` - reclaim expired unfinished plots
//!
//! See the library crate docs for module-level details: `plotward::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use plotward::config::Config;
use plotward::plot::{expiry, PlotId, PlotStoreBuilder};

#[derive(Parser)]
#[command(name = "plotward")]
#[command(about = "Plot ownership and access enforcement for grid worlds")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new plotward configuration
    Init,
    /// Show per-world plot counts
    Status {
        /// Emit machine-readable JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print one plot record
    Inspect {
        /// World name
        world: String,
        /// Plot id in "x;z" form
        id: String,
    },
    /// Reclaim expired unfinished plots
    Sweep {
        /// Report what would be removed without deleting anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            info!("Initializing new plotward configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Status { json } => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            let store = PlotStoreBuilder::new(&config.storage.data_dir).open()?;

            if json {
                let mut worlds = serde_json::Map::new();
                for world in store.world_names()? {
                    let count = store.plot_count(&world)?;
                    worlds.insert(world, serde_json::json!(count));
                }
                let payload = serde_json::json!({
                    "data_dir": config.storage.data_dir,
                    "configured_worlds": config.worlds.keys().collect::<Vec<_>>(),
                    "plots": worlds,
                });
                println!("{}", payload);
            } else {
                println!("Data dir: {}", config.storage.data_dir);
                for world in store.world_names()? {
                    let configured = if config.world(&world).is_some() {
                        ""
                    } else {
                        " (not in config)"
                    };
                    println!(
                        "  {}: {} plots{}",
                        world,
                        store.plot_count(&world)?,
                        configured
                    );
                }
            }
        }
        Commands::Inspect { world, id } => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            let store = PlotStoreBuilder::new(&config.storage.data_dir).open()?;
            let plot_id: PlotId = id.parse()?;
            let plot = store.get_plot(&world, plot_id)?;
            println!("{}", serde_json::to_string_pretty(&plot)?);
        }
        Commands::Sweep { dry_run } => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            let store = PlotStoreBuilder::new(&config.storage.data_dir).open()?;
            let mut index = store.load_index(&config)?;

            let today = chrono::Utc::now().date_naive();
            for line in expiry::find_expired(&index, today) {
                println!("{}", line.summary_line());
            }
            let stats = expiry::sweep(&store, &mut index, today, dry_run)?;
            println!(
                "{}: {} scanned, {} expired, {} removed ({} protected, {} finished kept)",
                if dry_run { "Dry run" } else { "Sweep" },
                stats.scanned,
                stats.expired,
                stats.removed,
                stats.skipped_protected,
                stats.skipped_finished
            );
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level.
    let level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);

    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    if let Some(file) = log_file {
        if let Ok(f) = std::fs::OpenOptions::new().create(true).append(true).open(&file) {
            let sink = std::sync::Mutex::new(f);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = sink.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                writeln!(fmt, "{}", line)
            });
        }
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
