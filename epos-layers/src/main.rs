//! Point d'entrée CLI pour epos-layers

use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

use epos_layers::Config;

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Construire et inspecter les couches cartographiques EPOS
#[derive(Parser)]
#[command(name = "epos-layers")]
#[command(author, version)]
#[command(about = "Construire et inspecter les couches cartographiques EPOS (GeoJSON, CovJSON, WMS, WMTS)")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Preset (default/dense) ou chemin d'une config JSON (défaut : env EPOS_LAYERS_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let config = Config::resolve(cli.config.as_deref())?;
    debug!(config = ?cli.config, stylable = config.stylable, "Configuration chargée");

    match cli.command {
        Commands::Render { source } => cli::cmd_render(&config, &source).await?,
        Commands::Legend { source } => cli::cmd_legend(&config, &source).await?,
        Commands::Popup {
            source,
            property_id,
            html,
        } => cli::cmd_popup(&config, &source, &property_id, html).await?,
        Commands::Formats => cli::cmd_formats(),
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Les logs vont sur stderr, stdout porte le JSON
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
