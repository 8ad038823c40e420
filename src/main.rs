use clap::Parser;

use patternkit::cli::commands::{init, patterns, watch};
use patternkit::cli::{Cli, Commands};
use patternkit::{Settings, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        eprintln!("Using default configuration for now.");
        Settings::default()
    });

    logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => init::run_init(force),
        Commands::Config => init::run_config(&settings),
        Commands::Watch { debounce_ms } => watch::run_watch(&settings, cli.dir, debounce_ms).await,
        Commands::Reload { name } => patterns::run_reload(&settings, cli.dir, &name),
        Commands::Status { json } => patterns::run_status(&settings, cli.dir, json),
        Commands::Search {
            query,
            category,
            difficulty,
            backend,
            json,
        } => patterns::run_search(
            &settings,
            cli.dir,
            patterns::SearchArgs {
                query,
                category,
                difficulty,
                backend,
                json,
            },
        ),
        Commands::Show { name, json } => patterns::run_show(&settings, cli.dir, &name, json),
        Commands::Check => patterns::run_check(&settings, cli.dir),
    }
}
