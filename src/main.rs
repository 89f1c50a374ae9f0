use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

use housing_signals::config::Config;
use housing_signals::logging;
use housing_signals::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "housing_signals")]
#[command(about = "Housing and macro data reconciliation and modeling pipeline")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and export the reconciled modeling table
    Reconcile,
    /// Reconcile, then fit the modeling collaborators
    Model,
    /// Run the whole pipeline end to end
    Run,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Reconcile => {
            println!("🔄 Running reconciliation pipeline...");
            if let Err(e) = Pipeline::run(&config) {
                error!("Pipeline failed: {}", e);
                println!("❌ Pipeline failed: {e}");
                std::process::exit(1);
            }
        }
        Commands::Model | Commands::Run => {
            println!("🚀 Running full pipeline (reconcile + models)...");
            match Pipeline::run_with_models(&config) {
                Ok((_, model_report)) => {
                    println!(
                        "✅ Full pipeline completed: {} model fits",
                        model_report.summaries.len()
                    );
                }
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    println!("❌ Pipeline failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}
