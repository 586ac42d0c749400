use anyhow::{Context, Result};
use clap::Parser;
use facesync_core::{store, OnnxEmbedder};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod output;

use cli::{Cli, Commands};
use config::Config;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::from_env();
    cfg.apply(&cli);
    let opts = cfg.reconcile_options();

    match cli.command {
        Commands::Init { force } => {
            store::init_store(&cfg.store_path, force)
                .with_context(|| format!("initializing {}", cfg.store_path.display()))?;
            println!("Created empty store at {}", cfg.store_path.display());
        }
        Commands::Status => {
            let plan = facesync_core::plan(&cfg.store_path, &cfg.dataset_dir, &opts)?;
            println!("{}", output::status(&plan, cli.json));
        }
        Commands::Extract { dry_run, all } => {
            let mut plan = facesync_core::plan(&cfg.store_path, &cfg.dataset_dir, &opts)?;

            if dry_run {
                let names: Vec<&str> = if all {
                    plan.identities.names().collect()
                } else {
                    plan.remaining.iter().map(String::as_str).collect()
                };
                println!("{}", output::dry_run(&names, all, cli.json));
                return Ok(());
            }
            if !all && plan.remaining.is_empty() {
                let report = facesync_core::ExtractReport {
                    store_entries: plan.store.len(),
                    ..Default::default()
                };
                println!("{}", output::extract(&report, cli.json));
                return Ok(());
            }

            let mut model = OnnxEmbedder::load(&cfg.model_path)
                .context("loading embedding model")?;
            let report = if all {
                facesync_core::rebuild(&mut plan, &mut model, &opts)?
            } else {
                facesync_core::extract(&mut plan, &mut model, &opts)?
            };

            if report.images > 0 {
                store::save_store(&cfg.store_path, &mut plan.store)
                    .with_context(|| format!("saving {}", cfg.store_path.display()))?;
                tracing::info!(path = %cfg.store_path.display(), entries = plan.store.len(), "saved store");
            }
            println!("{}", output::extract(&report, cli.json));
        }
    }

    Ok(())
}
