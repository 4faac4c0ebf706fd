mod cli;
mod logging;
mod run;

use std::path::Path;

use clap::Parser;
use eyre::WrapErr;

use cli::{Cli, Commands};
use lockstep_config::Config;

fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
    let cfg = lockstep_config::load_toml(&text).wrap_err("invalid config TOML")?;
    cfg.validate().wrap_err("config validation failed")?;
    Ok(cfg)
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Check => {
            load_config(&cli.config)?;
            println!("config OK: {}", cli.config.display());
            Ok(())
        }
        Commands::Run {
            source,
            run_s,
            tick_hz,
            print_output,
        } => {
            let (cfg, missing) = if cli.config.exists() {
                (load_config(&cli.config)?, false)
            } else {
                (Config::default(), true)
            };
            logging::init(&cfg.logging, cli.json, &cli.log_level)?;
            if missing {
                tracing::warn!(path = %cli.config.display(), "config not found, using defaults");
            }

            let (tx, rx) = crossbeam_channel::bounded(1);
            ctrlc::set_handler(move || {
                let _ = tx.try_send(());
            })
            .wrap_err("failed to install signal handler")?;

            run::run(&cfg, source, run_s, tick_hz, print_output, rx)
        }
    }
}
