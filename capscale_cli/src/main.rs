use clap::Parser;
use eyre::WrapErr;
use std::path::Path;

mod atomic;
mod cli;
mod error_fmt;
mod logging;
mod replay;
mod report;
mod session;

use cli::{Cli, Commands, JSON_MODE, json_mode};
use error_fmt::{CONFIG_CONTEXT, exit_code_for_error, format_error_json, humanize};

fn load_config(path: Option<&Path>) -> eyre::Result<capscale_config::Config> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .wrap_err_with(|| format!("read config {}", p.display()))?;
            capscale_config::load_toml(&text).wrap_err("parse config TOML")?
        }
        None => capscale_config::Config::default(),
    };
    cfg.validate()?;
    Ok(cfg)
}

fn self_check(cfg: &capscale_config::Config, json: bool) -> eyre::Result<()> {
    use capscale_traits::RawReadingSource;

    let mut sensor = session::sensor_from_config(cfg);
    let engine = capscale_core::CalibrationEngine::builder()
        .with_config(cfg.into())
        .try_build()?;
    let count = engine.config().acquisition.average_count;
    let reading = sensor
        .averaged_reading(count)
        .map_err(|e| eyre::eyre!("self-check read failed: {e}"))?;
    let live = engine.live_reading(reading.primary);
    tracing::info!(adc_raw = reading.primary, "self-check reading");
    if json {
        println!(
            "{}",
            serde_json::json!({ "status": "ok", "reading": report::live_json(&live)? })
        );
    } else {
        println!("OK  {}", report::live_text(&live));
    }
    Ok(())
}

fn run(cli: &Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref()).wrap_err(CONFIG_CONTEXT)?;
    logging::init(cli.json, cli.log_level.as_deref(), &cfg.logging);
    tracing::debug!(config = ?cli.config, "configuration loaded");

    match &cli.cmd {
        Commands::Fit { samples, export } => {
            replay::run_fit(&cfg, samples, export.as_deref(), cli.json)
        }
        Commands::Session { script } => session::run_session(&cfg, script.as_deref(), cli.json),
        Commands::SelfCheck => self_check(&cfg, cli.json),
    }
}

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = run(&cli) {
        tracing::error!(error = %format!("{err:#}"), "command failed");
        if json_mode() {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}
