use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use dmfboard_cli::{run, PipelineOptions};
use dmfboard_io::BoardConfig;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Board configuration file (JSON); the reference board when omitted
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = "output")]
    output: PathBuf,

    /// Net table mapping electrode refdes to net names (JSON object)
    #[arg(long, value_name = "FILE")]
    nets: Option<PathBuf>,

    /// Print the reference board configuration and exit
    #[arg(long)]
    default_config: bool,

    /// Report clearance violations as warnings instead of failing
    #[arg(long)]
    allow_spacing: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.default_config {
        println!("{}", BoardConfig::default().to_json()?);
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => BoardConfig::load(path)
            .with_context(|| format!("Failed to load board config {path:?}"))?,
        None => BoardConfig::default(),
    };

    let options = PipelineOptions {
        output_dir: cli.output,
        nets: cli.nets,
        allow_spacing: cli.allow_spacing,
    };
    let report = run(&config, &options)?;

    println!("Total electrodes: {}", report.electrode_count);
    Ok(())
}
