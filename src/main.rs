use anyhow::Result;
use clap::Parser;
use log::info;
use std::time::Duration;

use navstack::NavigatorConfig;
use navstack::demo::{demo_navigator, run_script};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger to file (truncate on each run)
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&cli.log_file)?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => NavigatorConfig::default_path()?,
    };
    let config = NavigatorConfig::load(&config_path)?;
    info!("Starting navstack-demo with {:?}", config);

    let navigator = demo_navigator(config, Duration::from_millis(cli.transition_ms));
    for line in run_script(&navigator).await? {
        println!("{}", line);
    }

    Ok(())
}
