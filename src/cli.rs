use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "navstack-demo")]
#[command(about = "Runs a scripted page/popup navigation session")]
pub struct Cli {
    /// Navigator config file (defaults to the per-user config location)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Where to write the log
    #[arg(long, default_value = "navstack-demo.log")]
    pub log_file: PathBuf,

    /// Duration of every view transition, in milliseconds
    #[arg(long, default_value_t = 150)]
    pub transition_ms: u64,
}
