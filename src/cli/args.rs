use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aqi-etl")]
#[command(about = "Air-quality-index ingestion pipeline and dashboard API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the recent window from the live API and upsert it
    Sync {
        #[arg(long, help = "Override the lookback window in hours")]
        lookback_hours: Option<u32>,
    },

    /// Check or reload the historical table from JSON snapshot files
    #[command(group(ArgGroup::new("mode").required(true).args(["check", "import"])))]
    History {
        #[arg(long, help = "Count valid and invalid records without touching the database")]
        check: bool,

        #[arg(long, help = "Empty the historical table and reload it from the snapshots")]
        import: bool,

        #[arg(short, long, help = "Skip the confirmation prompt for --import")]
        yes: bool,

        #[arg(short, long, help = "Snapshot directory [default: history_records]")]
        dir: Option<PathBuf>,
    },

    /// Serve the aggregation API over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },
}
