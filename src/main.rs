use aqi_etl::cli::{run, Cli};
use aqi_etl::error::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
