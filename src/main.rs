use anyhow::Result;
use clap::Parser;
use nbfix::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    nbfix::run(args).await
}
