use anyhow::Result;
use askbox::cli::CliArgs;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    askbox::run(args).await
}
