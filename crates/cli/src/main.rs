//! Annotate every slide in a directory of PowerPoint files with a key phrase.

use anyhow::{Context, Result};
use clap::Parser;
use slidescan_cli::{execute, Settings};
use slidescan_core::Error;
use slidescan_openai::{OpenAiClient, OpenAiConfig};
use std::path::PathBuf;

/// Scan a directory of .pptx/.ppt files and write ppt_slides.xlsx with one key phrase per slide.
#[derive(Parser, Debug)]
#[command(name = "ppt-scanner")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to scan (default: the directory containing this executable)
    directory: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = match OpenAiConfig::from_env() {
        Ok(config) => config,
        Err(Error::Config(message)) => {
            println!("Error: {}", message);
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to read provider settings"),
    };
    log::debug!("Using model {} at {}", config.model, config.base_url);

    let settings = Settings::resolve(args.directory)?;
    let provider = OpenAiClient::new(config).context("Failed to create the API client")?;

    let outcome = execute(&settings, provider)?;
    let code = outcome.exit_code();
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
