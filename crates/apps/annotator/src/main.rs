mod commands;
mod config;

use std::path::PathBuf;

use clap::Parser;
use remote::HttpRepository;
use session::{JsonFileSessionStorage, Session};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, run};
use crate::config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about = "Landmark annotation session for photogrammetry studies")]
struct Args {
    /// Backend base URL (env: ANNOTATOR_SERVER)
    #[arg(long)]
    server: Option<String>,

    /// Study / object path (env: ANNOTATOR_STUDY)
    #[arg(long)]
    study: Option<String>,

    /// Session file (env: ANNOTATOR_SESSION)
    #[arg(long)]
    session: Option<PathBuf>,

    /// Request timeout in seconds (env: ANNOTATOR_TIMEOUT_SECS)
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::from_env(args.server, args.study, args.session, args.timeout);
    info!(server = %config.server, study = %config.study, session = %config.session_path.display(), "starting");

    let storage = JsonFileSessionStorage::open(&config.session_path)?;
    let mut session = Session::restore(storage);
    let repository = HttpRepository::new(&config.server, config.timeout)?;

    if let Err(err) = run(args.command, &mut session, &repository, &config.study).await {
        error!(error = %err, "command failed");
        return Err(err);
    }
    Ok(())
}
