//! readrec server binary
//!
//! Serves `POST /api/recommend` on `READREC_ADDR` (default 127.0.0.1:8000).

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use readrec_core::{Credentials, RecommenderConfig};
use readrec_server::{serve, AppState};

#[derive(Parser, Debug)]
#[command(name = "readrec-server", version, about = "Reading recommendations web API")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "READREC_ADDR", default_value = "127.0.0.1:8000")]
    addr: String,

    /// Configuration file (TOML)
    #[arg(long, env = "READREC_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = RecommenderConfig::load(args.config.as_deref())?;
    let credentials = Credentials::from_env();
    if credentials.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; topic inference will be unavailable");
    }

    let state = Arc::new(AppState::new(config, &credentials)?);
    serve(&args.addr, state).await?;
    Ok(())
}
