use anyhow::Result;
use axum::Router;
use clap::Parser;
use recipe_core::AppConfig;
use recipe_server::{build_app, build_recommender};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Recipe corpus: .csv/.json/.jsonl file or a directory of them
    #[arg(long, env = "RECIPES_CORPUS")]
    corpus: Option<String>,
    /// Feedback store directory (sled); feedback stays in memory when unset
    #[arg(long, env = "RECIPES_STORE")]
    store: Option<String>,
    /// TOML config file
    #[arg(long, env = "RECIPES_CONFIG")]
    config: Option<String>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    if args.corpus.is_some() {
        config.corpus = args.corpus;
    }
    if args.store.is_some() {
        config.store = args.store;
    }
    let recommender = build_recommender(&config)?;
    let app: Router = build_app(Arc::new(recommender));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
