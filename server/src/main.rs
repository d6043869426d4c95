use anyhow::Result;
use axum::Router;
use clap::Parser;
use keyrank_server::{build_app, ServerConfig};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Model directory path
    #[arg(long, default_value = "./model")]
    model: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Keyword count when a request does not specify one
    #[arg(long, default_value_t = 10)]
    default_top_n: usize,
    /// Largest keyword count a request may ask for
    #[arg(long, default_value_t = 20)]
    max_top_n: usize,
    /// Request body limit, PDF uploads included
    #[arg(long, default_value_t = 16 * 1024 * 1024)]
    max_upload_bytes: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = ServerConfig {
        default_top_n: args.default_top_n,
        max_top_n: args.max_top_n,
        max_upload_bytes: args.max_upload_bytes,
    };
    let app: Router = build_app(&args.model, config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, model = %args.model, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
