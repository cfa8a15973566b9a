//! Order Cache Daemon - RESP server for cached order lookups

mod handler;
mod models;
mod repository;
mod resp;
mod shutdown;

use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::BytesMut;
use clap::Parser;
use ordercache::CacheService;
use orderstore::OrderStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::handler::{CommandHandler, OrderService};
use crate::repository::OrderRepository;
use crate::resp::RespValue;
use crate::shutdown::Shutdown;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, env = "ORDERD_BIND", default_value = "127.0.0.1:6380")]
    bind: String,

    /// Data directory
    #[arg(short, long, env = "ORDERD_DATA", default_value = "./data")]
    data: String,

    /// Cache capacity (number of orders, 0 disables caching)
    #[arg(short, long, env = "ORDERD_CACHE_CAPACITY", default_value_t = 10000)]
    capacity: usize,

    /// Health check mode (for Docker)
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    if args.health {
        match TcpStream::connect(&args.bind).await {
            Ok(_) => {
                println!("OK");
                std::process::exit(0);
            }
            Err(_) => {
                eprintln!("FAILED");
                std::process::exit(1);
            }
        }
    }

    info!("Starting Order Cache Daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {}", args.data);
    info!("Cache capacity: {}", args.capacity);

    let store = OrderStore::open(&args.data)
        .with_context(|| format!("Failed to open order store in {}", args.data))?;
    info!("Order store opened with {} orders", store.len());

    let service = Arc::new(CacheService::new(OrderRepository::new(store), args.capacity));

    // Warm the cache before accepting any connection
    let loaded = service.fill().context("Failed to load orders into cache")?;
    info!("Cache warmed with {} orders", loaded);

    let listener = TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!("Server listening on {}", args.bind);

    let mut shutdown = Shutdown::install().context("Failed to install signal handlers")?;

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let service = Arc::clone(&service);

                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, service).await {
                            error!("Error handling client {}: {}", addr, e);
                        }
                        info!("Connection closed: {}", addr);
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            },
            signal = shutdown.recv() => {
                info!("{} received, shutting down", signal);
                break;
            }
        }
    }

    Ok(())
}

async fn handle_client(mut stream: TcpStream, service: Arc<OrderService>) -> Result<()> {
    let handler = CommandHandler::new(service);
    let mut buffer = BytesMut::with_capacity(4096);

    loop {
        let n = stream.read_buf(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }

        loop {
            match RespValue::parse(&mut buffer) {
                Ok(Some(cmd)) => {
                    let response = handler.dispatch(cmd).await;
                    stream.write_all(&response.serialize()).await?;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Parse error: {}", e);
                    stream.write_all(&RespValue::error(&e).serialize()).await?;
                    buffer.clear();
                    break;
                }
            }
        }
    }
}
