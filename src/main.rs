use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crosstalk::config::Args;
use crosstalk::server::{AppState, Server, run_console};
use crosstalk::store::{self, MatchStore, UserStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crosstalk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // A store failure here is fatal: the server cannot run without it.
    let pool = store::connect(&args.db).await?;
    let users = UserStore::new(pool.clone());
    users.initialize().await?;
    let matches = MatchStore::new(pool);
    matches.initialize().await?;

    let state = Arc::new(AppState::new(users, matches));
    // No session can hold a slot across a restart.
    state.reset_game().await?;

    let addr = SocketAddr::from((args.host, args.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received ctrl-c");
                shutdown.cancel();
            }
        });
    }

    tokio::spawn(run_console(state.clone(), shutdown.clone()));

    let server = Server::new(listener, state);
    server.serve(shutdown).await?;
    Ok(())
}
