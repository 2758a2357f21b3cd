use args::Args;
use clap::Parser;

mod args;
mod logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init(&args);

    let mut config = if args.config.exists() {
        config::Config::load(&args.config)?
    } else {
        log::warn!("no configuration found at {}, using defaults", args.config.display());
        config::Config::default()
    };

    if let Some(listen_address) = args.listen {
        config.server.listen_address = Some(listen_address);
    }

    let listen_address = config.server.listen_address_or_default();

    let router = llm::router(config).await?;

    let listener = tokio::net::TcpListener::bind(listen_address).await?;
    log::info!("copilot-gateway listening on {listen_address}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        log::error!("failed to install shutdown signal handler: {error}");
        return;
    }

    log::info!("shutting down");
}
