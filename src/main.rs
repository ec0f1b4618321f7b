use anyhow::{Context, Result};
use barcode_reader::{
    create_router, AppState, Config, ScanController, SourceFactory, StaticPermissions,
};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "barcode-reader", about = "Barcode scan session service")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/barcode-reader")]
    config: String,

    /// Override the HTTP port from the configuration
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Barcode Reader v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let (source, injector) =
        SourceFactory::create(&cfg.source).context("Failed to create recognition source")?;
    info!("Recognition source: {}", source.name());

    let permissions = Arc::new(StaticPermissions::new(&cfg.permission));
    let controller = ScanController::spawn(cfg.scanner.session_config(), permissions, source);

    let app = create_router(AppState::new(controller.clone(), injector));

    let port = cli.port.unwrap_or(cfg.service.http.port);
    let addr = format!("{}:{}", cfg.service.http.bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    // Ending the controller also ends open event streams, letting the server drain
    let shutdown_controller = controller.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
            if let Err(e) = shutdown_controller.shutdown().await {
                warn!("Scan controller shutdown failed: {}", e);
            }
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
