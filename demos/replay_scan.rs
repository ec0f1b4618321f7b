use anyhow::{bail, Result};
use barcode_reader::{
    DebouncePolicy, PermissionStatus, ReplaySource, ScanController, SessionConfig,
    SessionState, StaticPermissions,
};
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::info;

const SCRIPT: &str = "demos/fixtures/scan-script.jsonl";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let continuous = std::env::args().any(|arg| arg == "--continuous");

    info!("📷 Replaying decode results from {}", SCRIPT);

    let source = ReplaySource::open(SCRIPT)?;
    let permissions = Arc::new(StaticPermissions::prompting(PermissionStatus::Authorized));

    let config = SessionConfig {
        debounce: if continuous {
            DebouncePolicy::Continuous
        } else {
            DebouncePolicy::StopOnFirstMatch
        },
        ..SessionConfig::default()
    };

    let controller = ScanController::spawn(config, permissions, Box::new(source));

    // Print every published snapshot
    let mut updates = Box::pin(controller.updates());
    let printer = tokio::spawn(async move {
        while let Some(snapshot) = updates.next().await {
            match snapshot.last_text() {
                Some(text) => info!("📝 {} | {}", snapshot.state, text),
                None => info!("📝 {}", snapshot.state),
            }
        }
    });

    let outcome = controller.request_start().await?;
    if *outcome.state() != SessionState::Running {
        bail!("Scanner did not start: {}", outcome.state());
    }

    let finished = timeout(
        Duration::from_secs(5),
        controller.wait_for(|s| s.state == SessionState::Stopped),
    )
    .await;

    match finished {
        Ok(snapshot) => {
            let snapshot = snapshot?;
            info!("✅ Scanned: {:?}", snapshot.last_text());
        }
        Err(_) => {
            info!("⏱️  Replay still running, stopping");
            controller.stop().await?;
        }
    }

    let stats = controller.stats().await?;
    info!(
        "📊 accepted={} discarded={} runs={}",
        stats.events_accepted, stats.events_discarded, stats.runs_started
    );

    controller.shutdown().await?;
    printer.await?;

    Ok(())
}
