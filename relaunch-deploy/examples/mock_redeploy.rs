//! Redeploy against the mock engine, printing every step

use relaunch_core::{RelaunchConfig, ServiceLabel};
use relaunch_deploy::Redeployer;
use relaunch_engine::{MockContainer, MockEngine};
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("debug").init();

    let engine = MockEngine::new();
    engine
        .insert(
            MockContainer::service("web", "web", "app:1.0")
                .with_env(&["A=1"])
                .with_networks(&["appnet", "backend"]),
        )
        .await;

    let (tx, mut rx) = mpsc::channel(32);
    let redeployer =
        Redeployer::new(Arc::new(engine.clone()), &RelaunchConfig::default()).with_events(tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("  {event}");
        }
    });

    let result = redeployer.redeploy(&ServiceLabel::new("web")?).await?;
    drop(redeployer);
    printer.await?;

    println!("\n{}", result.message());
    println!("Engine calls: {}", engine.calls().await.len());

    Ok(())
}
