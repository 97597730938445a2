//! Mixy Console
//!
//! Headless demo that runs the streaming engine against simulated pots:
//! a peer subscribes, a pot sweeps through its travel, the peer retunes
//! the scheduler mid-run, and the controls settle back to the slow poll.
//! Every engine event is logged as it happens, which makes the dual-speed
//! behavior visible in the timestamps.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use mixy_sim::{SimPots, SimPotsConfig, SimTransport};
use mixy_stream::{
    run_stream_actor, ParamStore, StreamCommand, StreamEvent, StreamParams, RAW_FULL_SCALE,
};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mixy_console=info,mixy_stream=debug,mixy_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mixy console demo");

    let pots = SimPots::from_config(SimPotsConfig {
        initial_values: [465, 0, 930, 0, 200, 700],
    });
    let transport = SimTransport::new();
    transport.set_subscribed(true);
    let params = Arc::new(ParamStore::new());

    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (event_tx, mut event_rx) = mpsc::channel(256);

    let actor = tokio::spawn(run_stream_actor(
        pots.clone(),
        transport.clone(),
        params,
        cmd_rx,
        event_tx,
    ));

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                StreamEvent::SessionStarted => info!("session started"),
                StreamEvent::SessionStopped => info!("session stopped"),
                StreamEvent::SnapshotSent { pots, bytes } => {
                    info!(pots, bytes, "snapshot sent")
                }
                StreamEvent::UpdateSent {
                    pot,
                    controller,
                    value,
                } => info!(pot, controller, value, "update sent"),
                StreamEvent::ParamsUpdated { params } => info!(?params, "params updated"),
                StreamEvent::ReadFailed { message } => info!(%message, "read failed"),
                StreamEvent::SendFailed { message } => info!(%message, "send failed"),
            }
        }
    });

    // Peer subscribes: snapshot goes out, the scheduler arms
    cmd_tx
        .send(StreamCommand::NotificationsEnabled)
        .await
        .context("actor stopped early")?;

    // Sweep pot 0 through its travel and back; the fast period keeps the
    // updates dense while the pot is moving
    info!("sweeping pot 0");
    for step in (0..=20).chain((0..20).rev()) {
        pots.set(0, step * (RAW_FULL_SCALE / 20));
        sleep(Duration::from_millis(90)).await;
    }

    // Let the controls settle past the retention window onto the slow poll
    sleep(Duration::from_millis(1500)).await;

    // Peer retunes the scheduler: tighter threshold, quicker fallback
    let retuned = StreamParams {
        minimum_change: 5,
        slow_period_ms: 250,
        fast_period_ms: 40,
        fast_retention_ms: 400,
    };
    info!(?retuned, "writing new parameters");
    cmd_tx
        .send(StreamCommand::ConfigWrite(retuned.to_le_bytes().to_vec()))
        .await
        .context("actor stopped early")?;

    // A second sweep on another pot under the new timing
    info!("sweeping pot 4");
    for step in 0..=20 {
        pots.set(4, step * (RAW_FULL_SCALE / 20));
        sleep(Duration::from_millis(50)).await;
    }
    sleep(Duration::from_millis(1000)).await;

    info!(
        packets = transport.sent_count(),
        "demo finished, shutting down"
    );
    cmd_tx.send(StreamCommand::Shutdown).await.ok();
    actor.await.context("actor panicked")?;
    printer.await.context("printer panicked")?;

    Ok(())
}
