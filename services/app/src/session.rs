//! Per-session runtime: wires one cloud connection to one `JokeSession`.

use crate::{AppState, SessionRequest};
use anyhow::{Context, Result};
use augmentos_client::types::{ServerEvent, StreamData, StreamType};
use dadwall_core::Command;
use dadwall_core::session_state::{JokeSession, SessionEvent, SessionTiming, drive_session};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

/// Runs one glasses session to completion. Never returns an error to the
/// spawner; failures are logged here.
pub async fn run(state: Arc<AppState>, request: SessionRequest) {
    let session_id = request.session_id.clone();
    if let Err(e) = run_inner(state, request).await {
        error!("Session {} failed: {:?}", session_id, e);
    }
}

async fn run_inner(state: Arc<AppState>, request: SessionRequest) -> Result<()> {
    let ws_url = request
        .augment_os_websocket_url
        .clone()
        .unwrap_or_else(|| state.config.augmentos_ws_url.clone());

    let client_config = augmentos_client::Config::builder()
        .with_base_url(&ws_url)
        .with_package_name(&state.config.package_name)
        .with_api_key(&state.config.augmentos_api_key)
        .build();

    let mut glasses = augmentos_client::connect(client_config)
        .await
        .context("Failed to connect to the AugmentOS cloud")?;

    let mut server_events = glasses
        .server_events()
        .await
        .context("Failed to get server events channel")?;

    glasses
        .init_connection(&request.session_id)
        .await
        .context("Failed to authenticate the cloud connection")?;
    glasses
        .update_subscriptions(vec![StreamType::Transcription])
        .await
        .context("Failed to subscribe to transcriptions")?;

    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(64);
    let (command_tx, mut command_rx) = mpsc::channel::<Command>(32);

    let session = JokeSession::new(
        request.session_id.clone(),
        request.user_id.clone(),
        state.config.max_user_jokes,
        SessionTiming::default(),
        state.counters.clone(),
        event_tx.clone(),
        command_tx,
    );

    // Display executor: the only task that talks back to the glasses. Ends
    // when the session drops its command channel.
    let display = tokio::spawn(async move {
        while let Some(Command::ShowTextWall(text)) = command_rx.recv().await {
            if let Err(e) = glasses.show_text_wall(&text).await {
                error!("Failed to display text wall: {:?}", e);
            }
        }
    });

    // Forwarder: cloud events become session inputs.
    let forwarder_session_id = request.session_id.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            match server_events.recv().await {
                Ok(ServerEvent::ConnectionAck(_)) => {
                    info!("Session {} connected to the cloud", forwarder_session_id);
                }
                Ok(ServerEvent::ConnectionError(e)) => {
                    error!(
                        "Session {} connection error: {}",
                        forwarder_session_id, e.message
                    );
                }
                Ok(ServerEvent::DataStream(StreamData::Transcription(data))) => {
                    if event_tx
                        .send(SessionEvent::Transcription(data))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Ok(ServerEvent::Close { reason }) => {
                    info!(
                        "Session {} socket closed: {:?}",
                        forwarder_session_id, reason
                    );
                    let _ = event_tx.send(SessionEvent::Disconnected).await;
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    let _ = event_tx.send(SessionEvent::Disconnected).await;
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        "Session {} lagged, skipped {} events",
                        forwarder_session_id, skipped
                    );
                }
            }
        }
    });

    drive_session(session, state.generator.clone(), event_rx).await;

    // Disconnect reached the session; the helper tasks drain on their own
    // once the channels close.
    let _ = tokio::join!(display, forwarder);
    Ok(())
}
