use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use threadline_db::Database;
use threadline_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a WebSocket connection whose session was validated at the HTTP
/// upgrade layer.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    user_id: Uuid,
    username: String,
) {
    let (mut sender, mut receiver) = socket.split();

    info!("{} ({}) connected to gateway", username, user_id);

    let ready = GatewayEvent::Ready {
        user_id,
        username: username.clone(),
    };
    let Some(frame) = encode(&ready) else { return };
    if sender.send(frame).await.is_err() {
        return;
    }

    // Registering broadcasts the online list, this connection included
    let (conn_id, mut user_rx) = dispatcher.connect(user_id).await;

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward registry events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = user_rx.recv() => {
                    let Some(event) = event else { break };
                    let Some(frame) = encode(&event) else { continue };
                    if sender.send(frame).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let dispatcher_recv = dispatcher.clone();
    let username_recv = username.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => handle_command(&dispatcher_recv, &db, user_id, cmd).await,
                    Err(e) => {
                        let raw: String = text.chars().take(200).collect();
                        warn!("{} ({}) bad command: {} -- raw: {}", username_recv, user_id, e, raw);
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    dispatcher.disconnect(user_id, conn_id).await;
    info!("{} ({}) disconnected from gateway", username, user_id);
}

async fn handle_command(dispatcher: &Dispatcher, db: &Arc<Database>, user_id: Uuid, cmd: GatewayCommand) {
    match cmd {
        GatewayCommand::MarkMessagesSeen { conversation_id } => {
            if let Err(e) = mark_seen(db, dispatcher, user_id, conversation_id).await {
                warn!("{} failed to mark {} seen: {}", user_id, conversation_id, e);
            }
        }
    }
}

/// Mark the other participant's messages in `conversation_id` as seen by
/// `reader` and tell the other participant. Returns false when the
/// conversation is unknown or `reader` is not in it.
pub async fn mark_seen(
    db: &Arc<Database>,
    dispatcher: &Dispatcher,
    reader: Uuid,
    conversation_id: Uuid,
) -> anyhow::Result<bool> {
    let db = db.clone();
    let cid = conversation_id.to_string();
    let rid = reader.to_string();
    let outcome = tokio::task::spawn_blocking(move || db.mark_conversation_seen(&cid, &rid)).await??;

    let Some(outcome) = outcome else {
        warn!("{} acknowledged conversation {} they are not part of", reader, conversation_id);
        return Ok(false);
    };

    let other: Uuid = outcome.other_participant.parse()?;
    dispatcher
        .send_to_user(other, GatewayEvent::MessagesSeen { conversation_id })
        .await;
    Ok(true)
}

fn encode(event: &GatewayEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            warn!("Failed to encode gateway event: {}", e);
            None
        }
    }
}
