// WebSocket handler for matchmaking and live match reveal.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use serde::Deserialize;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use super::AppState;
use crate::lobby::{broadcast_reveal, LobbyOutcome, MatchMode};
use crate::metrics;
use crate::queue::{notify, QueueNotice, ReplySink};

#[derive(Deserialize)]
pub struct MatchParams {
    pub scope: String,
    pub player: String,
    pub mode: Option<MatchMode>,
}

/// WebSocket upgrade handler: `/ws/match?scope=..&player=..&mode=ranked|friendly`.
pub async fn ws_match(
    ws: WebSocketUpgrade,
    Query(params): Query<MatchParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, params))
}

async fn handle_ws(mut socket: WebSocket, state: AppState, params: MatchParams) {
    metrics::CONNECTED_WEBSOCKETS.inc();
    let mode = params.mode.unwrap_or(MatchMode::Ranked);
    let (tx, mut rx) = mpsc::unbounded_channel::<QueueNotice>();
    let sink: Arc<dyn ReplySink> = Arc::new(tx);

    let outcome = state
        .matches
        .find_match(&params.scope, mode, &params.player, sink.clone())
        .await;

    match outcome {
        Err(e) => {
            notify(
                sink.as_ref(),
                QueueNotice::Error {
                    message: e.to_string(),
                },
            );
        }
        Ok(LobbyOutcome::AlreadyQueued) => {
            notify(
                sink.as_ref(),
                QueueNotice::Error {
                    message: "already waiting for a match".to_string(),
                },
            );
        }
        Ok(LobbyOutcome::Waiting(_)) => {}
        Ok(LobbyOutcome::Played { opponent, report }) => {
            notify(
                sink.as_ref(),
                QueueNotice::MatchFound {
                    opponent: opponent.player_id.clone(),
                },
            );
            // The reveal keeps running for the opponent if this socket goes away.
            let sinks = vec![opponent.sink.clone(), sink.clone()];
            let pace = state.reveal_interval;
            tokio::spawn(async move {
                broadcast_reveal(&report, &sinks, pace).await;
            });
        }
    }
    drop(sink);

    let client_left = forward_notices(&mut socket, &mut rx).await;
    if client_left && state.matches.queue().leave(&params.scope, mode, &params.player) {
        tracing::info!(player = %params.player, "Client disconnected while queued");
    }
    let _ = socket.send(Message::Close(None)).await;
    metrics::CONNECTED_WEBSOCKETS.dec();
}

/// Forward notices to the client until a terminal notice is sent.
/// Returns true if the client went away first.
async fn forward_notices(socket: &mut WebSocket, rx: &mut UnboundedReceiver<QueueNotice>) -> bool {
    loop {
        tokio::select! {
            notice = rx.recv() => {
                let Some(notice) = notice else {
                    return false;
                };
                let terminal = notice.is_terminal();
                match serde_json::to_string(&notice) {
                    Ok(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            return true;
                        }
                    }
                    Err(e) => tracing::error!("Failed to serialize notice: {e}"),
                }
                if terminal {
                    return false;
                }
            }
            // Client message (we mostly ignore, but detect disconnect)
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        return true;
                    }
                    _ => {}
                }
            }
        }
    }
}
