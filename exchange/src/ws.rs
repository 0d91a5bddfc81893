use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::token::TokenService;
use crate::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(25);
const MAX_MISSED_PONGS: u32 = 2;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    access_token: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsQuery>,
) -> Response {
    let user_id = params.access_token.as_deref().and_then(|token| {
        TokenService::verify_access_token(token, &state.config.secret_key)
            .and_then(|claims| claims.sub.parse::<Uuid>().ok())
    });
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

/// A single `/ws` connection: anonymous connections receive global events only
/// (trades, book updates); authenticated connections additionally receive
/// WalletUpdate events scoped to their own user id.
async fn handle_socket(mut socket: WebSocket, state: AppState, user_id: Option<Uuid>) {
    let mut events = state.event_bus.subscribe();
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // the first tick fires immediately; discard it
    let mut missed_pongs = 0u32;

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if let Some(target) = event.target_user() {
                            if Some(target) != user_id {
                                continue;
                            }
                        }
                        if socket.send(Message::Text(event.to_frame())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                if missed_pongs >= MAX_MISSED_PONGS {
                    tracing::info!("closing websocket: missed {} consecutive pongs", missed_pongs);
                    break;
                }
                if socket.send(Message::Text("ping".into())).await.is_err() {
                    break;
                }
                missed_pongs += 1;
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) if text.trim() == "pong" => {
                        missed_pongs = 0;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}
