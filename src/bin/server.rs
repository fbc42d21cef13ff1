use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use quadis_rust_server::config::ServerConfig;
use quadis_rust_server::connection::{connection_pair, ConnectionPeer};
use quadis_rust_server::constants::CONNECTION_QUEUE;
use quadis_rust_server::error::RoomError;
use quadis_rust_server::room::Room;
use quadis_rust_server::server_protocol::{parse_console_command, ConsoleCommand};
use quadis_rust_server::server_utils::{is_valid_room_id, make_room_id, make_seed};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type SharedState = Arc<Mutex<ServerState>>;

struct ServerState {
    rooms: HashMap<String, Arc<Room>>,
    config: ServerConfig,
}

impl ServerState {
    fn new(config: ServerConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let bind_addr = config.bind_addr();
    let state = Arc::new(Mutex::new(ServerState::new(config)));
    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind server socket on {bind_addr}"))?;
    info!(%bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server runtime failed")?;

    let rooms: Vec<Arc<Room>> = state.lock().await.rooms.drain().map(|(_, room)| room).collect();
    for room in rooms {
        room.shutdown().await;
    }
    info!("server stopped");
    Ok(())
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/rooms", post(create_room))
        .route("/rooms/{room_id}", get(get_room))
        .route("/rooms/{room_id}/start", post(start_room))
        .route("/rooms/{room_id}/socket", get(ws_handler))
        .route("/rooms/{room_id}/console", post(console_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
    }
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn create_room(State(state): State<SharedState>) -> impl IntoResponse {
    let mut guard = state.lock().await;
    let mut room_id = make_room_id();
    while guard.rooms.contains_key(&room_id) {
        room_id = make_room_id();
    }
    let room = Room::new(room_id.clone(), guard.config.room_settings(), make_seed());
    guard.rooms.insert(room_id.clone(), room.clone());
    spawn_curfew(state.clone(), room, guard.config.room_curfew());

    (StatusCode::CREATED, Json(json!({ "roomId": room_id })))
}

async fn get_room(State(state): State<SharedState>, Path(room_id): Path<String>) -> StatusCode {
    match find_room(&state, &room_id).await {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn start_room(State(state): State<SharedState>, Path(room_id): Path<String>) -> StatusCode {
    let Some(room) = find_room(&state, &room_id).await else {
        return StatusCode::NOT_FOUND;
    };
    match room.start().await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(err) => room_error_status(&err),
    }
}

async fn console_handler(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    body: String,
) -> Response {
    if !state.lock().await.config.debug_console {
        return StatusCode::NOT_FOUND.into_response();
    }
    let Some(room) = find_room(&state, &room_id).await else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let Some(command) = parse_console_command(&body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid console command" })),
        )
            .into_response();
    };

    let result = match command {
        ConsoleCommand::SetField { game_id, words } => room.set_field(&game_id, &words).await,
    };
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => (
            room_error_status(&err),
            Json(json!({ "error": err.to_string() })),
        )
            .into_response(),
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
) -> Response {
    let Some(room) = find_room(&state, &room_id).await else {
        return StatusCode::NOT_FOUND.into_response();
    };
    ws.on_upgrade(move |socket| handle_socket(state, room, socket))
}

async fn handle_socket(state: SharedState, room: Arc<Room>, socket: WebSocket) {
    let (connection, peer) = connection_pair(CONNECTION_QUEUE);
    let ConnectionPeer {
        inbound,
        mut outbound,
    } = peer;
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(payload) = outbound.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let reader = tokio::spawn(async move {
        while let Some(received) = ws_receiver.next().await {
            let Ok(message) = received else {
                break;
            };
            let text = match message {
                Message::Text(raw) => raw.to_string(),
                Message::Binary(raw) => match String::from_utf8(raw.to_vec()) {
                    Ok(text) => text,
                    Err(_) => continue,
                },
                Message::Close(_) => break,
                _ => continue,
            };
            if inbound.send(text).await.is_err() {
                break;
            }
        }
    });

    match room.join(connection).await {
        Ok(session) => {
            if let Err(err) = reader.await {
                warn!(room_id = %room.id(), error = %err, "socket reader failed");
            }
            room.leave(session.id()).await;
        }
        Err(err) => {
            debug!(room_id = %room.id(), error = %err, "socket rejected");
            reader.abort();
        }
    }
    writer.abort();
    if let Err(err) = writer.await {
        if !err.is_cancelled() {
            warn!(room_id = %room.id(), error = %err, "socket writer failed");
        }
    }

    if room.is_empty() && forget_room(&state, &room).await {
        info!(room_id = %room.id(), "empty room closed");
        room.shutdown().await;
    }
}

fn spawn_curfew(state: SharedState, room: Arc<Room>, curfew: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(curfew).await;
        if forget_room(&state, &room).await {
            info!(room_id = %room.id(), "room curfew reached");
        }
        room.shutdown().await;
    });
}

async fn find_room(state: &SharedState, room_id: &str) -> Option<Arc<Room>> {
    if !is_valid_room_id(room_id) {
        return None;
    }
    state.lock().await.rooms.get(room_id).cloned()
}

async fn forget_room(state: &SharedState, room: &Arc<Room>) -> bool {
    let mut guard = state.lock().await;
    match guard.rooms.get(room.id()) {
        Some(current) if Arc::ptr_eq(current, room) => {
            guard.rooms.remove(room.id());
            true
        }
        _ => false,
    }
}

fn room_error_status(err: &RoomError) -> StatusCode {
    match err {
        RoomError::SessionNotFound(_) | RoomError::ShuttingDown => StatusCode::NOT_FOUND,
        RoomError::Codec(_) | RoomError::Handshake(_) => StatusCode::BAD_REQUEST,
    }
}

#[cfg(test)]
mod tests {
    use quadis_rust_server::error::{CodecError, HandshakeError};
    use quadis_rust_server::room::RoomSettings;

    use super::*;

    fn state() -> SharedState {
        Arc::new(Mutex::new(ServerState::new(ServerConfig::parse_from([
            "server",
        ]))))
    }

    #[test]
    fn room_errors_map_to_statuses() {
        assert_eq!(
            room_error_status(&RoomError::SessionNotFound("game_1".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            room_error_status(&RoomError::ShuttingDown),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            room_error_status(&RoomError::Codec(CodecError::NotEnoughWords {
                needed: 200,
                got: 16
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            room_error_status(&RoomError::Handshake(HandshakeError::Timeout)),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn find_room_rejects_malformed_ids() {
        let state = state();
        let room = Room::new("abc".to_string(), RoomSettings::default(), 1);
        state
            .lock()
            .await
            .rooms
            .insert("abc".to_string(), room.clone());

        assert!(find_room(&state, "abc").await.is_some());
        assert!(find_room(&state, "../abc").await.is_none());
        assert!(find_room(&state, "missing").await.is_none());
        room.shutdown().await;
    }

    #[tokio::test]
    async fn forget_room_only_removes_the_same_instance() {
        let state = state();
        let old = Room::new("abc".to_string(), RoomSettings::default(), 1);
        let current = Room::new("abc".to_string(), RoomSettings::default(), 2);
        state
            .lock()
            .await
            .rooms
            .insert("abc".to_string(), current.clone());

        assert!(!forget_room(&state, &old).await);
        assert!(find_room(&state, "abc").await.is_some());
        assert!(forget_room(&state, &current).await);
        assert!(find_room(&state, "abc").await.is_none());
        old.shutdown().await;
        current.shutdown().await;
    }

    #[tokio::test]
    async fn curfew_closes_and_forgets_the_room() {
        let state = state();
        let room = Room::new("abc".to_string(), RoomSettings::default(), 1);
        state
            .lock()
            .await
            .rooms
            .insert("abc".to_string(), room.clone());

        spawn_curfew(state.clone(), room.clone(), Duration::from_millis(10));
        tokio::time::timeout(Duration::from_secs(2), async {
            while !room.is_closed() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("room closed in time");
        assert!(find_room(&state, "abc").await.is_none());
    }
}
