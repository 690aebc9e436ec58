//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a generation WebSocket.
//! The connection runs at most one generation at a time; previews, the saved
//! study set, and errors all travel back over the same socket.

use crate::web::{
    generation_task::run_generation,
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use study_set_core::prompt::GenerationRequest;
use study_set_core::session::PreviewSnapshot;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// A generation owned by the connection.
struct RunningGeneration {
    handle: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

impl RunningGeneration {
    fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New generation WebSocket connection established.");

    // Every outgoing message goes through one channel so the preview observer
    // never has to await the socket.
    let (sender, mut receiver) = socket.split();
    let (outbox, inbox) = mpsc::unbounded_channel::<ServerMessage>();
    let writer = tokio::spawn(forward_messages(sender, inbox));

    let mut running: Option<RunningGeneration> = None;

    // --- Main Message Loop ---
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                handle_text_message(text.as_str(), &app_state, &outbox, &mut running);
            }
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // --- Cleanup ---
    if let Some(generation) = running.take() {
        generation.cancellation_token.cancel();
        if let Err(e) = generation.handle.await {
            error!("Generation task ended abnormally: {:?}", e);
        }
    }
    drop(outbox);
    if let Err(e) = writer.await {
        error!("WebSocket writer ended abnormally: {:?}", e);
    }
    info!("WebSocket connection closed.");
}

/// Helper function to handle the logic for different `ClientMessage` variants.
fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    outbox: &UnboundedSender<ServerMessage>,
    running: &mut Option<RunningGeneration>,
) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Generate { request }) => {
            if running.as_ref().is_some_and(RunningGeneration::is_active) {
                warn!("Generate received while a generation is running.");
                send(outbox, ServerMessage::Error {
                    message: "A generation is already in progress.".to_string(),
                });
                return;
            }
            let cancellation_token = CancellationToken::new();
            let handle = tokio::spawn(generate_and_save(
                app_state.clone(),
                request,
                cancellation_token.clone(),
                outbox.clone(),
            ));
            *running = Some(RunningGeneration { handle, cancellation_token });
        }
        Ok(ClientMessage::Cancel) => match running.as_ref() {
            Some(generation) if generation.is_active() => {
                info!("Cancel message received. Cancelling generation.");
                generation.cancellation_token.cancel();
            }
            _ => warn!("Cancel received with no generation running."),
        },
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            send(outbox, ServerMessage::Error {
                message: format!("Unrecognised message: {}", e),
            });
        }
    }
}

/// Runs one generation and stores the result, reporting the outcome to the client.
async fn generate_and_save(
    app_state: Arc<AppState>,
    request: GenerationRequest,
    cancellation_token: CancellationToken,
    outbox: UnboundedSender<ServerMessage>,
) {
    let previews = outbox.clone();
    let outcome = run_generation(
        app_state.generator.as_ref(),
        &request,
        cancellation_token,
        app_state.config.generation_deadline,
        move |snapshot: &PreviewSnapshot| send(&previews, ServerMessage::from(snapshot)),
    )
    .await;

    let message = match outcome {
        Ok(result) => match app_state.store.persist(result.into()).await {
            Ok(study_set) => {
                info!(id = %study_set.id, "Generated study set saved.");
                ServerMessage::Saved { study_set }
            }
            Err(e) => {
                error!("Failed to save generated study set: {:?}", e);
                ServerMessage::Error {
                    message: "Failed to save the generated study set.".to_string(),
                }
            }
        },
        Err(e) => {
            warn!("Generation failed: {}", e);
            ServerMessage::Error { message: e.to_string() }
        }
    };
    send(&outbox, message);
}

/// Drains the outbox into the socket until every sender is gone.
async fn forward_messages(
    mut sender: SplitSink<WebSocket, Message>,
    mut inbox: UnboundedReceiver<ServerMessage>,
) {
    while let Some(message) = inbox.recv().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize server message: {}", e);
                continue;
            }
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            error!("Failed to send message to client. Closing writer.");
            break;
        }
    }
}

fn send(outbox: &UnboundedSender<ServerMessage>, message: ServerMessage) {
    if outbox.send(message).is_err() {
        warn!("Dropping server message; the connection is gone.");
    }
}
