use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{State, WebSocketUpgrade, ws::{Message, WebSocket}},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, warn};

use crate::{
    chat::{ChatService, ConnectionSession, SessionPhase},
    error::{ChatError, ChatResult},
    model::{ChatPayload, MessageType},
};

#[derive(Serialize)]
struct ErrorFrame {
    error: String,
}

/// Where the outcome of one inbound frame goes.
#[derive(Debug, PartialEq)]
enum Outbound {
    /// Everyone in the payload's room.
    Room(ChatPayload),
    /// Only the socket that sent the frame.
    Sender(ChatPayload),
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    State(chat): State<Arc<ChatService>>,
    State(tx): State<broadcast::Sender<ChatPayload>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |stream| serve_socket(stream, chat, tx))
}

async fn serve_socket(stream: WebSocket, chat: Arc<ChatService>, tx: broadcast::Sender<ChatPayload>) {
    let mut session = ConnectionSession::new();
    let (room_tx, room_rx) = watch::channel(None::<String>);
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Message>();
    let mut rx = tx.subscribe();
    let (mut sender, mut receiver) = stream.split();
    debug!(session = %session.id(), "socket connected");

    let forward_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                received = rx.recv() => match received {
                    Ok(payload) => {
                        if room_rx.borrow().as_deref() != Some(payload.room_code.as_str()) {
                            continue;
                        }
                        match serde_json::to_string(&payload) {
                            Ok(json) => Message::Text(json.into()),
                            Err(_) => continue,
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "socket fell behind the room broadcast");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(frame) => frame,
                    None => break,
                },
            };

            if sender.send(frame).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = receiver.next().await {
        let payload: ChatPayload = match frame {
            Message::Text(text) => match serde_json::from_str(text.as_str()) {
                Ok(payload) => payload,
                Err(e) => {
                    let _ = reply_tx.send(error_frame(&e.to_string()));
                    continue;
                }
            },
            Message::Close(_) => break,
            _ => continue,
        };

        let outcome = handle_event(&chat, &mut session, payload).await;
        room_tx.send_replace(session.room_code().map(str::to_owned));

        match outcome {
            Ok(Outbound::Room(payload)) => {
                let _ = tx.send(payload);
            }
            Ok(Outbound::Sender(payload)) => {
                if let Ok(json) = serde_json::to_string(&payload) {
                    let _ = reply_tx.send(Message::Text(json.into()));
                }
            }
            Err(ChatError::SessionAttach) => break,
            Err(e) => {
                warn!(session = %session.id(), error = %e, "chat event failed");
                let _ = reply_tx.send(error_frame(&e.to_string()));
            }
        }
    }

    // dropped without LEAVE: the room still hears about it
    if let SessionPhase::Active(_) = session.phase() {
        let farewell = chat.leave(&mut session);
        match chat.send(farewell).await {
            Ok(sent) => {
                let _ = tx.send(sent);
            }
            Err(e) => warn!(session = %session.id(), error = %e, "could not record departure"),
        }
    }

    session.disconnect();
    forward_task.abort();
    debug!(session = %session.id(), "socket closed");
}

async fn handle_event(
    chat: &ChatService,
    session: &mut ConnectionSession,
    payload: ChatPayload,
) -> ChatResult<Outbound> {
    match payload.kind {
        MessageType::Enter => {
            let greeting = chat.enter(payload, session).await?;
            Ok(Outbound::Room(chat.send(greeting).await?))
        }
        MessageType::Talk => Ok(Outbound::Room(chat.send(payload).await?)),
        MessageType::Leave => {
            let entered = matches!(session.phase(), SessionPhase::Active(_));
            let farewell = chat.leave(session);
            if entered {
                Ok(Outbound::Room(chat.send(farewell).await?))
            } else {
                Ok(Outbound::Sender(farewell))
            }
        }
    }
}

fn error_frame(error: &str) -> Message {
    let json = serde_json::to_string(&ErrorFrame { error: error.to_owned() })
        .unwrap_or_else(|_| r#"{"error":"unknown"}"#.to_owned());
    Message::Text(json.into())
}
