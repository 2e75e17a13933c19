//! WebSocket Connection Handler
//!
//! Upgrades `GET /chats/{chat_id}/subscribe` and drives a [`DeliverySession`]
//! over the socket. Inbound frames are ignored except Close.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Extension, Path, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::realtime::{
    DeliverySession, Envelope, EnvelopeSink, SessionEnd, SessionIdentity, SinkError,
};
use crate::application::services::ChatService;
use crate::infrastructure::metrics;
use crate::presentation::http::handlers::chat::chat_service;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::parse_id;
use crate::startup::AppState;

/// Outbound half of an upgraded socket.
pub struct WebSocketSink {
    sender: SplitSink<WebSocket, Message>,
}

impl WebSocketSink {
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self { sender }
    }

    async fn close(&mut self) {
        let _ = self.sender.send(Message::Close(None)).await;
        let _ = self.sender.close().await;
    }
}

#[async_trait]
impl EnvelopeSink for WebSocketSink {
    async fn send(&mut self, envelope: &Envelope) -> Result<(), SinkError> {
        let text = serde_json::to_string(envelope)?;
        self.sender
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))
    }
}

/// WebSocket upgrade handler
///
/// Membership is checked before the upgrade so a non-member gets a plain 404.
pub async fn subscribe_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<Response, AppError> {
    let chat_id = parse_id(&chat_id, "chat id")?;
    chat_service(&state).get_chat(chat_id, auth.user_id).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, chat_id, auth)))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, chat_id: i64, auth: AuthUser) {
    let connection_id = Uuid::new_v4();
    tracing::debug!(%connection_id, chat_id, user_id = auth.user_id, "New subscription stream");

    let (sender, receiver) = socket.split();
    let cancel = state.shutdown.child_token();
    let reader = tokio::spawn(watch_inbound(receiver, cancel.clone()));

    metrics::WEBSOCKET_CONNECTIONS_ACTIVE.inc();

    let mut sink = WebSocketSink::new(sender);
    let identity = SessionIdentity {
        user_id: auth.user_id,
        username: auth.username,
    };
    let mut session = DeliverySession::new(state.registry.clone(), chat_id, identity, cancel.clone());

    match session.run(&mut sink).await {
        Ok(SessionEnd::Cancelled) => {
            tracing::debug!(%connection_id, "Subscription stream cancelled");
        }
        Ok(SessionEnd::SubscriptionClosed) => {
            tracing::debug!(%connection_id, "Subscription closed by registry");
        }
        Err(e) => {
            tracing::warn!(%connection_id, error = %e, "Subscription stream failed");
        }
    }

    cancel.cancel();
    sink.close().await;
    let _ = reader.await;

    metrics::WEBSOCKET_CONNECTIONS_ACTIVE.dec();
    tracing::debug!(%connection_id, "Subscription stream closed");
}

/// Cancel the session once the client goes away.
async fn watch_inbound<S, E>(mut receiver: S, cancel: CancellationToken)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            frame = receiver.next() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            },
        }
    }
    cancel.cancel();
}
