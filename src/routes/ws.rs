//! WebSocket upgrade + message loop. Each connection owns one private session that
//! lives as long as the socket. Every client message gets at least one JSON reply;
//! intents that call the model get a busy `state` first and a final `state` after.
//!
//! Model calls run on their own tasks and report back through an outbox channel, so
//! the loop keeps reading while a call is in flight and a repeated generate/submit is
//! answered with `outcome: "ignored"` instead of waiting in the socket buffer.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::error::TutorError;
use crate::gateway::ContentModel;
use crate::locale::{topic_label, MSG_EXPLAIN_FALLBACK, MSG_MISSING_API_KEY};
use crate::protocol::{to_view, ClientWsMessage, ServerWsMessage};
use crate::state::AppState;
use crate::workflow::{Outcome, Session};

/// Replies waiting to be written to the socket.
type Outbox = mpsc::UnboundedSender<ServerWsMessage>;

#[instrument(level = "info", skip_all)]
pub async fn ws_upgrade<M: ContentModel + 'static>(
  ws: WebSocketUpgrade,
  State(state): State<Arc<AppState<M>>>,
) -> impl IntoResponse {
  info!(target: "dl_tutor_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip_all)]
async fn handle_ws<M: ContentModel + 'static>(mut socket: WebSocket, state: Arc<AppState<M>>) {
  info!(target: "dl_tutor_backend", "WebSocket connected");
  let session = state.new_session();
  let (outbox, mut replies) = mpsc::unbounded_channel();

  loop {
    tokio::select! {
      incoming = socket.recv() => {
        let Some(Ok(msg)) = incoming else { break };
        match msg {
          Message::Text(txt) => handle_text(&txt, &state, &session, &outbox).await,
          Message::Ping(payload) => {
            if socket.send(Message::Pong(payload)).await.is_err() {
              break;
            }
          }
          Message::Close(_) => break,
          _ => {}
        }
      }
      Some(reply) = replies.recv() => {
        if send(&mut socket, &reply).await.is_err() {
          break;
        }
      }
    }
  }
  info!(target: "dl_tutor_backend", "WebSocket disconnected");
}

/// Parse one text frame and queue its replies on `outbox`.
async fn handle_text<M: ContentModel + 'static>(
  txt: &str,
  state: &Arc<AppState<M>>,
  session: &Arc<Session<M>>,
  outbox: &Outbox,
) {
  match serde_json::from_str::<ClientWsMessage>(txt) {
    Ok(incoming) => {
      debug!(target: "dl_tutor_backend", kind = message_kind(&incoming), "WS received");
      handle_client_ws(incoming, state, session, outbox).await;
    }
    Err(e) => emit(outbox, ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }),
  }
}

async fn handle_client_ws<M: ContentModel + 'static>(
  msg: ClientWsMessage,
  state: &Arc<AppState<M>>,
  session: &Arc<Session<M>>,
  outbox: &Outbox,
) {
  match msg {
    ClientWsMessage::Ping => emit(outbox, ServerWsMessage::Pong),

    ClientWsMessage::GetState => {
      let view = to_view(&session.snapshot().await);
      emit(outbox, ServerWsMessage::State { outcome: Outcome::Applied, view });
    }

    ClientWsMessage::Intent { intent } => {
      let begun = session.begin(intent).await;
      emit(outbox, ServerWsMessage::State { outcome: begun.outcome, view: to_view(&begun.state) });
      if let Some(effect) = begun.effect {
        let session = Arc::clone(session);
        let outbox = outbox.clone();
        // Not cancelled on disconnect: the session still has to return to idle.
        tokio::spawn(async move {
          let after = session.complete(effect).await;
          info!(target: "tutor", status = ?after.status, failed = after.last_error.is_some(), "WS intent completed");
          emit(&outbox, ServerWsMessage::State { outcome: Outcome::Applied, view: to_view(&after) });
        });
      }
    }

    ClientWsMessage::Explain { topic, concept } => {
      let state = Arc::clone(state);
      let outbox = outbox.clone();
      tokio::spawn(async move {
        let reply = match state.gateway.explain_concept(topic_label(topic), &concept).await {
          Ok(text) => ServerWsMessage::Explanation { text },
          Err(TutorError::MissingCredential) => ServerWsMessage::Error { message: MSG_MISSING_API_KEY.to_string() },
          Err(e) => {
            error!(target: "tutor", error = %e, "WS explain failed");
            ServerWsMessage::Error { message: MSG_EXPLAIN_FALLBACK.to_string() }
          }
        };
        emit(&outbox, reply);
      });
    }
  }
}

fn emit(outbox: &Outbox, msg: ServerWsMessage) {
  if outbox.send(msg).is_err() {
    debug!(target: "dl_tutor_backend", "WS closed before reply could be queued");
  }
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await.map_err(|e| {
    error!(target: "dl_tutor_backend", error = %e, "WS send error");
    e
  })
}

fn message_kind(msg: &ClientWsMessage) -> &'static str {
  match msg {
    ClientWsMessage::Ping => "ping",
    ClientWsMessage::GetState => "get_state",
    ClientWsMessage::Intent { .. } => "intent",
    ClientWsMessage::Explain { .. } => "explain",
  }
}
