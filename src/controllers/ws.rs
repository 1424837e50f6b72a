//! ws.rs
//!
//! Поток изменений для браузера с подпиской по таблицам.
//!
//! Клиент -> сервер:
//! ```json
//! { "type": "subscribe", "tables": ["bookings", "tours"] }
//! { "type": "unsubscribe", "tables": ["tours"] }
//! ```
//! Сервер -> клиент:
//! ```json
//! { "type": "subscribed", "tables": ["bookings"] }
//! { "type": "change", "version": 42, "event": { "kind": "upserted", ... } }
//! { "type": "resync" }
//! ```
//! Пустая подписка означает все таблицы. `resync` приходит, если клиент отстал
//! от потока и должен перечитать данные по HTTP.
//!
//! Агент получает только свои брони и расходы и не видит справочник агентов,
//! так же как в HTTP-списках. Удаления приходят без данных, только с ключом.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::middleware::AuthUser;
use crate::realtime::{ChangeEvent, Record, RecordSet, Table};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(handle))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { tables: Vec<Table> },
    Unsubscribe { tables: Vec<Table> },
    Ping,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<'a> {
    Subscribed { tables: Vec<Table> },
    Change { version: u64, event: &'a ChangeEvent },
    Resync,
    Pong,
    Error { message: String },
}

/// Подписки одного соединения.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Subscriptions {
    tables: HashSet<Table>,
}

impl Subscriptions {
    pub fn apply(&mut self, msg: &ClientMessage) {
        match msg {
            ClientMessage::Subscribe { tables } => self.tables.extend(tables.iter().copied()),
            ClientMessage::Unsubscribe { tables } => {
                for t in tables {
                    self.tables.remove(t);
                }
            }
            ClientMessage::Ping => {}
        }
    }

    pub fn wants(&self, event: &ChangeEvent) -> bool {
        self.tables.is_empty() || self.tables.iter().any(|t| event.touches(*t))
    }

    pub fn tables(&self) -> Vec<Table> {
        let mut tables: Vec<Table> = self.tables.iter().copied().collect();
        tables.sort_by_key(|t| t.as_str());
        tables
    }
}

/// Можно ли отправить событие этому пользователю.
pub fn visible_to(user: &AuthUser, event: &ChangeEvent) -> bool {
    if user.is_admin() {
        return true;
    }
    match event {
        ChangeEvent::Upserted { record } => match record {
            Record::Booking(b) => user.can_access(&b.agent_code),
            Record::Expense(e) => user.can_access(&e.agent_code),
            Record::Agent(_) => false,
            Record::Tour(_) | Record::CustomerType(_) => true,
        },
        ChangeEvent::Replaced { records: RecordSet::Agents(_) } => false,
        ChangeEvent::Deleted { table: Table::Agents, .. } => false,
        _ => true,
    }
}

// GET /api/ws?token=...
async fn handle(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Response {
    info!("WebSocket connection from {}", user.claims.sub);
    ws.on_upgrade(move |socket| handle_socket(socket, state, user))
}

fn encode(msg: &ServerMessage<'_>) -> Option<Message> {
    serde_json::to_string(msg).ok().map(|json| Message::Text(json.into()))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: AuthUser) {
    let (mut sender, mut receiver) = socket.split();
    let mut changes = state.feed.subscribe();
    let mut subs = Subscriptions::default();

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let Some(Ok(msg)) = incoming else { break };
                let reply = match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::Ping) => encode(&ServerMessage::Pong),
                        Ok(cmd) => {
                            subs.apply(&cmd);
                            debug!("{} subscriptions now {:?}", user.claims.sub, subs.tables());
                            encode(&ServerMessage::Subscribed { tables: subs.tables() })
                        }
                        Err(e) => encode(&ServerMessage::Error { message: e.to_string() }),
                    },
                    Message::Close(_) => break,
                    _ => None,
                };
                if let Some(reply) = reply {
                    if sender.send(reply).await.is_err() {
                        break;
                    }
                }
            }
            change = changes.recv() => {
                let out = match change {
                    Ok(change) if subs.wants(&change.event) && visible_to(&user, &change.event) => {
                        encode(&ServerMessage::Change { version: change.version, event: &change.event })
                    }
                    Ok(_) => None,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("WebSocket client {} lagged by {} changes", user.claims.sub, skipped);
                        encode(&ServerMessage::Resync)
                    }
                    Err(RecvError::Closed) => break,
                };
                if let Some(out) = out {
                    if sender.send(out).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    info!("WebSocket connection from {} closed", user.claims.sub);
}
