//! realtime
//!
//! Лента изменений. Каждая запись в хранилище публикуется как `ChangeEvent` в канал
//! Redis. Слушатель каждого экземпляра сервиса применяет события к своему `AppStore`
//! точечно и пересылает их WebSocket-клиентам через локальный broadcast.
//! Полная перезагрузка нужна только при старте, при `Invalidated`, при нечитаемом
//! сообщении и по таймеру.

pub mod events;

use futures::StreamExt;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::gateway::Gateway;
use crate::redis_client::RedisClient;
use crate::store::{Action, AppStore, Outcome};

pub use events::{ChangeEvent, Record, RecordSet, Table};

const LOCAL_CHANNEL_CAPACITY: usize = 1024;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Изменение вместе с версией снимка, которую оно породило на этом экземпляре.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedChange {
    pub version: u64,
    pub event: ChangeEvent,
}

/// Сообщение в канале Redis. `origin` позволяет не применять свои же события дважды.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub origin: Uuid,
    pub event: ChangeEvent,
}

pub struct ChangeFeed {
    instance_id: Uuid,
    channel: String,
    redis: RedisClient,
    gateway: Gateway,
    store: Arc<AppStore>,
    local: broadcast::Sender<VersionedChange>,
}

impl ChangeFeed {
    pub fn new(redis: RedisClient, channel: String, gateway: Gateway, store: Arc<AppStore>) -> Self {
        let (local, _) = broadcast::channel(LOCAL_CHANNEL_CAPACITY);
        Self {
            instance_id: Uuid::new_v4(),
            channel,
            redis,
            gateway,
            store,
            local,
        }
    }

    pub fn store(&self) -> &Arc<AppStore> {
        &self.store
    }

    /// Поток событий для WebSocket-клиентов этого экземпляра.
    pub fn subscribe(&self) -> broadcast::Receiver<VersionedChange> {
        self.local.subscribe()
    }

    /// Применить изменение локально и разослать остальным экземплярам.
    /// Запись в БД к этому моменту уже прошла, поэтому сбой Redis только логируется.
    pub async fn publish(&self, event: ChangeEvent) {
        self.apply(event.clone()).await;

        let envelope = Envelope { origin: self.instance_id, event };
        let payload = match serde_json::to_string(&envelope) {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to encode change event: {:?}", e);
                return;
            }
        };

        let mut conn = self.redis.conn.clone();
        let published: Result<i64, _> = conn.publish(&self.channel, payload).await;
        if let Err(e) = published {
            warn!("Failed to publish change to {}: {:?}", self.channel, e);
        }
    }

    async fn apply(&self, event: ChangeEvent) {
        let (outcome, version) = self.store.dispatch_versioned(Action::Changed(event.clone())).await;
        let _ = self.local.send(VersionedChange { version, event });
        if outcome == Outcome::ResyncRequired {
            if let Err(e) = self.resync().await {
                error!("Resync after invalidation failed: {:?}", e);
            }
        }
    }

    /// Полная загрузка всех таблиц. При ошибке состояние остается прежним.
    pub async fn resync(&self) -> Result<Outcome, sqlx::Error> {
        let pending = self.store.start_fetch().await;
        let seq = pending.seq();
        let outcome = pending.finish(self.gateway.fetch_all().await).await?;
        debug!("Resync #{} finished: {:?}", seq, outcome);
        Ok(outcome)
    }

    /// Слушает канал Redis до остановки процесса, переподключаясь при обрыве.
    pub async fn run_listener(self: Arc<Self>) {
        loop {
            match self.listen_once().await {
                Ok(()) => warn!("Change feed subscription ended, reconnecting"),
                Err(e) => error!("Change feed subscription failed: {:?}", e),
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
            // пока не были подписаны, могли пропустить изменения
            if let Err(e) = self.resync().await {
                error!("Resync after reconnect failed: {:?}", e);
            }
        }
    }

    async fn listen_once(&self) -> redis::RedisResult<()> {
        let mut pubsub = self.redis.pubsub().await?;
        pubsub.subscribe(&self.channel).await?;
        info!("Subscribed to change feed {}", self.channel);

        let mut messages = pubsub.on_message();
        while let Some(msg) = messages.next().await {
            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(e) => {
                    warn!("Unreadable change payload: {:?}", e);
                    continue;
                }
            };
            self.handle_payload(&payload).await;
        }
        Ok(())
    }

    async fn handle_payload(&self, payload: &str) {
        match serde_json::from_str::<Envelope>(payload) {
            Ok(envelope) if envelope.origin == self.instance_id => {}
            Ok(envelope) => {
                debug!("Change from {}: {:?}", envelope.origin, envelope.event.tables());
                self.apply(envelope.event).await;
            }
            Err(e) => {
                warn!("Undecodable change event ({}), falling back to full resync", e);
                self.apply(ChangeEvent::Invalidated).await;
            }
        }
    }

    /// Периодическая полная пересинхронизация (пропущенные сообщения pub/sub не доставляются повторно).
    pub async fn run_periodic_resync(self: Arc<Self>, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = self.resync().await {
                error!("Periodic resync failed: {:?}", e);
            }
        }
    }
}
