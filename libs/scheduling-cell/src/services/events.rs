use deadpool_redis::{Config as RedisConfig, Pool, Runtime};
use redis::AsyncCommands;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;

const APPOINTMENT_CHANNEL: &str = "appointment.changed";

/// Fire-and-forget change notifications over Redis pub/sub. Publishing is
/// best effort: a missing or unreachable Redis never fails a booking.
pub struct EventPublisher {
    pool: Option<Pool>,
}

impl EventPublisher {
    pub fn new(config: &AppConfig) -> Self {
        let pool = config.redis_url.as_ref().and_then(|url| {
            match RedisConfig::from_url(url).create_pool(Some(Runtime::Tokio1)) {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!("Failed to create Redis pool, events disabled: {}", e);
                    None
                }
            }
        });

        if pool.is_none() {
            debug!("Event publishing not configured");
        }

        Self { pool }
    }

    /// Publishes off the request path so callers never wait on Redis.
    pub fn appointment_changed(&self, appointment_id: Uuid, event: &str) {
        let Some(pool) = self.pool.clone() else {
            return;
        };

        let payload = json!({
            "event": event,
            "appointment_id": appointment_id,
            "occurred_at": chrono::Utc::now().to_rfc3339(),
        })
        .to_string();

        tokio::spawn(async move {
            let mut conn = match pool.get().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Redis unavailable, dropping event: {}", e);
                    return;
                }
            };

            if let Err(e) = conn
                .publish::<_, _, ()>(APPOINTMENT_CHANNEL, payload)
                .await
            {
                warn!("Failed to publish appointment event: {}", e);
            }
        });
    }
}
