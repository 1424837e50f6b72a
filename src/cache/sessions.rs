use crate::cache::CacheService;
use redis::AsyncCommands;
use tracing::info;

fn revoked_key(jti: &str) -> String {
    format!("session:revoked:{}", jti)
}

impl CacheService {
    /// Отозвать сессию до истечения срока токена (logout)
    pub async fn revoke_session(&self, jti: &str, ttl_seconds: u64) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        // ключ живет не меньше секунды, иначе SET EX отвергнет значение
        let _: () = conn.set_ex(revoked_key(jti), 1, ttl_seconds.max(1)).await?;
        info!("Revoked session {}", jti);
        Ok(())
    }

    pub async fn is_session_revoked(&self, jti: &str) -> Result<bool, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        conn.exists(revoked_key(jti)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revocation_keys_are_namespaced() {
        assert_eq!(revoked_key("abc"), "session:revoked:abc");
    }
}
