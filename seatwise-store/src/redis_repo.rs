use redis::RedisResult;

/// Redis-backed fixed-window request counter.
#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// `true` while `key` has been hit at most `limit` times in its window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

/// Key for `client` in the window containing `now_secs`.
pub fn rate_limit_key(client: &str, now_secs: i64, window_seconds: i64) -> String {
    format!("ratelimit:{}:{}", client, now_secs.div_euclid(window_seconds.max(1)))
}
