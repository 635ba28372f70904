//! Cart repository backed by Redis

use async_trait::async_trait;

use super::CartStore;
use crate::{error::AppResult, models::cart::Cart, services::redis::RedisService};

#[derive(Clone)]
pub struct RedisCartRepository {
    redis: RedisService,
    ttl_seconds: u64,
}

impl RedisCartRepository {
    pub fn new(redis: RedisService, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    fn key(user_id: i32) -> String {
        format!("cart:{}", user_id)
    }
}

#[async_trait]
impl CartStore for RedisCartRepository {
    async fn load(&self, user_id: i32) -> AppResult<Cart> {
        Ok(self
            .redis
            .get_json::<Cart>(&Self::key(user_id))
            .await?
            .unwrap_or_else(|| Cart::empty(user_id)))
    }

    async fn save(&self, cart: &Cart) -> AppResult<()> {
        if cart.is_empty() {
            return self.clear(cart.user_id).await;
        }
        // Each write refreshes the session expiry
        self.redis
            .set_json_ex(&Self::key(cart.user_id), cart, self.ttl_seconds)
            .await
    }

    async fn clear(&self, user_id: i32) -> AppResult<()> {
        self.redis.delete(&Self::key(user_id)).await
    }
}
