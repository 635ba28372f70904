//! Borrower messages repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::MessageStore;
use crate::{error::AppResult, models::message::BorrowerMessage};

#[derive(Clone)]
pub struct MessagesRepository {
    pool: Pool<Postgres>,
}

impl MessagesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessagesRepository {
    async fn create(&self, borrower_id: i32, sender_id: i32, body: &str) -> AppResult<BorrowerMessage> {
        let message = sqlx::query_as::<_, BorrowerMessage>(
            r#"
            INSERT INTO borrower_messages (borrower_id, sender_id, body)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(borrower_id)
        .bind(sender_id)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    async fn list_for(&self, borrower_id: i32) -> AppResult<Vec<BorrowerMessage>> {
        let messages = sqlx::query_as::<_, BorrowerMessage>(
            "SELECT * FROM borrower_messages WHERE borrower_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }
}
