//! Staff-to-borrower messaging

use validator::Validate;

use super::email::EmailService;
use crate::{
    error::AppResult,
    models::{
        borrow_request::RequestFilter,
        message::{BorrowerMessage, SendMessage},
        user::{Borrower, UserClaims},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct MessagesService {
    repository: Repository,
    email: EmailService,
}

impl MessagesService {
    pub fn new(repository: Repository, email: EmailService) -> Self {
        Self { repository, email }
    }

    /// Latest borrower snapshot on record, if the user ever borrowed
    async fn known_borrower(&self, borrower_id: i32) -> AppResult<Option<Borrower>> {
        let filter = RequestFilter {
            include_archived: true,
            ..RequestFilter::for_user(borrower_id)
        };
        let requests = self.repository.borrows.list(&filter).await?;
        Ok(requests.into_iter().last().map(|request| request.borrower))
    }

    /// Store a message and, when email is enabled, forward it
    pub async fn send(&self, sender: &UserClaims, message: SendMessage) -> AppResult<BorrowerMessage> {
        message.validate()?;

        let stored = self
            .repository
            .messages
            .create(message.borrower_id, sender.user_id, &message.message)
            .await?;
        tracing::info!(
            "User {} sent message {} to borrower {}",
            sender.user_id,
            stored.id,
            message.borrower_id
        );

        if self.email.is_enabled() {
            let known = self.known_borrower(message.borrower_id).await.unwrap_or_else(|e| {
                tracing::warn!("Borrower lookup for message {} failed: {}", stored.id, e);
                None
            });
            let address = message
                .borrower_email
                .clone()
                .or_else(|| known.as_ref().map(|b| b.email.clone()));

            match address {
                Some(to) => {
                    let name = known.as_ref().map(|b| b.full_name.as_str());
                    // Delivery is best effort; the stored message is the record
                    if let Err(e) = self.email.send_borrower_message(&to, name, &message.message).await {
                        tracing::warn!("Emailing message {} to {} failed: {}", stored.id, to, e);
                    }
                }
                None => tracing::debug!(
                    "No email address for borrower {}, message {} stored only",
                    message.borrower_id,
                    stored.id
                ),
            }
        }

        Ok(stored)
    }

    pub async fn list_for(&self, borrower_id: i32) -> AppResult<Vec<BorrowerMessage>> {
        self.repository.messages.list_for(borrower_id).await
    }
}
