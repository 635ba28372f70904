//! Eligibility checker: may a user start another borrow?

use crate::{
    config::LookupFailurePolicy,
    error::{AppError, AppResult},
    repository::Repository,
};

#[derive(Clone)]
pub struct EligibilityService {
    repository: Repository,
    on_lookup_failure: LookupFailurePolicy,
}

impl EligibilityService {
    pub fn new(repository: Repository, on_lookup_failure: LookupFailurePolicy) -> Self {
        Self {
            repository,
            on_lookup_failure,
        }
    }

    /// Returns true when the user holds a request that is neither returned nor rejected.
    ///
    /// A failed lookup is refused with `Unavailable` under the `deny` policy; under
    /// `allow` it is logged and the user is treated as having no active borrow.
    pub async fn check_eligibility(&self, user_id: i32) -> AppResult<bool> {
        match self.repository.borrows.has_active(user_id).await {
            Ok(active) => Ok(active),
            Err(e) if e.is_transient() => match self.on_lookup_failure {
                LookupFailurePolicy::Deny => {
                    tracing::error!("Eligibility lookup failed for user {}: {}", user_id, e);
                    Err(AppError::Unavailable(
                        "Borrow history is unavailable, try again later".to_string(),
                    ))
                }
                LookupFailurePolicy::Allow => {
                    tracing::warn!(
                        "Eligibility lookup failed for user {}, allowing: {}",
                        user_id,
                        e
                    );
                    Ok(false)
                }
            },
            Err(e) => Err(e),
        }
    }
}
