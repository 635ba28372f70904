//! Business logic services

pub mod availability;
pub mod cart;
pub mod catalog;
pub mod eligibility;
pub mod email;
pub mod lifecycle;
pub mod locks;
pub mod messages;
pub mod redis;

use crate::{config::AppConfig, error::AppResult, policy::LoanPolicy, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub availability: availability::AvailabilityService,
    pub eligibility: eligibility::EligibilityService,
    pub cart: cart::CartService,
    pub lifecycle: lifecycle::LifecycleService,
    pub messages: messages::MessagesService,
    pub repository: Repository,
}

impl Services {
    /// Create all services over the given repository; fails on an invalid loan policy
    pub fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let policy = LoanPolicy::new(&config.loans)?;

        let availability = availability::AvailabilityService::new(repository.clone());
        let eligibility = eligibility::EligibilityService::new(
            repository.clone(),
            config.eligibility.on_lookup_failure,
        );

        Ok(Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            cart: cart::CartService::new(
                repository.clone(),
                eligibility.clone(),
                availability.clone(),
                policy.clone(),
            ),
            lifecycle: lifecycle::LifecycleService::new(
                repository.clone(),
                policy.renewal_window_days(),
            ),
            messages: messages::MessagesService::new(
                repository.clone(),
                email::EmailService::new(config.email.clone()),
            ),
            availability,
            eligibility,
            repository,
        })
    }
}
