//! Borrowing policy: quotas and loan periods, keyed by role and checkout flow

use chrono::{Duration, NaiveDate};

use crate::{
    config::{LoansConfig, RoleDays},
    error::{AppError, AppResult},
    models::enums::{CheckoutFlow, Role},
};

/// Validated loan policy table
#[derive(Debug, Clone)]
pub struct LoanPolicy {
    quota: RoleDays,
    catalog_periods: RoleDays,
    search_periods: RoleDays,
    renewal_window_days: u32,
}

fn for_role(values: &RoleDays, role: Role) -> u32 {
    match role {
        Role::Student => values.student,
        Role::Staff => values.staff,
    }
}

impl LoanPolicy {
    /// Build the policy, refusing tables where staff do not get longer loans
    pub fn new(config: &LoansConfig) -> AppResult<Self> {
        for (flow, periods) in [
            (CheckoutFlow::Catalog, &config.periods.catalog),
            (CheckoutFlow::Search, &config.periods.search),
        ] {
            if periods.student == 0 {
                return Err(AppError::Validation(format!(
                    "loans.periods.{}.student must be at least one day",
                    flow
                )));
            }
            if periods.staff <= periods.student {
                return Err(AppError::Validation(format!(
                    "loans.periods.{}: staff period ({}) must exceed student period ({})",
                    flow, periods.staff, periods.student
                )));
            }
        }
        if config.quota.student == 0 || config.quota.staff == 0 {
            return Err(AppError::Validation("loans.quota values must be positive".to_string()));
        }

        Ok(Self {
            quota: config.quota,
            catalog_periods: config.periods.catalog,
            search_periods: config.periods.search,
            renewal_window_days: config.renewal_window_days,
        })
    }

    /// Maximum simultaneous cart entries
    pub fn quota(&self, role: Role) -> u32 {
        for_role(&self.quota, role)
    }

    pub fn loan_period_days(&self, role: Role, flow: CheckoutFlow) -> u32 {
        match flow {
            CheckoutFlow::Catalog => for_role(&self.catalog_periods, role),
            CheckoutFlow::Search => for_role(&self.search_periods, role),
        }
    }

    pub fn compute_due_date(&self, borrow_date: NaiveDate, role: Role, flow: CheckoutFlow) -> NaiveDate {
        borrow_date + Duration::days(i64::from(self.loan_period_days(role, flow)))
    }

    pub fn renewal_window_days(&self) -> u32 {
        self.renewal_window_days
    }
}

impl Default for LoanPolicy {
    fn default() -> Self {
        let config = LoansConfig::default();
        Self {
            quota: config.quota,
            catalog_periods: config.periods.catalog,
            search_periods: config.periods.search,
            renewal_window_days: config.renewal_window_days,
        }
    }
}
