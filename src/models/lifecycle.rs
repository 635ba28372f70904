//! Borrow request lifecycle rules.
//!
//! `plan` is pure: given a request and a command it returns the updated request and
//! the availability effect on its book. Stores apply both inside one transaction.
//!
//! | command          | from                              | to                    | book      |
//! |------------------|-----------------------------------|-----------------------|-----------|
//! | accept           | pending, processing, overdue      | accepted              | borrowed  |
//! | reject           | any active                        | rejected (archived)   | available |
//! | mark overdue     | accepted                          | overdue               | -         |
//! | request return   | accepted, overdue                 | processing            | -         |
//! | accept return    | accepted, overdue, processing     | returned (archived)   | available |
//! | request renewal  | accepted, renewal none/rejected   | renewal requested     | -         |
//! | accept renewal   | renewal requested                 | renewed, new due date | -         |
//! | reject renewal   | renewal requested                 | renewal rejected      | -         |
//!
//! Renewal commands are refused once a request is rejected or returned, and closing a
//! request refuses any renewal still under review.
//!
//! A command whose target state already holds is a no-op, so retries are safe.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::borrow_request::BorrowRequest;
use super::enums::{BookStatus, RenewalStatus, RequestStatus};
use crate::error::BorrowRule;

/// A state change requested by a borrower or an admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleCommand {
    Accept,
    Reject,
    MarkOverdue,
    RequestReturn,
    AcceptReturn,
    RequestRenewal { proposed: NaiveDate },
    AcceptRenewal { new_date: Option<NaiveDate> },
    RejectRenewal,
}

impl LifecycleCommand {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleCommand::Accept => "accept",
            LifecycleCommand::Reject => "reject",
            LifecycleCommand::MarkOverdue => "mark overdue",
            LifecycleCommand::RequestReturn => "request return of",
            LifecycleCommand::AcceptReturn => "accept return of",
            LifecycleCommand::RequestRenewal { .. } => "request renewal of",
            LifecycleCommand::AcceptRenewal { .. } => "accept renewal of",
            LifecycleCommand::RejectRenewal => "reject renewal of",
        }
    }
}

/// Outcome of planning a command
#[derive(Debug, Clone, PartialEq)]
pub struct Planned {
    pub request: BorrowRequest,
    /// New status for the referenced book, if the transition implies one
    pub book_status: Option<BookStatus>,
    /// False when the command was already applied
    pub changed: bool,
}

impl Planned {
    fn unchanged(request: &BorrowRequest) -> Self {
        Self {
            request: request.clone(),
            book_status: None,
            changed: false,
        }
    }
}

/// Book status consistent with its active request (if any) and cart hold
pub fn implied_book_status(active_request: Option<RequestStatus>, held: bool) -> BookStatus {
    match active_request {
        Some(RequestStatus::Pending) => BookStatus::Pending,
        Some(_) => BookStatus::Borrowed,
        None if held => BookStatus::Pending,
        None => BookStatus::Available,
    }
}

/// Latest due date a renewal may propose
pub fn renewal_deadline(return_date: NaiveDate, window_days: u32) -> NaiveDate {
    return_date + Duration::days(i64::from(window_days))
}

fn check_renewal_window(
    request: &BorrowRequest,
    proposed: NaiveDate,
    window_days: u32,
) -> Result<(), BorrowRule> {
    let earliest = request.return_date;
    let latest = renewal_deadline(earliest, window_days);
    if proposed < earliest || proposed > latest {
        return Err(BorrowRule::RenewalOutOfRange {
            proposed,
            earliest,
            latest,
        });
    }
    Ok(())
}

/// A renewal still under review when the request closes is refused
fn close_pending_renewal(request: &mut BorrowRequest) {
    if request.renewal_status == RenewalStatus::Requested {
        request.renewal_status = RenewalStatus::Rejected;
        request.proposed_return_date = None;
    }
}

/// Compute the effect of `command` on `request`
pub fn plan(
    request: &BorrowRequest,
    command: LifecycleCommand,
    renewal_window_days: u32,
    now: DateTime<Utc>,
) -> Result<Planned, BorrowRule> {
    use RequestStatus::*;

    let invalid = || BorrowRule::InvalidTransition {
        action: command.name(),
        status: request.status,
        renewal: request.renewal_status,
    };

    let mut next = request.clone();
    let mut book_status = None;

    match command {
        LifecycleCommand::Accept => match request.status {
            Accepted => return Ok(Planned::unchanged(request)),
            Pending | Processing | Overdue => {
                next.status = Accepted;
                next.return_requested_at = None;
                book_status = Some(BookStatus::Borrowed);
            }
            Rejected | Returned => return Err(invalid()),
        },
        LifecycleCommand::Reject => match request.status {
            Rejected => return Ok(Planned::unchanged(request)),
            Returned => return Err(invalid()),
            _ => {
                next.status = Rejected;
                next.archived_at = Some(now);
                close_pending_renewal(&mut next);
                book_status = Some(BookStatus::Available);
            }
        },
        LifecycleCommand::MarkOverdue => match request.status {
            Overdue => return Ok(Planned::unchanged(request)),
            Accepted => next.status = Overdue,
            _ => return Err(invalid()),
        },
        LifecycleCommand::RequestReturn => match request.status {
            Processing => return Ok(Planned::unchanged(request)),
            Accepted | Overdue => {
                next.status = Processing;
                next.return_requested_at = Some(now);
            }
            _ => return Err(invalid()),
        },
        LifecycleCommand::AcceptReturn => match request.status {
            Returned => return Ok(Planned::unchanged(request)),
            Accepted | Overdue | Processing => {
                next.status = Returned;
                next.archived_at = Some(now);
                close_pending_renewal(&mut next);
                book_status = Some(BookStatus::Available);
            }
            _ => return Err(invalid()),
        },
        LifecycleCommand::RequestRenewal { proposed } => {
            if request.status != Accepted {
                return Err(invalid());
            }
            match request.renewal_status {
                RenewalStatus::Requested if request.proposed_return_date == Some(proposed) => {
                    return Ok(Planned::unchanged(request));
                }
                RenewalStatus::None | RenewalStatus::Rejected => {
                    check_renewal_window(request, proposed, renewal_window_days)?;
                    next.renewal_status = RenewalStatus::Requested;
                    next.proposed_return_date = Some(proposed);
                }
                RenewalStatus::Requested | RenewalStatus::Renewed => return Err(invalid()),
            }
        }
        LifecycleCommand::AcceptRenewal { new_date } => {
            if request.status.is_terminal() {
                return Err(invalid());
            }
            if request.renewal_status == RenewalStatus::Renewed
                && new_date.map_or(true, |date| date == request.return_date)
            {
                return Ok(Planned::unchanged(request));
            }
            if request.renewal_status != RenewalStatus::Requested || !request.status.is_on_loan() {
                return Err(invalid());
            }
            let date = new_date
                .or(request.proposed_return_date)
                .ok_or_else(invalid)?;
            check_renewal_window(request, date, renewal_window_days)?;
            next.return_date = date;
            next.renewal_status = RenewalStatus::Renewed;
            next.proposed_return_date = None;
            // A renewed loan is no longer late
            if next.status == Overdue {
                next.status = Accepted;
            }
        }
        LifecycleCommand::RejectRenewal if request.status.is_terminal() => return Err(invalid()),
        LifecycleCommand::RejectRenewal => match request.renewal_status {
            RenewalStatus::Rejected => return Ok(Planned::unchanged(request)),
            RenewalStatus::Requested => {
                next.renewal_status = RenewalStatus::Rejected;
                next.proposed_return_date = None;
            }
            _ => return Err(invalid()),
        },
    }

    next.updated_at = now;
    Ok(Planned {
        request: next,
        book_status,
        changed: true,
    })
}
