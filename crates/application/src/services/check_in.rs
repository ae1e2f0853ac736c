//! Check-in Service

use super::ServiceContext;
use crate::dto::{CheckInRejection, CheckInResult};
use crate::{ApplicationError, ApplicationResult};
use ticketing_domain::{LifecycleEvent, Ticket, TicketStatus, UserId};
use tracing::{info, instrument, warn};

/// Door scanning
#[derive(Clone)]
pub struct CheckInService {
    ctx: ServiceContext,
}

impl CheckInService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Admit the holder of a ticket.
    ///
    /// Unknown, used and cancelled tickets come back as a refused
    /// [`CheckInResult`]; a used ticket is never stamped twice, so re-scanning
    /// reports the original check-in time.
    #[instrument(skip(self), fields(staff_id = %staff_id))]
    pub async fn check_in_ticket(
        &self,
        ticket_number: &str,
        staff_id: UserId,
    ) -> ApplicationResult<CheckInResult> {
        let ticket_number = ticket_number.trim();
        if ticket_number.is_empty() {
            return Err(ApplicationError::InvalidInput(
                "Ticket number is required".to_string(),
            ));
        }

        let tickets = &self.ctx.repositories.tickets;
        let Some(ticket) = tickets.find_by_ticket_number(ticket_number).await? else {
            warn!(ticket_number, "Check-in refused: unknown ticket");
            return Ok(CheckInResult::rejected(CheckInRejection::NotFound, None));
        };

        if ticket.status != TicketStatus::Valid {
            return Ok(refuse(ticket));
        }

        let ticket = match tickets.check_in(ticket.id, staff_id).await {
            Ok(ticket) => ticket,
            // another scanner stamped or cancelled it after our read
            Err(ApplicationError::InvalidState(reason)) => {
                return match tickets.find_by_id(ticket.id).await? {
                    Some(current) if current.status != TicketStatus::Valid => Ok(refuse(current)),
                    _ => Err(ApplicationError::InvalidState(reason)),
                };
            }
            Err(err) => return Err(err),
        };
        info!(ticket_id = %ticket.id, "Ticket checked in");

        self.ctx
            .publish(LifecycleEvent::TicketCheckedIn {
                ticket_id: ticket.id,
                edition_id: ticket.edition_id,
                staff_id,
            })
            .await;

        Ok(CheckInResult::admitted(ticket))
    }
}

/// Refusal for a ticket that can no longer be admitted
fn refuse(ticket: Ticket) -> CheckInResult {
    if ticket.status == TicketStatus::Cancelled {
        warn!(ticket_id = %ticket.id, "Check-in refused: ticket cancelled");
        return CheckInResult::rejected(CheckInRejection::Cancelled, Some(ticket));
    }
    warn!(
        ticket_id = %ticket.id,
        checked_in_at = ?ticket.checked_in_at,
        "Check-in refused: ticket already used"
    );
    let rejection = CheckInRejection::AlreadyUsed {
        checked_in_at: ticket.checked_in_at,
    };
    CheckInResult::rejected(rejection, Some(ticket))
}
