//! Check-in DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticketing_common::format_datetime;
use ticketing_domain::Ticket;

/// Why a scan was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum CheckInRejection {
    NotFound,
    AlreadyUsed { checked_in_at: Option<DateTime<Utc>> },
    Cancelled,
}

impl CheckInRejection {
    pub fn message(&self) -> String {
        match self {
            Self::NotFound => "Ticket not found".to_string(),
            Self::AlreadyUsed {
                checked_in_at: Some(at),
            } => format!("Ticket already used (checked in at {})", format_datetime(at)),
            Self::AlreadyUsed { checked_in_at: None } => "Ticket already used".to_string(),
            Self::Cancelled => "Ticket has been cancelled".to_string(),
        }
    }
}

/// Outcome of scanning a ticket at the door.
///
/// A refusal is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResult {
    pub success: bool,
    pub ticket: Option<Ticket>,
    pub error: Option<String>,
    pub rejection: Option<CheckInRejection>,
}

impl CheckInResult {
    pub fn admitted(ticket: Ticket) -> Self {
        Self {
            success: true,
            ticket: Some(ticket),
            error: None,
            rejection: None,
        }
    }

    pub fn rejected(rejection: CheckInRejection, ticket: Option<Ticket>) -> Self {
        Self {
            success: false,
            ticket,
            error: Some(rejection.message()),
            rejection: Some(rejection),
        }
    }
}
