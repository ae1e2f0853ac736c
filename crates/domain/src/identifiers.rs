//! Strongly-typed identifiers for ticketing entities.
//!
//! Every record key is a UUID v7 wrapped in its own type so an order id can never
//! be passed where a ticket type id is expected.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Fresh time-ordered id
            #[inline]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Wrap a UUID loaded from storage
            #[inline]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            #[inline]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(EditionId, "Identifier of an event edition");

define_id!(TicketTypeId, "Identifier of a sellable ticket type");

define_id!(OrderId, "Identifier of an order");

define_id!(OrderItemId, "Identifier of a priced order line");

define_id!(TicketId, "Identifier of an individual ticket");

define_id!(PromoCodeId, "Identifier of a promotional code");

define_id!(PromoCodeUsageId, "Identifier of a promo code redemption record");

define_id!(
    UserId,
    "Identifier of a back-office user (staff member, organizer)"
);
