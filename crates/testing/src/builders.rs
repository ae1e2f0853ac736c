//! Fluent builder pattern for constructing test data.

use chrono::{DateTime, Utc};
use ticketing_application::dto::{CreateOrderInput, CreatePromoCodeInput, OrderLineInput};
use ticketing_domain::{
    Amount, Currency, DiscountType, EditionId, NewTicketType, PromoCode, PromoCodeId,
    TicketType, TicketTypeId, UserId,
};

/// Builder for ticket types
#[derive(Clone)]
pub struct TicketTypeBuilder {
    id: TicketTypeId,
    edition_id: EditionId,
    name: String,
    description: Option<String>,
    price: Amount,
    currency: Currency,
    quantity: u32,
    quantity_sold: u32,
    sales_start: Option<DateTime<Utc>>,
    sales_end: Option<DateTime<Utc>>,
    is_active: bool,
    display_order: i32,
}

impl TicketTypeBuilder {
    pub fn new(edition_id: EditionId) -> Self {
        Self {
            id: TicketTypeId::new(),
            edition_id,
            name: "General Admission".to_string(),
            description: None,
            price: 5000,
            currency: Currency::eur(),
            quantity: 100,
            quantity_sold: 0,
            sales_start: None,
            sales_end: None,
            is_active: true,
            display_order: 0,
        }
    }

    pub fn with_id(mut self, id: TicketTypeId) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_price(mut self, price: Amount) -> Self {
        self.price = price;
        self
    }

    pub fn free(mut self) -> Self {
        self.price = 0;
        self
    }

    /// Panics on an invalid code; test input only
    pub fn with_currency(mut self, code: &str) -> Self {
        self.currency = Currency::new(code).expect("valid currency code");
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_sold(mut self, sold: u32) -> Self {
        self.quantity_sold = sold;
        self
    }

    pub fn with_sales_window(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.sales_start = start;
        self.sales_end = end;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_display_order(mut self, display_order: i32) -> Self {
        self.display_order = display_order;
        self
    }

    pub fn build(self) -> TicketType {
        let now = Utc::now();
        TicketType {
            id: self.id,
            edition_id: self.edition_id,
            name: self.name,
            description: self.description,
            price: self.price,
            currency: self.currency,
            quantity: self.quantity,
            quantity_sold: self.quantity_sold,
            sales_start: self.sales_start,
            sales_end: self.sales_end,
            is_active: self.is_active,
            display_order: self.display_order,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creation request, for going through a repository
    pub fn build_new(self) -> NewTicketType {
        NewTicketType {
            edition_id: self.edition_id,
            name: self.name,
            description: self.description,
            price: self.price,
            currency: self.currency,
            quantity: self.quantity,
            sales_start: self.sales_start,
            sales_end: self.sales_end,
            is_active: self.is_active,
            display_order: self.display_order,
        }
    }
}

/// Builder for checkout requests
#[derive(Clone)]
pub struct OrderInputBuilder {
    edition_id: EditionId,
    buyer_email: String,
    buyer_first_name: String,
    buyer_last_name: String,
    currency: Option<String>,
    items: Vec<OrderLineInput>,
}

impl OrderInputBuilder {
    pub fn new(edition_id: EditionId) -> Self {
        Self {
            edition_id,
            buyer_email: "ada@example.com".to_string(),
            buyer_first_name: "Ada".to_string(),
            buyer_last_name: "Lovelace".to_string(),
            currency: None,
            items: Vec::new(),
        }
    }

    pub fn with_buyer_email(mut self, email: impl Into<String>) -> Self {
        self.buyer_email = email.into();
        self
    }

    pub fn with_buyer_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.buyer_first_name = first.into();
        self.buyer_last_name = last.into();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_item(mut self, ticket_type_id: TicketTypeId, quantity: u32) -> Self {
        self.items.push(OrderLineInput::new(ticket_type_id, quantity));
        self
    }

    pub fn build(self) -> CreateOrderInput {
        CreateOrderInput {
            edition_id: self.edition_id,
            buyer_email: self.buyer_email,
            buyer_first_name: self.buyer_first_name,
            buyer_last_name: self.buyer_last_name,
            currency: self.currency,
            items: self.items,
        }
    }
}

/// Builder for promo codes, either as stored records or as creation input
#[derive(Clone)]
pub struct PromoCodeBuilder {
    id: PromoCodeId,
    edition_id: EditionId,
    code: String,
    description: Option<String>,
    discount_type: DiscountType,
    discount_value: i64,
    min_order_amount: Option<Amount>,
    max_usage_count: Option<u32>,
    max_usage_per_person: Option<u32>,
    applicable_ticket_type_ids: Vec<TicketTypeId>,
    starts_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    current_usage_count: u32,
    is_active: bool,
    created_by: UserId,
}

impl PromoCodeBuilder {
    /// 20% off, unlimited, always active
    pub fn new(edition_id: EditionId) -> Self {
        Self {
            id: PromoCodeId::new(),
            edition_id,
            code: "SAVE20".to_string(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: 20,
            min_order_amount: None,
            max_usage_count: None,
            max_usage_per_person: None,
            applicable_ticket_type_ids: Vec::new(),
            starts_at: None,
            expires_at: None,
            current_usage_count: 0,
            is_active: true,
            created_by: UserId::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn percentage(mut self, percent: i64) -> Self {
        self.discount_type = DiscountType::Percentage;
        self.discount_value = percent;
        self
    }

    pub fn fixed(mut self, amount: Amount) -> Self {
        self.discount_type = DiscountType::Fixed;
        self.discount_value = amount;
        self
    }

    pub fn free(mut self) -> Self {
        self.discount_type = DiscountType::Free;
        self.discount_value = 0;
        self
    }

    pub fn with_min_order_amount(mut self, amount: Amount) -> Self {
        self.min_order_amount = Some(amount);
        self
    }

    pub fn with_max_usage_count(mut self, max: u32) -> Self {
        self.max_usage_count = Some(max);
        self
    }

    pub fn with_max_usage_per_person(mut self, max: u32) -> Self {
        self.max_usage_per_person = Some(max);
        self
    }

    pub fn restricted_to(mut self, ticket_type_ids: Vec<TicketTypeId>) -> Self {
        self.applicable_ticket_type_ids = ticket_type_ids;
        self
    }

    pub fn with_window(
        mut self,
        starts_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.starts_at = starts_at;
        self.expires_at = expires_at;
        self
    }

    pub fn with_usage_count(mut self, count: u32) -> Self {
        self.current_usage_count = count;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Stored record; the code is normalized the way the repositories keep it
    pub fn build(self) -> PromoCode {
        let now = Utc::now();
        PromoCode {
            id: self.id,
            edition_id: self.edition_id,
            code: self.code.trim().to_uppercase(),
            description: self.description,
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            min_order_amount: self.min_order_amount,
            max_usage_count: self.max_usage_count,
            max_usage_per_person: self.max_usage_per_person,
            applicable_ticket_type_ids: self.applicable_ticket_type_ids,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            current_usage_count: self.current_usage_count,
            is_active: self.is_active,
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// Organizer request, code as typed
    pub fn build_input(self) -> CreatePromoCodeInput {
        CreatePromoCodeInput {
            edition_id: self.edition_id,
            code: self.code,
            description: self.description,
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            min_order_amount: self.min_order_amount,
            max_usage_count: self.max_usage_count,
            max_usage_per_person: self.max_usage_per_person,
            applicable_ticket_type_ids: self.applicable_ticket_type_ids,
            starts_at: self.starts_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
            created_by: self.created_by,
        }
    }
}
