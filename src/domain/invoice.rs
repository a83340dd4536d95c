use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::money::Totals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvoiceStatus {
    Sent,
    Approved,
    CorrectionRequested,
    Paid,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Sent,
        InvoiceStatus::Approved,
        InvoiceStatus::CorrectionRequested,
        InvoiceStatus::Paid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Approved => "approved",
            InvoiceStatus::CorrectionRequested => "correction_requested",
            InvoiceStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(InvoiceStatus::Sent),
            "approved" => Ok(InvoiceStatus::Approved),
            "correction_requested" => Ok(InvoiceStatus::CorrectionRequested),
            "paid" => Ok(InvoiceStatus::Paid),
            other => Err(DomainError::validation(format!(
                "Unknown invoice status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Buyer,
    Seller,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
        }
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            other => Err(DomainError::Internal(format!("Unknown actor role '{other}'"))),
        }
    }
}

/// A registered party as seen through the actor directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub kyc_completed: bool,
}

/// Sequential display identifier, rendered as `INV-` plus at least six digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InvoiceNumber(u64);

impl InvoiceNumber {
    pub const PREFIX: &'static str = "INV-";

    pub fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    pub fn sequence(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:06}", Self::PREFIX, self.0)
    }
}

impl FromStr for InvoiceNumber {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(Self::PREFIX)
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
            .map(InvoiceNumber)
            .ok_or_else(|| DomainError::Internal(format!("Malformed invoice number '{s}'")))
    }
}

/// Caller-supplied line item, before validation and derivation. Quantity and
/// price stay as decimal text until [`price_items`](super::money::price_items)
/// reaches them.
#[derive(Debug, Clone, Default)]
pub struct LineItemInput {
    pub name: String,
    pub description: Option<String>,
    pub quantity: String,
    pub price: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub description: String,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub total: BigDecimal,
}

/// Everything needed to persist a new invoice except its number, which the
/// allocator hands out at insert time.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub items: Vec<LineItem>,
    pub totals: Totals,
    pub notes: String,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: InvoiceNumber,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub status: InvoiceStatus,
    pub items: Vec<LineItem>,
    pub totals: Totals,
    pub notes: String,
    pub correction_notes: String,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn from_new(id: Uuid, invoice_number: InvoiceNumber, new: NewInvoice) -> Self {
        Invoice {
            id,
            invoice_number,
            seller_id: new.seller_id,
            buyer_id: new.buyer_id,
            status: InvoiceStatus::Sent,
            items: new.items,
            totals: new.totals,
            notes: new.notes,
            correction_notes: String::new(),
            due_date: new.due_date,
            created_at: new.created_at,
            updated_at: new.created_at,
        }
    }

    /// The role `actor_id` plays on this invoice, if any.
    pub fn party_role(&self, actor_id: Uuid) -> Option<Role> {
        if actor_id == self.seller_id {
            Some(Role::Seller)
        } else if actor_id == self.buyer_id {
            Some(Role::Buyer)
        } else {
            None
        }
    }
}
