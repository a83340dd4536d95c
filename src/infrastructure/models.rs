use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{actors, invoice_items, invoices};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = actors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ActorRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub kyc_completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = actors)]
pub struct NewActorRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub email: &'a str,
    pub role: &'a str,
    pub kyc_completed: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = invoices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InvoiceRow {
    pub id: Uuid,
    pub invoice_number: String,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub status: String,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
    pub notes: String,
    pub correction_notes: String,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = invoices)]
pub struct NewInvoiceRow {
    pub id: Uuid,
    pub invoice_number: String,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub status: String,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
    pub notes: String,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns a save may touch; number, parties, due date and creation time
/// never change after insert.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = invoices)]
pub struct InvoiceChangeset {
    pub status: String,
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
    pub notes: String,
    pub correction_notes: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = invoice_items)]
#[diesel(belongs_to(InvoiceRow, foreign_key = invoice_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InvoiceItemRow {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub position: i32,
    pub name: String,
    pub description: String,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub total: BigDecimal,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = invoice_items)]
pub struct NewInvoiceItemRow {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub position: i32,
    pub name: String,
    pub description: String,
    pub quantity: BigDecimal,
    pub price: BigDecimal,
    pub total: BigDecimal,
}
