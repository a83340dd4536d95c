use std::str::FromStr;

use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel::PgConnection;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::invoice::{Invoice, InvoiceNumber, InvoiceStatus, LineItem, NewInvoice};
use crate::domain::money::Totals;
use crate::domain::ports::InvoiceRepository;
use crate::schema::{invoice_items, invoices};

use super::models::{
    InvoiceChangeset, InvoiceItemRow, InvoiceRow, NewInvoiceItemRow, NewInvoiceRow,
};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => {
                DomainError::NotFound("Record not found".to_string())
            }
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DomainError::Conflict(info.message().to_string())
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Row mapping ───────────────────────────────────────────────────────────────

fn into_invoice(row: InvoiceRow, items: Vec<InvoiceItemRow>) -> Result<Invoice, DomainError> {
    let status = InvoiceStatus::from_str(&row.status)
        .map_err(|_| DomainError::Internal(format!("Stored status '{}' is unknown", row.status)))?;
    let invoice_number = InvoiceNumber::from_str(&row.invoice_number)?;

    let mut items = items;
    items.sort_by_key(|i| i.position);

    Ok(Invoice {
        id: row.id,
        invoice_number,
        seller_id: row.seller_id,
        buyer_id: row.buyer_id,
        status,
        items: items
            .into_iter()
            .map(|i| LineItem {
                name: i.name,
                description: i.description,
                quantity: i.quantity,
                price: i.price,
                total: i.total,
            })
            .collect(),
        totals: Totals {
            subtotal: row.subtotal,
            tax: row.tax,
            discount: row.discount,
            total: row.total,
        },
        notes: row.notes,
        correction_notes: row.correction_notes,
        due_date: row.due_date,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn item_rows(invoice_id: Uuid, items: &[LineItem]) -> Vec<NewInvoiceItemRow> {
    items
        .iter()
        .zip(0..)
        .map(|(item, position)| NewInvoiceItemRow {
            id: Uuid::new_v4(),
            invoice_id,
            position,
            name: item.name.clone(),
            description: item.description.clone(),
            quantity: item.quantity.clone(),
            price: item.price.clone(),
            total: item.total.clone(),
        })
        .collect()
}

fn insert_items(
    conn: &mut PgConnection,
    invoice_id: Uuid,
    items: &[LineItem],
) -> Result<Vec<InvoiceItemRow>, DomainError> {
    Ok(diesel::insert_into(invoice_items::table)
        .values(&item_rows(invoice_id, items))
        .returning(InvoiceItemRow::as_returning())
        .get_results(conn)?)
}

fn load_many(conn: &mut PgConnection, rows: Vec<InvoiceRow>) -> Result<Vec<Invoice>, DomainError> {
    let items = InvoiceItemRow::belonging_to(&rows)
        .select(InvoiceItemRow::as_select())
        .load(conn)?;

    items
        .grouped_by(&rows)
        .into_iter()
        .zip(rows)
        .map(|(items, row)| into_invoice(row, items))
        .collect()
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselInvoiceRepository {
    pool: DbPool,
}

impl DieselInvoiceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl InvoiceRepository for DieselInvoiceRepository {
    fn create(&self, invoice: NewInvoice, number: InvoiceNumber) -> Result<Invoice, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let id = Uuid::new_v4();
            let row = diesel::insert_into(invoices::table)
                .values(&NewInvoiceRow {
                    id,
                    invoice_number: number.to_string(),
                    seller_id: invoice.seller_id,
                    buyer_id: invoice.buyer_id,
                    status: InvoiceStatus::Sent.as_str().to_string(),
                    subtotal: invoice.totals.subtotal.clone(),
                    tax: invoice.totals.tax.clone(),
                    discount: invoice.totals.discount.clone(),
                    total: invoice.totals.total.clone(),
                    notes: invoice.notes.clone(),
                    due_date: invoice.due_date,
                    created_at: invoice.created_at,
                    updated_at: invoice.created_at,
                })
                .returning(InvoiceRow::as_returning())
                .get_result(conn)?;

            let items = insert_items(conn, id, &invoice.items)?;
            into_invoice(row, items)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = invoices::table
            .filter(invoices::id.eq(id))
            .select(InvoiceRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(load_many(&mut conn, vec![row])?.pop())
    }

    fn find_most_recent(&self) -> Result<Option<Invoice>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = invoices::table
            .select(InvoiceRow::as_select())
            .order(invoices::created_at.desc())
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(load_many(&mut conn, vec![row])?.pop())
    }

    fn save(&self, invoice: &Invoice) -> Result<Invoice, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = diesel::update(invoices::table.filter(invoices::id.eq(invoice.id)))
                .set(&InvoiceChangeset {
                    status: invoice.status.as_str().to_string(),
                    subtotal: invoice.totals.subtotal.clone(),
                    tax: invoice.totals.tax.clone(),
                    discount: invoice.totals.discount.clone(),
                    total: invoice.totals.total.clone(),
                    notes: invoice.notes.clone(),
                    correction_notes: invoice.correction_notes.clone(),
                    updated_at: invoice.updated_at,
                })
                .returning(InvoiceRow::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(DomainError::invoice_not_found)?;

            diesel::delete(invoice_items::table.filter(invoice_items::invoice_id.eq(invoice.id)))
                .execute(conn)?;
            let items = insert_items(conn, invoice.id, &invoice.items)?;
            into_invoice(row, items)
        })
    }

    fn list_by_seller(&self, seller_id: Uuid) -> Result<Vec<Invoice>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = invoices::table
            .filter(invoices::seller_id.eq(seller_id))
            .select(InvoiceRow::as_select())
            .order(invoices::created_at.desc())
            .load(&mut conn)?;
        load_many(&mut conn, rows)
    }

    fn list_by_buyer(&self, buyer_id: Uuid) -> Result<Vec<Invoice>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = invoices::table
            .filter(invoices::buyer_id.eq(buyer_id))
            .select(InvoiceRow::as_select())
            .order(invoices::created_at.desc())
            .load(&mut conn)?;
        load_many(&mut conn, rows)
    }
}
