use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::invoice_service::{
    CorrectInvoiceCommand, CreateInvoiceCommand, StatusChange,
};
use crate::auth::BearerActor;
use crate::domain::errors::DomainError;
use crate::domain::invoice::{Actor, Invoice, InvoiceStatus, LineItemInput};
use crate::domain::money::round2;
use crate::errors::AppError;
use crate::InvoiceApi;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct LineItemRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Decimal quantity as a string, e.g. "2" or "1.5"; at most 6 decimals
    #[serde(default)]
    pub quantity: String,
    /// Decimal unit price as a string to avoid floating-point issues, e.g. "9.99"
    #[serde(default)]
    pub price: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInvoiceRequest {
    pub buyer: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub items: Vec<LineItemRequest>,
    /// Decimal string, defaults to "0"
    pub tax: Option<String>,
    /// Decimal string, defaults to "0"; may not exceed the subtotal
    pub discount: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInvoiceRequest {
    #[serde(default)]
    pub items: Vec<LineItemRequest>,
    pub tax: Option<String>,
    pub discount: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of `sent`, `approved`, `correction_requested`, `paid`
    pub status: String,
    /// Required when `status` is `correction_requested`
    pub correction_notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LineItemResponse {
    pub name: String,
    pub description: String,
    pub quantity: String,
    pub price: String,
    pub total: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub invoice_number: String,
    pub seller: Uuid,
    pub buyer: Uuid,
    pub status: String,
    pub items: Vec<LineItemResponse>,
    pub subtotal: String,
    pub tax: String,
    pub discount: String,
    pub total: String,
    pub notes: String,
    pub correction_notes: String,
    pub due_date: NaiveDate,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BuyerResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

fn money(value: &BigDecimal) -> String {
    round2(value).to_string()
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        InvoiceResponse {
            id: invoice.id,
            invoice_number: invoice.invoice_number.to_string(),
            seller: invoice.seller_id,
            buyer: invoice.buyer_id,
            status: invoice.status.as_str().to_string(),
            items: invoice
                .items
                .into_iter()
                .map(|i| LineItemResponse {
                    total: money(&i.total),
                    name: i.name,
                    description: i.description,
                    quantity: i.quantity.to_string(),
                    price: i.price.to_string(),
                })
                .collect(),
            subtotal: money(&invoice.totals.subtotal),
            tax: money(&invoice.totals.tax),
            discount: money(&invoice.totals.discount),
            total: money(&invoice.totals.total),
            notes: invoice.notes,
            correction_notes: invoice.correction_notes,
            due_date: invoice.due_date,
            created_at: invoice.created_at.to_rfc3339(),
            updated_at: invoice.updated_at.to_rfc3339(),
        }
    }
}

impl From<Actor> for BuyerResponse {
    fn from(actor: Actor) -> Self {
        BuyerResponse {
            id: actor.id,
            name: actor.name,
            email: actor.email,
        }
    }
}

impl From<LineItemRequest> for LineItemInput {
    fn from(item: LineItemRequest) -> Self {
        LineItemInput {
            name: item.name,
            description: item.description,
            quantity: item.quantity,
            price: item.price,
        }
    }
}

fn line_items(items: Vec<LineItemRequest>) -> Vec<LineItemInput> {
    items.into_iter().map(LineItemInput::from).collect()
}

// ── Plumbing ─────────────────────────────────────────────────────────────────

/// Resolve the caller and run `op` on the blocking pool.
async fn with_actor<T, F>(
    api: web::Data<InvoiceApi>,
    caller: BearerActor,
    op: F,
) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&InvoiceApi, &Actor) -> Result<T, DomainError> + Send + 'static,
{
    web::block(move || {
        let actor = api
            .resolve_actor(caller.0)?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;
        Ok::<_, AppError>(op(api.get_ref(), &actor)?)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/invoices
///
/// Issues a new invoice from the calling seller to a KYC-verified buyer.
/// The invoice starts in `sent` with a freshly allocated `INV-######` number.
#[utoipa::path(
    post,
    path = "/api/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created", body = InvoiceResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Caller is not a seller"),
        (status = 404, description = "Buyer not found or KYC incomplete"),
        (status = 409, description = "Invoice number allocation kept colliding"),
    ),
    security(("bearer" = [])),
    tag = "invoices"
)]
pub async fn create_invoice(
    api: web::Data<InvoiceApi>,
    caller: BearerActor,
    body: web::Json<CreateInvoiceRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let invoice = with_actor(api, caller, move |api, seller| {
        let cmd = CreateInvoiceCommand {
            buyer_id: body.buyer,
            due_date: body.due_date,
            items: line_items(body.items),
            tax: body.tax,
            discount: body.discount,
            notes: body.notes,
        };
        api.create_invoice(seller, cmd)
    })
    .await?;

    Ok(HttpResponse::Created().json(InvoiceResponse::from(invoice)))
}

/// PUT /api/invoices/{id}
///
/// Seller resubmits an invoice the buyer sent back for correction. Items and
/// totals are replaced, correction notes cleared, and the status returns to
/// `sent`.
#[utoipa::path(
    put,
    path = "/api/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice UUID")),
    request_body = UpdateInvoiceRequest,
    responses(
        (status = 200, description = "Invoice resubmitted", body = InvoiceResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not the seller, or invoice not awaiting correction"),
        (status = 404, description = "Invoice not found"),
    ),
    security(("bearer" = [])),
    tag = "invoices"
)]
pub async fn update_invoice(
    api: web::Data<InvoiceApi>,
    caller: BearerActor,
    path: web::Path<Uuid>,
    body: web::Json<UpdateInvoiceRequest>,
) -> Result<HttpResponse, AppError> {
    let invoice_id = path.into_inner();
    let body = body.into_inner();

    let invoice = with_actor(api, caller, move |api, seller| {
        let cmd = CorrectInvoiceCommand {
            items: line_items(body.items),
            tax: body.tax,
            discount: body.discount,
            notes: body.notes,
        };
        api.update_invoice_after_correction(invoice_id, seller, cmd)
    })
    .await?;

    Ok(HttpResponse::Ok().json(InvoiceResponse::from(invoice)))
}

/// PUT /api/invoices/{id}/status
///
/// Buyers approve or request corrections on `sent` invoices; sellers re-send
/// or mark invoices paid.
#[utoipa::path(
    put,
    path = "/api/invoices/{id}/status",
    params(("id" = Uuid, Path, description = "Invoice UUID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = InvoiceResponse),
        (status = 400, description = "Unknown status or missing correction notes"),
        (status = 403, description = "Transition not permitted for this caller"),
        (status = 404, description = "Invoice not found"),
    ),
    security(("bearer" = [])),
    tag = "invoices"
)]
pub async fn update_status(
    api: web::Data<InvoiceApi>,
    caller: BearerActor,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let invoice_id = path.into_inner();
    let body = body.into_inner();

    let invoice = with_actor(api, caller, move |api, actor| {
        let change = StatusChange {
            status: InvoiceStatus::from_str(&body.status)?,
            correction_notes: body.correction_notes,
        };
        api.update_status(invoice_id, actor, change)
    })
    .await?;

    Ok(HttpResponse::Ok().json(InvoiceResponse::from(invoice)))
}

/// GET /api/invoices/{id}
#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice UUID")),
    responses(
        (status = 200, description = "Invoice found", body = InvoiceResponse),
        (status = 403, description = "Caller is neither buyer nor seller"),
        (status = 404, description = "Invoice not found"),
    ),
    security(("bearer" = [])),
    tag = "invoices"
)]
pub async fn get_invoice(
    api: web::Data<InvoiceApi>,
    caller: BearerActor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let invoice_id = path.into_inner();

    let invoice =
        with_actor(api, caller, move |api, actor| api.get_invoice(invoice_id, actor)).await?;

    Ok(HttpResponse::Ok().json(InvoiceResponse::from(invoice)))
}

/// GET /api/invoices/seller
///
/// The caller's issued invoices, newest first.
#[utoipa::path(
    get,
    path = "/api/invoices/seller",
    responses(
        (status = 200, description = "Invoices issued by the caller", body = Vec<InvoiceResponse>),
        (status = 403, description = "Caller is not a seller"),
    ),
    security(("bearer" = [])),
    tag = "invoices"
)]
pub async fn list_seller_invoices(
    api: web::Data<InvoiceApi>,
    caller: BearerActor,
) -> Result<HttpResponse, AppError> {
    let invoices = with_actor(api, caller, |api, actor| api.list_seller_invoices(actor)).await?;

    let body: Vec<InvoiceResponse> = invoices.into_iter().map(InvoiceResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/invoices/buyer
///
/// Invoices addressed to the caller, newest first.
#[utoipa::path(
    get,
    path = "/api/invoices/buyer",
    responses(
        (
            status = 200,
            description = "Invoices addressed to the caller",
            body = Vec<InvoiceResponse>
        ),
        (status = 403, description = "Caller is not a buyer"),
    ),
    security(("bearer" = [])),
    tag = "invoices"
)]
pub async fn list_buyer_invoices(
    api: web::Data<InvoiceApi>,
    caller: BearerActor,
) -> Result<HttpResponse, AppError> {
    let invoices = with_actor(api, caller, |api, actor| api.list_buyer_invoices(actor)).await?;

    let body: Vec<InvoiceResponse> = invoices.into_iter().map(InvoiceResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/invoices/buyers
///
/// Buyers the caller may invoice.
#[utoipa::path(
    get,
    path = "/api/invoices/buyers",
    responses(
        (status = 200, description = "Buyers with KYC completed", body = Vec<BuyerResponse>),
        (status = 403, description = "Caller is not a seller"),
    ),
    security(("bearer" = [])),
    tag = "invoices"
)]
pub async fn list_eligible_buyers(
    api: web::Data<InvoiceApi>,
    caller: BearerActor,
) -> Result<HttpResponse, AppError> {
    let buyers = with_actor(api, caller, |api, actor| api.list_eligible_buyers(actor)).await?;

    let body: Vec<BuyerResponse> = buyers.into_iter().map(BuyerResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}
