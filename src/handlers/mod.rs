pub mod invoices;

use actix_web::web;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::errors::AppError;

#[derive(OpenApi)]
#[openapi(
    paths(
        invoices::create_invoice,
        invoices::update_invoice,
        invoices::update_status,
        invoices::get_invoice,
        invoices::list_seller_invoices,
        invoices::list_buyer_invoices,
        invoices::list_eligible_buyers,
    ),
    components(schemas(
        invoices::LineItemRequest,
        invoices::CreateInvoiceRequest,
        invoices::UpdateInvoiceRequest,
        invoices::UpdateStatusRequest,
        invoices::LineItemResponse,
        invoices::InvoiceResponse,
        invoices::BuyerResponse,
    )),
    modifiers(&BearerAuth),
    tags((name = "invoices", description = "Invoice lifecycle between sellers and buyers"))
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Register the invoice routes. Fixed segments come before `/{id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/api/invoices")
            .route("", web::post().to(invoices::create_invoice))
            .route("/seller", web::get().to(invoices::list_seller_invoices))
            .route("/buyer", web::get().to(invoices::list_buyer_invoices))
            .route("/buyers", web::get().to(invoices::list_eligible_buyers))
            .route("/{id}", web::get().to(invoices::get_invoice))
            .route("/{id}", web::put().to(invoices::update_invoice))
            .route("/{id}/status", web::put().to(invoices::update_status)),
    );
}
