use std::sync::Arc;

use uuid::Uuid;

use super::errors::DomainError;
use super::invoice::{Actor, Invoice, InvoiceNumber, NewInvoice};

/// Persistent invoice store.
///
/// `create` must fail with [`DomainError::Conflict`] when `number` is already
/// taken, and must write nothing in that case.
pub trait InvoiceRepository: Send + Sync + 'static {
    fn create(&self, invoice: NewInvoice, number: InvoiceNumber) -> Result<Invoice, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, DomainError>;
    fn find_most_recent(&self) -> Result<Option<Invoice>, DomainError>;
    fn save(&self, invoice: &Invoice) -> Result<Invoice, DomainError>;
    /// Newest first.
    fn list_by_seller(&self, seller_id: Uuid) -> Result<Vec<Invoice>, DomainError>;
    /// Newest first.
    fn list_by_buyer(&self, buyer_id: Uuid) -> Result<Vec<Invoice>, DomainError>;
}

/// Read-only view of registered users and their KYC state.
pub trait ActorDirectory: Send + Sync + 'static {
    fn lookup_actor(&self, id: Uuid) -> Result<Option<Actor>, DomainError>;
    fn list_verified_buyers(&self) -> Result<Vec<Actor>, DomainError>;
}

/// Hands out invoice numbers. Every call returns a number never returned
/// before, even under concurrent callers.
pub trait InvoiceNumberAllocator: Send + Sync + 'static {
    fn next_number(&self) -> Result<InvoiceNumber, DomainError>;
}

impl<T: InvoiceRepository + ?Sized> InvoiceRepository for Arc<T> {
    fn create(&self, invoice: NewInvoice, number: InvoiceNumber) -> Result<Invoice, DomainError> {
        (**self).create(invoice, number)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, DomainError> {
        (**self).find_by_id(id)
    }

    fn find_most_recent(&self) -> Result<Option<Invoice>, DomainError> {
        (**self).find_most_recent()
    }

    fn save(&self, invoice: &Invoice) -> Result<Invoice, DomainError> {
        (**self).save(invoice)
    }

    fn list_by_seller(&self, seller_id: Uuid) -> Result<Vec<Invoice>, DomainError> {
        (**self).list_by_seller(seller_id)
    }

    fn list_by_buyer(&self, buyer_id: Uuid) -> Result<Vec<Invoice>, DomainError> {
        (**self).list_by_buyer(buyer_id)
    }
}

impl<T: ActorDirectory + ?Sized> ActorDirectory for Arc<T> {
    fn lookup_actor(&self, id: Uuid) -> Result<Option<Actor>, DomainError> {
        (**self).lookup_actor(id)
    }

    fn list_verified_buyers(&self) -> Result<Vec<Actor>, DomainError> {
        (**self).list_verified_buyers()
    }
}

impl<T: InvoiceNumberAllocator + ?Sized> InvoiceNumberAllocator for Arc<T> {
    fn next_number(&self) -> Result<InvoiceNumber, DomainError> {
        (**self).next_number()
    }
}
