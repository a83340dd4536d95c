//! Process-local adapters. Used by the test suites and anywhere the service
//! is embedded without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::invoice::{Actor, Invoice, InvoiceNumber, NewInvoice, Role};
use crate::domain::ports::{ActorDirectory, InvoiceNumberAllocator, InvoiceRepository};

fn poisoned<T>(_: T) -> DomainError {
    DomainError::Internal("in-memory store lock poisoned".to_string())
}

fn newest_first(mut invoices: Vec<Invoice>) -> Vec<Invoice> {
    // Reverse first so that among equal timestamps the later insert wins.
    invoices.reverse();
    invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    invoices
}

// ── Invoices ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    invoices: Mutex<Vec<Invoice>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, Vec<Invoice>>, DomainError> {
        self.invoices.lock().map_err(poisoned)
    }

    pub fn len(&self) -> usize {
        self.guard().map(|g| g.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InvoiceRepository for InMemoryInvoiceRepository {
    fn create(&self, invoice: NewInvoice, number: InvoiceNumber) -> Result<Invoice, DomainError> {
        let mut invoices = self.guard()?;
        if invoices.iter().any(|i| i.invoice_number == number) {
            return Err(DomainError::Conflict(format!(
                "Invoice number {number} already exists"
            )));
        }
        let created = Invoice::from_new(Uuid::new_v4(), number, invoice);
        invoices.push(created.clone());
        Ok(created)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Invoice>, DomainError> {
        Ok(self.guard()?.iter().find(|i| i.id == id).cloned())
    }

    fn find_most_recent(&self) -> Result<Option<Invoice>, DomainError> {
        Ok(self.guard()?.iter().max_by_key(|i| i.created_at).cloned())
    }

    fn save(&self, invoice: &Invoice) -> Result<Invoice, DomainError> {
        let mut invoices = self.guard()?;
        let stored = invoices
            .iter_mut()
            .find(|i| i.id == invoice.id)
            .ok_or_else(DomainError::invoice_not_found)?;

        // Number, parties and creation time are fixed at insert.
        let mut updated = invoice.clone();
        updated.invoice_number = stored.invoice_number;
        updated.seller_id = stored.seller_id;
        updated.buyer_id = stored.buyer_id;
        updated.created_at = stored.created_at;
        *stored = updated.clone();
        Ok(updated)
    }

    fn list_by_seller(&self, seller_id: Uuid) -> Result<Vec<Invoice>, DomainError> {
        let matching = self
            .guard()?
            .iter()
            .filter(|i| i.seller_id == seller_id)
            .cloned()
            .collect();
        Ok(newest_first(matching))
    }

    fn list_by_buyer(&self, buyer_id: Uuid) -> Result<Vec<Invoice>, DomainError> {
        let matching = self
            .guard()?
            .iter()
            .filter(|i| i.buyer_id == buyer_id)
            .cloned()
            .collect();
        Ok(newest_first(matching))
    }
}

// ── Actors ────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryActorDirectory {
    actors: RwLock<HashMap<Uuid, Actor>>,
}

impl InMemoryActorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, actor: Actor) -> Result<(), DomainError> {
        self.actors.write().map_err(poisoned)?.insert(actor.id, actor);
        Ok(())
    }
}

impl ActorDirectory for InMemoryActorDirectory {
    fn lookup_actor(&self, id: Uuid) -> Result<Option<Actor>, DomainError> {
        Ok(self.actors.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn list_verified_buyers(&self) -> Result<Vec<Actor>, DomainError> {
        let mut buyers: Vec<Actor> = self
            .actors
            .read()
            .map_err(poisoned)?
            .values()
            .filter(|a| a.role == Role::Buyer && a.kyc_completed)
            .cloned()
            .collect();
        buyers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(buyers)
    }
}

// ── Numbering ─────────────────────────────────────────────────────────────────

/// Monotonic counter; `fetch_add` makes concurrent allocations distinct.
#[derive(Debug, Default)]
pub struct AtomicCounterAllocator {
    last: AtomicU64,
}

impl AtomicCounterAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Continue numbering after the most recently created stored invoice.
    pub fn resume_from<R: InvoiceRepository + ?Sized>(repo: &R) -> Result<Self, DomainError> {
        let last = repo
            .find_most_recent()?
            .map(|i| i.invoice_number.sequence())
            .unwrap_or(0);
        Ok(Self::starting_after(last))
    }
}

impl InvoiceNumberAllocator for AtomicCounterAllocator {
    fn next_number(&self) -> Result<InvoiceNumber, DomainError> {
        let next = self.last.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(InvoiceNumber::new(next))
    }
}
