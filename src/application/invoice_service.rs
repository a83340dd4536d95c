use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::invoice::{Actor, Invoice, InvoiceStatus, LineItemInput, NewInvoice, Role};
use crate::domain::money::price_items;
use crate::domain::ports::{ActorDirectory, InvoiceNumberAllocator, InvoiceRepository};
use crate::domain::transitions::{decide, Effect, Request};

/// Allocation attempts per creation before a numbering conflict is surfaced.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct CreateInvoiceCommand {
    pub buyer_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub items: Vec<LineItemInput>,
    pub tax: Option<String>,
    pub discount: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CorrectInvoiceCommand {
    pub items: Vec<LineItemInput>,
    pub tax: Option<String>,
    pub discount: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub status: InvoiceStatus,
    pub correction_notes: Option<String>,
}

pub struct InvoiceService<R, D, A> {
    repo: R,
    directory: D,
    allocator: A,
}

impl<R, D, A> InvoiceService<R, D, A>
where
    R: InvoiceRepository,
    D: ActorDirectory,
    A: InvoiceNumberAllocator,
{
    pub fn new(repo: R, directory: D, allocator: A) -> Self {
        Self {
            repo,
            directory,
            allocator,
        }
    }

    pub fn resolve_actor(&self, actor_id: Uuid) -> Result<Option<Actor>, DomainError> {
        self.directory.lookup_actor(actor_id)
    }

    pub fn create_invoice(
        &self,
        seller: &Actor,
        cmd: CreateInvoiceCommand,
    ) -> Result<Invoice, DomainError> {
        require_role(seller, Role::Seller)?;

        let buyer_id = cmd
            .buyer_id
            .ok_or_else(|| DomainError::validation("Buyer is required"))?;
        let due_date = cmd
            .due_date
            .ok_or_else(|| DomainError::validation("Due date is required"))?;
        let priced = price_items(&cmd.items, cmd.tax.as_deref(), cmd.discount.as_deref())?;

        if buyer_id == seller.id {
            return Err(DomainError::validation("Buyer and seller must differ"));
        }
        let buyer = self
            .directory
            .lookup_actor(buyer_id)?
            .filter(|a| a.role == Role::Buyer)
            .ok_or_else(|| DomainError::NotFound("Buyer not found".to_string()))?;
        if !buyer.kyc_completed {
            return Err(DomainError::NotFound(
                "Buyer has not completed KYC verification".to_string(),
            ));
        }

        priced.totals.check_discount()?;

        self.insert_numbered(NewInvoice {
            seller_id: seller.id,
            buyer_id,
            items: priced.items,
            totals: priced.totals,
            notes: cmd.notes.unwrap_or_default(),
            due_date,
            created_at: Utc::now(),
        })
    }

    fn insert_numbered(&self, draft: NewInvoice) -> Result<Invoice, DomainError> {
        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let number = self.allocator.next_number()?;
            match self.repo.create(draft.clone(), number) {
                Ok(invoice) => {
                    log::info!(
                        "Created invoice {} ({}) for buyer {}",
                        invoice.invoice_number,
                        invoice.id,
                        invoice.buyer_id
                    );
                    return Ok(invoice);
                }
                Err(DomainError::Conflict(reason)) => {
                    log::warn!(
                        "Invoice number {} collided (attempt {}/{}): {}",
                        number,
                        attempt,
                        MAX_ALLOCATION_ATTEMPTS,
                        reason
                    );
                }
                Err(e) => return Err(e),
            }
        }

        log::error!(
            "Giving up on invoice number allocation after {} attempts",
            MAX_ALLOCATION_ATTEMPTS
        );
        Err(DomainError::Conflict(format!(
            "Could not allocate a unique invoice number after {MAX_ALLOCATION_ATTEMPTS} attempts"
        )))
    }

    pub fn update_invoice_after_correction(
        &self,
        invoice_id: Uuid,
        actor: &Actor,
        cmd: CorrectInvoiceCommand,
    ) -> Result<Invoice, DomainError> {
        let mut invoice = self.load(invoice_id)?;
        let role = authorize_party(&invoice, actor, "update")?;
        let transition = decide(role, invoice.status, Request::Resubmit)?;
        if transition.effect != Effect::ApplyCorrection {
            return Err(DomainError::Internal(format!(
                "Resubmission resolved to unexpected effect {:?}",
                transition.effect
            )));
        }

        let priced = price_items(&cmd.items, cmd.tax.as_deref(), cmd.discount.as_deref())?;
        priced.totals.check_discount()?;

        invoice.items = priced.items;
        invoice.totals = priced.totals;
        invoice.notes = cmd.notes.unwrap_or_default();
        invoice.correction_notes.clear();
        invoice.status = transition.to;
        invoice.updated_at = Utc::now();

        let saved = self.repo.save(&invoice)?;
        log::info!("Invoice {} resubmitted after correction", saved.invoice_number);
        Ok(saved)
    }

    pub fn update_status(
        &self,
        invoice_id: Uuid,
        actor: &Actor,
        change: StatusChange,
    ) -> Result<Invoice, DomainError> {
        let mut invoice = self.load(invoice_id)?;
        let role = authorize_party(&invoice, actor, "update")?;
        let transition = decide(role, invoice.status, Request::ChangeStatus(change.status))?;

        match transition.effect {
            Effect::None => {}
            Effect::RecordCorrectionNotes => {
                let notes = change
                    .correction_notes
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| {
                        DomainError::validation(
                            "Correction notes are required when requesting a correction",
                        )
                    })?;
                invoice.correction_notes = notes.to_string();
            }
            Effect::ApplyCorrection => {
                return Err(DomainError::forbidden(
                    "Corrections must be resubmitted through an invoice update",
                ));
            }
        }

        let from = invoice.status;
        invoice.status = transition.to;
        invoice.updated_at = Utc::now();

        let saved = self.repo.save(&invoice)?;
        log::info!(
            "Invoice {} moved from {} to {} by {} {}",
            saved.invoice_number,
            from,
            saved.status,
            role.as_str(),
            actor.id
        );
        Ok(saved)
    }

    pub fn get_invoice(&self, invoice_id: Uuid, actor: &Actor) -> Result<Invoice, DomainError> {
        let invoice = self.load(invoice_id)?;
        if invoice.party_role(actor.id).is_none() {
            return Err(DomainError::forbidden("Not authorized to view this invoice"));
        }
        Ok(invoice)
    }

    pub fn list_seller_invoices(&self, actor: &Actor) -> Result<Vec<Invoice>, DomainError> {
        require_role(actor, Role::Seller)?;
        self.repo.list_by_seller(actor.id)
    }

    pub fn list_buyer_invoices(&self, actor: &Actor) -> Result<Vec<Invoice>, DomainError> {
        require_role(actor, Role::Buyer)?;
        self.repo.list_by_buyer(actor.id)
    }

    /// Buyers a seller may invoice: buyer role with KYC completed.
    pub fn list_eligible_buyers(&self, actor: &Actor) -> Result<Vec<Actor>, DomainError> {
        require_role(actor, Role::Seller)?;
        self.directory.list_verified_buyers()
    }

    fn load(&self, invoice_id: Uuid) -> Result<Invoice, DomainError> {
        self.repo
            .find_by_id(invoice_id)?
            .ok_or_else(DomainError::invoice_not_found)
    }
}

fn require_role(actor: &Actor, role: Role) -> Result<(), DomainError> {
    if actor.role != role {
        return Err(DomainError::forbidden(format!(
            "Not authorized as a {}",
            role.as_str()
        )));
    }
    Ok(())
}

/// The actor must sit on this invoice in the same capacity as their role.
fn authorize_party(invoice: &Invoice, actor: &Actor, action: &str) -> Result<Role, DomainError> {
    match invoice.party_role(actor.id) {
        Some(role) if role == actor.role => Ok(role),
        _ => Err(DomainError::forbidden(format!(
            "Not authorized to {action} this invoice"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::invoice::InvoiceNumber;
    use crate::infrastructure::memory::{
        AtomicCounterAllocator, InMemoryActorDirectory, InMemoryInvoiceRepository,
    };

    type TestService = InvoiceService<
        Arc<InMemoryInvoiceRepository>,
        Arc<InMemoryActorDirectory>,
        Arc<dyn InvoiceNumberAllocator>,
    >;

    struct Fixture {
        service: TestService,
        repo: Arc<InMemoryInvoiceRepository>,
        directory: Arc<InMemoryActorDirectory>,
        seller: Actor,
        buyer: Actor,
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn actor(name: &str, role: Role, kyc_completed: bool) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{name}@example.com"),
            role,
            kyc_completed,
        }
    }

    fn fixture_with(allocator: Arc<dyn InvoiceNumberAllocator>) -> Fixture {
        let repo = Arc::new(InMemoryInvoiceRepository::new());
        let directory = Arc::new(InMemoryActorDirectory::new());
        let seller = actor("seller", Role::Seller, true);
        let buyer = actor("buyer", Role::Buyer, true);
        directory.register(seller.clone()).expect("register");
        directory.register(buyer.clone()).expect("register");
        Fixture {
            service: InvoiceService::new(repo.clone(), directory.clone(), allocator),
            repo,
            directory,
            seller,
            buyer,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(AtomicCounterAllocator::new()))
    }

    fn item(name: &str, quantity: &str, price: &str) -> LineItemInput {
        LineItemInput {
            name: name.to_string(),
            description: None,
            quantity: quantity.to_string(),
            price: price.to_string(),
        }
    }

    fn widget_command(buyer: &Actor) -> CreateInvoiceCommand {
        CreateInvoiceCommand {
            buyer_id: Some(buyer.id),
            due_date: NaiveDate::from_ymd_opt(2030, 6, 30),
            items: vec![item("Widget", "2", "9.995")],
            tax: Some("1.00".to_string()),
            discount: Some("0.50".to_string()),
            notes: None,
        }
    }

    fn status(status: InvoiceStatus, notes: Option<&str>) -> StatusChange {
        StatusChange {
            status,
            correction_notes: notes.map(str::to_string),
        }
    }

    fn stored(f: &Fixture, id: Uuid) -> Invoice {
        f.repo.find_by_id(id).expect("find").expect("exists")
    }

    #[test]
    fn create_derives_totals_and_assigns_first_number() {
        let f = fixture();
        let invoice = f
            .service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("create");

        assert_eq!(invoice.totals.subtotal, dec("19.99"));
        assert_eq!(invoice.totals.total, dec("20.49"));
        assert_eq!(invoice.status, InvoiceStatus::Sent);
        assert_eq!(invoice.invoice_number.to_string(), "INV-000001");
        assert_eq!(invoice.seller_id, f.seller.id);
        assert_eq!(invoice.buyer_id, f.buyer.id);
        assert_eq!(invoice.notes, "");
    }

    #[test]
    fn create_requires_seller_role() {
        let f = fixture();
        let err = f
            .service
            .create_invoice(&f.buyer, widget_command(&f.buyer))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert!(f.repo.is_empty());
    }

    #[test]
    fn create_validates_required_fields_in_order() {
        let f = fixture();

        let mut cmd = widget_command(&f.buyer);
        cmd.buyer_id = None;
        cmd.due_date = None;
        assert_eq!(
            f.service.create_invoice(&f.seller, cmd).unwrap_err(),
            DomainError::validation("Buyer is required")
        );

        let mut cmd = widget_command(&f.buyer);
        cmd.due_date = None;
        cmd.items.clear();
        assert_eq!(
            f.service.create_invoice(&f.seller, cmd).unwrap_err(),
            DomainError::validation("Due date is required")
        );

        let mut cmd = widget_command(&f.buyer);
        cmd.items.clear();
        assert_eq!(
            f.service.create_invoice(&f.seller, cmd).unwrap_err(),
            DomainError::validation("At least one item is required")
        );
        assert!(f.repo.is_empty());
    }

    #[test]
    fn decimal_text_is_checked_after_required_fields() {
        let f = fixture();

        let mut cmd = widget_command(&f.buyer);
        cmd.buyer_id = None;
        cmd.items = vec![item("Widget", "two", "1")];
        assert_eq!(
            f.service.create_invoice(&f.seller, cmd.clone()).unwrap_err(),
            DomainError::validation("Buyer is required")
        );
        assert!(matches!(
            f.service.create_invoice(&f.buyer, cmd),
            Err(DomainError::Forbidden(_))
        ));

        let mut cmd = widget_command(&f.buyer);
        cmd.tax = Some("lots".to_string());
        assert_eq!(
            f.service.create_invoice(&f.seller, cmd).unwrap_err(),
            DomainError::validation("Tax must be a decimal number, got 'lots'")
        );
        assert!(f.repo.is_empty());
    }

    #[test]
    fn out_of_range_amounts_are_validation_errors() {
        let f = fixture();
        for items in [
            vec![item("Widget", "1e10000000", "1")],
            vec![item("Widget", "1.0000001", "50000000")],
            vec![item("Widget", "1000000", "1000000")],
        ] {
            let cmd = CreateInvoiceCommand {
                items,
                ..widget_command(&f.buyer)
            };
            let err = f.service.create_invoice(&f.seller, cmd).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{err:?}");
        }
        assert!(f.repo.is_empty());
    }

    #[test]
    fn item_errors_take_precedence_over_buyer_lookup() {
        let f = fixture();
        let mut cmd = widget_command(&f.buyer);
        cmd.buyer_id = Some(Uuid::new_v4());
        cmd.items = vec![item("Widget", "0", "1")];
        assert!(matches!(
            f.service.create_invoice(&f.seller, cmd),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn create_rejects_unknown_or_unverified_buyer() {
        let f = fixture();

        let mut cmd = widget_command(&f.buyer);
        cmd.buyer_id = Some(Uuid::new_v4());
        assert_eq!(
            f.service.create_invoice(&f.seller, cmd).unwrap_err(),
            DomainError::NotFound("Buyer not found".to_string())
        );

        let pending = actor("pending", Role::Buyer, false);
        f.directory.register(pending.clone()).expect("register");
        assert_eq!(
            f.service
                .create_invoice(&f.seller, widget_command(&pending))
                .unwrap_err(),
            DomainError::NotFound("Buyer has not completed KYC verification".to_string())
        );

        let other_seller = actor("other", Role::Seller, true);
        f.directory.register(other_seller.clone()).expect("register");
        assert!(matches!(
            f.service.create_invoice(&f.seller, widget_command(&other_seller)),
            Err(DomainError::NotFound(_))
        ));
        assert!(f.repo.is_empty());
    }

    #[test]
    fn seller_cannot_invoice_themselves() {
        let f = fixture();
        let mut cmd = widget_command(&f.buyer);
        cmd.buyer_id = Some(f.seller.id);
        assert!(matches!(
            f.service.create_invoice(&f.seller, cmd),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn discount_exceeding_subtotal_persists_nothing() {
        let f = fixture();
        let cmd = CreateInvoiceCommand {
            items: vec![item("Service", "1", "20.00")],
            tax: None,
            discount: Some("25.00".to_string()),
            ..widget_command(&f.buyer)
        };
        assert_eq!(
            f.service.create_invoice(&f.seller, cmd).unwrap_err(),
            DomainError::validation("Discount cannot be greater than subtotal")
        );
        assert!(f.repo.is_empty());
    }

    #[test]
    fn numbers_increase_across_creations() {
        let f = fixture();
        let numbers: Vec<String> = (0..3)
            .map(|_| {
                f.service
                    .create_invoice(&f.seller, widget_command(&f.buyer))
                    .expect("create")
                    .invoice_number
                    .to_string()
            })
            .collect();
        assert_eq!(numbers, vec!["INV-000001", "INV-000002", "INV-000003"]);
    }

    #[test]
    fn concurrent_creations_get_distinct_numbers() {
        let f = Arc::new(fixture());
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let f = Arc::clone(&f);
                thread::spawn(move || {
                    f.service
                        .create_invoice(&f.seller, widget_command(&f.buyer))
                        .expect("create")
                        .invoice_number
                })
            })
            .collect();

        let mut numbers: Vec<InvoiceNumber> = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .collect();
        numbers.sort();
        assert_eq!(numbers, vec![InvoiceNumber::new(1), InvoiceNumber::new(2)]);
    }

    /// Replays a fixed script of sequence values.
    struct ScriptedAllocator(Mutex<Vec<u64>>);

    impl InvoiceNumberAllocator for ScriptedAllocator {
        fn next_number(&self) -> Result<InvoiceNumber, DomainError> {
            let mut script = self.0.lock().expect("lock");
            if script.is_empty() {
                return Err(DomainError::Internal("script exhausted".to_string()));
            }
            Ok(InvoiceNumber::new(script.remove(0)))
        }
    }

    #[test]
    fn allocation_conflict_is_retried_transparently() {
        let f = fixture_with(Arc::new(ScriptedAllocator(Mutex::new(vec![1, 1, 2]))));
        f.service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("first");
        let second = f
            .service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("second succeeds after retry");
        assert_eq!(second.invoice_number, InvoiceNumber::new(2));
        assert_eq!(f.repo.len(), 2);
    }

    #[test]
    fn allocation_gives_up_after_bounded_retries() {
        let f = fixture_with(Arc::new(ScriptedAllocator(Mutex::new(vec![1, 1, 1, 1, 5]))));
        f.service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("first");
        let err = f
            .service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(f.repo.len(), 1);
    }

    #[test]
    fn stranger_cannot_change_status() {
        let f = fixture();
        let invoice = f
            .service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("create");
        let stranger = actor("stranger", Role::Buyer, true);

        let err = f
            .service
            .update_status(invoice.id, &stranger, status(InvoiceStatus::Approved, None))
            .unwrap_err();

        assert!(matches!(err, DomainError::Forbidden(_)));
        assert_eq!(stored(&f, invoice.id).status, InvoiceStatus::Sent);
    }

    #[test]
    fn buyer_approves_sent_invoice() {
        let f = fixture();
        let invoice = f
            .service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("create");
        let approved = f
            .service
            .update_status(invoice.id, &f.buyer, status(InvoiceStatus::Approved, None))
            .expect("approve");
        assert_eq!(approved.status, InvoiceStatus::Approved);
        assert_eq!(stored(&f, invoice.id).status, InvoiceStatus::Approved);
    }

    #[test]
    fn correction_round_trip() {
        let f = fixture();
        let invoice = f
            .service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("create");

        let flagged = f
            .service
            .update_status(
                invoice.id,
                &f.buyer,
                status(InvoiceStatus::CorrectionRequested, Some("wrong price")),
            )
            .expect("request correction");
        assert_eq!(flagged.status, InvoiceStatus::CorrectionRequested);
        assert_eq!(flagged.correction_notes, "wrong price");

        let corrected = f
            .service
            .update_invoice_after_correction(
                invoice.id,
                &f.seller,
                CorrectInvoiceCommand {
                    items: vec![item("Widget", "2", "8.50")],
                    tax: Some("1.00".to_string()),
                    discount: None,
                    notes: Some("price fixed".to_string()),
                },
            )
            .expect("resubmit");

        assert_eq!(corrected.status, InvoiceStatus::Sent);
        assert_eq!(corrected.correction_notes, "");
        assert_eq!(corrected.totals.subtotal, dec("17.00"));
        assert_eq!(corrected.totals.discount, dec("0"));
        assert_eq!(corrected.totals.total, dec("18.00"));
        assert_eq!(corrected.notes, "price fixed");
        assert_eq!(corrected.invoice_number, invoice.invoice_number);
        assert_eq!(stored(&f, invoice.id), corrected);
    }

    #[test]
    fn correction_request_needs_notes() {
        let f = fixture();
        let invoice = f
            .service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("create");

        for notes in [None, Some(""), Some("   ")] {
            let err = f
                .service
                .update_status(
                    invoice.id,
                    &f.buyer,
                    status(InvoiceStatus::CorrectionRequested, notes),
                )
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{notes:?}");
        }
        assert_eq!(stored(&f, invoice.id).status, InvoiceStatus::Sent);
    }

    #[test]
    fn resubmission_requires_pending_correction() {
        let f = fixture();
        let invoice = f
            .service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("create");
        let before = stored(&f, invoice.id);

        let err = f
            .service
            .update_invoice_after_correction(
                invoice.id,
                &f.seller,
                CorrectInvoiceCommand {
                    items: vec![item("Widget", "1", "1")],
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert!(matches!(err, DomainError::Forbidden(_)));
        assert_eq!(stored(&f, invoice.id), before);
    }

    #[test]
    fn only_the_invoice_seller_may_resubmit() {
        let f = fixture();
        let invoice = f
            .service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("create");
        f.service
            .update_status(
                invoice.id,
                &f.buyer,
                status(InvoiceStatus::CorrectionRequested, Some("qty")),
            )
            .expect("flag");

        let rival = actor("rival", Role::Seller, true);
        let cmd = CorrectInvoiceCommand {
            items: vec![item("Widget", "1", "1")],
            ..Default::default()
        };
        for who in [&rival, &f.buyer] {
            assert!(matches!(
                f.service
                    .update_invoice_after_correction(invoice.id, who, cmd.clone()),
                Err(DomainError::Forbidden(_))
            ));
        }
        assert_eq!(
            stored(&f, invoice.id).status,
            InvoiceStatus::CorrectionRequested
        );
    }

    #[test]
    fn resubmission_revalidates_discount() {
        let f = fixture();
        let invoice = f
            .service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("create");
        f.service
            .update_status(
                invoice.id,
                &f.buyer,
                status(InvoiceStatus::CorrectionRequested, Some("too high")),
            )
            .expect("flag");

        let err = f
            .service
            .update_invoice_after_correction(
                invoice.id,
                &f.seller,
                CorrectInvoiceCommand {
                    items: vec![item("Widget", "1", "5")],
                    discount: Some("6".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(stored(&f, invoice.id).correction_notes, "too high");
    }

    #[test]
    fn resubmission_state_is_checked_before_decimal_text() {
        let f = fixture();
        let invoice = f
            .service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("create");

        let err = f
            .service
            .update_invoice_after_correction(
                invoice.id,
                &f.seller,
                CorrectInvoiceCommand {
                    items: vec![item("Widget", "two", "5")],
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)), "{err:?}");
    }

    #[test]
    fn seller_marks_paid_from_any_state_and_buyer_cannot() {
        let f = fixture();
        let invoice = f
            .service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("create");

        assert!(matches!(
            f.service
                .update_status(invoice.id, &f.buyer, status(InvoiceStatus::Paid, None)),
            Err(DomainError::Forbidden(_))
        ));

        f.service
            .update_status(invoice.id, &f.buyer, status(InvoiceStatus::Approved, None))
            .expect("approve");
        let paid = f
            .service
            .update_status(invoice.id, &f.seller, status(InvoiceStatus::Paid, None))
            .expect("paid");
        assert_eq!(paid.status, InvoiceStatus::Paid);

        assert!(matches!(
            f.service
                .update_status(invoice.id, &f.seller, status(InvoiceStatus::Approved, None)),
            Err(DomainError::Forbidden(_))
        ));
        assert_eq!(stored(&f, invoice.id).status, InvoiceStatus::Paid);
    }

    #[test]
    fn missing_invoice_is_not_found() {
        let f = fixture();
        let id = Uuid::new_v4();
        assert!(matches!(
            f.service.get_invoice(id, &f.buyer),
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            f.service
                .update_status(id, &f.seller, status(InvoiceStatus::Paid, None)),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn get_is_restricted_to_parties_and_stable() {
        let f = fixture();
        let invoice = f
            .service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("create");

        let first = f.service.get_invoice(invoice.id, &f.buyer).expect("get");
        let second = f.service.get_invoice(invoice.id, &f.seller).expect("get");
        assert_eq!(first.totals, second.totals);
        assert_eq!(first, second);

        let stranger = actor("stranger", Role::Seller, true);
        assert!(matches!(
            f.service.get_invoice(invoice.id, &stranger),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn listings_are_role_scoped() {
        let f = fixture();
        f.service
            .create_invoice(&f.seller, widget_command(&f.buyer))
            .expect("create");

        assert_eq!(f.service.list_seller_invoices(&f.seller).expect("list").len(), 1);
        assert_eq!(f.service.list_buyer_invoices(&f.buyer).expect("list").len(), 1);
        assert!(matches!(
            f.service.list_seller_invoices(&f.buyer),
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.list_buyer_invoices(&f.seller),
            Err(DomainError::Forbidden(_))
        ));

        let buyers = f.service.list_eligible_buyers(&f.seller).expect("buyers");
        assert_eq!(buyers, vec![f.buyer.clone()]);
        assert!(f.service.list_eligible_buyers(&f.buyer).is_err());
    }
}
