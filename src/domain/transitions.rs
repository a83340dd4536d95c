//! Invoice lifecycle rules, kept as data.
//!
//! Each [`Rule`] grants one role one request from a set of current states.
//! Anything not listed is refused. Party membership (is this actor really the
//! buyer/seller of the invoice?) is checked by the caller before consulting
//! the table.

use super::errors::DomainError;
use super::invoice::{InvoiceStatus, Role};

/// What an actor asks to happen to an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    ChangeStatus(InvoiceStatus),
    /// Seller replaces items after a correction request; lands in `sent`.
    Resubmit,
}

impl Request {
    pub fn target(&self) -> InvoiceStatus {
        match self {
            Request::ChangeStatus(status) => *status,
            Request::Resubmit => InvoiceStatus::Sent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    RecordCorrectionNotes,
    /// Recompute items and totals, clear correction notes.
    ApplyCorrection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FromState {
    Any,
    Only(InvoiceStatus),
}

impl FromState {
    fn admits(&self, current: InvoiceStatus) -> bool {
        match self {
            FromState::Any => true,
            FromState::Only(status) => *status == current,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    role: Role,
    from: FromState,
    request: Request,
    effect: Effect,
}

const RULES: &[Rule] = &[
    Rule {
        role: Role::Buyer,
        from: FromState::Only(InvoiceStatus::Sent),
        request: Request::ChangeStatus(InvoiceStatus::Approved),
        effect: Effect::None,
    },
    Rule {
        role: Role::Buyer,
        from: FromState::Only(InvoiceStatus::Sent),
        request: Request::ChangeStatus(InvoiceStatus::CorrectionRequested),
        effect: Effect::RecordCorrectionNotes,
    },
    Rule {
        role: Role::Seller,
        from: FromState::Only(InvoiceStatus::CorrectionRequested),
        request: Request::Resubmit,
        effect: Effect::ApplyCorrection,
    },
    Rule {
        role: Role::Seller,
        from: FromState::Any,
        request: Request::ChangeStatus(InvoiceStatus::Sent),
        effect: Effect::None,
    },
    Rule {
        role: Role::Seller,
        from: FromState::Any,
        request: Request::ChangeStatus(InvoiceStatus::Paid),
        effect: Effect::None,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub to: InvoiceStatus,
    pub effect: Effect,
}

/// Look up whether `role` may perform `request` on an invoice in `current`.
pub fn decide(
    role: Role,
    current: InvoiceStatus,
    request: Request,
) -> Result<Transition, DomainError> {
    let mut granted_for_role = false;
    for rule in RULES.iter().filter(|r| r.role == role && r.request == request) {
        granted_for_role = true;
        if rule.from.admits(current) {
            return Ok(Transition {
                to: request.target(),
                effect: rule.effect,
            });
        }
    }

    if !granted_for_role {
        return Err(DomainError::forbidden(format!(
            "Invalid status update for {}",
            role.as_str()
        )));
    }

    match request {
        Request::Resubmit => Err(DomainError::forbidden(
            "Can only update invoices that need correction",
        )),
        Request::ChangeStatus(target) => Err(DomainError::forbidden(format!(
            "Cannot move invoice from '{current}' to '{target}'"
        ))),
    }
}
