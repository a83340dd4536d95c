use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::invoice::InvoiceNumber;
use crate::domain::ports::InvoiceNumberAllocator;

#[derive(QueryableByName)]
struct NextValue {
    #[diesel(sql_type = BigInt)]
    value: i64,
}

/// Allocates from the `invoice_number_seq` PostgreSQL sequence.
///
/// `nextval` is atomic and never hands the same value out twice, even when
/// the surrounding transaction rolls back, so numbers may skip but never
/// repeat.
pub struct PgSequenceAllocator {
    pool: DbPool,
}

impl PgSequenceAllocator {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl InvoiceNumberAllocator for PgSequenceAllocator {
    fn next_number(&self) -> Result<InvoiceNumber, DomainError> {
        let mut conn = self.pool.get()?;

        let next = diesel::sql_query("SELECT nextval('invoice_number_seq') AS value")
            .get_result::<NextValue>(&mut conn)?;
        let sequence = u64::try_from(next.value).map_err(|_| {
            DomainError::Internal(format!("invoice_number_seq returned {}", next.value))
        })?;
        Ok(InvoiceNumber::new(sequence))
    }
}
