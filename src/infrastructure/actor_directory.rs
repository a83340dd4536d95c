use std::str::FromStr;

use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::invoice::{Actor, Role};
use crate::domain::ports::ActorDirectory;
use crate::schema::actors;

use super::models::{ActorRow, NewActorRow};

impl TryFrom<ActorRow> for Actor {
    type Error = DomainError;

    fn try_from(row: ActorRow) -> Result<Self, Self::Error> {
        Ok(Actor {
            id: row.id,
            role: Role::from_str(&row.role)?,
            name: row.name,
            email: row.email,
            kyc_completed: row.kyc_completed,
        })
    }
}

/// Reads the `actors` table maintained by the registration and KYC flows.
pub struct DieselActorDirectory {
    pool: DbPool,
}

impl DieselActorDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert or refresh an actor record; used for seeding.
    pub fn register(&self, actor: &Actor) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(actors::table)
            .values(&NewActorRow {
                id: actor.id,
                name: &actor.name,
                email: &actor.email,
                role: actor.role.as_str(),
                kyc_completed: actor.kyc_completed,
            })
            .on_conflict(actors::id)
            .do_update()
            .set((
                actors::name.eq(&actor.name),
                actors::email.eq(&actor.email),
                actors::role.eq(actor.role.as_str()),
                actors::kyc_completed.eq(actor.kyc_completed),
            ))
            .execute(&mut conn)?;
        Ok(())
    }
}

impl ActorDirectory for DieselActorDirectory {
    fn lookup_actor(&self, id: Uuid) -> Result<Option<Actor>, DomainError> {
        let mut conn = self.pool.get()?;

        actors::table
            .filter(actors::id.eq(id))
            .select(ActorRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Actor::try_from)
            .transpose()
    }

    fn list_verified_buyers(&self) -> Result<Vec<Actor>, DomainError> {
        let mut conn = self.pool.get()?;

        actors::table
            .filter(actors::role.eq(Role::Buyer.as_str()))
            .filter(actors::kyc_completed.eq(true))
            .select(ActorRow::as_select())
            .order(actors::name.asc())
            .load(&mut conn)?
            .into_iter()
            .map(Actor::try_from)
            .collect()
    }
}
