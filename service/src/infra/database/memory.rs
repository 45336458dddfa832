//! In-memory [`Database`] implementation.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};

use common::operations::{By, Insert, Select, Update};
use tokio::sync::RwLock;
use tracerr::Traced;

use crate::domain::{contract, Contract};

use super::{Database, Error};

/// In-process [`Database`] keeping [`Contract`] aggregates in a guarded map.
///
/// Every save is an atomic commit-or-fail: an [`Update`] compares the
/// proposed [`contract::Revision`] with the stored one under the write lock,
/// and a refused commit leaves the stored [`Contract`] untouched. Concurrent
/// writers racing for the same revision are serialized this way, with the
/// loser receiving an [`Error::RevisionMismatch`] to retry upon.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Stored [`Contract`]s, keyed by their IDs.
    contracts: Arc<RwLock<HashMap<contract::Id, Contract>>>,
}

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Database<Select<By<Option<Contract>, contract::Id>>> for Memory {
    type Ok = Option<Contract>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Contract>, contract::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.contracts.read().await.get(&by.into_inner()).cloned())
    }
}

impl Database<Insert<Contract>> for Memory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Insert(contract): Insert<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        match self.contracts.write().await.entry(contract.id) {
            Entry::Occupied(e) => {
                Err(tracerr::new!(Error::AlreadyExists(*e.key())))
            }
            Entry::Vacant(e) => {
                _ = e.insert(contract);
                Ok(())
            }
        }
    }
}

impl Database<Update<Contract>> for Memory {
    type Ok = Contract;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Update(mut contract): Update<Contract>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut contracts = self.contracts.write().await;

        let Some(stored) = contracts.get_mut(&contract.id) else {
            return Err(tracerr::new!(Error::NotExists(contract.id)));
        };
        if stored.rev != contract.rev {
            return Err(tracerr::new!(Error::RevisionMismatch {
                id: contract.id,
                proposed: contract.rev,
                stored: stored.rev,
            }));
        }

        contract.rev = contract.rev.next();
        *stored = contract.clone();

        Ok(contract)
    }
}

#[cfg(test)]
mod spec {
    use common::{
        money::Currency,
        operations::{By, Insert, Select, Update},
        DateTime, Money,
    };

    use crate::{
        domain::{contract, contract::schedule, Contract},
        infra::{database, Database as _},
    };

    use super::Memory;

    fn contract() -> Contract {
        let now = DateTime::from_rfc3339("2018-04-27T06:58:56.919991Z")
            .unwrap();
        let period = contract::Period {
            started_at: now,
            ended_at: DateTime::from_rfc3339("2029-04-27T06:58:56.919991Z")
                .unwrap(),
        };
        let value = contract::Value {
            amount: Money {
                amount: "1200000".parse().unwrap(),
                currency: Currency::Uah,
            },
            amount_paid: Money::zero(Currency::Uah),
            annual_costs_reduction: Vec::new(),
        };

        Contract {
            id: contract::Id::new(),
            rev: contract::Revision::default(),
            title: contract::Title::new("ESCO contract").unwrap(),
            description: contract::Description::new("Lighting modernization")
                .unwrap(),
            status: contract::Status::Active,
            period,
            milestones: schedule::initial(&period, &value, now),
            value,
            documents: Vec::new(),
            changes: Vec::new(),
            created_at: now.coerce(),
            modified_at: now.coerce(),
        }
    }

    #[tokio::test]
    async fn stores_and_selects_contract() {
        let db = Memory::new();
        let contract = contract();

        db.execute(Insert(contract.clone())).await.unwrap();

        let selected = db
            .execute(Select(By::<Option<Contract>, _>::new(contract.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(selected.id, contract.id);
        assert_eq!(selected.rev, contract.rev);

        let missing = db
            .execute(Select(By::<Option<Contract>, _>::new(
                contract::Id::new(),
            )))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn refuses_duplicate_insert() {
        let db = Memory::new();
        let contract = contract();

        db.execute(Insert(contract.clone())).await.unwrap();
        let res = db.execute(Insert(contract.clone())).await;

        let err = res.unwrap_err();
        let err: &database::Error = err.as_ref();
        assert!(matches!(
            err,
            database::Error::AlreadyExists(id) if *id == contract.id,
        ));
    }

    #[tokio::test]
    async fn update_bumps_revision() {
        let db = Memory::new();
        let contract = contract();
        db.execute(Insert(contract.clone())).await.unwrap();

        let saved = db.execute(Update(contract.clone())).await.unwrap();

        assert_eq!(saved.rev, contract.rev.next());
        let stored = db
            .execute(Select(By::<Option<Contract>, _>::new(contract.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.rev, saved.rev);
    }

    #[tokio::test]
    async fn second_writer_of_same_revision_is_refused() {
        let db = Memory::new();
        let contract = contract();
        db.execute(Insert(contract.clone())).await.unwrap();

        // Both writers loaded the same revision; the first one commits.
        db.execute(Update(contract.clone())).await.unwrap();
        let res = db.execute(Update(contract.clone())).await;

        let err = res.unwrap_err();
        let err: &database::Error = err.as_ref();
        assert!(matches!(
            err,
            database::Error::RevisionMismatch { id, .. }
                if *id == contract.id,
        ));

        // The refused commit left the stored contract untouched.
        let stored = db
            .execute(Select(By::<Option<Contract>, _>::new(contract.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.rev, contract.rev.next());
    }

    #[tokio::test]
    async fn update_of_missing_contract_is_refused() {
        let db = Memory::new();
        let contract = contract();

        let res = db.execute(Update(contract.clone())).await;

        let err = res.unwrap_err();
        let err: &database::Error = err.as_ref();
        assert!(matches!(
            err,
            database::Error::NotExists(id) if *id == contract.id,
        ));
    }
}
