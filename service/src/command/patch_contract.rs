//! [`Command`] for patching a [`Contract`].

use common::{
    operations::{By, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        contract::{self, patch, schedule, Patch},
        Contract,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for patching a [`Contract`].
///
/// The [`Patch`] is validated against the current state of the [`Contract`]
/// first, and no mutation happens on a validation failure. Moving
/// `period.endDate` makes the scheduler regenerate the scheduled
/// [`Milestone`]s before the merged [`Contract`] is saved.
///
/// [`Milestone`]: contract::Milestone
#[derive(Clone, Debug)]
pub struct PatchContract {
    /// ID of the [`Contract`] to be patched.
    pub contract_id: contract::Id,

    /// [`Patch`] to be applied.
    pub patch: Patch,
}

impl<Db> Command<PatchContract> for Service<Db>
where
    Db: Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<
            Update<Contract>,
            Ok = Contract,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: PatchContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let PatchContract { contract_id, patch } = cmd;

        let mut contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;

        patch
            .validate(&contract)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let now = DateTime::now();

        // Moving the period end invalidates the scheduled suffix, so the
        // milestones are recomputed before the patch is merged.
        let rescheduled = patch
            .period
            .filter(|p| p.ended_at != contract.period.ended_at)
            .map(|p| schedule::reschedule(&contract, &p, now))
            .transpose()
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let was_pending = contract.status == contract::Status::Pending;
        contract.apply(patch);
        if let Some(milestones) = rescheduled {
            contract.milestones = milestones;
        }
        if was_pending && contract.status.is_active() {
            schedule::start_first(&mut contract.milestones, now);
        }
        contract.modified_at = now.coerce();

        self.database()
            .execute(Update(contract))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`PatchContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Another caller saved the [`Contract`] since this patch loaded it.
    #[display(
        "`Contract(id: {_0})` was updated concurrently, retry the patch"
    )]
    ConflictingUpdate(#[error(not(source))] contract::Id),

    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Patch`] violates the current state of the [`Contract`].
    #[display("invalid `Patch`: {_0}")]
    #[from]
    InvalidPatch(patch::Error),

    /// [`Milestone`]s cannot be rescheduled for the new period.
    ///
    /// [`Milestone`]: contract::Milestone
    #[display("cannot reschedule milestones: {_0}")]
    #[from]
    Reschedule(schedule::Error),
}

impl From<database::Error> for ExecutionError {
    fn from(e: database::Error) -> Self {
        use database::Error as DbE;

        match e {
            DbE::RevisionMismatch { id, .. } => Self::ConflictingUpdate(id),
            e @ (DbE::AlreadyExists(_) | DbE::NotExists(_)) => Self::Db(e),
        }
    }
}

#[cfg(test)]
mod spec {
    use common::{
        money::Currency,
        operations::{By, Insert, Select, Update},
        DateTime, Money,
    };
    use rust_decimal::Decimal;
    use tracerr::Traced;

    use crate::{
        command::CreateContract,
        domain::{
            contract::{self, milestone, patch, Patch},
            Contract,
        },
        infra::{database, Database, Memory},
        Command as _, Service,
    };

    use super::{ExecutionError, PatchContract};

    fn dt(input: &str) -> DateTime {
        DateTime::from_rfc3339(input).unwrap()
    }

    fn register() -> CreateContract {
        CreateContract {
            id: None,
            title: contract::Title::new("ESCO contract").unwrap(),
            description: contract::Description::new("Lighting modernization")
                .unwrap(),
            status: contract::Status::Active,
            period: contract::Period {
                started_at: dt("2018-04-27T06:58:56.919991Z"),
                ended_at: dt("2029-04-27T06:58:56.919991Z"),
            },
            value: contract::Value {
                amount: Money {
                    amount: "1200000".parse().unwrap(),
                    currency: Currency::Uah,
                },
                amount_paid: Money::zero(Currency::Uah),
                annual_costs_reduction: Vec::new(),
            },
        }
    }

    #[tokio::test]
    async fn patch_without_period_end_change_keeps_milestones() {
        let service = Service::new(Memory::new());
        let created = service.execute(register()).await.unwrap();

        let patched = service
            .execute(PatchContract {
                contract_id: created.id,
                patch: Patch {
                    title: contract::Title::new("Street lighting ESCO"),
                    period: Some(created.period),
                    ..Patch::default()
                },
            })
            .await
            .unwrap();

        assert_eq!(patched.milestones.len(), created.milestones.len());
        for (new, old) in patched.milestones.iter().zip(&created.milestones) {
            assert_eq!(new.id, old.id);
            assert_eq!(new.period, old.period);
            assert_eq!(new.modified_at, old.modified_at);
        }
    }

    #[tokio::test]
    async fn noop_patch_is_idempotent() {
        let service = Service::new(Memory::new());
        let created = service.execute(register()).await.unwrap();

        let patch = Patch {
            title: Some(created.title.clone()),
            period: Some(created.period),
            ..Patch::default()
        };
        let once = service
            .execute(PatchContract {
                contract_id: created.id,
                patch: patch.clone(),
            })
            .await
            .unwrap();
        let twice = service
            .execute(PatchContract {
                contract_id: created.id,
                patch,
            })
            .await
            .unwrap();

        assert_eq!(twice.title, once.title);
        assert_eq!(twice.status, once.status);
        assert_eq!(twice.period, once.period);
        assert_eq!(twice.milestones.len(), once.milestones.len());
        for (second, first) in twice.milestones.iter().zip(&once.milestones) {
            assert_eq!(second.id, first.id);
            assert_eq!(second.period, first.period);
            assert_eq!(second.value, first.value);
            assert_eq!(second.modified_at, first.modified_at);
        }
    }

    #[tokio::test]
    async fn truncating_period_end_drops_scheduled_milestones() {
        let service = Service::new(Memory::new());
        let created = service.execute(register()).await.unwrap();

        let patched = service
            .execute(PatchContract {
                contract_id: created.id,
                patch: Patch {
                    period: Some(contract::Period {
                        started_at: created.period.started_at,
                        ended_at: dt("2024-04-27T06:58:56.919991Z"),
                    }),
                    ..Patch::default()
                },
            })
            .await
            .unwrap();

        assert_eq!(patched.milestones.len(), 7);
        assert_eq!(
            patched.milestones[6].period.ended_at,
            patched.period.ended_at,
        );
        for (i, m) in patched.milestones.iter().enumerate() {
            assert_eq!(
                u32::from(m.sequence_number),
                u32::try_from(i).unwrap() + 1,
            );
        }
        assert_eq!(
            patched.milestones[0].status,
            milestone::Status::Pending,
        );
        assert_eq!(patched.milestones[0].id, created.milestones[0].id);
    }

    #[tokio::test]
    async fn activation_promotes_first_milestone() {
        let service = Service::new(Memory::new());
        let mut registration = register();
        registration.status = contract::Status::Pending;
        let created = service.execute(registration).await.unwrap();
        assert!(created.milestones[0].status.is_scheduled());

        let patched = service
            .execute(PatchContract {
                contract_id: created.id,
                patch: Patch {
                    status: Some(contract::Status::Active),
                    ..Patch::default()
                },
            })
            .await
            .unwrap();

        assert_eq!(
            patched.milestones[0].status,
            milestone::Status::Pending,
        );
    }

    #[tokio::test]
    async fn invalid_patch_leaves_contract_unchanged() {
        let service = Service::new(Memory::new());
        let created = service.execute(register()).await.unwrap();

        let res = service
            .execute(PatchContract {
                contract_id: created.id,
                patch: Patch {
                    status: Some(contract::Status::Terminated),
                    value: Some(patch::ValuePatch {
                        amount_paid: Some(Money {
                            amount: Decimal::from(100_000),
                            currency: Currency::Uah,
                        }),
                        ..patch::ValuePatch::default()
                    }),
                    ..Patch::default()
                },
            })
            .await;

        let err = res.unwrap_err();
        let err: &ExecutionError = err.as_ref();
        assert!(matches!(
            err,
            ExecutionError::InvalidPatch(patch::Error::ConflictingAmount {
                ..
            }),
        ));

        let stored = service
            .execute(crate::query::contract::ById::by(created.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.rev, created.rev);
        assert_eq!(stored.status, contract::Status::Active);
    }

    #[tokio::test]
    async fn missing_contract_is_reported() {
        let service = Service::new(Memory::new());
        let unknown = contract::Id::new();

        let res = service
            .execute(PatchContract {
                contract_id: unknown,
                patch: Patch::default(),
            })
            .await;

        let err = res.unwrap_err();
        let err: &ExecutionError = err.as_ref();
        assert!(matches!(
            err,
            ExecutionError::ContractNotExists(id) if *id == unknown,
        ));
    }

    /// [`Database`] interleaving a competing save between a caller's load
    /// and save, reproducing two callers racing for the same revision.
    #[derive(Clone, Debug)]
    struct Interleaved(Memory);

    impl Database<Select<By<Option<Contract>, contract::Id>>> for Interleaved {
        type Ok = Option<Contract>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            Select(by): Select<By<Option<Contract>, contract::Id>>,
        ) -> Result<Self::Ok, Self::Err> {
            let loaded = self
                .0
                .execute(Select(By::<Option<Contract>, _>::new(
                    by.into_inner(),
                )))
                .await?;
            if let Some(competing) = &loaded {
                let mut competing = competing.clone();
                competing.value.amount_paid.amount = Decimal::ONE;
                _ = self.0.execute(Update(competing)).await?;
            }
            Ok(loaded)
        }
    }

    impl Database<Insert<Contract>> for Interleaved {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            op: Insert<Contract>,
        ) -> Result<Self::Ok, Self::Err> {
            self.0.execute(op).await
        }
    }

    impl Database<Update<Contract>> for Interleaved {
        type Ok = Contract;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            op: Update<Contract>,
        ) -> Result<Self::Ok, Self::Err> {
            self.0.execute(op).await
        }
    }

    #[tokio::test]
    async fn concurrent_save_conflicts() {
        let memory = Memory::new();
        let created = Service::new(memory.clone())
            .execute(register())
            .await
            .unwrap();

        let racing = Service::new(Interleaved(memory));
        let res = racing
            .execute(PatchContract {
                contract_id: created.id,
                patch: Patch {
                    title: contract::Title::new("Renamed"),
                    ..Patch::default()
                },
            })
            .await;

        let err = res.unwrap_err();
        let err: &ExecutionError = err.as_ref();
        assert!(matches!(
            err,
            ExecutionError::ConflictingUpdate(id) if *id == created.id,
        ));
    }
}
