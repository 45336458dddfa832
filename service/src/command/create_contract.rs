//! [`Command`] for registering a new [`Contract`].

use common::{operations::Insert, DateTime};
use derive_more::{Display, Error};
use tracerr::Traced;

use crate::{
    domain::{
        contract::{self, schedule},
        Contract,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for registering a [`Contract`] awarded by an external
/// procurement system.
///
/// The full schedule of [`Milestone`]s covering the [`contract::Period`] is
/// generated on registration, with the first one promoted once the
/// [`Contract`] arrives in the [`contract::Status::Active`] status already.
///
/// [`Milestone`]: contract::Milestone
#[derive(Clone, Debug)]
pub struct CreateContract {
    /// ID assigned to the [`Contract`] externally, if any.
    pub id: Option<contract::Id>,

    /// Title of the [`Contract`].
    pub title: contract::Title,

    /// Description of the [`Contract`].
    pub description: contract::Description,

    /// Status the [`Contract`] arrives in.
    pub status: contract::Status,

    /// Overall effective window of the [`Contract`].
    pub period: contract::Period,

    /// Financial summary of the [`Contract`].
    pub value: contract::Value,
}

impl<Db> Command<CreateContract> for Service<Db>
where
    Db: Database<Insert<Contract>, Err = Traced<database::Error>>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateContract,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateContract {
            id,
            title,
            description,
            status,
            period,
            value,
        } = cmd;

        if !period.is_ordered() {
            return Err(tracerr::new!(E::InvalidPeriod));
        }

        let now = DateTime::now();
        let mut milestones = schedule::initial(&period, &value, now);
        if status.is_active() {
            schedule::start_first(&mut milestones, now);
        }

        let contract = Contract {
            id: id.unwrap_or_else(contract::Id::new),
            rev: contract::Revision::default(),
            title,
            description,
            status,
            period,
            value,
            milestones,
            documents: Vec::new(),
            changes: Vec::new(),
            created_at: now.coerce(),
            modified_at: now.coerce(),
        };
        self.database()
            .execute(Insert(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(contract)
    }
}

/// Error of [`CreateContract`] [`Command`] execution.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum ExecutionError {
    /// [`Contract`] with the provided ID is registered already.
    #[display("`Contract(id: {_0})` is registered already")]
    AlreadyRegistered(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Provided [`contract::Period`] does not end after it starts.
    #[display("`period.endDate` must follow `period.startDate`")]
    InvalidPeriod,
}

impl From<database::Error> for ExecutionError {
    fn from(e: database::Error) -> Self {
        use database::Error as DbE;

        match e {
            DbE::AlreadyExists(id) => Self::AlreadyRegistered(id),
            e @ (DbE::NotExists(_) | DbE::RevisionMismatch { .. }) => {
                Self::Db(e)
            }
        }
    }
}
