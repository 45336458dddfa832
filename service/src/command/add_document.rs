//! [`Command`] for attaching a new [`Document`] to a [`Contract`].

use common::{
    operations::{By, Select, Update},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        contract::{self, document, Document},
        Contract,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for attaching a new [`Document`] to a [`Contract`].
///
/// The binary payload is handled by an external file storage beforehand:
/// this [`Command`] only links the resulting [`document::Upload`] metadata,
/// gated by the lifecycle of the [`Contract`] and of the related entity.
#[derive(Clone, Debug)]
pub struct AddDocument {
    /// ID of the [`Contract`] to attach the [`Document`] to.
    pub contract_id: contract::Id,

    /// Metadata of the uploaded file.
    pub upload: document::Upload,
}

impl<Db> Command<AddDocument> for Service<Db>
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
    type Ok = Document;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: AddDocument) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AddDocument {
            contract_id,
            upload,
        } = cmd;

        let mut contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;

        document::guard(
            &contract,
            document::Operation::Create,
            upload.relation,
            None,
        )
        .map_err(tracerr::from_and_wrap!(=> E))?;

        let now = DateTime::now();
        let doc = Document {
            id: document::Id::new(),
            title: upload.title,
            description: upload.description,
            format: upload.format,
            url: upload.url,
            relation: upload.relation,
            published_at: now.coerce(),
            modified_at: now.coerce(),
        };
        contract.documents.push(doc.clone());
        contract.modified_at = now.coerce();

        self.database()
            .execute(Update(contract))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(doc)
    }
}

/// Error of [`AddDocument`] [`Command`] execution.
#[derive(Clone, Copy, Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Another caller saved the [`Contract`] since this operation loaded it.
    #[display(
        "`Contract(id: {_0})` was updated concurrently, retry the operation"
    )]
    ConflictingUpdate(#[error(not(source))] contract::Id),

    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Operation violates the [`Document`] lifecycle of the [`Contract`].
    #[display("operation is forbidden: {_0}")]
    #[from]
    Forbidden(document::OperationError),
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
    use common::{money::Currency, DateTime, Money};

    use crate::{
        command::CreateContract,
        domain::contract::{self, document, milestone},
        infra::Memory,
        Command as _, Service,
    };

    use super::{AddDocument, ExecutionError};

    fn dt(input: &str) -> DateTime {
        DateTime::from_rfc3339(input).unwrap()
    }

    async fn registered(status: contract::Status) -> (Service<Memory>, contract::Id) {
        let service = Service::new(Memory::new());
        let contract = service
            .execute(CreateContract {
                id: None,
                title: contract::Title::new("ESCO contract").unwrap(),
                description: contract::Description::new(
                    "Lighting modernization",
                )
                .unwrap(),
                status,
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
            })
            .await
            .unwrap();
        (service, contract.id)
    }

    fn upload(relation: document::Relation) -> document::Upload {
        document::Upload {
            title: "act.pdf".to_owned().into(),
            description: None,
            format: "application/pdf".to_owned().into(),
            url: "https://docs.example.com/act.pdf".to_owned().into(),
            relation,
        }
    }

    #[tokio::test]
    async fn attaches_document_to_active_contract() {
        let (service, contract_id) =
            registered(contract::Status::Active).await;

        let doc = service
            .execute(AddDocument {
                contract_id,
                upload: upload(document::Relation::Contract),
            })
            .await
            .unwrap();

        let stored = service
            .execute(crate::query::contract::ById::by(contract_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.documents.len(), 1);
        assert_eq!(stored.documents[0].id, doc.id);
        assert_eq!(
            stored.documents[0].relation,
            document::Relation::Contract,
        );
    }

    #[tokio::test]
    async fn rejects_upload_on_pending_contract() {
        let (service, contract_id) =
            registered(contract::Status::Pending).await;

        let res = service
            .execute(AddDocument {
                contract_id,
                upload: upload(document::Relation::Contract),
            })
            .await;

        let err = res.unwrap_err();
        let err: &ExecutionError = err.as_ref();
        assert!(matches!(
            err,
            ExecutionError::Forbidden(
                document::OperationError::InvalidContractStatus(
                    contract::Status::Pending,
                ),
            ),
        ));
    }

    #[tokio::test]
    async fn rejects_upload_for_scheduled_milestone() {
        let (service, contract_id) =
            registered(contract::Status::Active).await;
        let stored = service
            .execute(crate::query::contract::ById::by(contract_id))
            .await
            .unwrap()
            .unwrap();
        // The second milestone has not started yet.
        let scheduled = &stored.milestones[1];
        assert_eq!(scheduled.status, milestone::Status::Scheduled);
        let scheduled_id = scheduled.id;

        let res = service
            .execute(AddDocument {
                contract_id,
                upload: upload(document::Relation::Milestone(scheduled_id)),
            })
            .await;

        let err = res.unwrap_err();
        let err: &ExecutionError = err.as_ref();
        assert!(matches!(
            err,
            ExecutionError::Forbidden(
                document::OperationError::MilestoneNotStarted(id),
            ) if *id == scheduled_id,
        ));
    }

    #[tokio::test]
    async fn missing_contract_is_reported() {
        let service = Service::new(Memory::new());
        let unknown = contract::Id::new();

        let res = service
            .execute(AddDocument {
                contract_id: unknown,
                upload: upload(document::Relation::Contract),
            })
            .await;

        let err = res.unwrap_err();
        let err: &ExecutionError = err.as_ref();
        assert!(matches!(
            err,
            ExecutionError::ContractNotExists(id) if *id == unknown,
        ));
    }
}
