//! [`Command`] for uploading a new version of a [`Document`].

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

/// [`Command`] for uploading a new version of an existing [`Document`].
///
/// The new version is appended under the same [`document::Id`], keeping the
/// full version history of the [`Document`] within its [`Contract`].
#[derive(Clone, Debug)]
pub struct ReplaceDocument {
    /// ID of the [`Contract`] owning the [`Document`].
    pub contract_id: contract::Id,

    /// ID of the [`Document`] to upload the new version of.
    pub document_id: document::Id,

    /// Metadata of the uploaded file.
    pub upload: document::Upload,
}

impl<Db> Command<ReplaceDocument> for Service<Db>
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

    async fn execute(
        &self,
        cmd: ReplaceDocument,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ReplaceDocument {
            contract_id,
            document_id,
            upload,
        } = cmd;

        let mut contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;

        let target = contract
            .document(document_id)
            .cloned()
            .ok_or(E::DocumentNotExists(document_id))
            .map_err(tracerr::wrap!())?;

        document::guard(
            &contract,
            document::Operation::Replace,
            upload.relation,
            Some(&target),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?;

        let now = DateTime::now();
        let doc = Document {
            id: document_id,
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

/// Error of [`ReplaceDocument`] [`Command`] execution.
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

    /// [`Document`] with the provided ID is not attached to the
    /// [`Contract`].
    #[display("`Document(id: {_0})` does not exist")]
    DocumentNotExists(#[error(not(source))] document::Id),

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
