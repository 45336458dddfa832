//! [`Command`] for patching the metadata of a [`Document`].

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

/// [`Command`] for patching the metadata of the latest [`Document`] version.
///
/// The lifecycle guard evaluates the effective [`document::Relation`]: the
/// patched one when the patch carries it, the stored one otherwise. A
/// [`Document`] owned by a pending [`Change`] is locked until the amendment
/// is resolved.
///
/// [`Change`]: contract::Change
#[derive(Clone, Debug)]
pub struct PatchDocument {
    /// ID of the [`Contract`] owning the [`Document`].
    pub contract_id: contract::Id,

    /// ID of the [`Document`] to be patched.
    pub document_id: document::Id,

    /// [`document::Patch`] to be applied.
    pub patch: document::Patch,
}

impl<Db> Command<PatchDocument> for Service<Db>
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
        cmd: PatchDocument,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let PatchDocument {
            contract_id,
            document_id,
            patch,
        } = cmd;

        let mut contract = self
            .database()
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;

        let Some(latest) = contract
            .documents
            .iter()
            .rposition(|d| d.id == document_id)
        else {
            return Err(tracerr::new!(E::DocumentNotExists(document_id)));
        };

        let target = contract.documents[latest].clone();
        let relation = patch.relation.unwrap_or(target.relation);
        document::guard(
            &contract,
            document::Operation::Patch,
            relation,
            Some(&target),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?;

        let now = DateTime::now();
        let doc = &mut contract.documents[latest];
        doc.apply(patch);
        doc.modified_at = now.coerce();
        let doc = doc.clone();
        contract.modified_at = now.coerce();

        self.database()
            .execute(Update(contract))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(doc)
    }
}

/// Error of [`PatchDocument`] [`Command`] execution.
#[derive(Clone, Debug, Display, Error, From)]
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
