//! [`Document`]-related definitions.

use axum::{
    extract::Path,
    response::{IntoResponse, Response},
    Json,
};
use common::DateTime;
use itertools::Itertools as _;
use serde::{Deserialize, Serialize};
use service::{
    command,
    domain::{self, contract::document},
    query, Command as _, Query as _,
};
use uuid::Uuid;

use crate::{define_error, AsError, Context, Error};

use super::NotFoundError;

/// Metadata of a file attached to a `Contract`.
///
/// The payload itself lives in an external storage and is referenced by
/// `url`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// ID of the `Document`, shared by all its versions.
    pub id: Uuid,

    /// Title of the `Document` (usually the file name).
    pub title: String,

    /// Optional human-readable description of the `Document`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Content type of the `Document`'s payload.
    pub format: String,

    /// Reference to the externally stored payload of the `Document`.
    pub url: String,

    /// Kind of the entity within the `Contract` the `Document` is attached
    /// to.
    pub document_of: DocumentOf,

    /// ID of the related entity, when [`DocumentOf`] requires one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_item: Option<Uuid>,

    /// `DateTime` when this version of the `Document` was published.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub published_at: DateTime,

    /// `DateTime` when the `Document` was updated last time.
    #[serde(with = "common::datetime::serde::rfc3339")]
    pub modified_at: DateTime,
}

impl From<domain::contract::Document> for Document {
    fn from(doc: domain::contract::Document) -> Self {
        let domain::contract::Document {
            id,
            title,
            description,
            format,
            url,
            relation,
            published_at,
            modified_at,
        } = doc;

        let (document_of, related_item) = match relation {
            document::Relation::Contract => (DocumentOf::Contract, None),
            document::Relation::Milestone(id) => {
                (DocumentOf::Milestone, Some(id.into()))
            }
            document::Relation::Change(id) => {
                (DocumentOf::Change, Some(id.into()))
            }
        };

        Self {
            id: id.into(),
            title: title.into(),
            description: description.map(Into::into),
            format: format.into(),
            url: url.into(),
            document_of,
            related_item,
            published_at: published_at.coerce(),
            modified_at: modified_at.coerce(),
        }
    }
}

/// Kind of the entity within a `Contract` a [`Document`] is attached to.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DocumentOf {
    /// The owning `Contract` itself.
    #[default]
    Contract,

    /// A `Milestone` of the owning `Contract`.
    Milestone,

    /// A `Change` of the owning `Contract`.
    Change,
}

impl DocumentOf {
    /// Combines this kind with the related entity ID into a
    /// [`document::Relation`].
    fn into_relation(
        self,
        related_item: Option<Uuid>,
    ) -> Result<document::Relation, Error> {
        Ok(match self {
            Self::Contract => document::Relation::Contract,
            Self::Milestone => document::Relation::Milestone(
                related_item
                    .ok_or(RelationError::MissingRelatedItem)?
                    .into(),
            ),
            Self::Change => document::Relation::Change(
                related_item
                    .ok_or(RelationError::MissingRelatedItem)?
                    .into(),
            ),
        })
    }
}

/// Body of a [`Document`] upload request.
///
/// The binary payload is handled by an external file storage beforehand,
/// so the body carries its metadata only.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Title of the uploaded file.
    pub title: String,

    /// Optional human-readable description of the uploaded file.
    pub description: Option<String>,

    /// Content type of the uploaded file.
    pub format: String,

    /// Reference to the externally stored payload.
    pub url: String,

    /// Kind of the entity the file is attached to.
    #[serde(default)]
    pub document_of: DocumentOf,

    /// ID of the related entity, when [`DocumentOf`] requires one.
    pub related_item: Option<Uuid>,
}

impl UploadRequest {
    /// Converts this request into a [`document::Upload`].
    fn into_upload(self) -> Result<document::Upload, Error> {
        let Self {
            title,
            description,
            format,
            url,
            document_of,
            related_item,
        } = self;

        Ok(document::Upload {
            title: title.into(),
            description: description.map(Into::into),
            format: format.into(),
            url: url.into(),
            relation: document_of.into_relation(related_item)?,
        })
    }
}

/// Body of a [`Document`] metadata patch request: a sparse set of new field
/// values.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PatchRequest {
    /// New title.
    pub title: Option<String>,

    /// New description.
    pub description: Option<String>,

    /// New kind of the related entity.
    pub document_of: Option<DocumentOf>,

    /// ID of the related entity, when the new [`DocumentOf`] requires one.
    pub related_item: Option<Uuid>,
}

impl PatchRequest {
    /// Converts this request into a [`document::Patch`].
    fn into_patch(self) -> Result<document::Patch, Error> {
        let Self {
            title,
            description,
            document_of,
            related_item,
        } = self;

        Ok(document::Patch {
            title: title.map(Into::into),
            description: description.map(Into::into),
            relation: document_of
                .map(|of| of.into_relation(related_item))
                .transpose()?,
        })
    }
}

/// Lists the latest version of every [`Document`] attached to the
/// `Contract`.
///
/// # Errors
///
/// Errors if the `Contract` does not exist.
pub async fn list(
    context: Context,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<Vec<Document>>, Error> {
    let contract = context
        .service()
        .execute(query::contract::ById::by(contract_id.into()))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| Error::from(NotFoundError::Contract))?;

    let mut docs: Vec<Document> = contract
        .documents
        .iter()
        .rev()
        .unique_by(|doc| doc.id)
        .cloned()
        .map(Into::into)
        .collect();
    docs.reverse();

    Ok(Json(docs))
}

/// Fetches the latest version of the [`Document`] with the provided ID.
///
/// # Errors
///
/// Errors if the `Contract` or the [`Document`] does not exist.
pub async fn fetch(
    context: Context,
    Path((contract_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Document>, Error> {
    let contract = context
        .service()
        .execute(query::contract::ById::by(contract_id.into()))
        .await
        .map_err(AsError::into_error)?
        .ok_or_else(|| Error::from(NotFoundError::Contract))?;

    let doc = contract
        .document(document_id.into())
        .cloned()
        .ok_or_else(|| Error::from(NotFoundError::Document))?;

    Ok(Json(doc.into()))
}

/// Attaches a new [`Document`] to the `Contract`.
///
/// # Errors
///
/// See [`command::add_document::ExecutionError`].
pub async fn create(
    context: Context,
    Path(contract_id): Path<Uuid>,
    Json(req): Json<UploadRequest>,
) -> Result<Response, Error> {
    let doc: Document = context
        .service()
        .execute(command::AddDocument {
            contract_id: contract_id.into(),
            upload: req.into_upload()?,
        })
        .await
        .map_err(AsError::into_error)?
        .into();

    tracing::info!(id = %doc.id, contract = %contract_id, "created contract document");

    let location =
        format!("/contracts/{contract_id}/documents/{}", doc.id);
    Ok((
        http::StatusCode::CREATED,
        [(http::header::LOCATION, location)],
        Json(doc),
    )
        .into_response())
}

/// Uploads a new version of the [`Document`] with the provided ID.
///
/// # Errors
///
/// See [`command::replace_document::ExecutionError`].
pub async fn replace(
    context: Context,
    Path((contract_id, document_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<Document>, Error> {
    let doc = context
        .service()
        .execute(command::ReplaceDocument {
            contract_id: contract_id.into(),
            document_id: document_id.into(),
            upload: req.into_upload()?,
        })
        .await
        .map_err(AsError::into_error)?;

    tracing::info!(id = %document_id, contract = %contract_id, "replaced contract document");

    Ok(Json(doc.into()))
}

/// Patches the metadata of the [`Document`] with the provided ID.
///
/// # Errors
///
/// See [`command::patch_document::ExecutionError`].
pub async fn patch(
    context: Context,
    Path((contract_id, document_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<PatchRequest>,
) -> Result<Json<Document>, Error> {
    let doc = context
        .service()
        .execute(command::PatchDocument {
            contract_id: contract_id.into(),
            document_id: document_id.into(),
            patch: req.into_patch()?,
        })
        .await
        .map_err(AsError::into_error)?;

    tracing::info!(id = %document_id, contract = %contract_id, "updated contract document");

    Ok(Json(doc.into()))
}

impl AsError for command::add_document::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::ConflictingUpdate(_) => Error {
                code: "CONFLICTING_UPDATE",
                status_code: http::StatusCode::CONFLICT,
                message: self.to_string(),
                backtrace: None,
            },
            Self::ContractNotExists(_) => Error {
                code: "NOT_FOUND",
                status_code: http::StatusCode::NOT_FOUND,
                message: self.to_string(),
                backtrace: None,
            },
            Self::Db(e) => return e.try_as_error(),
            Self::Forbidden(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::replace_document::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::ConflictingUpdate(_) => Error {
                code: "CONFLICTING_UPDATE",
                status_code: http::StatusCode::CONFLICT,
                message: self.to_string(),
                backtrace: None,
            },
            Self::ContractNotExists(_) | Self::DocumentNotExists(_) => {
                Error {
                    code: "NOT_FOUND",
                    status_code: http::StatusCode::NOT_FOUND,
                    message: self.to_string(),
                    backtrace: None,
                }
            }
            Self::Db(e) => return e.try_as_error(),
            Self::Forbidden(e) => return e.try_as_error(),
        })
    }
}

impl AsError for command::patch_document::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::ConflictingUpdate(_) => Error {
                code: "CONFLICTING_UPDATE",
                status_code: http::StatusCode::CONFLICT,
                message: self.to_string(),
                backtrace: None,
            },
            Self::ContractNotExists(_) | Self::DocumentNotExists(_) => {
                Error {
                    code: "NOT_FOUND",
                    status_code: http::StatusCode::NOT_FOUND,
                    message: self.to_string(),
                    backtrace: None,
                }
            }
            Self::Db(e) => return e.try_as_error(),
            Self::Forbidden(e) => return e.try_as_error(),
        })
    }
}

impl AsError for document::OperationError {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error {
            code: match self {
                Self::OwnedByPendingChange(_) => "CONFLICTING_CHANGE",
                Self::ChangeNotExists(_)
                | Self::InvalidContractStatus(_)
                | Self::MilestoneConcluded(_)
                | Self::MilestoneNotExists(_)
                | Self::MilestoneNotStarted(_) => "FORBIDDEN_OPERATION",
            },
            status_code: match self {
                Self::OwnedByPendingChange(_) => http::StatusCode::CONFLICT,
                Self::ChangeNotExists(_)
                | Self::InvalidContractStatus(_)
                | Self::MilestoneConcluded(_)
                | Self::MilestoneNotExists(_)
                | Self::MilestoneNotStarted(_) => {
                    http::StatusCode::FORBIDDEN
                }
            },
            message: self.to_string(),
            backtrace: None,
        })
    }
}

define_error! {
    enum RelationError {
        #[code = "MISSING_RELATED_ITEM"]
        #[status = BAD_REQUEST]
        #[message = "`relatedItem` is required for the provided `documentOf`"]
        MissingRelatedItem,
    }
}

#[cfg(test)]
mod spec {
    use super::{DocumentOf, UploadRequest};

    #[test]
    fn defaults_upload_relation_to_contract() {
        let req: UploadRequest = serde_json::from_str(
            r#"{
                "title": "act.pdf",
                "format": "application/pdf",
                "url": "https://docs.example.com/act.pdf"
            }"#,
        )
        .unwrap();

        assert_eq!(req.document_of, DocumentOf::Contract);
        assert!(req.related_item.is_none());
        assert!(req.into_upload().is_ok());
    }

    #[test]
    fn milestone_relation_requires_related_item() {
        let req: UploadRequest = serde_json::from_str(
            r#"{
                "title": "act.pdf",
                "format": "application/pdf",
                "url": "https://docs.example.com/act.pdf",
                "documentOf": "milestone"
            }"#,
        )
        .unwrap();

        let err = req.into_upload().unwrap_err();
        assert_eq!(err.code, "MISSING_RELATED_ITEM");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
    }
}
