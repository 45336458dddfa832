//! [`Document`] definitions and the lifecycle guard of operations upon
//! them.

use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, Error, From, Into};
use uuid::Uuid;

use super::{change, milestone, Contract};

/// Metadata of a file attached to a [`Contract`].
///
/// The payload itself lives in an external storage and is referenced by
/// [`Url`]. Uploading a new version of a [`Document`] appends a fresh
/// record under the same [`Id`], so the full version history is retained.
#[derive(Clone, Debug)]
pub struct Document {
    /// ID of this [`Document`], shared by all its versions.
    pub id: Id,

    /// [`Title`] of this [`Document`] (usually the file name).
    pub title: Title,

    /// Optional human-readable description of this [`Document`].
    pub description: Option<Description>,

    /// Content type of this [`Document`]'s payload.
    pub format: Format,

    /// Reference to the externally stored payload of this [`Document`].
    pub url: Url,

    /// Entity within the [`Contract`] this [`Document`] is attached to.
    pub relation: Relation,

    /// [`DateTime`] when this version of the [`Document`] was published.
    ///
    /// [`DateTime`]: common::DateTime
    pub published_at: PublicationDateTime,

    /// [`DateTime`] when this [`Document`] was updated last time.
    ///
    /// [`DateTime`]: common::DateTime
    pub modified_at: ModificationDateTime,
}

impl Document {
    /// Merges the provided metadata [`Patch`] into this [`Document`].
    ///
    /// Only the fields present in the [`Patch`] are touched.
    pub fn apply(&mut self, patch: Patch) {
        let Patch {
            title,
            description,
            relation,
        } = patch;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = Some(description);
        }
        if let Some(relation) = relation {
            self.relation = relation;
        }
    }
}

/// ID of a [`Document`].
#[derive(
    Clone, Copy, Debug, Default, Display, Eq, From, Hash, Into, PartialEq,
)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Title of a [`Document`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, Into, PartialEq)]
#[as_ref(str, String)]
pub struct Title(String);

/// Description of a [`Document`].
#[derive(Clone, Debug, Display, Eq, From, Into, PartialEq)]
pub struct Description(String);

/// Content type of a [`Document`]'s payload.
#[derive(Clone, Debug, Display, Eq, From, Into, PartialEq)]
pub struct Format(String);

/// Reference to an externally stored payload of a [`Document`].
#[derive(Clone, Debug, Display, Eq, From, Into, PartialEq)]
pub struct Url(String);

/// Entity within a [`Contract`] a [`Document`] is attached to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Relation {
    /// The owning [`Contract`] itself.
    Contract,

    /// A [`Milestone`] of the owning [`Contract`].
    ///
    /// [`Milestone`]: super::Milestone
    Milestone(milestone::Id),

    /// A [`Change`] of the owning [`Contract`].
    ///
    /// [`Change`]: super::Change
    Change(change::Id),
}

/// Metadata of an uploaded file to be attached to a [`Contract`] as a
/// [`Document`].
///
/// Carries everything but the identity and the timestamps, which are
/// assigned on attachment. The payload itself is handled by an external
/// file storage producing the [`Url`].
#[derive(Clone, Debug)]
pub struct Upload {
    /// [`Title`] of the uploaded file.
    pub title: Title,

    /// Optional human-readable description of the uploaded file.
    pub description: Option<Description>,

    /// Content type of the uploaded file.
    pub format: Format,

    /// Reference to the externally stored payload.
    pub url: Url,

    /// Entity within the [`Contract`] the file is attached to.
    pub relation: Relation,
}

/// Partial update of a [`Document`]'s metadata.
#[derive(Clone, Debug, Default)]
pub struct Patch {
    /// New [`Title`].
    pub title: Option<Title>,

    /// New [`Description`].
    pub description: Option<Description>,

    /// New [`Relation`].
    pub relation: Option<Relation>,
}

/// Operation upon [`Document`]s of a [`Contract`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operation {
    /// Attaching a new [`Document`].
    Create,

    /// Uploading a new version of an existing [`Document`].
    Replace,

    /// Patching the metadata of an existing [`Document`].
    Patch,
}

/// Checks whether the provided [`Operation`] is allowed by the current
/// lifecycle state of the `contract`.
///
/// `relation` is the effective [`Relation`] of the operation (for a
/// metadata patch, the patched one if any, the stored one otherwise), and
/// `target` is the stored [`Document`] being replaced or patched.
///
/// Preconditions are checked in a fixed order, and the first violated one
/// is reported:
/// 1. the `contract` accepts [`Document`] operations at all;
/// 2. the related entity exists and its own lifecycle permits attachments;
/// 3. the `target` is not locked by a pending [`Change`] owning it.
///
/// # Errors
///
/// See [`OperationError`] variants for the violated preconditions.
pub fn guard(
    contract: &Contract,
    operation: Operation,
    relation: Relation,
    target: Option<&Document>,
) -> Result<(), OperationError> {
    use OperationError as E;

    if !contract.status.allows_document_operations() {
        return Err(E::InvalidContractStatus(contract.status));
    }

    match relation {
        Relation::Contract => {}
        Relation::Milestone(id) => {
            let milestone =
                contract.milestone(id).ok_or(E::MilestoneNotExists(id))?;
            if milestone.status.is_scheduled() {
                return Err(E::MilestoneNotStarted(id));
            }
            if milestone.status.is_terminated()
                && !contract.has_pending_change()
            {
                return Err(E::MilestoneConcluded(id));
            }
        }
        Relation::Change(id) => {
            if contract.change(id).is_none() {
                return Err(E::ChangeNotExists(id));
            }
        }
    }

    if operation == Operation::Patch {
        if let Some(Relation::Change(id)) = target.map(|doc| doc.relation) {
            if contract.change(id).is_some_and(|c| c.status.is_pending()) {
                return Err(E::OwnedByPendingChange(id));
            }
        }
    }

    Ok(())
}

/// Error of a [`Document`] [`Operation`] violating the [`Contract`]
/// lifecycle.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum OperationError {
    /// Referenced [`Change`] is not declared on the [`Contract`].
    ///
    /// [`Change`]: super::Change
    #[display("`Change(id: {_0})` does not exist")]
    ChangeNotExists(#[error(not(source))] change::Id),

    /// [`Contract`] status forbids any [`Document`] operations.
    #[display(
        "`Document` operations are not allowed in `{_0}` contract status"
    )]
    InvalidContractStatus(#[error(not(source))] super::Status),

    /// Referenced [`Milestone`] is concluded, and no pending [`Change`]
    /// permits its late documentation.
    ///
    /// [`Change`]: super::Change
    /// [`Milestone`]: super::Milestone
    #[display("`Milestone(id: {_0})` is already terminated")]
    MilestoneConcluded(#[error(not(source))] milestone::Id),

    /// Referenced [`Milestone`] is not part of the [`Contract`].
    ///
    /// [`Milestone`]: super::Milestone
    #[display("`Milestone(id: {_0})` does not exist")]
    MilestoneNotExists(#[error(not(source))] milestone::Id),

    /// Referenced [`Milestone`] has not started yet.
    ///
    /// [`Milestone`]: super::Milestone
    #[display("`Milestone(id: {_0})` has not started yet")]
    MilestoneNotStarted(#[error(not(source))] milestone::Id),

    /// Target [`Document`] is owned by a pending [`Change`], so is locked
    /// until the amendment is resolved.
    ///
    /// [`Change`]: super::Change
    #[display("`Document` is owned by the pending `Change(id: {_0})`")]
    OwnedByPendingChange(#[error(not(source))] change::Id),
}

/// [`DateTime`] when a version of a [`Document`] was published.
///
/// [`DateTime`]: common::DateTime
pub type PublicationDateTime = DateTimeOf<(Document, unit::Publication)>;

/// [`DateTime`] when a [`Document`] was updated last time.
///
/// [`DateTime`]: common::DateTime
pub type ModificationDateTime = DateTimeOf<(Document, unit::Modification)>;
