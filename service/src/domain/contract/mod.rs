//! [`Contract`] definitions.

pub mod change;
pub mod document;
pub mod milestone;
pub mod patch;
pub mod schedule;

use common::{define_kind, unit, DateTime, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, Into};
use rust_decimal::Decimal;
use uuid::Uuid;

pub use self::{
    change::Change, document::Document, milestone::Milestone, patch::Patch,
};

/// Energy service procurement contract under active management.
///
/// A [`Contract`] owns its [`Milestone`]s and [`Document`]s exclusively:
/// they are created and mutated only within a patch cycle upon the whole
/// aggregate, never individually.
#[derive(Clone, Debug)]
pub struct Contract {
    /// ID of this [`Contract`].
    pub id: Id,

    /// [`Revision`] of this [`Contract`], checked by the persistence layer
    /// on every save.
    pub rev: Revision,

    /// [`Title`] of this [`Contract`].
    pub title: Title,

    /// [`Description`] of this [`Contract`].
    pub description: Description,

    /// [`Status`] of this [`Contract`].
    pub status: Status,

    /// Overall effective window of this [`Contract`].
    pub period: Period,

    /// Financial summary of this [`Contract`].
    pub value: Value,

    /// [`Milestone`]s of this [`Contract`], ordered by their
    /// [`milestone::SequenceNumber`]s, contiguous from 1.
    pub milestones: Vec<Milestone>,

    /// [`Document`]s attached to this [`Contract`].
    ///
    /// Append-only: uploading a new version of a [`Document`] appends it
    /// under the same [`document::Id`].
    pub documents: Vec<Document>,

    /// [`Change`]s (amendment workflow objects) declared on this
    /// [`Contract`].
    pub changes: Vec<Change>,

    /// [`DateTime`] when this [`Contract`] was registered.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Contract`] was modified last time.
    pub modified_at: ModificationDateTime,
}

impl Contract {
    /// Returns the [`Milestone`] of this [`Contract`] with the provided ID.
    #[must_use]
    pub fn milestone(&self, id: milestone::Id) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    /// Returns the last [`Milestone`] of this [`Contract`] being already
    /// underway (either delivered or concluded).
    ///
    /// [`None`] is returned if every [`Milestone`] is still scheduled only.
    #[must_use]
    pub fn last_started_milestone(&self) -> Option<&Milestone> {
        self.milestones.iter().rev().find(|m| !m.status.is_scheduled())
    }

    /// Returns the latest version of the [`Document`] with the provided ID
    /// attached to this [`Contract`].
    #[must_use]
    pub fn document(&self, id: document::Id) -> Option<&Document> {
        self.documents.iter().rev().find(|d| d.id == id)
    }

    /// Returns the [`Change`] of this [`Contract`] with the provided ID.
    #[must_use]
    pub fn change(&self, id: change::Id) -> Option<&Change> {
        self.changes.iter().find(|c| c.id == id)
    }

    /// Indicates whether some [`Change`] of this [`Contract`] is still under
    /// consideration.
    #[must_use]
    pub fn has_pending_change(&self) -> bool {
        self.changes.iter().any(|c| c.status.is_pending())
    }
}

/// ID of a [`Contract`].
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

/// Revision of a [`Contract`].
///
/// Optimistic concurrency token: the persistence layer refuses to save a
/// [`Contract`] whose [`Revision`] differs from the stored one, and bumps
/// it on every successful save.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
pub struct Revision(u64);

impl Revision {
    /// Returns the [`Revision`] following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Title of a [`Contract`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        Self::check(&title).then_some(Self(title))
    }

    /// Checks whether the given `title` is a valid [`Title`].
    fn check(title: impl AsRef<str>) -> bool {
        let title = title.as_ref();
        title.trim() == title && !title.is_empty() && title.len() <= 512
    }
}

/// Description of a [`Contract`].
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`] if the given `description` is valid.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Option<Self> {
        let description = description.into();
        Self::check(&description).then_some(Self(description))
    }

    /// Checks whether the given `description` is a valid [`Description`].
    fn check(description: impl AsRef<str>) -> bool {
        let description = description.as_ref();
        description.trim() == description
            && !description.is_empty()
            && description.len() <= 2048
    }
}

define_kind! {
    #[doc = "Status of a [`Contract`]."]
    enum Status {
        #[doc = "The [`Contract`] is registered, but has not taken effect \
                 yet."]
        Pending = 1,

        #[doc = "The [`Contract`] is in effect."]
        Active = 2,

        #[doc = "The [`Contract`] is concluded and frozen."]
        Terminated = 3,
    }
}

impl Status {
    /// Indicates whether [`Contract`] fields may be edited in this
    /// [`Status`].
    #[must_use]
    pub const fn allows_edit(self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    /// Indicates whether [`Document`] operations are allowed in this
    /// [`Status`].
    #[must_use]
    pub const fn allows_document_operations(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Indicates whether this is the [`Status::Active`] one.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Effective time window of a [`Contract`] or a [`Milestone`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Period {
    /// [`DateTime`] when the window starts.
    pub started_at: DateTime,

    /// [`DateTime`] when the window ends.
    pub ended_at: DateTime,
}

impl Period {
    /// Indicates whether this [`Period`] ends strictly after it starts.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.started_at < self.ended_at
    }
}

/// Financial summary of a [`Contract`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Value {
    /// Total [`Money`] amount of the [`Contract`].
    pub amount: Money,

    /// [`Money`] amount actually paid against the [`Contract`] so far.
    pub amount_paid: Money,

    /// Yearly costs reduction profile: one entry per service year, weighting
    /// how the total amount distributes across [`Milestone`]s.
    pub annual_costs_reduction: Vec<Decimal>,
}

/// [`DateTime`] when a [`Contract`] was registered.
pub type CreationDateTime = DateTimeOf<(Contract, unit::Creation)>;

/// [`DateTime`] when a [`Contract`] was modified last time.
pub type ModificationDateTime = DateTimeOf<(Contract, unit::Modification)>;
