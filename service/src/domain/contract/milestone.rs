//! [`Milestone`] definitions.

use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{Display, From, Into};
use uuid::Uuid;

#[cfg(doc)]
use super::Contract;
use super::Period;

/// Yearly payment checkpoint of a [`Contract`].
///
/// Every [`Milestone`] covers one service year slice of the [`Contract`]
/// period. [`Milestone`]s exist only within their [`Contract`] and are
/// regenerated by the scheduler whenever the period moves.
#[derive(Clone, Debug, PartialEq)]
pub struct Milestone {
    /// ID of this [`Milestone`].
    ///
    /// Survives rescheduling: a regenerated [`Milestone`] covering the same
    /// position keeps the ID of the one it replaces.
    pub id: Id,

    /// 1-based position of this [`Milestone`] within its [`Contract`].
    pub sequence_number: SequenceNumber,

    /// [`Title`] of this [`Milestone`].
    pub title: Title,

    /// [`Description`] of this [`Milestone`].
    pub description: Description,

    /// Service year slice of the [`Contract`] period covered by this
    /// [`Milestone`].
    pub period: Period,

    /// [`Status`] of this [`Milestone`].
    pub status: Status,

    /// Planned [`Money`] amount of this [`Milestone`].
    pub value: Money,

    /// [`Money`] amount actually paid against this [`Milestone`].
    pub amount_paid: Money,

    /// [`DateTime`] when this [`Milestone`] was generated.
    ///
    /// [`DateTime`]: common::DateTime
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Milestone`] was updated last time.
    ///
    /// [`DateTime`]: common::DateTime
    pub modified_at: ModificationDateTime,
}

/// ID of a [`Milestone`].
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

/// 1-based position of a [`Milestone`] within its [`Contract`].
#[derive(
    Clone, Copy, Debug, Display, Eq, From, Hash, Into, Ord, PartialEq,
    PartialOrd,
)]
pub struct SequenceNumber(u32);

impl SequenceNumber {
    /// [`SequenceNumber`] of the first [`Milestone`] of a [`Contract`].
    pub const FIRST: Self = Self(1);

    /// Returns the [`SequenceNumber`] following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Title of a [`Milestone`].
#[derive(Clone, Debug, Display, Eq, From, Into, PartialEq)]
pub struct Title(String);

/// Description of a [`Milestone`].
#[derive(Clone, Debug, Display, Eq, From, Into, PartialEq)]
pub struct Description(String);

define_kind! {
    #[doc = "Status of a [`Milestone`]."]
    enum Status {
        #[doc = "The [`Milestone`] is planned for a future service year."]
        Scheduled = 1,

        #[doc = "The [`Milestone`]'s service year has started."]
        Pending = 2,

        #[doc = "The [`Milestone`] is the one being delivered now."]
        Active = 3,

        #[doc = "The [`Milestone`] is concluded."]
        Terminated = 4,
    }
}

impl Status {
    /// Indicates whether the [`Milestone`] has not started yet and so may be
    /// regenerated by the scheduler.
    #[must_use]
    pub const fn is_scheduled(self) -> bool {
        matches!(self, Self::Scheduled)
    }

    /// Indicates whether the [`Milestone`] is concluded.
    #[must_use]
    pub const fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated)
    }
}

/// [`DateTime`] when a [`Milestone`] was generated.
///
/// [`DateTime`]: common::DateTime
pub type CreationDateTime = DateTimeOf<(Milestone, unit::Creation)>;

/// [`DateTime`] when a [`Milestone`] was updated last time.
///
/// [`DateTime`]: common::DateTime
pub type ModificationDateTime = DateTimeOf<(Milestone, unit::Modification)>;
