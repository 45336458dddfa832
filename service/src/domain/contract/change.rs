//! [`Change`] definitions.

use common::define_kind;
use derive_more::{Display, From, Into};
use uuid::Uuid;

#[cfg(doc)]
use super::{Contract, Document};

/// Amendment workflow object declared on a [`Contract`].
///
/// [`Change`]s are driven by an external amendment workflow. They are
/// carried here only to gate [`Document`] operations: a pending [`Change`]
/// locks the [`Document`]s it owns and permits late documentation of
/// concluded [`Milestone`]s.
///
/// [`Milestone`]: super::Milestone
#[derive(Clone, Debug)]
pub struct Change {
    /// ID of this [`Change`].
    pub id: Id,

    /// Human-readable rationale of this [`Change`].
    pub rationale: String,

    /// [`Status`] of this [`Change`].
    pub status: Status,
}

/// ID of a [`Change`].
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

define_kind! {
    #[doc = "Status of a [`Change`]."]
    enum Status {
        #[doc = "The [`Change`] is still under consideration."]
        Pending = 1,

        #[doc = "The [`Change`] is applied to its [`Contract`]."]
        Active = 2,
    }
}

impl Status {
    /// Indicates whether the [`Change`] is still under consideration.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}
