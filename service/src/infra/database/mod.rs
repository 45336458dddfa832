//! [`Database`]-related implementations.

pub mod memory;

use derive_more::{Display, Error as StdError};

use crate::domain::contract;

pub use self::memory::Memory;

/// Database operation.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// [`Contract`] with the provided ID is stored already.
    ///
    /// [`Contract`]: crate::domain::Contract
    #[display("`Contract(id: {_0})` is stored already")]
    AlreadyExists(#[error(not(source))] contract::Id),

    /// [`Contract`] with the provided ID is not stored.
    ///
    /// [`Contract`]: crate::domain::Contract
    #[display("`Contract(id: {_0})` is not stored")]
    NotExists(#[error(not(source))] contract::Id),

    /// Proposed [`contract::Revision`] does not match the stored one, so the
    /// save is refused as a whole.
    #[display(
        "`Contract(id: {id})` revision {proposed} does not match the stored \
         revision {stored}"
    )]
    RevisionMismatch {
        /// ID of the [`Contract`] being saved.
        ///
        /// [`Contract`]: crate::domain::Contract
        id: contract::Id,

        /// [`contract::Revision`] the save is based on.
        proposed: contract::Revision,

        /// [`contract::Revision`] actually stored.
        stored: contract::Revision,
    },
}
