//! [`Command`] definition.

pub mod add_document;
pub mod create_contract;
pub mod patch_contract;
pub mod patch_document;
pub mod replace_document;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    add_document::AddDocument, create_contract::CreateContract,
    patch_contract::PatchContract, patch_document::PatchDocument,
    replace_document::ReplaceDocument,
};
