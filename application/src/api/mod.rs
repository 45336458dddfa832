//! REST API definitions.

pub mod contract;
pub mod document;

use axum::{
    routing::{get, post},
    Router,
};

use crate::define_error;

pub use self::{contract::Contract, document::Document};

/// Builds the [`Router`] serving the REST API.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/contracts", post(contract::create))
        .route(
            "/contracts/:contract_id",
            get(contract::fetch).patch(contract::patch),
        )
        .route(
            "/contracts/:contract_id/documents",
            get(document::list).post(document::create),
        )
        .route(
            "/contracts/:contract_id/documents/:document_id",
            get(document::fetch)
                .put(document::replace)
                .patch(document::patch),
        )
}

define_error! {
    enum NotFoundError {
        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`Contract` does not exist"]
        Contract,

        #[code = "NOT_FOUND"]
        #[status = NOT_FOUND]
        #[message = "`Document` does not exist"]
        Document,
    }
}
