//! [`Context`]-related definitions.

use axum::{async_trait, extract::FromRequestParts};

use crate::{Error, Service};

/// Application context of a single HTTP request.
#[derive(Clone, Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;

        Ok(Self { service })
    }
}
