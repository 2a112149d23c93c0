//! Body, query and path extractors that reject malformed input with the
//! API's own `{"error": ..}` body and a 400, instead of axum's plain-text
//! rejections.

use axum::{
  extract::{FromRequest, FromRequestParts, Request},
  http::request::Parts,
  response::{IntoResponse, Response},
};
use ballot_core::Error;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::ApiError;

/// JSON request body, and JSON response body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

/// URL query string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

/// URL path parameters.
#[derive(Debug, Clone, Copy)]
pub struct Path<T>(pub T);

impl<T, S> FromRequest<S> for Json<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let axum::Json(value) = axum::Json::<T>::from_request(req, state)
      .await
      .map_err(|rejection| Error::InvalidInput(rejection.body_text()))?;
    Ok(Json(value))
  }
}

impl<T: Serialize> IntoResponse for Json<T> {
  fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}

impl<T, S> FromRequestParts<S> for Query<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &S,
  ) -> Result<Self, Self::Rejection> {
    let axum::extract::Query(value) =
      axum::extract::Query::<T>::from_request_parts(parts, state)
        .await
        .map_err(|rejection| Error::InvalidInput(rejection.body_text()))?;
    Ok(Query(value))
  }
}

impl<T, S> FromRequestParts<S> for Path<T>
where
  T: DeserializeOwned + Send,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &S,
  ) -> Result<Self, Self::Rejection> {
    let axum::extract::Path(value) =
      axum::extract::Path::<T>::from_request_parts(parts, state)
        .await
        .map_err(|rejection| Error::InvalidInput(rejection.body_text()))?;
    Ok(Path(value))
  }
}
