//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use ballot_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Domain(#[from] ballot_core::Error),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    let ApiError::Domain(e) = self;
    match e.kind() {
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
      ErrorKind::Conflict | ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
      ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
      ErrorKind::Forbidden => StatusCode::FORBIDDEN,
      ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"ballot\""),
      );
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use ballot_core::{Entity, Error, id::VoterId};

  use super::*;

  #[test]
  fn statuses_follow_error_kind() {
    let cases = [
      (Error::not_found(Entity::Notification, 9999), StatusCode::NOT_FOUND),
      (Error::AlreadyVoted(VoterId(1)), StatusCode::BAD_REQUEST),
      (Error::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
      (Error::Unauthorized, StatusCode::UNAUTHORIZED),
      (Error::Forbidden("no".into()), StatusCode::FORBIDDEN),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::from(err).status(), status);
    }
  }

  #[test]
  fn unauthorized_carries_challenge() {
    let res = ApiError::from(Error::Unauthorized).into_response();
    assert_eq!(
      res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
      "Basic realm=\"ballot\""
    );
  }
}
