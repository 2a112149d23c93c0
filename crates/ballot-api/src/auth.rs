//! HTTP Basic-auth extractors.
//!
//! The `email:password` pair is checked through the bus on every request;
//! there are no sessions or tokens.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use ballot_bus::users::Authenticate;
use ballot_core::{Error, id::UserId, store::VotingStore, user::Principal};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};

use crate::{AppState, error::ApiError};

/// Any signed-in user.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Principal);

/// A signed-in user with the admin role.
#[derive(Debug, Clone, Copy)]
pub struct Admin(pub Principal);

impl CurrentUser {
  /// Allow the request only if it concerns the caller's own account, or the
  /// caller is an admin.
  pub fn require_self_or_admin(&self, user_id: UserId) -> Result<(), ApiError> {
    if self.0.user_id == user_id || self.0.is_admin() {
      Ok(())
    } else {
      Err(Error::Forbidden("You can only access your own records.".into()).into())
    }
  }
}

/// Decode an `Authorization: Basic` header into `(email, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let encoded = value.strip_prefix("Basic ")?;
  let decoded = B64.decode(encoded).ok()?;
  let creds = String::from_utf8(decoded).ok()?;
  let (email, password) = creds.split_once(':')?;
  Some((email.to_owned(), password.to_owned()))
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: VotingStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (email, password) =
      basic_credentials(&parts.headers).ok_or(Error::Unauthorized)?;
    let principal = state.bus.ask(Authenticate { email, password }).await?;
    Ok(CurrentUser(principal))
  }
}

impl<S> FromRequestParts<AppState<S>> for Admin
where
  S: VotingStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let CurrentUser(principal) = CurrentUser::from_request_parts(parts, state).await?;
    if !principal.is_admin() {
      tracing::warn!(user_id = %principal.user_id, "admin route refused");
      return Err(Error::Forbidden("Admin access required.".into()).into());
    }
    Ok(Admin(principal))
  }
}
