//! Handlers for account endpoints.
//!
//! | Method  | Path | Access |
//! |---------|------|--------|
//! | `POST`  | `/auth/signup` | public; returns 201 |
//! | `GET`   | `/users/me` | signed in |
//! | `GET`   | `/users` | admin; `?role`, `?page`, `?page_size` |
//! | `GET`   | `/users/stats` | admin |
//! | `GET`   | `/admins` | admin |
//! | `GET`   | `/users/:id` | self or admin |
//! | `PATCH` | `/users/:id` | self or admin; body: any of `name`, `email`, `password` |
//! | `PUT`   | `/users/:id/role` | admin; body: `{"role":"admin"}` |

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use ballot_bus::users::{
  ChangeRole, GetUser, ListAdmins, ListUsers, SignUp, UpdateUser, UserStatistics, UserStats,
};
use ballot_core::{
  id::UserId,
  store::{PageParams, VotingStore},
  user::{Role, User},
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{Admin, CurrentUser},
  error::ApiError,
  extract::{Json, Path, Query},
  parse_param, parse_value,
};

/// `POST /auth/signup`
pub async fn sign_up<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  Json(body): Json<SignUp>,
) -> Result<impl IntoResponse, ApiError> {
  let user = state.bus.execute(body).await?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/me`
pub async fn me<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  CurrentUser(principal): CurrentUser,
) -> Result<Json<User>, ApiError> {
  Ok(Json(state.bus.ask(GetUser { user_id: principal.user_id }).await?))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub role:      Option<String>,
  pub page:      Option<u32>,
  pub page_size: Option<u32>,
}

/// `GET /users[?role=voter|admin][&page=..][&page_size=..]`
pub async fn list<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<User>>, ApiError> {
  let role = parse_param::<Role>(params.role.as_deref(), "role")?;
  let users = state
    .bus
    .ask(ListUsers {
      role,
      page: PageParams { page: params.page, page_size: params.page_size }.into(),
    })
    .await?;
  Ok(Json(users))
}

/// `GET /admins`
pub async fn admins<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
  Query(page): Query<PageParams>,
) -> Result<Json<Vec<User>>, ApiError> {
  Ok(Json(state.bus.ask(ListAdmins { page: page.into() }).await?))
}

/// `GET /users/stats`
pub async fn statistics<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  _: Admin,
) -> Result<Json<UserStats>, ApiError> {
  Ok(Json(state.bus.ask(UserStatistics).await?))
}

/// `GET /users/:id`
pub async fn get_one<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(user_id): Path<UserId>,
) -> Result<Json<User>, ApiError> {
  caller.require_self_or_admin(user_id)?;
  Ok(Json(state.bus.ask(GetUser { user_id }).await?))
}

/// `PATCH /users/:id`
pub async fn update<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  caller: CurrentUser,
  Path(user_id): Path<UserId>,
  Json(body): Json<UpdateUser>,
) -> Result<Json<User>, ApiError> {
  caller.require_self_or_admin(user_id)?;
  let user = state.bus.execute(UpdateUser { user_id, ..body }).await?;
  Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
  pub role: String,
}

/// `PUT /users/:id/role`
pub async fn change_role<S: VotingStore + 'static>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Path(user_id): Path<UserId>,
  Json(body): Json<RoleBody>,
) -> Result<Json<User>, ApiError> {
  let role: Role = parse_value(&body.role, "role")?;
  let user = state
    .bus
    .execute(ChangeRole { actor: admin.user_id, user_id, role })
    .await?;
  Ok(Json(user))
}
