use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{AuthUser, JsonBody},
    error::{AppError, AppResult},
    state::AppState,
    users::dto::{
        AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, ProfileResponse,
        ProfileUpdate, PublicUser, RegisterRequest,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/ping", get(ping).fallback(method_not_allowed))
        .route("/user/register", post(register).fallback(method_not_allowed))
        .route("/user/login", post(login).fallback(method_not_allowed))
        .route(
            "/user/profile",
            get(get_profile)
                .post(build_profile)
                .fallback(method_not_allowed),
        )
        .route("/user/pwd", post(change_password).fallback(method_not_allowed))
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

async fn ping() -> StatusCode {
    StatusCode::OK
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let user = state.accounts.register(payload).await?;
    let token = state.keys.sign(user.id, &user.email)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = state
        .accounts
        .login(&payload.email, &payload.password)
        .await?;
    let token = state.keys.sign(user.id, &user.email)?;

    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(user),
    }))
}

#[instrument(skip_all, fields(user_id = who.id))]
pub async fn get_profile(
    State(state): State<AppState>,
    who: AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let user = state.accounts.get_profile(&who).await?;
    Ok(Json(ProfileResponse {
        message: "User profile",
        data: PublicUser::from(user),
    }))
}

#[instrument(skip_all, fields(user_id = who.id))]
pub async fn build_profile(
    State(state): State<AppState>,
    who: AuthUser,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> AppResult<Json<PublicUser>> {
    let user = state.accounts.build_profile(&who, update).await?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip_all, fields(user_id = who.id))]
pub async fn change_password(
    State(state): State<AppState>,
    who: AuthUser,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    state
        .accounts
        .change_password(&who, &payload.password)
        .await?;
    Ok(Json(MessageResponse {
        message: "password changed",
    }))
}
