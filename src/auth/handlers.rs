use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{
    AuthResponse, CredentialsRequest, ForgotPasswordRequest, ForgotPasswordResponse,
    MessageResponse, PublicUser, RefreshRequest, ResetPasswordRequest, SignupResponse,
};
use super::jwt::{AuthUser, JwtKeys};
use super::services::{self, TokenPair, RESET_DONE_MESSAGE, RESET_REQUESTED_MESSAGE, SIGNUP_MESSAGE};
use crate::{error::ApiError, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

impl From<TokenPair> for AuthResponse {
    fn from(pair: TokenPair) -> Self {
        AuthResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: PublicUser {
                id: pair.user.id,
                email: pair.user.email,
            },
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    let Json(body) = payload?;
    let user = services::signup(&state.db, &body.email, &body.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id: user.id,
            email: user.email,
            message: SIGNUP_MESSAGE.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(body) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let pair = services::login(&state.db, &keys, &body.email, &body.password).await?;
    Ok(Json(pair.into()))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(body) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let pair = services::refresh(&state.db, &keys, &body.refresh_token).await?;
    Ok(Json(pair.into()))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<ForgotPasswordResponse>, ApiError> {
    let Json(body) = payload?;
    let reset_token =
        services::request_password_reset(&state.db, &state.config.password_reset, &body.email)
            .await?;
    Ok(Json(ForgotPasswordResponse {
        message: RESET_REQUESTED_MESSAGE.into(),
        reset_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(body) = payload?;
    services::reset_password(&state.db, &body.token, &body.new_password).await?;
    Ok(Json(MessageResponse {
        message: RESET_DONE_MESSAGE.into(),
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = services::current_user(&state.db, user.id).await?;
    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
    }))
}
