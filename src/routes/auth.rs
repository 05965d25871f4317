use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::password::verify_password,
    error::ApiError,
    routing::{Ctx, HandlerFuture},
};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub token: String,
    pub expires_in: i64,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
}

pub fn login(ctx: Ctx) -> HandlerFuture {
    Box::pin(authenticate_user(ctx))
}

#[instrument(skip(ctx))]
async fn authenticate_user(mut ctx: Ctx) -> Result<Response, ApiError> {
    let body = ctx.json_body()?;
    let (Some(username), Some(password)) = (
        body.get("username").and_then(Value::as_str),
        body.get("password").and_then(Value::as_str),
    ) else {
        warn!("login without username or password");
        return Err(ApiError::validation("Username and password required"));
    };

    let user = match ctx.conn().await?.find_user(username).await? {
        Some(u) => u,
        None => {
            warn!(%username, "unknown user");
            return Err(ApiError::InvalidCredentials);
        }
    };

    match verify_password(password, &user.password) {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id = user.id, "wrong password");
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => {
            error!(user_id = user.id, error = %e, "stored password hash unreadable");
            return Err(ApiError::InvalidCredentials);
        }
    }

    let tokens = ctx.state.tokens.clone();
    let claims = tokens.claims_for(user.id, &user.username);
    let token = tokens
        .issue(&claims)
        .map_err(|e| ApiError::Internal(e.into()))?;

    info!(user_id = user.id, "login successful");
    Ok(Json(AuthResponse {
        message: "Authentication successful",
        token,
        expires_in: tokens.ttl_seconds(),
        user: PublicUser {
            id: user.id,
            username: user.username,
        },
    })
    .into_response())
}
