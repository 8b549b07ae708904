//! Authentication, password-reset and health handlers.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::model::{
    Credentials, ForgotPassword, LoginResponse, Organization, ResetPassword, Signup, User,
    VerifyQuery,
};
use crate::response::{success, ApiResult, Failure};
use crate::{authenticate, now, Db};

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn platform_login(State(db): State<Db>, Json(input): Json<Credentials>) -> ApiResult {
    sign_in(&db, &input, true).await
}

pub async fn login(State(db): State<Db>, Json(input): Json<Credentials>) -> ApiResult {
    sign_in(&db, &input, false).await
}

async fn sign_in(db: &Db, input: &Credentials, platform: bool) -> ApiResult {
    let mut store = db.write().await;
    let user = store
        .user_by_email(&input.email)
        .filter(|user| user.password == input.password && user.is_platform_admin() == platform)
        .cloned()
        .ok_or_else(|| Failure::new(StatusCode::UNAUTHORIZED, "Invalid credentials"))?;

    let token = store.issue_token(user.id);
    tracing::info!(email = %user.email, role = %user.role, "signed in");
    Ok(success(
        StatusCode::OK,
        LoginResponse {
            token,
            user: (&user).into(),
        },
    ))
}

pub async fn signup(State(db): State<Db>, Json(input): Json<Signup>) -> ApiResult {
    let mut store = db.write().await;
    if store.user_by_email(&input.user.email).is_some() {
        return Err(Failure::new(StatusCode::CONFLICT, "Email already registered"));
    }

    let stamp = now();
    let organization_id = store.next_id();
    store.organizations.insert(
        organization_id,
        Organization {
            id: organization_id,
            name: input.organization.name,
            tier: input.organization.tier,
            subscription_start: input.organization.subscription_start,
            subscription_end: input.organization.subscription_end,
            created_at: stamp.clone(),
            updated_at: stamp,
        },
    );
    let user = User {
        id: store.next_id(),
        email: input.user.email,
        password: input.user.password,
        role: input.user.role,
        organization_id: Some(organization_id),
    };
    store.users.push(user.clone());
    let token = store.issue_token(user.id);
    tracing::info!(
        email = %user.email,
        business_type = input.business_type.as_deref().unwrap_or(""),
        business_category = input.business_category.as_deref().unwrap_or(""),
        "signed up"
    );

    Ok(success(
        StatusCode::CREATED,
        LoginResponse {
            token,
            user: (&user).into(),
        },
    ))
}

/// Rotate the caller's bearer token.
pub async fn refresh(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let mut store = db.write().await;
    let user = authenticate(&store, &headers)?;
    if let Some(old) = crate::bearer(&headers) {
        store.sessions.remove(old);
    }
    let token = store.issue_token(user.id);
    Ok(success(StatusCode::OK, json!({ "token": token })))
}

/// Always answers the same way so account existence does not leak.
pub async fn forgot_password(State(db): State<Db>, Json(input): Json<ForgotPassword>) -> ApiResult {
    let mut store = db.write().await;
    if let Some(email) = store.user_by_email(&input.email).map(|user| user.email.clone()) {
        let token = Uuid::new_v4().to_string();
        tracing::info!(%email, "issued password reset token");
        store.reset_tokens.insert(token, email);
    }
    Ok(success(
        StatusCode::OK,
        json!({ "message": "If the account exists, a reset link has been sent" }),
    ))
}

pub async fn reset_password(State(db): State<Db>, Json(input): Json<ResetPassword>) -> ApiResult {
    let mut store = db.write().await;
    let email = store
        .reset_tokens
        .remove(&input.token)
        .ok_or_else(|| Failure::bad_request("Invalid or expired reset token"))?;
    let user = store
        .users
        .iter_mut()
        .find(|user| user.email == email)
        .ok_or_else(|| Failure::bad_request("Invalid or expired reset token"))?;
    user.password = input.new_password;
    Ok(success(
        StatusCode::OK,
        json!({ "message": "Password has been reset" }),
    ))
}

pub async fn verify_reset_token(
    State(db): State<Db>,
    Query(query): Query<VerifyQuery>,
) -> ApiResult {
    let store = db.read().await;
    let email = query
        .token
        .and_then(|token| store.reset_tokens.get(&token).cloned())
        .ok_or_else(|| Failure::bad_request("Invalid or expired reset token"))?;
    Ok(success(StatusCode::OK, json!({ "email": email })))
}

