use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    AppState,
    auth::{AuthClaims, AuthUser},
    error::{ApiError, ValidatedJson},
    models::{CreateUserRequest, NewUser, User, UserPatch, VerifyEmailRequest},
    services::short_id,
};

/// get_me
///
/// [Authenticated Route] The caller's local user row.
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Account disabled")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_me(AuthUser { user, .. }: AuthUser) -> Json<User> {
    Json(user)
}

/// update_me
///
/// [Authenticated Route] Updates the caller's profile. Name and company are
/// mirrored to the identity provider on a best-effort basis.
#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = UserPatch,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(patch): ValidatedJson<UserPatch>,
) -> Result<Json<User>, ApiError> {
    state.users.update_user(&id, patch).await?.map(Json).ok_or(ApiError::NotFound)
}

/// create_user
///
/// [Token Route] Get-or-create the local row for the token's subject. A
/// subject that already has a row gets it back with 200; a new row is
/// answered with 201. The body email must match the token's email claim when
/// there is one, and an email owned by another subject is a 409.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 200, description = "User already existed", body = User),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Email does not match the token"),
        (status = 409, description = "Email registered to another account")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token_email) = claims.email.as_deref() {
        if !token_email.eq_ignore_ascii_case(request.email.trim()) {
            tracing::warn!(user = %short_id(&claims.sub), "Body email does not match token email");
            return Err(ApiError::Forbidden);
        }
    }

    let new_user = NewUser {
        id: claims.sub,
        user_name: request.user_name.unwrap_or_else(|| request.email.clone()),
        email: request.email,
        first_name: request.first_name,
        last_name: request.last_name,
        company: request.company,
        is_active: true,
    };

    let (user, created) = state.users.get_or_create(new_user).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(user)))
}

/// verify_email_complete
///
/// [Authenticated Route] Called by the frontend once the user confirmed their
/// email. Sends the welcome email in the requested locale (Spanish by default).
#[utoipa::path(
    post,
    path = "/api/users/me/verify-email-complete",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Welcome email sent", body = User),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Email could not be sent")
    ),
    security(("bearer_auth" = []))
)]
pub async fn verify_email_complete(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    body: Option<Json<VerifyEmailRequest>>,
) -> Result<Json<User>, ApiError> {
    let locale = body.map(|Json(req)| req.locale).unwrap_or_default();
    Ok(Json(state.users.verify_email_complete(&id, locale).await?))
}
