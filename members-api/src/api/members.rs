//! Member lookup and creation endpoints
//!
//! Lookups answer 404 with an empty JSON object when nothing matches.
//! Creation failures answer 400 with a plain-text message.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use members_common::Error;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::services::members::{self, CreateMemberRequest, MemberView};
use crate::AppState;

const MISSING_MEMBER_INFO: &str = "Missing member info, please check data and try again.";
const MEMBER_CONFLICT: &str =
    "phone_number or client_member_id already exists on a different member.";

/// GET /api/get_members_by_acc_id/:account_id/
pub async fn get_members_by_account_id(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> ApiResult<Json<Vec<MemberView>>> {
    let views = members::by_account_id(&state.db, &account_id).await?;
    if views.is_empty() {
        return Err(ApiError::NotFound(format!("account_id {}", account_id)));
    }
    Ok(Json(views))
}

/// GET /api/get_member_by_id/:id/
///
/// A non-numeric id cannot match any subscriber, so it is a 404 as well.
pub async fn get_member_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MemberView>> {
    let Ok(subscriber_id) = id.parse::<i64>() else {
        return Err(ApiError::NotFound(format!("id {}", id)));
    };

    members::by_id(&state.db, subscriber_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("id {}", id)))
}

/// GET /api/get_member_by_phone/:phone_number/
pub async fn get_member_by_phone(
    State(state): State<AppState>,
    Path(phone_number): Path<String>,
) -> ApiResult<Json<MemberView>> {
    members::by_phone(&state.db, &phone_number)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("phone_number {}", phone_number)))
}

/// GET /api/get_member_by_client_id/:client_member_id/
pub async fn get_member_by_client_id(
    State(state): State<AppState>,
    Path(client_member_id): Path<String>,
) -> ApiResult<Json<MemberView>> {
    members::by_client_id(&state.db, &client_member_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("client_member_id {}", client_member_id)))
}

/// POST /api/create_member/
pub async fn create_member(
    State(state): State<AppState>,
    Json(request): Json<CreateMemberRequest>,
) -> ApiResult<Json<MemberView>> {
    let new = request.validate().map_err(|e| {
        info!(error = %e, "Rejecting create_member request");
        ApiError::BadRequest(MISSING_MEMBER_INFO.to_string())
    })?;

    match members::create_member(&state.db, new).await {
        Ok(view) => Ok(Json(view)),
        Err(Error::Conflict(detail)) => {
            info!(detail = %detail, "Member conflicts with an existing subscriber");
            Err(ApiError::BadRequest(MEMBER_CONFLICT.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Build member routes
pub fn member_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/get_members_by_acc_id/:account_id/",
            get(get_members_by_account_id),
        )
        .route("/api/get_member_by_id/:id/", get(get_member_by_id))
        .route(
            "/api/get_member_by_phone/:phone_number/",
            get(get_member_by_phone),
        )
        .route(
            "/api/get_member_by_client_id/:client_member_id/",
            get(get_member_by_client_id),
        )
        .route("/api/create_member/", post(create_member))
}
