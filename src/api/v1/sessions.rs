use crate::api::RequestContext;
use crate::common::error::{ServiceResponse, ServiceResult};
use crate::common::state::AppState;
use crate::models::sessions::{LoginRequest, LoginResponse};
use crate::usecases::sessions;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

pub async fn login(
    State(state): State<AppState>,
    Json(args): Json<LoginRequest>,
) -> ServiceResponse<LoginResponse> {
    let session = sessions::login(&state, &args.username, &args.password).await?;
    Ok(Json(LoginResponse {
        token: session.session_id,
        user_id: session.user_id,
        username: session.username,
    }))
}

pub async fn logout(ctx: RequestContext) -> ServiceResult<StatusCode> {
    sessions::logout(&ctx, &ctx.session).await?;
    Ok(StatusCode::NO_CONTENT)
}
