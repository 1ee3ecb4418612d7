use axum::Extension;

use crate::auth::Caller;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /me - The authenticated caller as resolved by the auth gate
pub async fn me(Extension(caller): Extension<Caller>) -> ApiResult<Caller> {
    Ok(ApiResponse::success(caller))
}
