use crate::api::{error_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use oxiam_common::types::Role;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 角色信息
#[derive(Serialize, ToSchema)]
struct RoleResponse {
    /// 完整角色名（主键），例如 `ROLE_ADMIN`
    id: String,
    /// 短标识，例如 `admin`
    short: String,
    /// 描述
    description: String,
    /// 创建时间
    created_at: DateTime<Utc>,
    /// 更新时间
    updated_at: DateTime<Utc>,
}

fn to_role_response(role: Role) -> RoleResponse {
    RoleResponse {
        id: role.id,
        short: role.short,
        description: role.description,
        created_at: role.created_at,
        updated_at: role.updated_at,
    }
}

/// 获取全部角色，按权限层级从低到高排列。
#[utoipa::path(
    get,
    path = "/v1/roles",
    tag = "Roles",
    responses(
        (status = 200, description = "角色列表", body = Vec<RoleResponse>)
    )
)]
async fn list_roles(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.list_roles().await {
        Ok(roles) => {
            let items: Vec<RoleResponse> = roles.into_iter().map(to_role_response).collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list roles");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 获取单个角色详情。
#[utoipa::path(
    get,
    path = "/v1/roles/{id}",
    tag = "Roles",
    params(
        ("id" = String, Path, description = "完整角色名，例如 ROLE_ADMIN")
    ),
    responses(
        (status = 200, description = "角色详情", body = RoleResponse),
        (status = 404, description = "角色不存在", body = ApiError)
    )
)]
async fn get_role(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_role(&id).await {
        Ok(Some(role)) => success_response(StatusCode::OK, &trace_id, to_role_response(role)),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Role not found",
        ),
        Err(e) => {
            tracing::error!(error = %e, role_id = %id, "Failed to get role");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

pub fn role_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_roles))
        .routes(routes!(get_role))
}
