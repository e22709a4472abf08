use crate::api::{error_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use oxiam_common::types::UserGroup;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Deserialize, IntoParams)]
struct GroupsListQuery {
    /// 按所属角色过滤（完整角色名）
    #[param(required = false)]
    #[serde(rename = "role__eq")]
    role_eq: Option<String>,
}

/// 用户组信息
#[derive(Serialize, ToSchema)]
struct UserGroupResponse {
    /// 用户组 ID
    id: String,
    /// 所属角色（完整角色名）
    role_id: String,
    /// 组名
    name: String,
    /// 创建时间
    created_at: DateTime<Utc>,
    /// 更新时间
    updated_at: DateTime<Utc>,
}

fn to_user_group_response(group: UserGroup) -> UserGroupResponse {
    UserGroupResponse {
        id: group.id,
        role_id: group.role_id,
        name: group.name,
        created_at: group.created_at,
        updated_at: group.updated_at,
    }
}

/// 获取全部用户组，可按角色过滤。
#[utoipa::path(
    get,
    path = "/v1/user-groups",
    tag = "UserGroups",
    params(GroupsListQuery),
    responses(
        (status = 200, description = "用户组列表", body = Vec<UserGroupResponse>)
    )
)]
async fn list_user_groups(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(query): Query<GroupsListQuery>,
) -> impl IntoResponse {
    match state.store.list_user_groups(query.role_eq.as_deref()).await {
        Ok(groups) => {
            let items: Vec<UserGroupResponse> =
                groups.into_iter().map(to_user_group_response).collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list user groups");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 获取单个用户组详情。
#[utoipa::path(
    get,
    path = "/v1/user-groups/{id}",
    tag = "UserGroups",
    params(
        ("id" = String, Path, description = "用户组 ID")
    ),
    responses(
        (status = 200, description = "用户组详情", body = UserGroupResponse),
        (status = 404, description = "用户组不存在", body = ApiError)
    )
)]
async fn get_user_group(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_user_group(&id).await {
        Ok(Some(group)) => {
            success_response(StatusCode::OK, &trace_id, to_user_group_response(group))
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "User group not found",
        ),
        Err(e) => {
            tracing::error!(error = %e, group_id = %id, "Failed to get user group");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

pub fn user_group_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_user_groups))
        .routes(routes!(get_user_group))
}
