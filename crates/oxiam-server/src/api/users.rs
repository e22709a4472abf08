use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, rest_error_response, success_empty_response, success_paginated_response,
    success_response, ApiError, PaginatedData,
};
use crate::forms::{UserCreatePayload, UserPayload};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::Response;
use axum::routing::any;
use axum::Json;
use chrono::{DateTime, Utc};
use oxiam_common::types::User;
use oxiam_rest::{downcast_dto, RestError, RestRequest};
use oxiam_storage::store::UserListFilter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

/// 用户信息
#[derive(Serialize, ToSchema)]
pub(crate) struct UserResponse {
    /// 用户 ID
    id: String,
    /// 登录名
    username: String,
    /// 名
    firstname: String,
    /// 姓
    surname: String,
    /// 邮箱
    email: String,
    /// 所属用户组 ID 列表
    user_groups: Vec<String>,
    /// 创建时间
    created_at: DateTime<Utc>,
    /// 更新时间
    updated_at: DateTime<Utc>,
}

fn to_user_response(user: User, group_ids: Vec<String>) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username,
        firstname: user.firstname,
        surname: user.surname,
        email: user.email,
        user_groups: group_ids,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

#[derive(Deserialize, IntoParams)]
pub(crate) struct UsersListParams {
    /// 按登录名子串过滤
    #[serde(rename = "username__contains")]
    #[param(required = false)]
    username_contains: Option<String>,
    /// 每页数量（默认 20，最大 1000）
    #[serde(default, deserialize_with = "super::pagination::deserialize_optional_u64")]
    #[param(required = false)]
    limit: Option<u64>,
    /// 偏移量（默认 0）
    #[serde(default, deserialize_with = "super::pagination::deserialize_optional_u64")]
    #[param(required = false)]
    offset: Option<u64>,
}

/// 创建用户请求
#[derive(ToSchema)]
pub struct CreateUserRequest {
    /// 登录名（2-255 字符）
    pub username: String,
    /// 名
    pub firstname: String,
    /// 姓
    pub surname: String,
    /// 邮箱
    pub email: String,
    /// 明文口令（至少 8 字符，存储前散列）
    pub password: String,
    /// 所属用户组 ID 列表
    pub user_groups: Option<Vec<String>>,
}

/// 更新用户请求（PATCH 时所有字段可缺省）
#[derive(ToSchema)]
pub struct UpdateUserRequest {
    /// 登录名（2-255 字符）
    pub username: Option<String>,
    /// 名
    pub firstname: Option<String>,
    /// 姓
    pub surname: Option<String>,
    /// 邮箱
    pub email: Option<String>,
    /// 新口令，缺省时保持不变
    pub password: Option<String>,
    /// 所属用户组 ID 列表，缺省时保持不变
    pub user_groups: Option<Vec<String>>,
}

/// REST 助手的调用点标识，短名在助手内部用于覆盖表查找。
fn method_key(operation: &str) -> String {
    format!("{}::{}", module_path!(), operation)
}

/// `/v1/users` 集合端点的多方法入口。
async fn users_collection(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    method: Method,
    Query(params): Query<UsersListParams>,
    body: Option<Json<Value>>,
) -> Response {
    let request = RestRequest::new(method.clone(), body.map(|Json(v)| v).unwrap_or(Value::Null));
    let allowed = [Method::GET, Method::POST];
    if let Err(e) = state.users.helper.validate_rest_method(&request, &allowed) {
        return rest_error_response(&trace_id, &e);
    }
    if method == Method::POST {
        create_user(&trace_id, &state, request).await
    } else {
        list_users(&trace_id, &state, &params).await
    }
}

/// `/v1/users/{id}` 单实体端点的多方法入口。
async fn users_item(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    method: Method,
    Path(id): Path<String>,
    body: Option<Json<Value>>,
) -> Response {
    let request = RestRequest::new(method.clone(), body.map(|Json(v)| v).unwrap_or(Value::Null));
    let allowed = [Method::GET, Method::PUT, Method::PATCH, Method::DELETE];
    if let Err(e) = state.users.helper.validate_rest_method(&request, &allowed) {
        return rest_error_response(&trace_id, &e);
    }
    if method == Method::PUT {
        update_user(&trace_id, &state, request, &id).await
    } else if method == Method::PATCH {
        patch_user(&trace_id, &state, request, &id).await
    } else if method == Method::DELETE {
        delete_user(&trace_id, &state, &id).await
    } else {
        get_user(&trace_id, &state, &id).await
    }
}

/// 分页查询用户列表。
/// 默认排序：`username` 升序；默认分页：`limit=20&offset=0`。
#[utoipa::path(
    get,
    path = "/v1/users",
    tag = "Users",
    params(UsersListParams),
    responses(
        (status = 200, description = "用户列表", body = PaginatedData<UserResponse>),
        (status = 405, description = "方法不允许", body = ApiError)
    )
)]
pub(crate) async fn list_users(
    trace_id: &str,
    state: &AppState,
    params: &UsersListParams,
) -> Response {
    let limit = PaginationParams::resolve_limit(params.limit);
    let offset = PaginationParams::resolve_offset(params.offset);
    let filter = UserListFilter {
        username_contains: params.username_contains.clone(),
    };

    let total = match state.store.count_users(&filter).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count users");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "storage_error",
                "Database error",
            );
        }
    };
    let users = match state.store.list_users(&filter, limit, offset).await {
        Ok(users) => users,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list users");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "storage_error",
                "Database error",
            );
        }
    };

    let mut items = Vec::with_capacity(users.len());
    for user in users {
        let group_ids = match state.store.list_user_group_ids(&user.id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, user_id = %user.id, "Failed to load user group links");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    trace_id,
                    "storage_error",
                    "Database error",
                );
            }
        };
        items.push(to_user_response(user, group_ids));
    }

    success_paginated_response(StatusCode::OK, trace_id, items, total as u64, limit, offset)
}

/// 创建用户。
/// 登录名与邮箱全局唯一，口令散列后入库。
#[utoipa::path(
    post,
    path = "/v1/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "用户创建成功", body = UserResponse),
        (status = 400, description = "表单校验失败", body = ApiError),
        (status = 405, description = "方法不允许", body = ApiError),
        (status = 409, description = "登录名或邮箱已占用", body = ApiError)
    )
)]
pub(crate) async fn create_user(trace_id: &str, state: &AppState, request: RestRequest) -> Response {
    let controller = &state.users;
    let result: anyhow::Result<(User, Vec<String>)> = async {
        let dto_class = controller.helper.dto_class(Some("create_user"))?;
        let form = controller
            .helper
            .process_form(
                &request,
                controller.forms.as_ref(),
                &method_key("create_user"),
                None,
            )
            .await?;
        if form.data_class() != dto_class {
            return Err(RestError::Configuration(format!(
                "Form data class '{}' does not match DTO class '{}'",
                form.data_class(),
                dto_class
            ))
            .into());
        }
        let payload = downcast_dto::<UserCreatePayload>(form.into_data())?;
        controller.create_user(payload.user).await
    }
    .await;

    match result {
        Ok((user, group_ids)) => success_response(
            StatusCode::CREATED,
            trace_id,
            to_user_response(user, group_ids),
        ),
        Err(e) => {
            let error = controller.helper.handle_rest_method_exception(e, None).await;
            rest_error_response(trace_id, &error)
        }
    }
}

/// 获取单个用户详情。
#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    tag = "Users",
    params(
        ("id" = String, Path, description = "用户 ID")
    ),
    responses(
        (status = 200, description = "用户详情", body = UserResponse),
        (status = 404, description = "用户不存在", body = ApiError)
    )
)]
pub(crate) async fn get_user(trace_id: &str, state: &AppState, id: &str) -> Response {
    match state.users.resource.find_user(id).await {
        Ok(Some((user, group_ids))) => {
            success_response(StatusCode::OK, trace_id, to_user_response(user, group_ids))
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            trace_id,
            "not_found",
            &format!("User '{id}' not found"),
        ),
        Err(e) => {
            tracing::error!(error = %e, user_id = %id, "Failed to get user");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "storage_error",
                "Database error",
            )
        }
    }
}

/// 整体替换用户信息。
#[utoipa::path(
    put,
    path = "/v1/users/{id}",
    tag = "Users",
    params(
        ("id" = String, Path, description = "用户 ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "用户更新成功", body = UserResponse),
        (status = 400, description = "表单校验失败", body = ApiError),
        (status = 404, description = "用户不存在", body = ApiError),
        (status = 409, description = "登录名或邮箱已占用", body = ApiError)
    )
)]
pub(crate) async fn update_user(
    trace_id: &str,
    state: &AppState,
    request: RestRequest,
    id: &str,
) -> Response {
    mutate_user(trace_id, state, request, id, "update_user").await
}

/// 部分更新用户信息，缺省字段保持原值。
#[utoipa::path(
    patch,
    path = "/v1/users/{id}",
    tag = "Users",
    params(
        ("id" = String, Path, description = "用户 ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "用户更新成功", body = UserResponse),
        (status = 400, description = "表单校验失败", body = ApiError),
        (status = 404, description = "用户不存在", body = ApiError),
        (status = 409, description = "登录名或邮箱已占用", body = ApiError)
    )
)]
pub(crate) async fn patch_user(
    trace_id: &str,
    state: &AppState,
    request: RestRequest,
    id: &str,
) -> Response {
    mutate_user(trace_id, state, request, id, "patch_user").await
}

/// PUT 与 PATCH 共用的改写流程，差异只在表单的部分绑定语义。
async fn mutate_user(
    trace_id: &str,
    state: &AppState,
    request: RestRequest,
    id: &str,
    operation: &str,
) -> Response {
    let controller = &state.users;
    let result: anyhow::Result<(User, Vec<String>)> = async {
        let dto_class = controller.helper.dto_class(None)?;
        let form = controller
            .helper
            .process_form(
                &request,
                controller.forms.as_ref(),
                &method_key(operation),
                Some(id),
            )
            .await?;
        if form.data_class() != dto_class {
            return Err(RestError::Configuration(format!(
                "Form data class '{}' does not match DTO class '{}'",
                form.data_class(),
                dto_class
            ))
            .into());
        }
        let payload = downcast_dto::<UserPayload>(form.into_data())?;
        controller.update_user(id, payload).await
    }
    .await;

    match result {
        Ok((user, group_ids)) => {
            success_response(StatusCode::OK, trace_id, to_user_response(user, group_ids))
        }
        Err(e) => {
            let error = controller
                .helper
                .handle_rest_method_exception(e, Some(id))
                .await;
            rest_error_response(trace_id, &error)
        }
    }
}

/// 删除用户。
#[utoipa::path(
    delete,
    path = "/v1/users/{id}",
    tag = "Users",
    params(
        ("id" = String, Path, description = "用户 ID")
    ),
    responses(
        (status = 200, description = "用户删除成功"),
        (status = 404, description = "用户不存在", body = ApiError)
    )
)]
pub(crate) async fn delete_user(trace_id: &str, state: &AppState, id: &str) -> Response {
    match state.users.delete_user(id).await {
        Ok(()) => success_empty_response(StatusCode::OK, trace_id, "User deleted"),
        Err(e) => {
            let error = state
                .users
                .helper
                .handle_rest_method_exception(e, Some(id))
                .await;
            rest_error_response(trace_id, &error)
        }
    }
}

pub fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .route("/v1/users", any(users_collection))
        .route("/v1/users/{id}", any(users_item))
}
