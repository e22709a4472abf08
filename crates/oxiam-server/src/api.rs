pub mod pagination;
pub mod roles;
pub mod user_groups;
pub mod users;

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use oxiam_rest::RestError;
use oxiam_storage::store::UserListFilter;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// API 错误响应
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// 错误码
    pub err_code: i32,
    /// 错误信息
    pub err_msg: String,
    /// 链路追踪 ID（默认空字符串）
    pub trace_id: String,
}

/// API 统一响应包裹
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// 错误码（成功时为 0）
    pub err_code: i32,
    /// 错误信息（成功时为 success）
    pub err_msg: String,
    /// 链路追踪 ID（默认空字符串）
    pub trace_id: String,
    /// 业务数据（有数据时返回）
    pub data: Option<T>,
}

/// 分页数据结构
#[derive(Serialize, ToSchema)]
pub struct PaginatedData<T>
where
    T: Serialize,
{
    /// 数据项列表
    pub items: Vec<T>,
    /// 总数
    pub total: u64,
    /// 每页数量
    pub limit: usize,
    /// 偏移量
    pub offset: usize,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn success_empty_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: 0,
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

pub fn success_paginated_response<T>(
    status: StatusCode,
    trace_id: &str,
    items: Vec<T>,
    total: u64,
    limit: usize,
    offset: usize,
) -> Response
where
    T: Serialize,
{
    success_response(
        status,
        trace_id,
        PaginatedData {
            items,
            total,
            limit,
            offset,
        },
    )
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "not_found" => 1004,
        "conflict" => 1005,
        "method_not_allowed" => 1006,
        "validation_failed" => 1101,
        "storage_error" => 1501,
        "internal_error" => 1500,
        "configuration_error" => 1502,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

fn rest_error_code(error: &RestError) -> &'static str {
    match error {
        RestError::Configuration(_) => "configuration_error",
        RestError::MethodNotAllowed { .. } => "method_not_allowed",
        RestError::NotFound(_) => "not_found",
        RestError::Validation { .. } => "validation_failed",
        RestError::Http { status, .. } => match *status {
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::CONFLICT => "conflict",
            StatusCode::METHOD_NOT_ALLOWED => "method_not_allowed",
            s if s.is_server_error() => "internal_error",
            _ => "bad_request",
        },
    }
}

/// REST 方法错误的统一渲染。
///
/// 校验错误把字段明细放进 data；405 额外带 `Allow` 响应头。
pub fn rest_error_response(trace_id: &str, error: &RestError) -> Response {
    match error {
        RestError::Validation { errors } => (
            error.status(),
            Json(ApiResponse {
                err_code: to_custom_error_code("validation_failed"),
                err_msg: error.public_message(),
                trace_id: trace_id.to_string(),
                data: Some(errors.clone()),
            }),
        )
            .into_response(),
        RestError::MethodNotAllowed { allowed, .. } => {
            let mut response = error_response(
                error.status(),
                trace_id,
                "method_not_allowed",
                &error.public_message(),
            );
            let allow = allowed
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
            response
        }
        _ => error_response(
            error.status(),
            trace_id,
            rest_error_code(error),
            &error.public_message(),
        ),
    }
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
struct HealthResponse {
    /// 服务版本号
    version: String,
    /// 运行时长（秒）
    uptime_secs: i64,
    /// 已注册用户数（存储不可用时为 -1）
    user_count: i64,
    /// 存储状态
    storage_status: String,
}

/// 获取服务健康状态。
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "服务健康状态", body = HealthResponse)
    )
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    let (user_count, storage_status) = match state.store.count_users(&UserListFilter::default()).await
    {
        Ok(count) => (count, "ok".to_string()),
        Err(e) => {
            tracing::error!(error = %e, "Health check storage probe failed");
            (-1, "error".to_string())
        }
    };
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            user_count,
            storage_status,
        },
    )
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .merge(users::user_routes())
        .merge(roles::role_routes())
        .merge(user_groups::user_group_routes())
}
