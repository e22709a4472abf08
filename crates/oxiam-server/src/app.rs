use crate::state::AppState;
use crate::{api, logging};
use axum::middleware;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "oxiam API",
        description = "oxiam 用户与访问管理 REST API",
    ),
    paths(
        api::users::list_users,
        api::users::create_user,
        api::users::get_user,
        api::users::update_user,
        api::users::patch_user,
        api::users::delete_user
    ),
    tags(
        (name = "Health", description = "服务健康检查"),
        (name = "Users", description = "用户管理"),
        (name = "Roles", description = "角色目录"),
        (name = "UserGroups", description = "用户组目录")
    )
)]
struct ApiDoc;

pub fn build_http_app(state: AppState) -> Router {
    let (router, api_spec) = api::routes().split_for_parts();

    // 多方法入口走普通 route 注册，文档路径由 ApiDoc 补齐
    let mut spec = ApiDoc::openapi();
    spec.merge(api_spec);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/v1/openapi.json", spec))
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}
