use crate::config::ServerConfig;
use crate::resources::UsersController;
use chrono::{DateTime, Utc};
use oxiam_storage::entity_manager::EntityManager;
use oxiam_storage::store::UserStore;
use std::sync::Arc;

/// 全局共享状态
#[derive(Clone)]
pub struct AppState {
    /// 管理数据库访问层
    pub store: Arc<UserStore>,
    /// 托管实体集，写路径在请求内共享
    pub entity_manager: Arc<EntityManager>,
    /// 用户控制器（REST 助手 + 表单 + 资源服务）
    pub users: Arc<UsersController>,
    /// 服务启动时间
    pub start_time: DateTime<Utc>,
    /// 服务配置
    pub config: Arc<ServerConfig>,
}
