use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use std::path::Path;

pub mod role;
pub mod user;
pub mod user_group;

pub use user::UserListFilter;

/// 管理数据库（oxiam.db）的统一访问层。
///
/// 所有方法均为 `async fn`，底层使用 SeaORM + SQLite。
/// 暂存写入（persist/flush）由 [`crate::EntityManager`] 承担，本层只做
/// 即时查询与删除。
pub struct UserStore {
    pub(crate) db: DatabaseConnection,
}

impl UserStore {
    /// 连接并初始化管理数据库。
    ///
    /// - `db_url`：完整的数据库连接 URL，由调用方（服务器配置）提供。
    ///   SQLite 示例：`sqlite:///data/oxiam.db?mode=rwc`
    /// - `data_dir`：本地数据目录，SQLite 数据库文件所在位置。
    ///
    /// 自动运行 `sea-orm-migration` 迁移，确保 Schema 最新。
    pub async fn new(db_url: &str, data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db = Database::connect(db_url).await?;

        // WAL 模式仅对 SQLite 有效
        if db_url.starts_with("sqlite://") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        // 运行所有待执行迁移
        Migrator::up(&db, None).await?;

        tracing::info!(db_url = %db_url, "Initialized user store (SeaORM)");

        Ok(Self { db })
    }

    /// 返回底层数据库连接引用（供子模块使用）。
    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// 克隆一份连接句柄，供 EntityManager 等组件共享同一数据库。
    pub fn connection(&self) -> DatabaseConnection {
        self.db.clone()
    }
}
