use anyhow::Result;
use chrono::Utc;
use oxiam_common::types::{Role, User, UserGroup};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use std::sync::Mutex;

use crate::entities::{role, user, user_group, user_group_member as member};
use crate::error::StorageError;

/// 实体种类标识，find/detach 按 kind+id 定位记录
pub const KIND_ROLE: &str = "role";
pub const KIND_USER_GROUP: &str = "user_group";
pub const KIND_USER: &str = "user";

/// 可暂存写入的记录
#[derive(Debug, Clone)]
pub enum EntityRecord {
    Role(Role),
    UserGroup(UserGroup),
    /// 用户连同其组员关系一起写入
    User { user: User, group_ids: Vec<String> },
}

impl EntityRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            EntityRecord::Role(_) => KIND_ROLE,
            EntityRecord::UserGroup(_) => KIND_USER_GROUP,
            EntityRecord::User { .. } => KIND_USER,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            EntityRecord::Role(r) => &r.id,
            EntityRecord::UserGroup(g) => &g.id,
            EntityRecord::User { user, .. } => &user.id,
        }
    }
}

/// 暂存式写入管理器。
///
/// `persist` 只把记录放进待写集合，`flush` 才在一个事务里按暂存顺序落库
/// （upsert 语义）。`detach` 把记录从待写集合移除，失败操作暂存的记录
/// 借此避免被后续无关的 flush 一并提交。
///
/// flush 失败时待写集合同样被清空：事务已回滚，原样重放只会掩盖错误，
/// 由调用方决定是否重建记录重试。
///
/// 进程内共享一个实例，待写集合是唯一的跨请求可变状态。
pub struct EntityManager {
    db: DatabaseConnection,
    pending: Mutex<Vec<EntityRecord>>,
}

impl EntityManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// 暂存一条记录；同 kind+id 的已暂存记录被替换。
    pub fn persist(&self, record: EntityRecord) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = pending
            .iter_mut()
            .find(|r| r.kind() == record.kind() && r.id() == record.id())
        {
            *slot = record;
        } else {
            pending.push(record);
        }
    }

    /// kind+id 是否在待写集合中
    pub fn is_managed(&self, kind: &str, id: &str) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.iter().any(|r| r.kind() == kind && r.id() == id)
    }

    /// 把 kind+id 从待写集合移除，返回是否确有移除。
    pub fn detach(&self, kind: &str, id: &str) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let before = pending.len();
        pending.retain(|r| !(r.kind() == kind && r.id() == id));
        before != pending.len()
    }

    pub fn pending_count(&self) -> usize {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.len()
    }

    /// kind+id 是否存在（待写集合或已落库）。
    pub async fn find(&self, kind: &str, id: &str) -> Result<bool> {
        if self.is_managed(kind, id) {
            return Ok(true);
        }
        let exists = match kind {
            KIND_ROLE => role::Entity::find_by_id(id).one(&self.db).await?.is_some(),
            KIND_USER_GROUP => user_group::Entity::find_by_id(id)
                .one(&self.db)
                .await?
                .is_some(),
            KIND_USER => user::Entity::find_by_id(id).one(&self.db).await?.is_some(),
            other => {
                return Err(StorageError::Other(format!("unknown entity kind '{other}'")).into())
            }
        };
        Ok(exists)
    }

    /// 把待写集合整体写入数据库（单事务），返回写入的记录数。
    pub async fn flush(&self) -> Result<usize> {
        let staged: Vec<EntityRecord> = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *pending)
        };
        if staged.is_empty() {
            return Ok(0);
        }
        let count = staged.len();

        let txn = self.db.begin().await?;
        for record in staged {
            match record {
                EntityRecord::Role(r) => {
                    let am = role::ActiveModel {
                        id: Set(r.id.clone()),
                        short: Set(r.short.clone()),
                        description: Set(r.description.clone()),
                        created_at: Set(r.created_at.fixed_offset()),
                        updated_at: Set(r.updated_at.fixed_offset()),
                    };
                    role::Entity::insert(am)
                        .on_conflict(
                            OnConflict::column(role::Column::Id)
                                .update_columns([
                                    role::Column::Short,
                                    role::Column::Description,
                                    role::Column::UpdatedAt,
                                ])
                                .to_owned(),
                        )
                        .exec_without_returning(&txn)
                        .await?;
                }
                EntityRecord::UserGroup(g) => {
                    let am = user_group::ActiveModel {
                        id: Set(g.id.clone()),
                        role_id: Set(g.role_id.clone()),
                        name: Set(g.name.clone()),
                        created_at: Set(g.created_at.fixed_offset()),
                        updated_at: Set(g.updated_at.fixed_offset()),
                    };
                    user_group::Entity::insert(am)
                        .on_conflict(
                            OnConflict::column(user_group::Column::Id)
                                .update_columns([
                                    user_group::Column::RoleId,
                                    user_group::Column::Name,
                                    user_group::Column::UpdatedAt,
                                ])
                                .to_owned(),
                        )
                        .exec_without_returning(&txn)
                        .await?;
                }
                EntityRecord::User { user: u, group_ids } => {
                    let am = user::ActiveModel {
                        id: Set(u.id.clone()),
                        username: Set(u.username.clone()),
                        firstname: Set(u.firstname.clone()),
                        surname: Set(u.surname.clone()),
                        email: Set(u.email.clone()),
                        password_hash: Set(u.password_hash.clone()),
                        created_at: Set(u.created_at.fixed_offset()),
                        updated_at: Set(u.updated_at.fixed_offset()),
                    };
                    user::Entity::insert(am)
                        .on_conflict(
                            OnConflict::column(user::Column::Id)
                                .update_columns([
                                    user::Column::Username,
                                    user::Column::Firstname,
                                    user::Column::Surname,
                                    user::Column::Email,
                                    user::Column::PasswordHash,
                                    user::Column::UpdatedAt,
                                ])
                                .to_owned(),
                        )
                        .exec_without_returning(&txn)
                        .await?;

                    // 组关系整体重建
                    member::Entity::delete_many()
                        .filter(member::Column::UserId.eq(u.id.as_str()))
                        .exec(&txn)
                        .await?;
                    let mut group_ids = group_ids;
                    group_ids.sort();
                    group_ids.dedup();
                    let now = Utc::now().fixed_offset();
                    let rows: Vec<member::ActiveModel> = group_ids
                        .into_iter()
                        .map(|gid| member::ActiveModel {
                            user_id: Set(u.id.clone()),
                            user_group_id: Set(gid),
                            created_at: Set(now),
                        })
                        .collect();
                    if !rows.is_empty() {
                        member::Entity::insert_many(rows)
                            .exec_without_returning(&txn)
                            .await?;
                    }
                }
            }
        }
        txn.commit().await?;

        tracing::debug!(flushed = count, "Entity manager flushed staged records");
        Ok(count)
    }
}
