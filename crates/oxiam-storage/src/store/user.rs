use anyhow::Result;
use chrono::Utc;
use oxiam_common::types::User;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::user::{self, Column, Entity};
use crate::entities::user_group_member as member;
use crate::error::StorageError;
use crate::store::UserStore;

/// 用户列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct UserListFilter {
    pub username_contains: Option<String>,
}

fn to_user(m: user::Model) -> User {
    User {
        id: m.id,
        username: m.username,
        firstname: m.firstname,
        surname: m.surname,
        email: m.email,
        password_hash: m.password_hash,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl UserStore {
    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_user))
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let model = Entity::find()
            .filter(Column::Username.eq(username))
            .one(self.db())
            .await?;
        Ok(model.map(to_user))
    }

    /// email 在 Schema 层只有索引没有唯一约束，唯一性由应用层维护；
    /// 一旦查到多行，返回 NonUnique 错误而不是任选一行。
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let models = Entity::find()
            .filter(Column::Email.eq(email))
            .limit(2)
            .all(self.db())
            .await?;
        if models.len() > 1 {
            return Err(StorageError::NonUnique {
                entity: "user",
                criteria: format!("email={email}"),
            }
            .into());
        }
        Ok(models.into_iter().next().map(to_user))
    }

    pub async fn list_users(
        &self,
        filter: &UserListFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<User>> {
        let mut query = Entity::find().order_by_asc(Column::Username);
        if let Some(fragment) = &filter.username_contains {
            query = query.filter(Column::Username.contains(fragment));
        }
        let models = query
            .offset(offset as u64)
            .limit(limit as u64)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(to_user).collect())
    }

    pub async fn count_users(&self, filter: &UserListFilter) -> Result<i64> {
        let mut query = Entity::find();
        if let Some(fragment) = &filter.username_contains {
            query = query.filter(Column::Username.contains(fragment));
        }
        let count = query.count(self.db()).await?;
        Ok(count as i64)
    }

    /// 某用户所属的用户组 id 列表
    pub async fn list_user_group_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let rows = member::Entity::find()
            .filter(member::Column::UserId.eq(user_id))
            .order_by_asc(member::Column::UserGroupId)
            .all(self.db())
            .await?;
        Ok(rows.into_iter().map(|r| r.user_group_id).collect())
    }

    /// 删除用户及其组关系，返回是否确有删除。
    pub async fn delete_user(&self, id: &str) -> Result<bool> {
        member::Entity::delete_many()
            .filter(member::Column::UserId.eq(id))
            .exec(self.db())
            .await?;
        let res = Entity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }
}
