use anyhow::Result;
use chrono::Utc;
use oxiam_common::types::UserGroup;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

use crate::entities::user_group::{self, Column, Entity};
use crate::store::UserStore;

fn to_user_group(m: user_group::Model) -> UserGroup {
    UserGroup {
        id: m.id,
        role_id: m.role_id,
        name: m.name,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl UserStore {
    pub async fn insert_user_group(&self, group: &UserGroup) -> Result<UserGroup> {
        let am = user_group::ActiveModel {
            id: Set(group.id.clone()),
            role_id: Set(group.role_id.clone()),
            name: Set(group.name.clone()),
            created_at: Set(group.created_at.fixed_offset()),
            updated_at: Set(group.updated_at.fixed_offset()),
        };
        let m = am.insert(self.db()).await?;
        Ok(to_user_group(m))
    }

    pub async fn get_user_group(&self, id: &str) -> Result<Option<UserGroup>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_user_group))
    }

    pub async fn list_user_groups(&self, role_id: Option<&str>) -> Result<Vec<UserGroup>> {
        let mut query = Entity::find().order_by_asc(Column::Name);
        if let Some(role_id) = role_id {
            query = query.filter(Column::RoleId.eq(role_id));
        }
        let models = query.all(self.db()).await?;
        Ok(models.into_iter().map(to_user_group).collect())
    }

    pub async fn count_user_groups(&self) -> Result<i64> {
        let count = Entity::find().count(self.db()).await?;
        Ok(count as i64)
    }
}
