use anyhow::Result;
use chrono::Utc;
use oxiam_common::types::Role;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, PaginatorTrait, QueryOrder};

use crate::entities::role::{self, Column, Entity};
use crate::store::UserStore;

fn to_role(m: role::Model) -> Role {
    Role {
        id: m.id,
        short: m.short,
        description: m.description,
        created_at: m.created_at.with_timezone(&Utc),
        updated_at: m.updated_at.with_timezone(&Utc),
    }
}

impl UserStore {
    pub async fn insert_role(&self, role: &Role) -> Result<Role> {
        let am = role::ActiveModel {
            id: Set(role.id.clone()),
            short: Set(role.short.clone()),
            description: Set(role.description.clone()),
            created_at: Set(role.created_at.fixed_offset()),
            updated_at: Set(role.updated_at.fixed_offset()),
        };
        let m = am.insert(self.db()).await?;
        Ok(to_role(m))
    }

    pub async fn get_role(&self, id: &str) -> Result<Option<Role>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_role))
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        let models = Entity::find()
            .order_by_asc(Column::Id)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(to_role).collect())
    }

    pub async fn count_roles(&self) -> Result<i64> {
        let count = Entity::find().count(self.db()).await?;
        Ok(count as i64)
    }
}
