use super::{Fixture, ReferenceMap};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use oxiam_common::roles::RolesRegistry;
use oxiam_common::types::Role;
use oxiam_storage::entity_manager::{EntityManager, EntityRecord};
use std::sync::Arc;

/// 角色填充器。
///
/// 角色主键就是完整角色名，其余填充器通过 `Role-<short>` 引用。
pub struct RoleFixture {
    roles: Arc<dyn RolesRegistry>,
}

impl RoleFixture {
    pub fn new(roles: Arc<dyn RolesRegistry>) -> Self {
        Self { roles }
    }
}

#[async_trait]
impl Fixture for RoleFixture {
    fn order(&self) -> u32 {
        1
    }

    async fn load(&self, em: &EntityManager, refs: &mut ReferenceMap) -> Result<()> {
        let now = Utc::now();
        for role_name in self.roles.role_names() {
            let short = self.roles.short_code(&role_name);
            let role = Role {
                id: role_name.clone(),
                short: short.clone(),
                description: format!("Description - {role_name}"),
                created_at: now,
                updated_at: now,
            };
            em.persist(EntityRecord::Role(role.clone()));
            refs.add(&format!("Role-{short}"), EntityRecord::Role(role))?;
        }
        em.flush().await?;
        Ok(())
    }
}
