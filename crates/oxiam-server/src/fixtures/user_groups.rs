use super::{Fixture, ReferenceMap};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use oxiam_common::roles::RolesRegistry;
use oxiam_common::types::UserGroup;
use oxiam_storage::entity_manager::{EntityManager, EntityRecord};
use std::sync::Arc;

/// 用户组填充器，每个角色建一个组。
///
/// 角色通过引用表解析而不是回查数据库，引用缺失说明 order 配置错了。
pub struct UserGroupFixture {
    roles: Arc<dyn RolesRegistry>,
}

impl UserGroupFixture {
    pub fn new(roles: Arc<dyn RolesRegistry>) -> Self {
        Self { roles }
    }
}

#[async_trait]
impl Fixture for UserGroupFixture {
    fn order(&self) -> u32 {
        2
    }

    async fn load(&self, em: &EntityManager, refs: &mut ReferenceMap) -> Result<()> {
        let now = Utc::now();
        for role_name in self.roles.role_names() {
            let short = self.roles.short_code(&role_name);
            let role = refs.role(&format!("Role-{short}"))?;
            let group = UserGroup {
                id: oxiam_common::id::next_id(),
                role_id: role.id.clone(),
                name: format!("Group - {role_name}"),
                created_at: now,
                updated_at: now,
            };
            em.persist(EntityRecord::UserGroup(group.clone()));
            refs.add(
                &format!("UserGroup-{short}"),
                EntityRecord::UserGroup(group),
            )?;
        }
        em.flush().await?;
        Ok(())
    }
}
