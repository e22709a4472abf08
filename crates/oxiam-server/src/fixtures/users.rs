use super::{Fixture, ReferenceMap};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use oxiam_common::roles::RolesRegistry;
use oxiam_common::types::User;
use oxiam_storage::entity_manager::{EntityManager, EntityRecord};
use std::sync::Arc;

/// 用户填充器。
///
/// 每个角色一个 `john-<short>` 用户，挂进对应的组；另有一个不带
/// 后缀、不属于任何组的 `john`。全部暂存完毕后一次 flush。
pub struct UserFixture {
    roles: Arc<dyn RolesRegistry>,
}

impl UserFixture {
    pub fn new(roles: Arc<dyn RolesRegistry>) -> Self {
        Self { roles }
    }

    fn build_user(username: &str, email: &str, password: &str) -> Result<User> {
        let now = Utc::now();
        Ok(User {
            id: oxiam_common::id::next_id(),
            username: username.to_string(),
            firstname: "John".to_string(),
            surname: "Doe".to_string(),
            email: email.to_string(),
            password_hash: oxiam_storage::auth::hash_password(password)?,
            created_at: now,
            updated_at: now,
        })
    }
}

#[async_trait]
impl Fixture for UserFixture {
    fn order(&self) -> u32 {
        3
    }

    async fn load(&self, em: &EntityManager, refs: &mut ReferenceMap) -> Result<()> {
        for role_name in self.roles.role_names() {
            let short = self.roles.short_code(&role_name);
            let group = refs.user_group(&format!("UserGroup-{short}"))?.clone();

            let username = format!("john-{short}");
            let user = Self::build_user(
                &username,
                &format!("john.doe-{short}@test.com"),
                &format!("password-{short}"),
            )?;
            em.persist(EntityRecord::User {
                user: user.clone(),
                group_ids: vec![group.id.clone()],
            });
            refs.add(
                &format!("User-{username}"),
                EntityRecord::User {
                    user,
                    group_ids: vec![group.id],
                },
            )?;
        }

        // 不属于任何组的默认用户
        let user = Self::build_user("john", "john.doe@test.com", "password")?;
        em.persist(EntityRecord::User {
            user: user.clone(),
            group_ids: Vec::new(),
        });
        refs.add(
            "User-john",
            EntityRecord::User {
                user,
                group_ids: Vec::new(),
            },
        )?;

        em.flush().await?;
        Ok(())
    }
}
