//! 初始数据填充。
//!
//! 每个填充器声明一个 `order`，按升序依次执行。跨填充器的依赖
//! 通过引用表传递，键名形如 `Role-admin`、`UserGroup-admin`、
//! `User-john-admin`。

pub mod roles;
pub mod user_groups;
pub mod users;

use anyhow::{bail, Result};
use async_trait::async_trait;
use oxiam_common::roles::RolesRegistry;
use oxiam_common::types::{Role, UserGroup};
use oxiam_storage::entity_manager::{EntityManager, EntityRecord};
use std::collections::HashMap;
use std::sync::Arc;

/// 数据填充器，由 [`run_fixtures`] 按 `order()` 升序调度
#[async_trait]
pub trait Fixture: Send + Sync {
    /// 执行顺序，数字越小越早
    fn order(&self) -> u32;

    /// 写入本填充器负责的数据，并把产出实体登记到引用表
    async fn load(&self, em: &EntityManager, refs: &mut ReferenceMap) -> Result<()>;
}

/// 跨填充器共享的实体引用表，重复键视为配置错误
#[derive(Default)]
pub struct ReferenceMap {
    entries: HashMap<String, EntityRecord>,
}

impl ReferenceMap {
    pub fn add(&mut self, key: &str, record: EntityRecord) -> Result<()> {
        if self.entries.contains_key(key) {
            bail!("Fixture reference '{key}' is already registered");
        }
        self.entries.insert(key.to_string(), record);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&EntityRecord> {
        self.entries.get(key)
    }

    /// 取角色引用，键名 `Role-<short>`
    pub fn role(&self, key: &str) -> Result<&Role> {
        match self.get(key) {
            Some(EntityRecord::Role(role)) => Ok(role),
            _ => bail!("Fixture reference '{key}' does not resolve to a role"),
        }
    }

    /// 取用户组引用，键名 `UserGroup-<short>`
    pub fn user_group(&self, key: &str) -> Result<&UserGroup> {
        match self.get(key) {
            Some(EntityRecord::UserGroup(group)) => Ok(group),
            _ => bail!("Fixture reference '{key}' does not resolve to a user group"),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 跑全部内置填充器，返回登记完成的引用表。
pub async fn run_fixtures(
    em: &EntityManager,
    roles: Arc<dyn RolesRegistry>,
) -> Result<ReferenceMap> {
    let mut fixtures: Vec<Box<dyn Fixture>> = vec![
        Box::new(roles::RoleFixture::new(roles.clone())),
        Box::new(user_groups::UserGroupFixture::new(roles.clone())),
        Box::new(users::UserFixture::new(roles)),
    ];
    fixtures.sort_by_key(|fixture| fixture.order());

    let mut refs = ReferenceMap::default();
    for fixture in &fixtures {
        fixture.load(em, &mut refs).await?;
    }
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_role() -> Role {
        let now = Utc::now();
        Role {
            id: "ROLE_ADMIN".to_string(),
            short: "admin".to_string(),
            description: "Description - ROLE_ADMIN".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_duplicate_reference_key_is_rejected() {
        let mut refs = ReferenceMap::default();
        refs.add("Role-admin", EntityRecord::Role(sample_role()))
            .unwrap();
        let err = refs
            .add("Role-admin", EntityRecord::Role(sample_role()))
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_typed_getters_check_the_record_kind() {
        let mut refs = ReferenceMap::default();
        refs.add("Role-admin", EntityRecord::Role(sample_role()))
            .unwrap();

        assert_eq!(refs.role("Role-admin").unwrap().id, "ROLE_ADMIN");
        assert!(refs.user_group("Role-admin").is_err());
        assert!(refs.role("Role-missing").is_err());
    }
}
