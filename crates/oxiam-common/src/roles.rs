/// 内置角色层级，从低到高
pub const DEFAULT_ROLES: [&str; 5] = [
    "ROLE_LOGGED",
    "ROLE_USER",
    "ROLE_ADMIN",
    "ROLE_ROOT",
    "ROLE_API",
];

/// 角色目录，供数据填充与 API 层查询
pub trait RolesRegistry: Send + Sync {
    /// 完整角色名列表，按权限从低到高排列
    fn role_names(&self) -> Vec<String>;

    /// 角色短标识：去掉第一个下划线之前的前缀并转小写
    fn short_code(&self, role: &str) -> String {
        match role.split_once('_') {
            Some((_, rest)) => rest.to_lowercase(),
            None => role.to_lowercase(),
        }
    }
}

/// 静态角色目录
///
/// # Examples
///
/// ```
/// use oxiam_common::roles::{RolesRegistry, StaticRoles};
///
/// let roles = StaticRoles::default();
/// assert_eq!(roles.role_names().len(), 5);
/// assert_eq!(roles.short_code("ROLE_ADMIN"), "admin");
/// ```
pub struct StaticRoles {
    roles: Vec<String>,
}

impl StaticRoles {
    pub fn new(roles: Vec<String>) -> Self {
        Self { roles }
    }
}

impl Default for StaticRoles {
    fn default() -> Self {
        Self::new(DEFAULT_ROLES.iter().map(|r| r.to_string()).collect())
    }
}

impl RolesRegistry for StaticRoles {
    fn role_names(&self) -> Vec<String> {
        self.roles.clone()
    }
}
