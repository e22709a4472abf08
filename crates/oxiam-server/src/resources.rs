//! 用户资源服务与控制器。
//!
//! REST 助手只认 trait，这里把存储层的 [`EntityManager`] 与
//! [`UserStore`] 适配成助手需要的 `Persistence` / `RestResource`。

use crate::forms::{UserCreatePayload, UserPayload};
use anyhow::Result;
use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Utc;
use oxiam_common::types::User;
use oxiam_rest::{
    EntityRef, FormRegistry, Persistence, ResponseHandler, RestDto, RestError, RestMethodHelper,
    RestResource, StatusError,
};
use oxiam_storage::entity_manager::{EntityManager, EntityRecord, KIND_USER};
use oxiam_storage::error::StorageError;
use oxiam_storage::store::UserStore;
use std::sync::Arc;

/// 把实体管理器包装成 REST 助手可用的持久化接口。
pub struct OrmPersistence {
    entity_manager: Arc<EntityManager>,
    kind: &'static str,
}

impl OrmPersistence {
    pub fn new(entity_manager: Arc<EntityManager>, kind: &'static str) -> Self {
        Self {
            entity_manager,
            kind,
        }
    }
}

#[async_trait]
impl Persistence for OrmPersistence {
    async fn find(&self, id: &str) -> Result<Option<EntityRef>> {
        let exists = self.entity_manager.find(self.kind, id).await?;
        Ok(exists.then(|| EntityRef {
            kind: self.kind,
            id: id.to_string(),
        }))
    }

    async fn is_managed(&self, entity: &EntityRef) -> bool {
        self.entity_manager.is_managed(entity.kind, &entity.id)
    }

    async fn detach(&self, entity: &EntityRef) -> Result<()> {
        self.entity_manager.detach(entity.kind, &entity.id);
        Ok(())
    }
}

/// 用户资源：默认 DTO / 表单类与按 id 取数。
pub struct UserResource {
    store: Arc<UserStore>,
    persistence: Arc<OrmPersistence>,
}

impl UserResource {
    pub fn new(store: Arc<UserStore>, entity_manager: Arc<EntityManager>) -> Self {
        Self {
            store,
            persistence: Arc::new(OrmPersistence::new(entity_manager, KIND_USER)),
        }
    }

    /// 按 id 取用户与其组 id 列表。
    pub async fn find_user(&self, id: &str) -> Result<Option<(User, Vec<String>)>> {
        let Some(user) = self.store.get_user(id).await? else {
            return Ok(None);
        };
        let group_ids = self.store.list_user_group_ids(id).await?;
        Ok(Some((user, group_ids)))
    }

    fn payload_for(user: User, group_ids: Vec<String>) -> UserPayload {
        UserPayload {
            id: Some(user.id),
            username: user.username,
            firstname: user.firstname,
            surname: user.surname,
            email: user.email,
            user_groups: group_ids,
            password: None,
        }
    }
}

#[async_trait]
impl RestResource for UserResource {
    fn dto_class(&self) -> &'static str {
        "user"
    }

    fn form_type_class(&self) -> &'static str {
        "user"
    }

    async fn dto_for_entity(&self, id: &str, dto_class: &str) -> Result<Box<dyn RestDto>> {
        let Some((user, group_ids)) = self.find_user(id).await? else {
            return Err(RestError::NotFound(format!("User '{id}' not found")).into());
        };
        let payload = Self::payload_for(user, group_ids);
        match dto_class {
            "user_create" => Ok(Box::new(UserCreatePayload { user: payload })),
            _ => Ok(Box::new(payload)),
        }
    }

    fn persistence(&self) -> Arc<dyn Persistence> {
        self.persistence.clone()
    }
}

/// 表单校验失败统一转成携带字段错误的 REST 错误。
pub struct DefaultResponseHandler;

impl ResponseHandler for DefaultResponseHandler {
    fn handle_form_error(&self, form: &oxiam_rest::Form) -> RestError {
        RestError::Validation {
            errors: form.errors().to_vec(),
        }
    }
}

/// 用户控制器：REST 助手加领域写操作。
pub struct UsersController {
    pub helper: RestMethodHelper,
    pub forms: Arc<FormRegistry>,
    pub resource: Arc<UserResource>,
    pub store: Arc<UserStore>,
    pub entity_manager: Arc<EntityManager>,
}

impl UsersController {
    pub fn new(store: Arc<UserStore>, entity_manager: Arc<EntityManager>) -> Self {
        let resource = Arc::new(UserResource::new(store.clone(), entity_manager.clone()));
        let dtos = Arc::new(crate::forms::build_dto_registry());
        let forms = Arc::new(crate::forms::build_form_registry());
        let helper = RestMethodHelper::new(dtos)
            .with_resource(resource.clone())
            .with_response_handler(Arc::new(DefaultResponseHandler))
            .with_dto_class("create_user", "user_create")
            .with_form_type("create_user", "user_create");
        Self {
            helper,
            forms,
            resource,
            store,
            entity_manager,
        }
    }

    /// 建用户：唯一性预检、组存在性校验、散列口令后暂存并落库。
    pub async fn create_user(&self, payload: UserPayload) -> Result<(User, Vec<String>)> {
        if self
            .store
            .get_user_by_username(&payload.username)
            .await?
            .is_some()
        {
            return Err(StatusError::new(
                StatusCode::CONFLICT,
                format!("Username '{}' is already taken", payload.username),
            )
            .into());
        }
        if self.store.get_user_by_email(&payload.email).await?.is_some() {
            return Err(StatusError::new(
                StatusCode::CONFLICT,
                format!("Email '{}' is already in use", payload.email),
            )
            .into());
        }
        self.ensure_groups_exist(&payload.user_groups).await?;

        let now = Utc::now();
        let user = User {
            id: oxiam_common::id::next_id(),
            username: payload.username,
            firstname: payload.firstname,
            surname: payload.surname,
            email: payload.email,
            password_hash: oxiam_storage::auth::hash_password(
                payload.password.as_deref().unwrap_or_default(),
            )?,
            created_at: now,
            updated_at: now,
        };
        let group_ids = payload.user_groups;
        self.entity_manager.persist(EntityRecord::User {
            user: user.clone(),
            group_ids: group_ids.clone(),
        });
        self.entity_manager.flush().await?;
        Ok((user, group_ids))
    }

    /// 改用户：缺口令时保留既有散列，传了就重散列。
    pub async fn update_user(&self, id: &str, payload: UserPayload) -> Result<(User, Vec<String>)> {
        let Some(current) = self.store.get_user(id).await? else {
            return Err(StorageError::NotFound {
                entity: "user",
                id: id.to_string(),
            }
            .into());
        };

        let password_hash = match payload.password.as_deref() {
            Some(password) => oxiam_storage::auth::hash_password(password)?,
            None => current.password_hash.clone(),
        };
        let user = User {
            id: current.id.clone(),
            username: payload.username,
            firstname: payload.firstname,
            surname: payload.surname,
            email: payload.email,
            password_hash,
            created_at: current.created_at,
            updated_at: Utc::now(),
        };
        let group_ids = payload.user_groups;

        // 先暂存再做唯一性校验，冲突后的暂存记录由助手 detach
        self.entity_manager.persist(EntityRecord::User {
            user: user.clone(),
            group_ids: group_ids.clone(),
        });

        if user.username != current.username {
            if let Some(other) = self.store.get_user_by_username(&user.username).await? {
                if other.id != user.id {
                    return Err(StatusError::new(
                        StatusCode::CONFLICT,
                        format!("Username '{}' is already taken", user.username),
                    )
                    .into());
                }
            }
        }
        if user.email != current.email {
            if let Some(other) = self.store.get_user_by_email(&user.email).await? {
                if other.id != user.id {
                    return Err(StatusError::new(
                        StatusCode::CONFLICT,
                        format!("Email '{}' is already in use", user.email),
                    )
                    .into());
                }
            }
        }
        self.ensure_groups_exist(&group_ids).await?;

        self.entity_manager.flush().await?;
        Ok((user, group_ids))
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        if !self.store.delete_user(id).await? {
            return Err(StorageError::NotFound {
                entity: "user",
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn ensure_groups_exist(&self, group_ids: &[String]) -> Result<()> {
        for group_id in group_ids {
            if self.store.get_user_group(group_id).await?.is_none() {
                return Err(StorageError::NotFound {
                    entity: "user_group",
                    id: group_id.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}
