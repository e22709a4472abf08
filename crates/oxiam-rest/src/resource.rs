use crate::dto::RestDto;
use crate::error::RestError;
use crate::form::Form;
use async_trait::async_trait;
use std::sync::Arc;

/// Handle to a persisted entity as seen by the REST layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub kind: &'static str,
    pub id: String,
}

/// Find / is-managed / detach over the persistence layer's managed set of
/// staged, not-yet-flushed records.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Look up the entity for `id`, returning a handle when it exists.
    async fn find(&self, id: &str) -> anyhow::Result<Option<EntityRef>>;

    /// Whether the persistence layer currently tracks `entity` with
    /// uncommitted state.
    async fn is_managed(&self, entity: &EntityRef) -> bool;

    /// Drop `entity` from the tracked set so pending changes to it are not
    /// written by a later flush.
    async fn detach(&self, entity: &EntityRef) -> anyhow::Result<()>;
}

/// The entity-facing collaborator of a REST controller.
#[async_trait]
pub trait RestResource: Send + Sync {
    /// Default DTO class for this resource.
    fn dto_class(&self) -> &'static str;

    /// Default form type for this resource.
    fn form_type_class(&self) -> &'static str;

    /// Load the entity identified by `id`, projected into the DTO class
    /// named by `dto_class`. Fails with a not-found error when no such
    /// entity exists.
    async fn dto_for_entity(&self, id: &str, dto_class: &str) -> anyhow::Result<Box<dyn RestDto>>;

    /// Persistence collaborator backing this resource's entity kind.
    fn persistence(&self) -> Arc<dyn Persistence>;
}

/// Builds the terminating error for a form that failed validation.
pub trait ResponseHandler: Send + Sync {
    fn handle_form_error(&self, form: &Form) -> RestError;
}
