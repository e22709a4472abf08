//! REST method plumbing for resource controllers.
//!
//! [`method_helper::RestMethodHelper`] gives controllers a uniform way to
//! validate request methods against a route's allow list, resolve the DTO
//! class and form type for an operation (per-call-site override maps first,
//! resource defaults as fallback), process request bodies through forms, and
//! map operation errors to HTTP errors. On failure the touched entity is
//! detached from the persistence layer first, so a half-applied mutation
//! cannot be committed by a later, unrelated flush.
//!
//! The helper is a plain value composed into a controller at construction
//! time; all collaborators (resource, response handler, override maps, DTO
//! registry) are passed in explicitly.

pub mod dto;
pub mod error;
pub mod form;
pub mod method_helper;
pub mod request;
pub mod resource;

pub use dto::{downcast_dto, DtoRegistry, RestDto};
pub use error::{FormError, RestError, StatusError};
pub use form::{Form, FormFactory, FormRegistry, FormTypeDef};
pub use method_helper::RestMethodHelper;
pub use request::RestRequest;
pub use resource::{EntityRef, Persistence, ResponseHandler, RestResource};
