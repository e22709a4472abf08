use crate::dto::DtoRegistry;
use crate::error::{RestError, StatusError};
use crate::form::{Form, FormFactory};
use crate::request::RestRequest;
use crate::resource::{ResponseHandler, RestResource};
use http::{Method, StatusCode};
use oxiam_storage::StorageError;
use std::collections::HashMap;
use std::sync::Arc;

/// Composable REST method helper.
///
/// One instance per controller, wired at construction with the controller's
/// resource, response handler and per-call-site override maps. Call sites
/// identify themselves with a method key, either bare (`"create_user"`) or
/// qualified (`"app::api::users::create_user"`); the override maps are
/// consulted first and the resource defaults apply otherwise.
pub struct RestMethodHelper {
    resource: Option<Arc<dyn RestResource>>,
    response_handler: Option<Arc<dyn ResponseHandler>>,
    dto_classes: HashMap<String, String>,
    form_types: HashMap<String, String>,
    dtos: Arc<DtoRegistry>,
}

impl RestMethodHelper {
    pub fn new(dtos: Arc<DtoRegistry>) -> Self {
        Self {
            resource: None,
            response_handler: None,
            dto_classes: HashMap::new(),
            form_types: HashMap::new(),
            dtos,
        }
    }

    pub fn with_resource(mut self, resource: Arc<dyn RestResource>) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_response_handler(mut self, handler: Arc<dyn ResponseHandler>) -> Self {
        self.response_handler = Some(handler);
        self
    }

    /// Override the DTO class for one method key.
    pub fn with_dto_class(mut self, method: &str, dto_class: &str) -> Self {
        self.dto_classes
            .insert(method.to_string(), dto_class.to_string());
        self
    }

    /// Override the form type for one method key.
    pub fn with_form_type(mut self, method: &str, form_type: &str) -> Self {
        self.form_types
            .insert(method.to_string(), form_type.to_string());
        self
    }

    /// The wired resource, or a configuration error surfacing as HTTP 500.
    pub fn resource(&self) -> Result<&Arc<dyn RestResource>, RestError> {
        self.resource
            .as_ref()
            .ok_or_else(|| RestError::Configuration("Resource service not set".to_string()))
    }

    /// The wired response handler, or a configuration error surfacing as
    /// HTTP 500.
    pub fn response_handler(&self) -> Result<&Arc<dyn ResponseHandler>, RestError> {
        self.response_handler
            .as_ref()
            .ok_or_else(|| RestError::Configuration("ResponseHandler service not set".to_string()))
    }

    /// Confirm the helper is fully wired and the request method is in the
    /// route's allow list. The method-not-allowed error carries the allowed
    /// list for the response.
    pub fn validate_rest_method(
        &self,
        request: &RestRequest,
        allowed: &[Method],
    ) -> Result<(), RestError> {
        // 两个协作对象都没接好的 helper 无法承载任何 REST 方法
        self.resource()?;
        self.response_handler()?;
        if !allowed.contains(request.method()) {
            return Err(RestError::MethodNotAllowed {
                method: request.method().clone(),
                allowed: allowed.to_vec(),
            });
        }
        Ok(())
    }

    /// Resolve the DTO class for a method key: override map first, resource
    /// default otherwise. The resolved name must be a registered DTO type.
    pub fn dto_class(&self, method: Option<&str>) -> Result<String, RestError> {
        let name = match method.and_then(|m| self.dto_classes.get(m)) {
            Some(overridden) => overridden.clone(),
            None => self.resource()?.dto_class().to_string(),
        };
        if !self.dtos.contains(&name) {
            return Err(RestError::Configuration(format!(
                "DTO class '{name}' is not a registered REST DTO"
            )));
        }
        Ok(name)
    }

    /// Resolve the form type for a method key: override map first, resource
    /// default otherwise. A namespace qualifier is stripped at the last
    /// `::`, so qualified and bare keys resolve identically.
    pub fn form_type_class(&self, method: Option<&str>) -> Result<String, RestError> {
        let method = method.unwrap_or("");
        let method = match method.rsplit_once("::") {
            Some((_, short)) => short,
            None => method,
        };
        match self.form_types.get(method) {
            Some(overridden) => Ok(overridden.clone()),
            None => Ok(self.resource()?.form_type_class().to_string()),
        }
    }

    /// Run the request through the method's form.
    ///
    /// With an `id`, the form is pre-populated from
    /// `resource.dto_for_entity` before binding, failing with a not-found
    /// error when the entity is missing. Invalid input terminates through
    /// the response handler's form-error path; a valid submission returns
    /// the bound form.
    pub async fn process_form(
        &self,
        request: &RestRequest,
        form_factory: &dyn FormFactory,
        method: &str,
        id: Option<&str>,
    ) -> anyhow::Result<Form> {
        let form_type = self.form_type_class(Some(method))?;
        let mut form = form_factory.create(&form_type, request.method())?;
        if let Some(id) = id {
            let data = self
                .resource()?
                .dto_for_entity(id, form.data_class())
                .await?;
            form.set_data(data);
        }
        form.handle_request(request);
        if !form.is_valid() {
            return Err(self.response_handler()?.handle_form_error(&form).into());
        }
        Ok(form)
    }

    /// Map an operation error to its HTTP form.
    ///
    /// With an `id`, the identified entity is first detached from the
    /// persistence layer (find, check managed, detach), so a record staged
    /// by the failed operation is not committed by a later flush. Failures
    /// in the detach sequence are logged and never mask the original error.
    /// Without an `id` no persistence call is made.
    pub async fn handle_rest_method_exception(
        &self,
        error: anyhow::Error,
        id: Option<&str>,
    ) -> RestError {
        if let Some(id) = id {
            if let Err(detach_error) = self.detach_entity(id).await {
                tracing::warn!(
                    id = %id,
                    error = %detach_error,
                    "Failed to detach entity after REST method error"
                );
            }
        }
        classify_error(error)
    }

    async fn detach_entity(&self, id: &str) -> anyhow::Result<()> {
        let persistence = self.resource()?.persistence();
        if let Some(entity) = persistence.find(id).await? {
            if persistence.is_managed(&entity).await {
                persistence.detach(&entity).await?;
            }
        }
        Ok(())
    }
}

/// Error classification, in precedence order:
/// already HTTP-shaped errors pass through; a no-result storage error maps
/// to 404 `"Not found"`; a non-unique storage error maps to 500 with its
/// message preserved; anything else keeps an explicitly carried status and
/// defaults to 400, message preserved.
fn classify_error(error: anyhow::Error) -> RestError {
    let error = match error.downcast::<RestError>() {
        Ok(rest) => return rest,
        Err(other) => other,
    };
    let error = match error.downcast::<StorageError>() {
        Ok(StorageError::NotFound { .. }) => return RestError::NotFound("Not found".to_string()),
        Ok(err @ StorageError::NonUnique { .. }) => {
            return RestError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: err.to_string(),
            }
        }
        Ok(other) => anyhow::Error::new(other),
        Err(other) => other,
    };
    let status = error
        .downcast_ref::<StatusError>()
        .map(|carried| carried.status)
        .unwrap_or(StatusCode::BAD_REQUEST);
    RestError::Http {
        status,
        message: error.to_string(),
    }
}
