use crate::dto::RestDto;
use crate::error::{FormError, RestError};
use crate::request::RestRequest;
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A form type: names its DTO data class and binds request bodies onto it.
pub trait FormTypeDef: Send + Sync {
    /// Registered name of the form type.
    fn name(&self) -> &'static str;

    /// Name of the DTO class this form binds into.
    fn data_class(&self) -> &'static str;

    /// Fresh DTO instance used when the form is not pre-populated.
    fn empty_data(&self) -> Box<dyn RestDto>;

    /// Bind body fields onto `data`, returning field-level errors.
    ///
    /// PATCH overlays only the fields present in the body; other methods
    /// must supply the full required field set.
    fn bind(&self, data: &mut dyn RestDto, method: &Method, body: &Value) -> Vec<FormError>;
}

/// An unnamed form created for one request method.
pub struct Form {
    form_type: Arc<dyn FormTypeDef>,
    method: Method,
    data: Box<dyn RestDto>,
    errors: Vec<FormError>,
    submitted: bool,
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("form_type", &self.form_type.name())
            .field("method", &self.method)
            .field("errors", &self.errors)
            .field("submitted", &self.submitted)
            .finish_non_exhaustive()
    }
}

impl Form {
    fn new(form_type: Arc<dyn FormTypeDef>, method: Method) -> Self {
        let data = form_type.empty_data();
        Self {
            form_type,
            method,
            data,
            errors: Vec::new(),
            submitted: false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.form_type.name()
    }

    pub fn data_class(&self) -> &'static str {
        self.form_type.data_class()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Replace the form data, typically with a DTO loaded from an existing
    /// entity before a partial update is bound over it.
    pub fn set_data(&mut self, data: Box<dyn RestDto>) {
        self.data = data;
    }

    /// Bind the request body onto the form data.
    pub fn handle_request(&mut self, request: &RestRequest) {
        self.submitted = true;
        self.errors = self
            .form_type
            .bind(self.data.as_mut(), &self.method, request.body());
    }

    /// A form is valid once submitted with no field errors.
    pub fn is_valid(&self) -> bool {
        self.submitted && self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FormError] {
        &self.errors
    }

    pub fn data(&self) -> &dyn RestDto {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Box<dyn RestDto> {
        self.data
    }
}

/// Creates forms by registered type name.
pub trait FormFactory: Send + Sync {
    fn create(&self, form_type: &str, method: &Method) -> Result<Form, RestError>;
}

/// Form type catalogue. Applications register their concrete form types at
/// startup and hand the registry to call sites as the [`FormFactory`].
pub struct FormRegistry {
    types: HashMap<&'static str, Arc<dyn FormTypeDef>>,
}

impl FormRegistry {
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    pub fn register(&mut self, form_type: Arc<dyn FormTypeDef>) {
        self.types.insert(form_type.name(), form_type);
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.types.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for FormRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormFactory for FormRegistry {
    fn create(&self, form_type: &str, method: &Method) -> Result<Form, RestError> {
        let def = self
            .types
            .get(form_type)
            .ok_or_else(|| RestError::Configuration(format!("Unknown form type '{form_type}'")))?;
        Ok(Form::new(def.clone(), method.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    #[derive(Debug, Default)]
    struct Echo {
        text: String,
    }

    impl RestDto for Echo {
        fn dto_class(&self) -> &'static str {
            "echo"
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
        fn into_any(self: Box<Self>) -> Box<dyn Any> {
            self
        }
    }

    struct EchoForm;

    impl FormTypeDef for EchoForm {
        fn name(&self) -> &'static str {
            "echo"
        }
        fn data_class(&self) -> &'static str {
            "echo"
        }
        fn empty_data(&self) -> Box<dyn RestDto> {
            Box::new(Echo::default())
        }
        fn bind(&self, data: &mut dyn RestDto, _method: &Method, body: &Value) -> Vec<FormError> {
            let Some(echo) = data.as_any_mut().downcast_mut::<Echo>() else {
                return vec![FormError {
                    field: "_form".to_string(),
                    message: "wrong data class".to_string(),
                }];
            };
            match body.get("text").and_then(Value::as_str) {
                Some(text) => {
                    echo.text = text.to_string();
                    Vec::new()
                }
                None => vec![FormError {
                    field: "text".to_string(),
                    message: "field is required".to_string(),
                }],
            }
        }
    }

    fn registry() -> FormRegistry {
        let mut forms = FormRegistry::new();
        forms.register(Arc::new(EchoForm));
        forms
    }

    #[test]
    fn test_create_unknown_type_is_configuration_error() {
        let err = registry().create("ghost", &Method::POST).unwrap_err();
        assert_eq!(err.status().as_u16(), 500);
        assert!(err.to_string().contains("'ghost'"));
    }

    #[test]
    fn test_form_is_invalid_until_submitted() {
        let form = registry().create("echo", &Method::POST).unwrap();
        assert!(!form.is_valid());
        assert_eq!(form.type_name(), "echo");
        assert_eq!(form.data_class(), "echo");
    }

    #[test]
    fn test_bind_collects_field_errors() {
        let mut form = registry().create("echo", &Method::POST).unwrap();
        form.handle_request(&RestRequest::new(Method::POST, serde_json::json!({})));
        assert!(!form.is_valid());
        assert_eq!(form.errors().len(), 1);
        assert_eq!(form.errors()[0].field, "text");
    }

    #[test]
    fn test_bind_fills_data() {
        let mut form = registry().create("echo", &Method::POST).unwrap();
        form.handle_request(&RestRequest::new(
            Method::POST,
            serde_json::json!({"text": "hello"}),
        ));
        assert!(form.is_valid());
        let echo = crate::dto::downcast_dto::<Echo>(form.into_data()).unwrap();
        assert_eq!(echo.text, "hello");
    }
}
