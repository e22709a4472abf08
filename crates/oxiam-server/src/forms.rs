//! 用户资源的 DTO 与表单定义。
//!
//! 入站请求体一律经表单绑定校验后才进入控制器，DTO 注册表给
//! REST 助手提供能力校验依据。

use axum::http::Method;
use oxiam_rest::{DtoRegistry, FormError, FormRegistry, FormTypeDef, RestDto};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

/// 用户读写 DTO。
///
/// `password` 只在入站方向使用，出站序列化时跳过。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user_groups: Vec<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

impl RestDto for UserPayload {
    fn dto_class(&self) -> &'static str {
        "user"
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

/// 建用户 DTO，字段与 [`UserPayload`] 相同但口令必填（由表单校验）。
/// 作为独立 DTO 类注册，供按调用点覆盖默认类使用。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserCreatePayload {
    #[serde(flatten)]
    pub user: UserPayload,
}

impl RestDto for UserCreatePayload {
    fn dto_class(&self) -> &'static str {
        "user_create"
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

fn field_error(field: &str, message: &str) -> FormError {
    FormError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// 文本字段绑定：非 PATCH 时字段必填，长度 2..=255。
fn bind_text_field(
    body: &Value,
    field: &'static str,
    partial: bool,
    target: &mut String,
    errors: &mut Vec<FormError>,
) {
    match body.get(field) {
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.len() < 2 {
                errors.push(field_error(field, "must be at least 2 characters"));
            } else if text.len() > 255 {
                errors.push(field_error(field, "must be at most 255 characters"));
            } else {
                *target = text.to_string();
            }
        }
        Some(Value::Null) | None => {
            if !partial {
                errors.push(field_error(field, "field is required"));
            }
        }
        Some(_) => errors.push(field_error(field, "must be a string")),
    }
}

fn is_email(text: &str) -> bool {
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn bind_email_field(body: &Value, partial: bool, target: &mut String, errors: &mut Vec<FormError>) {
    match body.get("email") {
        Some(Value::String(text)) => {
            let text = text.trim();
            if is_email(text) {
                *target = text.to_string();
            } else {
                errors.push(field_error("email", "must be a valid email address"));
            }
        }
        Some(Value::Null) | None => {
            if !partial {
                errors.push(field_error("email", "field is required"));
            }
        }
        Some(_) => errors.push(field_error("email", "must be a string")),
    }
}

/// 把请求体绑定到用户 DTO 上。
///
/// PATCH 视为部分绑定：缺省字段保留预填充值。`user_groups` 仅在显式
/// 传数组时整体替换，`id` 由服务端生成，入站值一律忽略。
fn bind_user_fields(
    user: &mut UserPayload,
    method: &Method,
    body: &Value,
    require_password: bool,
) -> Vec<FormError> {
    let partial = *method == Method::PATCH;
    let mut errors = Vec::new();

    bind_text_field(body, "username", partial, &mut user.username, &mut errors);
    bind_text_field(body, "firstname", partial, &mut user.firstname, &mut errors);
    bind_text_field(body, "surname", partial, &mut user.surname, &mut errors);
    bind_email_field(body, partial, &mut user.email, &mut errors);

    match body.get("user_groups") {
        Some(Value::Array(entries)) => {
            let mut ids = Vec::with_capacity(entries.len());
            let mut all_strings = true;
            for entry in entries {
                match entry.as_str() {
                    Some(id) => ids.push(id.to_string()),
                    None => {
                        all_strings = false;
                        errors.push(field_error("user_groups", "entries must be user group ids"));
                        break;
                    }
                }
            }
            if all_strings {
                user.user_groups = ids;
            }
        }
        Some(Value::Null) | None => {}
        Some(_) => errors.push(field_error("user_groups", "must be an array")),
    }

    match body.get("password") {
        Some(Value::String(text)) => {
            if text.len() < 8 {
                errors.push(field_error("password", "must be at least 8 characters"));
            } else {
                user.password = Some(text.clone());
            }
        }
        Some(Value::Null) | None => {
            if require_password && user.password.is_none() {
                errors.push(field_error("password", "field is required"));
            }
        }
        Some(_) => errors.push(field_error("password", "must be a string")),
    }

    errors
}

/// 用户表单（读改场景），口令可选，缺省时保留既有口令散列。
pub struct UserFormType;

impl FormTypeDef for UserFormType {
    fn name(&self) -> &'static str {
        "user"
    }

    fn data_class(&self) -> &'static str {
        "user"
    }

    fn empty_data(&self) -> Box<dyn RestDto> {
        Box::new(UserPayload::default())
    }

    fn bind(&self, data: &mut dyn RestDto, method: &Method, body: &Value) -> Vec<FormError> {
        let Some(user) = data.as_any_mut().downcast_mut::<UserPayload>() else {
            return vec![field_error("_form", "payload does not match form data class")];
        };
        bind_user_fields(user, method, body, false)
    }
}

/// 建用户表单，口令必填。
pub struct UserCreateFormType;

impl FormTypeDef for UserCreateFormType {
    fn name(&self) -> &'static str {
        "user_create"
    }

    fn data_class(&self) -> &'static str {
        "user_create"
    }

    fn empty_data(&self) -> Box<dyn RestDto> {
        Box::new(UserCreatePayload::default())
    }

    fn bind(&self, data: &mut dyn RestDto, method: &Method, body: &Value) -> Vec<FormError> {
        let Some(payload) = data.as_any_mut().downcast_mut::<UserCreatePayload>() else {
            return vec![field_error("_form", "payload does not match form data class")];
        };
        bind_user_fields(&mut payload.user, method, body, true)
    }
}

pub fn build_dto_registry() -> DtoRegistry {
    let mut dtos = DtoRegistry::new();
    dtos.register::<UserPayload>();
    dtos.register::<UserCreatePayload>();
    dtos
}

pub fn build_form_registry() -> FormRegistry {
    let mut forms = FormRegistry::new();
    forms.register(Arc::new(UserFormType));
    forms.register(Arc::new(UserCreateFormType));
    forms
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxiam_rest::{downcast_dto, FormFactory, RestRequest};
    use serde_json::json;

    fn bind_through_form(
        form_type: &str,
        method: Method,
        body: Value,
    ) -> (bool, Vec<FormError>, Box<dyn RestDto>) {
        let forms = build_form_registry();
        let mut form = forms
            .create(form_type, &method)
            .expect("form type should be registered");
        form.handle_request(&RestRequest::new(method, body));
        let valid = form.is_valid();
        let errors = form.errors().to_vec();
        (valid, errors, form.into_data())
    }

    fn error_fields(errors: &[FormError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_create_form_binds_full_payload() {
        let (valid, errors, data) = bind_through_form(
            "user_create",
            Method::POST,
            json!({
                "username": "alice.w",
                "firstname": "Alice",
                "surname": "Winter",
                "email": "alice@test.com",
                "password": "wintertime",
                "user_groups": ["g1", "g2"]
            }),
        );
        assert!(valid, "unexpected errors: {errors:?}");
        let payload = downcast_dto::<UserCreatePayload>(data).expect("dto should downcast");
        assert_eq!(payload.user.username, "alice.w");
        assert_eq!(payload.user.user_groups, vec!["g1", "g2"]);
        assert_eq!(payload.user.password.as_deref(), Some("wintertime"));
    }

    #[test]
    fn test_create_form_reports_all_missing_fields() {
        let (valid, errors, _) = bind_through_form("user_create", Method::POST, json!({}));
        assert!(!valid);
        let fields = error_fields(&errors);
        for expected in ["username", "firstname", "surname", "email", "password"] {
            assert!(fields.contains(&expected), "missing error for {expected}");
        }
    }

    #[test]
    fn test_create_form_rejects_short_password_and_bad_email() {
        let (valid, errors, _) = bind_through_form(
            "user_create",
            Method::POST,
            json!({
                "username": "alice.w",
                "firstname": "Alice",
                "surname": "Winter",
                "email": "not-an-email",
                "password": "short"
            }),
        );
        assert!(!valid);
        let fields = error_fields(&errors);
        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"password"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_update_form_does_not_require_password() {
        let (valid, errors, _) = bind_through_form(
            "user",
            Method::PUT,
            json!({
                "username": "alice.w",
                "firstname": "Alice",
                "surname": "Winter",
                "email": "alice@test.com"
            }),
        );
        assert!(valid, "unexpected errors: {errors:?}");
    }

    #[test]
    fn test_patch_bind_keeps_prepopulated_fields() {
        let forms = build_form_registry();
        let mut form = forms
            .create("user", &Method::PATCH)
            .expect("form type should be registered");
        form.set_data(Box::new(UserPayload {
            id: Some("42".to_string()),
            username: "alice.w".to_string(),
            firstname: "Alice".to_string(),
            surname: "Winter".to_string(),
            email: "alice@test.com".to_string(),
            user_groups: vec!["g1".to_string()],
            password: None,
        }));
        form.handle_request(&RestRequest::new(
            Method::PATCH,
            json!({"firstname": "Alicia"}),
        ));

        assert!(form.is_valid(), "unexpected errors: {:?}", form.errors());
        let payload = downcast_dto::<UserPayload>(form.into_data()).expect("dto should downcast");
        assert_eq!(payload.firstname, "Alicia");
        assert_eq!(payload.username, "alice.w");
        assert_eq!(payload.email, "alice@test.com");
        assert_eq!(payload.user_groups, vec!["g1"]);
    }

    #[test]
    fn test_user_groups_must_be_an_array_of_strings() {
        let (valid, errors, _) = bind_through_form(
            "user",
            Method::PATCH,
            json!({"user_groups": "g1"}),
        );
        assert!(!valid);
        assert_eq!(error_fields(&errors), vec!["user_groups"]);

        let (valid, errors, _) = bind_through_form(
            "user",
            Method::PATCH,
            json!({"user_groups": [1, 2]}),
        );
        assert!(!valid);
        assert_eq!(error_fields(&errors), vec!["user_groups"]);
    }

    #[test]
    fn test_password_is_skipped_on_serialization() {
        let payload = UserPayload {
            password: Some("wintertime".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).expect("payload should serialize");
        assert!(json.get("password").is_none());
    }
}
