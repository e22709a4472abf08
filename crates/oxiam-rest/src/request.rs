use http::Method;
use serde_json::Value;

/// An incoming REST request reduced to what form processing needs: the HTTP
/// method and the parsed JSON body.
#[derive(Debug, Clone)]
pub struct RestRequest {
    method: Method,
    body: Value,
}

impl RestRequest {
    pub fn new(method: Method, body: Value) -> Self {
        Self { method, body }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}
