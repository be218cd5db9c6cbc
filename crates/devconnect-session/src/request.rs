//! Re-buildable API requests and error body parsing.

use crate::{ImageUpload, SessionResult};
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use url::Url;

/// Description of one API call.
///
/// `reqwest` request bodies cannot be replayed (multipart forms are
/// consumed on send), so a request is kept as plain data and turned into a
/// `RequestBuilder` on every attempt.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, without a leading slash.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// Set once the request has been replayed after a token refresh.
    pub retried: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartBody),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MultipartBody {
    pub fields: Vec<(String, String)>,
    pub files: Vec<(String, ImageUpload)>,
}

impl MultipartBody {
    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push((name.to_string(), value.into()));
        self
    }

    pub fn file(mut self, name: &str, image: ImageUpload) -> Self {
        self.files.push((name.to_string(), image));
        self
    }

    fn to_form(&self) -> SessionResult<Form> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        for (name, image) in &self.files {
            form = form.part(name.clone(), image.to_part()?);
        }
        Ok(form)
    }
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.body = RequestBody::Multipart(body);
        self
    }

    /// Build a fresh `RequestBuilder` for one attempt.
    pub fn build(
        &self,
        http: &Client,
        base_url: &Url,
        access_token: Option<&str>,
    ) -> SessionResult<RequestBuilder> {
        let url = base_url.join(&self.path)?;
        let mut builder = http.request(self.method.clone(), url);

        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }

        builder = match &self.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(body) => builder.multipart(body.to_form()?),
        };

        Ok(builder)
    }
}

/// Pull a user-facing message out of an error response body.
///
/// Looks at `detail`, `error` and `message` first, then takes the first
/// field error of a validation response (`{"field": ["msg", ...]}`).
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    for key in ["detail", "error", "message"] {
        if let Some(message) = object.get(key).and_then(first_text) {
            return Some(message);
        }
    }

    object.values().find_map(first_text)
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

/// Error for a non-success response that has no more specific meaning.
pub(crate) fn api_error(status: StatusCode, body: &str, fallback: &str) -> crate::SessionError {
    crate::SessionError::Api {
        status: status.as_u16(),
        message: error_message(body).unwrap_or_else(|| fallback.to_string()),
    }
}
