//! Stateless HTTP request builder and response parser for the API.
//!
//! # Design
//! `ApiClient` holds only its configuration and carries no mutable state
//! between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Whoever owns the `Transport` executes the round-trip in
//! between, keeping this type deterministic and free of I/O.

use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{ObjectEnvelope, PageEnvelope, PageResult, PageStatus};

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    accept: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_url: config.normalized_base_url(),
            accept: config.accept.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request `{base_url}/{path}` with `query` appended in order.
    ///
    /// A JSON body gets a `content-type` header.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, &str)],
        body: Option<String>,
    ) -> HttpRequest {
        let mut url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        for (i, (key, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&encode_component(key));
            url.push('=');
            url.push_str(&encode_component(value));
        }

        let mut headers = vec![("accept".to_string(), self.accept.clone())];
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            path: url,
            headers,
            body,
        }
    }

    pub fn build_list_page(&self, resource: &str, page: u32, limit: u32) -> HttpRequest {
        let (page, limit) = (page.to_string(), limit.to_string());
        self.build_request(
            HttpMethod::Get,
            &format!("api/{resource}"),
            &[("page", page.as_str()), ("limit", limit.as_str())],
            None,
        )
    }

    pub fn build_get_object(&self, resource: &str, id: impl Display) -> HttpRequest {
        self.build_request(HttpMethod::Get, &format!("api/{resource}/{id}"), &[], None)
    }

    pub fn build_create_object(
        &self,
        resource: &str,
        input: &impl Serialize,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(input)?;
        Ok(self.build_request(HttpMethod::Post, &format!("api/{resource}"), &[], Some(body)))
    }

    pub fn build_update_object(
        &self,
        resource: &str,
        id: impl Display,
        input: &impl Serialize,
    ) -> Result<HttpRequest, ApiError> {
        let body = to_json(input)?;
        let path = format!("api/{resource}/{id}");
        Ok(self.build_request(HttpMethod::Put, &path, &[], Some(body)))
    }

    pub fn build_delete_object(&self, resource: &str, id: impl Display) -> HttpRequest {
        self.build_request(HttpMethod::Delete, &format!("api/{resource}/{id}"), &[], None)
    }

    pub fn parse_page<T: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<PageResult<T>, ApiError> {
        check_status(&response, 200)?;
        let envelope: PageEnvelope<T> = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;

        let status = PageStatus::from_code(&envelope.status);
        if let PageStatus::Error(code) = status {
            return Err(ApiError::Status(code));
        }
        let meta = envelope
            .meta
            .ok_or_else(|| ApiError::Deserialization("missing field `meta`".to_string()))?;
        Ok(PageResult {
            status,
            meta,
            objects: envelope.objects,
        })
    }

    /// Parse a get or update response.
    pub fn parse_object<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        check_status(&response, 200)?;
        decode_object(&response.body)
    }

    pub fn parse_created_object<T: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<T, ApiError> {
        check_status(&response, 201)?;
        decode_object(&response.body)
    }

    pub fn parse_delete_object(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, 204)
    }
}

fn to_json(input: &impl Serialize) -> Result<String, ApiError> {
    serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn decode_object<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let envelope: ObjectEnvelope<T> =
        serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))?;

    if let PageStatus::Error(code) = PageStatus::from_code(&envelope.status) {
        return Err(ApiError::Status(code));
    }
    envelope.object.ok_or(ApiError::NotFound)
}

/// Percent-encode everything outside the URL unreserved set.
fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}
