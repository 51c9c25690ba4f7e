//! Client configuration.
//!
//! `ClientConfig` deserializes from whatever format the host keeps its
//! settings in; every field except `base_url` has a default.

use serde::Deserialize;

use crate::error::ApiError;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const DEFAULT_ACCEPT: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default = "default_accept")]
    pub accept: String,
}

fn default_page_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

fn default_accept() -> String {
    DEFAULT_ACCEPT.to_string()
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            accept: DEFAULT_ACCEPT.to_string(),
        }
    }

    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit;
        self
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.base_url.trim().is_empty() {
            return Err(ApiError::InvalidConfig("base_url is empty".to_string()));
        }
        if self.page_limit == 0 {
            return Err(ApiError::InvalidConfig(
                "page_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// `base_url` with a scheme and without a trailing slash.
    pub fn normalized_base_url(&self) -> String {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        }
    }
}
