//! Wire envelope and pagination DTOs.
//!
//! # Design
//! List endpoints answer with `{"status", "meta", "objects"}` and single-object
//! endpoints with `{"status", "object"}`. The envelope types mirror that JSON
//! exactly; `PageResult` is what repositories hand to collections.

use serde::{Deserialize, Serialize};

/// Envelope status string that marks a successful response.
pub const STATUS_OK: &str = "ok";

/// Server-reported pagination summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u32,
    pub pages: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    Ok,
    Error(String),
}

impl PageStatus {
    pub fn from_code(code: &str) -> Self {
        if code == STATUS_OK {
            PageStatus::Ok
        } else {
            PageStatus::Error(code.to_string())
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, PageStatus::Ok)
    }
}

/// One page of typed objects as returned by a `Repository`.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult<T> {
    pub status: PageStatus,
    pub meta: PageMeta,
    pub objects: Vec<T>,
}

impl<T> PageResult<T> {
    pub fn ok(meta: PageMeta, objects: Vec<T>) -> Self {
        Self {
            status: PageStatus::Ok,
            meta,
            objects,
        }
    }
}

/// Raw JSON shape of a list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    #[serde(default = "Vec::new")]
    pub objects: Vec<T>,
}

/// Raw JSON shape of a single-object response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEnvelope<T> {
    pub status: String,
    pub object: Option<T>,
}
