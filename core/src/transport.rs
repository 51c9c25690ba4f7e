//! Pluggable execution of `HttpRequest` values.
//!
//! # Design
//! The host decides how requests reach the network by implementing
//! `Transport`. Non-2xx statuses come back as `HttpResponse` data so that
//! `ApiClient` stays the single place where statuses are interpreted; only
//! failures to complete the round-trip are `Err`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes a single HTTP round-trip.
pub trait Transport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Wraps a transport and refuses every state-changing method.
#[derive(Debug, Clone)]
pub struct ReadOnlyTransport<T> {
    inner: T,
}

impl<T> ReadOnlyTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport> Transport for ReadOnlyTransport<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        if request.method.is_write() {
            tracing::warn!(
                method = %request.method,
                path = %request.path,
                "read-only transport refused request"
            );
            return Err(ApiError::MethodNotAllowed(request.method));
        }
        self.inner.execute(request)
    }
}

type Canned = Result<HttpResponse, ApiError>;

/// Replays canned responses and records every request.
///
/// Responses registered with `push_response_for` are served to the first
/// request whose path contains their fragment; everything else is served from
/// the FIFO queue. Once nothing matches, calls fail with `ApiError::Transport`.
#[derive(Debug, Default)]
pub struct MockTransport {
    queue: Mutex<VecDeque<Canned>>,
    routed: Mutex<Vec<(String, Canned)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, status: u16, body: impl Into<String>) {
        self.lock_queue().push_back(Ok(HttpResponse::new(status, body)));
    }

    /// Serve this response to the next request whose path contains
    /// `path_fragment`. Entries for the same fragment are used in order.
    pub fn push_response_for(&self, path_fragment: &str, status: u16, body: impl Into<String>) {
        self.lock_routed().push((
            path_fragment.to_string(),
            Ok(HttpResponse::new(status, body)),
        ));
    }

    /// Queue a transport-level failure.
    pub fn push_error(&self, message: impl Into<String>) {
        self.lock_queue()
            .push_back(Err(ApiError::Transport(message.into())));
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Responses not yet served, routed and queued together.
    pub fn pending(&self) -> usize {
        self.lock_queue().len() + self.lock_routed().len()
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<Canned>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_routed(&self) -> MutexGuard<'_, Vec<(String, Canned)>> {
        self.routed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_routed(&self, path: &str) -> Option<Canned> {
        let mut routed = self.lock_routed();
        let position = routed
            .iter()
            .position(|(fragment, _)| path.contains(fragment.as_str()))?;
        Some(routed.remove(position).1)
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let routed = self.take_routed(&request.path);
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        routed
            .or_else(|| self.lock_queue().pop_front())
            .unwrap_or_else(|| Err(ApiError::Transport("no mock response queued".to_string())))
    }
}
