//! Repositories turn page numbers into typed pages.
//!
//! # Design
//! `Repository` is the only thing an `ObjectCollection` knows about the
//! outside world. `ApiRepository` is the HTTP-backed implementation: it owns an
//! `ApiClient` and a `Transport`, and selects the concrete object type through
//! its `Resource` type parameter.

use std::marker::PhantomData;

use serde::Serialize;

use crate::client::ApiClient;
use crate::collection::ObjectCollection;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::model::{ApiObject, Channel, Media, Resource};
use crate::transport::Transport;
use crate::types::PageResult;

/// Source of paginated objects for an `ObjectCollection`.
///
/// Implementations surface every transport, status or decoding failure as
/// `Err`; a returned `PageResult` is always complete.
pub trait Repository {
    type Object: ApiObject;

    fn fetch_page(&self, page: u32) -> Result<PageResult<Self::Object>, ApiError>;
}

/// HTTP-backed repository for resource `R`.
#[derive(Debug)]
pub struct ApiRepository<R, T> {
    client: ApiClient,
    transport: T,
    page_limit: u32,
    _resource: PhantomData<fn() -> R>,
}

pub type ChannelRepository<T> = ApiRepository<Channel, T>;
pub type MediaRepository<T> = ApiRepository<Media, T>;

impl<R: Resource, T: Transport> ApiRepository<R, T> {
    pub fn new(config: &ClientConfig, transport: T) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self {
            client: ApiClient::new(config),
            transport,
            page_limit: config.page_limit,
            _resource: PhantomData,
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn page_limit(&self) -> u32 {
        self.page_limit
    }

    /// Fetch a single object by id, bypassing any collection cache.
    pub fn find(&self, id: &R::Id) -> Result<R, ApiError> {
        let request = self.client.build_get_object(R::NAME, id);
        let response = self.transport.execute(request)?;
        self.client.parse_object(response)
    }

    /// Create an object and return it as stored by the server.
    pub fn create(&self, input: &impl Serialize) -> Result<R, ApiError> {
        let request = self.client.build_create_object(R::NAME, input)?;
        let response = self.transport.execute(request)?;
        let created: R = self.client.parse_created_object(response)?;
        tracing::info!(resource = R::NAME, id = %created.id(), "object created");
        Ok(created)
    }

    /// Bind a new lazily-loaded collection to this repository.
    pub fn collection(self) -> ObjectCollection<Self> {
        ObjectCollection::new(self)
    }
}

impl<R: Resource, T: Transport> Repository for ApiRepository<R, T> {
    type Object = R;

    fn fetch_page(&self, page: u32) -> Result<PageResult<R>, ApiError> {
        let request = self.client.build_list_page(R::NAME, page, self.page_limit);
        let response = self.transport.execute(request)?;
        tracing::debug!(
            resource = R::NAME,
            page,
            status = response.status,
            "page response received"
        );
        self.client.parse_page(response)
    }
}
