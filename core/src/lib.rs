//! Client SDK for a paginated JSON REST API.
//!
//! # Overview
//! Remote resources are exposed as `ObjectCollection`s: lazily-loaded,
//! page-cached collections of typed objects. A collection asks its
//! `Repository` for a page only when a read needs one it has not seen yet.
//!
//! # Design
//! - `ApiClient` is stateless: it builds `HttpRequest` values and parses
//!   `HttpResponse` values without touching the network.
//! - The host supplies a `Transport` that performs the actual round-trip
//!   (`ReadOnlyTransport` and `MockTransport` are provided).
//! - `ApiRepository<R, T>` picks the object type `R` at compile time through
//!   the `Resource` trait.
//! - `validator` is an independent rule evaluator for JSON values.

pub mod client;
pub mod collection;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod repository;
pub mod transport;
pub mod types;
pub mod validator;

pub use client::ApiClient;
pub use collection::{ObjectCollection, ObjectId};
pub use config::ClientConfig;
pub use error::{ApiError, CollectionError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use model::{ApiObject, Channel, Media, NewChannel, Resource};
pub use repository::{ApiRepository, ChannelRepository, MediaRepository, Repository};
pub use transport::{MockTransport, ReadOnlyTransport, Transport};
pub use types::{PageMeta, PageResult, PageStatus};
pub use validator::{validate, Rules, ValidationError};
