//! In-memory stand-in for the paginated API.
//!
//! Serves `channel` and `media` resources with the same envelope the SDK
//! expects: `{"status", "meta", "objects"}` for lists and `{"status", "object"}`
//! for single objects. DTOs are defined independently from the SDK crate so
//! the integration tests catch schema drift.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

pub const DEFAULT_LIMIT: u32 = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: u64,
    pub url: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u64>,
}

#[derive(Deserialize)]
pub struct CreateChannel {
    pub url: String,
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub total: u64,
    pub page: u32,
    pub pages: u32,
    pub limit: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    #[serde(default = "Vec::new")]
    pub objects: Vec<T>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ObjectEnvelope<T> {
    pub status: String,
    pub object: Option<T>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Everything the server knows about.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub channels: Vec<Channel>,
    pub media: Vec<Media>,
}

impl Catalog {
    /// Three channels and five media items attached to them.
    pub fn sample() -> Self {
        let channels = (1..=3)
            .map(|id| Channel {
                id,
                url: "http://site.channel.com".to_string(),
                name: format!("Channel {id}"),
            })
            .collect();
        let media = (1..=5)
            .map(|id| Media {
                id,
                title: format!("Media {id}"),
                description: String::new(),
                channel: Some((id - 1) % 3 + 1),
            })
            .collect();
        Self { channels, media }
    }
}

pub type Db = Arc<RwLock<Catalog>>;

pub fn app() -> Router {
    app_with(Catalog::sample())
}

pub fn app_with(catalog: Catalog) -> Router {
    let db: Db = Arc::new(RwLock::new(catalog));
    Router::new()
        .route("/api/channel", get(list_channels).post(create_channel))
        .route("/api/channel/{id}", get(get_channel))
        .route("/api/media", get(list_media))
        .route("/api/media/{id}", get(get_media))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Serve `catalog` on `listener`.
pub async fn run_with(listener: TcpListener, catalog: Catalog) -> Result<(), std::io::Error> {
    let addr: Option<SocketAddr> = listener.local_addr().ok();
    tracing::info!(?addr, channels = catalog.channels.len(), "mock server starting");
    axum::serve(listener, app_with(catalog)).await
}

/// Slice `items` into the requested page and wrap it in an envelope.
pub fn paginate<T: Clone>(items: &[T], page: u32, limit: u32) -> PageEnvelope<T> {
    let total = items.len() as u64;
    let pages = total.div_ceil(u64::from(limit)) as u32;
    let start = (page.saturating_sub(1) as usize).saturating_mul(limit as usize);
    let objects = items
        .iter()
        .skip(start)
        .take(limit as usize)
        .cloned()
        .collect();
    PageEnvelope {
        status: "ok".to_string(),
        meta: Some(Meta {
            total,
            page,
            pages,
            limit,
        }),
        objects,
    }
}

fn page_params(query: &PageQuery) -> Result<(u32, u32), StatusCode> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if page == 0 || limit == 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok((page, limit))
}

async fn list_channels(
    State(db): State<Db>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageEnvelope<Channel>>, StatusCode> {
    let (page, limit) = page_params(&query)?;
    let catalog = db.read().await;
    tracing::debug!(page, limit, "listing channels");
    Ok(Json(paginate(&catalog.channels, page, limit)))
}

async fn get_channel(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<ObjectEnvelope<Channel>>, StatusCode> {
    let catalog = db.read().await;
    let channel = catalog
        .channels
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(ObjectEnvelope {
        status: "ok".to_string(),
        object: Some(channel),
    }))
}

async fn create_channel(
    State(db): State<Db>,
    Json(input): Json<CreateChannel>,
) -> (StatusCode, Json<ObjectEnvelope<Channel>>) {
    let mut catalog = db.write().await;
    let id = catalog.channels.iter().map(|c| c.id).max().unwrap_or(0) + 1;
    let channel = Channel {
        id,
        url: input.url,
        name: input.name,
    };
    catalog.channels.push(channel.clone());
    tracing::info!(id, "channel created");
    (
        StatusCode::CREATED,
        Json(ObjectEnvelope {
            status: "ok".to_string(),
            object: Some(channel),
        }),
    )
}

async fn list_media(
    State(db): State<Db>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageEnvelope<Media>>, StatusCode> {
    let (page, limit) = page_params(&query)?;
    let catalog = db.read().await;
    Ok(Json(paginate(&catalog.media, page, limit)))
}

async fn get_media(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<ObjectEnvelope<Media>>, StatusCode> {
    let catalog = db.read().await;
    let media = catalog
        .media
        .iter()
        .find(|m| m.id == id)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(ObjectEnvelope {
        status: "ok".to_string(),
        object: Some(media),
    }))
}
