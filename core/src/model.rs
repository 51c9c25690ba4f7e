//! Domain objects exposed by the API.
//!
//! # Design
//! Each resource kind is a plain serde struct. `Resource::NAME` ties the type
//! to its endpoint, so a repository picks the concrete type at compile time
//! instead of resolving a class from the resource name at run time.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// An identity-bearing object that can live in an `ObjectCollection`.
pub trait ApiObject: Clone + Debug {
    type Id: Eq + Hash + Clone + Debug + Display;

    fn id(&self) -> Self::Id;
}

/// An `ApiObject` served under `/api/{NAME}`.
pub trait Resource: ApiObject + DeserializeOwned {
    const NAME: &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: u64,
    pub url: String,
    pub name: String,
}

impl ApiObject for Channel {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }
}

impl Resource for Channel {
    const NAME: &'static str = "channel";
}

/// Payload for creating a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChannel {
    pub url: String,
    pub name: String,
}

/// A media item, optionally attached to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u64>,
}

impl ApiObject for Media {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }
}

impl Resource for Media {
    const NAME: &'static str = "media";
}
