use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One photo as reported by the remote folder. Identity is `id`, which is
/// stable across fetches; positions are only meaningful within a single fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoItem {
    pub id: String,
    pub name: String,
    pub display_url: String,
    pub thumbnail_url: String,
    /// Synthetic item shown when no real photos are configured or reachable.
    #[serde(default)]
    pub placeholder: bool,
}

/// The slideshow's view of the remote collection plus a non-blocking warning.
///
/// Replaced wholesale on every successful fetch, never patched in place, so a
/// reader always observes a fully-formed list.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    pub photos: Arc<Vec<PhotoItem>>,
    pub warning: Option<String>,
}

impl Gallery {
    pub fn new(photos: Vec<PhotoItem>, warning: Option<String>) -> Self {
        Self {
            photos: Arc::new(photos),
            warning,
        }
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

/// What the display renders right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum Frame {
    /// The collection is empty; render the "awaiting photos" screen instead of
    /// indexing into anything.
    AwaitingPhotos,
    Showing(SlideFrame),
}

/// A populated frame: the base layer, an optional incoming overlay while a
/// transition is in flight, and the epoch that remounts the base layer's
/// animation after each committed swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideFrame {
    pub photo: PhotoItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming: Option<PhotoItem>,
    pub index: usize,
    pub total: usize,
    pub epoch: u64,
}
