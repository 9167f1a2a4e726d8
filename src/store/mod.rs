//! Item Store: a shared document collection with live snapshots
//!
//! The store deals in untyped JSON documents keyed by a store-assigned id.
//! Typed records are parsed out of snapshots by the caller (see
//! `inventory::Item::from_document`).

pub mod local;

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tokio::sync::watch;

pub use local::LocalStore;

/// Logical collection all clients share
const COLLECTION_SEGMENT: &str = "public/data/pantry_tracker";

/// Default application id when none is configured
pub const DEFAULT_APP_ID: &str = "default-app-id";

pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {id} not found")]
    NotFound { id: String },

    #[error("document {id} is malformed: {reason}")]
    Malformed { id: String, reason: String },

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// `artifacts/<app_id>/public/data/pantry_tracker`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Ids that are blank or would leave the `artifacts/` directory fall
    /// back to `DEFAULT_APP_ID`
    pub fn for_app(app_id: &str) -> Self {
        let trimmed = app_id.trim();
        let app_id = if trimmed.is_empty() {
            DEFAULT_APP_ID
        } else if !is_plain_segment(trimmed) {
            tracing::warn!("Ignoring app id {:?}: not a plain path segment", trimmed);
            DEFAULT_APP_ID
        } else {
            trimmed
        };
        Self(format!("artifacts/{}/{}", app_id, COLLECTION_SEGMENT))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_plain_segment(id: &str) -> bool {
    !id.contains(|c: char| c == '/' || c == '\\') && !id.contains("..")
}

impl Default for CollectionPath {
    fn default() -> Self {
        Self::for_app(DEFAULT_APP_ID)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

/// Full contents of a collection at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub docs: Vec<StoredDocument>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.docs.len()
    }
}

/// Live view of one collection. Dropping it (or calling `unsubscribe`)
/// stops delivery.
pub struct Subscription {
    path: CollectionPath,
    rx: watch::Receiver<Snapshot>,
}

impl Subscription {
    pub(crate) fn new(path: CollectionPath, rx: watch::Receiver<Snapshot>) -> Self {
        Self { path, rx }
    }

    /// Latest snapshot, marking it seen
    pub fn current(&mut self) -> Snapshot {
        self.rx.borrow_and_update().clone()
    }

    /// Non-blocking: the latest snapshot if one arrived since the last look
    pub fn poll(&mut self) -> Option<Snapshot> {
        match self.rx.has_changed() {
            Ok(true) => Some(self.current()),
            _ => None,
        }
    }

    pub fn unsubscribe(self) {
        tracing::debug!("Unsubscribed from {}", self.path);
    }
}

/// CRUD plus snapshot subscriptions over a document collection
#[allow(async_fn_in_trait)]
pub trait ItemStore {
    /// Watch a collection. The first snapshot is available immediately.
    async fn subscribe(&self, path: &CollectionPath) -> Result<Subscription, StoreError>;

    /// Add a document and return its store-assigned id
    async fn create(&self, path: &CollectionPath, record: Document) -> Result<String, StoreError>;

    /// Merge `patch` into an existing document
    async fn update(&self, path: &CollectionPath, id: &str, patch: Document) -> Result<(), StoreError>;

    /// Remove a document. Deleting a missing id succeeds.
    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), StoreError>;

    /// Pick up changes other writers made to a collection and publish them
    /// to subscribers. Stores that see every write directly have nothing to do.
    async fn sync(&self, _path: &CollectionPath) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_path() {
        assert_eq!(
            CollectionPath::for_app("kitchen").as_str(),
            "artifacts/kitchen/public/data/pantry_tracker"
        );
        assert_eq!(
            CollectionPath::for_app("  ").as_str(),
            "artifacts/default-app-id/public/data/pantry_tracker"
        );
        assert_eq!(CollectionPath::default(), CollectionPath::for_app(DEFAULT_APP_ID));
    }

    #[test]
    fn test_app_id_cannot_escape_artifacts() {
        for app_id in ["../../x", "a/b", "a\\b", "..", "x..y"] {
            assert_eq!(CollectionPath::for_app(app_id), CollectionPath::default(), "{}", app_id);
        }
        assert_eq!(
            CollectionPath::for_app("my-app.v2").as_str(),
            "artifacts/my-app.v2/public/data/pantry_tracker"
        );
    }

    #[test]
    fn test_subscription_poll_sees_only_new_snapshots() {
        let (tx, rx) = watch::channel(Snapshot::default());
        let mut sub = Subscription::new(CollectionPath::default(), rx);

        assert!(sub.poll().is_none());

        let mut data = Document::new();
        data.insert("name".into(), Value::from("Rice"));
        tx.send_replace(Snapshot {
            docs: vec![StoredDocument { id: "a".into(), data }],
        });

        assert_eq!(sub.poll().map(|s| s.len()), Some(1));
        assert!(sub.poll().is_none());
    }
}
