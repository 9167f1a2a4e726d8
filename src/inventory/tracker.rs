//! Inventory mutations and the cached item list
//!
//! Mutations are validated locally and then handed to the store. Store
//! failures are logged and swallowed; the cache only changes when a
//! snapshot arrives. Malformed documents are left out of the cache and
//! their ids kept in `skipped`.

use chrono::Utc;
use serde_json::Value;

use super::{parse_snapshot, Filter, Item, ItemType, ListView, Location, NewItem};
use crate::store::{CollectionPath, Document, ItemStore, Snapshot, StoreError, Subscription};

pub struct Tracker<S: ItemStore> {
    store: S,
    path: CollectionPath,
    owner_id: Option<String>,
    items: Vec<Item>,
    skipped: Vec<String>,
    filter: Filter,
    subscription: Option<Subscription>,
}

impl<S: ItemStore> Tracker<S> {
    pub fn new(store: S, path: CollectionPath, owner_id: Option<String>) -> Self {
        Self {
            store,
            path,
            owner_id,
            items: Vec::new(),
            skipped: Vec::new(),
            filter: Filter::All,
            subscription: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Ids of documents in the last snapshot that could not be parsed
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn is_watching(&self) -> bool {
        self.subscription.is_some()
    }

    /// Grouped view of the cache under the active filter
    pub fn view(&self) -> ListView {
        ListView::build(&self.items, self.filter)
    }

    /// Subscribe to the collection and load its current contents
    pub async fn watch(&mut self) -> Result<(), StoreError> {
        let mut subscription = self.store.subscribe(&self.path).await?;
        let snapshot = subscription.current();
        self.subscription = Some(subscription);
        self.apply_snapshot(&snapshot);
        Ok(())
    }

    /// Ask the store for changes made by other writers. The next `refresh`
    /// picks them up.
    pub async fn sync(&self) {
        if !self.is_watching() {
            return;
        }
        if let Err(e) = self.store.sync(&self.path).await {
            tracing::warn!("Could not sync {}: {}", self.path, e);
        }
    }

    /// Pick up a pending snapshot, if any. Returns true when one was applied.
    pub fn refresh(&mut self) -> bool {
        let snapshot = match self.subscription.as_mut().and_then(|s| s.poll()) {
            Some(snapshot) => snapshot,
            None => return false,
        };
        self.apply_snapshot(&snapshot);
        true
    }

    /// Replace the cache wholesale with every document that parses
    fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        let (items, malformed) = parse_snapshot(snapshot);
        tracing::debug!("Snapshot with {} documents from {}", snapshot.len(), self.path);

        self.skipped = malformed
            .into_iter()
            .map(|e| {
                tracing::error!("Skipping document in {}: {}", self.path, e);
                match e {
                    StoreError::Malformed { id, .. } => id,
                    other => other.to_string(),
                }
            })
            .collect();
        self.items = items;
    }

    /// Release the subscription
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    /// Add an item. Blank names and non-positive quantities are ignored.
    pub async fn add_item(
        &self,
        name: &str,
        quantity: i64,
        location: Location,
        item_type: ItemType,
    ) -> Option<String> {
        let name = name.trim();
        if name.is_empty() || quantity <= 0 {
            tracing::info!("Please enter a valid item name and quantity.");
            return None;
        }
        let quantity = match u32::try_from(quantity) {
            Ok(q) => q,
            Err(_) => {
                tracing::info!("Quantity {} is too large", quantity);
                return None;
            }
        };

        let record = NewItem {
            name: name.to_string(),
            quantity,
            location,
            item_type,
            owner_id: self.owner_id.clone(),
            created_at: Utc::now(),
        };

        let result = match record.to_document() {
            Ok(doc) => self.store.create(&self.path, doc).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(id) => {
                tracing::info!("Added {} x{} to {}", name, quantity, location);
                Some(id)
            }
            Err(e) => {
                tracing::error!("Error adding item: {}", e);
                None
            }
        }
    }

    /// Apply `delta` to a quantity. Results below zero are dropped.
    pub async fn adjust_quantity(&self, id: &str, current_quantity: u32, delta: i64) -> Option<u32> {
        let new_quantity = i64::from(current_quantity) + delta;
        if new_quantity < 0 {
            return None;
        }
        let new_quantity = u32::try_from(new_quantity).ok()?;

        let mut patch = Document::new();
        patch.insert("quantity".to_string(), Value::from(new_quantity));

        match self.store.update(&self.path, id, patch).await {
            Ok(()) => Some(new_quantity),
            Err(e) => {
                tracing::error!("Error updating quantity: {}", e);
                None
            }
        }
    }

    pub async fn remove_item(&self, id: &str) -> bool {
        match self.store.delete(&self.path, id).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Error deleting item: {}", e);
                false
            }
        }
    }
}

impl<S: ItemStore> Drop for Tracker<S> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create(Document),
        Update(String, Document),
        Delete(String),
    }

    /// Records every call; optionally fails them all
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<Call>>,
        fail: bool,
    }

    impl RecordingStore {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                return Err(StoreError::Io(std::io::Error::other("offline")));
            }
            Ok(())
        }
    }

    impl ItemStore for RecordingStore {
        async fn subscribe(&self, _path: &CollectionPath) -> Result<Subscription, StoreError> {
            Err(StoreError::Io(std::io::Error::other("no subscriptions")))
        }

        async fn create(&self, _path: &CollectionPath, record: Document) -> Result<String, StoreError> {
            self.record(Call::Create(record))?;
            Ok("new-id".to_string())
        }

        async fn update(&self, _path: &CollectionPath, id: &str, patch: Document) -> Result<(), StoreError> {
            self.record(Call::Update(id.to_string(), patch))
        }

        async fn delete(&self, _path: &CollectionPath, id: &str) -> Result<(), StoreError> {
            self.record(Call::Delete(id.to_string()))
        }
    }

    fn tracker() -> Tracker<RecordingStore> {
        Tracker::new(RecordingStore::default(), CollectionPath::default(), Some("user-1".into()))
    }

    #[tokio::test]
    async fn test_adjust_below_zero_is_dropped() {
        let tracker = tracker();
        assert_eq!(tracker.adjust_quantity("a", 1, -2).await, None);
        assert!(tracker.store().calls().is_empty());
    }

    #[tokio::test]
    async fn test_adjust_to_zero_updates_once() {
        let tracker = tracker();
        assert_eq!(tracker.adjust_quantity("a", 1, -1).await, Some(0));

        let calls = tracker.store().calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Call::Update(id, patch) => {
                assert_eq!(id, "a");
                assert_eq!(patch.get("quantity"), Some(&Value::from(0)));
                assert_eq!(patch.len(), 1);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_rejects_blank_name_and_zero_quantity() {
        let tracker = tracker();
        assert!(tracker
            .add_item("", 3, Location::PantryCloset, ItemType::PantryItem)
            .await
            .is_none());
        assert!(tracker
            .add_item("   ", 3, Location::PantryCloset, ItemType::PantryItem)
            .await
            .is_none());
        assert!(tracker
            .add_item("Rice", 0, Location::PantryCloset, ItemType::PantryItem)
            .await
            .is_none());
        assert!(tracker.store().calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_creates_one_record() {
        let tracker = tracker();
        let id = tracker
            .add_item(" Rice ", 2, Location::PantryCloset, ItemType::PantryItem)
            .await;
        assert_eq!(id.as_deref(), Some("new-id"));

        let calls = tracker.store().calls();
        assert_eq!(calls.len(), 1);
        let Call::Create(doc) = &calls[0] else {
            panic!("expected create, got {:?}", calls[0]);
        };
        assert_eq!(doc["name"], Value::from("Rice"));
        assert_eq!(doc["quantity"], Value::from(2));
        assert!(doc["quantity"].is_u64());
        assert_eq!(doc["location"], Value::from("Pantry Closet"));
        assert_eq!(doc["type"], Value::from("Pantry Item"));
        assert_eq!(doc["userId"], Value::from("user-1"));
        assert!(doc["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_remove_is_unconditional() {
        let tracker = tracker();
        assert!(tracker.remove_item("whatever").await);
        assert_eq!(tracker.store().calls(), vec![Call::Delete("whatever".into())]);
    }

    #[tokio::test]
    async fn test_store_failures_are_swallowed() {
        let tracker = Tracker::new(RecordingStore::failing(), CollectionPath::default(), None);

        assert!(tracker
            .add_item("Rice", 1, Location::Office, ItemType::Supply)
            .await
            .is_none());
        assert!(tracker.adjust_quantity("a", 3, 1).await.is_none());
        assert!(!tracker.remove_item("a").await);
        assert_eq!(tracker.store().calls().len(), 3);
    }

    #[tokio::test]
    async fn test_watch_fails_cleanly_without_subscription() {
        let mut tracker = tracker();
        assert!(tracker.watch().await.is_err());
        assert!(!tracker.is_watching());
        assert!(!tracker.refresh());
    }

    #[tokio::test]
    async fn test_cache_follows_local_store() {
        let path = CollectionPath::for_app("tracker");
        let mut tracker = Tracker::new(LocalStore::in_memory(), path.clone(), None);
        tracker.watch().await.unwrap();
        assert!(tracker.items().is_empty());

        let id = tracker
            .add_item("Motor oil", 1, Location::Garage, ItemType::Supply)
            .await
            .unwrap();
        tracker
            .add_item("Rice", 2, Location::PantryCloset, ItemType::PantryItem)
            .await
            .unwrap();
        assert!(tracker.refresh());
        assert_eq!(tracker.items().len(), 2);

        tracker.set_filter(Filter::Only(ItemType::Supply));
        let view = tracker.view();
        assert_eq!(view.items().count(), 1);
        assert_eq!(
            view.group(Location::Office).unwrap().placeholder.as_deref(),
            Some("No supply items in this location.")
        );

        tracker.adjust_quantity(&id, 1, -1).await.unwrap();
        assert!(tracker.refresh());
        let oil = tracker.items().iter().find(|i| i.id == id).unwrap();
        assert_eq!(oil.quantity(), 0);

        tracker.remove_item(&id).await;
        assert!(tracker.refresh());
        assert_eq!(tracker.items().len(), 1);

        tracker.close();
        assert_eq!(tracker.store().subscriber_count(&path).await, 0);
    }

    #[tokio::test]
    async fn test_malformed_documents_are_skipped() {
        let path = CollectionPath::for_app("bad");
        let store = LocalStore::in_memory();

        let mut junk = Document::new();
        junk.insert("quantity".to_string(), Value::from(1.5));
        let junk_id = store.create(&path, junk).await.unwrap();

        let mut tracker = Tracker::new(store, path.clone(), None);
        tracker.watch().await.unwrap();
        assert!(tracker.items().is_empty());
        assert_eq!(tracker.skipped().to_vec(), vec![junk_id.clone()]);

        tracker
            .add_item("Salt", 1, Location::PantryCloset, ItemType::PantryItem)
            .await
            .unwrap();
        assert!(tracker.refresh());
        assert_eq!(tracker.items().len(), 1);
        assert_eq!(tracker.items()[0].name(), "Salt");
        assert_eq!(tracker.skipped().to_vec(), vec![junk_id.clone()]);

        // The bad document can still be removed by id
        assert!(tracker.remove_item(&junk_id).await);
        assert!(tracker.refresh());
        assert!(tracker.skipped().is_empty());
        assert_eq!(tracker.items().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_picks_up_other_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = CollectionPath::for_app("shared");

        let mut tracker = Tracker::new(LocalStore::open(dir.path()).unwrap(), path.clone(), None);
        tracker.watch().await.unwrap();

        let other = Tracker::new(LocalStore::open(dir.path()).unwrap(), path, None);
        other
            .add_item("Candles", 6, Location::Office, ItemType::Supply)
            .await
            .unwrap();

        assert!(!tracker.refresh());
        tracker.sync().await;
        assert!(tracker.refresh());
        assert_eq!(tracker.items().len(), 1);
        assert_eq!(tracker.items()[0].name(), "Candles");
    }
}
