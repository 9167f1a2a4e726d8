//! In-process Item Store, optionally persisted as JSON files
//!
//! Each collection lives in memory next to a `watch` channel that carries
//! its full contents. When opened on a directory, the file at
//! `<root>/<collection path>.json` is the source of truth: every mutation
//! re-reads it under an exclusive lock on `<file>.lock`, applies the change
//! to that copy, and replaces the file before memory is touched. `sync`
//! reloads a collection when another process has rewritten the file.
//!
//! File access is synchronous and happens while the collection map is
//! locked, so a read-modify-write is never interleaved within a process.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::{watch, Mutex};

use super::{
    CollectionPath, Document, ItemStore, Snapshot, StoreError, StoredDocument, Subscription,
};

type Docs = BTreeMap<String, Document>;

/// Modification time and length of a collection file
type Fingerprint = (SystemTime, u64);

struct Collection {
    docs: Docs,
    tx: watch::Sender<Snapshot>,
    /// File state `docs` was last read from or written to
    seen: Option<Fingerprint>,
}

impl Collection {
    fn new(docs: Docs, seen: Option<Fingerprint>) -> Self {
        let (tx, _) = watch::channel(Self::snapshot_of(&docs));
        Self { docs, tx, seen }
    }

    fn snapshot_of(docs: &Docs) -> Snapshot {
        Snapshot {
            docs: docs
                .iter()
                .map(|(id, data)| StoredDocument {
                    id: id.clone(),
                    data: data.clone(),
                })
                .collect(),
        }
    }

    /// Replace the contents and notify subscribers if anything changed
    fn replace(&mut self, docs: Docs) -> bool {
        if docs == self.docs {
            return false;
        }
        self.docs = docs;
        // send_replace never fails, even with no receivers
        self.tx.send_replace(Self::snapshot_of(&self.docs));
        true
    }
}

pub struct LocalStore {
    root: Option<PathBuf>,
    collections: Mutex<HashMap<CollectionPath, Collection>>,
}

impl LocalStore {
    /// Store that forgets everything on exit
    pub fn in_memory() -> Self {
        Self {
            root: None,
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Store persisted under `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::info!("Opened local item store at {}", root.display());
        Ok(Self {
            root: Some(root),
            collections: Mutex::new(HashMap::new()),
        })
    }

    /// Number of live subscriptions on a collection
    pub async fn subscriber_count(&self, path: &CollectionPath) -> usize {
        self.collections
            .lock()
            .await
            .get(path)
            .map(|c| c.tx.receiver_count())
            .unwrap_or(0)
    }

    fn file_for(&self, path: &CollectionPath) -> Option<PathBuf> {
        self.root
            .as_ref()
            .map(|root| root.join(format!("{}.json", path.as_str())))
    }

    fn fingerprint(file: &Path) -> Option<Fingerprint> {
        let meta = fs::metadata(file).ok()?;
        Some((meta.modified().ok()?, meta.len()))
    }

    /// A missing file is an empty collection
    fn read_docs(file: &Path) -> Result<Docs, StoreError> {
        if !file.exists() {
            return Ok(Docs::new());
        }
        let content = fs::read_to_string(file)?;
        let docs: Docs = serde_json::from_str(&content)?;
        tracing::debug!("Loaded {} documents from {}", docs.len(), file.display());
        Ok(docs)
    }

    /// Write to a sibling temp file and rename it over the collection, so
    /// readers never see a half-written file
    fn write_docs(file: &Path, docs: &Docs) -> Result<(), StoreError> {
        let tmp = Self::sibling(file, "tmp");
        let content = serde_json::to_string_pretty(docs)?;
        if let Err(e) = fs::write(&tmp, content).and_then(|()| fs::rename(&tmp, file)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn sibling(file: &Path, suffix: &str) -> PathBuf {
        let mut name = file.as_os_str().to_owned();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }

    fn open_lock(file: &Path) -> Result<fd_lock::RwLock<File>, StoreError> {
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(Self::sibling(file, "lock"))?;
        Ok(fd_lock::RwLock::new(lock_file))
    }

    /// Run `f` against a collection, loading it first if needed
    async fn with_collection<T>(
        &self,
        path: &CollectionPath,
        f: impl FnOnce(&mut Collection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut collections = self.collections.lock().await;
        let collection = match collections.entry(path.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let (docs, seen) = match self.file_for(path) {
                    Some(file) => {
                        let seen = Self::fingerprint(&file);
                        (Self::read_docs(&file)?, seen)
                    }
                    None => (Docs::new(), None),
                };
                entry.insert(Collection::new(docs, seen))
            }
        };
        f(collection)
    }

    /// Read-modify-write. `change` works on a fresh copy of the collection
    /// and returns whether it modified it. Memory is only updated after the
    /// copy has been saved.
    async fn mutate<T>(
        &self,
        path: &CollectionPath,
        change: impl FnOnce(&mut Docs) -> Result<(T, bool), StoreError>,
    ) -> Result<T, StoreError> {
        let file = self.file_for(path);
        self.with_collection(path, |c| {
            let Some(file) = file else {
                let mut docs = c.docs.clone();
                let (out, changed) = change(&mut docs)?;
                if changed {
                    c.replace(docs);
                }
                return Ok(out);
            };

            let mut lock = Self::open_lock(&file)?;
            let _guard = lock.write()?;

            let mut docs = Self::read_docs(&file)?;
            let (out, changed) = change(&mut docs)?;
            if changed {
                Self::write_docs(&file, &docs)?;
            }
            c.seen = Self::fingerprint(&file);
            c.replace(docs);
            Ok(out)
        })
        .await
    }
}

impl ItemStore for LocalStore {
    async fn subscribe(&self, path: &CollectionPath) -> Result<Subscription, StoreError> {
        let rx = self
            .with_collection(path, |c| Ok(c.tx.subscribe()))
            .await?;
        tracing::debug!("Subscribed to {}", path);
        Ok(Subscription::new(path.clone(), rx))
    }

    async fn create(&self, path: &CollectionPath, record: Document) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.mutate(path, |docs| {
            docs.insert(id.clone(), record);
            Ok(((), true))
        })
        .await?;
        tracing::debug!("Created {} in {}", id, path);
        Ok(id)
    }

    async fn update(&self, path: &CollectionPath, id: &str, patch: Document) -> Result<(), StoreError> {
        self.mutate(path, |docs| {
            let doc = docs
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
            doc.extend(patch);
            Ok(((), true))
        })
        .await
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), StoreError> {
        self.mutate(path, |docs| Ok(((), docs.remove(id).is_some())))
            .await
    }

    /// Reload a loaded collection whose file changed since we last saw it
    async fn sync(&self, path: &CollectionPath) -> Result<(), StoreError> {
        let Some(file) = self.file_for(path) else {
            return Ok(());
        };
        let mut collections = self.collections.lock().await;
        let Some(c) = collections.get_mut(path) else {
            return Ok(());
        };

        let seen = Self::fingerprint(&file);
        if seen == c.seen {
            return Ok(());
        }
        let docs = Self::read_docs(&file)?;
        c.seen = seen;
        if c.replace(docs) {
            tracing::debug!("{} changed on disk, reloaded", file.display());
        }
        Ok(())
    }
}
