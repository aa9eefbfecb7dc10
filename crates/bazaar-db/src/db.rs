//! Document store handle and query execution.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::aggregate::Group;
use crate::document::{lookup, Document};
use crate::filter::Filter;
use crate::options::FindOptions;
use crate::DbError;

/// Documents of one collection keyed by `_id`.
type Collection = BTreeMap<String, Value>;

/// Embedded JSON document store.
///
/// Collections live in memory. When opened on a directory, every mutated
/// collection is written back to `<dir>/<collection>.json`. Cloning the
/// handle is cheap and shares the same data.
#[derive(Clone)]
pub struct Db {
    inner: Arc<Inner>,
}

struct Inner {
    collections: RwLock<HashMap<String, Collection>>,
    data_dir: Option<PathBuf>,
}

impl Db {
    /// Create an empty, non-persistent store.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                data_dir: None,
            }),
        }
    }

    /// Open a store persisted in `dir`, loading any existing collections.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let db = Db::open("./data").await?;
    /// ```
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, DbError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DbError::OpenError(format!("{}: {}", dir.display(), e)))?;

        let mut collections = HashMap::new();
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| DbError::OpenError(format!("{}: {}", dir.display(), e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DbError::OpenError(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };

            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| DbError::OpenError(format!("{}: {}", path.display(), e)))?;
            let docs: Vec<Value> = serde_json::from_slice(&bytes)
                .map_err(|e| DbError::OpenError(format!("{}: {}", path.display(), e)))?;

            let mut collection = Collection::new();
            for doc in docs {
                let id = document_id(&name, &doc)?;
                collection.insert(id, doc);
            }
            debug!(collection = %name, documents = collection.len(), "Loaded collection");
            collections.insert(name, collection);
        }

        info!(dir = %dir.display(), collections = collections.len(), "Opened document store");

        Ok(Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(collections),
                data_dir: Some(dir),
            }),
        })
    }

    /// The persistence directory, if any.
    pub fn data_dir(&self) -> Option<&Path> {
        self.inner.data_dir.as_deref()
    }

    /// Insert a new document.
    ///
    /// Fails if the id already exists or a unique key is violated.
    pub async fn insert<T: Document>(&self, doc: &T) -> Result<(), DbError> {
        let value = to_document(doc)?;
        let mut collections = self.inner.collections.write().await;
        let collection = collections.entry(T::COLLECTION.to_string()).or_default();

        if collection.contains_key(doc.id()) {
            return Err(DbError::DuplicateId {
                collection: T::COLLECTION.to_string(),
                id: doc.id().to_string(),
            });
        }
        check_unique::<T>(collection, &value, None)?;

        collection.insert(doc.id().to_string(), value);
        if let Err(e) = self.persist(T::COLLECTION, collection).await {
            collection.remove(doc.id());
            return Err(e);
        }
        Ok(())
    }

    /// Fetch a document by id.
    pub async fn find_by_id<T: Document>(&self, id: &str) -> Result<Option<T>, DbError> {
        let collections = self.inner.collections.read().await;
        match collections.get(T::COLLECTION).and_then(|c| c.get(id)) {
            Some(value) => Ok(Some(from_document(value)?)),
            None => Ok(None),
        }
    }

    /// Fetch the first document matching the filter, in id order.
    pub async fn find_one<T: Document>(&self, filter: &Filter) -> Result<Option<T>, DbError> {
        let collections = self.inner.collections.read().await;
        let found = collections
            .get(T::COLLECTION)
            .and_then(|c| c.values().find(|doc| filter.matches(doc)));
        match found {
            Some(value) => Ok(Some(from_document(value)?)),
            None => Ok(None),
        }
    }

    /// Fetch every document matching the filter, then sort, skip and limit.
    pub async fn find<T: Document>(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<T>, DbError> {
        let collections = self.inner.collections.read().await;
        let Some(collection) = collections.get(T::COLLECTION) else {
            return Ok(Vec::new());
        };
        let matched: Vec<&Value> = collection.values().filter(|doc| filter.matches(doc)).collect();
        options
            .apply(matched)
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// Count documents matching the filter.
    pub async fn count<T: Document>(&self, filter: &Filter) -> Result<usize, DbError> {
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(T::COLLECTION)
            .map(|c| c.values().filter(|doc| filter.matches(doc)).count())
            .unwrap_or(0))
    }

    /// Whether any document matches the filter.
    pub async fn exists<T: Document>(&self, filter: &Filter) -> Result<bool, DbError> {
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(T::COLLECTION)
            .is_some_and(|c| c.values().any(|doc| filter.matches(doc))))
    }

    /// Replace an existing document with the same id.
    ///
    /// Returns `false` if no such document exists.
    pub async fn replace<T: Document>(&self, doc: &T) -> Result<bool, DbError> {
        let value = to_document(doc)?;
        let mut collections = self.inner.collections.write().await;
        let Some(collection) = collections.get_mut(T::COLLECTION) else {
            return Ok(false);
        };
        if !collection.contains_key(doc.id()) {
            return Ok(false);
        }
        check_unique::<T>(collection, &value, Some(doc.id()))?;

        let previous = collection.insert(doc.id().to_string(), value);
        if let Err(e) = self.persist(T::COLLECTION, collection).await {
            restore(collection, doc.id(), previous);
            return Err(e);
        }
        Ok(true)
    }

    /// Atomically read, modify and write back one document.
    ///
    /// The closure runs under the collection write lock. If it returns an
    /// error, or the write to disk fails, the stored document is left as it
    /// was. Returns `Ok(None)` when the id is unknown.
    pub async fn update<T, R, E, F>(&self, id: &str, f: F) -> Result<Option<R>, E>
    where
        T: Document,
        E: From<DbError>,
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        let mut collections = self.inner.collections.write().await;
        self.update_locked::<T, R, E, F>(&mut collections, id, f).await
    }

    /// Group the documents of `S` matching `filter` and hand the result to
    /// `f` while it updates document `id` of `T`.
    ///
    /// Both steps run under one write lock, so no write to either collection
    /// can land between the read and the update.
    pub async fn update_with_aggregate<S, T, R, E, F>(
        &self,
        filter: &Filter,
        group: &Group,
        id: &str,
        f: F,
    ) -> Result<Option<R>, E>
    where
        S: Document,
        T: Document,
        E: From<DbError>,
        F: FnOnce(&mut T, Option<Map<String, Value>>) -> Result<R, E>,
    {
        let mut collections = self.inner.collections.write().await;
        let grouped = {
            let matched: Vec<&Value> = collections
                .get(S::COLLECTION)
                .map(|c| c.values().filter(|doc| filter.matches(doc)).collect())
                .unwrap_or_default();
            group.apply(&matched)
        };
        self.update_locked::<T, R, E, _>(&mut collections, id, |doc| f(doc, grouped))
            .await
    }

    async fn update_locked<T, R, E, F>(
        &self,
        collections: &mut HashMap<String, Collection>,
        id: &str,
        f: F,
    ) -> Result<Option<R>, E>
    where
        T: Document,
        E: From<DbError>,
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        let Some(collection) = collections.get_mut(T::COLLECTION) else {
            return Ok(None);
        };
        let Some(current) = collection.get(id) else {
            return Ok(None);
        };

        let mut doc: T = from_document(current)?;
        let out = f(&mut doc)?;

        if doc.id() != id {
            return Err(DbError::MalformedDocument {
                collection: T::COLLECTION.to_string(),
                reason: format!("update changed id {} to {}", id, doc.id()),
            }
            .into());
        }
        let value = to_document(&doc)?;
        check_unique::<T>(collection, &value, Some(id))?;

        let previous = collection.insert(id.to_string(), value);
        if let Err(e) = self.persist(T::COLLECTION, collection).await {
            restore(collection, id, previous);
            return Err(e.into());
        }
        Ok(Some(out))
    }

    /// Delete a document by id. Returns whether it existed.
    pub async fn delete_by_id<T: Document>(&self, id: &str) -> Result<bool, DbError> {
        let mut collections = self.inner.collections.write().await;
        let Some(collection) = collections.get_mut(T::COLLECTION) else {
            return Ok(false);
        };
        let Some(removed) = collection.remove(id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(T::COLLECTION, collection).await {
            collection.insert(id.to_string(), removed);
            return Err(e);
        }
        Ok(true)
    }

    /// Delete every document matching the filter. Returns the number removed.
    pub async fn delete_many<T: Document>(&self, filter: &Filter) -> Result<usize, DbError> {
        let mut collections = self.inner.collections.write().await;
        let Some(collection) = collections.get_mut(T::COLLECTION) else {
            return Ok(0);
        };
        let ids: Vec<String> = collection
            .iter()
            .filter(|(_, doc)| filter.matches(doc))
            .map(|(id, _)| id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let removed: Vec<(String, Value)> = ids
            .into_iter()
            .filter_map(|id| collection.remove(&id).map(|doc| (id, doc)))
            .collect();
        if let Err(e) = self.persist(T::COLLECTION, collection).await {
            collection.extend(removed);
            return Err(e);
        }
        Ok(removed.len())
    }

    /// Group every document matching the filter into one output object.
    ///
    /// Returns `None` when nothing matches.
    pub async fn aggregate<T: Document>(
        &self,
        filter: &Filter,
        group: &Group,
    ) -> Result<Option<Map<String, Value>>, DbError> {
        let collections = self.inner.collections.read().await;
        let matched: Vec<&Value> = collections
            .get(T::COLLECTION)
            .map(|c| c.values().filter(|doc| filter.matches(doc)).collect())
            .unwrap_or_default();
        Ok(group.apply(&matched))
    }

    /// Write a collection back to disk (temp file, then rename).
    async fn persist(&self, name: &str, collection: &Collection) -> Result<(), DbError> {
        let Some(dir) = &self.inner.data_dir else {
            return Ok(());
        };

        let persist_err = |reason: String| DbError::PersistError {
            collection: name.to_string(),
            reason,
        };

        let docs: Vec<&Value> = collection.values().collect();
        let bytes = serde_json::to_vec_pretty(&docs)?;
        let path = dir.join(format!("{}.json", name));
        let tmp = dir.join(format!("{}.json.tmp", name));

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| persist_err(e.to_string()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            warn!(collection = name, error = %e, "Failed to move collection file into place");
            return Err(persist_err(e.to_string()));
        }

        debug!(collection = name, documents = docs.len(), "Persisted collection");
        Ok(())
    }
}

/// Put back what a failed write replaced.
fn restore(collection: &mut Collection, id: &str, previous: Option<Value>) {
    match previous {
        Some(value) => {
            collection.insert(id.to_string(), value);
        }
        None => {
            collection.remove(id);
        }
    }
}

/// Serialize a document and check it carries a matching `_id`.
fn to_document<T: Document>(doc: &T) -> Result<Value, DbError> {
    let value = serde_json::to_value(doc)?;
    let stored_id = document_id(T::COLLECTION, &value)?;
    if stored_id != doc.id() {
        return Err(DbError::MalformedDocument {
            collection: T::COLLECTION.to_string(),
            reason: format!("_id {} does not match id {}", stored_id, doc.id()),
        });
    }
    Ok(value)
}

fn from_document<T: Document>(value: &Value) -> Result<T, DbError> {
    serde_json::from_value(value.clone()).map_err(|e| DbError::SerializeError(e.to_string()))
}

fn document_id(collection: &str, value: &Value) -> Result<String, DbError> {
    if !value.is_object() {
        return Err(DbError::MalformedDocument {
            collection: collection.to_string(),
            reason: "document is not an object".to_string(),
        });
    }
    value
        .get("_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DbError::MalformedDocument {
            collection: collection.to_string(),
            reason: "missing string _id".to_string(),
        })
}

/// Enforce the document type's unique keys against the other documents.
fn check_unique<T: Document>(
    collection: &Collection,
    value: &Value,
    exclude_id: Option<&str>,
) -> Result<(), DbError> {
    for group in T::unique_keys() {
        let key: Vec<Option<&Value>> = group
            .iter()
            .map(|field| lookup(value, field).filter(|v| !v.is_null()))
            .collect();
        if key.iter().all(Option::is_none) {
            continue;
        }

        let clash = collection.iter().any(|(id, other)| {
            Some(id.as_str()) != exclude_id
                && group
                    .iter()
                    .zip(&key)
                    .all(|(field, mine)| lookup(other, field).filter(|v| !v.is_null()) == *mine)
        });
        if clash {
            return Err(DbError::DuplicateKey {
                collection: T::COLLECTION.to_string(),
                fields: group.join(", "),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Group;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        #[serde(rename = "_id")]
        id: String,
        sku: String,
        owner: Option<String>,
        stock: i64,
    }

    impl Document for Item {
        const COLLECTION: &'static str = "items";

        fn id(&self) -> &str {
            &self.id
        }

        fn unique_keys() -> &'static [&'static [&'static str]] {
            &[&["sku"]]
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Vote {
        #[serde(rename = "_id")]
        id: String,
        user: String,
        target: String,
    }

    impl Document for Vote {
        const COLLECTION: &'static str = "votes";

        fn id(&self) -> &str {
            &self.id
        }

        fn unique_keys() -> &'static [&'static [&'static str]] {
            &[&["user", "target"]]
        }
    }

    fn item(id: &str, sku: &str, stock: i64) -> Item {
        Item {
            id: id.to_string(),
            sku: sku.to_string(),
            owner: None,
            stock,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = Db::in_memory();
        db.insert(&item("a", "SKU-A", 3)).await.unwrap();
        db.insert(&item("b", "SKU-B", 0)).await.unwrap();

        let found: Option<Item> = db.find_by_id("a").await.unwrap();
        assert_eq!(found.unwrap().sku, "SKU-A");

        let in_stock: Vec<Item> = db
            .find(&Filter::new().gt("stock", 0), &FindOptions::new())
            .await
            .unwrap();
        assert_eq!(in_stock.len(), 1);
        assert_eq!(db.count::<Item>(&Filter::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unique_key_violation() {
        let db = Db::in_memory();
        db.insert(&item("a", "SKU-A", 3)).await.unwrap();

        let err = db.insert(&item("b", "SKU-A", 1)).await.unwrap_err();
        assert!(err.is_duplicate());

        let err = db.insert(&item("a", "SKU-Z", 1)).await.unwrap_err();
        assert!(matches!(err, DbError::DuplicateId { .. }));
    }

    #[tokio::test]
    async fn test_compound_unique_key() {
        let db = Db::in_memory();
        let vote = |id: &str, user: &str, target: &str| Vote {
            id: id.into(),
            user: user.into(),
            target: target.into(),
        };
        db.insert(&vote("1", "u1", "p1")).await.unwrap();
        db.insert(&vote("2", "u1", "p2")).await.unwrap();
        db.insert(&vote("3", "u2", "p1")).await.unwrap();
        assert!(db.insert(&vote("4", "u1", "p1")).await.is_err());
    }

    #[tokio::test]
    async fn test_replace_checks_unique_excluding_self() {
        let db = Db::in_memory();
        db.insert(&item("a", "SKU-A", 3)).await.unwrap();
        db.insert(&item("b", "SKU-B", 3)).await.unwrap();

        let mut a = item("a", "SKU-A", 10);
        assert!(db.replace(&a).await.unwrap());

        a.sku = "SKU-B".into();
        assert!(db.replace(&a).await.is_err());

        assert!(!db.replace(&item("zzz", "SKU-Q", 1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_is_all_or_nothing() {
        let db = Db::in_memory();
        db.insert(&item("a", "SKU-A", 3)).await.unwrap();

        let result: Result<Option<()>, DbError> = db
            .update::<Item, _, _, _>("a", |doc| {
                doc.stock -= 5;
                if doc.stock < 0 {
                    return Err(DbError::SerializeError("insufficient".into()));
                }
                Ok(())
            })
            .await;
        assert!(result.is_err());

        let unchanged: Item = db.find_by_id("a").await.unwrap().unwrap();
        assert_eq!(unchanged.stock, 3);

        let left = db
            .update::<Item, _, DbError, _>("a", |doc| {
                doc.stock -= 2;
                Ok(doc.stock)
            })
            .await
            .unwrap();
        assert_eq!(left, Some(1));

        let missing = db
            .update::<Item, _, DbError, _>("nope", |_| Ok(()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_and_aggregate() {
        let db = Db::in_memory();
        let mut owned = item("a", "SKU-A", 4);
        owned.owner = Some("s1".into());
        db.insert(&owned).await.unwrap();
        let mut other = item("b", "SKU-B", 6);
        other.owner = Some("s1".into());
        db.insert(&other).await.unwrap();
        db.insert(&item("c", "SKU-C", 100)).await.unwrap();

        let stats = db
            .aggregate::<Item>(
                &Filter::new().eq("owner", "s1"),
                &Group::new().count("n").sum("stock", "stock"),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats["n"], 2);
        assert_eq!(stats["stock"], 10);

        assert_eq!(db.delete_many::<Item>(&Filter::new().eq("owner", "s1")).await.unwrap(), 2);
        assert!(db.delete_by_id::<Item>("c").await.unwrap());
        assert!(!db.delete_by_id::<Item>("c").await.unwrap());
        assert!(db
            .aggregate::<Item>(&Filter::new(), &Group::new().count("n"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = Db::open(dir.path()).await.unwrap();
            db.insert(&item("a", "SKU-A", 3)).await.unwrap();
            db.insert(&item("b", "SKU-B", 5)).await.unwrap();
            db.delete_by_id::<Item>("b").await.unwrap();
        }
        assert!(dir.path().join("items.json").exists());

        let reopened = Db::open(dir.path()).await.unwrap();
        let all: Vec<Item> = reopened.find(&Filter::new(), &FindOptions::new()).await.unwrap();
        assert_eq!(all, vec![item("a", "SKU-A", 3)]);
        assert!(reopened.insert(&item("c", "SKU-A", 1)).await.is_err());
    }

    /// Puts a directory with content where the collection file lives, so the
    /// rename at the end of every write fails.
    fn block_collection_file(dir: &Path) {
        let path = dir.join("items.json");
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::open(dir.path()).await.unwrap();
        db.insert(&item("a", "SKU-A", 3)).await.unwrap();
        db.insert(&item("b", "SKU-B", 5)).await.unwrap();
        block_collection_file(dir.path());

        let err = db.insert(&item("c", "SKU-C", 1)).await.unwrap_err();
        assert!(matches!(err, DbError::PersistError { .. }));
        assert!(db.find_by_id::<Item>("c").await.unwrap().is_none());

        assert!(db.replace(&item("a", "SKU-A", 99)).await.is_err());
        let a: Item = db.find_by_id("a").await.unwrap().unwrap();
        assert_eq!(a.stock, 3);

        let updated = db
            .update::<Item, _, DbError, _>("a", |doc| {
                doc.stock = 0;
                Ok(())
            })
            .await;
        assert!(updated.is_err());
        let a: Item = db.find_by_id("a").await.unwrap().unwrap();
        assert_eq!(a.stock, 3);

        assert!(db.delete_by_id::<Item>("a").await.is_err());
        assert!(db.delete_many::<Item>(&Filter::new()).await.is_err());
        assert_eq!(db.count::<Item>(&Filter::new()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_with_aggregate() {
        let db = Db::in_memory();
        let vote = |id: &str, target: &str| Vote {
            id: id.into(),
            user: format!("u-{}", id),
            target: target.into(),
        };
        db.insert(&item("p1", "SKU-1", 0)).await.unwrap();
        db.insert(&vote("1", "p1")).await.unwrap();
        db.insert(&vote("2", "p1")).await.unwrap();
        db.insert(&vote("3", "p2")).await.unwrap();

        let total = db
            .update_with_aggregate::<Vote, Item, _, DbError, _>(
                &Filter::new().eq("target", "p1"),
                &Group::new().count("n"),
                "p1",
                |doc, grouped| {
                    doc.stock = grouped.and_then(|g| g["n"].as_i64()).unwrap_or(0);
                    Ok(doc.stock)
                },
            )
            .await
            .unwrap();
        assert_eq!(total, Some(2));

        let none = db
            .update_with_aggregate::<Vote, Item, _, DbError, _>(
                &Filter::new().eq("target", "p9"),
                &Group::new().count("n"),
                "p1",
                |doc, grouped| {
                    assert!(grouped.is_none());
                    doc.stock = 0;
                    Ok(())
                },
            )
            .await
            .unwrap();
        assert!(none.is_some());
        let p1: Item = db.find_by_id("p1").await.unwrap().unwrap();
        assert_eq!(p1.stock, 0);
    }
}
