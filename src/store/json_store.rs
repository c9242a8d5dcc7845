// JSON file article store
// Every operation reads the whole document; every mutation rewrites it

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::sync::RwLock;

use super::article::{next_id, Article, ArticleFields};
use super::error::StoreError;

/// Article collection persisted as a pretty-printed JSON array
///
/// The lock serializes mutations (read, modify and write happen under one
/// write guard) and keeps listings from observing a write in progress.
pub struct ArticleStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl ArticleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// Path of the backing JSON document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All articles in insertion order; a missing file is an empty collection
    pub async fn list(&self) -> Result<Vec<Article>, StoreError> {
        let _guard = self.lock.read().await;
        self.load().await
    }

    /// Append a new article with the next id and the current timestamp
    pub async fn create(&self, fields: ArticleFields) -> Result<Article, StoreError> {
        let _guard = self.lock.write().await;
        let mut articles = self.load().await?;

        let article = Article::new(next_id(&articles)?, fields);
        articles.push(article.clone());

        self.save(&articles).await?;
        Ok(article)
    }

    /// Replace title and content of an existing article and stamp `updatedAt`
    pub async fn update(&self, id: u64, fields: ArticleFields) -> Result<Article, StoreError> {
        let _guard = self.lock.write().await;
        let mut articles = self.load().await?;

        let article = articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound(id))?;
        article.apply(fields);
        let updated = article.clone();

        self.save(&articles).await?;
        Ok(updated)
    }

    /// Remove an article; ids of the remaining articles are untouched
    pub async fn delete(&self, id: u64) -> Result<Article, StoreError> {
        let _guard = self.lock.write().await;
        let mut articles = self.load().await?;

        let index = articles
            .iter()
            .position(|a| a.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let removed = articles.remove(index);

        self.save(&articles).await?;
        Ok(removed)
    }

    /// Read and parse the document. Callers must hold the lock.
    async fn load(&self) -> Result<Vec<Article>, StoreError> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::StorageRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&data).map_err(|source| StoreError::StorageCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Write the whole collection through a sibling temp file and rename it
    /// over the target. Callers must hold the write lock.
    ///
    /// Directory creation, write and rename run as one blocking task, so a
    /// caller dropped mid-save cannot leave a half-written temp file for the
    /// next writer to pick up.
    async fn save(&self, articles: &[Article]) -> Result<(), StoreError> {
        let write_err = |source: io::Error| StoreError::StorageWrite {
            path: self.path.clone(),
            source,
        };

        let json = serde_json::to_string_pretty(articles).map_err(|e| write_err(e.into()))?;
        let path = self.path.clone();
        let tmp_path = self.temp_path();

        tokio::task::spawn_blocking(move || write_atomically(&path, &tmp_path, json.as_bytes()))
            .await
            .map_err(|e| write_err(io::Error::other(e)))?
            .map_err(write_err)
    }

    /// A temp file name unique to this process and save
    fn temp_path(&self) -> PathBuf {
        static SEQ: AtomicU64 = AtomicU64::new(0);

        let mut name = self
            .path
            .file_name()
            .map(ToOwned::to_owned)
            .unwrap_or_default();
        name.push(format!(
            ".{}.{}.tmp",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        self.path.with_file_name(name)
    }
}

fn write_atomically(path: &Path, tmp_path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(tmp_path, data)?;
    std::fs::rename(tmp_path, path).inspect_err(|_| {
        let _ = std::fs::remove_file(tmp_path);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fields(title: &str, content: &str) -> ArticleFields {
        ArticleFields::new(Some(title.to_string()), Some(content.to_string())).unwrap()
    }

    fn temp_store() -> (TempDir, ArticleStore) {
        let dir = TempDir::new().unwrap();
        let store = ArticleStore::new(dir.path().join("articles.json"));
        (dir, store)
    }

    #[tokio::test]
    async fn test_list_missing_file_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.list().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_list_corrupt_file() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "{ not json").unwrap();

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, StoreError::StorageCorrupt { .. }));
    }

    #[tokio::test]
    async fn test_list_wrong_shape_is_corrupt() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), r#"{"id": 1}"#).unwrap();

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, StoreError::StorageCorrupt { .. }));
    }

    #[tokio::test]
    async fn test_create_list_delete_example() {
        let (_dir, store) = temp_store();

        let first = store.create(fields("Hi", "World")).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.title, "Hi");
        assert_eq!(first.content, "World");
        assert!(!first.timestamp.is_empty());
        assert!(first.updated_at.is_none());

        let second = store.create(fields("A", "B")).await.unwrap();
        assert_eq!(second.id, 2);

        store.delete(1).await.unwrap();
        let remaining = store.list().await.unwrap();
        assert_eq!(remaining, vec![second]);
    }

    #[tokio::test]
    async fn test_create_assigns_greater_id_and_appends() {
        let (_dir, store) = temp_store();
        store.create(fields("one", "1")).await.unwrap();
        store.create(fields("two", "2")).await.unwrap();
        let before = store.list().await.unwrap();

        let created = store.create(fields("three", "3")).await.unwrap();
        let after = store.list().await.unwrap();

        assert_eq!(after.len(), before.len() + 1);
        assert!(before.iter().all(|a| a.id < created.id));
        assert_eq!(after.last(), Some(&created));
        assert_eq!(&after[..before.len()], &before[..]);
    }

    #[tokio::test]
    async fn test_update_preserves_id_and_timestamp() {
        let (_dir, store) = temp_store();
        let created = store.create(fields("Hi", "World")).await.unwrap();

        let updated = store.update(created.id, fields("t2", "c2")).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.timestamp, created.timestamp);
        assert_eq!(updated.title, "t2");
        assert_eq!(updated.content, "c2");
        assert!(updated.updated_at.is_some());

        let listed = store.list().await.unwrap();
        assert_eq!(listed, vec![updated]);
    }

    #[tokio::test]
    async fn test_update_keeps_unknown_fields() {
        let (_dir, store) = temp_store();
        std::fs::write(
            store.path(),
            r#"[{"id":9,"title":"t","content":"c","timestamp":"2024-05-01T00:00:00.000Z","author":"sam"}]"#,
        )
        .unwrap();

        store.update(9, fields("new", "body")).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw[0]["author"], "sam");
        assert_eq!(raw[0]["timestamp"], "2024-05-01T00:00:00.000Z");
        assert_eq!(raw[0]["title"], "new");
    }

    #[tokio::test]
    async fn test_missing_id_leaves_collection_unchanged() {
        let (_dir, store) = temp_store();
        store.create(fields("Hi", "World")).await.unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        let err = store.update(42, fields("x", "y")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
        let err = store.delete(42).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));

        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_update_and_delete_without_file_are_not_found() {
        let (_dir, store) = temp_store();
        assert!(matches!(
            store.update(1, fields("x", "y")).await,
            Err(StoreError::NotFound(1))
        ));
        assert!(matches!(store.delete(1).await, Err(StoreError::NotFound(1))));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_delete_leaves_other_records_untouched() {
        let (_dir, store) = temp_store();
        let a = store.create(fields("a", "1")).await.unwrap();
        let b = store.create(fields("b", "2")).await.unwrap();
        let c = store.create(fields("c", "3")).await.unwrap();

        let removed = store.delete(b.id).await.unwrap();
        assert_eq!(removed, b);
        assert_eq!(store.list().await.unwrap(), vec![a, c]);
    }

    #[tokio::test]
    async fn test_id_follows_max_after_delete() {
        let (_dir, store) = temp_store();
        store.create(fields("a", "1")).await.unwrap();
        store.create(fields("b", "2")).await.unwrap();
        store.create(fields("c", "3")).await.unwrap();
        store.delete(1).await.unwrap();

        let created = store.create(fields("d", "4")).await.unwrap();
        assert_eq!(created.id, 4);
    }

    #[tokio::test]
    async fn test_persisted_format_is_pretty_json() {
        let (_dir, store) = temp_store();
        store.create(fields("Hi", "World")).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.starts_with("[\n  {\n    \"id\": 1,"));
    }

    #[tokio::test]
    async fn test_saves_leave_no_temp_files() {
        let (dir, store) = temp_store();
        store.create(fields("a", "1")).await.unwrap();
        store.create(fields("b", "2")).await.unwrap();
        store.delete(1).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("articles.json")]);
    }

    #[test]
    fn test_temp_paths_are_unique_siblings() {
        let store = ArticleStore::new("/data/articles.json");
        let first = store.temp_path();
        let second = store.temp_path();

        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(Path::new("/data")));
        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("articles.json."));
        assert!(name.ends_with(".tmp"));
    }

    #[tokio::test]
    async fn test_create_makes_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = ArticleStore::new(dir.path().join("data").join("articles.json"));
        store.create(fields("Hi", "World")).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_create_on_corrupt_file_does_not_overwrite() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "garbage").unwrap();

        let err = store.create(fields("Hi", "World")).await.unwrap_err();
        assert!(matches!(err, StoreError::StorageCorrupt { .. }));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "garbage");
    }

    #[tokio::test]
    async fn test_create_after_max_id_fails_without_writing() {
        let (_dir, store) = temp_store();
        let raw = format!(
            r#"[{{"id":{},"title":"t","content":"c","timestamp":"2024-05-01T00:00:00.000Z"}}]"#,
            u64::MAX
        );
        std::fs::write(store.path(), &raw).unwrap();

        let err = store.create(fields("Hi", "World")).await.unwrap_err();
        assert!(matches!(err, StoreError::IdsExhausted(u64::MAX)));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), raw);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        // A regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let store = ArticleStore::new(blocker.join("articles.json"));

        let err = store.create(fields("Hi", "World")).await.unwrap_err();
        assert!(matches!(err, StoreError::StorageWrite { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_get_distinct_ids() {
        let (_dir, store) = temp_store();
        let store = Arc::new(store);

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .create(fields(&format!("title {i}"), "body"))
                        .await
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=20).collect::<Vec<u64>>());
        assert_eq!(store.list().await.unwrap().len(), 20);
    }
}
