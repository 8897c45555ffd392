use std::sync::Arc;

use crate::application::errors::{FavoritesError, StorageError};
use crate::domain::entities::{FavoriteRecord, FavoritesCollection, ItemKind};
use crate::domain::traits::Store;

/// Storage key prefix; the user id is appended
pub const DEFAULT_KEY_PREFIX: &str = "favorites_";

/// Per-user favorites kept as one JSON document in a key-value store.
///
/// Reads fail open: a missing or unparsable document behaves like an empty
/// collection. Writes replace the whole document (last writer wins).
pub struct FavoritesService {
    store: Arc<dyn Store>,
    key_prefix: String,
}

impl FavoritesService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn storage_key(&self, user_id: &str) -> String {
        format!("{}{}", self.key_prefix, user_id)
    }

    /// Raw load: `Ok(None)` when nothing is stored, `Corrupt` when the
    /// stored value does not parse.
    pub async fn load(&self, user_id: &str) -> Result<Option<FavoritesCollection>, FavoritesError> {
        let key = self.storage_key(user_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| FavoritesError::Corrupt {
                key,
                reason: e.to_string(),
            })
    }

    /// Fail-open load used by every read path
    pub async fn collection(&self, user_id: &str) -> FavoritesCollection {
        match self.load(user_id).await {
            Ok(collection) => collection.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Reading favorites failed, treating as empty");
                FavoritesCollection::default()
            }
        }
    }

    async fn save(&self, user_id: &str, collection: &FavoritesCollection) -> Result<(), FavoritesError> {
        let raw = serde_json::to_string(collection).map_err(StorageError::from)?;
        self.store.set(&self.storage_key(user_id), &raw).await?;
        Ok(())
    }

    /// Whether any bucket holds `item_id`. A record whose type differs from
    /// `expected` or from its bucket is still reported as favorited, with a
    /// warning.
    pub async fn is_favorited(&self, user_id: Option<&str>, item_id: &str, expected: Option<ItemKind>) -> bool {
        let Some(user_id) = user_id else {
            return false;
        };

        let collection = self.collection(user_id).await;
        let Some((bucket, record)) = collection.find(item_id) else {
            return false;
        };

        if let Some(expected) = expected {
            if record.kind() != expected {
                tracing::warn!(
                    user_id,
                    item_id,
                    expected = %expected,
                    found = %record.kind(),
                    "Favorite type mismatch"
                );
            }
        }
        if record.kind() != bucket {
            tracing::warn!(
                user_id,
                item_id,
                bucket = bucket.bucket_name(),
                declared = %record.kind(),
                "Favorite filed under the wrong bucket"
            );
        }

        true
    }

    /// Flips the favorite state of `record.id` and returns the new state.
    ///
    /// The record counts as favorited only when its own bucket holds the id.
    /// Removal then clears the id from all three buckets. Otherwise the id is
    /// purged everywhere and appended to the record's bucket, so a copy left
    /// only in the wrong bucket is moved rather than dropped.
    pub async fn toggle_favorite(&self, user_id: Option<&str>, record: FavoriteRecord) -> Result<bool, FavoritesError> {
        let user_id = user_id.ok_or(FavoritesError::AuthRequired)?;

        let mut collection = match self.load(user_id).await {
            Ok(collection) => collection.unwrap_or_default(),
            Err(FavoritesError::Corrupt { key, reason }) => {
                tracing::warn!(key = %key, reason = %reason, "Discarding corrupt favorites");
                FavoritesCollection::default()
            }
            Err(e) => return Err(e),
        };

        let liked = if collection.contains_in(record.kind(), &record.id) {
            let removed = collection.remove_everywhere(&record.id);
            tracing::debug!(user_id, item_id = %record.id, removed, "Removing favorite");
            false
        } else {
            let item_id = record.id.clone();
            let kind = record.kind();
            let purged = collection.insert(record);
            tracing::debug!(user_id, item_id = %item_id, kind = %kind, purged, "Adding favorite");
            true
        };

        self.save(user_id, &collection).await?;
        tracing::info!(user_id, liked, "Favorites updated");

        Ok(liked)
    }

    /// Records of one bucket in insertion order
    pub async fn favorites(&self, user_id: &str, kind: ItemKind) -> Vec<FavoriteRecord> {
        self.collection(user_id).await.bucket(kind).to_vec()
    }

    pub async fn count(&self, user_id: &str) -> usize {
        self.collection(user_id).await.len()
    }

    /// Re-files misplaced legacy records. Writes only when something changed.
    pub async fn repair(&self, user_id: &str) -> Result<usize, FavoritesError> {
        let Some(mut collection) = self.load(user_id).await? else {
            return Ok(0);
        };

        for issue in collection.inconsistencies() {
            tracing::debug!(user_id, ?issue, "Repairing favorite");
        }

        let changed = collection.repair();
        if changed > 0 {
            self.save(user_id, &collection).await?;
            tracing::info!(user_id, changed, "Favorites repaired");
        }

        Ok(changed)
    }

    /// Forgets everything stored for the user
    pub async fn clear(&self, user_id: &str) -> Result<(), FavoritesError> {
        self.store.delete(&self.storage_key(user_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::MemoryStore;

    fn service() -> (Arc<MemoryStore>, FavoritesService) {
        let store = Arc::new(MemoryStore::new());
        let service = FavoritesService::new(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn test_toggle_adds_then_removes() {
        let (_store, service) = service();
        let candles = FavoriteRecord::product("p1", "Candles");

        assert!(service.toggle_favorite(Some("u1"), candles.clone()).await.unwrap());
        assert!(service.is_favorited(Some("u1"), "p1", Some(ItemKind::Product)).await);

        assert!(!service.toggle_favorite(Some("u1"), candles).await.unwrap());
        assert!(!service.is_favorited(Some("u1"), "p1", None).await);
    }

    #[tokio::test]
    async fn test_null_snapshot_field_keeps_other_favorites() {
        let (store, service) = service();
        store
            .set(
                &service.storage_key("u1"),
                r#"{"products":[{"id":"p1","type":"product","name":"Candles"},{"id":"p2","type":"product","name":"Incense"}],
                    "services":[],
                    "businesses":[{"id":"b1","type":"business","name":"Bakery","review_count":null}]}"#,
            )
            .await
            .unwrap();

        assert!(service.is_favorited(Some("u1"), "p1", None).await);
        assert!(service.is_favorited(Some("u1"), "b1", Some(ItemKind::Business)).await);

        service
            .toggle_favorite(Some("u1"), FavoriteRecord::product("p9", "Oil"))
            .await
            .unwrap();

        let collection = service.load("u1").await.unwrap().unwrap();
        let ids: Vec<&str> = collection.iter().map(|(_, r)| r.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p9", "b1"]);
    }

    #[tokio::test]
    async fn test_favorites_are_per_user() {
        let (_store, service) = service();
        service
            .toggle_favorite(Some("u1"), FavoriteRecord::business("b1", "Bakery"))
            .await
            .unwrap();

        assert!(service.is_favorited(Some("u1"), "b1", None).await);
        assert!(!service.is_favorited(Some("u2"), "b1", None).await);
    }

    #[tokio::test]
    async fn test_absent_user_reads_false() {
        let (store, service) = service();
        store.set(&service.storage_key("u1"), r#"{"products":[{"id":"p1","type":"product"}]}"#).await.unwrap();

        assert!(!service.is_favorited(None, "p1", None).await);
    }

    #[tokio::test]
    async fn test_load_distinguishes_missing_and_corrupt() {
        let (store, service) = service();
        assert!(service.load("u1").await.unwrap().is_none());

        store.set(&service.storage_key("u1"), "{not json").await.unwrap();
        assert!(matches!(service.load("u1").await, Err(FavoritesError::Corrupt { .. })));
        assert!(service.collection("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_overwrites_corrupt_value() {
        let (store, service) = service();
        store.set(&service.storage_key("u1"), "garbage").await.unwrap();

        let liked = service
            .toggle_favorite(Some("u1"), FavoriteRecord::service("s1", "Tutoring"))
            .await
            .unwrap();

        assert!(liked);
        assert_eq!(service.favorites("u1", ItemKind::Service).await.len(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let store = Arc::new(MemoryStore::new().with_quota(8));
        let service = FavoritesService::new(store.clone());

        let result = service
            .toggle_favorite(Some("u1"), FavoriteRecord::product("p1", "Candles"))
            .await;

        assert!(matches!(
            result,
            Err(FavoritesError::Storage(StorageError::QuotaExceeded { .. }))
        ));
        assert!(store.get(&service.storage_key("u1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_custom_key_prefix() {
        let store = Arc::new(MemoryStore::new());
        let service = FavoritesService::new(store.clone()).with_key_prefix("likes:");

        service
            .toggle_favorite(Some("u9"), FavoriteRecord::product("p1", "Candles"))
            .await
            .unwrap();

        assert!(store.get("likes:u9").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_repair_persists_only_on_change() {
        let (store, service) = service();
        let key = service.storage_key("u1");
        assert_eq!(service.repair("u1").await.unwrap(), 0);

        store
            .set(&key, r#"{"products":[],"services":[{"id":"p1","type":"product","name":"Candles"}],"businesses":[]}"#)
            .await
            .unwrap();

        assert_eq!(service.repair("u1").await.unwrap(), 1);
        let repaired = service.load("u1").await.unwrap().unwrap();
        assert_eq!(repaired.products.len(), 1);
        assert!(repaired.services.is_empty());

        assert_eq!(service.repair("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_and_clear() {
        let (_store, service) = service();
        service.toggle_favorite(Some("u1"), FavoriteRecord::product("p1", "Candles")).await.unwrap();
        service.toggle_favorite(Some("u1"), FavoriteRecord::business("b1", "Bakery")).await.unwrap();
        assert_eq!(service.count("u1").await, 2);

        service.clear("u1").await.unwrap();
        assert_eq!(service.count("u1").await, 0);
    }
}
