//! MongoDB backend for [`LocalStore`]. Two collections plus the
//! preferences blob, indexed per the access paths the store uses:
//! threads by id/created_at/pinned, items by id/thread_id/parent_id/
//! created_at.

use async_trait::async_trait;
use braid_types::{Thread, ThreadItem};
use futures::TryStreamExt;
use mongodb::{bson::doc, Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::local::LocalStore;
use crate::prefs::{Preferences, PREFERENCES_KEY};

#[derive(Debug, Serialize, Deserialize)]
struct PreferencesDoc {
    #[serde(rename = "_id")]
    id: String,
    prefs: Preferences,
}

#[derive(Clone)]
pub struct MongoStore {
    threads: Collection<Thread>,
    items: Collection<ThreadItem>,
    preferences: Collection<PreferencesDoc>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let db = client.database(database);

        let store = Self {
            threads: db.collection("threads"),
            items: db.collection("thread_items"),
            preferences: db.collection("preferences"),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        self.threads
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "id": 1 })
                    .options(
                        mongodb::options::IndexOptions::builder()
                            .unique(true)
                            .build(),
                    )
                    .build(),
            )
            .await?;
        self.threads
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "pinned": -1, "createdAt": -1 })
                    .build(),
            )
            .await?;
        self.items
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "id": 1 })
                    .options(
                        mongodb::options::IndexOptions::builder()
                            .unique(true)
                            .build(),
                    )
                    .build(),
            )
            .await?;
        self.items
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "threadId": 1, "createdAt": 1 })
                    .build(),
            )
            .await?;
        self.items
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "parentId": 1 })
                    .build(),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl LocalStore for MongoStore {
    async fn upsert_thread(&self, thread: &Thread) -> Result<()> {
        self.threads
            .replace_one(doc! { "id": &thread.id }, thread)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn get_thread(&self, id: &str) -> Result<Option<Thread>> {
        Ok(self.threads.find_one(doc! { "id": id }).await?)
    }

    async fn list_threads(&self) -> Result<Vec<Thread>> {
        let threads = self
            .threads
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(threads)
    }

    async fn delete_thread(&self, id: &str) -> Result<()> {
        let deleted = self.threads.delete_one(doc! { "id": id }).await?;
        if deleted.deleted_count == 0 {
            return Err(StoreError::ThreadNotFound(id.to_string()));
        }
        self.items.delete_many(doc! { "threadId": id }).await?;
        Ok(())
    }

    async fn upsert_item(&self, item: &ThreadItem) -> Result<()> {
        self.items
            .replace_one(doc! { "id": &item.id }, item)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn upsert_items(&self, items: &[ThreadItem]) -> Result<()> {
        // Per-document upserts; the first failure aborts and the
        // caller retries item by item.
        for item in items {
            self.upsert_item(item).await?;
        }
        Ok(())
    }

    async fn get_item(&self, id: &str) -> Result<Option<ThreadItem>> {
        Ok(self.items.find_one(doc! { "id": id }).await?)
    }

    async fn list_items(&self, thread_id: &str) -> Result<Vec<ThreadItem>> {
        let items = self
            .items
            .find(doc! { "threadId": thread_id })
            .sort(doc! { "createdAt": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(items)
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        let deleted = self.items.delete_one(doc! { "id": id }).await?;
        if deleted.deleted_count == 0 {
            return Err(StoreError::ItemNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn load_preferences(&self) -> Result<Preferences> {
        let found = self
            .preferences
            .find_one(doc! { "_id": PREFERENCES_KEY })
            .await?;
        Ok(found.map(|doc| doc.prefs).unwrap_or_default())
    }

    async fn save_preferences(&self, prefs: &Preferences) -> Result<()> {
        let doc = PreferencesDoc {
            id: PREFERENCES_KEY.to_string(),
            prefs: prefs.clone(),
        };
        self.preferences
            .replace_one(doc! { "_id": PREFERENCES_KEY }, &doc)
            .upsert(true)
            .await?;
        Ok(())
    }
}
