//! In-memory record repository.
//!
//! Mirrors the PostgreSQL semantics over an ordered map so the HTTP layer can
//! run without a database. Records are lost on restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use umapic_core::{
    next_updated_at, Error, RecordItem, RecordPage, RecordPatch, RecordQuery, RecordRepository,
    Result, SortOrder,
};

type RecordKey = (String, String);

/// RecordRepository held in process memory, keyed by `(user_id, record_id)`.
#[derive(Debug, Default)]
pub struct MemoryRecordRepository {
    records: RwLock<BTreeMap<RecordKey, RecordItem>>,
}

impl MemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all users.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn key(user_id: &str, record_id: &str) -> RecordKey {
    (user_id.to_string(), record_id.to_string())
}

#[async_trait]
impl RecordRepository for MemoryRecordRepository {
    async fn list(&self, user_id: &str, query: RecordQuery) -> Result<RecordPage> {
        let records = self.records.read().await;

        let mut items: Vec<&RecordItem> = records
            .values()
            .filter(|item| item.user_id == user_id)
            .filter(|item| match &query.after {
                None => true,
                Some(after) => {
                    let pos = (item.visit_date.as_str(), item.record_id.as_str());
                    let after = (after.visit_date.as_str(), after.record_id.as_str());
                    match query.order {
                        SortOrder::Asc => pos > after,
                        SortOrder::Desc => pos < after,
                    }
                }
            })
            .collect();

        items.sort_by(|a, b| {
            let ord = (a.visit_date.as_str(), a.record_id.as_str())
                .cmp(&(b.visit_date.as_str(), b.record_id.as_str()));
            match query.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let limit = query.limit as usize;
        let has_more = items.len() > limit;
        let items: Vec<RecordItem> = items.into_iter().take(limit).cloned().collect();
        let next = if has_more {
            items.last().map(RecordItem::position)
        } else {
            None
        };

        debug!(
            subsystem = "db",
            component = "memory_records",
            op = "list",
            result_count = items.len(),
            has_more,
            "Listed records"
        );
        Ok(RecordPage { items, next })
    }

    async fn insert(&self, item: &RecordItem) -> Result<()> {
        let mut records = self.records.write().await;
        let k = key(&item.user_id, &item.record_id);
        if records.contains_key(&k) {
            return Err(Error::Internal(format!(
                "record {} already exists",
                item.record_id
            )));
        }
        records.insert(k, item.clone());
        Ok(())
    }

    async fn fetch(&self, user_id: &str, record_id: &str) -> Result<Option<RecordItem>> {
        Ok(self.records.read().await.get(&key(user_id, record_id)).cloned())
    }

    async fn update(
        &self,
        user_id: &str,
        record_id: &str,
        patch: &RecordPatch,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let mut records = self.records.write().await;
        let item = records
            .get_mut(&key(user_id, record_id))
            .ok_or_else(|| Error::RecordNotFound(record_id.to_string()))?;

        patch.apply_to(item);
        item.updated_at = next_updated_at(item.updated_at, now);
        Ok(item.updated_at)
    }

    async fn delete(&self, user_id: &str, record_id: &str) -> Result<Option<RecordItem>> {
        Ok(self.records.write().await.remove(&key(user_id, record_id)))
    }
}
