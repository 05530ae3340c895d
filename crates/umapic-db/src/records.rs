//! PostgreSQL record repository.
//!
//! The `visit_record` table is keyed by `(user_id, record_id)` with a range
//! index on `(user_id, visit_date, record_id)`. Listing is a keyset scan over
//! that index; every mutation is a single statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, QueryBuilder};
use tracing::debug;

use umapic_core::{
    Error, RecordItem, RecordPage, RecordPatch, RecordQuery, RecordRepository, Result, SortOrder,
};

const COLUMNS: &str = "user_id, record_id, store_name, place_id, latitude, longitude, address, \
     visit_date, rating, note, companions, photo_keys, created_at, updated_at";

#[derive(Debug, FromRow)]
struct RecordRow {
    user_id: String,
    record_id: String,
    store_name: String,
    place_id: Option<String>,
    latitude: f64,
    longitude: f64,
    address: Option<String>,
    visit_date: String,
    rating: f64,
    note: Option<String>,
    companions: Vec<String>,
    photo_keys: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RecordRow> for RecordItem {
    fn from(row: RecordRow) -> Self {
        RecordItem {
            user_id: row.user_id,
            record_id: row.record_id,
            store_name: row.store_name,
            place_id: row.place_id,
            latitude: row.latitude,
            longitude: row.longitude,
            address: row.address,
            visit_date: row.visit_date,
            rating: row.rating,
            note: row.note,
            companions: row.companions,
            photo_keys: row.photo_keys,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Build the keyset scan for one page in `order`.
///
/// Comparison operator and direction come from the enum, never from input.
fn list_sql(order: SortOrder) -> String {
    let (cmp, dir) = match order {
        SortOrder::Asc => (">", "ASC"),
        SortOrder::Desc => ("<", "DESC"),
    };
    format!(
        "SELECT {COLUMNS} FROM visit_record \
         WHERE user_id = $1 \
           AND ($2::text IS NULL \
                OR (visit_date, record_id) {cmp} ($2::text COLLATE \"C\", $3::text COLLATE \"C\")) \
         ORDER BY visit_date {dir}, record_id {dir} \
         LIMIT $4"
    )
}

/// PostgreSQL implementation of RecordRepository.
#[derive(Clone)]
pub struct PgRecordRepository {
    pool: Pool<Postgres>,
}

impl PgRecordRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordRepository for PgRecordRepository {
    async fn list(&self, user_id: &str, query: RecordQuery) -> Result<RecordPage> {
        let limit = query.limit as usize;
        let (after_date, after_id) = match &query.after {
            Some(pos) => (Some(pos.visit_date.as_str()), Some(pos.record_id.as_str())),
            None => (None, None),
        };

        // One extra row tells whether another page exists.
        let rows: Vec<RecordRow> = sqlx::query_as(&list_sql(query.order))
            .bind(user_id)
            .bind(after_date)
            .bind(after_id)
            .bind(limit as i64 + 1)
            .fetch_all(&self.pool)
            .await?;

        let mut items: Vec<RecordItem> = rows.into_iter().map(RecordItem::from).collect();
        let next = if items.len() > limit {
            items.truncate(limit);
            items.last().map(RecordItem::position)
        } else {
            None
        };

        debug!(
            subsystem = "db",
            component = "records",
            op = "list",
            order = query.order.as_str(),
            result_count = items.len(),
            has_more = next.is_some(),
            "Listed records"
        );
        Ok(RecordPage { items, next })
    }

    async fn insert(&self, item: &RecordItem) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO visit_record ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(&item.user_id)
        .bind(&item.record_id)
        .bind(&item.store_name)
        .bind(&item.place_id)
        .bind(item.latitude)
        .bind(item.longitude)
        .bind(&item.address)
        .bind(&item.visit_date)
        .bind(item.rating)
        .bind(&item.note)
        .bind(&item.companions)
        .bind(&item.photo_keys)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch(&self, user_id: &str, record_id: &str) -> Result<Option<RecordItem>> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM visit_record WHERE user_id = $1 AND record_id = $2"
        ))
        .bind(user_id)
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RecordItem::from))
    }

    async fn update(
        &self,
        user_id: &str,
        record_id: &str,
        patch: &RecordPatch,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE visit_record SET updated_at = GREATEST(");
        qb.push_bind(now)
            .push(", updated_at + INTERVAL '1 millisecond')");

        if let Some(store_name) = &patch.store_name {
            qb.push(", store_name = ").push_bind(store_name.clone());
        }
        if let Some(visit_date) = &patch.visit_date {
            qb.push(", visit_date = ").push_bind(visit_date.clone());
        }
        if let Some(rating) = patch.rating {
            qb.push(", rating = ").push_bind(rating);
        }
        if let Some(note) = &patch.note {
            qb.push(", note = ").push_bind(note.clone());
        }
        if let Some(companions) = &patch.companions {
            qb.push(", companions = ").push_bind(companions.clone());
        }
        if let Some(photo_keys) = &patch.photo_keys {
            qb.push(", photo_keys = ").push_bind(photo_keys.clone());
        }

        qb.push(" WHERE user_id = ")
            .push_bind(user_id.to_string())
            .push(" AND record_id = ")
            .push_bind(record_id.to_string())
            .push(" RETURNING updated_at");

        // The WHERE clause is the existence condition: no row, no write.
        let updated: Option<(DateTime<Utc>,)> = qb
            .build_query_as()
            .fetch_optional(&self.pool)
            .await?;

        updated
            .map(|(updated_at,)| updated_at)
            .ok_or_else(|| Error::RecordNotFound(record_id.to_string()))
    }

    async fn delete(&self, user_id: &str, record_id: &str) -> Result<Option<RecordItem>> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            "DELETE FROM visit_record WHERE user_id = $1 AND record_id = $2 RETURNING {COLUMNS}"
        ))
        .bind(user_id)
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RecordItem::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_sql_desc_scans_backwards() {
        let sql = list_sql(SortOrder::Desc);
        assert!(sql.contains("(visit_date, record_id) < ("));
        assert!(sql.contains("ORDER BY visit_date DESC, record_id DESC"));
    }

    #[test]
    fn test_list_sql_asc_scans_forwards() {
        let sql = list_sql(SortOrder::Asc);
        assert!(sql.contains("(visit_date, record_id) > ("));
        assert!(sql.contains("ORDER BY visit_date ASC, record_id ASC"));
    }

    #[test]
    fn test_list_sql_is_scoped_to_user() {
        for order in [SortOrder::Asc, SortOrder::Desc] {
            assert!(list_sql(order).contains("WHERE user_id = $1"));
        }
    }
}
