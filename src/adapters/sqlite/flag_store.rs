//! SQLite implementation of the FlagStore.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::parse_datetime;
use crate::domain::errors::StoreError;
use crate::domain::models::{FeatureFlag, FlagId};
use crate::domain::ports::FlagStore;

#[derive(Clone)]
pub struct SqliteFlagStore {
    pool: SqlitePool,
}

impl SqliteFlagStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FlagStore for SqliteFlagStore {
    async fn insert(&self, name: &str, enabled: bool) -> Result<FeatureFlag, StoreError> {
        let row: FlagRow = sqlx::query_as(
            "INSERT INTO feature_flags (name, enabled) VALUES (?, ?)
             RETURNING id, name, enabled, created_at",
        )
        .bind(name)
        .bind(enabled)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn select_all(&self) -> Result<Vec<FeatureFlag>, StoreError> {
        let rows: Vec<FlagRow> =
            sqlx::query_as("SELECT id, name, enabled, created_at FROM feature_flags ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn update(&self, id: FlagId, name: &str, enabled: bool) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE feature_flags SET name = ?, enabled = ? WHERE id = ?")
            .bind(name)
            .bind(enabled)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: FlagId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM feature_flags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct FlagRow {
    id: i64,
    name: String,
    enabled: bool,
    created_at: String,
}

impl TryFrom<FlagRow> for FeatureFlag {
    type Error = StoreError;

    fn try_from(row: FlagRow) -> Result<Self, Self::Error> {
        let created_at = parse_datetime(&row.created_at).map_err(|e| {
            StoreError::Corrupt(format!("flag {} has invalid created_at: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            enabled: row.enabled,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    async fn setup_store() -> SqliteFlagStore {
        let pool = create_migrated_test_pool()
            .await
            .expect("failed to create test pool");
        SqliteFlagStore::new(pool)
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_created_at() {
        let store = setup_store().await;
        let before = chrono::Utc::now() - chrono::Duration::seconds(5);

        let first = store.insert("beta", false).await.unwrap();
        let second = store.insert("gamma", true).await.unwrap();

        assert!(first.id > 0);
        assert!(second.id > first.id);
        assert_eq!(first.name, "beta");
        assert!(!first.enabled);
        assert!(second.enabled);
        assert!(first.created_at >= before);
    }

    #[tokio::test]
    async fn test_select_all_orders_by_id() {
        let store = setup_store().await;
        for name in ["c", "a", "b"] {
            store.insert(name, true).await.unwrap();
        }

        let flags = store.select_all().await.unwrap();
        let ids: Vec<_> = flags.iter().map(|f| f.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();

        assert_eq!(ids, sorted);
        assert_eq!(
            flags.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            vec!["c", "a", "b"]
        );
    }

    #[tokio::test]
    async fn test_update_reports_rows_affected() {
        let store = setup_store().await;
        let flag = store.insert("beta", false).await.unwrap();

        assert_eq!(store.update(flag.id, "beta", true).await.unwrap(), 1);
        assert_eq!(store.update(flag.id + 100, "ghost", true).await.unwrap(), 0);

        let flags = store.select_all().await.unwrap();
        assert!(flags[0].enabled);
        assert_eq!(flags[0].created_at, flag.created_at, "created_at is immutable");
    }

    #[tokio::test]
    async fn test_delete_is_hard_delete() {
        let store = setup_store().await;
        let flag = store.insert("beta", false).await.unwrap();

        assert_eq!(store.delete(flag.id).await.unwrap(), 1);
        assert_eq!(store.delete(flag.id).await.unwrap(), 0);
        assert!(store.select_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_name_rejected_by_schema() {
        let store = setup_store().await;
        let result = store.insert("  ", true).await;
        assert!(matches!(result, Err(StoreError::Query(_))));
    }
}
