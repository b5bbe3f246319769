//! Repository functions for persisted resource identifiers.

use anyhow::Context;
use chrono::Utc;
use personalize_structs::{ResourceStatus, StateKey};
use sqlx::SqlitePool;
use tracing::debug;

use crate::models::{NewResource, ResourceRecord};

const SELECT_COLUMNS: &str = "SELECT key, kind, name, arn, status, details, updated_at FROM pipeline_resources";

/// Records a resource identifier, replacing any previous value for the key.
///
/// Details stored for the key survive unless the ARN changes.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn upsert_resource(pool: &SqlitePool, input: NewResource) -> Result<(), sqlx::Error> {
    let key = input.key.to_string();
    let status = input.status.map(String::from);

    debug!(key = %key, arn = %input.arn, "Recording resource");

    sqlx::query(
        r"
        INSERT INTO pipeline_resources (key, kind, name, arn, status, details, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6)
        ON CONFLICT (key) DO UPDATE SET
            kind = excluded.kind,
            name = excluded.name,
            details = CASE WHEN pipeline_resources.arn = excluded.arn
                           THEN pipeline_resources.details ELSE NULL END,
            arn = excluded.arn,
            status = excluded.status,
            updated_at = excluded.updated_at
        ",
    )
    .bind(&key)
    .bind(input.key.kind())
    .bind(&input.name)
    .bind(&input.arn)
    .bind(status)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Finds the record stored under a key.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn find_resource(
    pool: &SqlitePool,
    key: StateKey,
) -> Result<Option<ResourceRecord>, sqlx::Error> {
    sqlx::query_as::<_, ResourceRecord>(&format!("{SELECT_COLUMNS} WHERE key = ?1"))
        .bind(key.to_string())
        .fetch_optional(pool)
        .await
}

/// Returns the ARN stored under a key, failing if the writing stage has not run.
///
/// # Errors
///
/// Returns an error if the key is missing or the database operation fails.
pub async fn require_arn(pool: &SqlitePool, key: StateKey) -> anyhow::Result<String> {
    let record = find_resource(pool, key)
        .await
        .with_context(|| format!("Failed to read {key} from state store"))?;

    record.map(|record| record.arn).with_context(|| {
        format!(
            "No {key} recorded; run the `{}` stage first",
            key.written_by()
        )
    })
}

/// Updates the recorded status of a resource.
///
/// Returns false if nothing is stored under the key.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn update_status(
    pool: &SqlitePool,
    key: StateKey,
    status: &ResourceStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r"
        UPDATE pipeline_resources
        SET status = ?1, updated_at = ?2
        WHERE key = ?3
        ",
    )
    .bind(status.as_api_string())
    .bind(Utc::now())
    .bind(key.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Attaches JSON details (such as evaluation metrics) to a resource.
///
/// Returns false if nothing is stored under the key.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn update_details(
    pool: &SqlitePool,
    key: StateKey,
    details: &serde_json::Value,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r"
        UPDATE pipeline_resources
        SET details = ?1, updated_at = ?2
        WHERE key = ?3
        ",
    )
    .bind(details.to_string())
    .bind(Utc::now())
    .bind(key.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Lists every recorded resource ordered by key.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn list_resources(pool: &SqlitePool) -> Result<Vec<ResourceRecord>, sqlx::Error> {
    sqlx::query_as::<_, ResourceRecord>(&format!("{SELECT_COLUMNS} ORDER BY key"))
        .fetch_all(pool)
        .await
}

#[cfg(test)]
mod tests {
    use personalize_structs::{DatasetType, Recipe, ResourceKind};
    use serde_json::json;

    use super::*;
    use crate::{create_pool, run_migrations};

    async fn test_pool() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_upsert_and_find() {
        let pool = test_pool().await;

        upsert_resource(
            &pool,
            NewResource::new(
                StateKey::Dataset(DatasetType::Items),
                "retaildemo-items",
                "arn:dataset/items",
            )
            .with_status(ResourceStatus::Active),
        )
        .await
        .unwrap();

        let record = find_resource(&pool, StateKey::Dataset(DatasetType::Items))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.kind, ResourceKind::Dataset);
        assert_eq!(record.arn, "arn:dataset/items");
        assert_eq!(record.resource_status(), Some(ResourceStatus::Active));
        assert_eq!(record.state_key().unwrap(), StateKey::Dataset(DatasetType::Items));
    }

    #[tokio::test]
    async fn test_upsert_replaces_arn() {
        let pool = test_pool().await;
        let key = StateKey::SolutionVersion(Recipe::Sims);

        upsert_resource(&pool, NewResource::new(key, "sims", "arn:v1")).await.unwrap();
        update_details(&pool, key, &json!({"coverage": 0.5})).await.unwrap();

        // Same ARN keeps details.
        upsert_resource(&pool, NewResource::new(key, "sims", "arn:v1")).await.unwrap();
        let record = find_resource(&pool, key).await.unwrap().unwrap();
        assert_eq!(record.details_json().unwrap(), Some(json!({"coverage": 0.5})));

        // New ARN drops details belonging to the old version.
        upsert_resource(&pool, NewResource::new(key, "sims", "arn:v2")).await.unwrap();
        let record = find_resource(&pool, key).await.unwrap().unwrap();
        assert_eq!(record.arn, "arn:v2");
        assert!(record.details.is_none());
        assert_eq!(list_resources(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_require_arn_names_missing_stage() {
        let pool = test_pool().await;

        let error = require_arn(&pool, StateKey::DatasetGroup).await.unwrap_err();
        assert!(error.to_string().contains("data-layer"));

        upsert_resource(&pool, NewResource::new(StateKey::DatasetGroup, "dg", "arn:dg"))
            .await
            .unwrap();
        assert_eq!(require_arn(&pool, StateKey::DatasetGroup).await.unwrap(), "arn:dg");
    }

    #[tokio::test]
    async fn test_update_status() {
        let pool = test_pool().await;

        assert!(
            !update_status(&pool, StateKey::Filter, &ResourceStatus::Active)
                .await
                .unwrap()
        );

        upsert_resource(&pool, NewResource::new(StateKey::Filter, "f", "arn:f"))
            .await
            .unwrap();
        assert!(
            update_status(&pool, StateKey::Filter, &ResourceStatus::CreateFailed)
                .await
                .unwrap()
        );

        let record = find_resource(&pool, StateKey::Filter).await.unwrap().unwrap();
        assert_eq!(record.resource_status(), Some(ResourceStatus::CreateFailed));
    }
}
