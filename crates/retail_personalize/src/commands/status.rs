//! Status command - shows the resources recorded by both stages.

use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table};
use database::{ResourceRecord, list_resources, update_status};
use personalize_client::PersonalizeApi;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Runs the status command, refreshing statuses first when `api` is given.
///
/// # Errors
///
/// Returns an error if the state store cannot be read or a refresh fails.
pub async fn run(pool: &SqlitePool, api: Option<&dyn PersonalizeApi>) -> Result<()> {
    if let Some(api) = api {
        let updated = refresh(pool, api).await?;
        info!(updated, "Refreshed resource statuses");
    }

    let records = list_resources(pool)
        .await
        .context("Failed to read state store")?;

    if records.is_empty() {
        println!("No resources recorded. Run 'retail-personalize data-layer' first.");
        return Ok(());
    }

    println!("{}", status_table(&records));

    Ok(())
}

/// Re-describes every recorded asynchronous resource and stores its status.
///
/// Returns the number of records whose status changed.
async fn refresh(pool: &SqlitePool, api: &dyn PersonalizeApi) -> Result<usize> {
    let records = list_resources(pool)
        .await
        .context("Failed to read state store")?;
    let mut updated = 0;

    for record in records.iter().filter(|record| record.kind.is_async()) {
        let key = match record.state_key() {
            Ok(key) => key,
            Err(error) => {
                warn!(key = %record.key, %error, "Skipping unknown state key");
                continue;
            }
        };

        let state = api
            .describe(record.kind, &record.arn)
            .await
            .with_context(|| format!("Failed to describe {key}"))?;

        if record.resource_status().as_ref() != Some(&state.status) {
            update_status(pool, key, &state.status)
                .await
                .with_context(|| format!("Failed to update status of {key}"))?;
            updated += 1;
        }
    }

    Ok(updated)
}

fn status_table(records: &[ResourceRecord]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["KEY", "NAME", "STATUS", "UPDATED", "ARN"]);

    for record in records {
        table.add_row(vec![
            record.key.clone(),
            record.name.clone(),
            record.status.clone().unwrap_or_else(|| "-".to_string()),
            record.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.arn.clone(),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use database::{NewResource, create_pool, find_resource, run_migrations, upsert_resource};
    use personalize_client::fake::FakePersonalize;
    use personalize_structs::{ResourceKind, ResourceState, ResourceStatus, StateKey};

    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_refresh_updates_async_resources() {
        let pool = test_pool().await;
        let api = FakePersonalize::new();

        let group_arn = api.seed(ResourceKind::DatasetGroup, "retaildemo-dataset-group", None);
        let filter_arn = api.seed(ResourceKind::Filter, "retaildemo-filter-purchased-products", Some(&group_arn));
        api.script(&filter_arn, [ResourceState::failed("bad expression")]);

        upsert_resource(
            &pool,
            NewResource::new(StateKey::DatasetGroup, "retaildemo-dataset-group", &group_arn)
                .with_status(ResourceStatus::CreatePending),
        )
        .await
        .unwrap();
        upsert_resource(
            &pool,
            NewResource::new(StateKey::Filter, "retaildemo-filter-purchased-products", &filter_arn)
                .with_status(ResourceStatus::CreatePending),
        )
        .await
        .unwrap();
        // Roles are not described by the service.
        upsert_resource(
            &pool,
            NewResource::new(StateKey::Role, "retaildemo-personalize-role", "arn:aws:iam::0:role/r")
                .with_status(ResourceStatus::Active),
        )
        .await
        .unwrap();

        let updated = refresh(&pool, &api).await.unwrap();

        assert_eq!(updated, 2);
        let group = find_resource(&pool, StateKey::DatasetGroup).await.unwrap().unwrap();
        assert_eq!(group.resource_status(), Some(ResourceStatus::Active));
        let filter = find_resource(&pool, StateKey::Filter).await.unwrap().unwrap();
        assert_eq!(filter.resource_status(), Some(ResourceStatus::CreateFailed));

        // Nothing changes on a second refresh.
        assert_eq!(refresh(&pool, &api).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_status_table() {
        let pool = test_pool().await;
        upsert_resource(
            &pool,
            NewResource::new(StateKey::DatasetGroup, "retaildemo-dataset-group", "arn:group"),
        )
        .await
        .unwrap();

        let records = list_resources(&pool).await.unwrap();
        let rendered = status_table(&records).to_string();

        assert!(rendered.contains("dataset_group"));
        assert!(rendered.contains("retaildemo-dataset-group"));
        assert!(rendered.contains("arn:group"));

        run(&pool, None).await.unwrap();
    }
}
