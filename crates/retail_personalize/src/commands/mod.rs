//! CLI command implementations.

pub mod data_layer;
pub mod explore;
pub mod status;
pub mod training_layer;

use anyhow::{Context, Result};
use config::Config;
use database::{NewResource, update_details, update_status, upsert_resource};
use orchestration::{PollOutcome, PollReport, Poller};
use personalize_structs::{ResourceStatus, StateKey};
use serde_json::json;
use sqlx::SqlitePool;

/// Poller for waits on a single resource.
fn single_poller(config: &Config) -> Poller {
    Poller::new(config.poll_interval, config.max_wait)
}

/// Poller for waits on several resources at once.
fn batch_poller(config: &Config) -> Poller {
    Poller::new(config.batch_poll_interval, config.max_wait)
}

/// Status to record for a polled resource.
fn status_of(outcome: &PollOutcome) -> ResourceStatus {
    match outcome {
        PollOutcome::Succeeded => ResourceStatus::Active,
        PollOutcome::Failed(_) => ResourceStatus::CreateFailed,
        PollOutcome::TimedOut => ResourceStatus::CreateInProgress,
    }
}

/// Records a resource identifier in the state store.
async fn record(
    pool: &SqlitePool,
    key: StateKey,
    name: &str,
    arn: &str,
    status: ResourceStatus,
) -> Result<()> {
    upsert_resource(pool, NewResource::new(key, name, arn).with_status(status))
        .await
        .with_context(|| format!("Failed to record {key}"))
}

/// Records the outcome of a wait, keeping the failure reason as details.
async fn record_outcome(pool: &SqlitePool, key: StateKey, outcome: &PollOutcome) -> Result<()> {
    update_status(pool, key, &status_of(outcome))
        .await
        .with_context(|| format!("Failed to update status of {key}"))?;

    if let PollOutcome::Failed(Some(reason)) = outcome {
        update_details(pool, key, &json!({ "failure_reason": reason }))
            .await
            .with_context(|| format!("Failed to record failure of {key}"))?;
    }

    Ok(())
}

/// Records every outcome of a report and returns the unsuccessful ones.
async fn record_report(
    pool: &SqlitePool,
    tracked: &[(StateKey, String)],
    report: &PollReport,
) -> Result<Vec<(StateKey, PollOutcome)>> {
    let mut failures = Vec::new();

    for (key, arn) in tracked {
        let outcome = report
            .outcome(arn)
            .cloned()
            .unwrap_or(PollOutcome::TimedOut);
        record_outcome(pool, *key, &outcome).await?;

        if outcome != PollOutcome::Succeeded {
            failures.push((*key, outcome));
        }
    }

    Ok(failures)
}

/// Builds the error a stage ends with when resources did not become active.
fn failure_error(stage: &str, failures: &[(StateKey, PollOutcome)]) -> anyhow::Error {
    let details = failures
        .iter()
        .map(|(key, outcome)| format!("{key} {outcome}"))
        .collect::<Vec<_>>()
        .join("; ");

    anyhow::anyhow!(
        "{stage} finished with {} unsuccessful resource(s): {details}",
        failures.len()
    )
}

#[cfg(test)]
mod tests {
    use personalize_structs::DatasetType;

    use super::*;

    #[test]
    fn test_failure_error_names_every_resource() {
        let failures = vec![
            (
                StateKey::ImportJob(DatasetType::Items),
                PollOutcome::Failed(Some("bad rows".to_string())),
            ),
            (StateKey::ImportJob(DatasetType::Users), PollOutcome::TimedOut),
        ];

        let message = failure_error("data-layer", &failures).to_string();

        assert!(message.contains("2 unsuccessful"));
        assert!(message.contains("import_job/items failed: bad rows"));
        assert!(message.contains("import_job/users timed out"));
    }

    #[test]
    fn test_status_of() {
        assert_eq!(status_of(&PollOutcome::Succeeded), ResourceStatus::Active);
        assert_eq!(status_of(&PollOutcome::Failed(None)), ResourceStatus::CreateFailed);
        assert_eq!(status_of(&PollOutcome::TimedOut), ResourceStatus::CreateInProgress);
    }
}
