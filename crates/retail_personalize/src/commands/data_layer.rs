//! Data layer command - registers schemas, datasets and import jobs.

use anyhow::{Context, Result};
use config::Config;
use dataset_explorer::validate_headers;
use object_store::ObjectStore;
use orchestration::{PollOutcome, ensure_replacing_failed, ensure_resource};
use personalize_client::{AccessProvisioner, CreateRequest, PersonalizeApi, s3_uri, upload_file};
use personalize_structs::{
    DatasetSchema, DatasetType, ROLE_MANAGED_POLICIES, ResourceKind, ResourceStatus, StateKey,
    bucket_policy, role_trust_policy,
};
use sqlx::SqlitePool;
use tracing::info;

use super::{batch_poller, failure_error, record, record_outcome, record_report, single_poller};

const STAGE: &str = "data-layer";

/// Runs the data layer stage.
///
/// Resources left by an earlier run are reused. Import jobs that failed are
/// submitted again under a new name, so a rerun after fixing the CSV files
/// imports them again.
///
/// # Errors
///
/// Returns an error if a local file is invalid, a remote call fails, or any
/// import job fails or times out.
pub async fn run(
    config: &Config,
    pool: &SqlitePool,
    api: &dyn PersonalizeApi,
    access: &dyn AccessProvisioner,
    store: &dyn ObjectStore,
) -> Result<()> {
    info!(data_dir = %config.data_dir.display(), "Starting data layer");

    for dataset_type in DatasetType::all() {
        validate_headers(dataset_type, &config.data_dir.join(dataset_type.file_name()))?;
    }

    // Schemas
    let mut schema_arns = Vec::new();
    for dataset_type in DatasetType::all() {
        let name = config.resource_name(&format!("{}-schema", dataset_type.as_slug()));
        let request = CreateRequest::Schema {
            name: name.clone(),
            schema: DatasetSchema::for_dataset(dataset_type),
        };
        let schema = ensure_resource(api, &request)
            .await
            .with_context(|| format!("Failed to register {dataset_type} schema"))?;

        record(pool, StateKey::Schema(dataset_type), &name, schema.arn(), ResourceStatus::Active).await?;
        schema_arns.push((dataset_type, schema.into_arn()));
    }

    // Dataset group
    let group_name = config.resource_name("dataset-group");
    let group = ensure_resource(api, &CreateRequest::DatasetGroup { name: group_name.clone() })
        .await
        .context("Failed to create dataset group")?;
    let group_arn = group.into_arn();
    record(pool, StateKey::DatasetGroup, &group_name, &group_arn, ResourceStatus::CreatePending).await?;

    let outcome = single_poller(config)
        .wait_one(&group_arn, move |arn| async move {
            api.describe(ResourceKind::DatasetGroup, &arn).await
        })
        .await
        .context("Failed to read dataset group status")?;
    record_outcome(pool, StateKey::DatasetGroup, &outcome).await?;
    if outcome != PollOutcome::Succeeded {
        anyhow::bail!("Dataset group {group_name} {outcome}");
    }

    // Datasets
    let mut datasets = Vec::new();
    for (dataset_type, schema_arn) in &schema_arns {
        let name = config.resource_name(dataset_type.as_slug());
        let request = CreateRequest::Dataset {
            name: name.clone(),
            dataset_group_arn: group_arn.clone(),
            schema_arn: schema_arn.clone(),
            dataset_type: *dataset_type,
        };
        let dataset = ensure_resource(api, &request)
            .await
            .with_context(|| format!("Failed to create {dataset_type} dataset"))?;

        record(pool, StateKey::Dataset(*dataset_type), &name, dataset.arn(), ResourceStatus::CreatePending)
            .await?;
        datasets.push((*dataset_type, dataset.into_arn()));
    }

    let tracked: Vec<(StateKey, String)> = datasets
        .iter()
        .map(|(dataset_type, arn)| (StateKey::Dataset(*dataset_type), arn.clone()))
        .collect();
    let dataset_arns: Vec<String> = datasets.iter().map(|(_, arn)| arn.clone()).collect();
    let report = batch_poller(config)
        .wait_for(api, ResourceKind::Dataset, &dataset_arns)
        .await
        .context("Failed to read dataset status")?;
    let failures = record_report(pool, &tracked, &report).await?;
    if !failures.is_empty() {
        return Err(failure_error(STAGE, &failures));
    }

    // Raw files and access
    access
        .ensure_bucket(&config.bucket)
        .await
        .with_context(|| format!("Failed to prepare bucket {}", config.bucket))?;

    let mut data_locations = Vec::new();
    for dataset_type in DatasetType::all() {
        let key = config.object_key(dataset_type.file_name());
        upload_file(store, &config.data_dir.join(dataset_type.file_name()), &key).await?;
        data_locations.push(s3_uri(&config.bucket, &key));
    }

    access
        .put_bucket_policy(&config.bucket, &bucket_policy(&config.bucket))
        .await
        .context("Failed to apply bucket policy")?;

    let role = access
        .ensure_role(&config.role_name, &role_trust_policy(), ROLE_MANAGED_POLICIES)
        .await
        .with_context(|| format!("Failed to prepare role {}", config.role_name))?;
    record(pool, StateKey::Role, &config.role_name, &role.arn, ResourceStatus::Active).await?;

    if role.created {
        info!(
            role = %config.role_name,
            "Waiting {}s for the new role to propagate",
            config.role_propagation_wait.as_secs()
        );
        tokio::time::sleep(config.role_propagation_wait).await;
    }

    // Import jobs
    let mut jobs = Vec::new();
    for ((dataset_type, dataset_arn), data_location) in datasets.iter().zip(data_locations) {
        let base_name = config.resource_name(&format!("{}-import", dataset_type.as_slug()));
        let (name, job) = ensure_replacing_failed(api, &base_name, |name| CreateRequest::DatasetImportJob {
            name: name.to_string(),
            dataset_arn: dataset_arn.clone(),
            data_location: data_location.clone(),
            role_arn: role.arn.clone(),
        })
        .await
        .with_context(|| format!("Failed to start {dataset_type} import"))?;

        record(pool, StateKey::ImportJob(*dataset_type), &name, job.arn(), ResourceStatus::CreatePending)
            .await?;
        jobs.push((StateKey::ImportJob(*dataset_type), job.into_arn()));
    }

    let job_arns: Vec<String> = jobs.iter().map(|(_, arn)| arn.clone()).collect();
    let report = batch_poller(config)
        .wait_for(api, ResourceKind::DatasetImportJob, &job_arns)
        .await
        .context("Failed to read import job status")?;
    info!(rounds = report.rounds, "Import jobs settled");

    let failures = record_report(pool, &jobs, &report).await?;
    if !failures.is_empty() {
        return Err(failure_error(STAGE, &failures));
    }

    info!(dataset_group = %group_arn, "Data layer complete");

    Ok(())
}
