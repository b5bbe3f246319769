//! Training layer command - trains solutions and deploys campaigns and the filter.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table};
use config::Config;
use database::{find_resource, require_arn, update_details};
use orchestration::{PollOutcome, ensure_replacing_failed, ensure_solution_version};
use personalize_client::{CreateRequest, PersonalizeApi};
use personalize_structs::{
    DatasetType, FilterExpression, ORDER_COMPLETED_EVENT, Recipe, ResourceKind, ResourceStatus,
    StateKey,
};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;

use super::{batch_poller, failure_error, record, record_outcome, record_report, single_poller};

const STAGE: &str = "training-layer";

/// Runs the training layer stage.
///
/// Requires a completed data layer. Solutions, versions, campaigns and the
/// filter left by an earlier run are reused, except that solutions,
/// campaigns and the filter that failed to create are replaced under a new
/// name.
///
/// # Errors
///
/// Returns an error if the data layer has not completed, a remote call
/// fails, or any resource fails or times out.
pub async fn run(config: &Config, pool: &SqlitePool, api: &dyn PersonalizeApi) -> Result<()> {
    let group_arn = require_arn(pool, StateKey::DatasetGroup).await?;
    ensure_imports_completed(pool).await?;

    info!(dataset_group = %group_arn, "Starting training layer");

    // Solutions
    let mut solutions = Vec::new();
    for recipe in Recipe::all() {
        let base_name = config.resource_name(recipe.as_slug());
        let (name, solution) = ensure_replacing_failed(api, &base_name, |name| CreateRequest::Solution {
            name: name.to_string(),
            dataset_group_arn: group_arn.clone(),
            recipe,
        })
        .await
        .with_context(|| format!("Failed to create {recipe} solution"))?;

        record(pool, StateKey::Solution(recipe), &name, solution.arn(), ResourceStatus::CreatePending)
            .await?;
        solutions.push((recipe, name, solution));
    }

    let tracked: Vec<(StateKey, String)> = solutions
        .iter()
        .map(|(recipe, _, solution)| (StateKey::Solution(*recipe), solution.arn().to_string()))
        .collect();
    let solution_arns: Vec<String> = tracked.iter().map(|(_, arn)| arn.clone()).collect();
    let report = batch_poller(config)
        .wait_for(api, ResourceKind::Solution, &solution_arns)
        .await
        .context("Failed to read solution status")?;

    // Versions cannot be trained on solutions that are not active.
    let failures = record_report(pool, &tracked, &report).await?;
    if !failures.is_empty() {
        return Err(failure_error(STAGE, &failures));
    }

    // Solution versions
    let mut versions = Vec::new();
    for (recipe, name, solution) in &solutions {
        let version = ensure_solution_version(api, solution)
            .await
            .with_context(|| format!("Failed to train {recipe} solution"))?;
        record(
            pool,
            StateKey::SolutionVersion(*recipe),
            name,
            version.arn(),
            ResourceStatus::CreatePending,
        )
        .await?;
        versions.push((*recipe, version.into_arn()));
    }

    let tracked: Vec<(StateKey, String)> = versions
        .iter()
        .map(|(recipe, arn)| (StateKey::SolutionVersion(*recipe), arn.clone()))
        .collect();
    let version_arns: Vec<String> = versions.iter().map(|(_, arn)| arn.clone()).collect();
    let report = batch_poller(config)
        .wait_for(api, ResourceKind::SolutionVersion, &version_arns)
        .await
        .context("Failed to read solution version status")?;
    info!(rounds = report.rounds, "Solution versions settled");

    // Campaigns cannot be deployed on versions that did not train.
    let failures = record_report(pool, &tracked, &report).await?;
    if !failures.is_empty() {
        return Err(failure_error(STAGE, &failures));
    }

    // Offline metrics
    let mut metrics = BTreeMap::new();
    for (recipe, version_arn) in &versions {
        let values = api
            .solution_metrics(version_arn)
            .await
            .with_context(|| format!("Failed to fetch {recipe} metrics"))?;
        update_details(pool, StateKey::SolutionVersion(*recipe), &json!({ "metrics": values }))
            .await
            .with_context(|| format!("Failed to record {recipe} metrics"))?;
        metrics.insert(*recipe, values);
    }
    println!("{}", metrics_table(&metrics));

    // Campaigns
    let mut campaigns = Vec::new();
    for (recipe, version_arn) in &versions {
        let base_name = config.resource_name(recipe.as_slug());
        let (name, campaign) = ensure_replacing_failed(api, &base_name, |name| CreateRequest::Campaign {
            name: name.to_string(),
            solution_version_arn: version_arn.clone(),
            min_provisioned_tps: config.campaign_min_tps,
        })
        .await
        .with_context(|| format!("Failed to create {recipe} campaign"))?;

        record(pool, StateKey::Campaign(*recipe), &name, campaign.arn(), ResourceStatus::CreatePending)
            .await?;
        campaigns.push((StateKey::Campaign(*recipe), campaign.into_arn()));
    }

    let campaign_arns: Vec<String> = campaigns.iter().map(|(_, arn)| arn.clone()).collect();
    let report = batch_poller(config)
        .wait_for(api, ResourceKind::Campaign, &campaign_arns)
        .await
        .context("Failed to read campaign status")?;
    let mut failures = record_report(pool, &campaigns, &report).await?;

    // Filter
    let expression = FilterExpression::exclude_purchased([ORDER_COMPLETED_EVENT])?;
    let base_name = config.resource_name("filter-purchased-products");
    let (filter_name, filter) = ensure_replacing_failed(api, &base_name, |name| CreateRequest::Filter {
        name: name.to_string(),
        dataset_group_arn: group_arn.clone(),
        expression: expression.clone(),
    })
    .await
    .context("Failed to create filter")?;
    record(pool, StateKey::Filter, &filter_name, filter.arn(), ResourceStatus::CreatePending).await?;

    let outcome = single_poller(config)
        .wait_one(filter.arn(), move |arn| async move {
            api.describe(ResourceKind::Filter, &arn).await
        })
        .await
        .context("Failed to read filter status")?;
    record_outcome(pool, StateKey::Filter, &outcome).await?;
    if outcome != PollOutcome::Succeeded {
        failures.push((StateKey::Filter, outcome));
    }

    if !failures.is_empty() {
        return Err(failure_error(STAGE, &failures));
    }

    info!(dataset_group = %group_arn, "Training layer complete");

    Ok(())
}

/// Fails unless every import job recorded by the data layer is active.
async fn ensure_imports_completed(pool: &SqlitePool) -> Result<()> {
    for dataset_type in DatasetType::all() {
        let key = StateKey::ImportJob(dataset_type);
        let stored = find_resource(pool, key)
            .await
            .with_context(|| format!("Failed to read {key} from state store"))?;

        match stored.as_ref().and_then(|stored| stored.resource_status()) {
            Some(ResourceStatus::Active) => {}
            Some(status) => anyhow::bail!(
                "{key} is {status}; rerun the `{}` stage until it completes",
                key.written_by()
            ),
            None => anyhow::bail!("No {key} recorded; run the `{}` stage first", key.written_by()),
        }
    }

    Ok(())
}

/// One row per metric, one column per recipe.
fn metrics_table(metrics: &BTreeMap<Recipe, BTreeMap<String, f64>>) -> Table {
    let names: BTreeSet<&str> = metrics
        .values()
        .flat_map(|values| values.keys().map(String::as_str))
        .collect();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec!["METRIC".to_string()];
    header.extend(metrics.keys().map(ToString::to_string));
    table.set_header(header);

    for name in names {
        let mut row = vec![name.to_string()];
        row.extend(metrics.values().map(|values| {
            values
                .get(name)
                .map_or_else(|| "-".to_string(), |value| format!("{value:.4}"))
        }));
        table.add_row(row);
    }

    table
}
