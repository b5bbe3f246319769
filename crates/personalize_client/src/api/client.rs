//! Rate-limited client for the recommendation service API.

use core::future::Future;
use core::num::NonZeroU32;
use core::time::Duration;
use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_personalize::Client;
use aws_sdk_personalize::operation::list_campaigns::ListCampaignsOutput;
use aws_sdk_personalize::operation::list_dataset_groups::ListDatasetGroupsOutput;
use aws_sdk_personalize::operation::list_dataset_import_jobs::ListDatasetImportJobsOutput;
use aws_sdk_personalize::operation::list_datasets::ListDatasetsOutput;
use aws_sdk_personalize::operation::list_filters::ListFiltersOutput;
use aws_sdk_personalize::operation::list_schemas::ListSchemasOutput;
use aws_sdk_personalize::operation::list_solution_versions::ListSolutionVersionsOutput;
use aws_sdk_personalize::operation::list_solutions::ListSolutionsOutput;
use aws_sdk_personalize::types::DataSource;
use backon::{ExponentialBuilder, Retryable};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use personalize_structs::{ResourceKind, ResourceState, ResourceStatus};
use tracing::{debug, info, warn};

use super::PersonalizeApi;
use super::models::{CreateRequest, ResourceSummary};
use crate::error::{ApiError, ApiResult, classify};

/// Rate limit: 5 requests per second
const REQUESTS_PER_SECOND: NonZeroU32 = NonZeroU32::new(5).unwrap();

/// Retries after the first throttled attempt
const MAX_RETRIES: usize = 5;

/// Page size for list calls
const PAGE_SIZE: i32 = 100;

type RateLimiterType = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate-limited client for the recommendation service.
pub struct AwsPersonalizeClient {
    client: Client,
    limiter: RateLimiterType,
}

impl AwsPersonalizeClient {
    /// Creates a new client with rate limiting.
    #[must_use]
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self::from_client(Client::new(sdk_config))
    }

    /// Wraps an already configured SDK client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            limiter: RateLimiter::direct(Quota::per_second(REQUESTS_PER_SECOND)),
        }
    }

    /// Runs one API call behind the rate limiter, retrying on throttling.
    async fn call<T, F, Fut>(&self, operation: &'static str, request: F) -> ApiResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let limiter = &self.limiter;
        let attempt = || {
            let response = request();
            async move {
                limiter.until_ready().await;
                response.await
            }
        };

        attempt
            .retry(
                ExponentialBuilder::default()
                    .with_max_times(MAX_RETRIES)
                    .with_min_delay(Duration::from_secs(1))
                    .with_max_delay(Duration::from_secs(16)),
            )
            .when(ApiError::is_retryable)
            .notify(|error: &ApiError, delay: Duration| {
                warn!(operation, delay_ms = delay.as_millis(), %error, "Throttled, will retry");
            })
            .await
    }

    /// Follows `nextToken` until every page of a list call is collected.
    async fn collect_pages<O, F, Fut, X>(
        &self,
        operation: &'static str,
        fetch: F,
        extract: X,
    ) -> ApiResult<Vec<ResourceSummary>>
    where
        F: Fn(Option<String>) -> Fut,
        Fut: Future<Output = ApiResult<O>>,
        X: Fn(&O) -> (Vec<ResourceSummary>, Option<String>),
    {
        let mut summaries = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let token = next_token.take();
            let output = self.call(operation, || fetch(token.clone())).await?;
            let (page, next) = extract(&output);
            summaries.extend(page);

            match next {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        debug!(operation, count = summaries.len(), "Listed resources");

        Ok(summaries)
    }
}

fn required_arn(arn: Option<&str>, field: &'static str) -> ApiResult<String> {
    arn.map(str::to_string).ok_or(ApiError::MissingField(field))
}

fn state_of(status: Option<&str>, failure_reason: Option<&str>) -> ApiResult<ResourceState> {
    let status = status.ok_or(ApiError::MissingField("status"))?;

    Ok(ResourceState {
        status: ResourceStatus::from_api_string(status),
        failure_reason: failure_reason.map(str::to_string),
    })
}

fn summary(name: Option<&str>, arn: Option<&str>, status: Option<&str>) -> Option<ResourceSummary> {
    let summary = ResourceSummary::new(name?, arn?);
    Some(match status {
        Some(status) => summary.with_status(ResourceStatus::from_api_string(status)),
        None => summary,
    })
}

#[async_trait]
impl PersonalizeApi for AwsPersonalizeClient {
    async fn create(&self, request: &CreateRequest) -> ApiResult<String> {
        info!(kind = %request.kind(), name = request.name(), "Creating resource");

        let arn = match request {
            CreateRequest::Schema { name, schema } => {
                let definition = schema
                    .to_json()
                    .map_err(|error| ApiError::InvalidInput(error.to_string()))?;
                let definition = definition.as_str();
                let output = self
                    .call("CreateSchema", || async move {
                        self.client
                            .create_schema()
                            .name(name)
                            .schema(definition)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                required_arn(output.schema_arn(), "schemaArn")?
            }
            CreateRequest::DatasetGroup { name } => {
                let output = self
                    .call("CreateDatasetGroup", || async move {
                        self.client
                            .create_dataset_group()
                            .name(name)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                required_arn(output.dataset_group_arn(), "datasetGroupArn")?
            }
            CreateRequest::Dataset {
                name,
                dataset_group_arn,
                schema_arn,
                dataset_type,
            } => {
                let output = self
                    .call("CreateDataset", || async move {
                        self.client
                            .create_dataset()
                            .name(name)
                            .dataset_group_arn(dataset_group_arn)
                            .schema_arn(schema_arn)
                            .dataset_type(dataset_type.as_api_string())
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                required_arn(output.dataset_arn(), "datasetArn")?
            }
            CreateRequest::DatasetImportJob {
                name,
                dataset_arn,
                data_location,
                role_arn,
            } => {
                let output = self
                    .call("CreateDatasetImportJob", || async move {
                        self.client
                            .create_dataset_import_job()
                            .job_name(name)
                            .dataset_arn(dataset_arn)
                            .data_source(DataSource::builder().data_location(data_location).build())
                            .role_arn(role_arn)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                required_arn(output.dataset_import_job_arn(), "datasetImportJobArn")?
            }
            CreateRequest::Solution {
                name,
                dataset_group_arn,
                recipe,
            } => {
                let recipe_arn = recipe.arn();
                let recipe_arn = recipe_arn.as_str();
                let output = self
                    .call("CreateSolution", || async move {
                        self.client
                            .create_solution()
                            .name(name)
                            .dataset_group_arn(dataset_group_arn)
                            .recipe_arn(recipe_arn)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                required_arn(output.solution_arn(), "solutionArn")?
            }
            CreateRequest::SolutionVersion { solution_arn } => {
                let output = self
                    .call("CreateSolutionVersion", || async move {
                        self.client
                            .create_solution_version()
                            .solution_arn(solution_arn)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                required_arn(output.solution_version_arn(), "solutionVersionArn")?
            }
            CreateRequest::Campaign {
                name,
                solution_version_arn,
                min_provisioned_tps,
            } => {
                let min_provisioned_tps = *min_provisioned_tps;
                let output = self
                    .call("CreateCampaign", || async move {
                        self.client
                            .create_campaign()
                            .name(name)
                            .solution_version_arn(solution_version_arn)
                            .min_provisioned_tps(min_provisioned_tps)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                required_arn(output.campaign_arn(), "campaignArn")?
            }
            CreateRequest::Filter {
                name,
                dataset_group_arn,
                expression,
            } => {
                let expression = expression.to_string();
                let expression = expression.as_str();
                let output = self
                    .call("CreateFilter", || async move {
                        self.client
                            .create_filter()
                            .name(name)
                            .dataset_group_arn(dataset_group_arn)
                            .filter_expression(expression)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                required_arn(output.filter_arn(), "filterArn")?
            }
        };

        debug!(kind = %request.kind(), arn = %arn, "Create call returned");

        Ok(arn)
    }

    async fn describe(&self, kind: ResourceKind, arn: &str) -> ApiResult<ResourceState> {
        match kind {
            // Usable as soon as the create call returns.
            ResourceKind::Schema | ResourceKind::Role => Ok(ResourceState::new(ResourceStatus::Active)),
            ResourceKind::DatasetGroup => {
                let output = self
                    .call("DescribeDatasetGroup", || async move {
                        self.client
                            .describe_dataset_group()
                            .dataset_group_arn(arn)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                let group = output
                    .dataset_group()
                    .ok_or(ApiError::MissingField("datasetGroup"))?;
                state_of(group.status(), group.failure_reason())
            }
            ResourceKind::Dataset => {
                let output = self
                    .call("DescribeDataset", || async move {
                        self.client
                            .describe_dataset()
                            .dataset_arn(arn)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                let dataset = output.dataset().ok_or(ApiError::MissingField("dataset"))?;
                state_of(dataset.status(), None)
            }
            ResourceKind::DatasetImportJob => {
                let output = self
                    .call("DescribeDatasetImportJob", || async move {
                        self.client
                            .describe_dataset_import_job()
                            .dataset_import_job_arn(arn)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                let job = output
                    .dataset_import_job()
                    .ok_or(ApiError::MissingField("datasetImportJob"))?;
                state_of(job.status(), job.failure_reason())
            }
            ResourceKind::Solution => {
                let output = self
                    .call("DescribeSolution", || async move {
                        self.client
                            .describe_solution()
                            .solution_arn(arn)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                let solution = output.solution().ok_or(ApiError::MissingField("solution"))?;
                state_of(solution.status(), None)
            }
            ResourceKind::SolutionVersion => {
                let output = self
                    .call("DescribeSolutionVersion", || async move {
                        self.client
                            .describe_solution_version()
                            .solution_version_arn(arn)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                let version = output
                    .solution_version()
                    .ok_or(ApiError::MissingField("solutionVersion"))?;
                state_of(version.status(), version.failure_reason())
            }
            ResourceKind::Campaign => {
                let output = self
                    .call("DescribeCampaign", || async move {
                        self.client
                            .describe_campaign()
                            .campaign_arn(arn)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                let campaign = output.campaign().ok_or(ApiError::MissingField("campaign"))?;
                state_of(campaign.status(), campaign.failure_reason())
            }
            ResourceKind::Filter => {
                let output = self
                    .call("DescribeFilter", || async move {
                        self.client
                            .describe_filter()
                            .filter_arn(arn)
                            .send()
                            .await
                            .map_err(classify)
                    })
                    .await?;
                let filter = output.filter().ok_or(ApiError::MissingField("filter"))?;
                state_of(filter.status(), filter.failure_reason())
            }
        }
    }

    async fn list(
        &self,
        kind: ResourceKind,
        parent_arn: Option<&str>,
    ) -> ApiResult<Vec<ResourceSummary>> {
        let parent = parent_arn.map(str::to_string);
        let parent = &parent;

        match kind {
            ResourceKind::Schema => {
                self.collect_pages(
                    "ListSchemas",
                    |token| async move {
                        self.client
                            .list_schemas()
                            .set_next_token(token)
                            .max_results(PAGE_SIZE)
                            .send()
                            .await
                            .map_err(classify)
                    },
                    |output: &ListSchemasOutput| {
                        let page = output
                            .schemas()
                            .iter()
                            .filter_map(|schema| summary(schema.name(), schema.schema_arn(), None))
                            .collect();
                        (page, output.next_token().map(str::to_string))
                    },
                )
                .await
            }
            ResourceKind::DatasetGroup => {
                self.collect_pages(
                    "ListDatasetGroups",
                    |token| async move {
                        self.client
                            .list_dataset_groups()
                            .set_next_token(token)
                            .max_results(PAGE_SIZE)
                            .send()
                            .await
                            .map_err(classify)
                    },
                    |output: &ListDatasetGroupsOutput| {
                        let page = output
                            .dataset_groups()
                            .iter()
                            .filter_map(|group| {
                                summary(group.name(), group.dataset_group_arn(), group.status())
                            })
                            .collect();
                        (page, output.next_token().map(str::to_string))
                    },
                )
                .await
            }
            ResourceKind::Dataset => {
                self.collect_pages(
                    "ListDatasets",
                    |token| async move {
                        self.client
                            .list_datasets()
                            .set_dataset_group_arn(parent.clone())
                            .set_next_token(token)
                            .max_results(PAGE_SIZE)
                            .send()
                            .await
                            .map_err(classify)
                    },
                    |output: &ListDatasetsOutput| {
                        let page = output
                            .datasets()
                            .iter()
                            .filter_map(|dataset| {
                                summary(dataset.name(), dataset.dataset_arn(), dataset.status())
                            })
                            .collect();
                        (page, output.next_token().map(str::to_string))
                    },
                )
                .await
            }
            ResourceKind::DatasetImportJob => {
                self.collect_pages(
                    "ListDatasetImportJobs",
                    |token| async move {
                        self.client
                            .list_dataset_import_jobs()
                            .set_dataset_arn(parent.clone())
                            .set_next_token(token)
                            .max_results(PAGE_SIZE)
                            .send()
                            .await
                            .map_err(classify)
                    },
                    |output: &ListDatasetImportJobsOutput| {
                        let page = output
                            .dataset_import_jobs()
                            .iter()
                            .filter_map(|job| {
                                summary(job.job_name(), job.dataset_import_job_arn(), job.status())
                            })
                            .collect();
                        (page, output.next_token().map(str::to_string))
                    },
                )
                .await
            }
            ResourceKind::Solution => {
                self.collect_pages(
                    "ListSolutions",
                    |token| async move {
                        self.client
                            .list_solutions()
                            .set_dataset_group_arn(parent.clone())
                            .set_next_token(token)
                            .max_results(PAGE_SIZE)
                            .send()
                            .await
                            .map_err(classify)
                    },
                    |output: &ListSolutionsOutput| {
                        let page = output
                            .solutions()
                            .iter()
                            .filter_map(|solution| {
                                summary(solution.name(), solution.solution_arn(), solution.status())
                            })
                            .collect();
                        (page, output.next_token().map(str::to_string))
                    },
                )
                .await
            }
            ResourceKind::SolutionVersion => {
                self.collect_pages(
                    "ListSolutionVersions",
                    |token| async move {
                        self.client
                            .list_solution_versions()
                            .set_solution_arn(parent.clone())
                            .set_next_token(token)
                            .max_results(PAGE_SIZE)
                            .send()
                            .await
                            .map_err(classify)
                    },
                    |output: &ListSolutionVersionsOutput| {
                        let page = output
                            .solution_versions()
                            .iter()
                            .filter_map(|version| {
                                // Versions are unnamed; the ARN doubles as the name.
                                let arn = version.solution_version_arn();
                                let summary = summary(arn, arn, version.status())?;
                                Some(match version.creation_date_time() {
                                    Some(created) => summary.with_created_at(created.secs()),
                                    None => summary,
                                })
                            })
                            .collect();
                        (page, output.next_token().map(str::to_string))
                    },
                )
                .await
            }
            ResourceKind::Campaign => {
                self.collect_pages(
                    "ListCampaigns",
                    |token| async move {
                        self.client
                            .list_campaigns()
                            .set_solution_arn(parent.clone())
                            .set_next_token(token)
                            .max_results(PAGE_SIZE)
                            .send()
                            .await
                            .map_err(classify)
                    },
                    |output: &ListCampaignsOutput| {
                        let page = output
                            .campaigns()
                            .iter()
                            .filter_map(|campaign| {
                                summary(campaign.name(), campaign.campaign_arn(), campaign.status())
                            })
                            .collect();
                        (page, output.next_token().map(str::to_string))
                    },
                )
                .await
            }
            ResourceKind::Filter => {
                self.collect_pages(
                    "ListFilters",
                    |token| async move {
                        self.client
                            .list_filters()
                            .set_dataset_group_arn(parent.clone())
                            .set_next_token(token)
                            .max_results(PAGE_SIZE)
                            .send()
                            .await
                            .map_err(classify)
                    },
                    |output: &ListFiltersOutput| {
                        let page = output
                            .filters()
                            .iter()
                            .filter_map(|filter| {
                                summary(filter.name(), filter.filter_arn(), filter.status())
                            })
                            .collect();
                        (page, output.next_token().map(str::to_string))
                    },
                )
                .await
            }
            ResourceKind::Role => Err(ApiError::InvalidInput(
                "roles are not listed by the recommendation service".to_string(),
            )),
        }
    }

    async fn solution_metrics(&self, solution_version_arn: &str) -> ApiResult<BTreeMap<String, f64>> {
        let output = self
            .call("GetSolutionMetrics", || async move {
                self.client
                    .get_solution_metrics()
                    .solution_version_arn(solution_version_arn)
                    .send()
                    .await
                    .map_err(classify)
            })
            .await?;

        Ok(output
            .metrics()
            .map(|metrics| {
                metrics
                    .iter()
                    .map(|(name, value)| (name.clone(), *value))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_of() {
        let state = state_of(Some("CREATE FAILED"), Some("schema mismatch")).unwrap();
        assert_eq!(state, ResourceState::failed("schema mismatch"));

        assert_eq!(state_of(None, None), Err(ApiError::MissingField("status")));
    }

    #[test]
    fn test_summary_requires_name_and_arn() {
        assert!(summary(None, Some("arn"), None).is_none());
        assert!(summary(Some("name"), None, None).is_none());

        let entry = summary(Some("name"), Some("arn"), Some("ACTIVE")).unwrap();
        assert_eq!(entry.status, Some(ResourceStatus::Active));
    }
}
