//! Create-or-reuse for named remote resources.

use personalize_client::{ApiError, ApiResult, CreateRequest, PersonalizeApi, ResourceSummary};
use personalize_structs::{ResourceKind, ResourceStatus};
use tracing::{info, warn};

/// A resource ARN and whether this run created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensured {
    Created(String),
    Existing(String),
}

impl Ensured {
    #[must_use]
    pub fn arn(&self) -> &str {
        match self {
            Self::Created(arn) | Self::Existing(arn) => arn,
        }
    }

    #[must_use]
    pub fn into_arn(self) -> String {
        match self {
            Self::Created(arn) | Self::Existing(arn) => arn,
        }
    }

    #[must_use]
    pub const fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Highest name suffix tried when replacing resources that failed to create.
const MAX_NAME_ATTEMPTS: u32 = 10;

/// Issues `request`; if the name is taken, resolves the existing resource
/// by listing its kind under the same parent.
///
/// # Errors
///
/// Returns any create error other than "already exists", any list error, or
/// [`ApiError::NotFound`] if the listing does not contain the name.
pub async fn ensure_resource<A>(api: &A, request: &CreateRequest) -> ApiResult<Ensured>
where
    A: PersonalizeApi + ?Sized,
{
    let kind = request.kind();
    let name = request.name();

    match api.create(request).await {
        Ok(arn) => {
            info!(%kind, name, arn = %arn, "Created resource");
            Ok(Ensured::Created(arn))
        }
        Err(ApiError::AlreadyExists(_)) => {
            let existing = find_listed(api, request).await?;
            info!(%kind, name, arn = %existing.arn, "Reusing existing resource");
            Ok(Ensured::Existing(existing.arn))
        }
        Err(error) => Err(error),
    }
}

/// Like [`ensure_resource`], but a same-named resource that failed to create
/// is left behind and a new one is created under the next free name
/// (`name-2`, `name-3`, ...).
///
/// `build` turns a candidate name into its create request. Returns the name
/// that was used together with the resource.
///
/// # Errors
///
/// Returns any create or list error, and [`ApiError::LimitExceeded`] once
/// every candidate name is held by a failed resource.
pub async fn ensure_replacing_failed<A, F>(
    api: &A,
    base_name: &str,
    mut build: F,
) -> ApiResult<(String, Ensured)>
where
    A: PersonalizeApi + ?Sized,
    F: FnMut(&str) -> CreateRequest,
{
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let name = candidate_name(base_name, attempt);
        let request = build(&name);
        let kind = request.kind();

        match api.create(&request).await {
            Ok(arn) => {
                info!(%kind, name = %name, arn = %arn, "Created resource");
                return Ok((name, Ensured::Created(arn)));
            }
            Err(ApiError::AlreadyExists(_)) => {
                let existing = find_listed(api, &request).await?;
                if existing.status == Some(ResourceStatus::CreateFailed) {
                    warn!(%kind, name = %name, arn = %existing.arn, "Existing resource failed to create, replacing it");
                    continue;
                }

                info!(%kind, name = %name, arn = %existing.arn, "Reusing existing resource");
                return Ok((name, Ensured::Existing(existing.arn)));
            }
            Err(error) => return Err(error),
        }
    }

    Err(ApiError::LimitExceeded(format!(
        "{base_name} and its {} replacements all failed to create",
        MAX_NAME_ATTEMPTS - 1
    )))
}

fn candidate_name(base_name: &str, attempt: u32) -> String {
    if attempt == 1 {
        base_name.to_string()
    } else {
        format!("{base_name}-{attempt}")
    }
}

/// Finds the listed resource carrying the request's name.
async fn find_listed<A>(api: &A, request: &CreateRequest) -> ApiResult<ResourceSummary>
where
    A: PersonalizeApi + ?Sized,
{
    let kind = request.kind();
    let name = request.name();

    api.list(kind, request.parent_arn())
        .await?
        .into_iter()
        .find(|summary| summary.name == name)
        .ok_or_else(|| ApiError::NotFound(format!("{kind} {name} exists but is not listed")))
}

/// Ensures a trained version exists for `solution`.
///
/// A solution this run created always gets a fresh version. For a reused
/// solution, the newest version that has not failed is reused instead of
/// training again.
///
/// # Errors
///
/// Returns any list or create error.
pub async fn ensure_solution_version<A>(api: &A, solution: &Ensured) -> ApiResult<Ensured>
where
    A: PersonalizeApi + ?Sized,
{
    let solution_arn = solution.arn();

    if !solution.was_created() {
        let mut versions = api
            .list(ResourceKind::SolutionVersion, Some(solution_arn))
            .await?;
        versions.retain(|version| version.status != Some(ResourceStatus::CreateFailed));
        versions.sort_by_key(|version| core::cmp::Reverse(version.created_at));

        if let Some(latest) = versions.into_iter().next() {
            info!(solution_arn, arn = %latest.arn, "Reusing existing solution version");
            return Ok(Ensured::Existing(latest.arn));
        }
    }

    let request = CreateRequest::SolutionVersion {
        solution_arn: solution_arn.to_string(),
    };
    let arn = api.create(&request).await?;
    info!(solution_arn, arn = %arn, "Started training solution version");

    Ok(Ensured::Created(arn))
}
