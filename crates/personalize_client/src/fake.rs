//! In-memory stand-ins for the remote APIs, used by tests across the workspace.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use personalize_structs::{ResourceKind, ResourceState, ResourceStatus};
use serde_json::Value;

use crate::access::{AccessProvisioner, RoleHandle};
use crate::api::PersonalizeApi;
use crate::api::models::{CreateRequest, ResourceSummary};
use crate::error::{ApiError, ApiResult};

const ARN_PREFIX: &str = "arn:aws:personalize:us-east-1:000000000000";

#[derive(Debug, Clone)]
struct FakeResource {
    kind: ResourceKind,
    name: String,
    parent_arn: Option<String>,
    arn: String,
    created_at: i64,
}

#[derive(Default)]
struct FakeState {
    resources: Vec<FakeResource>,
    scripts: HashMap<String, VecDeque<ResourceState>>,
    default_states: HashMap<ResourceKind, ResourceState>,
    create_calls: Vec<CreateRequest>,
    create_failures: HashMap<String, ApiError>,
    metrics: BTreeMap<String, f64>,
}

/// In-memory [`PersonalizeApi`].
///
/// Resources become `ACTIVE` on their first describe unless a script or a
/// per-kind default says otherwise. Listings report the last scripted state.
/// Names are unique per kind and parent.
#[derive(Default)]
pub struct FakePersonalize {
    state: Mutex<FakeState>,
}

impl FakePersonalize {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state poisoned")
    }

    /// Queues the states returned by successive describes of `arn`.
    ///
    /// The last state repeats once the queue is drained.
    pub fn script(&self, arn: &str, states: impl IntoIterator<Item = ResourceState>) {
        self.lock()
            .scripts
            .insert(arn.to_string(), states.into_iter().collect());
    }

    /// Sets the state every unscripted resource of `kind` reports.
    pub fn set_default_state(&self, kind: ResourceKind, state: ResourceState) {
        self.lock().default_states.insert(kind, state);
    }

    /// Makes every create call for `name` fail with `error`.
    pub fn fail_create(&self, name: &str, error: ApiError) {
        self.lock().create_failures.insert(name.to_string(), error);
    }

    /// Sets the metrics returned for every solution version.
    pub fn set_metrics(&self, metrics: BTreeMap<String, f64>) {
        self.lock().metrics = metrics;
    }

    /// Registers a resource as if an earlier run had created it.
    pub fn seed(&self, kind: ResourceKind, name: &str, parent_arn: Option<&str>) -> String {
        let mut state = self.lock();
        let arn = Self::next_arn(&state, kind, name, parent_arn);
        let created_at = state.resources.len() as i64;
        state.resources.push(FakeResource {
            kind,
            name: name.to_string(),
            parent_arn: parent_arn.map(str::to_string),
            arn: arn.clone(),
            created_at,
        });
        arn
    }

    /// Create calls received so far, in order.
    #[must_use]
    pub fn create_calls(&self) -> Vec<CreateRequest> {
        self.lock().create_calls.clone()
    }

    /// Number of resources of `kind` that exist.
    #[must_use]
    pub fn count(&self, kind: ResourceKind) -> usize {
        self.lock()
            .resources
            .iter()
            .filter(|resource| resource.kind == kind)
            .count()
    }

    fn next_arn(state: &FakeState, kind: ResourceKind, name: &str, parent_arn: Option<&str>) -> String {
        match (kind, parent_arn) {
            (ResourceKind::SolutionVersion, Some(solution_arn)) => {
                let versions = state
                    .resources
                    .iter()
                    .filter(|resource| resource.kind == kind && resource.parent_arn.as_deref() == parent_arn)
                    .count();
                format!("{solution_arn}/v{}", versions + 1)
            }
            _ => format!("{ARN_PREFIX}:{kind}/{name}"),
        }
    }
}

#[async_trait]
impl PersonalizeApi for FakePersonalize {
    async fn create(&self, request: &CreateRequest) -> ApiResult<String> {
        let mut state = self.lock();
        state.create_calls.push(request.clone());

        if let Some(error) = state.create_failures.get(request.name()) {
            return Err(error.clone());
        }

        let kind = request.kind();
        let name = request.name();
        let parent_arn = request.parent_arn();

        let exists = kind != ResourceKind::SolutionVersion
            && state.resources.iter().any(|resource| {
                resource.kind == kind
                    && resource.name == name
                    && resource.parent_arn.as_deref() == parent_arn
            });
        if exists {
            return Err(ApiError::AlreadyExists(format!("{kind} {name} already exists")));
        }

        let arn = Self::next_arn(&state, kind, name, parent_arn);
        let created_at = state.resources.len() as i64;
        state.resources.push(FakeResource {
            kind,
            name: name.to_string(),
            parent_arn: parent_arn.map(str::to_string),
            arn: arn.clone(),
            created_at,
        });

        Ok(arn)
    }

    async fn describe(&self, kind: ResourceKind, arn: &str) -> ApiResult<ResourceState> {
        let mut state = self.lock();

        if !state.resources.iter().any(|resource| resource.arn == arn) {
            return Err(ApiError::NotFound(arn.to_string()));
        }

        if let Some(script) = state.scripts.get_mut(arn)
            && let Some(next) = script.front().cloned()
        {
            if script.len() > 1 {
                script.pop_front();
            }
            return Ok(next);
        }

        Ok(state
            .default_states
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| ResourceState::new(ResourceStatus::Active)))
    }

    async fn list(
        &self,
        kind: ResourceKind,
        parent_arn: Option<&str>,
    ) -> ApiResult<Vec<ResourceSummary>> {
        let state = self.lock();

        Ok(state
            .resources
            .iter()
            .filter(|resource| {
                resource.kind == kind
                    && (parent_arn.is_none() || resource.parent_arn.as_deref() == parent_arn)
            })
            .map(|resource| {
                let status = state
                    .scripts
                    .get(&resource.arn)
                    .and_then(|script| script.back())
                    .or_else(|| state.default_states.get(&resource.kind))
                    .map_or(ResourceStatus::Active, |last| last.status.clone());
                ResourceSummary::new(&resource.name, &resource.arn)
                    .with_status(status)
                    .with_created_at(resource.created_at)
            })
            .collect())
    }

    async fn solution_metrics(&self, solution_version_arn: &str) -> ApiResult<BTreeMap<String, f64>> {
        let state = self.lock();

        if !state.resources.iter().any(|resource| resource.arn == solution_version_arn) {
            return Err(ApiError::NotFound(solution_version_arn.to_string()));
        }

        Ok(state.metrics.clone())
    }
}

#[derive(Default)]
struct AccessState {
    buckets: Vec<String>,
    policies: HashMap<String, Value>,
    roles: HashMap<String, String>,
}

/// In-memory [`AccessProvisioner`].
#[derive(Default)]
pub struct FakeAccess {
    state: Mutex<AccessState>,
}

impl FakeAccess {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AccessState> {
        self.state.lock().expect("fake state poisoned")
    }

    /// Policy currently applied to `bucket`.
    #[must_use]
    pub fn bucket_policy(&self, bucket: &str) -> Option<Value> {
        self.lock().policies.get(bucket).cloned()
    }

    #[must_use]
    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.lock().buckets.iter().any(|existing| existing == bucket)
    }
}

#[async_trait]
impl AccessProvisioner for FakeAccess {
    async fn ensure_bucket(&self, bucket: &str) -> ApiResult<()> {
        let mut state = self.lock();
        if !state.buckets.iter().any(|existing| existing == bucket) {
            state.buckets.push(bucket.to_string());
        }
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &Value) -> ApiResult<()> {
        self.lock().policies.insert(bucket.to_string(), policy.clone());
        Ok(())
    }

    async fn ensure_role(
        &self,
        role_name: &str,
        _trust_policy: &Value,
        _managed_policies: &[&str],
    ) -> ApiResult<RoleHandle> {
        let mut state = self.lock();

        if let Some(arn) = state.roles.get(role_name) {
            return Ok(RoleHandle {
                arn: arn.clone(),
                created: false,
            });
        }

        let arn = format!("arn:aws:iam::000000000000:role/{role_name}");
        state.roles.insert(role_name.to_string(), arn.clone());

        Ok(RoleHandle { arn, created: true })
    }
}
