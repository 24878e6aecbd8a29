//! The typed `extensions/v1beta1` Deployment resource.
//!
//! [`k8s_openapi`] only ships `apps/v1` Deployments, which dropped `rollbackTo`. The spec is
//! therefore modelled here, while the nested structures that are shared between API versions
//! (selectors, strategies, pod templates, status) are re-used from [`k8s_openapi`].
use k8s_openapi::{
    NamespaceResourceScope,
    api::{apps::v1::DeploymentStrategy, core::v1::PodTemplateSpec},
    apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta},
};
use serde::{Deserialize, Serialize};

pub use k8s_openapi::api::apps::v1::{
    DeploymentCondition, DeploymentStatus, RollingUpdateDeployment,
};

const GROUP: &str = "extensions";
const VERSION: &str = "v1beta1";
const KIND: &str = "Deployment";

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: DeploymentSpec,

    /// Most recently observed status, owned by the API server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DeploymentStatus>,
}

impl Deployment {
    pub fn new(metadata: ObjectMeta, spec: DeploymentSpec) -> Self {
        Self {
            metadata,
            spec,
            ..Self::default()
        }
    }
}

impl Default for Deployment {
    fn default() -> Self {
        Self {
            api_version: <Self as k8s_openapi::Resource>::API_VERSION.to_owned(),
            kind: KIND.to_owned(),
            metadata: ObjectMeta::default(),
            spec: DeploymentSpec::default(),
            status: None,
        }
    }
}

impl k8s_openapi::Resource for Deployment {
    type Scope = NamespaceResourceScope;

    const API_VERSION: &'static str = "extensions/v1beta1";
    const GROUP: &'static str = GROUP;
    const KIND: &'static str = KIND;
    const URL_PATH_SEGMENT: &'static str = "deployments";
    const VERSION: &'static str = VERSION;
}

impl k8s_openapi::Metadata for Deployment {
    type Ty = ObjectMeta;

    fn metadata(&self) -> &Self::Ty {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Self::Ty {
        &mut self.metadata
    }
}

/// The desired state of a [`Deployment`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    /// Number of desired pods. [`None`] lets the API server apply its default, which is
    /// different from an explicit zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,

    #[serde(default)]
    pub template: PodTemplateSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<DeploymentStrategy>,

    #[serde(default)]
    pub min_ready_seconds: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_history_limit: Option<i32>,

    #[serde(default)]
    pub paused: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_to: Option<RollbackConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_deadline_seconds: Option<i32>,
}

/// The revision a [`Deployment`] is rolled back to. A revision of `0` means the last revision.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackConfig {
    #[serde(default)]
    pub revision: i64,
}
