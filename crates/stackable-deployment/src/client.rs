//! Access to Deployments on the API server.
//!
//! The lifecycle functions in [`crate::resource`] are written against the [`DeploymentClient`]
//! trait, [`KubeDeploymentClient`] implements it on top of a [`kube::Client`].
use async_trait::async_trait;
use kube::{
    Api,
    api::{DeleteParams, Patch, PatchParams, PostParams},
};
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::debug;

use crate::deployment::Deployment;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum ClientError {
    #[snafu(display("deployment {namespace}/{name} not found"))]
    NotFound { namespace: String, name: String },

    #[snafu(display("failed to {verb} deployment {namespace}/{name}"))]
    Request {
        source: kube::Error,
        verb: &'static str,
        namespace: String,
        name: String,
    },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// The calls the resource lifecycle needs from the API server.
///
/// Implementations own timeouts and retries. Errors returned from here are passed through the
/// lifecycle unchanged.
#[async_trait]
pub trait DeploymentClient: Send + Sync {
    /// Creates the Deployment in `namespace` and returns the object as stored by the server.
    async fn create(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment>;

    /// Returns [`ClientError::NotFound`] if the Deployment doesn't exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Deployment>;

    /// Applies an `application/json-patch+json` patch.
    async fn patch(&self, namespace: &str, name: &str, patch: json_patch::Patch)
    -> Result<Deployment>;

    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}

/// A [`DeploymentClient`] backed by a [`kube::Client`].
#[derive(Clone)]
pub struct KubeDeploymentClient {
    client: kube::Client,
    post_params: PostParams,
    patch_params: PatchParams,
    delete_params: DeleteParams,
}

impl KubeDeploymentClient {
    pub fn new(client: kube::Client, field_manager: Option<String>) -> Self {
        Self {
            client,
            post_params: PostParams {
                field_manager: field_manager.clone(),
                ..PostParams::default()
            },
            patch_params: PatchParams {
                field_manager,
                ..PatchParams::default()
            },
            delete_params: DeleteParams::default(),
        }
    }

    /// Returns the underlying [`kube::Client`].
    pub fn as_kube_client(&self) -> kube::Client {
        self.client.clone()
    }

    fn api(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl DeploymentClient for KubeDeploymentClient {
    async fn create(&self, namespace: &str, deployment: &Deployment) -> Result<Deployment> {
        self.api(namespace)
            .create(&self.post_params, deployment)
            .await
            .with_context(|_| RequestSnafu {
                verb: "create",
                namespace,
                name: deployment.metadata.name.clone().unwrap_or_default(),
            })
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Deployment> {
        self.api(namespace)
            .get_opt(name)
            .await
            .with_context(|_| RequestSnafu {
                verb: "get",
                namespace,
                name,
            })?
            .context(NotFoundSnafu { namespace, name })
    }

    async fn patch(
        &self,
        namespace: &str,
        name: &str,
        patch: json_patch::Patch,
    ) -> Result<Deployment> {
        debug!(operations = patch.0.len(), "sending json patch");

        self.api(namespace)
            .patch(name, &self.patch_params, &Patch::Json::<()>(patch))
            .await
            .with_context(|_| RequestSnafu {
                verb: "patch",
                namespace,
                name,
            })
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        self.api(namespace)
            .delete(name, &self.delete_params)
            .await
            .with_context(|_| RequestSnafu {
                verb: "delete",
                namespace,
                name,
            })?;

        Ok(())
    }
}
