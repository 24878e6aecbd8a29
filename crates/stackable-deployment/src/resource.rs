//! Create, read, update and delete a Deployment described by a configuration tree.
//!
//! The root of the configuration has three blocks:
//!
//! ```yaml
//! metadata:
//!   - name: web
//!     namespace: default
//! spec:
//!   - replicas: 3
//! status:
//!   - replicas: 3  # read-only, populated from the server
//! ```
//!
//! Creation sends the fully expanded object, updates only send a JSON patch with the fields that
//! changed between the original and the proposed configuration. The status block is never sent.
use std::{fmt::Display, str::FromStr};

use json_patch::jsonptr::Pointer;
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tracing::{debug, info, instrument};

use crate::{
    client::{ClientError, DeploymentClient},
    deployment::Deployment,
    mapper::{
        expand_deployment_spec, expand_metadata, flatten_deployment_spec,
        flatten_deployment_status, flatten_metadata,
    },
    patch::{self, BlockDiff, patch_deployment_spec, patch_metadata, serialize_patch},
    tree::{self, BlockReader, Tree, Value},
};

pub const METADATA: &str = "metadata";
pub const SPEC: &str = "spec";
pub const STATUS: &str = "status";

const DEFAULT_NAMESPACE: &str = "default";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to expand the configuration"))]
    Expand { source: tree::Error },

    #[snafu(display("failed to compare the original and the proposed configuration"))]
    Diff { source: tree::Error },

    #[snafu(display("failed to build the update patch for {id}"))]
    Patch { source: patch::Error, id: ResourceId },

    #[snafu(display("the API server returned a deployment without a name"))]
    MissingName,

    #[snafu(display("deployment API call failed"))]
    Client { source: ClientError },
}

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParseResourceIdError {
    #[snafu(display("unexpected id format {input:?}, expected \"namespace/name\""))]
    InvalidFormat { input: String },
}

/// Identifies a Deployment by namespace and name, written as `namespace/name`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl FromStr for ResourceId {
    type Err = ParseResourceIdError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parts = input.split('/').collect::<Vec<_>>();

        let [namespace, name] = parts[..] else {
            return InvalidFormatSnafu { input }.fail();
        };
        ensure!(
            !namespace.is_empty() && !name.is_empty(),
            InvalidFormatSnafu { input }
        );

        Ok(Self::new(namespace, name))
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{namespace}/{name}", namespace = self.namespace, name = self.name)
    }
}

/// A Deployment as known after a successful create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceState {
    pub id: ResourceId,
    pub config: Tree,
}

/// Flattens a Deployment into a root configuration tree with metadata, spec and status blocks.
pub fn flatten_deployment(deployment: &Deployment) -> Tree {
    let spec = flatten_deployment_spec(&deployment.spec);
    debug!(?spec, "flattened deployment spec");

    let status = flatten_deployment_status(&deployment.status.clone().unwrap_or_default());
    debug!(?status, "flattened deployment status");

    Tree::from([
        (
            METADATA.to_owned(),
            Value::List(flatten_metadata(&deployment.metadata)),
        ),
        (SPEC.to_owned(), Value::List(spec)),
        (STATUS.to_owned(), Value::List(status)),
    ])
}

/// Expands the metadata and spec blocks of a root configuration tree.
pub fn expand_deployment(config: &Tree) -> Result<Deployment, tree::Error> {
    let root = BlockReader::new(config);

    let metadata = expand_metadata(root.list(METADATA)?.unwrap_or_default())?;
    let spec = expand_deployment_spec(root.list(SPEC)?.unwrap_or_default())?;

    Ok(Deployment::new(metadata, spec))
}

#[instrument(skip_all)]
pub async fn create<C>(client: &C, config: &Tree) -> Result<ResourceState>
where
    C: DeploymentClient + ?Sized,
{
    let deployment = expand_deployment(config).context(ExpandSnafu)?;
    let namespace = deployment
        .metadata
        .namespace
        .clone()
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());

    info!(
        %namespace,
        name = deployment.metadata.name.as_deref(),
        "creating deployment"
    );
    let created = client
        .create(&namespace, &deployment)
        .await
        .context(ClientSnafu)?;

    let id = ResourceId {
        name: created.metadata.name.clone().context(MissingNameSnafu)?,
        namespace: created.metadata.namespace.clone().unwrap_or(namespace),
    };
    info!(%id, "submitted new deployment");

    let config = read(client, &id).await?;
    Ok(ResourceState { id, config })
}

#[instrument(skip_all, fields(%id))]
pub async fn read<C>(client: &C, id: &ResourceId) -> Result<Tree>
where
    C: DeploymentClient + ?Sized,
{
    info!("reading deployment");
    let deployment = client
        .get(&id.namespace, &id.name)
        .await
        .context(ClientSnafu)?;

    Ok(flatten_deployment(&deployment))
}

/// Sends the changes between `original` and `proposed` as a single JSON patch and returns the
/// configuration read back from the server.
///
/// Labels and annotations are patched key by key. The spec is only looked at if something inside
/// the spec block changed. If nothing changed at all, no patch is sent.
#[instrument(skip_all, fields(%id))]
pub async fn update<C>(
    client: &C,
    id: &ResourceId,
    original: &Tree,
    proposed: &Tree,
) -> Result<Tree>
where
    C: DeploymentClient + ?Sized,
{
    let metadata_diff = BlockDiff::from_field(original, proposed, METADATA).context(DiffSnafu)?;
    let mut operations = patch_metadata(Pointer::from_static("/metadata"), &metadata_diff)
        .with_context(|_| PatchSnafu { id: id.clone() })?;

    if BlockDiff::from_trees(original, proposed).has_changed(SPEC) {
        let spec_diff = BlockDiff::from_field(original, proposed, SPEC).context(DiffSnafu)?;
        operations.extend(
            patch_deployment_spec(Pointer::from_static("/spec"), &spec_diff)
                .with_context(|_| PatchSnafu { id: id.clone() })?,
        );
    }

    if operations.is_empty() {
        debug!("configuration unchanged, skipping update");
        return read(client, id).await;
    }

    let document = serialize_patch(&operations).with_context(|_| PatchSnafu { id: id.clone() })?;
    info!(
        patch = %String::from_utf8_lossy(&document),
        "updating deployment"
    );

    client
        .patch(&id.namespace, &id.name, json_patch::Patch(operations))
        .await
        .context(ClientSnafu)?;
    info!("submitted updated deployment");

    read(client, id).await
}

#[instrument(skip_all, fields(%id))]
pub async fn delete<C>(client: &C, id: &ResourceId) -> Result<()>
where
    C: DeploymentClient + ?Sized,
{
    info!("deleting deployment");
    client
        .delete(&id.namespace, &id.name)
        .await
        .context(ClientSnafu)?;

    info!("deployment deleted");
    Ok(())
}

/// Returns `false` if the server reports the Deployment as not found. Other errors are passed on.
#[instrument(skip_all, fields(%id))]
pub async fn exists<C>(client: &C, id: &ResourceId) -> Result<bool>
where
    C: DeploymentClient + ?Sized,
{
    info!("checking deployment");
    match client.get(&id.namespace, &id.name).await {
        Ok(_) => Ok(true),
        Err(err) if err.is_not_found() => Ok(false),
        Err(err) => Err(err).context(ClientSnafu),
    }
}
