//! Object metadata shared by the Deployment itself and its pod template.
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::{
    codec::insert_some,
    mapper::non_empty_map,
    tree::{BlockReader, Result, Tree, Value},
};

const NAME: &str = "name";
const NAMESPACE: &str = "namespace";
pub(crate) const LABELS: &str = "labels";
pub(crate) const ANNOTATIONS: &str = "annotations";
const GENERATE_NAME: &str = "generate_name";
const GENERATION: &str = "generation";
const RESOURCE_VERSION: &str = "resource_version";
const UID: &str = "uid";

/// Expands the user-settable metadata fields. Server-populated fields like `uid` are ignored.
pub fn expand_metadata(list: &[Value]) -> Result<ObjectMeta> {
    expand_metadata_block(BlockReader::first(list)?)
}

pub(crate) fn expand_metadata_block(block: Option<BlockReader<'_>>) -> Result<ObjectMeta> {
    let Some(block) = block else {
        return Ok(ObjectMeta::default());
    };

    Ok(ObjectMeta {
        name: block.string(NAME)?.map(ToOwned::to_owned),
        generate_name: block.string(GENERATE_NAME)?.map(ToOwned::to_owned),
        namespace: block.string(NAMESPACE)?.map(ToOwned::to_owned),
        labels: non_empty_map(&block, LABELS)?,
        annotations: non_empty_map(&block, ANNOTATIONS)?,
        ..ObjectMeta::default()
    })
}

/// Flattens the metadata, including the read-only fields populated by the API server.
pub fn flatten_metadata(metadata: &ObjectMeta) -> Vec<Value> {
    let mut tree = Tree::new();

    insert_some(&mut tree, NAME, metadata.name.clone());
    insert_some(&mut tree, GENERATE_NAME, metadata.generate_name.clone());
    insert_some(&mut tree, NAMESPACE, metadata.namespace.clone());
    insert_some(
        &mut tree,
        LABELS,
        metadata.labels.clone().filter(|labels| !labels.is_empty()),
    );
    insert_some(
        &mut tree,
        ANNOTATIONS,
        metadata
            .annotations
            .clone()
            .filter(|annotations| !annotations.is_empty()),
    );
    insert_some(&mut tree, GENERATION, metadata.generation);
    insert_some(&mut tree, RESOURCE_VERSION, metadata.resource_version.clone());
    insert_some(&mut tree, UID, metadata.uid.clone());

    Value::single(tree)
}
