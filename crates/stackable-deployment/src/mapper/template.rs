use k8s_openapi::api::core::v1::PodTemplateSpec;

use crate::{
    mapper::{
        expand_metadata_block, expand_optional, expand_pod_spec_block, flatten_metadata,
        flatten_pod_spec,
    },
    tree::{BlockReader, Result, Tree, Value},
};

const METADATA: &str = "metadata";
const SPEC: &str = "spec";

pub fn expand_pod_template(list: &[Value]) -> Result<PodTemplateSpec> {
    expand_pod_template_block(BlockReader::first(list)?)
}

pub(crate) fn expand_pod_template_block(block: Option<BlockReader<'_>>) -> Result<PodTemplateSpec> {
    let Some(block) = block else {
        return Ok(PodTemplateSpec::default());
    };

    Ok(PodTemplateSpec {
        metadata: expand_optional(&block, METADATA, expand_metadata_block)?,
        spec: expand_optional(&block, SPEC, expand_pod_spec_block)?,
    })
}

pub fn flatten_pod_template(template: &PodTemplateSpec) -> Vec<Value> {
    let mut tree = Tree::new();

    if let Some(metadata) = &template.metadata {
        tree.insert(METADATA.to_owned(), Value::List(flatten_metadata(metadata)));
    }
    if let Some(spec) = &template.spec {
        tree.insert(SPEC.to_owned(), Value::List(flatten_pod_spec(spec)));
    }

    Value::single(tree)
}
