//! Minimal JSON patches for updating an existing Deployment.
//!
//! The old and new configuration snapshots are compared once with a [`BlockDiff`]. The patch
//! functions only look at the keys the diff reports as changed, encode both sides of each of them
//! and emit one operation per top-level field whose encoded value differs, in a fixed order. The resulting operations are sent as
//! `application/json-patch+json`, which leaves everything this crate doesn't manage (most
//! notably the status) untouched on the server.
use std::collections::{BTreeMap, BTreeSet};

use json_patch::{
    AddOperation, PatchOperation, RemoveOperation, ReplaceOperation,
    jsonptr::{Pointer, PointerBuf},
};
use serde::Serialize;
use snafu::{ResultExt, Snafu};
use strum::IntoEnumIterator;
use tracing::debug;

use crate::{
    mapper::{
        ANNOTATIONS, DeploymentSpecField, LABELS, expand_label_selector_block,
        expand_pod_template_block, expand_rollback_to_block, expand_strategy_block,
    },
    tree::{self, BlockReader, Tree, Value},
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read the original configuration"))]
    ReadOriginalValue { source: tree::Error },

    #[snafu(display("failed to read the proposed configuration"))]
    ReadProposedValue { source: tree::Error },

    #[snafu(display("failed to encode the value for {path:?}"))]
    EncodeValue {
        source: serde_json::Error,
        path: String,
    },

    #[snafu(display("failed to serialize the patch document"))]
    SerializePatch { source: serde_json::Error },
}

/// The difference between two snapshots of the same configuration block.
///
/// The set of changed keys is computed once on construction. A key counts as changed if it is
/// present in only one of the snapshots, or present in both with different values. This compares
/// the raw tree values, so an absent key and an explicit default count as changed here. The patch
/// functions settle those cases on the encoded values.
#[derive(Clone, Debug)]
pub struct BlockDiff<'a> {
    original: Option<BlockReader<'a>>,
    proposed: Option<BlockReader<'a>>,
    changed: BTreeSet<&'a str>,
}

impl<'a> BlockDiff<'a> {
    /// Compares two single-element block lists, as stored below a key of the parent block.
    pub fn new(original: &'a [Value], proposed: &'a [Value]) -> tree::Result<Self> {
        Ok(Self::from_blocks(
            BlockReader::first(original)?,
            BlockReader::first(proposed)?,
        ))
    }

    /// Compares two root trees.
    pub fn from_trees(original: &'a Tree, proposed: &'a Tree) -> Self {
        Self::from_blocks(
            Some(BlockReader::new(original)),
            Some(BlockReader::new(proposed)),
        )
    }

    /// Compares the blocks stored below `key` in two root trees.
    pub fn from_field(original: &'a Tree, proposed: &'a Tree, key: &str) -> tree::Result<Self> {
        let original = BlockReader::new(original).list(key)?.unwrap_or_default();
        let proposed = BlockReader::new(proposed).list(key)?.unwrap_or_default();

        Self::new(original, proposed)
    }

    fn from_blocks(original: Option<BlockReader<'a>>, proposed: Option<BlockReader<'a>>) -> Self {
        let keys = |block: &Option<BlockReader<'a>>| {
            block
                .iter()
                .flat_map(|block| block.tree().keys().map(String::as_str))
                .collect::<BTreeSet<_>>()
        };

        let changed = keys(&original)
            .union(&keys(&proposed))
            .copied()
            .filter(|key| {
                original.as_ref().and_then(|block| block.get(key))
                    != proposed.as_ref().and_then(|block| block.get(key))
            })
            .collect();

        Self {
            original,
            proposed,
            changed,
        }
    }

    pub fn has_changed(&self, key: &str) -> bool {
        self.changed.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// The changed keys, in lexicographic order.
    pub fn changed(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.changed.iter().copied()
    }

    pub fn original(&self) -> Option<&BlockReader<'a>> {
        self.original.as_ref()
    }

    pub fn proposed(&self) -> Option<&BlockReader<'a>> {
        self.proposed.as_ref()
    }
}

/// Builds the `replace` operations for every changed top-level field of the Deployment spec.
///
/// A field only counts as changed if its encoded value differs between the snapshots, so leaving
/// out a field that was at its default, or writing a set as a list, produces no operation.
/// Operations are ordered by [`DeploymentSpecField`], independent of the order in which the
/// fields were changed. Nested changes are never collapsed into deeper paths, a change anywhere
/// inside the pod template replaces the whole template.
pub fn patch_deployment_spec(
    path_prefix: &Pointer,
    diff: &BlockDiff<'_>,
) -> Result<Vec<PatchOperation>> {
    let mut operations = Vec::new();

    for field in DeploymentSpecField::iter().filter(|field| diff.has_changed(field.config_name())) {
        let mut path = path_prefix.to_buf();
        path.push_back(field.api_name());

        let value = encoded_spec_value(field, diff.proposed())
            .context(ReadProposedValueSnafu)?
            .with_context(|_| EncodeValueSnafu {
                path: path.to_string(),
            })?;
        let original = encoded_spec_value(field, diff.original())
            .context(ReadOriginalValueSnafu)?
            .with_context(|_| EncodeValueSnafu {
                path: path.to_string(),
            })?;

        if value == original {
            continue;
        }

        operations.push(PatchOperation::Replace(ReplaceOperation { path, value }));
    }

    debug!(
        changed = operations.len(),
        %path_prefix,
        "computed deployment spec patch"
    );
    Ok(operations)
}

/// Reads the value of `field` from one snapshot and encodes it as JSON.
///
/// The outer result carries shape errors, the inner one encoding errors. Absent fields are
/// encoded as the value the API server assumes when the field is absent.
fn encoded_spec_value(
    field: DeploymentSpecField,
    block: Option<&BlockReader<'_>>,
) -> tree::Result<serde_json::Result<serde_json::Value>> {
    let key = field.config_name();
    let nested = || read_optional(block, |block| block.block(key));

    Ok(match field {
        DeploymentSpecField::MinReadySeconds => {
            to_json(read_optional(block, |block| block.int32(key))?.unwrap_or_default())
        }
        DeploymentSpecField::Paused => {
            to_json(read_optional(block, |block| block.bool(key))?.unwrap_or_default())
        }
        DeploymentSpecField::ProgressDeadlineSeconds
        | DeploymentSpecField::Replicas
        | DeploymentSpecField::RevisionHistoryLimit => {
            to_json(read_optional(block, |block| block.int32(key))?)
        }
        DeploymentSpecField::RollbackTo => to_json(expand_rollback_to_block(nested()?)?),
        DeploymentSpecField::Selector => to_json(expand_label_selector_block(nested()?)?),
        DeploymentSpecField::Strategy => to_json(expand_strategy_block(nested()?)?),
        DeploymentSpecField::Template => to_json(expand_pod_template_block(nested()?)?),
    })
}

fn read_optional<'a, T>(
    block: Option<&BlockReader<'a>>,
    read: impl FnOnce(&BlockReader<'a>) -> tree::Result<Option<T>>,
) -> tree::Result<Option<T>> {
    Ok(match block {
        Some(block) => read(block)?,
        None => None,
    })
}

fn to_json(value: impl Serialize) -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(value)
}

/// Builds the operations for changed labels and annotations.
///
/// A map that didn't exist before is added as a whole and a map that is now empty is removed as
/// a whole. Otherwise every key is patched on its own, so that entries added by other parties
/// survive the update.
pub fn patch_metadata(path_prefix: &Pointer, diff: &BlockDiff<'_>) -> Result<Vec<PatchOperation>> {
    let mut operations = Vec::new();

    for key in [LABELS, ANNOTATIONS] {
        if !diff.has_changed(key) {
            continue;
        }

        let original = read_map(diff.original(), key).context(ReadOriginalValueSnafu)?;
        let proposed = read_map(diff.proposed(), key).context(ReadProposedValueSnafu)?;

        let mut path = path_prefix.to_buf();
        path.push_back(key);

        operations.extend(diff_string_map(path, &original, &proposed)?);
    }

    debug!(
        changed = operations.len(),
        %path_prefix,
        "computed metadata patch"
    );
    Ok(operations)
}

fn read_map(
    block: Option<&BlockReader<'_>>,
    key: &str,
) -> tree::Result<BTreeMap<String, String>> {
    Ok(read_optional(block, |block| block.string_map(key))?
        .cloned()
        .unwrap_or_default())
}

fn diff_string_map(
    path: PointerBuf,
    original: &BTreeMap<String, String>,
    proposed: &BTreeMap<String, String>,
) -> Result<Vec<PatchOperation>> {
    if original.is_empty() && proposed.is_empty() {
        return Ok(Vec::new());
    }

    if original.is_empty() {
        let value = to_json(proposed).with_context(|_| EncodeValueSnafu {
            path: path.to_string(),
        })?;
        return Ok(vec![PatchOperation::Add(AddOperation { path, value })]);
    }

    if proposed.is_empty() {
        return Ok(vec![PatchOperation::Remove(RemoveOperation { path })]);
    }

    let mut operations = Vec::new();
    for (key, value) in proposed {
        let mut path = path.clone();
        path.push_back(key.as_str());

        match original.get(key) {
            None => operations.push(PatchOperation::Add(AddOperation {
                path,
                value: value.as_str().into(),
            })),
            Some(old) if old != value => {
                operations.push(PatchOperation::Replace(ReplaceOperation {
                    path,
                    value: value.as_str().into(),
                }));
            }
            Some(_) => {}
        }
    }
    for key in original.keys().filter(|key| !proposed.contains_key(*key)) {
        let mut path = path.clone();
        path.push_back(key.as_str());
        operations.push(PatchOperation::Remove(RemoveOperation { path }));
    }

    Ok(operations)
}

/// Serializes the operations into an `application/json-patch+json` document.
pub fn serialize_patch(operations: &[PatchOperation]) -> Result<Vec<u8>> {
    serde_json::to_vec(operations).context(SerializePatchSnafu)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn spec(entries: Vec<(&str, Value)>) -> Vec<Value> {
        Value::single_block(entries)
    }

    fn selector(app: &str) -> Value {
        Value::List(Value::single_block([(
            "match_labels",
            Value::map([("app", app)]),
        )]))
    }

    fn strategy(type_: &str) -> Value {
        Value::List(Value::single_block([("type", Value::from(type_))]))
    }

    fn spec_patch(original: &[Value], proposed: &[Value]) -> serde_json::Value {
        let diff = BlockDiff::new(original, proposed).unwrap();
        let operations = patch_deployment_spec(Pointer::from_static("/spec"), &diff).unwrap();

        serde_json::from_slice(&serialize_patch(&operations).unwrap()).unwrap()
    }

    #[test]
    fn only_changed_fields_in_declaration_order() {
        let original = spec(vec![
            ("replicas", Value::from(1)),
            ("selector", selector("web")),
            ("strategy", strategy("Recreate")),
            ("paused", Value::from(false)),
        ]);
        // Changed in a different order than they are declared in
        let proposed = spec(vec![
            ("strategy", strategy("RollingUpdate")),
            ("paused", Value::from(false)),
            ("selector", selector("api")),
            ("replicas", Value::from(3)),
        ]);

        assert_eq!(
            spec_patch(&original, &proposed),
            json!([
                { "op": "replace", "path": "/spec/replicas", "value": 3 },
                {
                    "op": "replace",
                    "path": "/spec/selector",
                    "value": { "matchLabels": { "app": "api" } }
                },
                {
                    "op": "replace",
                    "path": "/spec/strategy",
                    "value": { "type": "RollingUpdate" }
                },
            ])
        );
    }

    #[test]
    fn only_paused_changed() {
        let original = spec(vec![
            ("paused", Value::from(false)),
            ("replicas", Value::from(2)),
        ]);
        let proposed = spec(vec![
            ("paused", Value::from(true)),
            ("replicas", Value::from(2)),
        ]);

        assert_eq!(
            spec_patch(&original, &proposed),
            json!([{ "op": "replace", "path": "/spec/paused", "value": true }])
        );
    }

    #[rstest]
    #[case::min_ready_seconds("min_ready_seconds", "/spec/minReadySeconds", json!(0))]
    #[case::paused("paused", "/spec/paused", json!(false))]
    #[case::replicas("replicas", "/spec/replicas", json!(null))]
    #[case::revision_history_limit("revision_history_limit", "/spec/revisionHistoryLimit", json!(null))]
    fn removed_scalar(
        #[case] key: &str,
        #[case] path: &str,
        #[case] expected: serde_json::Value,
    ) {
        let value = if key == "paused" {
            Value::from(true)
        } else {
            Value::from(5)
        };
        let original = spec(vec![(key, value)]);
        let proposed = spec(Vec::new());

        assert_eq!(
            spec_patch(&original, &proposed),
            json!([{ "op": "replace", "path": path, "value": expected }])
        );
    }

    #[test]
    fn nested_template_change_replaces_whole_template() {
        let template = |image: &str| {
            Value::List(Value::single_block([(
                "spec",
                Value::List(Value::single_block([(
                    "container",
                    Value::List(vec![Value::block([
                        ("name", Value::from("web")),
                        ("image", Value::from(image)),
                    ])]),
                )])),
            )]))
        };
        let original = spec(vec![("template", template("nginx:1.26"))]);
        let proposed = spec(vec![("template", template("nginx:1.27"))]);

        assert_eq!(
            spec_patch(&original, &proposed),
            json!([{
                "op": "replace",
                "path": "/spec/template",
                "value": {
                    "spec": { "containers": [{ "name": "web", "image": "nginx:1.27" }] }
                }
            }])
        );
    }

    #[test]
    fn rolling_update_percentages_are_encoded_as_strings() {
        let strategy = |max_surge: &str| {
            Value::List(Value::single_block([
                ("type", Value::from("RollingUpdate")),
                (
                    "rolling_update",
                    Value::List(Value::single_block([("max_surge", Value::from(max_surge))])),
                ),
            ]))
        };
        let original = spec(vec![("strategy", strategy("1"))]);
        let proposed = spec(vec![("strategy", strategy("25%"))]);

        assert_eq!(
            spec_patch(&original, &proposed),
            json!([{
                "op": "replace",
                "path": "/spec/strategy",
                "value": { "type": "RollingUpdate", "rollingUpdate": { "maxSurge": "25%" } }
            }])
        );
    }

    #[test]
    fn unchanged_spec_has_no_operations() {
        let list = spec(vec![("replicas", Value::from(2))]);
        let diff = BlockDiff::new(&list, &list).unwrap();

        assert!(diff.is_empty());
        assert_eq!(
            patch_deployment_spec(Pointer::from_static("/spec"), &diff)
                .unwrap()
                .len(),
            0
        );
    }

    #[test]
    fn omitted_defaults_are_not_patched() {
        // As read back from the server, which always has these fields
        let original = spec(vec![
            ("min_ready_seconds", Value::from(0)),
            ("paused", Value::from(false)),
            ("replicas", Value::from(1)),
        ]);
        let proposed = spec(vec![("replicas", Value::from(2))]);

        assert_eq!(
            spec_patch(&original, &proposed),
            json!([{ "op": "replace", "path": "/spec/replicas", "value": 2 }])
        );
    }

    #[test]
    fn values_as_set_or_list_are_the_same_selector() {
        let selector = |values: Value| {
            Value::List(Value::single_block([(
                "match_expressions",
                Value::List(vec![Value::block([
                    ("key", Value::from("tier")),
                    ("operator", Value::from("In")),
                    ("values", values),
                ])]),
            )]))
        };
        let original = spec(vec![("selector", selector(Value::set(["a", "b"])))]);
        let proposed = spec(vec![(
            "selector",
            selector(Value::List(vec![Value::from("a"), Value::from("b")])),
        )]);
        let diff = BlockDiff::new(&original, &proposed).unwrap();

        assert!(diff.has_changed("selector"));
        assert_eq!(spec_patch(&original, &proposed), json!([]));
    }

    #[test]
    fn shape_error_in_original_aborts_the_patch() {
        let original = spec(vec![("paused", Value::from("yes"))]);
        let proposed = spec(vec![("paused", Value::from(true))]);
        let diff = BlockDiff::new(&original, &proposed).unwrap();

        let err = patch_deployment_spec(Pointer::from_static("/spec"), &diff).unwrap_err();
        assert!(matches!(err, Error::ReadOriginalValue { .. }));
    }

    #[test]
    fn shape_error_aborts_the_patch() {
        let original = spec(vec![("replicas", Value::from(1))]);
        let proposed = spec(vec![("replicas", Value::from("three"))]);
        let diff = BlockDiff::new(&original, &proposed).unwrap();

        let err = patch_deployment_spec(Pointer::from_static("/spec"), &diff).unwrap_err();
        assert!(matches!(err, Error::ReadProposedValue { .. }));
    }

    #[test]
    fn from_field_compares_nested_blocks() {
        let root = |replicas: i64| {
            Tree::from([(
                "spec".to_owned(),
                Value::List(spec(vec![("replicas", Value::from(replicas))])),
            )])
        };
        let (original, proposed) = (root(1), root(2));

        let root_diff = BlockDiff::from_trees(&original, &proposed);
        assert_eq!(root_diff.changed().collect::<Vec<_>>(), ["spec"]);

        let diff = BlockDiff::from_field(&original, &proposed, "spec").unwrap();
        assert_eq!(diff.changed().collect::<Vec<_>>(), ["replicas"]);
    }

    fn metadata_patch(
        original: BTreeMap<&str, &str>,
        proposed: BTreeMap<&str, &str>,
    ) -> serde_json::Value {
        let block = |labels: BTreeMap<&str, &str>| {
            Value::single_block([("name", Value::from("web")), ("labels", Value::map(labels))])
        };
        let (original, proposed) = (block(original), block(proposed));
        let diff = BlockDiff::new(&original, &proposed).unwrap();

        let operations = patch_metadata(Pointer::from_static("/metadata"), &diff).unwrap();
        serde_json::to_value(operations).unwrap()
    }

    #[test]
    fn metadata_keys_are_patched_individually() {
        assert_eq!(
            metadata_patch(
                BTreeMap::from([("app", "web"), ("tier", "frontend"), ("old", "x")]),
                BTreeMap::from([
                    ("app", "web"),
                    ("tier", "backend"),
                    ("app.kubernetes.io/name", "web"),
                ]),
            ),
            json!([
                { "op": "add", "path": "/metadata/labels/app.kubernetes.io~1name", "value": "web" },
                { "op": "replace", "path": "/metadata/labels/tier", "value": "backend" },
                { "op": "remove", "path": "/metadata/labels/old" },
            ])
        );
    }

    #[test]
    fn metadata_map_added_as_a_whole() {
        assert_eq!(
            metadata_patch(BTreeMap::new(), BTreeMap::from([("app", "web")])),
            json!([{ "op": "add", "path": "/metadata/labels", "value": { "app": "web" } }])
        );
    }

    #[test]
    fn metadata_map_removed_as_a_whole() {
        assert_eq!(
            metadata_patch(BTreeMap::from([("app", "web")]), BTreeMap::new()),
            json!([{ "op": "remove", "path": "/metadata/labels" }])
        );
    }
}
