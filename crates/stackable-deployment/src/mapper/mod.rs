//! Expand and flatten functions between the configuration [`Tree`](crate::tree::Tree) and the
//! typed API objects.
//!
//! Every composite comes as a pair:
//!
//! - `expand_*` takes the single-element list the block is stored in and returns the typed
//!   object. An empty list returns the [`Default`] of the target type. No semantic validation is
//!   done, only the shape of the values is checked.
//! - `flatten_*` takes the typed object and always returns a single-element list, even if every
//!   field is unset.
//!
//! For every user-settable field `expand(flatten(x)) == x` holds.
use crate::tree::{BlockReader, Result};

mod metadata;
mod pod;
mod rollback;
mod selector;
mod spec;
mod status;
mod strategy;
mod template;

pub use metadata::{expand_metadata, flatten_metadata};
pub use pod::{expand_pod_spec, flatten_pod_spec};
pub use rollback::{expand_rollback_to, flatten_rollback_to};
pub use selector::{
    expand_label_selector, expand_label_selector_requirements, flatten_label_selector,
    flatten_label_selector_requirements,
};
pub use spec::{DeploymentSpecField, expand_deployment_spec, flatten_deployment_spec};
pub use status::{
    expand_deployment_conditions, expand_deployment_status, flatten_deployment_conditions,
    flatten_deployment_status,
};
pub use strategy::{expand_rolling_update, expand_strategy, flatten_rolling_update, flatten_strategy};
pub use template::{expand_pod_template, flatten_pod_template};

pub(crate) use metadata::{ANNOTATIONS, LABELS, expand_metadata_block};
pub(crate) use pod::expand_pod_spec_block;
pub(crate) use rollback::expand_rollback_to_block;
pub(crate) use selector::expand_label_selector_block;
pub(crate) use strategy::expand_strategy_block;
pub(crate) use template::expand_pod_template_block;

/// Expands the nested block below `key` with `expand` if the key is present.
///
/// A present key with an empty list still expands to `Some(T::default())`, only an absent key
/// results in [`None`].
pub(crate) fn expand_optional<'a, T>(
    block: &BlockReader<'a>,
    key: &str,
    expand: impl FnOnce(Option<BlockReader<'a>>) -> Result<T>,
) -> Result<Option<T>> {
    if !block.contains(key) {
        return Ok(None);
    }

    expand(block.block(key)?).map(Some)
}

/// Returns the string map below `key`, treating an empty map like an absent one.
pub(crate) fn non_empty_map(
    block: &BlockReader<'_>,
    key: &str,
) -> Result<Option<std::collections::BTreeMap<String, String>>> {
    Ok(block
        .string_map(key)?
        .filter(|map| !map.is_empty())
        .cloned())
}

/// Returns the strings below `key`, treating an empty collection like an absent one.
pub(crate) fn non_empty_strings(block: &BlockReader<'_>, key: &str) -> Result<Option<Vec<String>>> {
    Ok(block.strings(key)?.filter(|values| !values.is_empty()))
}
