use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};

use crate::{
    mapper::{non_empty_map, non_empty_strings},
    tree::{BlockReader, Result, Tree, Value},
};

const MATCH_LABELS: &str = "match_labels";
const MATCH_EXPRESSIONS: &str = "match_expressions";

pub fn expand_label_selector(list: &[Value]) -> Result<LabelSelector> {
    expand_label_selector_block(BlockReader::first(list)?)
}

pub(crate) fn expand_label_selector_block(block: Option<BlockReader<'_>>) -> Result<LabelSelector> {
    let Some(block) = block else {
        return Ok(LabelSelector::default());
    };

    let match_expressions = block
        .blocks(MATCH_EXPRESSIONS)?
        .into_iter()
        .map(expand_requirement)
        .collect::<Result<Vec<_>>>()?;

    Ok(LabelSelector {
        match_labels: non_empty_map(&block, MATCH_LABELS)?,
        match_expressions: (!match_expressions.is_empty()).then_some(match_expressions),
    })
}

/// Expands a list of `match_expressions` blocks.
///
/// The operator is passed through as is. An `In` requirement without values is constructed just
/// like any other, rejecting it is up to the API server.
pub fn expand_label_selector_requirements(list: &[Value]) -> Result<Vec<LabelSelectorRequirement>> {
    BlockReader::all(list)?
        .into_iter()
        .map(expand_requirement)
        .collect()
}

fn expand_requirement(block: BlockReader<'_>) -> Result<LabelSelectorRequirement> {
    Ok(LabelSelectorRequirement {
        key: block.string("key")?.unwrap_or_default().to_owned(),
        operator: block.string("operator")?.unwrap_or_default().to_owned(),
        values: non_empty_strings(&block, "values")?,
    })
}

pub fn flatten_label_selector(selector: &LabelSelector) -> Vec<Value> {
    let mut tree = Tree::new();

    if let Some(match_labels) = selector
        .match_labels
        .as_ref()
        .filter(|labels| !labels.is_empty())
    {
        tree.insert(MATCH_LABELS.to_owned(), Value::Map(match_labels.clone()));
    }

    if let Some(match_expressions) = selector
        .match_expressions
        .as_ref()
        .filter(|expressions| !expressions.is_empty())
    {
        tree.insert(
            MATCH_EXPRESSIONS.to_owned(),
            Value::List(flatten_label_selector_requirements(match_expressions)),
        );
    }

    Value::single(tree)
}

pub fn flatten_label_selector_requirements(requirements: &[LabelSelectorRequirement]) -> Vec<Value> {
    requirements
        .iter()
        .map(|requirement| {
            let mut tree = Tree::new();
            tree.insert("key".to_owned(), requirement.key.as_str().into());
            tree.insert("operator".to_owned(), requirement.operator.as_str().into());

            if let Some(values) = requirement
                .values
                .as_ref()
                .filter(|values| !values.is_empty())
            {
                tree.insert("values".to_owned(), Value::set(values.iter().cloned()));
            }

            Value::Block(tree)
        })
        .collect()
}
