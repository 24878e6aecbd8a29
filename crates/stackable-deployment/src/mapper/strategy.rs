use k8s_openapi::api::apps::v1::{DeploymentStrategy, RollingUpdateDeployment};

use crate::{
    codec::{parse_int_or_string, render_int_or_string},
    mapper::expand_optional,
    tree::{BlockReader, Result, Tree, Value},
};

const TYPE: &str = "type";
const ROLLING_UPDATE: &str = "rolling_update";
const MAX_SURGE: &str = "max_surge";
const MAX_UNAVAILABLE: &str = "max_unavailable";

pub fn expand_strategy(list: &[Value]) -> Result<DeploymentStrategy> {
    expand_strategy_block(BlockReader::first(list)?)
}

pub(crate) fn expand_strategy_block(block: Option<BlockReader<'_>>) -> Result<DeploymentStrategy> {
    let Some(block) = block else {
        return Ok(DeploymentStrategy::default());
    };

    Ok(DeploymentStrategy {
        type_: block.string(TYPE)?.map(ToOwned::to_owned),
        rolling_update: expand_optional(&block, ROLLING_UPDATE, expand_rolling_update_block)?,
    })
}

pub fn expand_rolling_update(list: &[Value]) -> Result<RollingUpdateDeployment> {
    expand_rolling_update_block(BlockReader::first(list)?)
}

fn expand_rolling_update_block(block: Option<BlockReader<'_>>) -> Result<RollingUpdateDeployment> {
    let Some(block) = block else {
        return Ok(RollingUpdateDeployment::default());
    };

    Ok(RollingUpdateDeployment {
        max_surge: block.string(MAX_SURGE)?.and_then(parse_int_or_string),
        max_unavailable: block.string(MAX_UNAVAILABLE)?.and_then(parse_int_or_string),
    })
}

pub fn flatten_strategy(strategy: &DeploymentStrategy) -> Vec<Value> {
    let mut tree = Tree::new();

    if let Some(type_) = &strategy.type_ {
        tree.insert(TYPE.to_owned(), type_.as_str().into());
    }
    if let Some(rolling_update) = &strategy.rolling_update {
        tree.insert(
            ROLLING_UPDATE.to_owned(),
            Value::List(flatten_rolling_update(rolling_update)),
        );
    }

    Value::single(tree)
}

pub fn flatten_rolling_update(rolling_update: &RollingUpdateDeployment) -> Vec<Value> {
    let mut tree = Tree::new();

    if let Some(max_surge) = &rolling_update.max_surge {
        tree.insert(MAX_SURGE.to_owned(), render_int_or_string(max_surge).into());
    }
    if let Some(max_unavailable) = &rolling_update.max_unavailable {
        tree.insert(
            MAX_UNAVAILABLE.to_owned(),
            render_int_or_string(max_unavailable).into(),
        );
    }

    Value::single(tree)
}
