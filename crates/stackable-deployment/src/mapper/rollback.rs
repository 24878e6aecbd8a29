use crate::{
    deployment::RollbackConfig,
    tree::{BlockReader, Result, Tree, Value},
};

const REVISION: &str = "revision";

pub fn expand_rollback_to(list: &[Value]) -> Result<RollbackConfig> {
    expand_rollback_to_block(BlockReader::first(list)?)
}

pub(crate) fn expand_rollback_to_block(block: Option<BlockReader<'_>>) -> Result<RollbackConfig> {
    let Some(block) = block else {
        return Ok(RollbackConfig::default());
    };

    Ok(RollbackConfig {
        revision: block.int(REVISION)?.unwrap_or_default(),
    })
}

pub fn flatten_rollback_to(rollback_to: &RollbackConfig) -> Vec<Value> {
    let mut tree = Tree::new();
    tree.insert(REVISION.to_owned(), Value::Int(rollback_to.revision));
    Value::single(tree)
}
