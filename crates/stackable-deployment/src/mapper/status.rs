//! The observed state of a Deployment.
//!
//! The status is owned by the API server. It is only flattened into the configuration tree during
//! a refresh, the expand direction exists for importing previously flattened state.
use k8s_openapi::api::apps::v1::{DeploymentCondition, DeploymentStatus};

use crate::tree::{BlockReader, Result, Tree, Value};

const AVAILABLE_REPLICAS: &str = "available_replicas";
const CONDITIONS: &str = "conditions";
const OBSERVED_GENERATION: &str = "observed_generation";
const READY_REPLICAS: &str = "ready_replicas";
const REPLICAS: &str = "replicas";
const UNAVAILABLE_REPLICAS: &str = "unavailable_replicas";
const UPDATED_REPLICAS: &str = "updated_replicas";

const MESSAGE: &str = "message";
const REASON: &str = "reason";
const STATUS: &str = "status";
const TYPE: &str = "type";

pub fn expand_deployment_status(list: &[Value]) -> Result<DeploymentStatus> {
    let Some(block) = BlockReader::first(list)? else {
        return Ok(DeploymentStatus::default());
    };

    let conditions = block
        .blocks(CONDITIONS)?
        .into_iter()
        .map(expand_condition)
        .collect::<Result<Vec<_>>>()?;

    Ok(DeploymentStatus {
        available_replicas: block.int32(AVAILABLE_REPLICAS)?,
        observed_generation: block.int(OBSERVED_GENERATION)?,
        ready_replicas: block.int32(READY_REPLICAS)?,
        replicas: block.int32(REPLICAS)?,
        unavailable_replicas: block.int32(UNAVAILABLE_REPLICAS)?,
        updated_replicas: block.int32(UPDATED_REPLICAS)?,
        conditions: (!conditions.is_empty()).then_some(conditions),
        ..DeploymentStatus::default()
    })
}

pub fn expand_deployment_conditions(list: &[Value]) -> Result<Vec<DeploymentCondition>> {
    BlockReader::all(list)?
        .into_iter()
        .map(expand_condition)
        .collect()
}

fn expand_condition(block: BlockReader<'_>) -> Result<DeploymentCondition> {
    Ok(DeploymentCondition {
        type_: block.string(TYPE)?.unwrap_or_default().to_owned(),
        status: block.string(STATUS)?.unwrap_or_default().to_owned(),
        reason: block.string(REASON)?.map(ToOwned::to_owned),
        message: block.string(MESSAGE)?.map(ToOwned::to_owned),
        ..DeploymentCondition::default()
    })
}

/// Flattens the status. Replica counts the server didn't report are rendered as `0`.
pub fn flatten_deployment_status(status: &DeploymentStatus) -> Vec<Value> {
    let mut tree = Tree::new();

    tree.insert(
        OBSERVED_GENERATION.to_owned(),
        status.observed_generation.unwrap_or_default().into(),
    );
    for (key, count) in [
        (REPLICAS, status.replicas),
        (UPDATED_REPLICAS, status.updated_replicas),
        (READY_REPLICAS, status.ready_replicas),
        (AVAILABLE_REPLICAS, status.available_replicas),
        (UNAVAILABLE_REPLICAS, status.unavailable_replicas),
    ] {
        tree.insert(key.to_owned(), count.unwrap_or_default().into());
    }
    tree.insert(
        CONDITIONS.to_owned(),
        Value::List(flatten_deployment_conditions(
            status.conditions.as_deref().unwrap_or_default(),
        )),
    );

    Value::single(tree)
}

/// Flattens the conditions in the order reported by the server.
pub fn flatten_deployment_conditions(conditions: &[DeploymentCondition]) -> Vec<Value> {
    conditions
        .iter()
        .map(|condition| {
            Value::block([
                (TYPE, Value::from(condition.type_.as_str())),
                (STATUS, Value::from(condition.status.as_str())),
                (
                    REASON,
                    Value::from(condition.reason.as_deref().unwrap_or_default()),
                ),
                (
                    MESSAGE,
                    Value::from(condition.message.as_deref().unwrap_or_default()),
                ),
            ])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(type_: &str, status: &str) -> DeploymentCondition {
        DeploymentCondition {
            type_: type_.to_owned(),
            status: status.to_owned(),
            reason: Some(format!("{type_}Reason")),
            message: Some(format!("{type_} is {status}")),
            ..DeploymentCondition::default()
        }
    }

    #[test]
    fn conditions_keep_order() {
        let conditions = vec![
            condition("Available", "True"),
            condition("Progressing", "False"),
        ];

        let flattened = flatten_deployment_conditions(&conditions);

        let types = BlockReader::all(&flattened)
            .unwrap()
            .iter()
            .map(|block| block.string(TYPE).unwrap().unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(types, ["Available", "Progressing"]);
        assert_eq!(expand_deployment_conditions(&flattened).unwrap(), conditions);
    }

    #[test]
    fn duplicate_conditions_are_kept() {
        let conditions = vec![
            condition("Progressing", "True"),
            condition("Progressing", "True"),
        ];

        assert_eq!(flatten_deployment_conditions(&conditions).len(), 2);
    }

    #[test]
    fn flatten_status() {
        let status = DeploymentStatus {
            observed_generation: Some(3),
            replicas: Some(2),
            ready_replicas: Some(1),
            conditions: Some(vec![condition("Available", "False")]),
            ..DeploymentStatus::default()
        };

        let flattened = flatten_deployment_status(&status);
        let block = BlockReader::first(&flattened).unwrap().unwrap();

        assert_eq!(block.int(OBSERVED_GENERATION).unwrap(), Some(3));
        assert_eq!(block.int(REPLICAS).unwrap(), Some(2));
        assert_eq!(block.int(READY_REPLICAS).unwrap(), Some(1));
        assert_eq!(block.int(AVAILABLE_REPLICAS).unwrap(), Some(0));
        assert_eq!(block.blocks(CONDITIONS).unwrap().len(), 1);

        let expanded = expand_deployment_status(&flattened).unwrap();
        assert_eq!(expanded.replicas, Some(2));
        assert_eq!(expanded.available_replicas, Some(0));
        assert_eq!(expanded.conditions, status.conditions);
    }

    #[test]
    fn flatten_empty_status_is_single_block() {
        let flattened = flatten_deployment_status(&DeploymentStatus::default());

        assert_eq!(flattened.len(), 1);
        assert_eq!(
            BlockReader::first(&flattened)
                .unwrap()
                .unwrap()
                .list(CONDITIONS)
                .unwrap(),
            Some([].as_slice())
        );
    }
}
