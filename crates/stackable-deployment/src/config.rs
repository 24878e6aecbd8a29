//! Default values for the Deployment spec block of a configuration tree.
//!
//! The mapping itself never injects defaults, an absent optional stays absent. Callers that want
//! the API server's documented defaults to show up in the configuration apply [`SpecDefaults`]
//! before expanding.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    mapper::DeploymentSpecField,
    tree::{BlockReader, Error, Result, Tree, UnexpectedTypeSnafu, Value},
};

const STRATEGY_TYPE: &str = "type";

/// Defaults for the spec block, filled into keys the configuration leaves vacant.
#[derive(Clone, Debug, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecDefaults {
    #[serde(default)]
    pub replicas: Option<i32>,

    #[serde(default)]
    pub progress_deadline_seconds: Option<i32>,

    #[serde(default)]
    pub revision_history_limit: Option<i32>,

    /// The `type` of the update strategy, e.g. `RollingUpdate` or `Recreate`.
    #[serde(default)]
    pub strategy_type: Option<String>,
}

impl Default for SpecDefaults {
    fn default() -> Self {
        Self {
            replicas: Some(1),
            progress_deadline_seconds: Some(600),
            revision_history_limit: Some(2),
            strategy_type: Some("RollingUpdate".to_owned()),
        }
    }
}

impl SpecDefaults {
    /// Merges with `defaults`, preferring values from `self` if they are set there.
    pub fn merge(&mut self, defaults: &Self) {
        self.replicas = self.replicas.or(defaults.replicas);
        self.progress_deadline_seconds = self
            .progress_deadline_seconds
            .or(defaults.progress_deadline_seconds);
        self.revision_history_limit = self
            .revision_history_limit
            .or(defaults.revision_history_limit);
        if self.strategy_type.is_none() {
            self.strategy_type.clone_from(&defaults.strategy_type);
        }
    }

    /// Fills vacant keys of the spec block stored in `list`.
    ///
    /// Keys that are already present are left alone, even if they hold an explicit zero. An empty
    /// list gets a block with only the defaults.
    pub fn apply(&self, list: &mut Vec<Value>) -> Result<()> {
        if list.is_empty() {
            list.push(Value::Block(Tree::new()));
        }
        let spec = first_block_mut(list, "0")?;

        for (field, value) in [
            (DeploymentSpecField::Replicas, self.replicas),
            (
                DeploymentSpecField::ProgressDeadlineSeconds,
                self.progress_deadline_seconds,
            ),
            (
                DeploymentSpecField::RevisionHistoryLimit,
                self.revision_history_limit,
            ),
        ] {
            if let Some(value) = value {
                spec.entry(field.config_name().to_owned())
                    .or_insert_with(|| value.into());
            }
        }

        if let Some(strategy_type) = &self.strategy_type {
            let strategy = spec
                .entry(DeploymentSpecField::Strategy.config_name().to_owned())
                .or_insert_with(|| Value::List(Vec::new()));
            let strategy = match strategy {
                Value::List(strategy) => strategy,
                other => {
                    return UnexpectedTypeSnafu {
                        path: "0.strategy",
                        expected: "list",
                        found: other.kind(),
                    }
                    .fail();
                }
            };
            if strategy.is_empty() {
                strategy.push(Value::Block(Tree::new()));
            }

            first_block_mut(strategy, "0.strategy.0")?
                .entry(STRATEGY_TYPE.to_owned())
                .or_insert_with(|| strategy_type.as_str().into());
        }

        Ok(())
    }

    /// Returns whether every default is already present in the spec block.
    pub fn is_applied(&self, list: &[Value]) -> Result<bool> {
        let Some(block) = BlockReader::first(list)? else {
            return Ok(false);
        };

        let scalars_present = [
            (DeploymentSpecField::Replicas, self.replicas),
            (
                DeploymentSpecField::ProgressDeadlineSeconds,
                self.progress_deadline_seconds,
            ),
            (
                DeploymentSpecField::RevisionHistoryLimit,
                self.revision_history_limit,
            ),
        ]
        .into_iter()
        .all(|(field, value)| value.is_none() || block.contains(field.config_name()));

        let strategy_present = match &self.strategy_type {
            None => true,
            Some(_) => block
                .block(DeploymentSpecField::Strategy.config_name())?
                .is_some_and(|strategy| strategy.contains(STRATEGY_TYPE)),
        };

        Ok(scalars_present && strategy_present)
    }
}

fn first_block_mut<'a>(list: &'a mut [Value], path: &str) -> Result<&'a mut Tree, Error> {
    match list.first_mut() {
        Some(Value::Block(tree)) => Ok(tree),
        Some(other) => UnexpectedTypeSnafu {
            path,
            expected: "block",
            found: other.kind(),
        }
        .fail(),
        None => UnexpectedTypeSnafu {
            path,
            expected: "block",
            found: "nothing",
        }
        .fail(),
    }
}
