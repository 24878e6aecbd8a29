//! The top-level Deployment spec block.
use strum::{EnumIter, IntoStaticStr};

use crate::{
    codec::insert_some,
    deployment::DeploymentSpec,
    mapper::{
        expand_label_selector_block, expand_optional, expand_pod_template_block,
        expand_rollback_to_block, expand_strategy_block, flatten_label_selector,
        flatten_pod_template, flatten_rollback_to, flatten_strategy,
    },
    tree::{BlockReader, Result, Tree, Value},
};

/// The top-level fields of a [`DeploymentSpec`], in declaration order.
///
/// The configuration tree uses snake_case names ([`DeploymentSpecField::config_name`]) while the
/// API uses camelCase ([`DeploymentSpecField::api_name`]).
#[derive(Clone, Copy, Debug, EnumIter, Eq, Hash, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum DeploymentSpecField {
    MinReadySeconds,
    Paused,
    ProgressDeadlineSeconds,
    Replicas,
    RevisionHistoryLimit,
    RollbackTo,
    Selector,
    Strategy,
    Template,
}

impl DeploymentSpecField {
    pub fn config_name(self) -> &'static str {
        self.into()
    }

    pub fn api_name(self) -> &'static str {
        match self {
            Self::MinReadySeconds => "minReadySeconds",
            Self::Paused => "paused",
            Self::ProgressDeadlineSeconds => "progressDeadlineSeconds",
            Self::Replicas => "replicas",
            Self::RevisionHistoryLimit => "revisionHistoryLimit",
            Self::RollbackTo => "rollbackTo",
            Self::Selector => "selector",
            Self::Strategy => "strategy",
            Self::Template => "template",
        }
    }
}

use DeploymentSpecField as Field;

pub fn expand_deployment_spec(list: &[Value]) -> Result<DeploymentSpec> {
    let Some(block) = BlockReader::first(list)? else {
        return Ok(DeploymentSpec::default());
    };

    Ok(DeploymentSpec {
        min_ready_seconds: block
            .int32(Field::MinReadySeconds.config_name())?
            .unwrap_or_default(),
        paused: block.bool(Field::Paused.config_name())?.unwrap_or_default(),
        progress_deadline_seconds: block.int32(Field::ProgressDeadlineSeconds.config_name())?,
        replicas: block.int32(Field::Replicas.config_name())?,
        revision_history_limit: block.int32(Field::RevisionHistoryLimit.config_name())?,
        rollback_to: expand_optional(
            &block,
            Field::RollbackTo.config_name(),
            expand_rollback_to_block,
        )?,
        selector: expand_optional(
            &block,
            Field::Selector.config_name(),
            expand_label_selector_block,
        )?,
        strategy: expand_optional(&block, Field::Strategy.config_name(), expand_strategy_block)?,
        template: expand_pod_template_block(block.block(Field::Template.config_name())?)?,
    })
}

pub fn flatten_deployment_spec(spec: &DeploymentSpec) -> Vec<Value> {
    let mut tree = Tree::new();

    tree.insert(
        Field::MinReadySeconds.config_name().to_owned(),
        spec.min_ready_seconds.into(),
    );
    tree.insert(Field::Paused.config_name().to_owned(), spec.paused.into());
    insert_some(
        &mut tree,
        Field::ProgressDeadlineSeconds.config_name(),
        spec.progress_deadline_seconds,
    );
    insert_some(&mut tree, Field::Replicas.config_name(), spec.replicas);
    insert_some(
        &mut tree,
        Field::RevisionHistoryLimit.config_name(),
        spec.revision_history_limit,
    );
    insert_some(
        &mut tree,
        Field::RollbackTo.config_name(),
        spec.rollback_to.as_ref().map(flatten_rollback_to),
    );
    insert_some(
        &mut tree,
        Field::Selector.config_name(),
        spec.selector.as_ref().map(flatten_label_selector),
    );
    insert_some(
        &mut tree,
        Field::Strategy.config_name(),
        spec.strategy.as_ref().map(flatten_strategy),
    );
    tree.insert(
        Field::Template.config_name().to_owned(),
        Value::List(flatten_pod_template(&spec.template)),
    );

    Value::single(tree)
}
