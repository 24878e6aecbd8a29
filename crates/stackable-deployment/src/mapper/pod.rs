//! The pod specification nested inside the pod template.
//!
//! Only the commonly used subset of [`PodSpec`] is mapped: containers with their image,
//! command line, environment and ports, plus a handful of pod level settings.
use k8s_openapi::api::core::v1::{Container, ContainerPort, EnvVar, PodSpec};

use crate::{
    codec::insert_some,
    mapper::{non_empty_map, non_empty_strings},
    tree::{BlockReader, Result, Tree, Value},
};

const CONTAINER: &str = "container";
const DNS_POLICY: &str = "dns_policy";
const HOST_NETWORK: &str = "host_network";
const NODE_SELECTOR: &str = "node_selector";
const RESTART_POLICY: &str = "restart_policy";
const SERVICE_ACCOUNT_NAME: &str = "service_account_name";
const TERMINATION_GRACE_PERIOD_SECONDS: &str = "termination_grace_period_seconds";

const ARGS: &str = "args";
const COMMAND: &str = "command";
const ENV: &str = "env";
const IMAGE: &str = "image";
const IMAGE_PULL_POLICY: &str = "image_pull_policy";
const NAME: &str = "name";
const PORT: &str = "port";
const WORKING_DIR: &str = "working_dir";

pub fn expand_pod_spec(list: &[Value]) -> Result<PodSpec> {
    expand_pod_spec_block(BlockReader::first(list)?)
}

pub(crate) fn expand_pod_spec_block(block: Option<BlockReader<'_>>) -> Result<PodSpec> {
    let Some(block) = block else {
        return Ok(PodSpec::default());
    };

    Ok(PodSpec {
        containers: block
            .blocks(CONTAINER)?
            .into_iter()
            .map(expand_container)
            .collect::<Result<_>>()?,
        dns_policy: block.string(DNS_POLICY)?.map(ToOwned::to_owned),
        host_network: block.bool(HOST_NETWORK)?,
        node_selector: non_empty_map(&block, NODE_SELECTOR)?,
        restart_policy: block.string(RESTART_POLICY)?.map(ToOwned::to_owned),
        service_account_name: block.string(SERVICE_ACCOUNT_NAME)?.map(ToOwned::to_owned),
        termination_grace_period_seconds: block.int(TERMINATION_GRACE_PERIOD_SECONDS)?,
        ..PodSpec::default()
    })
}

fn expand_container(block: BlockReader<'_>) -> Result<Container> {
    let env = block
        .blocks(ENV)?
        .into_iter()
        .map(|env| -> Result<EnvVar> {
            Ok(EnvVar {
                name: env.string("name")?.unwrap_or_default().to_owned(),
                value: env.string("value")?.map(ToOwned::to_owned),
                ..EnvVar::default()
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let ports = block
        .blocks(PORT)?
        .into_iter()
        .map(|port| -> Result<ContainerPort> {
            Ok(ContainerPort {
                container_port: port.int32("container_port")?.unwrap_or_default(),
                host_port: port.int32("host_port")?,
                name: port.string("name")?.map(ToOwned::to_owned),
                protocol: port.string("protocol")?.map(ToOwned::to_owned),
                ..ContainerPort::default()
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Container {
        name: block.string(NAME)?.unwrap_or_default().to_owned(),
        image: block.string(IMAGE)?.map(ToOwned::to_owned),
        image_pull_policy: block.string(IMAGE_PULL_POLICY)?.map(ToOwned::to_owned),
        command: non_empty_strings(&block, COMMAND)?,
        args: non_empty_strings(&block, ARGS)?,
        working_dir: block.string(WORKING_DIR)?.map(ToOwned::to_owned),
        env: (!env.is_empty()).then_some(env),
        ports: (!ports.is_empty()).then_some(ports),
        ..Container::default()
    })
}

pub fn flatten_pod_spec(spec: &PodSpec) -> Vec<Value> {
    let mut tree = Tree::new();

    if !spec.containers.is_empty() {
        tree.insert(
            CONTAINER.to_owned(),
            Value::List(spec.containers.iter().map(flatten_container).collect()),
        );
    }
    insert_some(&mut tree, DNS_POLICY, spec.dns_policy.clone());
    insert_some(&mut tree, HOST_NETWORK, spec.host_network);
    insert_some(
        &mut tree,
        NODE_SELECTOR,
        spec.node_selector
            .clone()
            .filter(|selector| !selector.is_empty()),
    );
    insert_some(&mut tree, RESTART_POLICY, spec.restart_policy.clone());
    insert_some(
        &mut tree,
        SERVICE_ACCOUNT_NAME,
        spec.service_account_name.clone(),
    );
    insert_some(
        &mut tree,
        TERMINATION_GRACE_PERIOD_SECONDS,
        spec.termination_grace_period_seconds,
    );

    Value::single(tree)
}

fn flatten_container(container: &Container) -> Value {
    let mut tree = Tree::new();

    tree.insert(NAME.to_owned(), container.name.as_str().into());
    insert_some(&mut tree, IMAGE, container.image.clone());
    insert_some(&mut tree, IMAGE_PULL_POLICY, container.image_pull_policy.clone());
    insert_some(&mut tree, COMMAND, flatten_strings(container.command.as_deref()));
    insert_some(&mut tree, ARGS, flatten_strings(container.args.as_deref()));
    insert_some(&mut tree, WORKING_DIR, container.working_dir.clone());

    if let Some(env) = container.env.as_ref().filter(|env| !env.is_empty()) {
        let env = env
            .iter()
            .map(|var| {
                let mut tree = Tree::new();
                tree.insert("name".to_owned(), var.name.as_str().into());
                insert_some(&mut tree, "value", var.value.clone());
                Value::Block(tree)
            })
            .collect();
        tree.insert(ENV.to_owned(), Value::List(env));
    }

    if let Some(ports) = container.ports.as_ref().filter(|ports| !ports.is_empty()) {
        let ports = ports
            .iter()
            .map(|port| {
                let mut tree = Tree::new();
                tree.insert("container_port".to_owned(), port.container_port.into());
                insert_some(&mut tree, "host_port", port.host_port);
                insert_some(&mut tree, "name", port.name.clone());
                insert_some(&mut tree, "protocol", port.protocol.clone());
                Value::Block(tree)
            })
            .collect();
        tree.insert(PORT.to_owned(), Value::List(ports));
    }

    Value::Block(tree)
}

/// Command lines are ordered, so they are kept as a list rather than a set.
fn flatten_strings(values: Option<&[String]>) -> Option<Value> {
    values
        .filter(|values| !values.is_empty())
        .map(|values| Value::List(values.iter().cloned().map(Value::String).collect()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn pod_spec() -> PodSpec {
        PodSpec {
            containers: vec![Container {
                name: "nginx".to_owned(),
                image: Some("nginx:1.27".to_owned()),
                command: Some(vec!["nginx".to_owned(), "-g".to_owned()]),
                args: Some(vec!["daemon off;".to_owned()]),
                env: Some(vec![EnvVar {
                    name: "MODE".to_owned(),
                    value: Some("production".to_owned()),
                    ..EnvVar::default()
                }]),
                ports: Some(vec![ContainerPort {
                    container_port: 8080,
                    name: Some("http".to_owned()),
                    protocol: Some("TCP".to_owned()),
                    ..ContainerPort::default()
                }]),
                ..Container::default()
            }],
            node_selector: Some(BTreeMap::from([(
                "kubernetes.io/os".to_owned(),
                "linux".to_owned(),
            )])),
            restart_policy: Some("Always".to_owned()),
            termination_grace_period_seconds: Some(30),
            ..PodSpec::default()
        }
    }

    #[test]
    fn round_trip() {
        let spec = pod_spec();

        assert_eq!(expand_pod_spec(&flatten_pod_spec(&spec)).unwrap(), spec);
    }

    #[test]
    fn command_keeps_order() {
        let flattened = flatten_pod_spec(&pod_spec());
        let block = BlockReader::first(&flattened).unwrap().unwrap();
        let container = block.block(CONTAINER).unwrap().unwrap();

        assert_eq!(
            container.strings(COMMAND).unwrap(),
            Some(vec!["nginx".to_owned(), "-g".to_owned()])
        );
    }

    #[test]
    fn container_port_out_of_range() {
        let list = Value::single_block([(
            CONTAINER,
            Value::List(vec![Value::block([
                (NAME, Value::from("nginx")),
                (
                    PORT,
                    Value::List(vec![Value::block([(
                        "container_port",
                        Value::Int(i64::from(i32::MAX) + 1),
                    )])]),
                ),
            ])]),
        )]);

        let err = expand_pod_spec(&list).unwrap_err();
        assert_eq!(
            err.to_string(),
            "integer 2147483648 at 0.container.0.port.0.container_port does not fit into 32 bits"
        );
    }
}
