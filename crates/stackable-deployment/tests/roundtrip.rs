use indoc::indoc;
use rstest::rstest;
use stackable_deployment::{
    deployment::{Deployment, DeploymentSpec},
    k8s_openapi::apimachinery::pkg::util::intstr::IntOrString,
    mapper::{expand_deployment_spec, flatten_deployment_spec},
    resource::{expand_deployment, flatten_deployment},
};

const FULL: &str = indoc! {"
    apiVersion: extensions/v1beta1
    kind: Deployment
    metadata:
      name: web
      namespace: default
      labels:
        app.kubernetes.io/name: web
      annotations:
        description: frontend
    spec:
      replicas: 3
      minReadySeconds: 10
      paused: true
      progressDeadlineSeconds: 600
      revisionHistoryLimit: 0
      rollbackTo:
        revision: 4
      selector:
        matchLabels:
          app.kubernetes.io/name: web
        matchExpressions:
          - key: tier
            operator: In
            values: [backend, frontend]
          - key: canary
            operator: DoesNotExist
      strategy:
        type: RollingUpdate
        rollingUpdate:
          maxSurge: 25%
          maxUnavailable: 1
      template:
        metadata:
          labels:
            app.kubernetes.io/name: web
        spec:
          containers:
            - name: web
              image: nginx:1.27
              args: [-g, daemon off;]
              env:
                - name: MODE
                  value: production
              ports:
                - containerPort: 8080
                  protocol: TCP
          restartPolicy: Always
          terminationGracePeriodSeconds: 30
"};

const MINIMAL: &str = indoc! {"
    apiVersion: extensions/v1beta1
    kind: Deployment
    metadata:
      name: minimal
    spec:
      template: {}
"};

const RECREATE: &str = indoc! {"
    apiVersion: extensions/v1beta1
    kind: Deployment
    metadata:
      name: recreate
    spec:
      replicas: 0
      strategy:
        type: Recreate
      template:
        spec:
          containers:
            - name: worker
              image: busybox
              command: [sh, -c, sleep 3600]
"};

const UNSORTED_SELECTOR: &str = indoc! {"
    apiVersion: extensions/v1beta1
    kind: Deployment
    metadata:
      name: unsorted
    spec:
      selector:
        matchExpressions:
          - key: tier
            operator: NotIn
            values: [frontend, cache, backend]
      template: {}
"};

#[rstest]
#[case::full(FULL)]
#[case::minimal(MINIMAL)]
#[case::recreate(RECREATE)]
fn spec_round_trip(#[case] input: &str) {
    let deployment: Deployment = serde_yaml::from_str(input).unwrap();

    let flattened = flatten_deployment_spec(&deployment.spec);

    assert_eq!(expand_deployment_spec(&flattened).unwrap(), deployment.spec);
}

#[rstest]
#[case::full(FULL)]
#[case::minimal(MINIMAL)]
#[case::recreate(RECREATE)]
fn deployment_round_trip(#[case] input: &str) {
    let deployment: Deployment = serde_yaml::from_str(input).unwrap();

    let config = flatten_deployment(&deployment);

    assert_eq!(expand_deployment(&config).unwrap(), deployment);
}

#[test]
fn rolling_update_bounds_keep_their_encoding() {
    let deployment: Deployment = serde_yaml::from_str(FULL).unwrap();

    let spec: DeploymentSpec =
        expand_deployment_spec(&flatten_deployment_spec(&deployment.spec)).unwrap();
    let rolling_update = spec.strategy.unwrap().rolling_update.unwrap();

    assert_eq!(
        rolling_update.max_surge,
        Some(IntOrString::String("25%".to_owned()))
    );
    assert_eq!(rolling_update.max_unavailable, Some(IntOrString::Int(1)));
}

#[test]
fn selector_values_come_back_sorted() {
    let deployment: Deployment = serde_yaml::from_str(UNSORTED_SELECTOR).unwrap();

    let config = flatten_deployment(&deployment);
    let expanded = expand_deployment(&config).unwrap();
    let requirements = expanded.spec.selector.clone().unwrap().match_expressions.unwrap();

    assert_eq!(
        requirements[0].values,
        Some(vec![
            "backend".to_owned(),
            "cache".to_owned(),
            "frontend".to_owned()
        ])
    );
    assert_ne!(expanded, deployment);
}
