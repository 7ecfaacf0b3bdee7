// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::common::*;
use deployment_version_controller::controllers::deployment_version_controller::trusted::{
    spec_types::DeploymentVersion,
    util::{derived_deployment_name, FINALIZER, VERSION_LABEL},
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{api::Api, discovery::Discovery, Client};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::*;

const BASE_NAME: &str = "pause";
const DV_NAME: &str = "pause-canary";

pub fn base_deployment() -> String {
    "
    apiVersion: apps/v1
    kind: Deployment
    metadata:
      name: pause
      labels:
        app: pause-demo
    spec:
      replicas: 3
      selector:
        matchLabels:
          app: pause-demo
      template:
        metadata:
          labels:
            app: pause-demo
        spec:
          containers:
          - name: pause
            image: registry.k8s.io/pause:3.9
    "
    .to_string()
}

pub fn deployment_version() -> String {
    "
    apiVersion: anvil.dev/v1
    kind: DeploymentVersion
    metadata:
      name: pause-canary
    spec:
      baseName: pause
      overlay:
        template:
          metadata:
            labels:
              track: canary
          spec:
            containers:
            - name: pause
              image: registry.k8s.io/pause:3.8
    "
    .to_string()
}

fn images_of(deployment: &Deployment) -> Vec<String> {
    deployment
        .spec
        .iter()
        .flat_map(|spec| spec.template.spec.iter())
        .flat_map(|pod_spec| pod_spec.containers.iter())
        .filter_map(|c| c.image.clone())
        .collect()
}

fn template_label<'a>(deployment: &'a Deployment, key: &str) -> Option<&'a String> {
    deployment
        .spec
        .as_ref()?
        .template
        .metadata
        .as_ref()?
        .labels
        .as_ref()?
        .get(key)
}

/// Polls the derived Deployment until it has the expected replicas and image.
async fn wait_for_derived(client: Client, replicas: i32, image: &str, test_name: &str) -> Result<Deployment, Error> {
    let timeout = Duration::from_secs(120);
    let start = Instant::now();
    let deploy_api: Api<Deployment> = Api::default_namespaced(client);
    let derived_name = derived_deployment_name(DV_NAME);
    loop {
        sleep(Duration::from_secs(5)).await;
        if start.elapsed() > timeout {
            error!("Time out on {}", test_name);
            return Err(Error::Timeout);
        }
        let deployment = match deploy_api.get(&derived_name).await {
            Err(e) => {
                info!("Get Deployment {} failed with error {}.", derived_name, e);
                continue;
            }
            Ok(deployment) => deployment,
        };
        let current_replicas = deployment.spec.as_ref().and_then(|spec| spec.replicas);
        if current_replicas != Some(replicas) {
            info!("Derived replicas is {:?} which is not {}; still reconciling.", current_replicas, replicas);
            continue;
        }
        if images_of(&deployment) != vec![image.to_string()] {
            info!("Derived images are {:?} which is not [{}]; still reconciling.", images_of(&deployment), image);
            continue;
        }
        return Ok(deployment);
    }
}

pub async fn desired_state_test(client: Client) -> Result<(), Error> {
    let deployment = wait_for_derived(client.clone(), 3, "registry.k8s.io/pause:3.8", "desired state test").await?;

    let labels = deployment.metadata.labels.clone().unwrap_or_default();
    if labels.get(VERSION_LABEL).map(String::as_str) != Some(DV_NAME)
        || labels.get("app").map(String::as_str) != Some("pause-demo")
    {
        return Err(Error::DerivedDeploymentFailed(format!("unexpected labels {:?}", labels)));
    }
    if template_label(&deployment, "track").map(String::as_str) != Some("canary")
        || template_label(&deployment, "app").map(String::as_str) != Some("pause-demo")
    {
        return Err(Error::DerivedDeploymentFailed("template labels are not merged".to_string()));
    }

    let dv_api: Api<DeploymentVersion> = Api::default_namespaced(client.clone());
    let dv = dv_api.get(DV_NAME).await?;
    let controlled = deployment
        .metadata
        .owner_references
        .iter()
        .flatten()
        .any(|r| r.controller == Some(true) && Some(&r.uid) == dv.metadata.uid.as_ref());
    if !controlled {
        return Err(Error::DerivedDeploymentFailed("not controlled by the DeploymentVersion".to_string()));
    }
    if !dv.metadata.finalizers.iter().flatten().any(|f| f == FINALIZER) {
        return Err(Error::StatusFailed("finalizer is missing".to_string()));
    }

    let timeout = Duration::from_secs(60);
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout {
            error!("Time out on desired state test");
            return Err(Error::Timeout);
        }
        let dv = dv_api.get(DV_NAME).await?;
        let ready = dv
            .status
            .as_ref()
            .and_then(|status| status.ready_condition())
            .map(|condition| condition.status.clone());
        if ready.as_deref() == Some("True") {
            break;
        }
        info!("Ready condition is {:?}; still reconciling.", ready);
        sleep(Duration::from_secs(5)).await;
    }

    // The base is left untouched
    let deploy_api: Api<Deployment> = Api::default_namespaced(client);
    let base = deploy_api.get(BASE_NAME).await?;
    if images_of(&base) != vec!["registry.k8s.io/pause:3.9".to_string()] {
        return Err(Error::DerivedDeploymentFailed("base Deployment was modified".to_string()));
    }
    info!("Desired state test passed.");
    Ok(())
}

pub async fn base_scaling_test(client: Client) -> Result<(), Error> {
    run_command(
        "kubectl",
        vec![
            "patch",
            "deployment",
            BASE_NAME,
            "--type=json",
            "-p",
            "[{\"op\": \"replace\", \"path\": \"/spec/replicas\", \"value\": 5}]",
        ],
    )?;
    wait_for_derived(client, 5, "registry.k8s.io/pause:3.8", "base scaling test").await?;
    info!("Base scaling test passed.");
    Ok(())
}

pub async fn overlay_patch_test(client: Client) -> Result<(), Error> {
    run_command(
        "kubectl",
        vec![
            "patch",
            "dv",
            DV_NAME,
            "--type=merge",
            "-p",
            "{\"spec\": {\"overlay\": {\"replicas\": 2}}}",
        ],
    )?;
    wait_for_derived(client, 2, "registry.k8s.io/pause:3.8", "overlay patch test").await?;
    info!("Overlay patch test passed.");
    Ok(())
}

pub async fn deletion_test(client: Client) -> Result<(), Error> {
    run_command("kubectl", vec!["delete", "dv", DV_NAME, "--wait=false"])?;

    let timeout = Duration::from_secs(120);
    let start = Instant::now();
    let deploy_api: Api<Deployment> = Api::default_namespaced(client.clone());
    let dv_api: Api<DeploymentVersion> = Api::default_namespaced(client);
    let derived_name = derived_deployment_name(DV_NAME);
    loop {
        sleep(Duration::from_secs(5)).await;
        if start.elapsed() > timeout {
            error!("Time out on deletion test");
            return Err(Error::Timeout);
        }
        if deploy_api.get_opt(&derived_name).await?.is_some() {
            info!("Derived Deployment {} still exists.", derived_name);
            continue;
        }
        if dv_api.get_opt(DV_NAME).await?.is_some() {
            info!("DeploymentVersion {} still exists.", DV_NAME);
            continue;
        }
        break;
    }
    if deploy_api.get_opt(BASE_NAME).await?.is_none() {
        return Err(Error::DerivedDeploymentFailed("base Deployment was deleted".to_string()));
    }
    info!("Deletion test passed.");
    Ok(())
}

pub async fn deployment_version_e2e_test() -> Result<(), Error> {
    // check if the CRD is already registered
    let client = Client::try_default().await?;
    let crd_api: Api<CustomResourceDefinition> = Api::all(client.clone());
    match crd_api.get("deploymentversions.anvil.dev").await {
        Err(e) => {
            error!("DeploymentVersion CRD not found, create one before run the e2e test.");
            return Err(Error::CRDGetFailed(e));
        }
        Ok(_) => {
            info!("DeploymentVersion CRD found, continue to run the e2e test.");
        }
    }

    let discovery = Discovery::new(client.clone()).run().await?;
    apply(base_deployment(), client.clone(), &discovery).await?;
    apply(deployment_version(), client.clone(), &discovery).await?;

    desired_state_test(client.clone()).await?;
    base_scaling_test(client.clone()).await?;
    overlay_patch_test(client.clone()).await?;
    deletion_test(client.clone()).await?;

    info!("E2e test passed.");
    Ok(())
}
