// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use kube::{
    api::{Api, DynamicObject, Patch, PatchParams, ResourceExt},
    core::GroupVersionKind,
    discovery::{ApiCapabilities, ApiResource, Discovery, Scope},
    Client,
};
use std::process::Command;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to get kube client: {0}")]
    ClientGetFailed(#[from] kube::Error),

    #[error("Failed to apply yaml file!")]
    ApplyFailed,

    #[error("Failed to parse the yaml file!")]
    ParseYamlFailed(#[from] serde_yaml::Error),

    #[error("Failed to parse the json format!")]
    ParseJsonFailed(#[from] serde_json::Error),

    #[error("Failed to get CRD: {0}")]
    CRDGetFailed(#[source] kube::Error),

    #[error("Failed to run command: {0}")]
    CommandFailed(String),

    #[error("Timeout, e2e test failed!")]
    Timeout,

    #[error("Derived Deployment is not consistent with the DeploymentVersion: {0}")]
    DerivedDeploymentFailed(String),

    #[error("DeploymentVersion status is not consistent with the derived Deployment: {0}")]
    StatusFailed(String),
}

pub async fn apply(yaml: String, client: Client, discovery: &Discovery) -> Result<String, Error> {
    let ssapply = PatchParams::apply("kubectl-light").force();
    let doc = serde_yaml::from_str(&yaml)?;

    let obj: DynamicObject = serde_yaml::from_value(doc)?;
    let namespace = obj.metadata.namespace.as_deref();
    let gvk = match &obj.types {
        Some(tm) => GroupVersionKind::try_from(tm).map_err(|_| Error::ApplyFailed)?,
        None => {
            info!("cannot apply object without valid TypeMeta {:?}", obj);
            return Err(Error::ApplyFailed);
        }
    };
    let name = obj.name_any();
    match discovery.resolve_gvk(&gvk) {
        Some((ar, caps)) => {
            let api = dynamic_api(ar, caps, client.clone(), namespace);
            info!("Applying {}: \n{}", gvk.kind, serde_yaml::to_string(&obj)?);
            let data: serde_json::Value = serde_json::to_value(&obj)?;
            api.patch(&name, &ssapply, &Patch::Apply(data)).await?;
            info!("applied {} {}", gvk.kind, name);
        }
        None => {
            info!("Cannot apply document for unknown {:?}", gvk);
            return Err(Error::ApplyFailed);
        }
    }

    Ok(name)
}

fn dynamic_api(ar: ApiResource, caps: ApiCapabilities, client: Client, ns: Option<&str>) -> Api<DynamicObject> {
    if caps.scope == Scope::Cluster {
        Api::all_with(client, &ar)
    } else if let Some(namespace) = ns {
        Api::namespaced_with(client, namespace, &ar)
    } else {
        Api::default_namespaced_with(client, &ar)
    }
}

pub fn run_command(program: &str, args: Vec<&str>) -> Result<(String, String), Error> {
    info!("{} {}", program, args.join(" "));
    let cmd = Command::new(program)
        .args(args)
        .output()
        .map_err(|err| Error::CommandFailed(format!("{}: {}", program, err)))?;
    let stdout = String::from_utf8_lossy(&cmd.stdout).to_string();
    let stderr = String::from_utf8_lossy(&cmd.stderr).to_string();
    info!("cmd output: {}", stdout);
    info!("cmd error: {}", stderr);
    if !cmd.status.success() {
        return Err(Error::CommandFailed(stderr));
    }
    Ok((stdout, stderr))
}
