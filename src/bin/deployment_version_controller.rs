// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use anyhow::Result;
use clap::{Parser, Subcommand};
use deployment_version_controller::controllers::deployment_version_controller::exec::reconciler::DeploymentVersionReconciler;
use deployment_version_controller::controllers::deployment_version_controller::trusted::spec_types::DeploymentVersion;
use deployment_version_controller::shim_layer::config::ControllerArgs;
use deployment_version_controller::shim_layer::controller_runtime::run_controller;
use kube::CustomResourceExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deployment-version-controller", version, about = "Derives Deployments from a base Deployment and an overlay")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the DeploymentVersion CRD as YAML
    Export,
    /// Run the controller
    Run(ControllerArgs),
    /// Run the controller in crash-testing mode
    Crash(ControllerArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Export => {
            println!("{}", serde_yaml::to_string(&DeploymentVersion::crd())?);
        }
        Command::Run(args) => {
            info!("running deployment-version-controller");
            let config = args.into_config(false);
            let reconciler = DeploymentVersionReconciler {
                adoption_policy: config.adoption_policy,
            };
            run_controller(reconciler, config).await?;
        }
        Command::Crash(args) => {
            info!("running deployment-version-controller in crash-testing mode");
            let config = args.into_config(true);
            let reconciler = DeploymentVersionReconciler {
                adoption_policy: config.adoption_policy,
            };
            run_controller(reconciler, config).await?;
        }
    }
    Ok(())
}
