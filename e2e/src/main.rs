// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod common;
pub mod deployment_version_e2e;

use common::Error;
use deployment_version_e2e::deployment_version_e2e_test;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args: Vec<String> = env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("deployment-version") => {
            println!("Running deployment version end-to-end test");
            deployment_version_e2e_test().await
        }
        _ => {
            println!("Please specify one controller");
            Ok(())
        }
    }
}
