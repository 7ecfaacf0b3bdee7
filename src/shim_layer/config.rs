// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::controllers::deployment_version_controller::exec::reconciler::AdoptionPolicy;
use std::time::Duration;

/// Timing and policy knobs of a running controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Delay before a successfully reconciled object is reconciled again.
    pub resync_period: Duration,
    /// Delay before retrying a retryable failure other than a conflict.
    pub error_requeue: Duration,
    pub conflict_requeue: Duration,
    /// Deadline of every single store call.
    pub request_timeout: Duration,
    pub adoption_policy: AdoptionPolicy,
    /// Consult the fault injection ConfigMap after every write.
    pub fault_injection: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            resync_period: Duration::from_secs(60),
            error_requeue: Duration::from_secs(10),
            conflict_requeue: Duration::ZERO,
            request_timeout: Duration::from_secs(10),
            adoption_policy: AdoptionPolicy::Refuse,
            fault_injection: false,
        }
    }
}

/// Command line options of the run and crash commands.
#[derive(Debug, Clone, clap::Args)]
pub struct ControllerArgs {
    /// Seconds between periodic reconciles of a healthy DeploymentVersion
    #[arg(long, env = "DV_RESYNC_PERIOD", default_value_t = 60)]
    pub resync_period: u64,
    /// Seconds before retrying a failed reconcile
    #[arg(long, env = "DV_ERROR_REQUEUE", default_value_t = 10)]
    pub error_requeue: u64,
    /// Seconds before retrying a reconcile that lost a write conflict
    #[arg(long, env = "DV_CONFLICT_REQUEUE", default_value_t = 0)]
    pub conflict_requeue: u64,
    /// Seconds before a single API call is abandoned
    #[arg(long, env = "DV_REQUEST_TIMEOUT", default_value_t = 10)]
    pub request_timeout: u64,
    /// What to do with an existing derived Deployment that has no controller
    #[arg(long, env = "DV_ADOPTION_POLICY", value_enum, default_value_t = AdoptionPolicy::Refuse)]
    pub adoption_policy: AdoptionPolicy,
}

impl ControllerArgs {
    pub fn into_config(self, fault_injection: bool) -> ControllerConfig {
        ControllerConfig {
            resync_period: Duration::from_secs(self.resync_period),
            error_requeue: Duration::from_secs(self.error_requeue),
            conflict_requeue: Duration::from_secs(self.conflict_requeue),
            request_timeout: Duration::from_secs(self.request_timeout),
            adoption_policy: self.adoption_policy,
            fault_injection,
        }
    }
}
