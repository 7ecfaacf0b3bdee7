// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::api_method::*;
use crate::kubernetes_api_objects::error::APIError;
use crate::kubernetes_api_objects::resource::ResourceWrapper;
use crate::reconciler::exec::error::ReconcileError;
use crate::reconciler::exec::reconciler::Reconciler;
use crate::shim_layer::config::ControllerConfig;
use crate::shim_layer::fault_injection::crash_or_continue;
use crate::shim_layer::store::{KubeClientStore, Store};
use crate::Error;
use core::fmt::Debug;
use futures::{Future, StreamExt};
use kube::{
    api::Api,
    core::NamespaceResourceScope,
    runtime::{
        controller::{Action, Controller},
        reflector::ObjectRef,
        watcher,
    },
    Client, Resource,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

// The shim layer connects reconcile_core to kube-rs.
// The key is to implement the reconcile function (impl FnMut(Arc<K>, Arc<Ctx>) -> ReconcilerFut),
// which is required by the kube-rs framework to build a controller,
// on top of reconcile_core, which is provided by the developer.

/// Outcome tells the dispatcher when to reconcile the object again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub requeue: bool,
    pub requeue_after: Option<Duration>,
}

impl Outcome {
    /// Reconcile again only when a watched object changes.
    pub fn await_change() -> Self {
        Outcome {
            requeue: false,
            requeue_after: None,
        }
    }

    pub fn requeue_after(duration: Duration) -> Self {
        Outcome {
            requeue: true,
            requeue_after: Some(duration),
        }
    }
}

impl From<Outcome> for Action {
    fn from(outcome: Outcome) -> Action {
        match outcome.requeue_after {
            Some(duration) if outcome.requeue => Action::requeue(duration),
            _ => Action::await_change(),
        }
    }
}

// Data we want access to in error/reconcile calls
pub struct Data<R> {
    pub client: Client,
    pub reconciler: R,
    pub config: ControllerConfig,
}

/// run_controller prepares and runs the controller. It requires:
/// R: the reconciler type, whose R::K is the custom resource type
/// and R::Owned the type of the objects it creates.
///
/// The controller reconciles a custom resource when it changes, when an object
/// it owns changes, and when an object it reads as input changes (R::dependents).
pub async fn run_controller<R>(reconciler: R, config: ControllerConfig) -> anyhow::Result<()>
where
    R: Reconciler + Send + Sync + 'static,
    R::S: Send,
    R::K: Clone
        + Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + DeserializeOwned
        + Serialize
        + Debug
        + Send
        + Sync
        + 'static,
    R::Owned: Clone
        + Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static,
{
    let client = Client::try_default().await?;
    let crs = Api::<R::K>::all(client.clone());
    let owned = Api::<R::Owned>::all(client.clone());

    let controller = Controller::new(crs, watcher::Config::default())
        .owns(owned.clone(), watcher::Config::default());
    let cr_store = controller.store();
    let controller = controller.watches(owned, watcher::Config::default(), move |obj: R::Owned| {
        R::dependents(&obj, &cr_store.state())
    });

    info!("starting controller");
    controller
        .shutdown_on_signal()
        .run(
            reconcile::<R>,
            error_policy::<R>,
            Arc::new(Data {
                client,
                reconciler,
                config,
            }),
        )
        .for_each(|res| async move {
            match res {
                Ok(o) => info!("reconciled {:?}", o),
                Err(e) => warn!("reconcile failed: {}", e),
            }
        })
        .await;
    info!("controller terminated");
    Ok(())
}

async fn reconcile<R>(cr: Arc<R::K>, ctx: Arc<Data<R>>) -> Result<Action, Error>
where
    R: Reconciler,
    R::K: ResourceWrapper,
{
    let store = KubeClientStore::new(ctx.client.clone());
    let key = ObjectRef::from_obj(cr.as_ref());
    reconcile_with(&ctx.reconciler, &store, &key, &ctx.config)
        .await
        .map(Action::from)
}

pub fn error_policy<R>(_cr: Arc<R::K>, error: &Error, ctx: Arc<Data<R>>) -> Action
where
    R: Reconciler,
{
    warn!("Reconcile failed due to error: {}", error);
    requeue_policy(error, &ctx.config).into()
}

/// Decides when to retry a failed reconcile. Terminal failures wait for the
/// user to change an input.
pub fn requeue_policy(error: &Error, config: &ControllerConfig) -> Outcome {
    match error {
        Error::ReconcileCoreError(err) if err.is_conflict() => {
            Outcome::requeue_after(config.conflict_requeue)
        }
        Error::ReconcileCoreError(err) if !err.is_retryable() => Outcome::await_change(),
        _ => Outcome::requeue_after(config.error_requeue),
    }
}

// reconcile_with implements the reconcile function by repeatedly invoking reconcile_core.
// reconcile_with will be invoked by kube-rs whenever kube-rs's watcher receives any relevant event to the controller.
// In each invocation, reconcile_with invokes reconcile_core in a loop:
// it starts with reconcile_init_state, and in each iteration it invokes reconcile_core
// with the new state returned by the previous invocation.
// For each request from reconcile_core, it sends the request to the store.
// It ends the loop when the reconciler reports the reconcile is done (reconcile_done)
// or encounters error (reconcile_error).
pub async fn reconcile_with<R, S>(
    reconciler: &R,
    store: &S,
    key: &ObjectRef<R::K>,
    config: &ControllerConfig,
) -> Result<Outcome, Error>
where
    R: Reconciler,
    R::K: ResourceWrapper,
    S: Store,
{
    let cr_namespace = key.namespace.as_deref().ok_or_else(|| {
        Error::ShimLayerError("Custom resource misses \".metadata.namespace\"".to_string())
    })?;
    let cr_name = key.name.as_str();
    let cr_ref = KubeObjectRef {
        kind: <R::K as Resource>::kind(&()).to_string(),
        namespace: cr_namespace.to_string(),
        name: cr_name.to_string(),
    };
    let cr_key = cr_ref.to_string();
    let log_header = format!("Reconciling {}:", cr_key);

    // Get the custom resource by a quorum read instead of trusting the cache
    let get_cr_resp = with_timeout(
        config.request_timeout,
        store.get(&<R::K as ResourceWrapper>::api_resource(), cr_namespace, cr_name),
    )
    .await;
    let cr = match get_cr_resp {
        Err(err) if err.is_object_not_found() => {
            info!("{} Custom resource {} not found, end reconcile", log_header, cr_name);
            return Ok(Outcome::await_change());
        }
        Err(err) => {
            warn!("{} Get custom resource {} failed with error: {}, will retry reconcile", log_header, cr_name, err);
            return Err(Error::ReconcileCoreError(ReconcileError::from_api_error(&cr_ref, err)));
        }
        Ok(obj) => <R::K as ResourceWrapper>::unmarshal(obj).map_err(|err| {
            Error::ShimLayerError(format!("Fail to parse custom resource {}: {}", cr_key, err))
        })?,
    };

    let mut state = reconciler.reconcile_init_state();
    let mut resp_option: Option<KubeAPIResponse> = None;
    // Call reconcile_core in a loop
    loop {
        // If reconcile core is done, then breaks the loop
        if reconciler.reconcile_done(&state) {
            info!("{} done", log_header);
            break;
        }
        if let Some(err) = reconciler.reconcile_error(&state) {
            warn!("{} error: {}", log_header, err);
            return Err(Error::ReconcileCoreError(err));
        }
        // Feed the current reconcile state and get the new state and the pending request
        let (state_prime, request_option) = reconciler.reconcile_core(&cr, resp_option, state);
        state = state_prime;
        resp_option = match request_option {
            Some(request) => {
                // Only writes leave something behind for a crash to interrupt
                let check_fault_timing = request.is_mutating();
                let resp = send_request(store, request, config.request_timeout, &log_header).await;
                if check_fault_timing && config.fault_injection {
                    crash_or_continue(store, &cr_key, &log_header).await?;
                }
                Some(resp)
            }
            None => None,
        };
    }
    Ok(Outcome::requeue_after(config.resync_period))
}

async fn send_request<S: Store>(
    store: &S,
    request: KubeAPIRequest,
    timeout: Duration,
    log_header: &str,
) -> KubeAPIResponse {
    let key = request.key();
    match request {
        KubeAPIRequest::GetRequest(get_req) => {
            let res = with_timeout(
                timeout,
                store.get(&get_req.api_resource, &get_req.namespace, &get_req.name),
            )
            .await;
            log_result(log_header, "Get", &key, &res);
            KubeAPIResponse::GetResponse(KubeGetResponse { res })
        }
        KubeAPIRequest::CreateRequest(create_req) => {
            let res = with_timeout(
                timeout,
                store.create(&create_req.api_resource, &create_req.namespace, &create_req.obj),
            )
            .await;
            log_result(log_header, "Create", &key, &res);
            KubeAPIResponse::CreateResponse(KubeCreateResponse { res })
        }
        KubeAPIRequest::DeleteRequest(delete_req) => {
            let res = with_timeout(
                timeout,
                store.delete(
                    &delete_req.api_resource,
                    &delete_req.namespace,
                    &delete_req.name,
                    delete_req.preconditions.as_ref(),
                ),
            )
            .await;
            log_result(log_header, "Delete", &key, &res);
            KubeAPIResponse::DeleteResponse(KubeDeleteResponse { res })
        }
        KubeAPIRequest::UpdateRequest(update_req) => {
            let res = with_timeout(
                timeout,
                store.update(
                    &update_req.api_resource,
                    &update_req.namespace,
                    &update_req.name,
                    &update_req.obj,
                ),
            )
            .await;
            log_result(log_header, "Update", &key, &res);
            KubeAPIResponse::UpdateResponse(KubeUpdateResponse { res })
        }
        KubeAPIRequest::UpdateStatusRequest(update_status_req) => {
            let res = with_timeout(
                timeout,
                store.update_status(
                    &update_status_req.api_resource,
                    &update_status_req.namespace,
                    &update_status_req.name,
                    &update_status_req.obj,
                ),
            )
            .await;
            log_result(log_header, "UpdateStatus", &key, &res);
            KubeAPIResponse::UpdateStatusResponse(KubeUpdateStatusResponse { res })
        }
    }
}

/// An expired deadline surfaces as APIError::Timeout.
async fn with_timeout<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, APIError>>,
) -> Result<T, APIError> {
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or(Err(APIError::Timeout))
}

fn log_result<T>(log_header: &str, verb: &str, key: &KubeObjectRef, res: &Result<T, APIError>) {
    match res {
        Ok(_) => info!("{} {} {} done", log_header, verb, key),
        Err(err) => info!("{} {} {} failed with error: {}", log_header, verb, key, err),
    }
}
