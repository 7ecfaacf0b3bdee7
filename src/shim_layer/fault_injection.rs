// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::resource::ResourceWrapper;
use crate::shim_layer::store::Store;
use crate::Error;
use k8s_openapi::api::core::v1::ConfigMap;
use tracing::{info, warn};

pub const FAULT_INJECTION_CONFIG_NAME: &str = "fault-injection-config";
pub const FAULT_INJECTION_CONFIG_NAMESPACE: &str = "default";

/// Counts one write in the fault injection ConfigMap and abandons the
/// reconcile when the count reaches the expected value.
///
/// The ConfigMap holds "current" and "expected" in its data. If it cannot be
/// read or written the reconcile continues.
pub async fn crash_or_continue<S: Store>(store: &S, cr_key: &str, log_header: &str) -> Result<(), Error> {
    match bump_counter(store).await {
        Ok((current, expected)) if current == expected => {
            warn!("{} injecting fault at write {} while reconciling {}", log_header, current, cr_key);
            Err(Error::InjectedFault(format!("{} at write {}", cr_key, current)))
        }
        Ok(_) => Ok(()),
        Err(err) => {
            info!("{} crash_or_continue fails due to {}", log_header, err);
            Ok(())
        }
    }
}

/// Returns the counter value before the increment along with the expected value.
async fn bump_counter<S: Store>(store: &S) -> Result<(i32, i32), String> {
    let api_resource = ConfigMap::api_resource();
    let obj = store
        .get(&api_resource, FAULT_INJECTION_CONFIG_NAMESPACE, FAULT_INJECTION_CONFIG_NAME)
        .await
        .map_err(|err| format!("Fail to get fault injection config: {}", err))?;
    let mut config_map = ConfigMap::unmarshal(obj).map_err(|err| err.to_string())?;
    let data = config_map
        .data
        .as_mut()
        .ok_or_else(|| "Fail to unwrap data".to_string())?;
    let current = parse_entry(data.get("current"), "current")?;
    let expected = parse_entry(data.get("expected"), "expected")?;
    data.insert("current".to_string(), (current + 1).to_string());
    let obj = config_map.marshal().map_err(|err| err.to_string())?;
    store
        .update(&api_resource, FAULT_INJECTION_CONFIG_NAMESPACE, FAULT_INJECTION_CONFIG_NAME, &obj)
        .await
        .map_err(|err| format!("Fail to update fault injection config: {}", err))?;
    Ok((current, expected))
}

fn parse_entry(value: Option<&String>, key: &str) -> Result<i32, String> {
    value
        .ok_or_else(|| format!("Fail to get {}", key))?
        .parse::<i32>()
        .map_err(|_| format!("Fail to parse {} value to i32", key))
}
