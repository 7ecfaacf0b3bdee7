// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod config;
pub mod controller_runtime;
pub mod fault_injection;
pub mod store;
