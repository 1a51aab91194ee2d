// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Port to the process supervisor running inside the workload container.

use crate::error::Result;
use crate::layer::{Layer, Plan, Startup};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Observed state of a supervised service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Active,
    #[default]
    Inactive,
    Error,
    Backoff,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Active => write!(f, "active"),
            ServiceStatus::Inactive => write!(f, "inactive"),
            ServiceStatus::Error => write!(f, "error"),
            ServiceStatus::Backoff => write!(f, "backoff"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    #[serde(default)]
    pub startup: Startup,
    #[serde(default)]
    pub current: ServiceStatus,
}

impl ServiceInfo {
    pub fn is_running(&self) -> bool {
        self.current == ServiceStatus::Active
    }
}

#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Combined plan of every layer added so far.
    async fn get_plan(&self) -> Result<Plan>;

    /// Add a layer under `label`. With `combine` set, an existing layer with
    /// the same label is merged into instead of rejected.
    async fn add_layer(&self, label: &str, layer: &Layer, combine: bool) -> Result<()>;

    /// Look up one service. Unknown services report as inactive.
    async fn get_service(&self, name: &str) -> Result<ServiceInfo>;

    async fn start(&self, name: &str) -> Result<()>;

    async fn stop(&self, name: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_active_is_running() {
        for (current, running) in [
            (ServiceStatus::Active, true),
            (ServiceStatus::Inactive, false),
            (ServiceStatus::Error, false),
            (ServiceStatus::Backoff, false),
        ] {
            let info = ServiceInfo {
                name: "kamailio".to_string(),
                startup: Startup::Enabled,
                current,
            };
            assert_eq!(info.is_running(), running, "{current}");
        }
    }

    #[test]
    fn test_service_info_from_pebble_json() {
        let info: ServiceInfo =
            serde_json::from_str(r#"{"name":"kamailio","startup":"enabled","current":"active"}"#)
                .unwrap();
        assert!(info.is_running());
        assert_eq!(info.startup, Startup::Enabled);
    }
}
