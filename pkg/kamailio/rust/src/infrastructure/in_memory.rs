// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! In-memory collaborators.
//!
//! These back `--dry-run` invocations and the test suites. They keep every
//! call observable so callers can assert on what a pass did.

use crate::actions::ActionChannel;
use crate::config::{
    BIND_ADDRESS_PORT, ConfigSource, DesiredConfig, EXTERNAL_URL, SIP_DOMAIN, TLS_SECRET_NAME,
};
use crate::error::{OperatorError, Result};
use crate::files::FileStore;
use crate::ingress::{IngressRegistrar, IngressSpec};
use crate::layer::{Layer, Plan};
use crate::state::{RecordedState, StateStore};
use crate::status::{StatusReporter, UnitStatus};
use crate::supervisor::{ProcessSupervisor, ServiceInfo, ServiceStatus};
use async_trait::async_trait;
use log::debug;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct SupervisorState {
    plan: Plan,
    labels: HashSet<String>,
    status: HashMap<String, ServiceStatus>,
    starts: HashMap<String, usize>,
    stops: HashMap<String, usize>,
    fail_next: Option<String>,
}

impl SupervisorState {
    fn take_failure(&mut self) -> Result<()> {
        match self.fail_next.take() {
            Some(reason) => Err(OperatorError::Supervisor(reason)),
            None => Ok(()),
        }
    }
}

/// Supervisor that tracks the plan and service states in memory. Services
/// can be started whether or not a layer defines them.
#[derive(Default)]
pub struct InMemorySupervisor {
    state: Mutex<SupervisorState>,
}

impl InMemorySupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next supervisor call fail with `reason`.
    pub fn fail_next(&self, reason: impl Into<String>) {
        lock(&self.state).fail_next = Some(reason.into());
    }

    pub fn plan(&self) -> Plan {
        lock(&self.state).plan.clone()
    }

    pub fn status(&self, name: &str) -> ServiceStatus {
        lock(&self.state)
            .status
            .get(name)
            .copied()
            .unwrap_or_default()
    }

    pub fn start_count(&self, name: &str) -> usize {
        lock(&self.state).starts.get(name).copied().unwrap_or(0)
    }

    pub fn stop_count(&self, name: &str) -> usize {
        lock(&self.state).stops.get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ProcessSupervisor for InMemorySupervisor {
    async fn get_plan(&self) -> Result<Plan> {
        let mut state = lock(&self.state);
        state.take_failure()?;
        Ok(state.plan.clone())
    }

    async fn add_layer(&self, label: &str, layer: &Layer, combine: bool) -> Result<()> {
        let mut state = lock(&self.state);
        state.take_failure()?;
        if !combine && state.labels.contains(label) {
            return Err(OperatorError::Supervisor(format!(
                "layer \"{label}\" already exists"
            )));
        }
        state.labels.insert(label.to_string());
        state.plan.combine(layer);
        debug!("in-memory plan now has {} service(s)", state.plan.services.len());
        Ok(())
    }

    async fn get_service(&self, name: &str) -> Result<ServiceInfo> {
        let mut state = lock(&self.state);
        state.take_failure()?;
        Ok(ServiceInfo {
            name: name.to_string(),
            startup: state
                .plan
                .services
                .get(name)
                .map(|s| s.startup)
                .unwrap_or_default(),
            current: state.status.get(name).copied().unwrap_or_default(),
        })
    }

    async fn start(&self, name: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.take_failure()?;
        state.status.insert(name.to_string(), ServiceStatus::Active);
        *state.starts.entry(name.to_string()).or_default() += 1;
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<()> {
        let mut state = lock(&self.state);
        state.take_failure()?;
        state.status.insert(name.to_string(), ServiceStatus::Inactive);
        *state.stops.entry(name.to_string()).or_default() += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryFileStore {
    files: Mutex<HashMap<String, String>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<String> {
        lock(&self.files).get(path).cloned()
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn push(&self, path: &str, content: &str) -> Result<()> {
        lock(&self.files).insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn pull(&self, path: &str) -> Result<String> {
        self.get(path)
            .ok_or_else(|| OperatorError::FileNotFound(path.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingIngress {
    updates: Mutex<Vec<IngressSpec>>,
}

impl RecordingIngress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<IngressSpec> {
        lock(&self.updates).clone()
    }
}

#[async_trait]
impl IngressRegistrar for RecordingIngress {
    async fn update_config(&self, spec: &IngressSpec) -> Result<()> {
        lock(&self.updates).push(spec.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingStatus {
    statuses: Mutex<Vec<UnitStatus>>,
}

impl RecordingStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<UnitStatus> {
        lock(&self.statuses).last().cloned()
    }

    pub fn statuses(&self) -> Vec<UnitStatus> {
        lock(&self.statuses).clone()
    }
}

#[async_trait]
impl StatusReporter for RecordingStatus {
    async fn set_status(&self, status: &UnitStatus) -> Result<()> {
        lock(&self.statuses).push(status.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryStateStore {
    state: Mutex<Option<RecordedState>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<RecordedState> {
        lock(&self.state).clone()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self) -> Result<Option<RecordedState>> {
        Ok(self.current())
    }

    async fn save(&self, state: &RecordedState) -> Result<()> {
        *lock(&self.state) = Some(state.clone());
        Ok(())
    }
}

/// Configuration source whose values can be changed between passes.
pub struct InMemoryConfigSource {
    config: Mutex<DesiredConfig>,
}

impl InMemoryConfigSource {
    pub fn new(config: DesiredConfig) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    /// Set a single option by its charm config key.
    pub fn update(&self, key: &str, value: &str) -> Result<()> {
        let mut config = lock(&self.config);
        let field = match key {
            EXTERNAL_URL => &mut config.external_url,
            TLS_SECRET_NAME => &mut config.tls_secret_name,
            BIND_ADDRESS_PORT => &mut config.bind_address_port,
            SIP_DOMAIN => &mut config.sip_domain,
            other => {
                return Err(OperatorError::InvalidConfig(format!(
                    "unknown option '{other}'"
                )));
            }
        };
        *field = value.to_string();
        Ok(())
    }
}

#[async_trait]
impl ConfigSource for InMemoryConfigSource {
    async fn desired_config(&self) -> Result<DesiredConfig> {
        Ok(lock(&self.config).clone())
    }
}

/// Action channel fed from a fixed parameter map.
#[derive(Default)]
pub struct RecordingActionChannel {
    params: BTreeMap<String, String>,
    results: Mutex<Option<BTreeMap<String, String>>>,
    failure: Mutex<Option<String>>,
}

impl RecordingActionChannel {
    pub fn new(params: BTreeMap<String, String>) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn results(&self) -> Option<BTreeMap<String, String>> {
        lock(&self.results).clone()
    }

    pub fn failure(&self) -> Option<String> {
        lock(&self.failure).clone()
    }
}

#[async_trait]
impl ActionChannel for RecordingActionChannel {
    async fn param(&self, name: &str) -> Result<String> {
        Ok(self.params.get(name).cloned().unwrap_or_default())
    }

    async fn set_results(&self, results: &BTreeMap<String, String>) -> Result<()> {
        *lock(&self.results) = Some(results.clone());
        Ok(())
    }

    async fn fail(&self, message: &str) -> Result<()> {
        *lock(&self.failure) = Some(message.to_string());
        Ok(())
    }
}
