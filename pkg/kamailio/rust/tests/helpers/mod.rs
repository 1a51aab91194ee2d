// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(dead_code)]

use kamailio_operator::config::DesiredConfig;
use kamailio_operator::files::FileStore;
use kamailio_operator::infrastructure::{
    InMemoryConfigSource, InMemoryFileStore, InMemoryStateStore, InMemorySupervisor,
    JsonFileStateStore, LocalFileStore, RecordingActionChannel, RecordingIngress, RecordingStatus,
};
use kamailio_operator::state::StateStore;
use kamailio_operator::{KamailioCharm, Runtime};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

pub const APP_NAME: &str = "kamailio";

/// A runtime wired to observable collaborators. File and state storage can
/// be swapped for on-disk adapters.
pub struct Harness {
    pub runtime: Runtime,
    pub supervisor: Arc<InMemorySupervisor>,
    pub config: Arc<InMemoryConfigSource>,
    pub ingress: Arc<RecordingIngress>,
    pub status: Arc<RecordingStatus>,
    pub actions: Arc<RecordingActionChannel>,
}

impl Harness {
    pub fn in_memory() -> (Self, Arc<InMemoryFileStore>, Arc<InMemoryStateStore>) {
        let files = Arc::new(InMemoryFileStore::new());
        let state = Arc::new(InMemoryStateStore::new());
        let harness = Self::build(files.clone(), state.clone(), BTreeMap::new());
        (harness, files, state)
    }

    /// Files under `root`, state in `root/.kamailio-state.json`.
    pub fn on_disk(root: &Path) -> Self {
        Self::build(
            Arc::new(LocalFileStore::new(root.join("rootfs"))),
            Arc::new(JsonFileStateStore::new(root.join(".kamailio-state.json"))),
            BTreeMap::new(),
        )
    }

    pub fn with_action_params(params: &[(&str, &str)]) -> Self {
        let params = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::build(
            Arc::new(InMemoryFileStore::new()),
            Arc::new(InMemoryStateStore::new()),
            params,
        )
    }

    fn build(
        files: Arc<dyn FileStore>,
        state: Arc<dyn StateStore>,
        params: BTreeMap<String, String>,
    ) -> Self {
        let supervisor = Arc::new(InMemorySupervisor::new());
        let config = Arc::new(InMemoryConfigSource::new(
            DesiredConfig::defaults().unwrap(),
        ));
        let ingress = Arc::new(RecordingIngress::new());
        let status = Arc::new(RecordingStatus::new());
        let actions = Arc::new(RecordingActionChannel::new(params));

        let charm = KamailioCharm::new(APP_NAME, supervisor.clone(), files, ingress.clone());
        let runtime = Runtime::new(
            charm,
            config.clone(),
            status.clone(),
            state,
            actions.clone(),
        );
        Self {
            runtime,
            supervisor,
            config,
            ingress,
            status,
            actions,
        }
    }
}

/// Run the operator binary with a clean platform environment.
pub fn run_operator(args: &[&str], envs: &[(&str, &str)]) -> Output {
    let bin = env!("CARGO_BIN_EXE_kamailio-operator");
    let mut cmd = Command::new(bin);
    for var in [
        "JUJU_DISPATCH_PATH",
        "JUJU_APPLICATION_NAME",
        "JUJU_UNIT_NAME",
        "JUJU_CHARM_DIR",
        "KAMAILIO_LOG_LEVEL",
        "KAMAILIO_DRY_RUN",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.args(args)
        .envs(envs.iter().copied())
        .output()
        .expect("failed to run kamailio-operator")
}

/// Combined stdout and stderr; simple_logger splits levels across both.
pub fn logs(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}
