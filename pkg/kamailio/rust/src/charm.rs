// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Reconciliation of the kamailio workload and the operator actions that
//! drive its lifecycle.

use crate::actions::{ActionKind, ActionOutcome, kamctl_stub};
use crate::config::DesiredConfig;
use crate::error::{OperatorError, Result};
use crate::files::{
    FileStore, KAMCTL_RC_PATH, LOCAL_CONFIG_PATH, render_kamctl_rc, render_local_config,
};
use crate::ingress::{IngressRegistrar, IngressSpec};
use crate::layer::{LAYER_LABEL, SERVICE_NAME, kamailio_layer};
use crate::state::RecordedState;
use crate::status::UnitStatus;
use crate::supervisor::ProcessSupervisor;
use log::{debug, info, warn};
use std::sync::Arc;

pub const READY_MESSAGE: &str = "kamailio is ready";
pub const STOPPED_MESSAGE: &str = "kamailio stopped by operator";

/// Outcome of a reconciliation pass: the state to persist and the status to
/// report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub state: RecordedState,
    pub status: UnitStatus,
}

/// Outcome of an action. `status` is set when the action changed the
/// workload and the unit status should follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub outcome: ActionOutcome,
    pub status: Option<UnitStatus>,
}

pub struct KamailioCharm {
    app_name: String,
    supervisor: Arc<dyn ProcessSupervisor>,
    files: Arc<dyn FileStore>,
    ingress: Arc<dyn IngressRegistrar>,
}

impl KamailioCharm {
    pub fn new(
        app_name: impl Into<String>,
        supervisor: Arc<dyn ProcessSupervisor>,
        files: Arc<dyn FileStore>,
        ingress: Arc<dyn IngressRegistrar>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            supervisor,
            files,
            ingress,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn initial_state(&self, config: &DesiredConfig) -> RecordedState {
        RecordedState::initial(&self.app_name, config)
    }

    /// Converge the workload towards `desired`.
    ///
    /// Each recorded field is updated only together with its side effect, so
    /// the returned state always describes what was last pushed. Collaborator
    /// failures are returned as errors; the caller must not persist state in
    /// that case.
    pub async fn on_config_changed(
        &self,
        desired: &DesiredConfig,
        recorded: RecordedState,
    ) -> Result<Reconciled> {
        let layer = match kamailio_layer(desired) {
            Ok(layer) => layer,
            Err(e) => {
                warn!("[{SERVICE_NAME}] {e}");
                return Ok(Reconciled {
                    state: recorded,
                    status: UnitStatus::Blocked(e.to_string()),
                });
            }
        };

        let mut state = recorded;

        if desired.external_url != state.external_url {
            state.external_url = desired.external_url.clone();
            self.update_ingress(desired).await?;
        }

        if desired.tls_secret_name != state.tls_secret_name {
            state.tls_secret_name = desired.tls_secret_name.clone();
            self.update_ingress(desired).await?;
        }

        if desired.bind_address_port != state.bind_address_port {
            state.bind_address_port = desired.bind_address_port.clone();
            info!(
                "[{SERVICE_NAME}] writing listen address {}",
                state.bind_address_port
            );
            self.files
                .push(
                    LOCAL_CONFIG_PATH,
                    &render_local_config(&state.bind_address_port),
                )
                .await?;
        }

        if desired.sip_domain != state.sip_domain {
            state.sip_domain = desired.sip_domain.clone();
            self.write_sip_domain(&state.sip_domain).await?;
        }

        let plan = self.supervisor.get_plan().await?;
        if !plan.matches(&layer) {
            self.supervisor.add_layer(LAYER_LABEL, &layer, true).await?;
            info!("[{SERVICE_NAME}] added updated layer '{LAYER_LABEL}' to plan");

            if self.supervisor.get_service(SERVICE_NAME).await?.is_running() {
                self.supervisor.stop(SERVICE_NAME).await?;
            }
            self.supervisor.start(SERVICE_NAME).await?;
            info!("[{SERVICE_NAME}] restarted service");
        } else {
            debug!("[{SERVICE_NAME}] plan is up to date");
        }

        Ok(Reconciled {
            state,
            status: UnitStatus::Active(READY_MESSAGE.to_string()),
        })
    }

    /// Republish the ingress requirements on the relation. The recorded
    /// state is not involved; the spec always follows the current config.
    pub async fn on_ingress_relation_changed(&self, desired: &DesiredConfig) -> Result<()> {
        self.update_ingress(desired).await
    }

    /// Run an operator action. Failures never escape; they become a failed
    /// outcome carrying the error message.
    pub async fn on_action(&self, action: &ActionKind) -> ActionReport {
        let result = match action {
            ActionKind::Start => self.on_start_action().await,
            ActionKind::Stop => self.on_stop_action().await,
            ActionKind::Restart => self.on_restart_action().await,
            ActionKind::Kamctl { args } => {
                info!("[{SERVICE_NAME}] kamctl requested with args '{args}'");
                return ActionReport {
                    outcome: kamctl_stub(args),
                    status: None,
                };
            }
        };

        match result {
            Ok((outcome, status)) => ActionReport {
                outcome,
                status: Some(status),
            },
            Err(e) => {
                warn!("[{SERVICE_NAME}] {} action failed: {e}", action.name());
                ActionReport {
                    outcome: ActionOutcome::Failed(e.to_string()),
                    status: None,
                }
            }
        }
    }

    async fn on_start_action(&self) -> Result<(ActionOutcome, UnitStatus)> {
        if self.supervisor.get_service(SERVICE_NAME).await?.is_running() {
            return Err(OperatorError::AlreadyActive(SERVICE_NAME.to_string()));
        }
        self.supervisor.start(SERVICE_NAME).await?;
        info!("[{SERVICE_NAME}] started by operator");
        Ok((
            ActionOutcome::output("kamailio started"),
            UnitStatus::Active(READY_MESSAGE.to_string()),
        ))
    }

    async fn on_stop_action(&self) -> Result<(ActionOutcome, UnitStatus)> {
        if !self.supervisor.get_service(SERVICE_NAME).await?.is_running() {
            return Err(OperatorError::NotRunning(SERVICE_NAME.to_string()));
        }
        self.supervisor.stop(SERVICE_NAME).await?;
        info!("[{SERVICE_NAME}] stopped by operator");
        Ok((
            ActionOutcome::output("kamailio stopped"),
            UnitStatus::Blocked(STOPPED_MESSAGE.to_string()),
        ))
    }

    async fn on_restart_action(&self) -> Result<(ActionOutcome, UnitStatus)> {
        if self.supervisor.get_service(SERVICE_NAME).await?.is_running() {
            self.supervisor.stop(SERVICE_NAME).await?;
        }
        self.supervisor.start(SERVICE_NAME).await?;
        info!("[{SERVICE_NAME}] restarted by operator");
        Ok((
            ActionOutcome::output("kamailio restarted"),
            UnitStatus::Active(READY_MESSAGE.to_string()),
        ))
    }

    async fn update_ingress(&self, desired: &DesiredConfig) -> Result<()> {
        let spec = IngressSpec::from_config(&self.app_name, desired);
        debug!(
            "[{SERVICE_NAME}] updating ingress for {}",
            spec.service_hostname
        );
        self.ingress.update_config(&spec).await
    }

    async fn write_sip_domain(&self, sip_domain: &str) -> Result<()> {
        match self.files.pull(KAMCTL_RC_PATH).await {
            Ok(_) | Err(OperatorError::FileNotFound(_)) => {}
            Err(e) => return Err(e),
        }
        info!("[{SERVICE_NAME}] writing sip domain '{sip_domain}'");
        self.files
            .push(KAMCTL_RC_PATH, &render_kamctl_rc(sip_domain))
            .await
    }
}
