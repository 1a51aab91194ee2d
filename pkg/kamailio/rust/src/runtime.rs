// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! One operator invocation: load state, run the handler for an event, then
//! persist the result and report it.

use crate::actions::{ActionChannel, ActionKind, ActionOutcome};
use crate::charm::{KamailioCharm, Reconciled};
use crate::config::ConfigSource;
use crate::dispatch::Event;
use crate::error::Result;
use crate::layer::SERVICE_NAME;
use crate::state::StateStore;
use crate::status::{StatusReporter, UnitStatus};
use log::{debug, info, warn};
use std::sync::Arc;

pub const INSTALL_MESSAGE: &str = "installing charm";

pub struct Runtime {
    charm: KamailioCharm,
    config: Arc<dyn ConfigSource>,
    status: Arc<dyn StatusReporter>,
    state: Arc<dyn StateStore>,
    actions: Arc<dyn ActionChannel>,
}

impl Runtime {
    pub fn new(
        charm: KamailioCharm,
        config: Arc<dyn ConfigSource>,
        status: Arc<dyn StatusReporter>,
        state: Arc<dyn StateStore>,
        actions: Arc<dyn ActionChannel>,
    ) -> Self {
        Self {
            charm,
            config,
            status,
            state,
            actions,
        }
    }

    pub async fn handle(&self, event: Event) -> Result<()> {
        info!("[{SERVICE_NAME}] handling {event}");
        match event {
            Event::Install => self.install().await,
            Event::Action(kind) => self.run_action(&kind).await,
            Event::IngressRelationChanged => {
                let desired = self.config.desired_config().await?;
                self.charm.on_ingress_relation_changed(&desired).await
            }
            Event::ConfigChanged | Event::PebbleReady | Event::UpgradeCharm => {
                self.reconcile().await.map(|_| ())
            }
        }
    }

    /// Run a reconciliation pass. The recorded state is only saved when the
    /// pass succeeds.
    pub async fn reconcile(&self) -> Result<Reconciled> {
        let desired = self.config.desired_config().await?;
        let recorded = match self.state.load().await? {
            Some(recorded) => recorded,
            None => {
                debug!("[{SERVICE_NAME}] no recorded state, starting from the initial state");
                self.charm.initial_state(&desired)
            }
        };

        let reconciled = self.charm.on_config_changed(&desired, recorded).await?;
        self.state.save(&reconciled.state).await?;
        self.status.set_status(&reconciled.status).await?;
        info!("[{SERVICE_NAME}] unit is {}", reconciled.status);
        Ok(reconciled)
    }

    async fn install(&self) -> Result<()> {
        self.status
            .set_status(&UnitStatus::Maintenance(INSTALL_MESSAGE.to_string()))
            .await?;
        if self.state.load().await?.is_none() {
            let desired = self.config.desired_config().await?;
            self.state.save(&self.charm.initial_state(&desired)).await?;
            debug!("[{SERVICE_NAME}] initial state recorded");
        }
        Ok(())
    }

    /// Report an action's outcome. A failed action is not an invocation
    /// error.
    async fn run_action(&self, kind: &ActionKind) -> Result<()> {
        let report = self.charm.on_action(kind).await;
        match &report.outcome {
            ActionOutcome::Completed(results) => self.actions.set_results(results).await?,
            ActionOutcome::Failed(message) => {
                warn!("[{SERVICE_NAME}] {} action failed: {message}", kind.name());
                self.actions.fail(message).await?;
            }
        }
        if let Some(status) = &report.status {
            self.status.set_status(status).await?;
        }
        Ok(())
    }
}
