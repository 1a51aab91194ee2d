// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Operator-invoked actions and their results.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

const NOT_IMPLEMENTED: &str = "Currently not implemented.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Start,
    Stop,
    Restart,
    Kamctl { args: String },
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Start => "start",
            ActionKind::Stop => "stop",
            ActionKind::Restart => "restart",
            ActionKind::Kamctl { .. } => "kamctl",
        }
    }

    /// Whether the action reads parameters before it can run.
    pub fn takes_params(&self) -> bool {
        matches!(self, ActionKind::Kamctl { .. })
    }
}

/// Result of an action, reported back to whoever invoked it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed(BTreeMap<String, String>),
    Failed(String),
}

impl ActionOutcome {
    pub fn output(message: impl Into<String>) -> Self {
        ActionOutcome::Completed(BTreeMap::from([("output".to_string(), message.into())]))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ActionOutcome::Failed(_))
    }
}

/// `kamctl` is not wired to the workload yet; the action only acknowledges
/// the call.
pub fn kamctl_stub(args: &str) -> ActionOutcome {
    let key = if args.is_empty() {
        "kamctl called"
    } else {
        "kamctl called with args"
    };
    ActionOutcome::Completed(BTreeMap::from([(
        key.to_string(),
        NOT_IMPLEMENTED.to_string(),
    )]))
}

/// Parameter input and result output for the running action.
#[async_trait]
pub trait ActionChannel: Send + Sync {
    /// Value of a string parameter, empty when unset.
    async fn param(&self, name: &str) -> Result<String>;

    async fn set_results(&self, results: &BTreeMap<String, String>) -> Result<()>;

    async fn fail(&self, message: &str) -> Result<()>;
}
