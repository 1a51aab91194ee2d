// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Workload status reported to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    Active(String),
    Blocked(String),
    Maintenance(String),
    Waiting(String),
}

impl UnitStatus {
    /// Name of the status as understood by `status-set`.
    pub fn name(&self) -> &'static str {
        match self {
            UnitStatus::Active(_) => "active",
            UnitStatus::Blocked(_) => "blocked",
            UnitStatus::Maintenance(_) => "maintenance",
            UnitStatus::Waiting(_) => "waiting",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            UnitStatus::Active(msg)
            | UnitStatus::Blocked(msg)
            | UnitStatus::Maintenance(msg)
            | UnitStatus::Waiting(msg) => msg,
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message().is_empty() {
            write!(f, "{}", self.name())
        } else {
            write!(f, "{}: {}", self.name(), self.message())
        }
    }
}

#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn set_status(&self, status: &UnitStatus) -> Result<()>;
}
