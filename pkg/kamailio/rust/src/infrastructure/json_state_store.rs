// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{OperatorError, Result};
use crate::state::{RecordedState, StateStore};
use async_trait::async_trait;
use log::debug;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Keeps the recorded state in a JSON file inside the charm directory.
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn load(&self) -> Result<Option<RecordedState>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no recorded state at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(OperatorError::State(format!(
                    "reading {}: {e}",
                    self.path.display()
                )));
            }
        };
        let state = serde_json::from_slice(&raw).map_err(|e| {
            OperatorError::State(format!("parsing {}: {e}", self.path.display()))
        })?;
        Ok(Some(state))
    }

    async fn save(&self, state: &RecordedState) -> Result<()> {
        let body = serde_json::to_vec_pretty(state)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| OperatorError::State(format!("writing {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            OperatorError::State(format!("replacing {}: {e}", self.path.display()))
        })?;
        debug!("recorded state saved to {}", self.path.display());
        Ok(())
    }
}
