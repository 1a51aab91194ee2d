// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("{0} is already active")]
    AlreadyActive(String),

    #[error("{0} is not running")]
    NotRunning(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("supervisor request failed: {0}")]
    Supervisor(String),

    #[error("file store error at {path}: {reason}")]
    FileStore { path: String, reason: String },

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("hook tool '{tool}' failed: {reason}")]
    HookTool { tool: String, reason: String },

    #[error("state store error: {0}")]
    State(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for OperatorError {
    fn from(e: serde_json::Error) -> Self {
        OperatorError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for OperatorError {
    fn from(e: serde_yaml::Error) -> Self {
        OperatorError::Serialization(e.to_string())
    }
}

impl OperatorError {
    pub fn hook_tool(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        OperatorError::HookTool {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn file_store(path: impl Into<String>, reason: impl Into<String>) -> Self {
        OperatorError::FileStore {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OperatorError>;
