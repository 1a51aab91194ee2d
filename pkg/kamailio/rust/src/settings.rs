// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Operator settings from environment variables.
//!
//! The platform describes the invocation through `JUJU_*` variables; the
//! `KAMAILIO_*` variables locate the workload and override defaults.

use crate::error::{OperatorError, Result};
use log::LevelFilter;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_PEBBLE_SOCKET: &str = "/charm/containers/kamailio/pebble.socket";
const DEFAULT_APP_NAME: &str = "kamailio";
const DEFAULT_LOG_LEVEL: &str = "info";
const STATE_FILE_NAME: &str = ".kamailio-state.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSettings {
    /// Pebble API socket of the workload container
    pub pebble_socket: PathBuf,

    /// Mounted filesystem of the workload container. When unset, files go
    /// through the Pebble files API.
    pub container_root: Option<PathBuf>,

    /// Recorded state between invocations
    pub state_file: PathBuf,

    pub app_name: String,

    /// `hooks/<name>` or `actions/<name>`, set by the platform
    pub dispatch_path: Option<String>,

    pub log_level: String,

    /// Use in-memory collaborators instead of the workload
    pub dry_run: bool,
}

impl OperatorSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_name = lookup("JUJU_APPLICATION_NAME")
            .or_else(|| {
                lookup("JUJU_UNIT_NAME")
                    .as_deref()
                    .and_then(|unit| unit.split_once('/'))
                    .map(|(app, _)| app.to_string())
            })
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

        let state_file = lookup("KAMAILIO_STATE_FILE")
            .map(PathBuf::from)
            .or_else(|| lookup("JUJU_CHARM_DIR").map(|dir| PathBuf::from(dir).join(STATE_FILE_NAME)))
            .unwrap_or_else(|| PathBuf::from(STATE_FILE_NAME));

        Self {
            pebble_socket: lookup("KAMAILIO_PEBBLE_SOCKET")
                .unwrap_or_else(|| DEFAULT_PEBBLE_SOCKET.to_string())
                .into(),
            container_root: lookup("KAMAILIO_CONTAINER_ROOT").map(PathBuf::from),
            state_file,
            app_name,
            dispatch_path: lookup("JUJU_DISPATCH_PATH"),
            // Priority: KAMAILIO_LOG_LEVEL > RUST_LOG > default. RUST_LOG
            // only counts when it is a bare level; directives such as
            // `kamailio_operator=debug` fall through to the default.
            log_level: lookup("KAMAILIO_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG").filter(|v| LevelFilter::from_str(v).is_ok()))
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            dry_run: lookup("KAMAILIO_DRY_RUN")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
        }
    }

    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level).map_err(|_| {
            OperatorError::InvalidConfig(format!("unknown log level '{}'", self.log_level))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.app_name.is_empty() {
            return Err(OperatorError::InvalidConfig(
                "application name is empty".to_string(),
            ));
        }
        self.level_filter()?;
        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> OperatorSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OperatorSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[]);
        assert_eq!(
            settings.pebble_socket,
            PathBuf::from("/charm/containers/kamailio/pebble.socket")
        );
        assert_eq!(settings.container_root, None);
        assert_eq!(settings.state_file, PathBuf::from(".kamailio-state.json"));
        assert_eq!(settings.app_name, "kamailio");
        assert_eq!(settings.dispatch_path, None);
        assert_eq!(settings.log_level, "info");
        assert!(!settings.dry_run);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_juju_environment() {
        let settings = settings(&[
            ("JUJU_UNIT_NAME", "sip-edge/0"),
            ("JUJU_CHARM_DIR", "/var/lib/juju/agents/unit-sip-edge-0/charm"),
            ("JUJU_DISPATCH_PATH", "hooks/config-changed"),
        ]);
        assert_eq!(settings.app_name, "sip-edge");
        assert_eq!(
            settings.state_file,
            PathBuf::from("/var/lib/juju/agents/unit-sip-edge-0/charm/.kamailio-state.json")
        );
        assert_eq!(settings.dispatch_path.as_deref(), Some("hooks/config-changed"));
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("JUJU_APPLICATION_NAME", "kamailio-k8s"),
            ("JUJU_UNIT_NAME", "other/1"),
            ("JUJU_CHARM_DIR", "/charm"),
            ("KAMAILIO_STATE_FILE", "/tmp/state.json"),
            ("KAMAILIO_PEBBLE_SOCKET", "/tmp/pebble.socket"),
            ("KAMAILIO_CONTAINER_ROOT", "/tmp/rootfs"),
            ("KAMAILIO_DRY_RUN", "Yes"),
        ]);
        assert_eq!(settings.app_name, "kamailio-k8s");
        assert_eq!(settings.state_file, PathBuf::from("/tmp/state.json"));
        assert_eq!(settings.pebble_socket, PathBuf::from("/tmp/pebble.socket"));
        assert_eq!(settings.container_root, Some(PathBuf::from("/tmp/rootfs")));
        assert!(settings.dry_run);
    }

    #[test]
    fn test_log_level_priority() {
        assert_eq!(
            settings(&[("KAMAILIO_LOG_LEVEL", "debug"), ("RUST_LOG", "trace")]).log_level,
            "debug"
        );
        assert_eq!(settings(&[("RUST_LOG", "trace")]).log_level, "trace");
        assert_eq!(
            settings(&[("RUST_LOG", "trace")]).level_filter().unwrap(),
            LevelFilter::Trace
        );
    }

    #[test]
    fn test_rust_log_directives_fall_back() {
        let directive = settings(&[("RUST_LOG", "kamailio_operator=debug")]);
        assert_eq!(directive.log_level, "info");
        assert!(directive.validate().is_ok());

        let mixed = settings(&[("RUST_LOG", "warn,hyper=off")]);
        assert_eq!(mixed.level_filter().unwrap(), LevelFilter::Info);
    }

    #[test]
    fn test_validation() {
        assert!(settings(&[("KAMAILIO_LOG_LEVEL", "chatty")]).validate().is_err());
        assert!(settings(&[("JUJU_APPLICATION_NAME", "")]).validate().is_err());
    }
}
