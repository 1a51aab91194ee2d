// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::DesiredConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Last-applied configuration values, used for change detection between
/// reconciliation passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedState {
    pub external_url: String,
    pub tls_secret_name: String,
    pub bind_address_port: String,
    #[serde(default)]
    pub sip_domain: String,
}

impl RecordedState {
    /// State for a unit that has never reconciled. The external URL starts
    /// at the application name and the listen address at its configured
    /// value, so the first pass does not rewrite the listen address.
    pub fn initial(app_name: &str, config: &DesiredConfig) -> Self {
        Self {
            external_url: app_name.to_string(),
            tls_secret_name: String::new(),
            bind_address_port: config.bind_address_port.clone(),
            sip_domain: String::new(),
        }
    }
}

/// Persists [`RecordedState`] between hook invocations.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> Result<Option<RecordedState>>;

    async fn save(&self, state: &RecordedState) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_tracks_configured_listen_address() {
        let config = DesiredConfig {
            bind_address_port: "udp:0.0.0.0:5060".to_string(),
            external_url: "sip.example.com".to_string(),
            ..Default::default()
        };
        let state = RecordedState::initial("kamailio", &config);
        assert_eq!(state.bind_address_port, "udp:0.0.0.0:5060");
        assert_eq!(state.external_url, "kamailio");
        assert_eq!(state.tls_secret_name, "");
        assert_eq!(state.sip_domain, "");
    }

    #[test]
    fn test_state_without_sip_domain_deserializes() {
        let state: RecordedState = serde_json::from_str(
            r#"{"external_url":"k","tls_secret_name":"","bind_address_port":"udp:0.0.0.0:5060"}"#,
        )
        .unwrap();
        assert_eq!(state.sip_domain, "");
    }
}
