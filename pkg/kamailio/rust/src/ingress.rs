// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::config::DesiredConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub const SIP_PORT: u16 = 5060;

/// What the ingress sidecar should expose for this application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressSpec {
    pub service_hostname: String,
    pub service_name: String,
    pub service_port: u16,
    pub tls_secret_name: Option<String>,
}

impl IngressSpec {
    pub fn from_config(app_name: &str, config: &DesiredConfig) -> Self {
        let service_hostname = if config.external_url.is_empty() {
            app_name.to_string()
        } else {
            config.external_url.clone()
        };
        let tls_secret_name =
            (!config.tls_secret_name.is_empty()).then(|| config.tls_secret_name.clone());

        Self {
            service_hostname,
            service_name: app_name.to_string(),
            service_port: SIP_PORT,
            tls_secret_name,
        }
    }

    /// Relation data keys understood by the nginx ingress integrator.
    pub fn to_relation_data(&self) -> BTreeMap<String, String> {
        let mut data = BTreeMap::from([
            (
                "service-hostname".to_string(),
                self.service_hostname.clone(),
            ),
            ("service-name".to_string(), self.service_name.clone()),
            ("service-port".to_string(), self.service_port.to_string()),
        ]);
        if let Some(secret) = &self.tls_secret_name {
            data.insert("tls-secret-name".to_string(), secret.clone());
        }
        data
    }
}

/// Pushes ingress requirements to the ingress collaborator.
#[async_trait]
pub trait IngressRegistrar: Send + Sync {
    async fn update_config(&self, spec: &IngressSpec) -> Result<()>;
}
