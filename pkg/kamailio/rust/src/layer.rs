// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Pebble layer and plan types.
//!
//! A layer describes the services the supervisor should run. The plan is the
//! supervisor's combined view of every layer added so far; the reconciler
//! compares its services against a freshly computed layer to decide whether
//! a restart is needed.

use crate::config::DesiredConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SERVICE_NAME: &str = "kamailio";
pub const LAYER_LABEL: &str = "kamailio";
pub const KAMAILIO_COMMAND: &str = "kamailio -DD -E";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Override {
    #[default]
    Merge,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Startup {
    #[default]
    Disabled,
    Enabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    #[serde(rename = "override")]
    pub override_mode: Override,
    pub summary: String,
    pub command: String,
    pub startup: Startup,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Layer {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
}

impl Plan {
    /// Fold a layer into the plan. `replace` services overwrite the existing
    /// definition; `merge` services only overwrite the fields they set.
    pub fn combine(&mut self, layer: &Layer) {
        for (name, service) in &layer.services {
            match (service.override_mode, self.services.get_mut(name)) {
                (Override::Merge, Some(existing)) => {
                    if !service.summary.is_empty() {
                        existing.summary = service.summary.clone();
                    }
                    if !service.command.is_empty() {
                        existing.command = service.command.clone();
                    }
                    if service.startup == Startup::Enabled {
                        existing.startup = Startup::Enabled;
                    }
                }
                _ => {
                    self.services.insert(name.clone(), service.clone());
                }
            }
        }
    }

    /// True when the plan already runs exactly the services of `layer`.
    pub fn matches(&self, layer: &Layer) -> bool {
        self.services == layer.services
    }
}

/// The layer that runs kamailio in the foreground with logs on stderr.
///
/// The layer content is fixed; the configuration is only checked so that a
/// listen address kamailio would refuse to start with blocks the unit
/// instead of crash-looping the service.
pub fn kamailio_layer(config: &DesiredConfig) -> Result<Layer> {
    config.bind_address()?;

    let service = Service {
        override_mode: Override::Replace,
        summary: SERVICE_NAME.to_string(),
        command: KAMAILIO_COMMAND.to_string(),
        startup: Startup::Enabled,
    };

    Ok(Layer {
        summary: "kamailio layer".to_string(),
        description: "pebble config layer for kamailio".to_string(),
        services: BTreeMap::from([(SERVICE_NAME.to_string(), service)]),
    })
}
