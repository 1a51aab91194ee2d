// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Mapping of platform hook and action names to operator events.

use crate::actions::{ActionChannel, ActionKind};
use crate::error::Result;
use log::debug;
use std::collections::HashMap;
use std::fmt;

const HOOKS_PREFIX: &str = "hooks/";
const ACTIONS_PREFIX: &str = "actions/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ConfigChanged,
    PebbleReady,
    Install,
    UpgradeCharm,
    IngressRelationChanged,
    Action(ActionKind),
}

impl Event {
    /// Fill in action parameters from the running action.
    pub async fn with_params(self, channel: &dyn ActionChannel) -> Result<Event> {
        match self {
            Event::Action(kind) if kind.takes_params() => {
                let args = channel.param("args").await?;
                debug!("action {} called with args '{args}'", kind.name());
                Ok(Event::Action(ActionKind::Kamctl { args }))
            }
            other => Ok(other),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::ConfigChanged => write!(f, "config-changed"),
            Event::PebbleReady => write!(f, "kamailio-pebble-ready"),
            Event::Install => write!(f, "install"),
            Event::UpgradeCharm => write!(f, "upgrade-charm"),
            Event::IngressRelationChanged => write!(f, "ingress-relation-changed"),
            Event::Action(kind) => write!(f, "{} action", kind.name()),
        }
    }
}

pub struct Dispatcher {
    hooks: HashMap<&'static str, Event>,
    actions: HashMap<&'static str, ActionKind>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let hooks = HashMap::from([
            ("config-changed", Event::ConfigChanged),
            ("kamailio-pebble-ready", Event::PebbleReady),
            ("install", Event::Install),
            ("upgrade-charm", Event::UpgradeCharm),
            ("ingress-relation-joined", Event::IngressRelationChanged),
            ("ingress-relation-changed", Event::IngressRelationChanged),
        ]);
        let actions = HashMap::from([
            ("start", ActionKind::Start),
            ("stop", ActionKind::Stop),
            ("restart", ActionKind::Restart),
            (
                "kamctl",
                ActionKind::Kamctl {
                    args: String::new(),
                },
            ),
        ]);
        Self { hooks, actions }
    }

    /// Resolve `hooks/<name>` or `actions/<name>`. Unknown names resolve to
    /// `None`.
    pub fn resolve(&self, dispatch_path: &str) -> Option<Event> {
        let path = dispatch_path.trim().trim_start_matches("./");
        if let Some(name) = path.strip_prefix(HOOKS_PREFIX) {
            return self.hook(name);
        }
        if let Some(name) = path.strip_prefix(ACTIONS_PREFIX) {
            return self.action(name);
        }
        None
    }

    pub fn hook(&self, name: &str) -> Option<Event> {
        self.hooks.get(name).cloned()
    }

    pub fn action(&self, name: &str) -> Option<Event> {
        self.actions.get(name).cloned().map(Event::Action)
    }
}
