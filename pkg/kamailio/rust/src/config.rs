// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Charm configuration: option defaults from `config.yaml` merged with the
//! values the platform reports for the unit.

use crate::error::{OperatorError, Result};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const CHARM_CONFIG: &str = include_str!("../../charm/config.yaml");

pub const EXTERNAL_URL: &str = "external-url";
pub const TLS_SECRET_NAME: &str = "tls-secret-name";
pub const BIND_ADDRESS_PORT: &str = "bind-address-port";
pub const SIP_DOMAIN: &str = "sip-domain";

#[derive(Debug, Deserialize)]
pub struct ConfigOptions {
    #[serde(default)]
    pub options: BTreeMap<String, ConfigOption>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigOption {
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ConfigOptions {
    /// Options shipped with the charm.
    pub fn embedded() -> Result<Self> {
        Self::parse(CHARM_CONFIG)
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// String defaults keyed by option name. Options without a default are
    /// left out, the same way the platform omits them.
    pub fn defaults(&self) -> BTreeMap<String, String> {
        self.options
            .iter()
            .filter_map(|(name, opt)| {
                let value = match opt.default.as_ref()? {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                Some((name.clone(), value))
            })
            .collect()
    }
}

/// Configuration the operator converges the workload towards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DesiredConfig {
    pub external_url: String,
    pub tls_secret_name: String,
    pub bind_address_port: String,
    pub sip_domain: String,
}

impl DesiredConfig {
    /// Defaults from the embedded `config.yaml`.
    pub fn defaults() -> Result<Self> {
        Self::from_values(&ConfigOptions::embedded()?, &serde_json::Map::new())
    }

    /// Merge platform values over the option defaults. `null` keeps the
    /// default; non-string values are rejected since every option is a string.
    pub fn from_values(
        options: &ConfigOptions,
        values: &serde_json::Map<String, Value>,
    ) -> Result<Self> {
        let mut merged = options.defaults();
        for (key, value) in values {
            match value {
                Value::Null => {}
                Value::String(s) => {
                    merged.insert(key.clone(), s.clone());
                }
                other => {
                    return Err(OperatorError::InvalidConfig(format!(
                        "option '{key}' must be a string, got {other}"
                    )));
                }
            }
        }
        debug!("merged charm config: {merged:?}");

        let mut take = |key: &str| merged.remove(key).unwrap_or_default();
        Ok(Self {
            external_url: take(EXTERNAL_URL),
            tls_secret_name: take(TLS_SECRET_NAME),
            bind_address_port: take(BIND_ADDRESS_PORT),
            sip_domain: take(SIP_DOMAIN),
        })
    }

    pub fn bind_address(&self) -> Result<BindAddress> {
        self.bind_address_port.parse()
    }
}

/// Source of the current charm configuration.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn desired_config(&self) -> Result<DesiredConfig>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Udp,
    Tcp,
    Tls,
    Sctp,
    Ws,
    Wss,
}

impl Protocol {
    fn from_prefix(s: &str) -> Option<Self> {
        match s {
            "udp" => Some(Protocol::Udp),
            "tcp" => Some(Protocol::Tcp),
            "tls" => Some(Protocol::Tls),
            "sctp" => Some(Protocol::Sctp),
            "ws" => Some(Protocol::Ws),
            "wss" => Some(Protocol::Wss),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Udp => write!(f, "udp"),
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Tls => write!(f, "tls"),
            Protocol::Sctp => write!(f, "sctp"),
            Protocol::Ws => write!(f, "ws"),
            Protocol::Wss => write!(f, "wss"),
        }
    }
}

/// A kamailio `listen` socket: `[proto:]host[:port]`. Without a port
/// kamailio listens on its default SIP port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindAddress {
    pub protocol: Protocol,
    pub host: String,
    pub port: Option<u16>,
}

/// Unbracketed IPv6 literals cannot carry a port.
fn is_ipv6_literal(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.')
        && (s.contains("::") || s.matches(':').count() == 7)
}

impl FromStr for BindAddress {
    type Err = OperatorError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            OperatorError::InvalidConfig(format!("{BIND_ADDRESS_PORT} '{s}': {reason}"))
        };

        if s.is_empty() {
            return Err(invalid("value is empty"));
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("must not contain whitespace or control characters"));
        }

        let (protocol, rest) = match s.split_once(':') {
            Some((prefix, rest)) => match Protocol::from_prefix(prefix) {
                Some(protocol) => (protocol, rest),
                None => (Protocol::Udp, s),
            },
            None => (Protocol::Udp, s),
        };

        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (addr, after) = bracketed
                .split_once(']')
                .ok_or_else(|| invalid("unterminated '[' in host"))?;
            if addr.is_empty() {
                return Err(invalid("missing host"));
            }
            let port = match after {
                "" => None,
                other => Some(
                    other
                        .strip_prefix(':')
                        .ok_or_else(|| invalid("unexpected text after host"))?,
                ),
            };
            (format!("[{addr}]"), port)
        } else {
            match rest.matches(':').count() {
                0 => (rest.to_string(), None),
                1 => {
                    let (host, port) = rest.split_once(':').unwrap_or((rest, ""));
                    (host.to_string(), Some(port))
                }
                _ if is_ipv6_literal(rest) => (rest.to_string(), None),
                _ => return Err(invalid("expected [proto:]host[:port]")),
            }
        };

        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = match port {
            None => None,
            Some(port) => {
                let port: u16 = port.parse().map_err(|_| invalid("port is not a number"))?;
                if port == 0 {
                    return Err(invalid("port must be non-zero"));
                }
                Some(port)
            }
        };

        Ok(BindAddress {
            protocol,
            host,
            port,
        })
    }
}

impl fmt::Display for BindAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.protocol, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}
