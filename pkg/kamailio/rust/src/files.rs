// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Workload configuration files and the port used to write them into the
//! container.

use crate::error::Result;
use async_trait::async_trait;

/// Local overrides included by the stock `kamailio.cfg`.
pub const LOCAL_CONFIG_PATH: &str = "/etc/kamailio/kamailio-local.cfg";

/// Resource file read by `kamctl`.
pub const KAMCTL_RC_PATH: &str = "/etc/kamailio/kamctlrc";

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write `content` to `path`, replacing any existing file.
    async fn push(&self, path: &str, content: &str) -> Result<()>;

    /// Read the file at `path`. Fails with `FileNotFound` when it is absent.
    async fn pull(&self, path: &str) -> Result<String>;
}

pub fn render_local_config(bind_address_port: &str) -> String {
    format!("listen={bind_address_port}")
}

pub fn render_kamctl_rc(sip_domain: &str) -> String {
    format!("SIP_DOMAIN={sip_domain}\n")
}
